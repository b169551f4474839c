//! Training-sample construction, augmentation, and cross-validation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::{CountryHistory, Indicators};
use crate::error::{ForecastError, Result};
use crate::features::{to_features, FeatureVector, FEATURE_NAMES};
use crate::model::metrics::regression_metrics;
use crate::model::Regressor;

/// One supervised sample: a feature vector and the observed next-year
/// growth rate.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample {
    pub features: FeatureVector,
    /// Observed growth rate from year `t` to `t+1`, in percent.
    pub target: f64,
    /// Source country label; augmented siblings get a derived label.
    pub country: String,
    /// Source year `t` of the window.
    pub year: i32,
    /// True for noise-perturbed siblings. Synthetic samples only ever
    /// feed the regressor; they are never ground truth elsewhere.
    pub synthetic: bool,
}

/// Noise augmentation settings for small-country-count datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationConfig {
    pub enabled: bool,
    /// Synthetic siblings emitted per real sample.
    pub factor: usize,
    /// Relative noise bound; each field is scaled by
    /// `1 + uniform(-noise, noise)` independently.
    pub noise: f64,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factor: 9,
            noise: 0.08,
        }
    }
}

/// Build training samples by sliding a window of size 2 over each
/// country's chronological history.
///
/// Windows with a zero starting population are skipped: the growth-rate
/// target is undefined there. When augmentation is enabled, each real
/// sample is followed by `factor` perturbed siblings drawn from `rng`.
pub fn prepare_training_data(
    countries: &[CountryHistory],
    augmentation: &AugmentationConfig,
    rng: &mut StdRng,
) -> Vec<TrainingSample> {
    let mut samples = Vec::new();

    for country in countries {
        let history = country.historical();

        for window in history.windows(2) {
            let current = window[0];
            let next = window[1];

            if current.population == 0.0 {
                log::debug!(
                    "skipping {} year {}: zero population",
                    country.country_name,
                    current.year
                );
                continue;
            }

            let target = (next.population - current.population) / current.population * 100.0;

            let indicators = Indicators {
                birth_rate: current.birth_rate,
                death_rate: current.death_rate,
                gdp_per_capita: current.gdp_per_capita,
                life_expectancy: country.indicators.life_expectancy,
                urbanization: country.indicators.urbanization,
                ..Default::default()
            };
            let features = to_features(&indicators);

            samples.push(TrainingSample {
                features,
                target,
                country: country.country_name.clone(),
                year: current.year,
                synthetic: false,
            });

            if !augmentation.enabled || augmentation.noise <= 0.0 {
                continue;
            }
            for aug_idx in 0..augmentation.factor {
                let noise = augmentation.noise;
                let mut values = [0.0; FEATURE_NAMES.len()];
                for (slot, &v) in values.iter_mut().zip(features.values()) {
                    *slot = v * (1.0 + rng.gen_range(-noise..noise));
                }
                samples.push(TrainingSample {
                    features: FeatureVector::from_values(values),
                    target: target * (1.0 + rng.gen_range(-noise..noise)),
                    country: format!("{}_aug{}", country.country_name, aug_idx),
                    year: current.year,
                    synthetic: true,
                });
            }
        }
    }

    samples
}

/// Lower samples into the regressor's matrix form, preserving order.
pub fn to_matrix(samples: &[TrainingSample]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let x = samples.iter().map(|s| s.features.values().to_vec()).collect();
    let y = samples.iter().map(|s| s.target).collect();
    (x, y)
}

/// Reproducibly shuffle `n` indices and split them into train and
/// validation index sets.
///
/// Both sides are kept non-empty whenever `n >= 2`.
pub fn split_indices(
    n: usize,
    validation_fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let n_val = if n < 2 {
        0
    } else {
        (((n as f64) * validation_fraction).round() as usize).clamp(1, n - 1)
    };
    let validation = indices.split_off(n - n_val);
    (indices, validation)
}

/// Mean R² across `k` shuffled folds, fitting a fresh regressor per fold.
///
/// Requires at least one sample per fold.
pub fn k_fold_r2<R, F>(
    x: &[Vec<f64>],
    y: &[f64],
    k: usize,
    rng: &mut StdRng,
    factory: F,
) -> Result<f64>
where
    R: Regressor,
    F: Fn() -> R,
{
    if k < 2 {
        return Err(ForecastError::InvalidParameter(
            "cross-validation needs at least 2 folds".to_string(),
        ));
    }
    if x.len() < k {
        return Err(ForecastError::InvalidParameter(format!(
            "cross-validation needs at least {} samples, got {}",
            k,
            x.len()
        )));
    }

    let mut indices: Vec<usize> = (0..x.len()).collect();
    indices.shuffle(rng);

    let fold_size = x.len() / k;
    let mut scores = Vec::with_capacity(k);

    for fold in 0..k {
        let start = fold * fold_size;
        // The last fold absorbs the remainder.
        let end = if fold == k - 1 {
            x.len()
        } else {
            start + fold_size
        };
        let holdout = &indices[start..end];

        let mut train_x = Vec::with_capacity(x.len() - holdout.len());
        let mut train_y = Vec::with_capacity(x.len() - holdout.len());
        for (pos, &i) in indices.iter().enumerate() {
            if pos < start || pos >= end {
                train_x.push(x[i].clone());
                train_y.push(y[i]);
            }
        }

        let mut model = factory();
        model.fit(&train_x, &train_y)?;

        let actual: Vec<f64> = holdout.iter().map(|&i| y[i]).collect();
        let predicted: Vec<f64> = holdout
            .iter()
            .map(|&i| model.predict_row(&x[i]))
            .collect::<Result<_>>()?;

        scores.push(regression_metrics(&actual, &predicted)?.r2);
    }

    Ok(scores.iter().sum::<f64>() / scores.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HistoricalYear;
    use crate::model::{GbtConfig, GradientBoostedTrees};
    use approx::assert_relative_eq;
    use rand::SeedableRng;

    fn history(name: &str, pops: &[f64]) -> CountryHistory {
        let historical = pops
            .iter()
            .enumerate()
            .map(|(i, &pop)| HistoricalYear {
                year: 2000 + i as i32,
                population: pop,
                birth_rate: Some(15.0 - i as f64 * 0.2),
                death_rate: Some(6.0 + i as f64 * 0.1),
                gdp_per_capita: Some(2000.0 + i as f64 * 300.0),
            })
            .collect();
        CountryHistory::new("XX", name, Indicators::default(), historical).unwrap()
    }

    #[test]
    fn one_sample_per_consecutive_pair() {
        let countries = vec![history("A", &[100.0, 102.0, 104.0])];
        let mut rng = StdRng::seed_from_u64(42);
        let samples = prepare_training_data(
            &countries,
            &AugmentationConfig {
                enabled: false,
                ..Default::default()
            },
            &mut rng,
        );

        assert_eq!(samples.len(), 2);
        assert_relative_eq!(samples[0].target, 2.0);
        assert_relative_eq!(samples[1].target, (104.0 - 102.0) / 102.0 * 100.0);
        assert!(samples.iter().all(|s| !s.synthetic));
        assert_eq!(samples[0].year, 2000);
    }

    #[test]
    fn zero_population_window_is_skipped() {
        let countries = vec![history("A", &[0.0, 0.0, 100.0, 101.0])];
        let mut rng = StdRng::seed_from_u64(42);
        let samples = prepare_training_data(
            &countries,
            &AugmentationConfig {
                enabled: false,
                ..Default::default()
            },
            &mut rng,
        );

        // Windows (0,0) and (0,100) are both undefined; only (100,101)
        // survives.
        assert_eq!(samples.len(), 1);
        assert_relative_eq!(samples[0].target, 1.0);
    }

    #[test]
    fn augmentation_multiplies_and_tags_samples() {
        let countries = vec![history("A", &[100.0, 102.0])];
        let mut rng = StdRng::seed_from_u64(42);
        let samples = prepare_training_data(&countries, &AugmentationConfig::default(), &mut rng);

        assert_eq!(samples.len(), 10);
        assert_eq!(samples.iter().filter(|s| s.synthetic).count(), 9);
        assert_eq!(samples.iter().filter(|s| !s.synthetic).count(), 1);

        let real = &samples[0];
        for synthetic in &samples[1..] {
            assert!(synthetic.synthetic);
            assert!(synthetic.country.starts_with("A_aug"));
            // Perturbed fields stay within the 8% noise envelope.
            assert!((synthetic.target - real.target).abs() <= real.target.abs() * 0.08 + 1e-12);
            for (s, r) in synthetic.features.values().iter().zip(real.features.values()) {
                assert!((s - r).abs() <= r.abs() * 0.08 + 1e-12);
            }
        }
    }

    #[test]
    fn augmentation_is_reproducible_per_seed() {
        let countries = vec![history("A", &[100.0, 102.0, 104.0])];

        let mut rng1 = StdRng::seed_from_u64(7);
        let mut rng2 = StdRng::seed_from_u64(7);
        let a = prepare_training_data(&countries, &AugmentationConfig::default(), &mut rng1);
        let b = prepare_training_data(&countries, &AugmentationConfig::default(), &mut rng2);
        assert_eq!(a, b);
    }

    #[test]
    fn split_is_reproducible_and_non_degenerate() {
        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        let (train1, val1) = split_indices(100, 0.2, &mut rng1);
        let (train2, val2) = split_indices(100, 0.2, &mut rng2);

        assert_eq!(train1, train2);
        assert_eq!(val1, val2);
        assert_eq!(train1.len(), 80);
        assert_eq!(val1.len(), 20);

        let mut all: Vec<usize> = train1.iter().chain(&val1).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn tiny_split_keeps_both_sides_populated() {
        let mut rng = StdRng::seed_from_u64(42);
        let (train, val) = split_indices(2, 0.2, &mut rng);
        assert_eq!(train.len(), 1);
        assert_eq!(val.len(), 1);
    }

    #[test]
    fn k_fold_scores_learnable_data_highly() {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64 / 60.0]).collect();
        let y: Vec<f64> = x.iter().map(|row| 2.0 * row[0]).collect();

        let mut rng = StdRng::seed_from_u64(42);
        let r2 = k_fold_r2(&x, &y, 5, &mut rng, || {
            GradientBoostedTrees::new(GbtConfig::default())
        })
        .unwrap();

        assert!(r2 > 0.8, "mean CV r2 {r2}");
    }

    #[test]
    fn k_fold_rejects_undersized_inputs() {
        let x = vec![vec![1.0], vec![2.0]];
        let y = vec![1.0, 2.0];
        let mut rng = StdRng::seed_from_u64(42);

        let err = k_fold_r2(&x, &y, 5, &mut rng, GradientBoostedTrees::default).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidParameter(_)));
    }
}
