//! Narrative insight generation for completed forecasts.
//!
//! Turns a training metrics snapshot and a simulated trajectory into a
//! short bullet-point analysis. Uses the text-generation capability when
//! one is attached and degrades to a deterministic template otherwise;
//! generation failures never propagate.

use crate::context::TextGenerator;
use crate::core::{CountryRecord, ForecastTrajectory};
use crate::model::TrainingMetrics;

/// Maximum number of bullet insights returned.
const MAX_INSIGHTS: usize = 5;

/// Bullet-point analyst over an optional text-generation capability.
pub struct InsightGenerator {
    generator: Option<Box<dyn TextGenerator>>,
}

impl InsightGenerator {
    /// Insight generator with the deterministic template only.
    pub fn new() -> Self {
        Self { generator: None }
    }

    /// Attach a text-generation capability.
    pub fn with_generator(mut self, generator: Box<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Produce up to five insight bullets for a forecast.
    pub fn generate(
        &self,
        country: &CountryRecord,
        metrics: &TrainingMetrics,
        trajectory: &ForecastTrajectory,
    ) -> Vec<String> {
        if let Some(generator) = &self.generator {
            let prompt = build_prompt(country, metrics, trajectory);
            match generator.complete(&prompt) {
                Ok(text) => return parse_bullets(&text),
                Err(err) => {
                    log::warn!("insight generation failed, using template: {err}");
                }
            }
        }
        template_insights(country, metrics, trajectory)
    }
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn top_feature(metrics: &TrainingMetrics) -> &str {
    metrics
        .feature_importance
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name.as_str())
        .unwrap_or("n/a")
}

fn build_prompt(
    country: &CountryRecord,
    metrics: &TrainingMetrics,
    trajectory: &ForecastTrajectory,
) -> String {
    format!(
        "I trained a boosted-tree population growth model for {name}.\n\n\
         Model results:\n\
         - R2: {r2:.3}\n\
         - RMSE: {rmse:.3}%\n\
         - MAE: {mae:.3}%\n\
         - Most important input: {top}\n\n\
         Country data:\n\
         - Current population: {pop:.0}\n\
         - Birth rate: {birth}\n\
         - Death rate: {death}\n\
         - Demographic transition stage: {stage}\n\n\
         Forecast:\n\
         - Mean projected growth: {growth:.2}% per year\n\
         - Population after {years} years: {final_pop:.0}\n\n\
         Write 3-5 short bullet points analysing this as a demographer: \
         model accuracy, the population trend, policy suggestions, and \
         risks. One bullet per line, each starting with '-'.",
        name = country.country_name,
        r2 = metrics.val_r2,
        rmse = metrics.val_rmse,
        mae = metrics.val_mae,
        top = top_feature(metrics),
        pop = country.indicators.population.unwrap_or(0.0),
        birth = country.indicators.birth_rate.unwrap_or(0.0),
        death = country.indicators.death_rate.unwrap_or(0.0),
        stage = country.indicators.stage.unwrap_or(3),
        growth = trajectory.mean_growth_rate().unwrap_or(0.0),
        years = trajectory.horizon(),
        final_pop = trajectory.final_population().unwrap_or(0.0),
    )
}

/// Keep lines that look like bullets; fall back to the whole text.
fn parse_bullets(text: &str) -> Vec<String> {
    let mut bullets: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && (line.starts_with('-')
                    || line.starts_with('*')
                    || line.starts_with('•')
                    || line
                        .chars()
                        .next()
                        .map_or(false, |c| c.is_ascii_digit()))
        })
        .map(str::to_string)
        .collect();

    if bullets.is_empty() {
        bullets.push(text.trim().to_string());
    }
    bullets.truncate(MAX_INSIGHTS);
    bullets
}

/// Deterministic fallback when no generation capability is available.
fn template_insights(
    country: &CountryRecord,
    metrics: &TrainingMetrics,
    trajectory: &ForecastTrajectory,
) -> Vec<String> {
    let mut insights = Vec::new();

    let r2_pct = metrics.val_r2 * 100.0;
    if metrics.val_r2 > 0.9 {
        insights.push(format!(
            "Model accuracy R2={r2_pct:.1}% - very high confidence in the fit"
        ));
    } else if metrics.val_r2 > 0.8 {
        insights.push(format!("Model accuracy R2={r2_pct:.1}% - high confidence"));
    } else {
        insights.push(format!("Model accuracy R2={r2_pct:.1}% - acceptable fit"));
    }

    insights.push(format!(
        "Validation RMSE {:.3}% - mean error of the growth prediction",
        metrics.val_rmse
    ));

    match country.indicators.stage.unwrap_or(3) {
        2 => insights.push(
            "Expansion stage: rapid growth ahead, infrastructure investment needed".to_string(),
        ),
        3 => insights
            .push("Golden population structure: a large economic opportunity window".to_string()),
        s if s >= 4 => insights
            .push("Aging population: support policies will be increasingly needed".to_string()),
        _ => {}
    }

    let growth = trajectory.mean_growth_rate().unwrap_or(0.0);
    let years = trajectory.horizon();
    if growth >= 0.0 {
        insights.push(format!(
            "Projected average growth of {growth:.2}% per year over {years} years"
        ));
    } else {
        insights.push(format!(
            "Projected average decline of {:.2}% per year over {years} years",
            growth.abs()
        ));
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ForecastPoint, Indicators};
    use crate::error::{ForecastError, Result};
    use std::collections::BTreeMap;

    struct CannedGenerator(String);

    impl TextGenerator for CannedGenerator {
        fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn complete(&self, _prompt: &str) -> Result<String> {
            Err(ForecastError::Capability("offline".to_string()))
        }
    }

    fn metrics() -> TrainingMetrics {
        let mut importance = BTreeMap::new();
        importance.insert("birthDeathRatio".to_string(), 0.6);
        importance.insert("gdpLog".to_string(), 0.4);
        TrainingMetrics {
            train_rmse: 0.1,
            val_rmse: 0.2,
            train_mae: 0.08,
            val_mae: 0.15,
            train_r2: 0.99,
            val_r2: 0.93,
            holdout_r2: 0.91,
            cv_r2_mean: Some(0.93),
            training_seconds: 1.5,
            n_samples: 100,
            feature_importance: importance,
        }
    }

    fn record() -> CountryRecord {
        CountryRecord {
            country_code: "VN".to_string(),
            country_name: "Viet Nam".to_string(),
            year: 2025,
            indicators: Indicators {
                population: Some(98.8e6),
                birth_rate: Some(14.8),
                death_rate: Some(6.5),
                stage: Some(3),
                ..Default::default()
            },
        }
    }

    fn trajectory() -> ForecastTrajectory {
        let mut traj = ForecastTrajectory::new();
        traj.push(ForecastPoint {
            year: 2026,
            population: 99.5e6,
            growth_rate: 0.7,
            birth_rate: 14.8,
            death_rate: 6.5,
        });
        traj
    }

    #[test]
    fn template_mentions_accuracy_and_trend() {
        let insights = InsightGenerator::new().generate(&record(), &metrics(), &trajectory());

        assert!(!insights.is_empty());
        assert!(insights.len() <= MAX_INSIGHTS);
        assert!(insights[0].contains("93.0%"));
        assert!(insights.iter().any(|i| i.contains("0.70%")));
    }

    #[test]
    fn generator_bullets_are_parsed_and_capped() {
        let text = "Intro line to drop\n\
                    - first\n\
                    - second\n\
                    * third\n\
                    1. fourth\n\
                    - fifth\n\
                    - sixth";
        let gen = InsightGenerator::new().with_generator(Box::new(CannedGenerator(
            text.to_string(),
        )));

        let insights = gen.generate(&record(), &metrics(), &trajectory());
        assert_eq!(insights.len(), MAX_INSIGHTS);
        assert_eq!(insights[0], "- first");
        assert_eq!(insights[4], "- fifth");
    }

    #[test]
    fn non_bullet_response_is_returned_whole() {
        let gen = InsightGenerator::new().with_generator(Box::new(CannedGenerator(
            "a single paragraph of analysis".to_string(),
        )));
        let insights = gen.generate(&record(), &metrics(), &trajectory());
        assert_eq!(insights, vec!["a single paragraph of analysis".to_string()]);
    }

    #[test]
    fn failing_generator_falls_back_to_template() {
        let gen = InsightGenerator::new().with_generator(Box::new(FailingGenerator));
        let insights = gen.generate(&record(), &metrics(), &trajectory());
        assert!(insights[0].contains("93.0%"));
    }

    #[test]
    fn declining_population_is_described_as_decline() {
        let mut traj = ForecastTrajectory::new();
        traj.push(ForecastPoint {
            year: 2026,
            population: 123.0e6,
            growth_rate: -0.3,
            birth_rate: 6.9,
            death_rate: 11.7,
        });
        let mut rec = record();
        rec.indicators.stage = Some(5);

        let insights = InsightGenerator::new().generate(&rec, &metrics(), &traj);
        assert!(insights.iter().any(|i| i.contains("decline")));
        assert!(insights.iter().any(|i| i.contains("Aging")));
    }
}
