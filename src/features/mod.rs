//! Feature engineering for the growth regression model.
//!
//! The transform maps a raw [`Indicators`] bundle to the fixed-order,
//! bounded feature vector the regressor consumes. It is total: missing
//! inputs fall back to the fixed defaults below, so the same transform
//! round-trips exactly between training and inference.
//!
//! The feature set is a versioned contract. The model's input is an
//! ordered vector, not a schema-free mapping, so changing a name, a
//! formula, or the ordering invalidates every persisted model; the load
//! path rejects bundles recorded under a different version.

use crate::core::Indicators;

/// Version tag of the compact 7-feature set.
pub const FEATURE_SET_VERSION: &str = "compact-v1";

/// Fixed feature ordering. Position is the model's input contract.
pub const FEATURE_NAMES: [&str; 7] = [
    "birthRate",
    "deathRate",
    "naturalIncrease",
    "birthDeathRatio",
    "gdpLog",
    "lifeExpectancy",
    "urbanization",
];

/// Default birth rate (per 1,000) when the indicator is missing.
pub const DEFAULT_BIRTH_RATE: f64 = 15.0;
/// Default death rate (per 1,000) when the indicator is missing.
pub const DEFAULT_DEATH_RATE: f64 = 7.0;
/// Default GDP per capita (USD) when the indicator is missing.
pub const DEFAULT_GDP_PER_CAPITA: f64 = 3000.0;
/// Default life expectancy (years) when the indicator is missing.
pub const DEFAULT_LIFE_EXPECTANCY: f64 = 74.0;
/// Default urbanization share (percent) when the indicator is missing.
pub const DEFAULT_URBANIZATION: f64 = 0.0;

/// A fixed-order numeric encoding of one country's indicators.
///
/// Never persisted; recomputed on demand from raw indicators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_NAMES.len()],
}

impl FeatureVector {
    /// Build a vector from raw values in [`FEATURE_NAMES`] order.
    ///
    /// Used by training-time augmentation, which perturbs already
    /// transformed features rather than raw indicators.
    pub fn from_values(values: [f64; FEATURE_NAMES.len()]) -> Self {
        Self { values }
    }

    /// Feature values in [`FEATURE_NAMES`] order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Look up a feature value by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|&n| n == name)
            .map(|i| self.values[i])
    }
}

/// Transform raw indicators into the model's feature vector.
///
/// Each output is a fixed scalar normalization chosen so values land
/// roughly in [0, 1]-[0, 2]; GDP is log-compressed because of its heavy
/// tail. Total: never fails, missing inputs use the documented defaults.
pub fn to_features(indicators: &Indicators) -> FeatureVector {
    let birth = indicators.birth_rate.unwrap_or(DEFAULT_BIRTH_RATE);
    let death = indicators.death_rate.unwrap_or(DEFAULT_DEATH_RATE);
    let gdp = indicators.gdp_per_capita.unwrap_or(DEFAULT_GDP_PER_CAPITA);
    let life = indicators
        .life_expectancy
        .unwrap_or(DEFAULT_LIFE_EXPECTANCY);
    let urbanization = indicators.urbanization.unwrap_or(DEFAULT_URBANIZATION);

    FeatureVector {
        values: [
            birth / 50.0,
            death / 20.0,
            (birth - death) / 30.0,
            birth / death.max(1.0),
            gdp.ln_1p() / 15.0,
            life / 100.0,
            urbanization / 100.0,
        ],
    }
}
