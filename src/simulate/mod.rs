//! Iterative multi-year population simulation.
//!
//! Chains single-year growth predictions into a trajectory: each step
//! predicts from the current state, advances the population, then ages
//! the state with a fixed drift policy. Steps are strictly sequential;
//! a failure mid-loop aborts the whole forecast.

use crate::core::{ForecastPoint, ForecastTrajectory, Indicators};
use crate::error::Result;
use crate::features::{
    DEFAULT_BIRTH_RATE, DEFAULT_DEATH_RATE, DEFAULT_GDP_PER_CAPITA, DEFAULT_LIFE_EXPECTANCY,
    DEFAULT_URBANIZATION,
};
use crate::model::GrowthModel;

/// Per-step heuristic aging of the simulated state.
///
/// The defaults model a generic continuation of current trends; they are
/// policy constants, not learned values. Keep them when behavioral
/// compatibility with prior forecasts matters.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftPolicy {
    /// Multiplied into the birth rate each step.
    pub birth_rate_factor: f64,
    /// Multiplied into the death rate each step.
    pub death_rate_factor: f64,
    /// Multiplied into GDP per capita each step.
    pub gdp_growth_factor: f64,
    /// Added to the median age each step.
    pub median_age_step: f64,
    /// Added to the life expectancy each step.
    pub life_expectancy_step: f64,
    /// Clamp evolved values to physically valid ranges after each step.
    /// Disable only for parity with historical unclamped forecasts.
    pub clamp: bool,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            birth_rate_factor: 0.995,
            death_rate_factor: 1.01,
            gdp_growth_factor: 1.03,
            median_age_step: 0.5,
            life_expectancy_step: 0.1,
            clamp: true,
        }
    }
}

impl DriftPolicy {
    /// Default constants without range clamping (compatibility behavior).
    pub fn unclamped() -> Self {
        Self {
            clamp: false,
            ..Default::default()
        }
    }

    fn advance(&self, state: &mut SimulationState) {
        state.birth_rate *= self.birth_rate_factor;
        state.death_rate *= self.death_rate_factor;
        state.gdp_per_capita *= self.gdp_growth_factor;
        state.median_age += self.median_age_step;
        state.life_expectancy += self.life_expectancy_step;

        if self.clamp {
            state.birth_rate = state.birth_rate.clamp(0.0, 60.0);
            state.death_rate = state.death_rate.clamp(0.0, 60.0);
            state.gdp_per_capita = state.gdp_per_capita.max(0.0);
            state.median_age = state.median_age.clamp(0.0, 100.0);
            state.life_expectancy = state.life_expectancy.clamp(0.0, 120.0);
        }
    }
}

/// Mutable simulation state with missing indicators resolved to the
/// fixed defaults, so drift always operates on concrete values.
#[derive(Debug, Clone)]
struct SimulationState {
    population: f64,
    birth_rate: f64,
    death_rate: f64,
    gdp_per_capita: f64,
    urbanization: f64,
    education_index: f64,
    healthcare_spending: f64,
    fertility_rate: f64,
    median_age: f64,
    life_expectancy: f64,
}

impl SimulationState {
    fn from_indicators(indicators: &Indicators) -> Self {
        Self {
            population: indicators.population.unwrap_or(0.0),
            birth_rate: indicators.birth_rate.unwrap_or(DEFAULT_BIRTH_RATE),
            death_rate: indicators.death_rate.unwrap_or(DEFAULT_DEATH_RATE),
            gdp_per_capita: indicators.gdp_per_capita.unwrap_or(DEFAULT_GDP_PER_CAPITA),
            urbanization: indicators.urbanization.unwrap_or(DEFAULT_URBANIZATION),
            education_index: indicators.education_index.unwrap_or(0.0),
            healthcare_spending: indicators.healthcare_spending.unwrap_or(0.0),
            fertility_rate: indicators.fertility_rate.unwrap_or(0.0),
            median_age: indicators.median_age.unwrap_or(0.0),
            life_expectancy: indicators
                .life_expectancy
                .unwrap_or(DEFAULT_LIFE_EXPECTANCY),
        }
    }

    fn snapshot(&self) -> Indicators {
        Indicators {
            population: Some(self.population),
            birth_rate: Some(self.birth_rate),
            death_rate: Some(self.death_rate),
            gdp_per_capita: Some(self.gdp_per_capita),
            urbanization: Some(self.urbanization),
            education_index: Some(self.education_index),
            healthcare_spending: Some(self.healthcare_spending),
            fertility_rate: Some(self.fertility_rate),
            median_age: Some(self.median_age),
            life_expectancy: Some(self.life_expectancy),
            growth_rate: None,
            stage: None,
        }
    }
}

/// Multi-year forecast simulator.
///
/// # Example
/// ```no_run
/// use demcast::model::GrowthModel;
/// use demcast::simulate::Simulator;
/// use demcast::core::Indicators;
///
/// let model: GrowthModel = train_model();
/// let initial = Indicators { population: Some(98.8e6), ..Default::default() };
///
/// let trajectory = Simulator::new().run(&model, 2025, &initial, 10).unwrap();
/// assert_eq!(trajectory.horizon(), 10);
/// # fn train_model() -> GrowthModel { GrowthModel::default() }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    drift: DriftPolicy,
    /// Overrides the derived anchor year when set.
    anchor_year: Option<i32>,
}

impl Simulator {
    /// Simulator with the default drift policy and a derived anchor year.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the drift policy.
    pub fn with_drift(mut self, drift: DriftPolicy) -> Self {
        self.drift = drift;
        self
    }

    /// Pin the anchor year instead of deriving it from the input.
    pub fn with_anchor_year(mut self, year: i32) -> Self {
        self.anchor_year = Some(year);
        self
    }

    /// Run the simulation loop for `years` steps from `initial`.
    ///
    /// Emitted points are dated `anchor + 1 ..= anchor + years`, where
    /// the anchor is `base_year` unless pinned. Each point carries the
    /// pre-drift birth/death rates that produced its prediction. Errors
    /// from the model abort the whole trajectory; no prefix is returned.
    pub fn run(
        &self,
        model: &GrowthModel,
        base_year: i32,
        initial: &Indicators,
        years: usize,
    ) -> Result<ForecastTrajectory> {
        let anchor = self.anchor_year.unwrap_or(base_year);
        let mut state = SimulationState::from_indicators(initial);
        let mut trajectory = ForecastTrajectory::with_horizon(years);

        for t in 1..=years {
            let growth_rate = model.predict(&state.snapshot())?;
            let new_population = state.population * (1.0 + growth_rate / 100.0);

            let point = ForecastPoint {
                year: anchor + t as i32,
                population: new_population,
                growth_rate,
                birth_rate: state.birth_rate,
                death_rate: state.death_rate,
            };

            self.drift.advance(&mut state);
            state.population = new_population;
            trajectory.push(point);
        }

        log::debug!(
            "simulated {} years from anchor {} (final population {:.0})",
            years,
            anchor,
            trajectory.final_population().unwrap_or(state.population)
        );
        Ok(trajectory)
    }
}
