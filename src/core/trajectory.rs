//! Forecast trajectory containers.

use serde::{Deserialize, Serialize};

/// One simulated year of a population forecast.
///
/// `birth_rate` and `death_rate` are the pre-drift values that produced
/// this step's prediction, not the values after the drift policy aged the
/// state for the next step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub year: i32,
    pub population: f64,
    /// Predicted single-year growth rate, in percent.
    pub growth_rate: f64,
    pub birth_rate: f64,
    pub death_rate: f64,
}

/// An ordered multi-year forecast, one point per simulated year.
///
/// Trajectories are always full-horizon: a failure mid-simulation aborts
/// the whole forecast rather than returning a prefix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastTrajectory {
    points: Vec<ForecastPoint>,
}

impl ForecastTrajectory {
    /// Create an empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trajectory with capacity for `horizon` points.
    pub fn with_horizon(horizon: usize) -> Self {
        Self {
            points: Vec::with_capacity(horizon),
        }
    }

    /// Append a simulated point.
    pub fn push(&mut self, point: ForecastPoint) {
        self.points.push(point);
    }

    /// Number of simulated years.
    pub fn horizon(&self) -> usize {
        self.points.len()
    }

    /// Whether the trajectory holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points, in year order.
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// The final simulated point, if any.
    pub fn last(&self) -> Option<&ForecastPoint> {
        self.points.last()
    }

    /// Population at the end of the horizon.
    pub fn final_population(&self) -> Option<f64> {
        self.points.last().map(|p| p.population)
    }

    /// Mean predicted growth rate across the horizon, in percent.
    pub fn mean_growth_rate(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        let sum: f64 = self.points.iter().map(|p| p.growth_rate).sum();
        Some(sum / self.points.len() as f64)
    }
}

impl<'a> IntoIterator for &'a ForecastTrajectory {
    type Item = &'a ForecastPoint;
    type IntoIter = std::slice::Iter<'a, ForecastPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
