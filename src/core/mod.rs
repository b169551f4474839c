//! Core data structures for demographic forecasting.

pub mod country;
pub mod trajectory;

pub use country::{CountryHistory, CountryRecord, HistoricalYear, Indicators};
pub use trajectory::{ForecastPoint, ForecastTrajectory};
