//! # demcast
//!
//! Demographic trajectory forecasting: a gradient-boosted growth model
//! over engineered indicator features, an iterative multi-year simulator
//! with a fixed drift policy, and a retrieval-augmented adjuster that
//! perturbs forecast inputs from recent context documents before
//! simulation.

pub mod context;
pub mod core;
pub mod error;
pub mod features;
pub mod insight;
pub mod model;
pub mod service;
pub mod simulate;
pub mod storage;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::context::{
        fuse, AdjustmentTier, ContextualAdjuster, ContextualAdjustment, InMemoryIndex,
    };
    pub use crate::core::{
        CountryHistory, CountryRecord, ForecastPoint, ForecastTrajectory, Indicators,
    };
    pub use crate::error::{ForecastError, Result};
    pub use crate::model::{GrowthModel, TrainingMetrics};
    pub use crate::service::{ForecastOutcome, ForecastService, ModelStatus};
    pub use crate::simulate::{DriftPolicy, Simulator};
}
