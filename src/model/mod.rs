//! Growth regression model: training data preparation, the boosted-tree
//! regressor, metrics, and the train/predict/persist wrapper.

mod regressor;

pub mod gbt;
pub mod metrics;
pub mod training;
pub mod wrapper;

pub use gbt::{GbtConfig, GradientBoostedTrees};
pub use metrics::{regression_metrics, RegressionMetrics, TrainingMetrics};
pub use regressor::Regressor;
pub use training::{prepare_training_data, AugmentationConfig, TrainingSample};
pub use wrapper::{GrowthModel, ModelConfig};
