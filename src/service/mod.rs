//! Forecast service facade: the surface consumed by the host transport
//! layer.
//!
//! Owns the active model behind an explicit, injectable handle. Training
//! builds a fresh model outside the lock and swaps it in under a write
//! lock, so a concurrent prediction never observes a model mid-swap.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::context::{fuse, ContextualAdjuster, ContextualAdjustment};
use crate::core::{CountryHistory, CountryRecord, ForecastTrajectory};
use crate::error::{ForecastError, Result};
use crate::model::{GrowthModel, ModelConfig, TrainingMetrics};
use crate::simulate::Simulator;
use crate::storage::Storage;

/// A completed forecast with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutcome {
    pub trajectory: ForecastTrajectory,
    /// Training metrics of the model that produced the trajectory.
    pub metrics: Option<TrainingMetrics>,
    /// Present whenever contextual adjustment was requested, including
    /// no-op tiers, so callers can observe degradation.
    pub adjustment: Option<ContextualAdjustment>,
}

/// Snapshot of the active model's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub trained: bool,
    pub metrics: Option<TrainingMetrics>,
    pub feature_importance: Option<BTreeMap<String, f64>>,
}

/// The produced service surface: train, forecast, model status.
///
/// # Example
/// ```no_run
/// use demcast::core::{CountryHistory, CountryRecord, Indicators};
/// use demcast::service::ForecastService;
///
/// let service = ForecastService::new();
/// let countries: Vec<CountryHistory> = load_countries();
/// service.train(&countries).unwrap();
///
/// let record = CountryRecord {
///     country_code: "VN".into(),
///     country_name: "Viet Nam".into(),
///     year: 2025,
///     indicators: Indicators { population: Some(98.8e6), ..Default::default() },
/// };
/// let outcome = service.forecast(&record, 10, false).unwrap();
/// assert_eq!(outcome.trajectory.horizon(), 10);
/// # fn load_countries() -> Vec<CountryHistory> { vec![] }
/// ```
pub struct ForecastService {
    model: Arc<RwLock<GrowthModel>>,
    model_config: ModelConfig,
    simulator: Simulator,
    adjuster: Option<ContextualAdjuster>,
    storage: Option<Box<dyn Storage>>,
}

impl ForecastService {
    /// Service with a fresh untrained model and default configuration.
    pub fn new() -> Self {
        let model_config = ModelConfig::default();
        Self {
            model: Arc::new(RwLock::new(GrowthModel::new(model_config.clone()))),
            model_config,
            simulator: Simulator::new(),
            adjuster: None,
            storage: None,
        }
    }

    /// Use a specific model configuration for future training runs.
    pub fn with_model_config(mut self, config: ModelConfig) -> Self {
        self.model_config = config.clone();
        self.model = Arc::new(RwLock::new(GrowthModel::new(config)));
        self
    }

    /// Replace the simulator (drift policy, anchor pinning).
    pub fn with_simulator(mut self, simulator: Simulator) -> Self {
        self.simulator = simulator;
        self
    }

    /// Attach a contextual retrieval adjuster.
    pub fn with_adjuster(mut self, adjuster: ContextualAdjuster) -> Self {
        self.adjuster = Some(adjuster);
        self
    }

    /// Attach a storage collaborator for best-effort metrics writes.
    pub fn with_storage(mut self, storage: Box<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// The shared model handle. Clones observe swap-on-train.
    pub fn model_handle(&self) -> Arc<RwLock<GrowthModel>> {
        Arc::clone(&self.model)
    }

    /// Train a fresh model and atomically replace the active one.
    ///
    /// The expensive fit runs outside the lock; readers keep using the
    /// previous model until the swap. Metrics are also written to the
    /// storage collaborator, best effort.
    pub fn train(&self, countries: &[CountryHistory]) -> Result<TrainingMetrics> {
        let mut fresh = GrowthModel::new(self.model_config.clone());
        let metrics = fresh.train(countries)?;

        *self.write_model()? = fresh;

        if let Some(storage) = &self.storage {
            let version = format!("v1.0_{}", Utc::now().format("%Y%m%d"));
            if let Err(err) = storage.save_metrics(&version, &metrics) {
                log::warn!("failed to persist training metrics: {err}");
            }
        }

        Ok(metrics)
    }

    /// Forecast a country's population trajectory.
    ///
    /// With `use_adjustment`, the retrieval adjuster perturbs the input
    /// indicators before simulation and the adjustment object travels
    /// with the outcome.
    pub fn forecast(
        &self,
        country: &CountryRecord,
        years: usize,
        use_adjustment: bool,
    ) -> Result<ForecastOutcome> {
        let mut inputs = country.indicators.clone();
        let mut adjustment = None;

        if use_adjustment {
            match &self.adjuster {
                Some(adjuster) => {
                    let adj = adjuster.adjust(
                        &country.country_code,
                        &country.country_name,
                        &country.indicators,
                    );
                    log::debug!(
                        "contextual adjustment for {}: tier {:?}, {} deltas",
                        country.country_code,
                        adj.tier,
                        adj.deltas.len()
                    );
                    inputs = fuse(&country.indicators, &adj);
                    adjustment = Some(adj);
                }
                None => {
                    log::warn!("contextual adjustment requested but no adjuster is configured");
                }
            }
        }

        let model = self.read_model()?;
        let trajectory: ForecastTrajectory =
            self.simulator.run(&model, country.year, &inputs, years)?;
        let metrics = model.metrics().cloned();

        Ok(ForecastOutcome {
            trajectory,
            metrics,
            adjustment,
        })
    }

    /// Report the active model's state.
    pub fn model_status(&self) -> Result<ModelStatus> {
        let model = self.read_model()?;
        Ok(ModelStatus {
            trained: model.is_trained(),
            metrics: model.metrics().cloned(),
            feature_importance: if model.is_trained() {
                Some(model.feature_importance().clone())
            } else {
                None
            },
        })
    }

    /// Persist the active model bundle.
    pub fn save_model(&self, path: &Path) -> Result<()> {
        self.read_model()?.save(path)
    }

    /// Restore the active model from a bundle, replacing the held one.
    pub fn load_model(&self, path: &Path) -> Result<()> {
        let mut loaded = GrowthModel::new(self.model_config.clone());
        loaded.load(path)?;
        *self.write_model()? = loaded;
        Ok(())
    }

    fn read_model(&self) -> Result<std::sync::RwLockReadGuard<'_, GrowthModel>> {
        self.model
            .read()
            .map_err(|_| ForecastError::ComputationError("model lock poisoned".to_string()))
    }

    fn write_model(&self) -> Result<std::sync::RwLockWriteGuard<'_, GrowthModel>> {
        self.model
            .write()
            .map_err(|_| ForecastError::ComputationError("model lock poisoned".to_string()))
    }
}

impl Default for ForecastService {
    fn default() -> Self {
        Self::new()
    }
}
