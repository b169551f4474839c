//! Consumed storage collaborator interface.
//!
//! The persistent store (records, metrics history) lives outside this
//! crate; the core only sees this trait. Implementations are expected to
//! use interior mutability (connection handles, pools), so every method
//! takes `&self`.

use crate::core::CountryRecord;
use crate::error::Result;
use crate::model::TrainingMetrics;

/// Storage operations the core consumes.
pub trait Storage {
    /// List country records, optionally restricted to one country code.
    fn list_country_records(&self, country_code: Option<&str>) -> Result<Vec<CountryRecord>>;

    /// Insert or update a record keyed by `(country_code, year)`.
    fn upsert_country_record(&self, record: CountryRecord) -> Result<()>;

    /// Record a training run's metrics under a model version label.
    fn save_metrics(&self, model_version: &str, metrics: &TrainingMetrics) -> Result<()>;
}
