//! Retrieval-augmented contextual adjustment of forecast inputs.
//!
//! The adjuster consumes three external capabilities behind boxed trait
//! seams: an embedder, a vector index, and a text generator. All of
//! them are best-effort: a failing or absent capability degrades the
//! adjustment tier, never the forecast.

pub mod adjuster;
pub mod fusion;
pub mod memory;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use adjuster::{AdjusterConfig, ContextualAdjuster};
pub use fusion::fuse;
pub use memory::InMemoryIndex;

/// Text embedding capability. Externally supplied; the embedding model
/// is not standardized here.
pub trait Embedder {
    /// Embed a text into a dense vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Nearest-neighbor search capability over context documents.
pub trait VectorIndex {
    /// Insert a document (with its embedding) into the index.
    fn insert(&mut self, document: ContextDocument) -> Result<()>;

    /// Return up to `k` documents ranked by similarity to `embedding`,
    /// optionally filtered by country code.
    fn query(
        &self,
        embedding: &[f32],
        k: usize,
        country_code: Option<&str>,
    ) -> Result<Vec<RetrievedDocument>>;
}

/// Synchronous, best-effort text completion capability.
pub trait TextGenerator {
    /// Complete a prompt into free-form text.
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// A persisted context document (news or policy text) for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    pub country_code: String,
    pub title: String,
    pub body: String,
    pub source: String,
    pub published: NaiveDate,
    pub embedding: Vec<f32>,
}

/// One ranked retrieval candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub document: ContextDocument,
    /// Cosine similarity to the query embedding.
    pub score: f64,
}

/// Which fallback tier produced an adjustment.
///
/// Degradation order is `Generative` → `RuleBased` → `NoOp`; the tier is
/// reported alongside the forecast, it is not an error condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentTier {
    /// Structured response from the text-generation capability.
    Generative,
    /// Deterministic keyword-rule analysis of retrieved documents.
    RuleBased,
    /// No relevant context, or retrieval itself was unavailable.
    NoOp,
}

/// Additive deltas to forecast inputs derived from retrieved context.
///
/// Transient: produced per prediction request and reported with the
/// forecast, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualAdjustment {
    /// Indicator wire name to additive delta.
    pub deltas: BTreeMap<String, f64>,
    pub rationale: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    pub tier: AdjustmentTier,
}

impl ContextualAdjustment {
    /// An empty adjustment with zero confidence.
    pub fn no_op(rationale: impl Into<String>) -> Self {
        Self {
            deltas: BTreeMap::new(),
            rationale: rationale.into(),
            confidence: 0.0,
            tier: AdjustmentTier::NoOp,
        }
    }

    /// Whether the adjustment carries no deltas.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}
