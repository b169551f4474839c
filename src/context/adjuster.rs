//! Contextual retrieval adjuster.
//!
//! Given a country and its current indicator snapshot, decides whether
//! recent context documents should perturb the forecast inputs. Degrades
//! through three tiers (generative, keyword-rule, no-op) and never
//! fails: a missing capability or empty retrieval produces a well-formed
//! no-op adjustment.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::context::{
    AdjustmentTier, ContextDocument, ContextualAdjustment, Embedder, RetrievedDocument,
    TextGenerator, VectorIndex,
};
use crate::core::Indicators;
use crate::error::Result;

/// Pro-natal policy terms: raise birth and fertility expectations.
const PRO_NATAL_TERMS: [&str; 3] = ["khuyến sinh", "tăng sinh", "trợ cấp sinh con"];
/// Pandemic and disaster terms: raise death-rate expectations.
const PANDEMIC_TERMS: [&str; 3] = ["đại dịch", "dịch bệnh", "thiên tai"];
/// Growth and investment terms: raise GDP expectations.
const GROWTH_TERMS: [&str; 3] = ["tăng trưởng kinh tế", "phát triển", "đầu tư"];

/// Tuning for the retrieval step.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjusterConfig {
    /// Number of context documents retrieved per request.
    pub top_k: usize,
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Retrieval-augmented adjuster over boxed capability seams.
///
/// # Example
/// ```
/// use demcast::context::{ContextualAdjuster, InMemoryIndex};
/// use demcast::core::Indicators;
/// # use demcast::context::Embedder;
/// # use demcast::error::Result;
/// # struct Fake;
/// # impl Embedder for Fake {
/// #     fn embed(&self, _text: &str) -> Result<Vec<f32>> { Ok(vec![1.0]) }
/// # }
///
/// let adjuster = ContextualAdjuster::new(Box::new(Fake), Box::new(InMemoryIndex::new()));
/// let adjustment = adjuster.adjust("VN", "Viet Nam", &Indicators::default());
///
/// // No documents indexed: the expected no-op outcome, not an error.
/// assert!(adjustment.is_empty());
/// assert_eq!(adjustment.confidence, 0.0);
/// ```
pub struct ContextualAdjuster {
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    generator: Option<Box<dyn TextGenerator>>,
    config: AdjusterConfig,
}

/// Structured payload requested from the text-generation capability.
#[derive(Debug, Deserialize)]
struct GeneratedAdjustment {
    adjustments: BTreeMap<String, f64>,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    confidence: f64,
}

impl ContextualAdjuster {
    /// Create an adjuster over an embedder and a vector index, with no
    /// generative capability.
    pub fn new(embedder: Box<dyn Embedder>, index: Box<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            generator: None,
            config: AdjusterConfig::default(),
        }
    }

    /// Attach a text-generation capability for the top tier.
    pub fn with_generator(mut self, generator: Box<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Override retrieval tuning.
    pub fn with_config(mut self, config: AdjusterConfig) -> Self {
        self.config = config;
        self
    }

    /// Embed and index a context document for later retrieval.
    pub fn add_document(
        &mut self,
        country_code: &str,
        title: &str,
        body: &str,
        source: &str,
        published: NaiveDate,
    ) -> Result<()> {
        let embedding = self.embedder.embed(&format!("{title}\n{body}"))?;
        self.index.insert(ContextDocument {
            country_code: country_code.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            source: source.to_string(),
            published,
            embedding,
        })
    }

    /// Derive an adjustment for the country's current indicator snapshot.
    ///
    /// Always returns a well-formed adjustment; capability failures and
    /// empty retrievals degrade the tier instead of raising.
    pub fn adjust(
        &self,
        country_code: &str,
        country_name: &str,
        current: &Indicators,
    ) -> ContextualAdjustment {
        let query = format!(
            "dân số {country_name} chính sách khuyến sinh đại dịch thay đổi nhân khẩu"
        );

        let embedding = match self.embedder.embed(&query) {
            Ok(embedding) => embedding,
            Err(err) => {
                log::warn!("embedding unavailable, returning no-op adjustment: {err}");
                return ContextualAdjustment::no_op("no relevant context found");
            }
        };

        let retrieved = match self
            .index
            .query(&embedding, self.config.top_k, Some(country_code))
        {
            Ok(retrieved) => retrieved,
            Err(err) => {
                log::warn!("vector index unavailable, returning no-op adjustment: {err}");
                return ContextualAdjustment::no_op("no relevant context found");
            }
        };

        if retrieved.is_empty() {
            return ContextualAdjustment::no_op("no relevant context found");
        }

        if let Some(generator) = &self.generator {
            let prompt = build_prompt(country_name, current, &retrieved);
            match generator.complete(&prompt) {
                Ok(text) => {
                    if let Some(adjustment) = parse_generated(&text) {
                        return adjustment;
                    }
                    log::warn!("unparseable generated adjustment, using rule-based tier");
                }
                Err(err) => {
                    log::warn!("text generation failed, using rule-based tier: {err}");
                }
            }
        }

        rule_based_analysis(&retrieved, current)
    }
}

/// Build the structured prompt for the generative tier.
fn build_prompt(
    country_name: &str,
    current: &Indicators,
    retrieved: &[RetrievedDocument],
) -> String {
    let mut context_lines = String::new();
    for hit in retrieved {
        context_lines.push_str(&format!(
            "- {} ({})\n",
            hit.document.title, hit.document.source
        ));
    }

    format!(
        "I am forecasting the population of {country_name} with a boosted-tree \
         regression model.\n\n\
         Current inputs:\n\
         - birthRate: {birth}\n\
         - deathRate: {death}\n\
         - gdpPerCapita: {gdp}\n\
         - fertilityRate: {fertility}\n\n\
         Recent news and policy context:\n{context_lines}\n\
         Based on this context, propose additive adjustments to the model \
         inputs. Respond with strict JSON only, in the form:\n\
         {{\"adjustments\": {{\"birthRate\": 0.5}}, \"reasoning\": \"...\", \
         \"confidence\": 0.8}}",
        birth = current.birth_rate.unwrap_or(0.0),
        death = current.death_rate.unwrap_or(0.0),
        gdp = current.gdp_per_capita.unwrap_or(0.0),
        fertility = current.fertility_rate.unwrap_or(0.0),
    )
}

/// Extract the structured payload from free-form generated text.
///
/// Brace-scanning is a last resort for backends that wrap the JSON in
/// prose; any parse failure routes the caller to the rule-based tier.
fn parse_generated(text: &str) -> Option<ContextualAdjustment> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let payload: GeneratedAdjustment = serde_json::from_str(&text[start..=end]).ok()?;
    Some(ContextualAdjustment {
        deltas: payload.adjustments,
        rationale: payload.reasoning,
        confidence: payload.confidence.clamp(0.0, 1.0),
        tier: AdjustmentTier::Generative,
    })
}

/// Deterministic keyword-rule fallback over retrieved document bodies.
fn rule_based_analysis(
    retrieved: &[RetrievedDocument],
    current: &Indicators,
) -> ContextualAdjustment {
    let text = retrieved
        .iter()
        .map(|hit| hit.document.body.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut deltas = BTreeMap::new();
    let mut rationale_parts = Vec::new();

    if PRO_NATAL_TERMS.iter().any(|term| text.contains(term)) {
        deltas.insert("birthRate".to_string(), 0.3);
        deltas.insert("fertilityRate".to_string(), 0.2);
        rationale_parts.push("pro-natal policy signals detected");
    }
    if PANDEMIC_TERMS.iter().any(|term| text.contains(term)) {
        deltas.insert("deathRate".to_string(), 0.5);
        rationale_parts.push("pandemic or disaster signals detected");
    }
    if GROWTH_TERMS.iter().any(|term| text.contains(term)) {
        let gdp = current.gdp_per_capita.unwrap_or(0.0);
        deltas.insert("gdpPerCapita".to_string(), gdp * 0.05);
        rationale_parts.push("economic growth signals detected");
    }

    let confidence = if deltas.is_empty() { 0.3 } else { 0.6 };
    let rationale = if rationale_parts.is_empty() {
        "no significant change detected".to_string()
    } else {
        rationale_parts.join(". ")
    };

    ContextualAdjustment {
        deltas,
        rationale,
        confidence,
        tier: AdjustmentTier::RuleBased,
    }
}
