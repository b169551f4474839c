//! In-memory cosine-similarity vector index.
//!
//! A reference implementation of [`VectorIndex`] for tests and embedded
//! deployments; production setups plug a real index behind the same
//! trait.

use crate::context::{ContextDocument, RetrievedDocument, VectorIndex};
use crate::error::Result;

/// Linear-scan vector index holding documents in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndex {
    documents: Vec<ContextDocument>,
}

impl InMemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl VectorIndex for InMemoryIndex {
    fn insert(&mut self, document: ContextDocument) -> Result<()> {
        self.documents.push(document);
        Ok(())
    }

    fn query(
        &self,
        embedding: &[f32],
        k: usize,
        country_code: Option<&str>,
    ) -> Result<Vec<RetrievedDocument>> {
        let mut hits: Vec<RetrievedDocument> = self
            .documents
            .iter()
            .filter(|doc| country_code.map_or(true, |code| doc.country_code == code))
            .filter_map(|doc| {
                cosine_similarity(embedding, &doc.embedding).map(|score| RetrievedDocument {
                    document: doc.clone(),
                    score,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }
}

/// Cosine similarity, or `None` when either vector is degenerate.
fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return None;
    }
    Some(dot / denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn doc(code: &str, title: &str, embedding: Vec<f32>) -> ContextDocument {
        ContextDocument {
            country_code: code.to_string(),
            title: title.to_string(),
            body: String::new(),
            source: "test".to_string(),
            published: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            embedding,
        }
    }

    #[test]
    fn query_ranks_by_cosine_score() {
        let mut index = InMemoryIndex::new();
        index.insert(doc("VN", "far", vec![0.0, 1.0])).unwrap();
        index.insert(doc("VN", "near", vec![1.0, 0.1])).unwrap();
        index.insert(doc("VN", "mid", vec![1.0, 1.0])).unwrap();

        let hits = index.query(&[1.0, 0.0], 3, None).unwrap();
        let titles: Vec<&str> = hits.iter().map(|h| h.document.title.as_str()).collect();
        assert_eq!(titles, vec!["near", "mid", "far"]);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn query_truncates_to_k() {
        let mut index = InMemoryIndex::new();
        for i in 0..5 {
            index
                .insert(doc("VN", &format!("d{i}"), vec![1.0, i as f32]))
                .unwrap();
        }
        let hits = index.query(&[1.0, 0.0], 2, None).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn country_filter_excludes_other_countries() {
        let mut index = InMemoryIndex::new();
        index.insert(doc("VN", "vn doc", vec![1.0, 0.0])).unwrap();
        index.insert(doc("JP", "jp doc", vec![1.0, 0.0])).unwrap();

        let hits = index.query(&[1.0, 0.0], 10, Some("VN")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.country_code, "VN");
    }

    #[test]
    fn degenerate_embeddings_are_skipped() {
        let mut index = InMemoryIndex::new();
        index.insert(doc("VN", "zero", vec![0.0, 0.0])).unwrap();
        index.insert(doc("VN", "short", vec![1.0])).unwrap();
        index.insert(doc("VN", "ok", vec![1.0, 0.0])).unwrap();

        let hits = index.query(&[1.0, 0.0], 10, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.title, "ok");
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let sim = cosine_similarity(&[0.5, 0.5, 0.5], &[0.5, 0.5, 0.5]).unwrap();
        assert_relative_eq!(sim, 1.0, epsilon = 1e-12);
    }
}
