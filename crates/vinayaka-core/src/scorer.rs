// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Confidence Scorer (Provenance-Weighted Similarity)
// ─────────────────────────────────────────────────────────────────────
//! Provenance-weighted confidence for a retrieved fact.
//!
//! `P = S · C · R · W` where `S` is the cosine similarity between the
//! query embedding and the truth embedding, and `C` (corroboration),
//! `R` (recency), `W` (source weight) come from a pluggable
//! `ProvenanceModel`. The default model fixes all three at 1.0.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vinayaka_types::{InterventionConfig, InterventionError, InterventionResult, MemoryContext};

pub const DEFAULT_EPSILON: f32 = 1e-9;

/// `dot(a, b) / (‖a‖·‖b‖ + eps)`.
///
/// Accumulates in f64. Near-zero vectors yield ~0 instead of a division
/// fault. Mismatched lengths are rejected; NaN/Inf input surfaces as
/// `Numerical`.
pub fn cosine_similarity(a: &[f32], b: &[f32], eps: f32) -> InterventionResult<f32> {
    if a.len() != b.len() {
        return Err(InterventionError::DimensionMismatch {
            expected: b.len(),
            got: a.len(),
        });
    }
    checked_cosine(a, b, eps).ok_or_else(|| {
        InterventionError::Numerical("cosine similarity is not finite".to_string())
    })
}

/// Allocation-free cosine similarity: `None` for mismatched lengths or
/// a non-finite result.
pub fn checked_cosine(a: &[f32], b: &[f32], eps: f32) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(d, na, nb), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (d + x * y, na + x * x, nb + y * y)
        },
    );
    let sim = dot / (norm_a.sqrt() * norm_b.sqrt() + f64::from(eps));
    sim.is_finite().then_some(sim as f32)
}

/// The `C · R · W` multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub corroboration: f32,
    pub recency: f32,
    pub source_weight: f32,
}

impl Provenance {
    /// Neutral provenance: similarity passes through unchanged.
    pub const NEUTRAL: Provenance = Provenance {
        corroboration: 1.0,
        recency: 1.0,
        source_weight: 1.0,
    };

    /// Constant hardwired by the cross-boundary graph-walk kernel.
    pub const REFERENCE: Provenance = Provenance {
        corroboration: 0.95,
        recency: 1.0,
        source_weight: 1.0,
    };

    pub fn new(corroboration: f32, recency: f32, source_weight: f32) -> InterventionResult<Self> {
        for (name, v) in [
            ("corroboration", corroboration),
            ("recency", recency),
            ("source_weight", source_weight),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(InterventionError::InvalidParameter(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        Ok(Self {
            corroboration,
            recency,
            source_weight,
        })
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.corroboration * self.recency * self.source_weight
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Per-fact metadata a retrieval backend attaches to each candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactMetadata {
    /// Graph centrality of the fact node, used as corroboration.
    pub centrality: f32,
    pub recency: f32,
    pub weight: f32,
    pub source: Option<String>,
}

impl Default for FactMetadata {
    fn default() -> Self {
        Self {
            centrality: 1.0,
            recency: 1.0,
            weight: 1.0,
            source: None,
        }
    }
}

/// Extension point for corroboration, recency, and source weight.
pub trait ProvenanceModel: Send + Sync {
    fn provenance(&self, fact: &FactMetadata) -> Provenance;
}

/// Ignores metadata and returns a constant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProvenance(pub Provenance);

impl ProvenanceModel for FixedProvenance {
    fn provenance(&self, _fact: &FactMetadata) -> Provenance {
        self.0
    }
}

/// Reads the factors straight from the candidate's metadata, clamped
/// into [0, 1]. Non-finite factors count as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataProvenance;

impl ProvenanceModel for MetadataProvenance {
    fn provenance(&self, fact: &FactMetadata) -> Provenance {
        let unit = |v: f32| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Provenance {
            corroboration: unit(fact.centrality),
            recency: unit(fact.recency),
            source_weight: unit(fact.weight),
        }
    }
}

/// A retrieved fact awaiting scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCandidate {
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: FactMetadata,
}

impl FactCandidate {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            metadata: FactMetadata::default(),
        }
    }

    pub fn with_metadata(embedding: Vec<f32>, metadata: FactMetadata) -> Self {
        Self {
            embedding,
            metadata,
        }
    }
}

/// Winner of `ConfidenceScorer::select`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredFact {
    /// Position in the candidate slice.
    pub index: usize,
    /// Provenance-weighted score P.
    pub score: f32,
}

impl ScoredFact {
    /// Active memory context carrying the winning embedding.
    pub fn into_memory(self, candidates: &[FactCandidate]) -> InterventionResult<MemoryContext> {
        let candidate = candidates.get(self.index).ok_or_else(|| {
            InterventionError::InvalidParameter(format!(
                "scored index {} outside {} candidates",
                self.index,
                candidates.len()
            ))
        })?;
        MemoryContext::from_score(candidate.embedding.clone(), self.score)
    }
}

/// Provenance-weighted similarity scorer.
///
/// Thread-safe: holds only an immutable epsilon and a shared model.
#[derive(Clone)]
pub struct ConfidenceScorer {
    epsilon: f32,
    provenance: Arc<dyn ProvenanceModel>,
}

impl ConfidenceScorer {
    pub fn new(epsilon: f32, provenance: Arc<dyn ProvenanceModel>) -> Self {
        Self {
            epsilon,
            provenance,
        }
    }

    /// Neutral provenance with the configured epsilon.
    pub fn from_config(config: &InterventionConfig) -> Self {
        Self::new(
            config.similarity_epsilon,
            Arc::new(FixedProvenance(Provenance::NEUTRAL)),
        )
    }

    /// Same constants as the C ABI graph-walk kernel.
    pub fn reference() -> Self {
        Self::new(DEFAULT_EPSILON, Arc::new(FixedProvenance(Provenance::REFERENCE)))
    }

    pub fn with_provenance(mut self, provenance: Arc<dyn ProvenanceModel>) -> Self {
        self.provenance = provenance;
        self
    }

    /// Confidence of `truth` for `query` under default metadata.
    pub fn score(&self, query: &[f32], truth: &[f32]) -> InterventionResult<f32> {
        self.weighted(query, truth, &FactMetadata::default())
    }

    /// Confidence of one candidate for `query`.
    pub fn score_fact(&self, query: &[f32], fact: &FactCandidate) -> InterventionResult<f32> {
        self.weighted(query, &fact.embedding, &fact.metadata)
    }

    /// Highest-P candidate. Ties keep the earlier candidate; an empty
    /// slice yields `None`. Any malformed candidate fails the call.
    pub fn select(
        &self,
        query: &[f32],
        candidates: &[FactCandidate],
    ) -> InterventionResult<Option<ScoredFact>> {
        let mut best: Option<ScoredFact> = None;
        for (index, fact) in candidates.iter().enumerate() {
            let score = self.score_fact(query, fact)?;
            if best.map_or(true, |b| score > b.score) {
                best = Some(ScoredFact { index, score });
            }
        }
        if let Some(b) = best {
            log::debug!(
                "selected fact {} of {} (P = {:.4})",
                b.index,
                candidates.len(),
                b.score
            );
        }
        Ok(best)
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    fn weighted(
        &self,
        query: &[f32],
        truth: &[f32],
        metadata: &FactMetadata,
    ) -> InterventionResult<f32> {
        let similarity = cosine_similarity(query, truth, self.epsilon)?;
        let p = similarity * self.provenance.provenance(metadata).weight();
        if !p.is_finite() {
            log::warn!("provenance weighting produced non-finite score");
            return Err(InterventionError::Numerical(format!(
                "provenance score is not finite ({p})"
            )));
        }
        Ok(p)
    }
}

impl std::fmt::Debug for ConfidenceScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidenceScorer")
            .field("epsilon", &self.epsilon)
            .finish_non_exhaustive()
    }
}
