// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Memory Context
// ─────────────────────────────────────────────────────────────────────
//! The per-step carrier of a retrieved fact: its embedding, the trust
//! placed in it, and whether a fact was retrieved at all.

use serde::{Deserialize, Serialize};

use crate::error::{InterventionError, InterventionResult};

/// Truth embedding plus the confidence that gates every operator.
///
/// Immutable once built. Construction validates the invariants the
/// operators rely on, so operators only re-check the guard and the
/// target tensor's length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMemoryContext", into = "RawMemoryContext")]
pub struct MemoryContext {
    truth_vector: Vec<f32>,
    confidence: f32,
    is_active: bool,
}

/// Unvalidated wire form.
#[derive(Serialize, Deserialize)]
struct RawMemoryContext {
    truth_vector: Vec<f32>,
    confidence: f32,
    is_active: bool,
}

impl TryFrom<RawMemoryContext> for MemoryContext {
    type Error = InterventionError;

    fn try_from(raw: RawMemoryContext) -> InterventionResult<Self> {
        Self::new(raw.truth_vector, raw.confidence, raw.is_active)
    }
}

impl From<MemoryContext> for RawMemoryContext {
    fn from(mem: MemoryContext) -> Self {
        Self {
            truth_vector: mem.truth_vector,
            confidence: mem.confidence,
            is_active: mem.is_active,
        }
    }
}

impl MemoryContext {
    /// Build a context, rejecting malformed confidence and, for active
    /// contexts, empty or non-finite truth vectors.
    pub fn new(truth_vector: Vec<f32>, confidence: f32, is_active: bool) -> InterventionResult<Self> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            log::warn!("rejecting memory context with confidence {confidence}");
            return Err(InterventionError::InvalidConfidence(confidence));
        }
        if is_active {
            if truth_vector.is_empty() {
                return Err(InterventionError::EmptyTruthVector);
            }
            if let Some(pos) = truth_vector.iter().position(|v| !v.is_finite()) {
                return Err(InterventionError::Numerical(format!(
                    "truth_vector[{pos}] is not finite"
                )));
            }
        }
        Ok(Self {
            truth_vector,
            confidence,
            is_active,
        })
    }

    /// Context for a step where no relevant fact was retrieved.
    pub fn inactive() -> Self {
        Self {
            truth_vector: Vec::new(),
            confidence: 0.0,
            is_active: false,
        }
    }

    /// Active context from a raw provenance score.
    ///
    /// The score is clamped into [0, 1]: a negative similarity never
    /// earns trust, and provenance factors cap it at 1.
    pub fn from_score(truth_vector: Vec<f32>, score: f32) -> InterventionResult<Self> {
        if score.is_nan() {
            return Err(InterventionError::Numerical(
                "provenance score is NaN".to_string(),
            ));
        }
        Self::new(truth_vector, score.clamp(0.0, 1.0), true)
    }

    pub fn truth_vector(&self) -> &[f32] {
        &self.truth_vector
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Embedding dimension D.
    pub fn dim(&self) -> usize {
        self.truth_vector.len()
    }

    /// Guard shared by every operator. The floor is inclusive.
    #[inline]
    pub fn passes(&self, floor: f32) -> bool {
        self.is_active && self.confidence >= floor
    }
}

impl Default for MemoryContext {
    fn default() -> Self {
        Self::inactive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let mem = MemoryContext::new(vec![1.0, 2.0], 0.9, true).unwrap();
        assert_eq!(mem.dim(), 2);
        assert!(mem.is_active());
        assert_eq!(mem.confidence(), 0.9);
    }

    #[test]
    fn test_confidence_above_one_rejected() {
        let err = MemoryContext::new(vec![1.0], 1.01, true).unwrap_err();
        assert_eq!(err, InterventionError::InvalidConfidence(1.01));
    }

    #[test]
    fn test_negative_confidence_rejected() {
        assert!(MemoryContext::new(vec![1.0], -0.1, false).is_err());
    }

    #[test]
    fn test_nan_confidence_rejected() {
        assert!(MemoryContext::new(vec![1.0], f32::NAN, true).is_err());
    }

    #[test]
    fn test_active_requires_truth() {
        let err = MemoryContext::new(Vec::new(), 0.9, true).unwrap_err();
        assert_eq!(err, InterventionError::EmptyTruthVector);
    }

    #[test]
    fn test_inactive_allows_empty_truth() {
        let mem = MemoryContext::new(Vec::new(), 0.9, false).unwrap();
        assert!(!mem.passes(0.0));
    }

    #[test]
    fn test_non_finite_truth_rejected() {
        let err = MemoryContext::new(vec![1.0, f32::INFINITY], 0.9, true).unwrap_err();
        assert!(matches!(err, InterventionError::Numerical(_)));
    }

    #[test]
    fn test_passes_inclusive_floor() {
        let mem = MemoryContext::new(vec![1.0], 0.5, true).unwrap();
        assert!(mem.passes(0.5));
        assert!(!mem.passes(0.6));
    }

    #[test]
    fn test_from_score_clamps() {
        let neg = MemoryContext::from_score(vec![1.0], -0.4).unwrap();
        assert_eq!(neg.confidence(), 0.0);
        let high = MemoryContext::from_score(vec![1.0], 1.3).unwrap();
        assert_eq!(high.confidence(), 1.0);
        assert!(MemoryContext::from_score(vec![1.0], f32::NAN).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: MemoryContext =
            serde_json::from_str(r#"{"truth_vector":[1.0],"confidence":0.7,"is_active":true}"#)
                .unwrap();
        assert_eq!(ok.confidence(), 0.7);
        let bad = serde_json::from_str::<MemoryContext>(
            r#"{"truth_vector":[1.0],"confidence":2.0,"is_active":true}"#,
        );
        assert!(bad.is_err());
    }
}
