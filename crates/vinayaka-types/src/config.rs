// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Steering Kernel Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{InterventionError, InterventionResult};

/// Runtime configuration for the intervention operators.
///
/// Floors gate each operator; strengths and `alpha_base` scale the
/// mutation once a floor is met. This is the subset that crosses the
/// FFI boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    /// Attention bias fires when confidence >= this.
    /// Default: 0.5.
    pub attention_floor: f32,

    /// State correction fires when confidence >= this.
    /// Default: 0.5.
    pub state_floor: f32,

    /// Router bias fires when confidence >= this. Stricter than the
    /// attention floor because misrouting is hard to undo.
    /// Default: 0.6.
    pub router_floor: f32,

    /// Memory overwrite fires when confidence >= this. Highest floor,
    /// the overwrite is destructive.
    /// Default: 0.8.
    pub overwrite_floor: f32,

    /// Log-space bias added per unit of confidence to attention scores.
    /// Default: 10.0.
    pub attention_strength: f32,

    /// Bias added per unit of confidence to factual expert logits.
    /// Default: 5.0.
    pub router_strength: f32,

    /// Base interpolation factor for state correction.
    /// Default: 0.3.
    pub alpha_base: f32,

    /// Epsilon in the cosine denominator.
    /// Default: 1e-9.
    pub similarity_epsilon: f32,

    /// Number of events kept by `TraceObserver`.
    /// Default: 64.
    pub trace_capacity: usize,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            attention_floor: 0.5,
            state_floor: 0.5,
            router_floor: 0.6,
            overwrite_floor: 0.8,
            attention_strength: 10.0,
            router_strength: 5.0,
            alpha_base: 0.3,
            similarity_epsilon: 1e-9,
            trace_capacity: 64,
        }
    }
}

impl InterventionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> InterventionResult<()> {
        for (name, floor) in [
            ("attention_floor", self.attention_floor),
            ("state_floor", self.state_floor),
            ("router_floor", self.router_floor),
            ("overwrite_floor", self.overwrite_floor),
        ] {
            if !(0.0..=1.0).contains(&floor) {
                return Err(InterventionError::Config(format!(
                    "{name} must be in [0, 1], got {floor}"
                )));
            }
        }
        for (name, strength) in [
            ("attention_strength", self.attention_strength),
            ("router_strength", self.router_strength),
        ] {
            if !strength.is_finite() || strength < 0.0 {
                return Err(InterventionError::Config(format!(
                    "{name} must be finite and >= 0, got {strength}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.alpha_base) {
            return Err(InterventionError::Config(format!(
                "alpha_base must be in [0, 1], got {}",
                self.alpha_base
            )));
        }
        if !self.similarity_epsilon.is_finite() || self.similarity_epsilon <= 0.0 {
            return Err(InterventionError::Config(format!(
                "similarity_epsilon must be finite and > 0, got {}",
                self.similarity_epsilon
            )));
        }
        if self.trace_capacity < 1 {
            return Err(InterventionError::Config(format!(
                "trace_capacity must be >= 1, got {}",
                self.trace_capacity
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> InterventionResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| InterventionError::Config(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(InterventionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_floor_ordering_defaults() {
        let cfg = InterventionConfig::default();
        assert_eq!(cfg.attention_floor, 0.5);
        assert_eq!(cfg.state_floor, 0.5);
        assert_eq!(cfg.router_floor, 0.6);
        assert_eq!(cfg.overwrite_floor, 0.8);
    }

    #[test]
    fn test_floor_out_of_range() {
        let cfg = InterventionConfig {
            router_floor: 1.2,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("router_floor"));
    }

    #[test]
    fn test_nan_floor_rejected() {
        let cfg = InterventionConfig {
            attention_floor: f32::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_strength_rejected() {
        let cfg = InterventionConfig {
            router_strength: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_alpha_out_of_range() {
        let cfg = InterventionConfig {
            alpha_base: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_epsilon_rejected() {
        let cfg = InterventionConfig {
            similarity_epsilon: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = InterventionConfig::from_json(r#"{"attention_strength": 8.0}"#).unwrap();
        assert_eq!(cfg.attention_strength, 8.0);
        assert_eq!(cfg.router_strength, 5.0);
    }

    #[test]
    fn test_from_json_malformed() {
        let err = InterventionConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, InterventionError::Config(_)));
    }
}
