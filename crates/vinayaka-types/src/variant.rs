// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Architecture Variants and Operator Outcomes
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::InterventionConfig;
use crate::error::InterventionError;

/// Model family an engine instance steers. Fixed for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectureVariant {
    /// Attention-only transformer.
    Standard,
    /// State space model with a recurrent hidden state.
    RecurrentState,
    /// SSM layer followed by an attention layer in the same step.
    Hybrid,
    /// Gated mixture of experts.
    MixtureOfExperts,
}

impl ArchitectureVariant {
    pub const ALL: [ArchitectureVariant; 4] = [
        ArchitectureVariant::Standard,
        ArchitectureVariant::RecurrentState,
        ArchitectureVariant::Hybrid,
        ArchitectureVariant::MixtureOfExperts,
    ];
}

impl fmt::Display for ArchitectureVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Standard => "Standard Transformer",
            Self::RecurrentState => "State Space Model",
            Self::Hybrid => "Hybrid (SSM + Attention)",
            Self::MixtureOfExperts => "Mixture of Experts",
        };
        f.write_str(name)
    }
}

impl FromStr for ArchitectureVariant {
    type Err = InterventionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "transformer" => Ok(Self::Standard),
            "ssm" | "recurrent_state" | "mamba" => Ok(Self::RecurrentState),
            "hybrid" | "jamba" => Ok(Self::Hybrid),
            "moe" | "mixture_of_experts" => Ok(Self::MixtureOfExperts),
            other => Err(InterventionError::UnknownVariant(other.to_string())),
        }
    }
}

/// The four intervention operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    AttentionBias,
    StateCorrection,
    RouterBias,
    MemoryOverwrite,
}

impl Operator {
    /// Confidence floor this operator requires under `config`.
    pub fn floor(self, config: &InterventionConfig) -> f32 {
        match self {
            Self::AttentionBias => config.attention_floor,
            Self::StateCorrection => config.state_floor,
            Self::RouterBias => config.router_floor,
            Self::MemoryOverwrite => config.overwrite_floor,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AttentionBias => "attention_bias",
            Self::StateCorrection => "state_correction",
            Self::RouterBias => "router_bias",
            Self::MemoryOverwrite => "memory_overwrite",
        };
        f.write_str(name)
    }
}

/// Why an operator left its tensor untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No fact retrieved for this step.
    Inactive,
    /// Confidence under the operator's floor.
    BelowFloor { confidence: f32, floor: f32 },
    /// No requested index landed inside the tensor. An empty attention
    /// window or expert list counts as out of bounds.
    OutOfBounds,
    /// The step carried no tensor for this operator.
    MissingTensor,
}

/// Result of one operator invocation. Mutation is the real effect;
/// this records whether it happened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied { touched: usize },
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn touched(&self) -> usize {
        match self {
            Self::Applied { touched } => *touched,
            Self::Skipped(_) => 0,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied { touched } => write!(f, "applied ({touched} elements)"),
            Self::Skipped(SkipReason::Inactive) => f.write_str("skipped (inactive)"),
            Self::Skipped(SkipReason::BelowFloor { confidence, floor }) => {
                write!(f, "skipped (confidence {confidence:.4} < {floor})")
            }
            Self::Skipped(SkipReason::OutOfBounds) => f.write_str("skipped (out of bounds)"),
            Self::Skipped(SkipReason::MissingTensor) => f.write_str("skipped (no tensor)"),
        }
    }
}
