// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Steering Kernel Types
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Data model, configuration, and error hierarchy for the steering
//! kernel: the runtime operators that bias inference-time tensors toward
//! a retrieved truth embedding.

pub mod config;
pub mod error;
pub mod memory;
pub mod variant;

pub use config::InterventionConfig;
pub use error::{InterventionError, InterventionResult};
pub use memory::MemoryContext;
pub use variant::{ArchitectureVariant, Operator, Outcome, SkipReason};
