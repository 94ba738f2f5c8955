// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Steering Kernel Core
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Runtime steering operators that bias inference-time tensors toward a
//! retrieved truth embedding, the confidence scorer that gates them, and
//! the per-architecture dispatcher that sequences them.
//!
//! # Safety Invariants
//!
//! 1. **Inactive memory never mutates**: if `MemoryContext::is_active()`
//!    is false, every operator returns `Skipped(Inactive)` before looking
//!    at its parameters or tensor, regardless of confidence.
//!
//! 2. **Floors are inclusive and per operator**: attention bias and state
//!    correction fire at confidence >= 0.5, router bias at >= 0.6, memory
//!    overwrite at >= 0.8.
//!
//! 3. **Length mismatches are rejected, never truncated**: element-wise
//!    operators return `DimensionMismatch` and leave the tensor untouched.
//!
//! 4. **Hybrid order is fixed**: state correction completes before the
//!    attention bias runs within one step.
//!
//! 5. **No shared mutable state**: operators touch only the caller's
//!    buffer, so independent steps may run concurrently.

pub mod dispatch;
pub mod kernel;
pub mod observer;
pub mod scorer;

pub use dispatch::{ArchitectureDispatcher, StepTensors, SteeringEngine};
pub use kernel::{
    apply_attention_bias, apply_memory_overwrite, apply_router_bias, apply_state_correction,
    InterventionKernel,
};
pub use observer::{InterventionEvent, InterventionObserver, LogObserver, TraceObserver};
pub use scorer::{
    checked_cosine, cosine_similarity, ConfidenceScorer, FactCandidate, FactMetadata,
    FixedProvenance, MetadataProvenance, Provenance, ProvenanceModel, ScoredFact,
};
