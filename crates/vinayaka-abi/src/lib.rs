// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Stable C ABI Kernel Pair
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied: the extern functions must
// turn caller-supplied pointers into slices. All unsafe is confined to
// the two `extern "C"` entry points below.
//! Flat-array kernels for callers outside the Rust runtime, typically
//! accelerator pipelines that score on one compute timeline and correct
//! state during otherwise idle windows on another.
//!
//! # ABI Contract
//!
//! - Arguments are pointer + length pairs of `f32`; no structs cross.
//! - Neither function allocates, on the success path or any failure
//!   path, and neither logs.
//! - No panic crosses the boundary: null pointers, zero length, or
//!   malformed confidence degrade to a neutral result.
//!
//! ```c
//! float graph_walk(const float *query, size_t len, const float *truth);
//! void  correct_state(float *hidden, size_t len, const float *truth, float confidence);
//! ```

use vinayaka_core::kernel::{lerp_toward, DEFAULT_ALPHA_BASE};
use vinayaka_core::scorer::{checked_cosine, cosine_similarity, Provenance, DEFAULT_EPSILON};
use vinayaka_types::{InterventionError, InterventionResult};

/// Safe form of `graph_walk`: cosine similarity times the reference
/// provenance weight (0.95).
pub fn graph_walk_slice(query: &[f32], truth: &[f32]) -> InterventionResult<f32> {
    let similarity = cosine_similarity(query, truth, DEFAULT_EPSILON)?;
    Ok(similarity * Provenance::REFERENCE.weight())
}

/// Safe form of `correct_state`: `alpha = 0.3 * confidence`, LERP in place.
///
/// No confidence floor, the caller already decided to correct. Rejects
/// mismatched lengths and confidence outside [0, 1].
pub fn correct_state_slice(
    hidden_state: &mut [f32],
    truth: &[f32],
    confidence: f32,
) -> InterventionResult<()> {
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(InterventionError::InvalidConfidence(confidence));
    }
    if hidden_state.len() != truth.len() {
        return Err(InterventionError::DimensionMismatch {
            expected: truth.len(),
            got: hidden_state.len(),
        });
    }
    lerp_toward(hidden_state, truth, DEFAULT_ALPHA_BASE * confidence);
    Ok(())
}

/// Provenance-weighted confidence of `truth` for `query`.
///
/// Returns 0.0 for null pointers, zero length, or non-finite input.
///
/// # Safety
///
/// `query` and `truth` must each point to `len` readable `f32`s that
/// stay valid and unmodified for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn graph_walk(query: *const f32, len: usize, truth: *const f32) -> f32 {
    if query.is_null() || truth.is_null() || len == 0 {
        return 0.0;
    }
    // SAFETY: non-null, and the caller guarantees `len` valid elements.
    let (query, truth) = unsafe {
        (
            std::slice::from_raw_parts(query, len),
            std::slice::from_raw_parts(truth, len),
        )
    };
    checked_cosine(query, truth, DEFAULT_EPSILON)
        .map_or(0.0, |s| s * Provenance::REFERENCE.weight())
}

/// Pull `hidden` toward `truth` in place with `alpha = 0.3 * confidence`.
///
/// No-op for null pointers, zero length, or confidence that is
/// non-finite or outside [0, 1].
///
/// # Safety
///
/// `hidden` must point to `len` writable `f32`s and `truth` to `len`
/// readable `f32`s; the two regions must not overlap.
#[no_mangle]
pub unsafe extern "C" fn correct_state(
    hidden: *mut f32,
    len: usize,
    truth: *const f32,
    confidence: f32,
) {
    if hidden.is_null() || truth.is_null() || len == 0 {
        return;
    }
    // SAFETY: non-null, non-overlapping, and `len` elements per the contract.
    let (hidden, truth) = unsafe {
        (
            std::slice::from_raw_parts_mut(hidden, len),
            std::slice::from_raw_parts(truth, len),
        )
    };
    // Rejected input is a no-op; the error carries no heap data.
    let _ = correct_state_slice(hidden, truth, confidence);
}
