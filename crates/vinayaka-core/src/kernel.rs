// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Intervention Kernel
// ─────────────────────────────────────────────────────────────────────
//! The four in-place steering operators.
//!
//! Each operator mutates exactly one category of inference-time tensor
//! and re-checks its own guard (`is_active` and a confidence floor)
//! before touching anything:
//!
//! | operator            | target                  | floor |
//! |---------------------|-------------------------|-------|
//! | attention bias      | pre-softmax scores      | 0.5   |
//! | state correction    | recurrent hidden state  | 0.5   |
//! | router bias         | expert gate logits      | 0.6   |
//! | memory overwrite    | persistent memory slot  | 0.8   |
//!
//! The free functions use the floors above. `InterventionKernel` runs
//! the same operators with the floors and defaults of an
//! `InterventionConfig`.

use vinayaka_types::{
    InterventionConfig, InterventionError, InterventionResult, MemoryContext, Operator, Outcome,
    SkipReason,
};

pub const ATTENTION_FLOOR: f32 = 0.5;
pub const STATE_FLOOR: f32 = 0.5;
pub const ROUTER_FLOOR: f32 = 0.6;
pub const OVERWRITE_FLOOR: f32 = 0.8;

pub const DEFAULT_ATTENTION_STRENGTH: f32 = 10.0;
pub const DEFAULT_ROUTER_STRENGTH: f32 = 5.0;
pub const DEFAULT_ALPHA_BASE: f32 = 0.3;

/// Add `strength * confidence` to `scores[start_index..start_index + length]`.
///
/// Works in log space: the bias lands on raw logits before any softmax.
/// Indices past the end of `scores` are skipped; a window that covers no
/// element (including `length == 0`) is reported as `OutOfBounds`.
///
/// A score that is or would become NaN/Inf fails the call with
/// `Numerical` before any element is written.
pub fn apply_attention_bias(
    scores: &mut [f32],
    memory: &MemoryContext,
    start_index: usize,
    length: usize,
    strength: f32,
) -> InterventionResult<Outcome> {
    attention_bias(scores, memory, ATTENTION_FLOOR, start_index, length, strength)
}

/// Pull `hidden_state` toward the truth vector by
/// `alpha = alpha_base * confidence`.
///
/// A hidden state whose length differs from the truth vector is
/// rejected with `DimensionMismatch` and left untouched, as is one that
/// holds or would produce a non-finite element (`Numerical`).
pub fn apply_state_correction(
    hidden_state: &mut [f32],
    memory: &MemoryContext,
    alpha_base: f32,
) -> InterventionResult<Outcome> {
    state_correction(hidden_state, memory, STATE_FLOOR, alpha_base)
}

/// Add `strength * confidence` to each factual expert's gate logit.
/// Out-of-range expert indices are skipped.
pub fn apply_router_bias(
    router_logits: &mut [f32],
    factual_expert_indices: &[usize],
    memory: &MemoryContext,
    strength: f32,
) -> InterventionResult<Outcome> {
    router_bias(router_logits, factual_expert_indices, memory, ROUTER_FLOOR, strength)
}

/// Replace `memory_bank[write_head_index]` with the truth vector.
///
/// Exact assignment, no blending. The slot keeps its allocation; its
/// width must equal the truth vector's length.
pub fn apply_memory_overwrite(
    memory_bank: &mut [Vec<f32>],
    memory: &MemoryContext,
    write_head_index: usize,
) -> InterventionResult<Outcome> {
    memory_overwrite(memory_bank, memory, OVERWRITE_FLOOR, write_head_index)
}

/// In-place LERP: `state[i] = (1 - alpha) * state[i] + alpha * target[i]`.
///
/// No guard and no length check beyond iterating the shorter slice;
/// callers validate first. Shared with the C ABI kernel.
#[inline]
pub fn lerp_toward(state: &mut [f32], target: &[f32], alpha: f32) {
    debug_assert_eq!(state.len(), target.len());
    let keep = 1.0 - alpha;
    for (h, &t) in state.iter_mut().zip(target) {
        *h = keep * *h + alpha * t;
    }
}

/// Operators bound to a validated configuration.
#[derive(Debug, Clone, Copy)]
pub struct InterventionKernel<'a> {
    config: &'a InterventionConfig,
}

impl<'a> InterventionKernel<'a> {
    pub fn new(config: &'a InterventionConfig) -> Self {
        Self { config }
    }

    pub fn attention_bias(
        &self,
        scores: &mut [f32],
        memory: &MemoryContext,
        start_index: usize,
        length: usize,
    ) -> InterventionResult<Outcome> {
        attention_bias(
            scores,
            memory,
            self.config.attention_floor,
            start_index,
            length,
            self.config.attention_strength,
        )
    }

    pub fn state_correction(
        &self,
        hidden_state: &mut [f32],
        memory: &MemoryContext,
    ) -> InterventionResult<Outcome> {
        state_correction(
            hidden_state,
            memory,
            self.config.state_floor,
            self.config.alpha_base,
        )
    }

    pub fn router_bias(
        &self,
        router_logits: &mut [f32],
        factual_expert_indices: &[usize],
        memory: &MemoryContext,
    ) -> InterventionResult<Outcome> {
        router_bias(
            router_logits,
            factual_expert_indices,
            memory,
            self.config.router_floor,
            self.config.router_strength,
        )
    }

    pub fn memory_overwrite(
        &self,
        memory_bank: &mut [Vec<f32>],
        memory: &MemoryContext,
        write_head_index: usize,
    ) -> InterventionResult<Outcome> {
        memory_overwrite(
            memory_bank,
            memory,
            self.config.overwrite_floor,
            write_head_index,
        )
    }
}

// ── Shared implementations ────────────────────────────────────────

#[inline]
fn guard(memory: &MemoryContext, floor: f32) -> Option<Outcome> {
    if !memory.is_active() {
        return Some(Outcome::Skipped(SkipReason::Inactive));
    }
    if !memory.passes(floor) {
        return Some(Outcome::Skipped(SkipReason::BelowFloor {
            confidence: memory.confidence(),
            floor,
        }));
    }
    None
}

fn check_strength(op: Operator, strength: f32) -> InterventionResult<()> {
    if strength.is_finite() {
        Ok(())
    } else {
        log::warn!("{op}: rejecting non-finite strength {strength}");
        Err(InterventionError::InvalidParameter(format!(
            "{op} strength must be finite, got {strength}"
        )))
    }
}

/// Index of the first element whose updated value would not be finite.
fn first_non_finite<I>(updated: I) -> Option<usize>
where
    I: IntoIterator<Item = f32>,
{
    updated.into_iter().position(|v| !v.is_finite())
}

fn non_finite(op: Operator, index: usize) -> InterventionError {
    log::warn!("{op}: element {index} is not finite after the update");
    InterventionError::Numerical(format!(
        "{op} would leave a non-finite value at index {index}"
    ))
}

fn check_dimension(op: Operator, memory: &MemoryContext, got: usize) -> InterventionResult<()> {
    if memory.dim() == got {
        Ok(())
    } else {
        log::warn!(
            "{op}: truth vector has {} elements, target has {got}",
            memory.dim()
        );
        Err(InterventionError::DimensionMismatch {
            expected: memory.dim(),
            got,
        })
    }
}

fn attention_bias(
    scores: &mut [f32],
    memory: &MemoryContext,
    floor: f32,
    start_index: usize,
    length: usize,
    strength: f32,
) -> InterventionResult<Outcome> {
    if let Some(skip) = guard(memory, floor) {
        return Ok(skip);
    }
    check_strength(Operator::AttentionBias, strength)?;

    let end = start_index.saturating_add(length).min(scores.len());
    if start_index >= end {
        return Ok(Outcome::Skipped(SkipReason::OutOfBounds));
    }

    let bias = strength * memory.confidence();
    let window = &mut scores[start_index..end];
    if let Some(i) = first_non_finite(window.iter().map(|&s| s + bias)) {
        return Err(non_finite(Operator::AttentionBias, start_index + i));
    }
    for score in window {
        *score += bias;
    }
    Ok(Outcome::Applied {
        touched: end - start_index,
    })
}

fn state_correction(
    hidden_state: &mut [f32],
    memory: &MemoryContext,
    floor: f32,
    alpha_base: f32,
) -> InterventionResult<Outcome> {
    if let Some(skip) = guard(memory, floor) {
        return Ok(skip);
    }
    if !(0.0..=1.0).contains(&alpha_base) {
        return Err(InterventionError::InvalidParameter(format!(
            "alpha_base must be in [0, 1], got {alpha_base}"
        )));
    }
    check_dimension(Operator::StateCorrection, memory, hidden_state.len())?;

    let alpha = alpha_base * memory.confidence();
    let keep = 1.0 - alpha;
    let truth = memory.truth_vector();
    let updated = hidden_state.iter().zip(truth).map(|(&h, &t)| keep * h + alpha * t);
    if let Some(i) = first_non_finite(updated) {
        return Err(non_finite(Operator::StateCorrection, i));
    }
    lerp_toward(hidden_state, truth, alpha);
    Ok(Outcome::Applied {
        touched: hidden_state.len(),
    })
}

fn router_bias(
    router_logits: &mut [f32],
    factual_expert_indices: &[usize],
    memory: &MemoryContext,
    floor: f32,
    strength: f32,
) -> InterventionResult<Outcome> {
    if let Some(skip) = guard(memory, floor) {
        return Ok(skip);
    }
    check_strength(Operator::RouterBias, strength)?;

    let bias = strength * memory.confidence();
    if let Some(&expert) = factual_expert_indices
        .iter()
        .find(|&&e| router_logits.get(e).is_some_and(|&l| !(l + bias).is_finite()))
    {
        return Err(non_finite(Operator::RouterBias, expert));
    }
    let mut touched = 0;
    for &expert in factual_expert_indices {
        if let Some(logit) = router_logits.get_mut(expert) {
            *logit += bias;
            touched += 1;
        }
    }
    if touched == 0 {
        return Ok(Outcome::Skipped(SkipReason::OutOfBounds));
    }
    Ok(Outcome::Applied { touched })
}

fn memory_overwrite(
    memory_bank: &mut [Vec<f32>],
    memory: &MemoryContext,
    floor: f32,
    write_head_index: usize,
) -> InterventionResult<Outcome> {
    if let Some(skip) = guard(memory, floor) {
        return Ok(skip);
    }
    let Some(slot) = memory_bank.get_mut(write_head_index) else {
        return Ok(Outcome::Skipped(SkipReason::OutOfBounds));
    };
    check_dimension(Operator::MemoryOverwrite, memory, slot.len())?;

    slot.copy_from_slice(memory.truth_vector());
    Ok(Outcome::Applied {
        touched: slot.len(),
    })
}
