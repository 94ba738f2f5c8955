// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Steering Kernel PyO3 FFI Bindings
// License: GNU AGPL v3
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied: PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the steering kernel.
//!
//! Exposes `InterventionConfig`, `MemoryContext`, `ConfidenceScorer`,
//! `SteeringEngine`, and the four operators as free functions.
//!
//! # FFI Safety
//!
//! - Python lists are copied into Rust buffers, mutated, and returned;
//!   no Rust borrow outlives a call.
//! - Contract violations (length mismatch, malformed confidence,
//!   invalid config) raise `ValueError`. Guarded no-ops return the
//!   input unchanged.
//!
//! Install: `pip install -e crates/vinayaka-ffi` (requires maturin,
//! build with `--features extension-module`).
//!
//! Usage from Python:
//! ```python
//! from vinayaka_kernel import MemoryContext, SteeringEngine
//!
//! mem = MemoryContext([1.0, 1.0, 1.0, 1.0], 0.95)
//! engine = SteeringEngine("hybrid")
//! out = engine.run_step(mem, attention_scores=[0.5, 1.2], attention_len=1,
//!                       hidden_state=[-0.5, -0.6, -0.4, -0.5])
//! ```

use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use vinayaka_core::{
    kernel, ConfidenceScorer, FactCandidate, FixedProvenance, Provenance, StepTensors,
    SteeringEngine,
};
use vinayaka_types::{
    ArchitectureVariant, InterventionConfig, InterventionError, MemoryContext, Outcome,
};

fn value_error(e: InterventionError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

// ─── PyInterventionConfig ───────────────────────────────────────────

/// Python-visible configuration for the steering operators.
#[pyclass(name = "InterventionConfig")]
#[derive(Clone)]
struct PyInterventionConfig {
    inner: InterventionConfig,
}

#[pymethods]
impl PyInterventionConfig {
    #[new]
    #[pyo3(signature = (
        attention_floor = 0.5,
        state_floor = 0.5,
        router_floor = 0.6,
        overwrite_floor = 0.8,
        attention_strength = 10.0,
        router_strength = 5.0,
        alpha_base = 0.3,
        similarity_epsilon = 1e-9,
        trace_capacity = 64,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        attention_floor: f32,
        state_floor: f32,
        router_floor: f32,
        overwrite_floor: f32,
        attention_strength: f32,
        router_strength: f32,
        alpha_base: f32,
        similarity_epsilon: f32,
        trace_capacity: usize,
    ) -> PyResult<Self> {
        let config = InterventionConfig {
            attention_floor,
            state_floor,
            router_floor,
            overwrite_floor,
            attention_strength,
            router_strength,
            alpha_base,
            similarity_epsilon,
            trace_capacity,
        };
        config.validate().map_err(value_error)?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = InterventionConfig::from_json(json).map_err(value_error)?;
        config.validate().map_err(value_error)?;
        Ok(Self { inner: config })
    }

    #[getter]
    fn attention_floor(&self) -> f32 {
        self.inner.attention_floor
    }

    #[getter]
    fn state_floor(&self) -> f32 {
        self.inner.state_floor
    }

    #[getter]
    fn router_floor(&self) -> f32 {
        self.inner.router_floor
    }

    #[getter]
    fn overwrite_floor(&self) -> f32 {
        self.inner.overwrite_floor
    }

    #[getter]
    fn attention_strength(&self) -> f32 {
        self.inner.attention_strength
    }

    #[getter]
    fn router_strength(&self) -> f32 {
        self.inner.router_strength
    }

    #[getter]
    fn alpha_base(&self) -> f32 {
        self.inner.alpha_base
    }

    #[getter]
    fn similarity_epsilon(&self) -> f32 {
        self.inner.similarity_epsilon
    }

    #[getter]
    fn trace_capacity(&self) -> usize {
        self.inner.trace_capacity
    }

    fn __repr__(&self) -> String {
        format!(
            "InterventionConfig(floors=[{}, {}, {}, {}], attention_strength={}, router_strength={}, alpha_base={})",
            self.inner.attention_floor,
            self.inner.state_floor,
            self.inner.router_floor,
            self.inner.overwrite_floor,
            self.inner.attention_strength,
            self.inner.router_strength,
            self.inner.alpha_base,
        )
    }
}

// ─── PyMemoryContext ────────────────────────────────────────────────

/// Python-visible truth embedding + confidence.
#[pyclass(name = "MemoryContext")]
#[derive(Clone)]
struct PyMemoryContext {
    inner: MemoryContext,
}

#[pymethods]
impl PyMemoryContext {
    #[new]
    #[pyo3(signature = (truth_vector, confidence, is_active = true))]
    fn new(truth_vector: Vec<f32>, confidence: f32, is_active: bool) -> PyResult<Self> {
        let inner = MemoryContext::new(truth_vector, confidence, is_active).map_err(value_error)?;
        Ok(Self { inner })
    }

    /// Context for a step with no retrieved fact.
    #[staticmethod]
    fn inactive() -> Self {
        Self {
            inner: MemoryContext::inactive(),
        }
    }

    #[getter]
    fn truth_vector(&self) -> Vec<f32> {
        self.inner.truth_vector().to_vec()
    }

    #[getter]
    fn confidence(&self) -> f32 {
        self.inner.confidence()
    }

    #[getter]
    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn __repr__(&self) -> String {
        format!(
            "MemoryContext(dim={}, confidence={:.4}, is_active={})",
            self.inner.dim(),
            self.inner.confidence(),
            if self.inner.is_active() { "True" } else { "False" },
        )
    }
}

// ─── PyConfidenceScorer ─────────────────────────────────────────────

/// Provenance-weighted similarity scorer with fixed C·R·W.
#[pyclass(name = "ConfidenceScorer")]
struct PyConfidenceScorer {
    inner: ConfidenceScorer,
}

#[pymethods]
impl PyConfidenceScorer {
    #[new]
    #[pyo3(signature = (corroboration = 1.0, recency = 1.0, source_weight = 1.0, epsilon = 1e-9))]
    fn new(corroboration: f32, recency: f32, source_weight: f32, epsilon: f32) -> PyResult<Self> {
        let provenance = Provenance::new(corroboration, recency, source_weight).map_err(value_error)?;
        Ok(Self {
            inner: ConfidenceScorer::new(epsilon, Arc::new(FixedProvenance(provenance))),
        })
    }

    /// Confidence P = S·C·R·W of `truth` for `query`.
    fn score(&self, query: Vec<f32>, truth: Vec<f32>) -> PyResult<f32> {
        self.inner.score(&query, &truth).map_err(value_error)
    }

    /// Best candidate as `(index, score)`, or None for an empty list.
    fn select(&self, query: Vec<f32>, candidates: Vec<Vec<f32>>) -> PyResult<Option<(usize, f32)>> {
        let candidates: Vec<FactCandidate> = candidates.into_iter().map(FactCandidate::new).collect();
        let best = self.inner.select(&query, &candidates).map_err(value_error)?;
        Ok(best.map(|b| (b.index, b.score)))
    }
}

// ─── PySteeringEngine ───────────────────────────────────────────────

/// Architecture-bound engine that sequences the operators for one step.
#[pyclass(name = "SteeringEngine")]
struct PySteeringEngine {
    inner: SteeringEngine,
}

#[pymethods]
impl PySteeringEngine {
    /// Args:
    ///     variant: "standard", "ssm", "hybrid", or "moe" (aliases accepted).
    ///     config: Optional InterventionConfig (defaults if None).
    #[new]
    #[pyo3(signature = (variant, config = None))]
    fn new(variant: &str, config: Option<PyInterventionConfig>) -> PyResult<Self> {
        let variant: ArchitectureVariant = variant.parse().map_err(value_error)?;
        let cfg = config.map(|c| c.inner).unwrap_or_default();
        Ok(Self {
            inner: SteeringEngine::new(variant, cfg).map_err(value_error)?,
        })
    }

    #[getter]
    fn variant(&self) -> String {
        self.inner.variant().to_string()
    }

    /// Run one inference step.
    ///
    /// Returns a dict with the (possibly mutated) tensors that were
    /// passed in, plus `events`: one description per operator invoked.
    #[pyo3(signature = (
        memory,
        attention_scores = None,
        attention_start = 0,
        attention_len = 0,
        hidden_state = None,
        router_logits = None,
        factual_experts = None,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn run_step<'py>(
        &self,
        py: Python<'py>,
        memory: &PyMemoryContext,
        attention_scores: Option<Vec<f32>>,
        attention_start: usize,
        attention_len: usize,
        hidden_state: Option<Vec<f32>>,
        router_logits: Option<Vec<f32>>,
        factual_experts: Option<Vec<usize>>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let mut attention_scores = attention_scores;
        let mut hidden_state = hidden_state;
        let mut router_logits = router_logits;
        let experts = factual_experts.unwrap_or_default();

        let mut tensors = StepTensors::new();
        if let Some(scores) = attention_scores.as_deref_mut() {
            tensors = tensors.with_attention(scores, attention_start, attention_len);
        }
        if let Some(state) = hidden_state.as_deref_mut() {
            tensors = tensors.with_hidden_state(state);
        }
        if let Some(logits) = router_logits.as_deref_mut() {
            tensors = tensors.with_router(logits, &experts);
        }
        let events = self
            .inner
            .run_step(&mut tensors, &memory.inner)
            .map_err(value_error)?;

        let dict = PyDict::new(py);
        dict.set_item("attention_scores", attention_scores)?;
        dict.set_item("hidden_state", hidden_state)?;
        dict.set_item("router_logits", router_logits)?;
        let described: Vec<String> = events.iter().map(|e| e.to_string()).collect();
        dict.set_item("events", described)?;
        Ok(dict)
    }

    /// Overwrite one memory slot. Returns `(memory_bank, applied)`.
    fn apply_memory_overwrite(
        &self,
        memory_bank: Vec<Vec<f32>>,
        memory: &PyMemoryContext,
        write_head_index: usize,
    ) -> PyResult<(Vec<Vec<f32>>, bool)> {
        let mut bank = memory_bank;
        let outcome = self
            .inner
            .apply_memory_overwrite(&mut bank, &memory.inner, write_head_index)
            .map_err(value_error)?;
        Ok((bank, outcome.is_applied()))
    }

    fn __repr__(&self) -> String {
        format!("SteeringEngine(variant={})", self.inner.variant())
    }
}

// ─── Free operators ─────────────────────────────────────────────────

fn applied(outcome: Outcome) -> bool {
    outcome.is_applied()
}

/// Attention bias on a copy of `scores`. Returns `(scores, applied)`.
#[pyfunction]
#[pyo3(signature = (scores, memory, start_index, length, strength = kernel::DEFAULT_ATTENTION_STRENGTH))]
fn attention_bias(
    mut scores: Vec<f32>,
    memory: &PyMemoryContext,
    start_index: usize,
    length: usize,
    strength: f32,
) -> PyResult<(Vec<f32>, bool)> {
    let outcome = kernel::apply_attention_bias(&mut scores, &memory.inner, start_index, length, strength)
        .map_err(value_error)?;
    Ok((scores, applied(outcome)))
}

/// State correction on a copy of `hidden_state`. Returns `(state, applied)`.
#[pyfunction]
#[pyo3(signature = (hidden_state, memory, alpha_base = kernel::DEFAULT_ALPHA_BASE))]
fn state_correction(
    mut hidden_state: Vec<f32>,
    memory: &PyMemoryContext,
    alpha_base: f32,
) -> PyResult<(Vec<f32>, bool)> {
    let outcome = kernel::apply_state_correction(&mut hidden_state, &memory.inner, alpha_base)
        .map_err(value_error)?;
    Ok((hidden_state, applied(outcome)))
}

/// Router bias on a copy of `router_logits`. Returns `(logits, applied)`.
#[pyfunction]
#[pyo3(signature = (router_logits, factual_expert_indices, memory, strength = kernel::DEFAULT_ROUTER_STRENGTH))]
fn router_bias(
    mut router_logits: Vec<f32>,
    factual_expert_indices: Vec<usize>,
    memory: &PyMemoryContext,
    strength: f32,
) -> PyResult<(Vec<f32>, bool)> {
    let outcome = kernel::apply_router_bias(
        &mut router_logits,
        &factual_expert_indices,
        &memory.inner,
        strength,
    )
    .map_err(value_error)?;
    Ok((router_logits, applied(outcome)))
}

/// Memory overwrite on a copy of `memory_bank`. Returns `(bank, applied)`.
#[pyfunction]
fn memory_overwrite(
    mut memory_bank: Vec<Vec<f32>>,
    memory: &PyMemoryContext,
    write_head_index: usize,
) -> PyResult<(Vec<Vec<f32>>, bool)> {
    let outcome = kernel::apply_memory_overwrite(&mut memory_bank, &memory.inner, write_head_index)
        .map_err(value_error)?;
    Ok((memory_bank, applied(outcome)))
}

/// Graph-walk confidence with the reference provenance weight (0.95).
#[pyfunction]
fn graph_walk(query: Vec<f32>, truth: Vec<f32>) -> PyResult<f32> {
    ConfidenceScorer::reference()
        .score(&query, &truth)
        .map_err(value_error)
}

// ─── Module Registration ────────────────────────────────────────────

/// Vinayaka steering kernel for Python.
///
/// - `InterventionConfig` — floors, strengths, alpha
/// - `MemoryContext` — truth embedding + confidence
/// - `ConfidenceScorer` — provenance-weighted similarity
/// - `SteeringEngine` — per-architecture operator sequencing
/// - `attention_bias`, `state_correction`, `router_bias`,
///   `memory_overwrite`, `graph_walk` — standalone kernels
#[pymodule]
fn vinayaka_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyInterventionConfig>()?;
    m.add_class::<PyMemoryContext>()?;
    m.add_class::<PyConfidenceScorer>()?;
    m.add_class::<PySteeringEngine>()?;
    m.add_function(wrap_pyfunction!(attention_bias, m)?)?;
    m.add_function(wrap_pyfunction!(state_correction, m)?)?;
    m.add_function(wrap_pyfunction!(router_bias, m)?)?;
    m.add_function(wrap_pyfunction!(memory_overwrite, m)?)?;
    m.add_function(wrap_pyfunction!(graph_walk, m)?)?;
    Ok(())
}
