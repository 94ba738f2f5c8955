// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Architecture Dispatcher + Steering Engine
// ─────────────────────────────────────────────────────────────────────
//! Per-architecture operator sequencing.
//!
//! Two layers:
//! - `ArchitectureDispatcher` — the sequence table and a stateless `run`.
//! - `SteeringEngine` — an engine instance bound to one variant, one
//!   validated config, and an observer.
//!
//! The dispatcher is a sequencing policy, not a safety boundary: it does
//! not inspect tensors, and every operator re-checks its own guard.

use std::sync::Arc;

use vinayaka_types::{
    ArchitectureVariant, InterventionConfig, InterventionResult, MemoryContext, Operator, Outcome,
    SkipReason,
};

use crate::kernel::InterventionKernel;
use crate::observer::{InterventionEvent, InterventionObserver, LogObserver};
use crate::scorer::{ConfidenceScorer, FixedProvenance, Provenance};

const STANDARD_PLAN: [Operator; 1] = [Operator::AttentionBias];
const RECURRENT_PLAN: [Operator; 1] = [Operator::StateCorrection];
const MOE_PLAN: [Operator; 1] = [Operator::RouterBias];
// SSM layer output feeds the attention layer: the order is fixed.
const HYBRID_PLAN: [Operator; 2] = [Operator::StateCorrection, Operator::AttentionBias];

/// Mutable views of one inference step's tensors.
///
/// Each view is optional; a planned operator whose tensor is absent is
/// reported as `Skipped(MissingTensor)`.
#[derive(Debug, Default)]
pub struct StepTensors<'a> {
    pub attention_scores: Option<&'a mut [f32]>,
    /// `(start_index, length)` of the truth-bearing positions.
    pub attention_window: (usize, usize),
    pub hidden_state: Option<&'a mut [f32]>,
    pub router_logits: Option<&'a mut [f32]>,
    pub factual_experts: &'a [usize],
}

impl<'a> StepTensors<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attention(mut self, scores: &'a mut [f32], start_index: usize, length: usize) -> Self {
        self.attention_scores = Some(scores);
        self.attention_window = (start_index, length);
        self
    }

    pub fn with_hidden_state(mut self, hidden_state: &'a mut [f32]) -> Self {
        self.hidden_state = Some(hidden_state);
        self
    }

    pub fn with_router(mut self, router_logits: &'a mut [f32], factual_experts: &'a [usize]) -> Self {
        self.router_logits = Some(router_logits);
        self.factual_experts = factual_experts;
        self
    }
}

/// Sequence table and runner.
pub struct ArchitectureDispatcher;

impl ArchitectureDispatcher {
    /// Operators applied for `variant`, in order.
    pub fn plan(variant: ArchitectureVariant) -> &'static [Operator] {
        match variant {
            ArchitectureVariant::Standard => &STANDARD_PLAN,
            ArchitectureVariant::RecurrentState => &RECURRENT_PLAN,
            ArchitectureVariant::Hybrid => &HYBRID_PLAN,
            ArchitectureVariant::MixtureOfExperts => &MOE_PLAN,
        }
    }

    /// Run the plan for `variant` against one step's tensors.
    ///
    /// Operators run strictly in plan order. The first contract
    /// violation aborts the step; operators already applied stay applied.
    pub fn run(
        variant: ArchitectureVariant,
        tensors: &mut StepTensors<'_>,
        memory: &MemoryContext,
        config: &InterventionConfig,
        observer: &dyn InterventionObserver,
    ) -> InterventionResult<Vec<InterventionEvent>> {
        let kernel = InterventionKernel::new(config);
        let plan = Self::plan(variant);
        let mut events = Vec::with_capacity(plan.len());

        for &operator in plan {
            let outcome = match Self::apply(&kernel, operator, tensors, memory) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::warn!("{variant}: {operator} rejected input: {e}");
                    return Err(e);
                }
            };
            let event = InterventionEvent {
                variant,
                operator,
                outcome,
            };
            observer.on_event(&event);
            events.push(event);
        }
        Ok(events)
    }

    fn apply(
        kernel: &InterventionKernel<'_>,
        operator: Operator,
        tensors: &mut StepTensors<'_>,
        memory: &MemoryContext,
    ) -> InterventionResult<Outcome> {
        const MISSING: Outcome = Outcome::Skipped(SkipReason::MissingTensor);
        match operator {
            Operator::AttentionBias => match tensors.attention_scores.as_deref_mut() {
                Some(scores) => {
                    let (start, len) = tensors.attention_window;
                    kernel.attention_bias(scores, memory, start, len)
                }
                None => Ok(MISSING),
            },
            Operator::StateCorrection => match tensors.hidden_state.as_deref_mut() {
                Some(state) => kernel.state_correction(state, memory),
                None => Ok(MISSING),
            },
            Operator::RouterBias => match tensors.router_logits.as_deref_mut() {
                Some(logits) => kernel.router_bias(logits, tensors.factual_experts, memory),
                None => Ok(MISSING),
            },
            // Persistent memory is not carried by a step; see
            // `SteeringEngine::apply_memory_overwrite`.
            Operator::MemoryOverwrite => Ok(MISSING),
        }
    }
}

/// One engine instance: immutable variant, validated config, observer.
///
/// Holds no per-step state, so `run_step` takes `&self` and one engine
/// may serve several threads, each with its own tensors.
pub struct SteeringEngine {
    variant: ArchitectureVariant,
    config: InterventionConfig,
    scorer: ConfidenceScorer,
    observer: Arc<dyn InterventionObserver>,
}

impl SteeringEngine {
    pub fn new(variant: ArchitectureVariant, config: InterventionConfig) -> InterventionResult<Self> {
        config.validate()?;
        log::info!("steering engine initialised for {variant}");
        let scorer = ConfidenceScorer::from_config(&config)
            .with_provenance(Arc::new(FixedProvenance(Provenance::REFERENCE)));
        Ok(Self {
            variant,
            config,
            scorer,
            observer: Arc::new(LogObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn InterventionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_scorer(mut self, scorer: ConfidenceScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Apply this variant's operator sequence to one step.
    pub fn run_step(
        &self,
        tensors: &mut StepTensors<'_>,
        memory: &MemoryContext,
    ) -> InterventionResult<Vec<InterventionEvent>> {
        ArchitectureDispatcher::run(
            self.variant,
            tensors,
            memory,
            &self.config,
            self.observer.as_ref(),
        )
    }

    /// Overwrite one persistent memory slot with the configured floor.
    pub fn apply_memory_overwrite(
        &self,
        memory_bank: &mut [Vec<f32>],
        memory: &MemoryContext,
        write_head_index: usize,
    ) -> InterventionResult<Outcome> {
        let outcome = InterventionKernel::new(&self.config).memory_overwrite(
            memory_bank,
            memory,
            write_head_index,
        )?;
        self.observer.on_event(&InterventionEvent {
            variant: self.variant,
            operator: Operator::MemoryOverwrite,
            outcome,
        });
        Ok(outcome)
    }

    /// Score `truth` against `query` and wrap it as an active context.
    ///
    /// The default scorer carries `Provenance::REFERENCE`, so the
    /// confidence matches the C ABI `graph_walk` for the same vectors.
    /// Swap it with `with_scorer` for per-fact provenance.
    pub fn memory_for(&self, query: &[f32], truth: Vec<f32>) -> InterventionResult<MemoryContext> {
        let score = self.scorer.score(query, &truth)?;
        MemoryContext::from_score(truth, score)
    }

    pub fn variant(&self) -> ArchitectureVariant {
        self.variant
    }

    pub fn config(&self) -> &InterventionConfig {
        &self.config
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::TraceObserver;
    use vinayaka_types::InterventionError;

    fn truth_memory(confidence: f32) -> MemoryContext {
        MemoryContext::new(vec![1.0, 1.0, 1.0, 1.0], confidence, true).unwrap()
    }

    fn traced(variant: ArchitectureVariant) -> (SteeringEngine, Arc<TraceObserver>) {
        let trace = Arc::new(TraceObserver::new(16));
        let engine = SteeringEngine::new(variant, InterventionConfig::default())
            .unwrap()
            .with_observer(trace.clone());
        (engine, trace)
    }

    #[test]
    fn test_plan_table() {
        assert_eq!(
            ArchitectureDispatcher::plan(ArchitectureVariant::Standard),
            &[Operator::AttentionBias]
        );
        assert_eq!(
            ArchitectureDispatcher::plan(ArchitectureVariant::RecurrentState),
            &[Operator::StateCorrection]
        );
        assert_eq!(
            ArchitectureDispatcher::plan(ArchitectureVariant::MixtureOfExperts),
            &[Operator::RouterBias]
        );
        assert_eq!(
            ArchitectureDispatcher::plan(ArchitectureVariant::Hybrid),
            &[Operator::StateCorrection, Operator::AttentionBias]
        );
    }

    #[test]
    fn test_no_plan_contains_overwrite() {
        for variant in ArchitectureVariant::ALL {
            assert!(!ArchitectureDispatcher::plan(variant).contains(&Operator::MemoryOverwrite));
        }
    }

    #[test]
    fn test_standard_step_biases_attention_only() {
        let (engine, trace) = traced(ArchitectureVariant::Standard);
        let mut scores = vec![0.5, 1.2, 0.8, 0.3, 1.1];
        let mut state = vec![-0.5, -0.6, -0.4, -0.5];
        let mut tensors = StepTensors::new()
            .with_attention(&mut scores, 0, 1)
            .with_hidden_state(&mut state);
        let events = engine.run_step(&mut tensors, &truth_memory(0.95)).unwrap();

        assert_eq!(events.len(), 1);
        assert!(events[0].outcome.is_applied());
        assert!((scores[0] - 10.0).abs() < 1e-5);
        assert_eq!(state, vec![-0.5, -0.6, -0.4, -0.5]);
        assert_eq!(trace.operators(), vec![Operator::AttentionBias]);
    }

    #[test]
    fn test_recurrent_step_corrects_state() {
        let (engine, _) = traced(ArchitectureVariant::RecurrentState);
        let mut state = vec![-0.5, -0.6, -0.4, -0.5];
        let mut tensors = StepTensors::new().with_hidden_state(&mut state);
        engine.run_step(&mut tensors, &truth_memory(1.0)).unwrap();
        // alpha = 0.3 → 0.7 * -0.5 + 0.3 = -0.05
        assert!((state[0] + 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_moe_step_biases_router() {
        let (engine, _) = traced(ArchitectureVariant::MixtureOfExperts);
        let mut logits = vec![0.5, 2.0, 0.5];
        let experts = [0usize];
        let mut tensors = StepTensors::new().with_router(&mut logits, &experts);
        engine.run_step(&mut tensors, &truth_memory(0.95)).unwrap();
        assert!(logits[0] > logits[1]);
    }

    #[test]
    fn test_hybrid_runs_state_before_attention() {
        let (engine, trace) = traced(ArchitectureVariant::Hybrid);
        let mut scores = vec![0.5, 1.2];
        let mut state = vec![-0.5, -0.6, -0.4, -0.5];
        let mut tensors = StepTensors::new()
            .with_attention(&mut scores, 0, 1)
            .with_hidden_state(&mut state);
        let events = engine.run_step(&mut tensors, &truth_memory(0.95)).unwrap();

        let order: Vec<Operator> = events.iter().map(|e| e.operator).collect();
        assert_eq!(order, vec![Operator::StateCorrection, Operator::AttentionBias]);
        assert_eq!(trace.operators(), order);
        assert!(events.iter().all(|e| e.outcome.is_applied()));
    }

    #[test]
    fn test_missing_tensor_is_reported() {
        let (engine, _) = traced(ArchitectureVariant::Hybrid);
        let mut scores = vec![0.0];
        let mut tensors = StepTensors::new().with_attention(&mut scores, 0, 1);
        let events = engine.run_step(&mut tensors, &truth_memory(0.95)).unwrap();
        assert_eq!(
            events[0].outcome,
            Outcome::Skipped(SkipReason::MissingTensor)
        );
        assert!(events[1].outcome.is_applied());
    }

    #[test]
    fn test_inactive_memory_mutates_nothing() {
        for variant in ArchitectureVariant::ALL {
            let (engine, _) = traced(variant);
            let mut scores = vec![0.5, 1.2];
            let mut state = vec![-0.5, -0.6, -0.4, -0.5];
            let mut logits = vec![0.5, 2.0];
            let experts = [0usize];
            let mut tensors = StepTensors::new()
                .with_attention(&mut scores, 0, 2)
                .with_hidden_state(&mut state)
                .with_router(&mut logits, &experts);
            let events = engine
                .run_step(&mut tensors, &MemoryContext::inactive())
                .unwrap();
            assert!(events.iter().all(|e| !e.outcome.is_applied()), "{variant}");
            assert_eq!(scores, vec![0.5, 1.2]);
            assert_eq!(state, vec![-0.5, -0.6, -0.4, -0.5]);
            assert_eq!(logits, vec![0.5, 2.0]);
        }
    }

    #[test]
    fn test_hybrid_mismatch_aborts_before_attention() {
        let (engine, trace) = traced(ArchitectureVariant::Hybrid);
        let mut scores = vec![0.0];
        let mut state = vec![0.0, 0.0];
        let mut tensors = StepTensors::new()
            .with_attention(&mut scores, 0, 1)
            .with_hidden_state(&mut state);
        let err = engine.run_step(&mut tensors, &truth_memory(0.95)).unwrap_err();
        assert_eq!(err, InterventionError::DimensionMismatch { expected: 4, got: 2 });
        assert_eq!(scores, vec![0.0]);
        assert!(trace.is_empty());
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = InterventionConfig {
            overwrite_floor: 2.0,
            ..Default::default()
        };
        assert!(SteeringEngine::new(ArchitectureVariant::Standard, config).is_err());
    }

    #[test]
    fn test_engine_memory_overwrite_reports_event() {
        let (engine, trace) = traced(ArchitectureVariant::RecurrentState);
        let mut bank = vec![vec![0.0; 4]; 2];
        let outcome = engine
            .apply_memory_overwrite(&mut bank, &truth_memory(0.9), 1)
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(bank[1], vec![1.0; 4]);
        assert_eq!(trace.operators(), vec![Operator::MemoryOverwrite]);
    }

    #[test]
    fn test_memory_for_scores_and_activates() {
        let (engine, _) = traced(ArchitectureVariant::Standard);
        let memory = engine.memory_for(&[1.0, 0.0], vec![2.0, 0.0]).unwrap();
        assert!(memory.is_active());
        assert!((memory.confidence() - 0.95).abs() < 1e-5);
    }

    #[test]
    fn test_memory_for_matches_reference_scorer() {
        let (engine, _) = traced(ArchitectureVariant::Hybrid);
        let query = [0.3, -0.2, 0.9];
        let truth = vec![0.4, 0.1, 0.8];
        let expected = ConfidenceScorer::reference().score(&query, &truth).unwrap();
        let memory = engine.memory_for(&query, truth).unwrap();
        assert!((memory.confidence() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_with_scorer_overrides_provenance() {
        let config = InterventionConfig::default();
        let engine = SteeringEngine::new(ArchitectureVariant::Standard, config.clone())
            .unwrap()
            .with_scorer(ConfidenceScorer::from_config(&config));
        let memory = engine.memory_for(&[1.0, 0.0], vec![1.0, 0.0]).unwrap();
        assert!((memory.confidence() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_engine_shared_across_threads() {
        let (engine, trace) = traced(ArchitectureVariant::RecurrentState);
        let engine = Arc::new(engine);
        let memory = Arc::new(truth_memory(1.0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let memory = Arc::clone(&memory);
                std::thread::spawn(move || {
                    let mut state = vec![0.0; 4];
                    let mut tensors = StepTensors::new().with_hidden_state(&mut state);
                    engine.run_step(&mut tensors, &memory).unwrap();
                    state
                })
            })
            .collect();
        for handle in handles {
            let state = handle.join().unwrap();
            assert!((state[0] - 0.3).abs() < 1e-6);
        }
        assert_eq!(trace.len(), 4);
    }
}
