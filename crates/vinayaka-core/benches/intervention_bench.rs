// ─────────────────────────────────────────────────────────────────────
// OpenVinayaka — Steering Kernel Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the per-step operators, the confidence
//! scorer at a 4096-wide embedding, and a full hybrid dispatch.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vinayaka_core::{
    apply_attention_bias, apply_router_bias, apply_state_correction, ConfidenceScorer,
    FactCandidate, MetadataProvenance, StepTensors, SteeringEngine,
};
use vinayaka_types::{ArchitectureVariant, InterventionConfig, MemoryContext};

const DIM: usize = 4096;

fn truth(dim: usize) -> MemoryContext {
    let v: Vec<f32> = (0..dim).map(|i| (i as f32 * 0.01).sin()).collect();
    MemoryContext::new(v, 0.95, true).expect("valid context")
}

// ── Operators ───────────────────────────────────────────────────────

fn bench_attention_bias(c: &mut Criterion) {
    let memory = truth(DIM);
    let mut scores = vec![0.5f32; 2048];
    c.bench_function("attention_bias_512", |b| {
        b.iter(|| apply_attention_bias(black_box(&mut scores), &memory, 0, 512, 10.0))
    });
}

fn bench_state_correction(c: &mut Criterion) {
    let memory = truth(DIM);
    let mut state = vec![-0.5f32; DIM];
    c.bench_function("state_correction_4096", |b| {
        b.iter(|| apply_state_correction(black_box(&mut state), &memory, 0.3))
    });
}

fn bench_router_bias(c: &mut Criterion) {
    let memory = truth(DIM);
    let mut logits = vec![0.5f32; 64];
    let experts: Vec<usize> = (0..8).collect();
    c.bench_function("router_bias_64x8", |b| {
        b.iter(|| apply_router_bias(black_box(&mut logits), &experts, &memory, 5.0))
    });
}

// ── Scorer ──────────────────────────────────────────────────────────

fn bench_scorer(c: &mut Criterion) {
    let scorer = ConfidenceScorer::reference();
    let memory = truth(DIM);
    let query: Vec<f32> = (0..DIM).map(|i| (i as f32 * 0.02).cos()).collect();
    c.bench_function("scorer_4096", |b| {
        b.iter(|| scorer.score(black_box(&query), memory.truth_vector()))
    });
}

fn bench_select(c: &mut Criterion) {
    let scorer = ConfidenceScorer::reference().with_provenance(Arc::new(MetadataProvenance));
    let query: Vec<f32> = (0..384).map(|i| (i as f32 * 0.02).cos()).collect();
    let candidates: Vec<FactCandidate> = (0..32)
        .map(|k| FactCandidate::new((0..384).map(|i| ((i + k) as f32 * 0.03).sin()).collect()))
        .collect();
    c.bench_function("select_32x384", |b| {
        b.iter(|| scorer.select(black_box(&query), &candidates))
    });
}

// ── Full hybrid step ────────────────────────────────────────────────

fn bench_hybrid_step(c: &mut Criterion) {
    let engine = SteeringEngine::new(ArchitectureVariant::Hybrid, InterventionConfig::default())
        .expect("default config is valid");
    let memory = truth(DIM);
    let mut scores = vec![0.5f32; 2048];
    let mut state = vec![-0.5f32; DIM];
    c.bench_function("hybrid_step_4096", |b| {
        b.iter(|| {
            let mut tensors = StepTensors::new()
                .with_attention(&mut scores, 0, 16)
                .with_hidden_state(&mut state);
            engine.run_step(black_box(&mut tensors), &memory)
        })
    });
}

criterion_group!(
    benches,
    bench_attention_bias,
    bench_state_correction,
    bench_router_bias,
    bench_scorer,
    bench_select,
    bench_hybrid_step,
);
criterion_main!(benches);
