use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

use quiniela_builder::PipelineConfig;
use quiniela_builder::classify::calibrate_and_classify;
use quiniela_builder::core_gen::generate_core;
use quiniela_builder::model::{ClassifiedMatch, Match};
use quiniela_builder::monte_carlo::{estimate_hit_probability, joint_portfolio_probability};
use quiniela_builder::satellite::generate_satellites;
use quiniela_builder::validate::validate;

fn sample_matches() -> Vec<ClassifiedMatch> {
    let raw: Vec<Match> = serde_json::from_str(JORNADA_JSON).expect("valid fixture json");
    calibrate_and_classify(&raw, &PipelineConfig::default()).expect("fixture classifies")
}

fn bench_generate(c: &mut Criterion) {
    let cfg = PipelineConfig::default();
    let matches = sample_matches();
    c.bench_function("generate_core_and_satellites", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        b.iter(|| {
            let core = generate_core(black_box(&matches), &cfg, &mut rng);
            let batch = generate_satellites(&matches, &core, 26, &cfg, &mut rng);
            black_box(batch.tickets.len());
        })
    });
}

fn bench_ticket_estimate(c: &mut Criterion) {
    let cfg = PipelineConfig::default();
    let matches = sample_matches();
    let core = generate_core(&matches, &cfg, &mut ChaCha8Rng::seed_from_u64(1));
    let outcomes = core[0].outcomes.clone();
    c.bench_function("ticket_estimate_10k", |b| {
        b.iter(|| {
            let p = estimate_hit_probability(black_box(&outcomes), &matches, 10_000, 11, 3);
            black_box(p);
        })
    });
}

fn bench_joint_and_validate(c: &mut Criterion) {
    let cfg = PipelineConfig::default();
    let matches = sample_matches();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut tickets = generate_core(&matches, &cfg, &mut rng);
    tickets.extend(generate_satellites(&matches, &tickets, 26, &cfg, &mut rng).tickets);

    c.bench_function("joint_estimate_10k", |b| {
        b.iter(|| {
            let p = joint_portfolio_probability(black_box(&tickets), &matches, 10_000, 11, 3);
            black_box(p);
        })
    });
    c.bench_function("validate_30", |b| {
        b.iter(|| {
            let report = validate(black_box(&tickets), &cfg);
            black_box(report.is_valid);
        })
    });
}

criterion_group!(
    perf,
    bench_generate,
    bench_ticket_estimate,
    bench_joint_and_validate
);
criterion_main!(perf);

static JORNADA_JSON: &str = include_str!("../tests/fixtures/jornada.json");
