use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use football_predict::features::{example_match, feature_columns};
use football_predict::forest::{ForestConfig, RandomForest};
use football_predict::predictor::{align_features, predict_match_outcome};
use football_predict::synth::{OutcomeSampling, generate_training_data};

fn bench_generate(c: &mut Criterion) {
    c.bench_function("generate_5000_rows", |b| {
        b.iter(|| {
            let table =
                generate_training_data(black_box(5000), 42, OutcomeSampling::Normalized).unwrap();
            black_box(table.len());
        })
    });
}

fn bench_forest_fit(c: &mut Criterion) {
    let table = generate_training_data(2000, 42, OutcomeSampling::Normalized).unwrap();
    let cfg = ForestConfig {
        n_estimators: 20,
        ..ForestConfig::default()
    };

    let mut group = c.benchmark_group("forest");
    group.sample_size(10);
    group.bench_function("fit_20_trees_2000_rows", |b| {
        b.iter(|| {
            let forest =
                RandomForest::fit(black_box(&table.rows), black_box(&table.outcomes), cfg).unwrap();
            black_box(forest.trees().len());
        })
    });
    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let table = generate_training_data(2000, 42, OutcomeSampling::Normalized).unwrap();
    let forest = RandomForest::fit(&table.rows, &table.outcomes, ForestConfig::default()).unwrap();
    let cols = feature_columns();
    let features = example_match().to_map();

    c.bench_function("align_features", |b| {
        b.iter(|| black_box(align_features(black_box(&cols), black_box(&features))))
    });

    c.bench_function("predict_match_outcome_200_trees", |b| {
        b.iter(|| {
            let result =
                predict_match_outcome(black_box(&forest), &cols, black_box(&features)).unwrap();
            black_box(result.confidence);
        })
    });
}

criterion_group!(benches, bench_generate, bench_forest_fit, bench_predict);
criterion_main!(benches);
