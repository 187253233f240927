use anyhow::{Context, Result};

use football_predict::config::AppConfig;
use football_predict::features::example_match;
use football_predict::forest::ForestConfig;
use football_predict::persist::save_model;
use football_predict::predictor::{MatchPrediction, predict_match_outcome};
use football_predict::synth::generate_training_data;
use football_predict::trainer::{TrainerConfig, print_training_summary, train_prediction_model};

fn main() -> Result<()> {
    let cfg = AppConfig::load()?;
    init_logging();

    log::info!("Starting football prediction training");
    log::info!(
        "Generating {} training samples (seed {}, {:?} outcome sampling)",
        cfg.samples,
        cfg.seed,
        cfg.sampling
    );
    let table = generate_training_data(cfg.samples, cfg.seed, cfg.sampling)
        .context("generate training data")?;

    let trainer_cfg = TrainerConfig {
        test_fraction: cfg.test_fraction,
        split_seed: cfg.seed,
        train_parallelism: cfg.train_parallelism,
        forest: ForestConfig {
            seed: cfg.seed,
            ..Default::default()
        },
    };
    let outcome = train_prediction_model(&table, &trainer_cfg)?;
    print_training_summary(&outcome);

    save_model(&cfg.model_path, &outcome.to_artifact())?;
    println!("\nModel saved as '{}'", cfg.model_path.display());

    println!("\nExample Prediction:");
    let result = predict_match_outcome(
        &outcome.model,
        &outcome.feature_columns,
        &example_match().to_map(),
    )?;
    print_prediction(&result);

    log::info!("Training completed successfully");
    Ok(())
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}

fn print_prediction(result: &MatchPrediction) {
    println!("Prediction: {}", result.label());
    println!("Confidence: {:.1}%", result.confidence);
    println!("Probabilities:");
    for (key, prob) in [
        ("home_win", result.probabilities.home),
        ("draw", result.probabilities.draw),
        ("away_win", result.probabilities.away),
    ] {
        println!("  {}: {:.3} ({:.1}%)", key, prob, prob * 100.0);
    }
}
