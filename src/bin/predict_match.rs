use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use football_predict::config::{arg_value, load_dotenv, positional_args};
use football_predict::features::example_match;
use football_predict::persist::{default_model_path, load_model};
use football_predict::predictor::predict_match_outcome;

fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let model_path = arg_value(&args, "--model")
        .map(PathBuf::from)
        .or_else(|| std::env::var("FOOTBALL_MODEL_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(default_model_path);

    let artifact = load_model(&model_path)?;
    log::info!(
        "loaded model from {} ({} trees, generated {}, test accuracy {:.3})",
        model_path.display(),
        artifact.model.trees().len(),
        artifact.generated_at,
        artifact.test_accuracy
    );

    let features = match positional_args(&args, &["--model"]).first() {
        Some(path) => read_features(Path::new(path))?,
        None => {
            log::info!("no features file given, using the built-in example match");
            example_match().to_map()
        }
    };

    let unknown: Vec<&String> = features
        .keys()
        .filter(|k| !artifact.feature_names.contains(k))
        .collect();
    if !unknown.is_empty() {
        log::warn!("ignoring features not in the model schema: {:?}", unknown);
    }
    let missing = artifact
        .feature_names
        .iter()
        .filter(|name| !features.contains_key(*name))
        .count();
    if missing > 0 {
        log::warn!("{} schema features missing, defaulting them to 0", missing);
    }

    let result = predict_match_outcome(&artifact.model, &artifact.feature_names, &features)?;
    println!("Prediction: {}", result.label());
    println!("Confidence: {:.1}%", result.confidence);
    println!("{}", serde_json::to_string_pretty(&result.probabilities)?);

    Ok(())
}

fn read_features(path: &Path) -> Result<HashMap<String, f64>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| anyhow!("{} must contain a JSON object", path.display()))?;

    let mut out = HashMap::new();
    for (key, v) in obj {
        let Some(num) = v.as_f64() else {
            return Err(anyhow!("feature '{}' is not a number", key));
        };
        out.insert(key.clone(), num);
    }
    Ok(out)
}
