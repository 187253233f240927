use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::persist::default_model_path;
use crate::synth::{DEFAULT_SAMPLES, DEFAULT_SEED, OutcomeSampling};

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

const MIN_SAMPLES: usize = 30;
const MAX_SAMPLES: usize = 2_000_000;

const KNOWN_FLAGS: &[&str] = &["--samples", "--seed", "--out", "--sampling"];

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub samples: usize,
    pub seed: u64,
    pub model_path: PathBuf,
    pub sampling: OutcomeSampling,
    pub test_fraction: f64,
    /// `None` leaves the rayon default in place.
    pub train_parallelism: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            seed: DEFAULT_SEED,
            model_path: default_model_path(),
            sampling: OutcomeSampling::default(),
            test_fraction: DEFAULT_TEST_FRACTION,
            train_parallelism: None,
        }
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl AppConfig {
    /// `.env` files, then process env, then command-line flags (highest precedence).
    pub fn load() -> Result<Self> {
        load_dotenv();
        let args = env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(|key| env::var(key).ok(), &args)
    }

    pub fn from_sources(lookup: impl Fn(&str) -> Option<String>, args: &[String]) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(n) = env_number::<usize>(&lookup, "FOOTBALL_SAMPLES") {
            cfg.samples = n;
        }
        if let Some(seed) = env_number::<u64>(&lookup, "FOOTBALL_SEED") {
            cfg.seed = seed;
        }
        if let Some(path) = lookup("FOOTBALL_MODEL_PATH").filter(|v| !v.trim().is_empty()) {
            cfg.model_path = PathBuf::from(path.trim());
        }
        if let Some(mode) = lookup("FOOTBALL_OUTCOME_SAMPLING").filter(|v| !v.trim().is_empty()) {
            cfg.sampling = mode.parse().context("FOOTBALL_OUTCOME_SAMPLING")?;
        }
        cfg.train_parallelism =
            env_number::<usize>(&lookup, "TRAIN_PARALLELISM").map(|n| n.clamp(1, 64));

        for flag in unknown_flags(args, KNOWN_FLAGS) {
            log::warn!("ignoring unknown flag {flag}");
        }

        if let Some(v) = arg_value(args, "--samples") {
            cfg.samples = v
                .parse()
                .with_context(|| format!("--samples expects an integer, got '{}'", v))?;
        }
        if let Some(v) = arg_value(args, "--seed") {
            cfg.seed = v
                .parse()
                .with_context(|| format!("--seed expects an integer, got '{}'", v))?;
        }
        if let Some(v) = arg_value(args, "--out") {
            cfg.model_path = PathBuf::from(v);
        }
        if let Some(v) = arg_value(args, "--sampling") {
            cfg.sampling = v.parse().context("--sampling")?;
        }

        cfg.samples = cfg.samples.clamp(MIN_SAMPLES, MAX_SAMPLES);
        Ok(cfg)
    }
}

/// Unparseable values are logged and treated as unset.
fn env_number<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring {key}={raw}: expected a non-negative integer");
            None
        }
    }
}

/// Flags (with any `=value` suffix removed) that are not in `known`.
pub fn unknown_flags(args: &[String], known: &[&str]) -> Vec<String> {
    args.iter()
        .filter(|arg| arg.starts_with("--"))
        .map(|arg| arg.split_once('=').map_or(arg.as_str(), |(flag, _)| flag).to_string())
        .filter(|flag| !known.contains(&flag.as_str()))
        .collect()
}

/// Accepts both `--flag=value` and `--flag value`.
pub fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix)
            && !v.trim().is_empty()
        {
            return Some(v.trim().to_string());
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn positional_args(args: &[String], flags_with_values: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if flags_with_values.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.clone());
    }
    out
}
