pub mod config;
pub mod dataset;
pub mod features;
pub mod forest;
pub mod metrics;
pub mod outcome;
pub mod persist;
pub mod predictor;
pub mod synth;
pub mod trainer;
