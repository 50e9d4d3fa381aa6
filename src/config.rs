//! Configuration module

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_DB_PATH, DEFAULT_QUEUE_CAPACITY, DEFAULT_SCORER_TIMEOUT_MS, DEFAULT_SNAPSHOT_DIR,
    DEFAULT_TAMPER_MODEL, DEFAULT_TEXT_MODEL, DEFAULT_WORKERS,
};

/// Sensor configuration
#[derive(Debug, Clone)]
pub struct SensorConfig {
    /// SQLite audit database path
    pub db_path: PathBuf,

    /// Directory holding one raw snapshot per stored request
    pub snapshot_dir: PathBuf,

    /// Text classifier model (ONNX)
    pub text_model: PathBuf,

    /// Parameter-tampering classifier model (ONNX)
    pub tamper_model: PathBuf,

    /// Per-call scorer timeout
    pub scorer_timeout: Duration,

    /// Maximum requests classified concurrently
    pub workers: usize,

    /// Intake queue capacity
    pub queue_capacity: usize,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            text_model: PathBuf::from(DEFAULT_TEXT_MODEL),
            tamper_model: PathBuf::from(DEFAULT_TAMPER_MODEL),
            scorer_timeout: Duration::from_millis(DEFAULT_SCORER_TIMEOUT_MS),
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SensorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            db_path: env::var("WAF_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),

            snapshot_dir: env::var("WAF_SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_dir),

            text_model: env::var("WAF_TEXT_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.text_model),

            tamper_model: env::var("WAF_TAMPER_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.tamper_model),

            scorer_timeout: env::var("WAF_SCORER_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.scorer_timeout),

            workers: env::var("WAF_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.workers),

            queue_capacity: env::var("WAF_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.queue_capacity),
        }
    }
}
