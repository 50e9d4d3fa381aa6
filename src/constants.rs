//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment overrides are read in `config.rs`.

/// Default SQLite audit database
pub const DEFAULT_DB_PATH: &str = "log.db";

/// Default directory for raw request snapshots (`<id>.json`)
pub const DEFAULT_SNAPSHOT_DIR: &str = "requests_log";

/// Default text classifier model
pub const DEFAULT_TEXT_MODEL: &str = "predictor.onnx";

/// Default parameter-tampering classifier model
pub const DEFAULT_TAMPER_MODEL: &str = "pt_predictor.onnx";

/// Default per-call scorer timeout (milliseconds)
pub const DEFAULT_SCORER_TIMEOUT_MS: u64 = 250;

/// Default number of concurrent classification workers
pub const DEFAULT_WORKERS: usize = 8;

/// Default capacity of the sensor intake queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Upper bound on percent-decode rounds during normalization
pub const MAX_DECODE_ROUNDS: usize = 5;

/// Parameter values longer than this are flagged as tampering
pub const MAX_PARAMETER_LENGTH: usize = 100;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "WAF Sensor";
