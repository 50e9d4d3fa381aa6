//! WAF Sensor - HTTP request threat classification and audit.
//!
//! Each observed request is scanned by deterministic signatures first; only
//! when nothing matches do the probabilistic scorers run. The resulting
//! threat map is stored as audit evidence.

pub mod config;
pub mod constants;
pub mod logic;

pub use config::SensorConfig;
pub use logic::audit::{AuditRecord, AuditRow, AuditStore, StoreError};
pub use logic::model::{FallbackAdapter, TamperingScorer, TextScorer};
pub use logic::normalize::normalize;
pub use logic::request::{Location, Request, ThreatLabel, ThreatMap};
pub use logic::sensor::{Sensor, SensorError, SensorEvent};
pub use logic::signature::{SignatureEngine, SignatureSet};
pub use logic::threat::{Classification, ClassifyError, Phase, PipelineStats, ThreatClassifier};
