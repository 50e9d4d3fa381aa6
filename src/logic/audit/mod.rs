//! Audit Module
//!
//! Durable evidence for classified requests.
//!
//! ## Persisted layout
//! - `logs`: id, timestamp, origin, host, method
//! - `threats`: log_id, threat_type, location (many per log)
//! - `<snapshot_dir>/<id>.json`: non-empty request line, body and headers

pub mod store;
pub mod types;


pub use store::AuditStore;
pub use types::{review_path, AuditMetadata, AuditRecord, AuditRow, StoreError};
