//! Audit Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::request::{Location, ThreatLabel};

/// Core metadata of one stored request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub origin: String,
    pub host: String,
    pub method: String,
}

/// Metadata plus every (label, location) pair stored for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub metadata: AuditMetadata,
    pub threats: Vec<(ThreatLabel, Location)>,
}

/// One joined row: a request with 3 threats yields 3 rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRow {
    #[serde(flatten)]
    pub metadata: AuditMetadata,
    pub threat: ThreatLabel,
    pub location: Location,
    /// Link to the raw snapshot view
    pub review_path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("snapshot I/O failed: {0}")]
    Snapshot(#[from] std::io::Error),
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("request already persisted as #{0}")]
    AlreadyPersisted(i64),
    #[error("request has no threat map yet")]
    Unclassified,
    #[error("corrupt audit data: {0}")]
    Corrupt(String),
}

pub fn review_path(id: i64) -> String {
    format!("/review/{id}")
}
