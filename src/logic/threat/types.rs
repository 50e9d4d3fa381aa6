//! Threat Types
//!
//! Pipeline phases, results, errors and counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::logic::request::ThreatMap;

// ============================================================================
// PHASE
// ============================================================================

/// Phase in which the final decision was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Deterministic signatures matched; ML was skipped
    Signature,
    /// No signature evidence; scorers decided (or the valid fallback)
    Ml,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Signature => "signature",
            Phase::Ml => "ml",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// Result of running the pipeline on one request. `threats` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub phase: Phase,
    pub threats: ThreatMap,
    pub scorer_failures: u32,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Caller-visible pipeline failure (input contract violations only)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("malformed request: {0}")]
    InvalidRequest(String),
    #[error("request already classified")]
    AlreadyClassified,
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct PipelineCounters {
    pub classified: AtomicU64,
    pub rejected: AtomicU64,
    pub signature_decisions: AtomicU64,
    pub ml_decisions: AtomicU64,
    pub valid_verdicts: AtomicU64,
    pub scorer_failures: AtomicU64,
}

impl PipelineCounters {
    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            classified: self.classified.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            signature_decisions: self.signature_decisions.load(Ordering::Relaxed),
            ml_decisions: self.ml_decisions.load(Ordering::Relaxed),
            valid_verdicts: self.valid_verdicts.load(Ordering::Relaxed),
            scorer_failures: self.scorer_failures.load(Ordering::Relaxed),
        }
    }
}

/// Pipeline counters for status reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub classified: u64,
    pub rejected: u64,
    pub signature_decisions: u64,
    pub ml_decisions: u64,
    pub valid_verdicts: u64,
    pub scorer_failures: u64,
}
