//! Scorer Contracts
//!
//! Opaque pre-trained classifiers behind a fixed batch contract:
//! one output label per input, same order. Implementations may be an
//! embedded ONNX model, a remote call or a stub.

use std::time::Duration;

use crate::logic::request::ThreatLabel;

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Scorer failure - absorbed by the fallback adapter, never surfaced
#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("scorer unavailable: {0}")]
    Unavailable(String),
    #[error("scorer timed out after {0:?}")]
    Timeout(Duration),
    #[error("scorer returned {actual} labels for {expected} inputs")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("scorer returned out-of-contract label {0}")]
    UnexpectedLabel(ThreatLabel),
    #[error("inference failed: {0}")]
    Inference(String),
}

// ============================================================================
// SCORER TRAITS
// ============================================================================

/// Labels allowed from the text classifier
pub const TEXT_LABELS: [ThreatLabel; 5] = [
    ThreatLabel::Valid,
    ThreatLabel::Sqli,
    ThreatLabel::Xss,
    ThreatLabel::Cmdi,
    ThreatLabel::PathTraversal,
];

/// Labels allowed from the tampering classifier
pub const TAMPERING_LABELS: [ThreatLabel; 2] = [ThreatLabel::Valid, ThreatLabel::ParameterTampering];

/// Text classifier: normalized snippets -> labels from `TEXT_LABELS`
pub trait TextScorer: Send + Sync {
    fn name(&self) -> &str;
    fn predict(&self, snippets: &[String]) -> Result<Vec<ThreatLabel>, ScorerError>;

    /// Mean call latency, for scorers that track it
    fn avg_latency_ms(&self) -> Option<f32> {
        None
    }
}

/// Tampering classifier: parameter-length vectors -> labels from `TAMPERING_LABELS`
pub trait TamperingScorer: Send + Sync {
    fn name(&self) -> &str;
    fn predict(&self, features: &[[f32; 1]]) -> Result<Vec<ThreatLabel>, ScorerError>;

    /// Mean call latency, for scorers that track it
    fn avg_latency_ms(&self) -> Option<f32> {
        None
    }
}

/// Enforce the batch contract on a scorer's output
pub fn check_output(
    labels: Vec<ThreatLabel>,
    expected: usize,
    allowed: &[ThreatLabel],
) -> Result<Vec<ThreatLabel>, ScorerError> {
    if labels.len() != expected {
        return Err(ScorerError::LengthMismatch {
            expected,
            actual: labels.len(),
        });
    }
    if let Some(bad) = labels.iter().find(|l| !allowed.contains(l)) {
        return Err(ScorerError::UnexpectedLabel(*bad));
    }
    Ok(labels)
}

// ============================================================================
// NULL OBJECT
// ============================================================================

/// Stand-in when no model is loaded: every input is `valid`
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysValid;

impl TextScorer for AlwaysValid {
    fn name(&self) -> &str {
        "always-valid"
    }

    fn predict(&self, snippets: &[String]) -> Result<Vec<ThreatLabel>, ScorerError> {
        Ok(vec![ThreatLabel::Valid; snippets.len()])
    }
}

impl TamperingScorer for AlwaysValid {
    fn name(&self) -> &str {
        "always-valid"
    }

    fn predict(&self, features: &[[f32; 1]]) -> Result<Vec<ThreatLabel>, ScorerError> {
        Ok(vec![ThreatLabel::Valid; features.len()])
    }
}
