//! Threat Classifier
//!
//! Two-phase decision policy:
//! 1. Signature phase - any deterministic hit is final, ML is skipped.
//! 2. ML phase - fallback scorers; if they find nothing the verdict is
//!    `valid` with an empty location.

use std::sync::atomic::Ordering;

use super::types::{Classification, ClassifyError, Phase, PipelineCounters, PipelineStats};
use crate::logic::model::FallbackAdapter;
use crate::logic::request::{valid_verdict, Request, ThreatLabel};
use crate::logic::signature::SignatureEngine;

pub struct ThreatClassifier {
    signatures: SignatureEngine,
    fallback: FallbackAdapter,
    counters: PipelineCounters,
}

impl ThreatClassifier {
    pub fn new(signatures: SignatureEngine, fallback: FallbackAdapter) -> Self {
        Self {
            signatures,
            fallback,
            counters: PipelineCounters::default(),
        }
    }

    /// Decide the threat map for a request without modifying it
    pub fn evaluate(&self, req: &Request) -> Result<Classification, ClassifyError> {
        if let Err(reason) = req.validate() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(ClassifyError::InvalidRequest(reason));
        }

        let signature_hits = self.signatures.scan(req);
        let classification = if !signature_hits.is_empty() {
            self.counters.signature_decisions.fetch_add(1, Ordering::Relaxed);
            Classification {
                phase: Phase::Signature,
                threats: signature_hits,
                scorer_failures: 0,
            }
        } else {
            self.counters.ml_decisions.fetch_add(1, Ordering::Relaxed);
            let outcome = self.fallback.evaluate(req);
            self.counters
                .scorer_failures
                .fetch_add(u64::from(outcome.scorer_failures), Ordering::Relaxed);

            let threats = if outcome.threats.is_empty() {
                valid_verdict()
            } else {
                outcome.threats
            };
            Classification {
                phase: Phase::Ml,
                threats,
                scorer_failures: outcome.scorer_failures,
            }
        };

        if classification.threats.contains_key(&ThreatLabel::Valid) {
            self.counters.valid_verdicts.fetch_add(1, Ordering::Relaxed);
        }
        self.counters.classified.fetch_add(1, Ordering::Relaxed);

        log::debug!(
            "{} {} -> {:?} ({} phase)",
            req.method,
            req.request,
            classification.threats,
            classification.phase
        );
        Ok(classification)
    }

    /// Classify and write the threat map into the request (once)
    pub fn classify(&self, req: &mut Request) -> Result<Classification, ClassifyError> {
        if req.is_classified() {
            return Err(ClassifyError::AlreadyClassified);
        }
        let classification = self.evaluate(req)?;
        req.set_threats(classification.threats.clone());
        Ok(classification)
    }

    pub fn fallback(&self) -> &FallbackAdapter {
        &self.fallback
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }
}
