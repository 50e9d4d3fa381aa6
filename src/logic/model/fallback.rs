//! Probabilistic Fallback Adapter
//!
//! Second phase of classification, used only when no signature matched.
//! Wraps the text scorer and the tampering scorer; a failing, slow or
//! missing scorer contributes no labels and never fails the request.

use std::sync::Arc;
use std::time::Duration;

use super::guard::CallGuard;
use super::scorer::{
    check_output, AlwaysValid, ScorerError, TamperingScorer, TextScorer, TAMPERING_LABELS,
    TEXT_LABELS,
};
use crate::constants::DEFAULT_WORKERS;
use crate::logic::normalize::normalize_str;
use crate::logic::request::{Location, Request, ThreatLabel, ThreatMap};
use crate::logic::tampering;

/// Labels contributed by the scorers, plus how many scorer calls failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub threats: ThreatMap,
    pub scorer_failures: u32,
}

pub struct FallbackAdapter {
    text: Arc<dyn TextScorer>,
    tampering: Arc<dyn TamperingScorer>,
    timeout: Duration,
    text_calls: CallGuard,
    tampering_calls: CallGuard,
}

impl FallbackAdapter {
    pub fn new(
        text: Arc<dyn TextScorer>,
        tampering: Arc<dyn TamperingScorer>,
        timeout: Duration,
    ) -> Self {
        Self {
            text,
            tampering,
            timeout,
            text_calls: CallGuard::new(DEFAULT_WORKERS),
            tampering_calls: CallGuard::new(DEFAULT_WORKERS),
        }
    }

    /// Cap outstanding calls per scorer, timed-out ones included.
    /// Match it to the number of workers sharing this adapter.
    pub fn with_call_limit(mut self, limit: usize) -> Self {
        self.text_calls = CallGuard::new(limit);
        self.tampering_calls = CallGuard::new(limit);
        self
    }

    /// Both scorers replaced by `AlwaysValid`
    pub fn always_valid(timeout: Duration) -> Self {
        Self::new(Arc::new(AlwaysValid), Arc::new(AlwaysValid), timeout)
    }

    /// (text, tampering) mean latency, `None` for scorers that do not track it
    pub fn scorer_latency_ms(&self) -> (Option<f32>, Option<f32>) {
        (self.text.avg_latency_ms(), self.tampering.avg_latency_ms())
    }

    pub fn log_scorer_latency(&self) {
        let (text, tampering) = self.scorer_latency_ms();
        if let Some(ms) = text {
            log::info!("Text scorer {}: avg {:.2} ms", self.text.name(), ms);
        }
        if let Some(ms) = tampering {
            log::info!("Tampering scorer {}: avg {:.2} ms", self.tampering.name(), ms);
        }
    }

    pub fn evaluate(&self, req: &Request) -> FallbackOutcome {
        let mut outcome = FallbackOutcome::default();

        // Text classification: one normalized snippet per populated field
        let (snippets, locations): (Vec<String>, Vec<Location>) = req
            .inspected_fields()
            .into_iter()
            .map(|(location, raw)| (normalize_str(raw), location))
            .unzip();

        if !snippets.is_empty() {
            match self.score_text(snippets) {
                Ok(labels) => record(&mut outcome.threats, labels, &locations),
                Err(e) => {
                    log::warn!("Text scorer {} failed: {}", self.text.name(), e);
                    outcome.scorer_failures += 1;
                }
            }
        }

        // Tampering classification: one length feature per parameter value
        let request_text = normalize_str(&req.request);
        let body_text = req.body_text().map(normalize_str);
        let params = tampering::extract_parameters(&request_text, body_text.as_deref());
        let (features, feature_locations) = tampering::length_features(&params);

        if !features.is_empty() {
            match self.score_lengths(features) {
                Ok(labels) => record(&mut outcome.threats, labels, &feature_locations),
                Err(e) => {
                    log::warn!("Tampering scorer {} failed: {}", self.tampering.name(), e);
                    outcome.scorer_failures += 1;
                }
            }
        }

        outcome
    }

    fn score_text(&self, snippets: Vec<String>) -> Result<Vec<ThreatLabel>, ScorerError> {
        let scorer = Arc::clone(&self.text);
        self.text_calls.call(self.timeout, move || {
            let labels = scorer.predict(&snippets)?;
            check_output(labels, snippets.len(), &TEXT_LABELS)
        })
    }

    fn score_lengths(&self, features: Vec<[f32; 1]>) -> Result<Vec<ThreatLabel>, ScorerError> {
        let scorer = Arc::clone(&self.tampering);
        self.tampering_calls.call(self.timeout, move || {
            let labels = scorer.predict(&features)?;
            check_output(labels, features.len(), &TAMPERING_LABELS)
        })
    }
}

/// Record every non-valid label at its input's location. Later inputs
/// overwrite earlier ones for the same label.
fn record(threats: &mut ThreatMap, labels: Vec<ThreatLabel>, locations: &[Location]) {
    for (label, location) in labels.into_iter().zip(locations) {
        if label.is_attack() {
            threats.insert(label, *location);
        }
    }
}
