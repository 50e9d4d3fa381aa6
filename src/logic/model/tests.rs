//! Fallback adapter tests + mock scorers shared with the pipeline tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::scorer::{ScorerError, TamperingScorer, TextScorer};
use super::{AlwaysValid, FallbackAdapter};
use crate::logic::request::{Location, Request, ThreatLabel};

// ============================================================================
// MOCK SCORERS
// ============================================================================

type TextRule = Box<dyn Fn(&str) -> ThreatLabel + Send + Sync>;
type LengthRule = Box<dyn Fn(f32) -> ThreatLabel + Send + Sync>;

/// Text scorer labelling each snippet with a closure; counts calls
pub(crate) struct MockText {
    rule: TextRule,
    pub calls: AtomicUsize,
    pub last_input: Mutex<Vec<String>>,
}

impl MockText {
    pub fn new(rule: impl Fn(&str) -> ThreatLabel + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            rule: Box::new(rule),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(Vec::new()),
        })
    }

    pub fn valid() -> Arc<Self> {
        Self::new(|_| ThreatLabel::Valid)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextScorer for MockText {
    fn name(&self) -> &str {
        "mock-text"
    }

    fn predict(&self, snippets: &[String]) -> Result<Vec<ThreatLabel>, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock() = snippets.to_vec();
        Ok(snippets.iter().map(|s| (self.rule)(s)).collect())
    }
}

/// Tampering scorer labelling each length with a closure; counts calls
pub(crate) struct MockTampering {
    rule: LengthRule,
    pub calls: AtomicUsize,
    pub last_input: Mutex<Vec<[f32; 1]>>,
}

impl MockTampering {
    pub fn new(rule: impl Fn(f32) -> ThreatLabel + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            rule: Box::new(rule),
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(Vec::new()),
        })
    }

    pub fn valid() -> Arc<Self> {
        Self::new(|_| ThreatLabel::Valid)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TamperingScorer for MockTampering {
    fn name(&self) -> &str {
        "mock-tampering"
    }

    fn predict(&self, features: &[[f32; 1]]) -> Result<Vec<ThreatLabel>, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock() = features.to_vec();
        Ok(features.iter().map(|f| (self.rule)(f[0])).collect())
    }
}

/// Scorer that always raises
pub(crate) struct Broken;

impl TextScorer for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn predict(&self, _: &[String]) -> Result<Vec<ThreatLabel>, ScorerError> {
        Err(ScorerError::Inference("model crashed".to_string()))
    }
}

impl TamperingScorer for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn predict(&self, _: &[[f32; 1]]) -> Result<Vec<ThreatLabel>, ScorerError> {
        Err(ScorerError::Inference("model crashed".to_string()))
    }
}

/// Scorer that never answers in time; counts calls that reached it
pub(crate) struct Stalled {
    delay: Duration,
    pub started: AtomicUsize,
}

impl Stalled {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: AtomicUsize::new(0),
        })
    }
}

impl TextScorer for Stalled {
    fn name(&self) -> &str {
        "stalled"
    }

    fn predict(&self, snippets: &[String]) -> Result<Vec<ThreatLabel>, ScorerError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(vec![ThreatLabel::Xss; snippets.len()])
    }
}

const TIMEOUT: Duration = Duration::from_millis(500);

fn request() -> Request {
    Request::new("10.1.1.1", "api.local", "POST", "/items?page=2&sort=name")
        .with_body("title=hello")
        .with_header("Cookie", "sid=abc")
        .with_header("User-Agent", "curl/8.0")
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_text_labels_recorded_at_field_location() {
    let text = MockText::new(|s| if s.starts_with("sid=") { ThreatLabel::Sqli } else { ThreatLabel::Valid });
    let adapter = FallbackAdapter::new(text.clone(), MockTampering::valid(), TIMEOUT);

    let outcome = adapter.evaluate(&request());

    assert_eq!(outcome.threats.len(), 1);
    assert_eq!(outcome.threats.get(&ThreatLabel::Sqli), Some(&Location::Cookie));
    assert_eq!(outcome.scorer_failures, 0);
    assert_eq!(
        *text.last_input.lock(),
        vec!["/items?page=2&sort=name", "title=hello", "sid=abc", "curl/8.0"]
    );
}

#[test]
fn test_recurring_label_last_field_wins() {
    let text = MockText::new(|_| ThreatLabel::Xss);
    let adapter = FallbackAdapter::new(text, MockTampering::valid(), TIMEOUT);

    let outcome = adapter.evaluate(&request());
    assert_eq!(outcome.threats.get(&ThreatLabel::Xss), Some(&Location::UserAgent));
}

#[test]
fn test_length_features_request_then_body() {
    let tampering = MockTampering::new(|len| {
        if len == 5.0 { ThreatLabel::ParameterTampering } else { ThreatLabel::Valid }
    });
    let adapter = FallbackAdapter::new(MockText::valid(), tampering.clone(), TIMEOUT);

    let outcome = adapter.evaluate(&request());

    // page=2, sort=name, title=hello
    assert_eq!(*tampering.last_input.lock(), vec![[1.0], [4.0], [5.0]]);
    assert_eq!(outcome.threats.get(&ThreatLabel::ParameterTampering), Some(&Location::Body));
}

#[test]
fn test_json_body_lengths_in_encounter_order() {
    let tampering = MockTampering::valid();
    let adapter = FallbackAdapter::new(MockText::valid(), tampering.clone(), TIMEOUT);

    let req = Request::new("10.1.1.1", "api.local", "POST", "/items")
        .with_body("{\"zeta\": \"aaaaa\", \"alpha\": \"b\"}");
    adapter.evaluate(&req);

    assert_eq!(*tampering.last_input.lock(), vec![[5.0], [1.0]]);
}

#[test]
fn test_broken_text_scorer_degrades() {
    let tampering = MockTampering::new(|_| ThreatLabel::ParameterTampering);
    let adapter = FallbackAdapter::new(Arc::new(Broken), tampering, TIMEOUT);

    let outcome = adapter.evaluate(&request());

    assert_eq!(outcome.scorer_failures, 1);
    assert_eq!(outcome.threats.len(), 1);
    assert!(outcome.threats.contains_key(&ThreatLabel::ParameterTampering));
}

#[test]
fn test_stalled_scorer_times_out() {
    let adapter = FallbackAdapter::new(
        Stalled::new(Duration::from_secs(2)),
        Arc::new(AlwaysValid),
        Duration::from_millis(50),
    );

    let outcome = adapter.evaluate(&request());
    assert!(outcome.threats.is_empty());
    assert_eq!(outcome.scorer_failures, 1);
}

#[test]
fn test_hung_scorer_holds_bounded_threads() {
    let stalled = Stalled::new(Duration::from_secs(5));
    let adapter = FallbackAdapter::new(stalled.clone(), Arc::new(AlwaysValid), Duration::from_millis(5))
        .with_call_limit(2);

    for _ in 0..50 {
        let outcome = adapter.evaluate(&request());
        assert!(outcome.threats.is_empty());
        assert_eq!(outcome.scorer_failures, 1);
    }

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(stalled.started.load(Ordering::SeqCst), 2);
}

#[test]
fn test_untracked_latency_is_none() {
    let adapter = FallbackAdapter::always_valid(TIMEOUT);
    adapter.evaluate(&request());
    assert_eq!(adapter.scorer_latency_ms(), (None, None));
}

#[test]
fn test_out_of_contract_output_discarded() {
    // Text scorer answering with a tampering label breaks the contract
    let text = MockText::new(|_| ThreatLabel::ParameterTampering);
    let adapter = FallbackAdapter::new(text, MockTampering::valid(), TIMEOUT);

    let outcome = adapter.evaluate(&request());
    assert!(outcome.threats.is_empty());
    assert_eq!(outcome.scorer_failures, 1);
}

#[test]
fn test_no_parameters_skips_tampering_scorer() {
    let tampering = MockTampering::valid();
    let adapter = FallbackAdapter::new(MockText::valid(), tampering.clone(), TIMEOUT);

    let req = Request::new("10.1.1.1", "api.local", "GET", "/health");
    let outcome = adapter.evaluate(&req);

    assert!(outcome.threats.is_empty());
    assert_eq!(tampering.calls(), 0);
}
