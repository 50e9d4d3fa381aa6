use super::{SignatureEngine, SignatureSet};
use crate::logic::request::{Location, Request, ThreatLabel, ThreatMap};

fn engine() -> SignatureEngine {
    SignatureEngine::builtin().unwrap()
}

fn get(path: &str) -> Request {
    Request::new("192.168.1.20", "shop.local", "GET", path)
}

fn map(entries: &[(ThreatLabel, Location)]) -> ThreatMap {
    entries.iter().copied().collect()
}

#[test]
fn test_quoted_tautology_in_request_line() {
    let found = engine().scan(&get("GET /?id=1' OR '1'='1"));
    assert_eq!(found, map(&[(ThreatLabel::Sqli, Location::Request)]));
}

#[test]
fn test_clean_request_has_no_evidence() {
    let found = engine().scan(&get("GET /search?q=hello"));
    assert!(found.is_empty());
}

#[test]
fn test_long_json_value_is_tampering_in_body() {
    let body = format!("{{\"token\": \"{}\"}}", "a".repeat(101));
    let req = Request::new("192.168.1.20", "shop.local", "POST", "/api/login").with_body(body);

    let found = engine().scan(&req);
    assert_eq!(found, map(&[(ThreatLabel::ParameterTampering, Location::Body)]));
}

#[test]
fn test_parameter_length_boundary() {
    let at_limit = engine().scan(&get(&format!("/page?v={}", "b".repeat(100))));
    assert!(at_limit.is_empty());

    let over_limit = engine().scan(&get(&format!("/page?v={}", "b".repeat(101))));
    assert_eq!(over_limit, map(&[(ThreatLabel::ParameterTampering, Location::Request)]));
}

#[test]
fn test_two_categories_in_one_field() {
    let found = engine().scan(&get("/?q=<script>alert(1)</script> union select"));
    assert_eq!(
        found,
        map(&[(ThreatLabel::Sqli, Location::Request), (ThreatLabel::Xss, Location::Request)])
    );
}

#[test]
fn test_first_field_wins_per_category() {
    let req = get("/?id=1 or 1=1").with_body("name=union select password from users");
    let found = engine().scan(&req);
    assert_eq!(found, map(&[(ThreatLabel::Sqli, Location::Request)]));
}

#[test]
fn test_header_locations() {
    let req = get("/")
        .with_header("User-Agent", "<script>x</script>")
        .with_header("Cookie", "file=../../etc/passwd");

    let found = engine().scan(&req);
    assert_eq!(
        found,
        map(&[
            (ThreatLabel::Xss, Location::UserAgent),
            (ThreatLabel::PathTraversal, Location::Cookie),
        ])
    );
}

#[test]
fn test_encoded_payload_is_normalized_before_matching() {
    let found = engine().scan(&get("/?q=%253Cscript%253E"));
    assert_eq!(found.get(&ThreatLabel::Xss), Some(&Location::Request));
}

#[test]
fn test_uninspected_header_ignored() {
    let req = get("/").with_header("Referer", "<script>alert(1)</script>");
    assert!(engine().scan(&req).is_empty());
}

#[test]
fn test_custom_set_limits_categories() {
    let set = SignatureSet::from_patterns(&[(ThreatLabel::Xss, &[r"(?i)<\s*script"])]).unwrap();
    let engine = SignatureEngine::new(set);

    let found = engine.scan(&get("/?q=<script> union select"));
    assert_eq!(found, map(&[(ThreatLabel::Xss, Location::Request)]));
}

#[test]
fn test_malformed_json_body_does_not_fail_scan() {
    let req = Request::new("192.168.1.20", "shop.local", "POST", "/api").with_body("{\"token\": ");
    assert!(engine().scan(&req).is_empty());
}
