//! Parameter Tampering Detector
//!
//! Extracts parameter values from the normalized request line and body and
//! flags any value longer than `MAX_PARAMETER_LENGTH` characters.
//!
//! Body parameters: form-encoded first; if that yields nothing, the body is
//! parsed as a JSON object whose top-level values become candidates (arrays
//! contribute one candidate per element). Parse failures give an empty set.
//!
//! The same extraction feeds the ML tampering scorer (`length_features`).

use crate::constants::MAX_PARAMETER_LENGTH;
use crate::logic::normalize::unquote_plus;
use crate::logic::request::Location;

/// Local parse failure - always recovered as an empty parameter set
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON body is not an object")]
    NotAnObject,
}

/// Parameter values in encounter order, split by origin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    pub request: Vec<String>,
    pub body: Vec<String>,
}

impl Parameters {
    pub fn is_empty(&self) -> bool {
        self.request.is_empty() && self.body.is_empty()
    }
}

/// Extract parameters from already-normalized request line and body
pub fn extract_parameters(request: &str, body: Option<&str>) -> Parameters {
    let request_values = parse_query(request).into_iter().map(|(_, v)| v).collect();

    let body_values = match body.filter(|b| !b.is_empty()) {
        Some(text) => {
            let form: Vec<String> = parse_query(text).into_iter().map(|(_, v)| v).collect();
            if form.is_empty() {
                parse_json_values(text).unwrap_or_else(|e| {
                    log::debug!("Body parameters unavailable: {}", e);
                    Vec::new()
                })
            } else {
                form
            }
        }
        None => Vec::new(),
    };

    Parameters {
        request: request_values,
        body: body_values,
    }
}

/// Form/query-string pairs. Segments without `=` or with an empty value
/// are skipped; names and values are form-decoded once more.
pub fn parse_query(text: &str) -> Vec<(String, String)> {
    text.split('&')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_once('='))
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (unquote_plus(name), unquote_plus(value)))
        .collect()
}

/// Top-level values of a JSON object, scalarized to text
pub fn parse_json_values(text: &str) -> Result<Vec<String>, ParseError> {
    let parsed: serde_json::Value = serde_json::from_str(text)?;
    let object = parsed.as_object().ok_or(ParseError::NotAnObject)?;

    let mut values = Vec::new();
    for value in object.values() {
        match value {
            serde_json::Value::Array(items) => values.extend(items.iter().map(scalarize)),
            other => values.push(scalarize(other)),
        }
    }
    Ok(values)
}

fn scalarize(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Deterministic length check.
///
/// The location is `Body` whenever body parameters exist, otherwise
/// `Request`, regardless of which set held the long value.
pub fn detect(params: &Parameters) -> Option<Location> {
    let tampered = params
        .request
        .iter()
        .chain(params.body.iter())
        .any(|v| char_len(v) > MAX_PARAMETER_LENGTH);

    if !tampered {
        return None;
    }
    Some(if params.body.is_empty() {
        Location::Request
    } else {
        Location::Body
    })
}

/// One single-valued feature vector per parameter value, request values
/// first, each paired with the location it came from
pub fn length_features(params: &Parameters) -> (Vec<[f32; 1]>, Vec<Location>) {
    let request = params.request.iter().map(|v| (v, Location::Request));
    let body = params.body.iter().map(|v| (v, Location::Body));

    request
        .chain(body)
        .map(|(v, location)| ([char_len(v) as f32], location))
        .unzip()
}
