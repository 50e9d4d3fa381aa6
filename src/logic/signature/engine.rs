//! Signature Engine
//!
//! Deterministic first pass. Input: Request. Output: ThreatMap (possibly
//! empty - empty means "no signature evidence", not "valid").

use crate::logic::normalize::normalize_str;
use crate::logic::request::{Location, Request, ThreatLabel, ThreatMap};
use crate::logic::tampering;

use super::rules::{SignatureError, SignatureSet};

pub struct SignatureEngine {
    set: SignatureSet,
}

impl SignatureEngine {
    pub fn new(set: SignatureSet) -> Self {
        Self { set }
    }

    pub fn builtin() -> Result<Self, SignatureError> {
        Ok(Self::new(SignatureSet::builtin()?))
    }

    pub fn signatures(&self) -> &SignatureSet {
        &self.set
    }

    /// Scan the request.
    ///
    /// Fields are visited in scan order. A category is recorded at the first
    /// field where any of its patterns matches and is not tested again.
    /// The parameter-length check runs afterwards on the same normalized text.
    pub fn scan(&self, req: &Request) -> ThreatMap {
        let fields: Vec<(Location, String)> = req
            .inspected_fields()
            .into_iter()
            .map(|(location, raw)| (location, normalize_str(raw)))
            .collect();

        let mut found = fields
            .iter()
            .fold(ThreatMap::new(), |found, (location, text)| {
                self.match_field(found, text, *location)
            });

        let request_text = field_text(&fields, Location::Request).unwrap_or("");
        let params = tampering::extract_parameters(request_text, field_text(&fields, Location::Body));
        if let Some(location) = tampering::detect(&params) {
            found.insert(ThreatLabel::ParameterTampering, location);
        }

        if !found.is_empty() {
            log::debug!("Signature hits for {} {}: {:?}", req.method, req.request, found);
        }
        found
    }

    fn match_field(&self, mut found: ThreatMap, text: &str, location: Location) -> ThreatMap {
        for (category, _) in self.set.categories() {
            if found.contains_key(&category) {
                continue;
            }
            if let Some(index) = self.set.first_match(category, text) {
                log::debug!("{} pattern #{} matched in {}", category, index, location);
                found.insert(category, location);
            }
        }
        found
    }
}

fn field_text(fields: &[(Location, String)], location: Location) -> Option<&str> {
    fields
        .iter()
        .find(|(l, _)| *l == location)
        .map(|(_, text)| text.as_str())
}
