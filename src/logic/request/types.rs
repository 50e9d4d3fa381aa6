//! Request Types
//!
//! Threat labels, evidence locations and the threat map.
//! KHÔNG chứa logic - chỉ data structures.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// THREAT LABEL
// ============================================================================

/// Label assigned to a request by the classification pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatLabel {
    Sqli,
    Xss,
    Cmdi,
    PathTraversal,
    ParameterTampering,
    /// No evidence found - recorded explicitly, never an empty map
    Valid,
}

impl ThreatLabel {
    /// Categories covered by the signature set, in scan order
    pub const SIGNATURE_CATEGORIES: [ThreatLabel; 4] = [
        ThreatLabel::Sqli,
        ThreatLabel::Xss,
        ThreatLabel::Cmdi,
        ThreatLabel::PathTraversal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLabel::Sqli => "sqli",
            ThreatLabel::Xss => "xss",
            ThreatLabel::Cmdi => "cmdi",
            ThreatLabel::PathTraversal => "path-traversal",
            ThreatLabel::ParameterTampering => "parameter-tampering",
            ThreatLabel::Valid => "valid",
        }
    }

    pub fn is_attack(&self) -> bool {
        !matches!(self, ThreatLabel::Valid)
    }
}

impl std::fmt::Display for ThreatLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ThreatLabel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sqli" => Ok(ThreatLabel::Sqli),
            "xss" => Ok(ThreatLabel::Xss),
            "cmdi" => Ok(ThreatLabel::Cmdi),
            "path-traversal" => Ok(ThreatLabel::PathTraversal),
            "parameter-tampering" => Ok(ThreatLabel::ParameterTampering),
            "valid" => Ok(ThreatLabel::Valid),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

// ============================================================================
// LOCATION
// ============================================================================

/// Request subfield where evidence was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    Request,
    Body,
    Cookie,
    UserAgent,
    AcceptEncoding,
    AcceptLanguage,
    /// Empty location, paired with `valid`
    Unattributed,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Request => "Request",
            Location::Body => "Body",
            Location::Cookie => "Cookie",
            Location::UserAgent => "User Agent",
            Location::AcceptEncoding => "Accept Encoding",
            Location::AcceptLanguage => "Accept Language",
            Location::Unattributed => "",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Location {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Request" => Ok(Location::Request),
            "Body" => Ok(Location::Body),
            "Cookie" => Ok(Location::Cookie),
            "User Agent" => Ok(Location::UserAgent),
            "Accept Encoding" => Ok(Location::AcceptEncoding),
            "Accept Language" => Ok(Location::AcceptLanguage),
            "" => Ok(Location::Unattributed),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Stored label or location text that does not map to a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant: {0:?}")]
pub struct UnknownVariant(pub String);

// ============================================================================
// THREAT MAP
// ============================================================================

/// Threat label -> location. One location per label.
pub type ThreatMap = BTreeMap<ThreatLabel, Location>;

/// The terminal verdict when nothing was found
pub fn valid_verdict() -> ThreatMap {
    let mut map = ThreatMap::new();
    map.insert(ThreatLabel::Valid, Location::Unattributed);
    map
}
