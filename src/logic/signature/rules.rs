//! Signature Set
//!
//! Categorized regex signatures, simplified from the OWASP CRS.
//! Built once at startup, read-only afterwards.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::logic::request::ThreatLabel;

// ============================================================================
// BUILT-IN PATTERNS
// ============================================================================

/// SQL injection
pub const SQLI_PATTERNS: &[&str] = &[
    r"(?i)(?:\bunion\b\s+select|\bselect\b.+\bfrom\b)",
    r"(?i)(?:\bdrop\b\s+table|\binsert\b\s+into|\bupdate\b\s+\w+\s+set)",
    r"(?i)(?:'\s*or\s*'\d+'='\d+'|'\s*or\s*1=1|\bor\b\s+1=1)",
    // Quoted tautology left open for the application's own closing quote
    r"(?i)'\s*or\s*'?\d+'?\s*=\s*'?\d+",
    r"(?i)(?:;\s*--|--\s*)",
    r"(?i)\b(benchmark|sleep|information_schema)\b",
];

/// Cross-site scripting
pub const XSS_PATTERNS: &[&str] = &[
    r"(?i)<\s*script",
    r"(?i)<\s*img\b[^>]*\bonerror\b",
    r"(?i)javascript:\s*",
    r"(?i)onload\s*=",
    r"(?i)alert\s*\(",
];

/// Command injection
pub const CMDI_PATTERNS: &[&str] = &[
    r"(?i)(?:;|&&|\|\||\|)\s*\w+",
    r"(?i)`[^`]+`",
    r"(?i)\b(cat|ls|rm|wget|curl|whoami|powershell|cmd\.exe|sh)\b",
];

/// Path traversal
pub const PATH_TRAVERSAL_PATTERNS: &[&str] = &[
    r"(?i)\.\.\s*/",
    r"(?i)\.\.\\",
    r"(?i)(?:/|\\)etc(?:/|\\)passwd",
    r"(?i)web-inf|boot\.ini",
];

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid pattern for {category}: {source}")]
    InvalidPattern {
        category: ThreatLabel,
        #[source]
        source: regex::Error,
    },
    #[error("{0} is not a signature category")]
    UnsupportedCategory(ThreatLabel),
}

// ============================================================================
// SIGNATURE SET
// ============================================================================

/// Ordered category -> ordered pattern list
#[derive(Debug, Clone)]
pub struct SignatureSet {
    categories: Vec<(ThreatLabel, Vec<Regex>)>,
}

/// Compiled once per process
static BUILTIN: OnceCell<SignatureSet> = OnceCell::new();

impl SignatureSet {
    /// The built-in set: sqli, xss, cmdi, path-traversal (in that order)
    pub fn builtin() -> Result<Self, SignatureError> {
        BUILTIN
            .get_or_try_init(|| {
                Self::from_patterns(&[
                    (ThreatLabel::Sqli, SQLI_PATTERNS),
                    (ThreatLabel::Xss, XSS_PATTERNS),
                    (ThreatLabel::Cmdi, CMDI_PATTERNS),
                    (ThreatLabel::PathTraversal, PATH_TRAVERSAL_PATTERNS),
                ])
            })
            .cloned()
    }

    /// Compile a custom set. Category order and pattern order are kept.
    pub fn from_patterns(table: &[(ThreatLabel, &[&str])]) -> Result<Self, SignatureError> {
        let mut categories = Vec::with_capacity(table.len());

        for (category, patterns) in table {
            if !ThreatLabel::SIGNATURE_CATEGORIES.contains(category) {
                return Err(SignatureError::UnsupportedCategory(*category));
            }
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| SignatureError::InvalidPattern {
                    category: *category,
                    source,
                })?;
            categories.push((*category, compiled));
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> impl Iterator<Item = (ThreatLabel, &[Regex])> {
        self.categories.iter().map(|(c, p)| (*c, p.as_slice()))
    }

    /// Index of the first pattern of `category` matching `text`
    pub fn first_match(&self, category: ThreatLabel, text: &str) -> Option<usize> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .and_then(|(_, patterns)| patterns.iter().position(|p| p.is_match(text)))
    }

    pub fn pattern_count(&self) -> usize {
        self.categories.iter().map(|(_, p)| p.len()).sum()
    }
}
