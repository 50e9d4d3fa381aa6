//! Captured header fields
//!
//! The producer records only these headers. Names are compared
//! case-insensitively and `_` is accepted in place of `-`.

/// Header fields a producer may record for a request
pub const HEADER_FIELDS: &[&str] = &[
    "Http-Version", "A-IM", "Accept", "Accept-Charset", "Accept-Datetime",
    "Accept-Encoding", "Accept-Language", "Access-Control-Request-Headers",
    "Access-Control-Request-Method", "Authorization", "Cache-Control",
    "Connection", "Content-Length", "Content-MD5", "Content-Type", "Cookie",
    "DNT", "Date", "Expect", "Forwarded", "From", "Front-End-Https",
    "If-Match", "If-Modified-Since", "If-None-Match", "If-Range",
    "If-Unmodified-Since", "Keep-Alive", "Max-Forwards", "Origin",
    "Permanent", "Pragma", "Proxy-Authorization", "Proxy-Connection", "Range",
    "Referer", "Save-Data", "TE", "Upgrade", "Upgrade-Insecure-Requests",
    "User-Agent", "Via", "Warning", "X-ATT-DeviceId", "X-Correlation-ID",
    "X-Csrf-Token", "X-Forwarded-For", "X-Forwarded-Host",
    "X-Forwarded-Proto", "X-Http-Method-Override", "X-Request-ID",
    "X-Requested-With", "X-UIDH", "X-Wap-Profile",
];

pub const COOKIE: &str = "Cookie";
pub const USER_AGENT: &str = "User-Agent";
pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
pub const ACCEPT_LANGUAGE: &str = "Accept-Language";

/// Compare two header names, ignoring case and `_`/`-` spelling
pub fn same_header(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes().zip(b.bytes()).all(|(x, y)| fold(x) == fold(y))
}

/// Canonical spelling from `HEADER_FIELDS`, or `None` if not captured
pub fn canonical_name(name: &str) -> Option<&'static str> {
    HEADER_FIELDS.iter().copied().find(|field| same_header(field, name))
}

fn fold(b: u8) -> u8 {
    match b {
        b'_' => b'-',
        other => other.to_ascii_lowercase(),
    }
}
