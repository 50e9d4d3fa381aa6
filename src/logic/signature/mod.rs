//! Signature Module
//!
//! Rule-based first phase of classification.
//!
//! ## Structure
//! - `rules`: built-in patterns and the compiled SignatureSet
//! - `engine`: field scan + parameter-length check

pub mod engine;
pub mod rules;

#[cfg(test)]
mod tests;

pub use engine::SignatureEngine;
pub use rules::{SignatureError, SignatureSet};
