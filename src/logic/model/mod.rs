//! Model Module - ML Fallback Classification
//!
//! Tách scorer contract khỏi pipeline: the pipeline receives ready-made
//! scorers and never loads models itself.

pub mod fallback;
pub mod guard;
pub mod inference;
pub mod scorer;

#[cfg(test)]
pub(crate) mod tests;

// Re-export common types
pub use fallback::{FallbackAdapter, FallbackOutcome};
pub use inference::{load_tampering_scorer, load_text_scorer, OnnxTamperingScorer, OnnxTextScorer};
pub use scorer::{AlwaysValid, ScorerError, TamperingScorer, TextScorer};
