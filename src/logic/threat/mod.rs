//! Threat Module
//!
//! Threat Classification Pipeline - decides the final threat map for each
//! request.
//!
//! ## Structure
//! - `types`: Phase, Classification, ClassifyError, PipelineStats
//! - `classifier`: the two-phase decision policy
//!
//! ## Usage
//! ```ignore
//! use crate::logic::threat::ThreatClassifier;
//!
//! let classifier = ThreatClassifier::new(SignatureEngine::builtin()?, fallback);
//! let result = classifier.classify(&mut request)?;
//! match result.phase {
//!     Phase::Signature => println!("Signature hit"),
//!     Phase::Ml => println!("Scored by fallback"),
//! }
//! ```

pub mod classifier;
pub mod types;


pub use classifier::ThreatClassifier;
pub use types::{Classification, ClassifyError, Phase, PipelineStats};
