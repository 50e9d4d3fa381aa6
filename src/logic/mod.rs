//! Logic Module - Classification & Audit Engines
//!
//! ## Flow
//! Request -> `signature` (normalize + patterns + tampering check)
//!         -> `model` fallback only when no signature matched
//!         -> `threat` decides the final map
//!         -> `audit` persists it
//!
//! `sensor` runs the flow for a stream of requests on a worker pool.

// Data
pub mod request;

// Pure helpers
pub mod normalize;
pub mod tampering;

// Engines
pub mod signature;
pub mod model;
pub mod threat;

// Storage & runtime
pub mod audit;
pub mod sensor;
