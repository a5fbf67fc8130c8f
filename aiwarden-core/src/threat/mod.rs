//! Threat classification engine
//!
//! Three layers, leaves first:
//! - [`secrets`] - stateless pattern bank matching known credential formats
//! - [`rules`] - static, ordered pattern tables per threat dimension
//! - [`classify`] - ten independent analyzers plus the aggregation fold
//!
//! Everything in this module is pure: no I/O, no shared state, and no
//! failure modes beyond "no finding."

pub mod classify;
pub mod rules;
pub mod secrets;

pub use classify::{classify, ActivityInput, Classification};
pub use secrets::{scan_secrets, SecretScan};
