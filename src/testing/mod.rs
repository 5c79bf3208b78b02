//! Deterministic signal generators shared by unit tests, integration tests,
//! and the diagnostic CLI binary.
//!
//! Only compiled for tests or when the `diagnostics_fixtures` feature is on,
//! so the production build carries none of it.

pub mod fixtures;
