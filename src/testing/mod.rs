//! Testing utilities and mock implementations
//!
//! Lets the triage flow and HTTP routes run without a model API or speech
//! service.

pub mod mocks;

pub use mocks::*;
