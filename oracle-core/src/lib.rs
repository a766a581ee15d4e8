//! Core types for the Prediction Market Oracle
//!
//! This crate defines the shared data structures used across the oracle:
//! market questions, extracted facts, citations, decisions, and the
//! workspace-wide error type.

pub mod decision;
pub mod error;
pub mod market;

pub use decision::{validate_outcome, Citation, Decision, Fact, Source};
pub use error::{OracleError, OracleResult, Stage, ValidationError};
pub use market::{MarketQuestion, BINARY_OUTCOMES};
