//! Sitewatch library
//!
//! Exposes modules for integration testing

pub mod auth;
pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod report;
pub mod retry;
pub mod sources;
pub mod types;

pub use classify::{Classifier, ClassifyPolicy};
pub use engine::{RunOutcome, VisitEngine};
pub use types::{RunReport, Target, VisitOutcome};
