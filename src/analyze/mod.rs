// src/analyze/mod.rs
//! Analysis entry: oracle adapter, reply schema coercion, hazard analyzer, translator.

pub mod ai_adapter;
pub mod hazard;
pub mod schema;
pub mod translate;

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{DynOracle, Oracle};
pub use crate::analyze::hazard::{
    AnalysisOutcome, HazardAnalyzer, HARD_FAILURE_CONFIDENCE, SOFT_FAILURE_CONFIDENCE,
};
pub use crate::analyze::translate::Translator;
