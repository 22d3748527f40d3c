// src/config/mod.rs
//! File + env configuration: `config/ai.json` for the oracle,
//! `config/pipeline.toml` for batch/trend knobs.

pub mod ai;
pub mod pipeline;

pub use ai::AiConfig;
pub use pipeline::PipelineConfig;
