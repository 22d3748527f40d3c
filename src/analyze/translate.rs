// src/analyze/translate.rs
//! Oracle-backed translation for multilingual reports. Failure returns the input unchanged.

use std::time::Duration;

use tracing::warn;

use crate::analyze::ai_adapter::{generate_with_timeout, DynOracle};

#[derive(Clone)]
pub struct Translator {
    oracle: DynOracle,
    timeout: Duration,
}

impl Translator {
    pub fn new(oracle: DynOracle, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub async fn translate(&self, text: &str, target_language: &str) -> String {
        let prompt = format!(
            "Translate the following text to {target_language}:\n\nText: \"{text}\"\n\nProvide only the translation, no additional text."
        );
        match generate_with_timeout(self.oracle.as_ref(), &prompt, self.timeout).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => text.to_string(),
            Err(e) => {
                warn!(target: "translate", error = %e, target_language, "translation failed");
                text.to_string()
            }
        }
    }
}
