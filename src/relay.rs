use std::sync::Arc;
use thiserror::Error;

use crate::gemini::{GenerateError, TextGenerator};
use crate::metrics::{FALLBACK_ATTEMPTS, UPSTREAM_FAILURES};
use crate::prompt::{build_prompt, clean_reply};

// The two models tried for every journal entry, in order
#[derive(Debug, Clone)]
pub struct ModelPolicy {
    pub primary: String,
    pub fallback: String,
}

impl Default for ModelPolicy {
    fn default() -> Self {
        Self {
            primary: "gemini-1.5-flash-latest".to_string(),
            fallback: "gemini-1.5-flash".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub fell_back: bool,
}

#[derive(Debug, Error)]
#[error("model {primary_model} failed: {primary}; fallback {fallback_model} failed: {fallback}")]
pub struct RelayError {
    pub primary_model: String,
    pub primary: GenerateError,
    pub fallback_model: String,
    pub fallback: GenerateError,
}

// Forwards journal entries to the generator, one fallback attempt on failure
pub struct Relay {
    generator: Arc<dyn TextGenerator>,
    models: ModelPolicy,
}

impl Relay {
    pub fn new(generator: Arc<dyn TextGenerator>, models: ModelPolicy) -> Self {
        Self { generator, models }
    }

    pub async fn reply(&self, journal_entry: &str) -> Result<Completion, RelayError> {
        let prompt = build_prompt(journal_entry);

        let primary = match self.attempt(&self.models.primary, &prompt).await {
            Ok(text) => return Ok(self.completion(&self.models.primary, text, false)),
            Err(e) => e,
        };

        tracing::warn!(
            model = %self.models.primary,
            fallback = %self.models.fallback,
            error = %primary,
            "Primary model failed, trying fallback"
        );
        FALLBACK_ATTEMPTS.inc();

        match self.attempt(&self.models.fallback, &prompt).await {
            Ok(text) => Ok(self.completion(&self.models.fallback, text, true)),
            Err(fallback) => {
                UPSTREAM_FAILURES.inc();
                Err(RelayError {
                    primary_model: self.models.primary.clone(),
                    primary,
                    fallback_model: self.models.fallback.clone(),
                    fallback,
                })
            }
        }
    }

    // one model call, a reply that cleans to nothing is a failure
    async fn attempt(&self, model: &str, prompt: &str) -> Result<String, GenerateError> {
        let raw = self.generator.generate(model, prompt).await?;
        let text = clean_reply(&raw);
        if text.is_empty() {
            return Err(GenerateError::Empty);
        }
        Ok(text)
    }

    fn completion(&self, model: &str, text: String, fell_back: bool) -> Completion {
        Completion {
            text,
            model: model.to_string(),
            fell_back,
        }
    }
}
