//! `CodeGenerator` backed by a chat model.

use std::sync::Arc;

use apidrift_core::{
    ApiChange, CodeGenerator, GeneratorError, GeneratorFactory, GeneratorResult, Model,
    TestOutcome,
};
use async_trait::async_trait;
use tracing::debug;

use crate::client::ChatClient;
use crate::fences::strip_code_fences;
use crate::prompts::{self, Prompt};

/// Generator bound to one model.
#[derive(Debug, Clone)]
pub struct LlmGenerator {
    client: Arc<ChatClient>,
    model: Model,
}

impl LlmGenerator {
    pub fn new(client: Arc<ChatClient>, model: Model) -> Self {
        Self { client, model }
    }

    pub fn model(&self) -> Model {
        self.model
    }

    async fn ask(&self, operation: &'static str, prompt: Prompt) -> GeneratorResult<String> {
        debug!(operation, model = %self.model, "requesting completion");
        let reply = self.client.complete(self.model, &prompt).await?;
        let text = strip_code_fences(&reply);
        if text.is_empty() {
            return Err(GeneratorError::InvalidResponse(format!(
                "{operation}: reply contained no code"
            )));
        }
        Ok(text)
    }
}

#[async_trait]
impl CodeGenerator for LlmGenerator {
    async fn generate_code(&self, change: &ApiChange) -> GeneratorResult<String> {
        let prompt = prompts::generate_code(change);
        self.ask("generate_code", prompt).await
    }

    async fn generate_build_config(
        &self,
        change: &ApiChange,
        code: &str,
    ) -> GeneratorResult<String> {
        self.ask(
            "generate_build_config",
            prompts::generate_build_config(change, code),
        )
        .await
    }

    async fn repair_code(
        &self,
        change: &ApiChange,
        previous_code: &str,
        previous_build: &str,
        previous_outcome: &TestOutcome,
    ) -> GeneratorResult<String> {
        self.ask(
            "repair_code",
            prompts::repair_code(change, previous_code, previous_build, previous_outcome),
        )
        .await
    }

    async fn repair_build_config(
        &self,
        change: &ApiChange,
        new_code: &str,
        previous_code: &str,
        previous_build: &str,
        previous_outcome: &TestOutcome,
    ) -> GeneratorResult<String> {
        self.ask(
            "repair_build_config",
            prompts::repair_build_config(
                change,
                new_code,
                previous_code,
                previous_build,
                previous_outcome,
            ),
        )
        .await
    }
}

/// Builds an [`LlmGenerator`] per model over one shared client.
#[derive(Debug, Clone)]
pub struct LlmGeneratorFactory {
    client: Arc<ChatClient>,
}

impl LlmGeneratorFactory {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl GeneratorFactory for LlmGeneratorFactory {
    fn for_model(&self, model: Model) -> GeneratorResult<Arc<dyn CodeGenerator>> {
        let provider = model.provider();
        if self.client.config().api_key(provider).is_none() {
            return Err(GeneratorError::NotConfigured(format!(
                "model {model} needs an API key for {provider}"
            )));
        }
        Ok(Arc::new(LlmGenerator::new(Arc::clone(&self.client), model)))
    }
}
