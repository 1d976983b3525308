//! Structured generation against a fixed instruction set and output schema.

use crate::{
    error::{PipelineError, Result},
    llm_client::{LLMClient, LLMError, StructuredRequest},
};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Immutable per-stage configuration for a generator or critic.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Stage label used in logs and errors (e.g. `"knowledge_graph"`).
    pub name: String,
    pub model: String,
    /// System instructions describing the task and output rules.
    pub instructions: String,
    /// Name of the output contract sent to the provider.
    pub schema_name: String,
    /// Extra requests allowed when the output fails to parse or validate.
    pub output_retries: u32,
    /// Upper bound for a single provider call.
    pub call_timeout: Duration,
}

impl GeneratorConfig {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instructions: impl Into<String>,
        schema_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instructions: instructions.into(),
            schema_name: schema_name.into(),
            output_retries: 1,
            call_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_output_retries(mut self, output_retries: u32) -> Self {
        self.output_retries = output_retries;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}

/// Invokes the LLM with a typed output contract and returns a validated value.
///
/// Parsing and domain validation failures are retried locally, by showing the
/// model its rejected output together with the reason, up to
/// `output_retries` times. Provider failures and timeouts are not retried.
pub struct StructuredGenerator {
    client: Arc<dyn LLMClient>,
    config: GeneratorConfig,
}

impl StructuredGenerator {
    pub fn new(client: Arc<dyn LLMClient>, config: GeneratorConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Runs the request built from `prompt` until `validate` accepts a value.
    ///
    /// `validate` may normalize the value it is handed; an `Err` carries the
    /// reason the output was rejected.
    pub async fn generate<T, F>(&self, prompt: String, mut validate: F) -> Result<T>
    where
        T: DeserializeOwned + JsonSchema + Send,
        F: FnMut(T) -> std::result::Result<T, String> + Send,
    {
        let schema = schema_for!(T).to_value();
        let mut messages = vec![
            self.system_message()?,
            self.user_message(prompt)?,
        ];
        let max_attempts = self.config.output_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                stage = %self.config.name,
                attempt,
                messages = messages.len(),
                "Issuing structured request"
            );
            let raw = self.call(messages.clone(), schema.clone()).await?;

            let reason = match serde_json::from_str::<T>(&raw) {
                Ok(value) => match validate(value) {
                    Ok(accepted) => return Ok(accepted),
                    Err(reason) => reason,
                },
                Err(e) => format!("output does not match the schema: {e}"),
            };

            if attempt >= max_attempts {
                return Err(PipelineError::SchemaValidation {
                    stage: self.config.name.clone(),
                    attempts: attempt,
                    reason,
                });
            }

            warn!(stage = %self.config.name, attempt, %reason, "Output rejected, asking for a correction");
            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(raw)
                    .build()
                    .map_err(|e| self.external(e.into()))?
                    .into(),
            );
            messages.push(self.user_message(format!(
                "Your previous output was rejected: {reason}\nReturn a corrected object that fixes this."
            ))?);
        }
    }

    async fn call(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        schema: serde_json::Value,
    ) -> Result<String> {
        let request = StructuredRequest {
            model: self.config.model.clone(),
            messages,
            schema_name: self.config.schema_name.clone(),
            schema,
        };

        timeout(
            self.config.call_timeout,
            self.client.complete_structured(request),
        )
        .await
        .map_err(|_| PipelineError::Timeout {
            stage: self.config.name.clone(),
            after: self.config.call_timeout,
        })?
        .map_err(|e| self.external(e))
    }

    fn system_message(&self) -> Result<ChatCompletionRequestMessage> {
        Ok(ChatCompletionRequestSystemMessageArgs::default()
            .content(self.config.instructions.clone())
            .build()
            .map_err(|e| self.external(e.into()))?
            .into())
    }

    fn user_message(&self, content: String) -> Result<ChatCompletionRequestMessage> {
        Ok(ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map_err(|e| self.external(e.into()))?
            .into())
    }

    fn external(&self, source: LLMError) -> PipelineError {
        PipelineError::ExternalCall {
            stage: self.config.name.clone(),
            source,
        }
    }
}
