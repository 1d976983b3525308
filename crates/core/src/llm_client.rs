use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use tracing::debug;

/// Failures crossing the boundary to the text-generation provider.
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error(transparent)]
    Api(#[from] OpenAIError),
    #[error("model refused the request: {0}")]
    Refusal(String),
    #[error("LLM response had no choices or no content")]
    EmptyResponse,
}

/// A single structured-output request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub model: String,
    /// Full conversation, starting with the system instructions.
    pub messages: Vec<ChatCompletionRequestMessage>,
    /// Name the output contract is registered under (`[a-zA-Z0-9_-]+`).
    pub schema_name: String,
    /// JSON schema the response must conform to.
    pub schema: serde_json::Value,
}

/// A generic client for structured completions.
///
/// Implementations must be safe to share between concurrent pipeline runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Submits the conversation and returns the raw JSON text of the reply.
    async fn complete_structured(&self, request: StructuredRequest) -> Result<String, LLMError>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<String, LLMError> {
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&request.model)
            .messages(request.messages)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: request.schema_name.clone(),
                    schema: Some(request.schema),
                    // schemars output is not strict-mode compatible (optional fields).
                    strict: Some(false),
                },
            })
            .build()?;

        let response: CreateChatCompletionResponse =
            self.client.chat().create(chat_request).await?;
        let message = &response
            .choices
            .first()
            .ok_or(LLMError::EmptyResponse)?
            .message;

        if let Some(refusal) = &message.refusal {
            return Err(LLMError::Refusal(refusal.clone()));
        }

        let content = message.content.clone().ok_or(LLMError::EmptyResponse)?;
        debug!(
            model = %request.model,
            schema = %request.schema_name,
            len = content.len(),
            "Structured completion received"
        );
        Ok(content)
    }
}
