pub mod types;

pub use types::{
    AssistantMessage, ChatChoice, ChatCompletion, ChatCompletionRequest, ChatMessage,
    ChatMessageContent, ImageUrl, JsonSchema, MessagePart, ResponseFormat,
};

use super::http::ProviderHttpClient;
use crate::{Error, Result};

/// POST a chat-completions request and require at least one choice back.
pub async fn chat_completion(
    http: &ProviderHttpClient,
    path: &str,
    request: &ChatCompletionRequest,
) -> Result<ChatCompletion> {
    tracing::debug!(
        "Sending chat completion request to {} (model: {})",
        http.provider(),
        request.model
    );

    let completion: ChatCompletion = http.post_json(path, request).await?;
    if completion.choices.is_empty() {
        return Err(Error::AiProvider(format!(
            "No choices in {} chat completion",
            http.provider()
        )));
    }
    Ok(completion)
}
