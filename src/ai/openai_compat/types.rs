//! OpenAI-style chat-completions payloads.
//!
//! Fireworks, Together and BaseTen speak this dialect natively; Bedrock and
//! Vertex results are rewrapped into [`ChatCompletion`] so every evaluation
//! adapter returns the same envelope.

use serde::{Deserialize, Serialize};

/// Request body for chat completions.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: 1024,
            temperature: None,
            top_p: None,
            top_k: None,
            presence_penalty: None,
            frequency_penalty: None,
            response_format: None,
        }
    }
}

/// Structured-output directive. Vendors disagree on the exact dialect.
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject { schema: serde_json::Value },
    JsonSchema { json_schema: JsonSchema },
}

#[derive(Debug, Serialize, Clone)]
pub struct JsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// Message content union.
///
/// Variant order matters for `#[serde(untagged)]` decoding.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatMessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: ChatMessageContent,
}

impl ChatMessage {
    /// A user turn carrying an image followed by the instruction text.
    pub fn user_with_image(image_url: String, text: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: ChatMessageContent::Parts(vec![
                MessagePart {
                    part_type: "image_url".to_string(),
                    text: None,
                    image_url: Some(ImageUrl { url: image_url }),
                },
                MessagePart {
                    part_type: "text".to_string(),
                    text: Some(text.to_string()),
                    image_url: None,
                },
            ]),
        }
    }
}

/// Top-level chat completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletion {
    /// Text content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: AssistantMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_format_json_object_shape() {
        let format = ResponseFormat::JsonObject {
            schema: serde_json::json!({ "type": "object" }),
        };
        assert_eq!(
            serde_json::to_value(&format).unwrap(),
            serde_json::json!({ "type": "json_object", "schema": { "type": "object" } })
        );
    }

    #[test]
    fn test_response_format_json_schema_shape() {
        let format = ResponseFormat::JsonSchema {
            json_schema: JsonSchema {
                name: "evaluation".to_string(),
                schema: serde_json::json!({}),
            },
        };
        assert_eq!(
            serde_json::to_value(&format).unwrap(),
            serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": "evaluation", "schema": {} }
            })
        );
    }

    #[test]
    fn test_user_with_image_puts_image_first() {
        let message = ChatMessage::user_with_image("data:image/png;base64,AA".to_string(), "rate");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["content"][0]["type"], "image_url");
        assert_eq!(json["content"][0]["image_url"]["url"], "data:image/png;base64,AA");
        assert_eq!(json["content"][1]["text"], "rate");
        assert!(json["content"][1].get("image_url").is_none());
    }

    #[test]
    fn test_chat_completion_tolerates_vendor_extras() {
        let completion: ChatCompletion = serde_json::from_value(serde_json::json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "usage": { "total_tokens": 10 },
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "{\"score\": 5}" },
                "finish_reason": "stop"
            }]
        }))
        .unwrap();

        assert_eq!(completion.first_content(), Some("{\"score\": 5}"));
    }
}
