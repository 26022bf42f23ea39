//! BaseTen: a single deployed text-to-image model plus the OpenAI-compatible
//! inference gateway.

use super::http::{AuthScheme, ProviderHttpClient};
use super::openai_compat::{
    self, ChatCompletion, ChatCompletionRequest, ChatMessage, JsonSchema, ResponseFormat,
};
use super::{image_data, ImageEvaluationService, ImageGenerationService};
use crate::config::BaseTenConfig;
use crate::models::{EvaluationRequest, GeneratedImage, GenerationRequest, ImageInput};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    data: Option<String>,
}

pub struct BaseTenImageClient {
    http: ProviderHttpClient,
    predict_url: String,
}

impl BaseTenImageClient {
    pub fn new(config: &BaseTenConfig) -> Self {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: &BaseTenConfig, client: reqwest::Client) -> Self {
        Self {
            http: ProviderHttpClient::new(
                "BaseTen",
                config.inference_url.clone(),
                AuthScheme::ApiKey(config.api_key.clone()),
                Duration::from_secs(120),
                client,
            ),
            predict_url: config.predict_url.clone(),
        }
    }
}

#[async_trait]
impl ImageGenerationService for BaseTenImageClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        // The deployment URL already pins the model
        let response: PredictResponse = self
            .http
            .post_json(
                &self.predict_url,
                &PredictRequest {
                    prompt: &request.prompt,
                },
            )
            .await?;

        response
            .data
            .map(GeneratedImage::Base64)
            .ok_or_else(|| Error::AiProvider("No image data in BaseTen response".to_string()))
    }
}

pub struct BaseTenEvaluationClient {
    http: ProviderHttpClient,
}

impl BaseTenEvaluationClient {
    pub fn new(config: &BaseTenConfig) -> Self {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: &BaseTenConfig, client: reqwest::Client) -> Self {
        Self {
            http: ProviderHttpClient::new(
                "BaseTen",
                config.inference_url.clone(),
                AuthScheme::Bearer(config.api_key.clone()),
                Duration::from_secs(60),
                client,
            ),
        }
    }
}

#[async_trait]
impl ImageEvaluationService for BaseTenEvaluationClient {
    async fn evaluate_image(
        &self,
        request: &EvaluationRequest,
        schema: &serde_json::Value,
    ) -> Result<ChatCompletion> {
        tracing::warn!(
            "BaseTen evaluation with {}: most BaseTen models are not multimodal and may ignore the image",
            request.model
        );

        let image_url = match &request.image {
            ImageInput::Base64(data) => format!(
                "data:image/jpeg;base64,{}",
                image_data::strip_data_url_prefix(data)
            ),
            ImageInput::Url(url) => url.clone(),
        };

        let mut chat = ChatCompletionRequest::new(
            request.model.clone(),
            vec![ChatMessage::user_with_image(image_url, &request.prompt)],
        );
        chat.top_p = Some(1.0);
        chat.presence_penalty = Some(0.0);
        chat.frequency_penalty = Some(0.0);
        chat.temperature = Some(0.6);
        chat.response_format = Some(ResponseFormat::JsonSchema {
            json_schema: JsonSchema {
                name: "evaluation".to_string(),
                schema: schema.clone(),
            },
        });

        openai_compat::chat_completion(&self.http, "/v1/chat/completions", &chat).await
    }
}
