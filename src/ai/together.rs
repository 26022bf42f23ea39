//! Together AI: `images/generations` and OpenAI-compatible vision chat.

use super::http::{AuthScheme, ProviderHttpClient};
use super::openai_compat::{self, ChatCompletion, ChatCompletionRequest, ChatMessage, ResponseFormat};
use super::{image_data, ImageEvaluationService, ImageGenerationService};
use crate::config::TogetherConfig;
use crate::models::{EvaluationRequest, GeneratedImage, GenerationRequest, ImageInput};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    width: u32,
    height: u32,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

fn http_client(config: &TogetherConfig, timeout: Duration, client: reqwest::Client) -> ProviderHttpClient {
    ProviderHttpClient::new(
        "Together",
        config.base_url.clone(),
        AuthScheme::Bearer(config.api_key.clone()),
        timeout,
        client,
    )
}

pub struct TogetherImageClient {
    http: ProviderHttpClient,
}

impl TogetherImageClient {
    pub fn new(config: &TogetherConfig) -> Self {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: &TogetherConfig, client: reqwest::Client) -> Self {
        Self {
            http: http_client(config, Duration::from_secs(120), client),
        }
    }
}

#[async_trait]
impl ImageGenerationService for TogetherImageClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let body = ImageGenerationRequest {
            model: &request.model,
            prompt: &request.prompt,
            width: 1024,
            height: 1024,
            n: 1,
        };

        let response: ImageGenerationResponse =
            self.http.post_json("/v1/images/generations", &body).await?;

        let image = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::AiProvider("No image data in Together response".to_string()))?;

        // Together hands back either inline base64 or a short-lived URL
        match (image.b64_json, image.url) {
            (Some(b64), _) => Ok(GeneratedImage::Base64(b64)),
            (None, Some(url)) => Ok(GeneratedImage::Url(url)),
            (None, None) => Err(Error::AiProvider(
                "No image data (neither base64 nor URL) in Together response".to_string(),
            )),
        }
    }
}

pub struct TogetherEvaluationClient {
    http: ProviderHttpClient,
}

impl TogetherEvaluationClient {
    pub fn new(config: &TogetherConfig) -> Self {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: &TogetherConfig, client: reqwest::Client) -> Self {
        Self {
            http: http_client(config, Duration::from_secs(60), client),
        }
    }
}

#[async_trait]
impl ImageEvaluationService for TogetherEvaluationClient {
    async fn evaluate_image(
        &self,
        request: &EvaluationRequest,
        schema: &serde_json::Value,
    ) -> Result<ChatCompletion> {
        let image_url = match &request.image {
            ImageInput::Url(url) => url.clone(),
            ImageInput::Base64(data) => image_data::to_data_url(data),
        };

        let mut chat = ChatCompletionRequest::new(
            request.model.clone(),
            vec![ChatMessage::user_with_image(image_url, &request.prompt)],
        );
        chat.temperature = Some(0.6);
        chat.response_format = Some(ResponseFormat::JsonObject {
            schema: schema.clone(),
        });

        openai_compat::chat_completion(&self.http, "/v1/chat/completions", &chat).await
    }
}
