//! Fireworks inference API: image generation (synchronous and flux workflow
//! jobs) and vision-model evaluation.

mod flux;

use super::http::{AuthScheme, ProviderHttpClient};
use super::openai_compat::{self, ChatCompletion, ChatCompletionRequest, ChatMessage, ResponseFormat};
use super::{image_data, ImageEvaluationService, ImageGenerationService};
use crate::config::{FireworksConfig, PollPolicy};
use crate::models::{EvaluationRequest, GeneratedImage, GenerationRequest, ImageInput};
use crate::registry::is_flux_model;
use crate::Result;
use async_trait::async_trait;
use flux::FluxJobRunner;
use serde::Serialize;
use std::time::Duration;

const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);
const CHAT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
}

pub struct FireworksImageClient {
    http: ProviderHttpClient,
    poll: PollPolicy,
}

impl FireworksImageClient {
    pub fn new(config: &FireworksConfig, poll: PollPolicy) -> Self {
        Self::new_with_client(config, poll, reqwest::Client::new())
    }

    pub fn new_with_client(
        config: &FireworksConfig,
        poll: PollPolicy,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: ProviderHttpClient::new(
                "Fireworks",
                config.base_url.clone(),
                AuthScheme::Bearer(config.api_key.clone()),
                IMAGE_TIMEOUT,
                client,
            ),
            poll,
        }
    }

    async fn generate_standard(&self, model: &str, prompt: &str) -> Result<String> {
        let path = format!(
            "/inference/v1/image_generation/accounts/fireworks/models/{}",
            model
        );
        let request = TextToImageRequest {
            prompt,
            width: 1024,
            height: 1024,
        };

        let bytes = self.http.post_for_bytes(&path, &request, "image/jpeg").await?;
        tracing::debug!("Fireworks returned {} image bytes for {}", bytes.len(), model);
        Ok(image_data::encode_base64(&bytes))
    }
}

#[async_trait]
impl ImageGenerationService for FireworksImageClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let base64 = if is_flux_model(&request.model) {
            let runner = FluxJobRunner {
                http: &self.http,
                policy: &self.poll,
            };
            let input_image = request
                .reference_image
                .as_deref()
                .map(image_data::strip_data_url_prefix);
            runner.run(&request.model, &request.prompt, input_image).await?
        } else {
            self.generate_standard(&request.model, &request.prompt).await?
        };

        Ok(GeneratedImage::Base64(base64))
    }
}

pub struct FireworksEvaluationClient {
    http: ProviderHttpClient,
}

impl FireworksEvaluationClient {
    pub fn new(config: &FireworksConfig) -> Self {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: &FireworksConfig, client: reqwest::Client) -> Self {
        Self {
            http: ProviderHttpClient::new(
                "Fireworks",
                config.base_url.clone(),
                AuthScheme::Bearer(config.api_key.clone()),
                CHAT_TIMEOUT,
                client,
            ),
        }
    }
}

#[async_trait]
impl ImageEvaluationService for FireworksEvaluationClient {
    async fn evaluate_image(
        &self,
        request: &EvaluationRequest,
        schema: &serde_json::Value,
    ) -> Result<ChatCompletion> {
        let image_url = match &request.image {
            ImageInput::Base64(data) => format!(
                "data:image/jpeg;base64,{}",
                image_data::strip_data_url_prefix(data)
            ),
            ImageInput::Url(url) => url.clone(),
        };

        let mut chat = ChatCompletionRequest::new(
            format!("accounts/fireworks/models/{}", request.model),
            vec![ChatMessage::user_with_image(image_url, &request.prompt)],
        );
        chat.top_p = Some(1.0);
        chat.top_k = Some(40);
        chat.presence_penalty = Some(0.0);
        chat.frequency_penalty = Some(0.0);
        chat.temperature = Some(0.6);
        chat.response_format = Some(ResponseFormat::JsonObject {
            schema: schema.clone(),
        });

        openai_compat::chat_completion(&self.http, "/inference/v1/chat/completions", &chat).await
    }
}
