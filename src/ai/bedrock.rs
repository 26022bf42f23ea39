//! Amazon Bedrock through the AWS SDK: `InvokeModel` for Nova Canvas / Titan
//! image generation and `Converse` for vision scoring.
//!
//! Stability SDXL is not reachable through the SDK path we use and goes over
//! the raw `/model/{id}/invoke` REST endpoint with a Bedrock bearer token.

use super::evaluation::{parse_evaluation_content, wrap_evaluation};
use super::http::{AuthScheme, ProviderHttpClient};
use super::openai_compat::ChatCompletion;
use super::{image_data, resolve_image_bytes, ImageEvaluationService, ImageGenerationService};
use crate::config::BedrockConfig;
use crate::models::{EvaluationRequest, EvaluationResult, GeneratedImage, GenerationRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, ImageBlock, ImageFormat as BedrockImageFormat,
    ImageSource, InferenceConfiguration, Message,
};
use aws_sdk_bedrockruntime::Client as BedrockClient;
use image::ImageFormat;
use serde::Deserialize;
use std::time::Duration;

const SDXL_MODEL: &str = "stability.stable-diffusion-xl-v1";

/// Build an SDK client for the configured region (credentials from the AWS chain).
pub async fn load_sdk_client(config: &BedrockConfig) -> BedrockClient {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;
    BedrockClient::new(&sdk_config)
}

fn sdk_error<E: std::error::Error>(context: &str, err: E) -> Error {
    let message = format!("{}: {}", context, DisplayErrorContext(&err));
    tracing::error!("{}", message);
    Error::Bedrock(message)
}

fn text_to_image_payload(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "taskType": "TEXT_IMAGE",
        "textToImageParams": { "text": prompt },
        "imageGenerationConfig": {
            "cfgScale": 8,
            "seed": 0,
            "width": 1024,
            "height": 1024,
            "numberOfImages": 1
        }
    })
}

fn sdxl_payload(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "text_prompts": [{ "text": prompt, "weight": 1 }],
        "cfg_scale": 10,
        "steps": 50,
        "seed": 0,
        "width": 1024,
        "height": 1024,
        "samples": 1
    })
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SdxlResponse {
    #[serde(default)]
    artifacts: Vec<SdxlArtifact>,
}

#[derive(Debug, Deserialize)]
struct SdxlArtifact {
    base64: String,
}

fn first_image(body: &[u8]) -> Result<String> {
    let response: TextToImageResponse = serde_json::from_slice(body)?;
    response
        .images
        .into_iter()
        .next()
        .ok_or_else(|| Error::AiProvider("No image data in Bedrock response".to_string()))
}

/// Map sniffed bytes onto the formats Converse accepts; png otherwise.
fn converse_image_format(bytes: &[u8]) -> BedrockImageFormat {
    match image_data::detect_image_format(bytes) {
        Some(ImageFormat::Jpeg) => BedrockImageFormat::Jpeg,
        Some(ImageFormat::Gif) => BedrockImageFormat::Gif,
        Some(ImageFormat::WebP) => BedrockImageFormat::Webp,
        _ => BedrockImageFormat::Png,
    }
}

/// First text block of a Converse reply, parsed leniently.
fn evaluation_from_output(output: Option<&ConverseOutput>) -> EvaluationResult {
    let text = output
        .and_then(|o| o.as_message().ok())
        .and_then(|message| message.content().iter().find_map(|b| b.as_text().ok()))
        .map(String::as_str)
        .unwrap_or("{}");
    parse_evaluation_content(text)
}

pub struct BedrockImageClient {
    sdk: BedrockClient,
    raw: Option<ProviderHttpClient>,
}

impl BedrockImageClient {
    pub fn new(sdk: BedrockClient, config: &BedrockConfig, client: reqwest::Client) -> Self {
        let raw = config.bearer_token.as_ref().map(|token| {
            ProviderHttpClient::new(
                "Bedrock",
                config.runtime_base_url(),
                AuthScheme::Bearer(token.clone()),
                Duration::from_secs(120),
                client,
            )
        });
        Self { sdk, raw }
    }

    async fn generate_sdxl(&self, model: &str, prompt: &str) -> Result<String> {
        let raw = self.raw.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "AWS_BEARER_TOKEN_BEDROCK is required for {}",
                model
            ))
        })?;

        let response: SdxlResponse = raw
            .post_json(&format!("/model/{}/invoke", model), &sdxl_payload(prompt))
            .await?;

        response
            .artifacts
            .into_iter()
            .next()
            .map(|artifact| artifact.base64)
            .ok_or_else(|| Error::AiProvider("No artifacts in Bedrock SDXL response".to_string()))
    }

    async fn generate_text_to_image(&self, model: &str, prompt: &str) -> Result<String> {
        let body = serde_json::to_vec(&text_to_image_payload(prompt))?;

        let response = self
            .sdk
            .invoke_model()
            .model_id(model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| sdk_error("Bedrock InvokeModel failed", e))?;

        first_image(response.body().as_ref())
    }
}

#[async_trait]
impl ImageGenerationService for BedrockImageClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let base64 = if request.model == SDXL_MODEL {
            self.generate_sdxl(&request.model, &request.prompt).await?
        } else {
            self.generate_text_to_image(&request.model, &request.prompt)
                .await?
        };
        Ok(GeneratedImage::Base64(base64))
    }
}

pub struct BedrockEvaluationClient {
    sdk: BedrockClient,
    client: reqwest::Client,
}

impl BedrockEvaluationClient {
    pub fn new(sdk: BedrockClient, client: reqwest::Client) -> Self {
        Self { sdk, client }
    }
}

#[async_trait]
impl ImageEvaluationService for BedrockEvaluationClient {
    async fn evaluate_image(
        &self,
        request: &EvaluationRequest,
        schema: &serde_json::Value,
    ) -> Result<ChatCompletion> {
        let bytes = resolve_image_bytes(&self.client, &request.image).await?;
        let format = converse_image_format(&bytes);

        let image = ImageBlock::builder()
            .format(format)
            .source(ImageSource::Bytes(Blob::new(bytes)))
            .build()
            .map_err(|e| sdk_error("Invalid Bedrock image block", e))?;

        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Image(image))
            .content(ContentBlock::Text(request.prompt.clone()))
            .content(ContentBlock::Text(format!(
                "Use this Schema when generating output: {}",
                schema
            )))
            .build()
            .map_err(|e| sdk_error("Invalid Bedrock message", e))?;

        let response = self
            .sdk
            .converse()
            .model_id(&request.model)
            .messages(message)
            .inference_config(
                InferenceConfiguration::builder()
                    .max_tokens(1024)
                    .temperature(0.5)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error("Bedrock Converse failed", e))?;

        let result = evaluation_from_output(response.output());
        tracing::info!(
            "Bedrock {} scored image {}/100",
            request.model,
            result.score
        );
        Ok(wrap_evaluation(&result))
    }
}
