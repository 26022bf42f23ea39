//! Google Vertex AI: Imagen and Gemini image generation, Gemini vision scoring.

pub mod client;
pub mod types;

use super::evaluation::{parse_evaluation_content, wrap_evaluation};
use super::openai_compat::ChatCompletion;
use super::{image_data, resolve_image_bytes, ImageEvaluationService, ImageGenerationService};
use crate::config::VertexConfig;
use crate::models::{EvaluationRequest, GeneratedImage, GenerationRequest, ImageInput};
use crate::{Error, Result};
use async_trait::async_trait;
use client::VertexHttpClient;
use std::time::Duration;
use types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
    PredictInstance, PredictParameters, PredictRequest, PredictResponse,
};

fn is_imagen_model(model: &str) -> bool {
    model.starts_with("imagen")
}

/// Inline a caller-supplied image as a Gemini part.
fn inline_part(data: &str) -> Part {
    let data = image_data::strip_data_url_prefix(data);
    Part::InlineData {
        inline_data: InlineData {
            mime_type: image_data::sniff_base64_mime(data).to_string(),
            data: data.to_string(),
        },
    }
}

pub struct VertexImageClient {
    http: VertexHttpClient,
}

impl VertexImageClient {
    pub fn new(config: &VertexConfig) -> Result<Self> {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: &VertexConfig, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            http: VertexHttpClient::new(config, Duration::from_secs(120), client)?,
        })
    }

    async fn generate_imagen(&self, model: &str, prompt: &str) -> Result<String> {
        let request = PredictRequest {
            instances: vec![PredictInstance {
                prompt: prompt.to_string(),
            }],
            parameters: PredictParameters { sample_count: 1 },
        };

        let response: PredictResponse = self.http.predict(model, &request).await?;

        response
            .predictions
            .into_iter()
            .find_map(|p| p.bytes_base64_encoded)
            .ok_or_else(|| Error::AiProvider("No image data in Vertex Imagen response".to_string()))
    }

    async fn generate_gemini(&self, model: &str, prompt: &str) -> Result<String> {
        let parts = vec![Part::Text {
            text: prompt.to_string(),
        }];

        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                ..Default::default()
            }),
        };

        let response: GenerateContentResponse =
            self.http.generate_content(model, &request).await?;

        let image = response
            .first_inline_data()
            .ok_or_else(|| Error::AiProvider("No image data in Vertex Gemini response".to_string()))?;

        tracing::debug!("Vertex returned image with mime_type: {}", image.mime_type);
        Ok(image.data.clone())
    }
}

#[async_trait]
impl ImageGenerationService for VertexImageClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let base64 = if is_imagen_model(&request.model) {
            self.generate_imagen(&request.model, &request.prompt).await?
        } else {
            self.generate_gemini(&request.model, &request.prompt).await?
        };
        Ok(GeneratedImage::Base64(base64))
    }
}

pub struct VertexEvaluationClient {
    http: VertexHttpClient,
}

impl VertexEvaluationClient {
    pub fn new(config: &VertexConfig) -> Result<Self> {
        Self::new_with_client(config, reqwest::Client::new())
    }

    pub fn new_with_client(config: &VertexConfig, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            http: VertexHttpClient::new(config, Duration::from_secs(60), client)?,
        })
    }

    async fn image_part(&self, image: &ImageInput) -> Result<Part> {
        match image {
            ImageInput::Base64(data) => Ok(inline_part(data)),
            ImageInput::Url(_) => {
                let bytes = resolve_image_bytes(&self.http.http().client, image).await?;
                Ok(Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image_data::detect_image_mime(&bytes).to_string(),
                        data: image_data::encode_base64(&bytes),
                    },
                })
            }
        }
    }
}

#[async_trait]
impl ImageEvaluationService for VertexEvaluationClient {
    async fn evaluate_image(
        &self,
        request: &EvaluationRequest,
        schema: &serde_json::Value,
    ) -> Result<ChatCompletion> {
        let image = self.image_part(&request.image).await?;

        let body = GenerateContentRequest {
            contents: vec![Content::user(vec![
                image,
                Part::Text {
                    text: request.prompt.clone(),
                },
            ])],
            system_instruction: Some(Content::system(format!(
                "Reply with this schema: {}",
                schema
            ))),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            }),
        };

        let response: GenerateContentResponse =
            self.http.generate_content(&request.model, &body).await?;

        let result = parse_evaluation_content(response.first_text().unwrap_or("{}"));
        Ok(wrap_evaluation(&result))
    }
}
