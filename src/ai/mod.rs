//! AI provider integration for image generation and evaluation
//!
//! Every vendor sits behind the same two traits. [`ProviderAdapters`] holds
//! one generator and one evaluator per configured provider and hands them out
//! by [`Provider`].

pub mod baseten;
pub mod bedrock;
pub mod evaluation;
pub mod fireworks;
pub mod http;
pub mod image_data;
pub mod mock;
pub mod openai_compat;
pub mod together;
pub mod vertex;

pub use baseten::{BaseTenEvaluationClient, BaseTenImageClient};
pub use bedrock::{BedrockEvaluationClient, BedrockImageClient};
pub use fireworks::{FireworksEvaluationClient, FireworksImageClient};
pub use mock::{MockImageEvaluationClient, MockImageGenerationClient};
pub use openai_compat::ChatCompletion;
pub use together::{TogetherEvaluationClient, TogetherImageClient};
pub use vertex::{VertexEvaluationClient, VertexImageClient};

use crate::config::Config;
use crate::models::{EvaluationRequest, GeneratedImage, GenerationRequest, ImageInput, Provider};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage>;
}

#[async_trait]
pub trait ImageEvaluationService: Send + Sync {
    /// Score an image against a prompt. The reply is always the chat-completion
    /// envelope, whatever the vendor's native shape.
    async fn evaluate_image(
        &self,
        request: &EvaluationRequest,
        schema: &serde_json::Value,
    ) -> Result<ChatCompletion>;
}

/// Raw bytes of an image input, downloading URLs without credentials.
pub(crate) async fn resolve_image_bytes(
    client: &reqwest::Client,
    image: &ImageInput,
) -> Result<Vec<u8>> {
    match image {
        ImageInput::Base64(data) => image_data::decode_base64(data),
        ImageInput::Url(url) => {
            let response = client.get(url).send().await.map_err(|e| {
                tracing::error!("Failed to download image {}: {}", url, e);
                Error::from(e)
            })?;

            if !response.status().is_success() {
                let status = response.status();
                tracing::error!("Image download failed (status {}): {}", status, url);
                return Err(Error::AiProvider(format!(
                    "Failed to download image (status {}): {}",
                    status, url
                )));
            }

            Ok(response.bytes().await?.to_vec())
        }
    }
}

/// Generator and evaluator per configured provider.
#[derive(Clone, Default)]
pub struct ProviderAdapters {
    generators: HashMap<Provider, Arc<dyn ImageGenerationService>>,
    evaluators: HashMap<Provider, Arc<dyn ImageEvaluationService>>,
}

impl ProviderAdapters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every provider that has credentials in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::new();
        let mut adapters = Self::new();

        if let Some(fireworks) = &config.fireworks {
            adapters = adapters
                .with_generator(
                    Provider::Fireworks,
                    Arc::new(FireworksImageClient::new_with_client(
                        fireworks,
                        config.poll,
                        client.clone(),
                    )),
                )
                .with_evaluator(
                    Provider::Fireworks,
                    Arc::new(FireworksEvaluationClient::new_with_client(
                        fireworks,
                        client.clone(),
                    )),
                );
        }

        if let Some(together) = &config.together {
            adapters = adapters
                .with_generator(
                    Provider::Together,
                    Arc::new(TogetherImageClient::new_with_client(together, client.clone())),
                )
                .with_evaluator(
                    Provider::Together,
                    Arc::new(TogetherEvaluationClient::new_with_client(
                        together,
                        client.clone(),
                    )),
                );
        }

        if let Some(baseten) = &config.baseten {
            adapters = adapters
                .with_generator(
                    Provider::BaseTen,
                    Arc::new(BaseTenImageClient::new_with_client(baseten, client.clone())),
                )
                .with_evaluator(
                    Provider::BaseTen,
                    Arc::new(BaseTenEvaluationClient::new_with_client(
                        baseten,
                        client.clone(),
                    )),
                );
        }

        if let Some(bedrock) = &config.bedrock {
            let sdk = bedrock::load_sdk_client(bedrock).await;
            adapters = adapters
                .with_generator(
                    Provider::AmazonBedrock,
                    Arc::new(BedrockImageClient::new(sdk.clone(), bedrock, client.clone())),
                )
                .with_evaluator(
                    Provider::AmazonBedrock,
                    Arc::new(BedrockEvaluationClient::new(sdk, client.clone())),
                );
        }

        if let Some(vertex) = &config.vertex {
            adapters = adapters
                .with_generator(
                    Provider::GoogleVertex,
                    Arc::new(VertexImageClient::new_with_client(vertex, client.clone())?),
                )
                .with_evaluator(
                    Provider::GoogleVertex,
                    Arc::new(VertexEvaluationClient::new_with_client(vertex, client)?),
                );
        }

        tracing::info!("Configured providers: {:?}", adapters.configured());
        Ok(adapters)
    }

    pub fn with_generator(
        mut self,
        provider: Provider,
        generator: Arc<dyn ImageGenerationService>,
    ) -> Self {
        self.generators.insert(provider, generator);
        self
    }

    pub fn with_evaluator(
        mut self,
        provider: Provider,
        evaluator: Arc<dyn ImageEvaluationService>,
    ) -> Self {
        self.evaluators.insert(provider, evaluator);
        self
    }

    pub fn image_generator(&self, provider: Provider) -> Result<Arc<dyn ImageGenerationService>> {
        self.generators
            .get(&provider)
            .cloned()
            .ok_or_else(|| not_configured(provider))
    }

    pub fn image_evaluator(&self, provider: Provider) -> Result<Arc<dyn ImageEvaluationService>> {
        self.evaluators
            .get(&provider)
            .cloned()
            .ok_or_else(|| not_configured(provider))
    }

    /// Providers with a generator, in declaration order.
    pub fn configured(&self) -> Vec<Provider> {
        Provider::ALL
            .iter()
            .copied()
            .filter(|p| self.generators.contains_key(p))
            .collect()
    }
}

fn not_configured(provider: Provider) -> Error {
    Error::Config(format!("Provider {} is not configured", provider))
}
