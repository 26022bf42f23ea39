//! Static provider/model allow-lists.
//!
//! Every endpoint validates the requested model against these tables before an
//! adapter is called. There is no capability negotiation with the vendors.

use crate::models::Provider;
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;

const FIREWORKS_IMAGE_MODELS: &[&str] = &[
    "flux-kontext-pro",
    "flux-kontext-max",
    "flux-1-schnell-fp8",
    "flux-1-dev-fp8",
    "stable-diffusion-xl-1024-v1-0",
    "playground-v2-1024px-aesthetic",
    "playground-v2-5-1024px-aesthetic",
    "SSD-1B",
    "japanese-stable-diffusion-xl",
];

const TOGETHER_IMAGE_MODELS: &[&str] = &[
    "black-forest-labs/FLUX.1-krea-dev",
    "black-forest-labs/FLUX.1-kontext-pro",
    "black-forest-labs/FLUX.1-kontext-max",
    "black-forest-labs/FLUX.1-dev",
    "black-forest-labs/FLUX.1-schnell",
    "black-forest-labs/FLUX.1.1-pro",
    "black-forest-labs/FLUX.1-pro",
];

// The predict endpoint is bound to a single deployment.
const BASETEN_IMAGE_MODELS: &[&str] = &["flux-schnell"];

const BEDROCK_IMAGE_MODELS: &[&str] = &[
    "amazon.nova-canvas-v1:0",
    "amazon.titan-image-generator-v2:0",
    "amazon.titan-image-generator-v1",
    "stability.stable-diffusion-xl-v1",
];

const VERTEX_IMAGE_MODELS: &[&str] = &[
    "imagen-4.0-generate-001",
    "imagen-3.0-generate-002",
    "imagen-3.0-fast-generate-001",
    "gemini-2.5-flash-image-preview",
    "gemini-2.0-flash-preview-image-generation",
];

const FIREWORKS_VISION_MODELS: &[&str] = &[
    "llama4-maverick-instruct-basic",
    "llama4-scout-instruct-basic",
    "qwen2p5-vl-32b-instruct",
];

const TOGETHER_VISION_MODELS: &[&str] = &[
    "meta-llama/Llama-4-Maverick-17B-128E-Instruct-FP8",
    "meta-llama/Llama-4-Scout-17B-16E-Instruct",
    "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo",
    "meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo",
    "Qwen/Qwen2-VL-72B-Instruct",
    "google/gemma-3n-E4B-it",
    "arcee_ai/arcee-spotlight",
];

const BASETEN_VISION_MODELS: &[&str] = &[
    "meta-llama/Llama-4-Scout-17B-16E-Instruct",
    "meta-llama/Llama-4-Maverick-17B-128E-Instruct",
    "openai/gpt-oss-120b",
    "Qwen/Qwen3-235B-A22B-Instruct-2507",
];

const BEDROCK_VISION_MODELS: &[&str] = &[
    "amazon.nova-lite-v1:0",
    "amazon.nova-premier-v1:0",
    "amazon.nova-pro-v1:0",
    "anthropic.claude-3-haiku-20240307-v1:0",
    "anthropic.claude-3-opus-20240229-v1:0",
    "anthropic.claude-3-sonnet-20240229-v1:0",
    "anthropic.claude-3-5-sonnet-20241022-v2:0",
    "anthropic.claude-3-5-sonnet-20240620-v1:0",
    "anthropic.claude-3-7-sonnet-20250219-v1:0",
    "anthropic.claude-opus-4-1-20250805-v1:0",
    "anthropic.claude-opus-4-20250514-v1:0",
    "anthropic.claude-sonnet-4-20250514-v1:0",
    "mistral.pixtral-large-2502-v1:0",
];

const VERTEX_VISION_MODELS: &[&str] = &[
    "gemini-2.5-flash-lite",
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.0-flash-001",
    "gemini-2.0-flash-lite-001",
    "gemini-1.5-flash-002",
    "gemini-1.5-pro-002",
];

/// Which modality a model list describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Generation,
    Vision,
}

pub fn generation_models(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Fireworks => FIREWORKS_IMAGE_MODELS,
        Provider::Together => TOGETHER_IMAGE_MODELS,
        Provider::BaseTen => BASETEN_IMAGE_MODELS,
        Provider::AmazonBedrock => BEDROCK_IMAGE_MODELS,
        Provider::GoogleVertex => VERTEX_IMAGE_MODELS,
    }
}

pub fn vision_models(provider: Provider) -> &'static [&'static str] {
    match provider {
        Provider::Fireworks => FIREWORKS_VISION_MODELS,
        Provider::Together => TOGETHER_VISION_MODELS,
        Provider::BaseTen => BASETEN_VISION_MODELS,
        Provider::AmazonBedrock => BEDROCK_VISION_MODELS,
        Provider::GoogleVertex => VERTEX_VISION_MODELS,
    }
}

pub fn models(provider: Provider, kind: ModelKind) -> &'static [&'static str] {
    match kind {
        ModelKind::Generation => generation_models(provider),
        ModelKind::Vision => vision_models(provider),
    }
}

fn ensure_listed(provider: Provider, model: &str, list: &[&str]) -> Result<()> {
    if list.contains(&model) {
        Ok(())
    } else {
        Err(Error::UnsupportedModel {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

pub fn ensure_generation_model(provider: Provider, model: &str) -> Result<()> {
    ensure_listed(provider, model, generation_models(provider))
}

pub fn ensure_vision_model(provider: Provider, model: &str) -> Result<()> {
    ensure_listed(provider, model, vision_models(provider))
}

/// Flux-kontext models run as submit/poll workflow jobs on Fireworks.
pub fn is_flux_model(model: &str) -> bool {
    model.contains("flux-kontext")
}

/// Pick up to `count` distinct generation models, leaving out the slow flux jobs.
pub fn random_generation_models<R: Rng + ?Sized>(
    provider: Provider,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut candidates: Vec<&str> = generation_models(provider)
        .iter()
        .copied()
        .filter(|m| !is_flux_model(m))
        .collect();
    candidates.shuffle(rng);
    candidates
        .into_iter()
        .take(count)
        .map(str::to_string)
        .collect()
}
