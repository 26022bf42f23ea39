use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Third-party vendor offering image generation and/or vision models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    Fireworks,
    Together,
    BaseTen,
    AmazonBedrock,
    GoogleVertex,
}

impl Provider {
    pub const ALL: [Provider; 5] = [
        Provider::Fireworks,
        Provider::Together,
        Provider::BaseTen,
        Provider::AmazonBedrock,
        Provider::GoogleVertex,
    ];

    /// Wire name used in query parameters and request bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Fireworks => "fireworks",
            Provider::Together => "together",
            Provider::BaseTen => "base-ten",
            Provider::AmazonBedrock => "amazon-bedrock",
            Provider::GoogleVertex => "google-vertex",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::InvalidProvider(s.to_string()))
    }
}

/// One image generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub provider: Provider,
    /// Optional reference image (base64 or data URL); only flux-kontext jobs use it.
    pub reference_image: Option<String>,
}

impl GenerationRequest {
    pub fn new(provider: Provider, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            provider,
            reference_image: None,
        }
    }

    pub fn with_reference_image(mut self, image: impl Into<String>) -> Self {
        self.reference_image = Some(image.into());
        self
    }
}

/// Normalized output of every generation adapter.
///
/// Serializes as `{"base64": "..."}` or `{"url": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratedImage {
    Base64(String),
    Url(String),
}

impl GeneratedImage {
    /// Value usable as an `<img src>` or as evaluation input.
    pub fn to_image_input(&self) -> ImageInput {
        match self {
            GeneratedImage::Base64(data) => ImageInput::Base64(data.clone()),
            GeneratedImage::Url(url) => ImageInput::Url(url.clone()),
        }
    }
}

/// Image handed to an evaluation adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Url(String),
    /// Raw base64, optionally prefixed with `data:image/...;base64,`.
    Base64(String),
}

/// One evaluation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub image: ImageInput,
    pub prompt: String,
    pub model: String,
    pub provider: Provider,
}

/// Score a vision model assigned to an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: u8,
    pub reasoning: String,
}
