//! Error handling and custom error types
//!
//! Provides unified error handling across the library using thiserror. The
//! HTTP layer maps these onto status codes in [`crate::server::ApiError`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI provider error: {0}")]
    AiProvider(String),

    #[error("Bedrock error: {0}")]
    Bedrock(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Model '{model}' is not available for provider '{provider}'")]
    UnsupportedModel { provider: String, model: String },

    #[error("Image generation timed out after {attempts} poll attempts")]
    Timeout { attempts: usize },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Cannot {action} while in the {from} step")]
    InvalidTransition { from: String, action: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// True for errors caused by the caller's input rather than upstream failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::InvalidProvider(_) | Error::UnsupportedModel { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
