//! Process configuration
//!
//! Credentials are read once from the environment (and `.env` via dotenvy)
//! into an explicit [`Config`] that is handed to each adapter. Every provider
//! section is optional; a provider without credentials is simply not
//! available at runtime.

use crate::{Error, Result};
use std::env;
use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, FixedInterval};

const DEFAULT_FIREWORKS_BASE_URL: &str = "https://api.fireworks.ai";
const DEFAULT_TOGETHER_BASE_URL: &str = "https://api.together.xyz";
const DEFAULT_BASETEN_PREDICT_URL: &str =
    "https://model-lqzzlnkq.api.baseten.co/environments/production/predict";
const DEFAULT_BASETEN_INFERENCE_URL: &str = "https://inference.baseten.co";
const DEFAULT_AWS_REGION: &str = "us-east-1";
const DEFAULT_VERTEX_LOCATION: &str = "us-central1";

#[derive(Debug, Clone)]
pub struct FireworksConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct TogetherConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct BaseTenConfig {
    pub api_key: String,
    pub predict_url: String,
    pub inference_url: String,
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: String,
    /// Bearer token for the raw `/model/{id}/invoke` path used by SDXL.
    pub bearer_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl BedrockConfig {
    pub fn runtime_base_url(&self) -> String {
        self.endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VertexAuth {
    /// OAuth access token, used with the project-scoped endpoint.
    AccessToken(String),
    /// Express-mode API key, used with the global publisher endpoint.
    ApiKey(String),
}

#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project: Option<String>,
    pub location: String,
    pub auth: VertexAuth,
    pub base_url: Option<String>,
}

/// How the flux poll loop spaces its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBackoff {
    Fixed,
    Exponential { max_delay: Duration },
}

/// Delay schedule for asynchronous image jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: usize,
    pub backoff: PollBackoff,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 60,
            backoff: PollBackoff::Fixed,
        }
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration, max_attempts: usize) -> Self {
        Self {
            interval,
            max_attempts,
            backoff: PollBackoff::Fixed,
        }
    }

    /// The wait before each poll attempt; yields exactly `max_attempts` items.
    pub fn delays(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
        let interval_ms = self.interval.as_millis().max(1) as u64;
        match self.backoff {
            PollBackoff::Fixed => Box::new(
                FixedInterval::from_millis(interval_ms).take(self.max_attempts),
            ),
            PollBackoff::Exponential { max_delay } => Box::new(
                // 2^n * (interval / 2): the first delay equals the interval
                ExponentialBackoff::from_millis(2)
                    .factor((interval_ms / 2).max(1))
                    .max_delay(max_delay)
                    .take(self.max_attempts),
            ),
        }
    }

    fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let interval = match optional_var("FLUX_POLL_INTERVAL_MS") {
            Some(raw) => Duration::from_millis(parse_number(&raw, "FLUX_POLL_INTERVAL_MS")?),
            None => defaults.interval,
        };
        let max_attempts = match optional_var("FLUX_POLL_MAX_ATTEMPTS") {
            Some(raw) => parse_number(&raw, "FLUX_POLL_MAX_ATTEMPTS")? as usize,
            None => defaults.max_attempts,
        };
        let backoff = match optional_var("FLUX_POLL_BACKOFF").as_deref() {
            None | Some("fixed") => PollBackoff::Fixed,
            Some("exponential") => {
                let max_delay_ms = match optional_var("FLUX_POLL_MAX_DELAY_MS") {
                    Some(raw) => parse_number(&raw, "FLUX_POLL_MAX_DELAY_MS")?,
                    None => 10_000,
                };
                PollBackoff::Exponential {
                    max_delay: Duration::from_millis(max_delay_ms),
                }
            }
            Some(other) => {
                return Err(Error::Config(format!(
                    "FLUX_POLL_BACKOFF must be 'fixed' or 'exponential', got '{}'",
                    other
                )))
            }
        };

        if max_attempts == 0 {
            return Err(Error::Config(
                "FLUX_POLL_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            interval,
            max_attempts,
            backoff,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub fireworks: Option<FireworksConfig>,
    pub together: Option<TogetherConfig>,
    pub baseten: Option<BaseTenConfig>,
    pub bedrock: Option<BedrockConfig>,
    pub vertex: Option<VertexConfig>,
    pub poll: PollPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let fireworks = optional_var("FIREWORKS_API_KEY").map(|api_key| FireworksConfig {
            api_key,
            base_url: var_or("FIREWORKS_BASE_URL", DEFAULT_FIREWORKS_BASE_URL),
        });

        let together = optional_var("TOGETHER_API_KEY").map(|api_key| TogetherConfig {
            api_key,
            base_url: var_or("TOGETHER_BASE_URL", DEFAULT_TOGETHER_BASE_URL),
        });

        let baseten = optional_var("BASETEN_API_KEY").map(|api_key| BaseTenConfig {
            api_key,
            predict_url: var_or("BASETEN_PREDICT_URL", DEFAULT_BASETEN_PREDICT_URL),
            inference_url: var_or("BASETEN_INFERENCE_URL", DEFAULT_BASETEN_INFERENCE_URL),
        });

        let bedrock = if optional_var("AWS_REGION").is_some()
            || optional_var("AWS_ACCESS_KEY_ID").is_some()
            || optional_var("AWS_BEARER_TOKEN_BEDROCK").is_some()
        {
            Some(BedrockConfig {
                region: var_or("AWS_REGION", DEFAULT_AWS_REGION),
                bearer_token: optional_var("AWS_BEARER_TOKEN_BEDROCK"),
                endpoint_url: optional_var("BEDROCK_ENDPOINT_URL"),
            })
        } else {
            None
        };

        let vertex_auth = match (
            optional_var("VERTEX_ACCESS_TOKEN"),
            optional_var("VERTEX_API_KEY"),
        ) {
            (Some(token), _) => Some(VertexAuth::AccessToken(token)),
            (None, Some(key)) => Some(VertexAuth::ApiKey(key)),
            (None, None) => None,
        };
        let vertex = match vertex_auth {
            Some(auth) => {
                let project = optional_var("VERTEX_PROJECT");
                if matches!(auth, VertexAuth::AccessToken(_)) && project.is_none() {
                    return Err(Error::Config(
                        "VERTEX_PROJECT is required when VERTEX_ACCESS_TOKEN is set".to_string(),
                    ));
                }
                Some(VertexConfig {
                    project,
                    location: var_or("VERTEX_LOCATION", DEFAULT_VERTEX_LOCATION),
                    auth,
                    base_url: optional_var("VERTEX_BASE_URL"),
                })
            }
            None => None,
        };

        Ok(Self {
            fireworks,
            together,
            baseten,
            bedrock,
            vertex,
            poll: PollPolicy::from_env()?,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

fn parse_number(raw: &str, name: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", name, raw)))
}
