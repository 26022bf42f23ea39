use crate::ai::http::{AuthScheme, ProviderHttpClient};
use crate::config::{VertexAuth, VertexConfig};
use crate::{Error, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const EXPRESS_BASE_URL: &str = "https://aiplatform.googleapis.com";

/// Vertex REST client that knows how to address publisher models.
///
/// With an access token requests go to the project-scoped regional endpoint;
/// an express-mode API key uses the global publisher endpoint instead.
pub struct VertexHttpClient {
    http: ProviderHttpClient,
    scope: Option<ProjectScope>,
}

struct ProjectScope {
    project: String,
    location: String,
}

impl VertexHttpClient {
    pub fn new(config: &VertexConfig, timeout: Duration, client: Client) -> Result<Self> {
        let (auth, scope, default_base) = match &config.auth {
            VertexAuth::AccessToken(token) => {
                let project = config.project.clone().ok_or_else(|| {
                    Error::Config("VERTEX_PROJECT is required with an access token".to_string())
                })?;
                (
                    AuthScheme::Bearer(token.clone()),
                    Some(ProjectScope {
                        project,
                        location: config.location.clone(),
                    }),
                    format!("https://{}-aiplatform.googleapis.com", config.location),
                )
            }
            VertexAuth::ApiKey(key) => (
                AuthScheme::GoogApiKey(key.clone()),
                None,
                EXPRESS_BASE_URL.to_string(),
            ),
        };

        let base_url = config.base_url.clone().unwrap_or(default_base);

        Ok(Self {
            http: ProviderHttpClient::new("Vertex", base_url, auth, timeout, client),
            scope,
        })
    }

    pub fn http(&self) -> &ProviderHttpClient {
        &self.http
    }

    /// Path of `method` on a Google publisher model, e.g. `...:generateContent`.
    pub fn method_path(&self, model: &str, method: &str) -> String {
        match &self.scope {
            Some(scope) => format!(
                "/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
                scope.project, scope.location, model, method
            ),
            None => format!("/v1/publishers/google/models/{}:{}", model, method),
        }
    }

    pub async fn generate_content<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<Resp> {
        self.http
            .post_json(&self.method_path(model, "generateContent"), request)
            .await
    }

    pub async fn predict<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        model: &str,
        request: &Req,
    ) -> Result<Resp> {
        self.http
            .post_json(&self.method_path(model, "predict"), request)
            .await
    }
}
