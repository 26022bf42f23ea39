use crate::{Error, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// How a vendor expects its credential to be presented.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: Api-Key <key>` (BaseTen model deployments)
    ApiKey(String),
    /// `x-goog-api-key: <key>` (Vertex express mode)
    GoogApiKey(String),
}

/// Thin REST client shared by the vendor adapters.
///
/// Non-success responses are logged with their body and turned into
/// [`Error::AiProvider`] tagged with the vendor name.
#[derive(Debug, Clone)]
pub struct ProviderHttpClient {
    pub(crate) client: Client,
    provider: &'static str,
    base_url: String,
    auth: AuthScheme,
    timeout: Duration,
}

impl ProviderHttpClient {
    pub fn new(
        provider: &'static str,
        base_url: impl Into<String>,
        auth: AuthScheme,
        timeout: Duration,
        client: Client,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            provider,
            base_url,
            auth,
            timeout,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` against the base URL; absolute URLs pass through untouched.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            AuthScheme::Bearer(token) => builder.header("Authorization", format!("Bearer {}", token)),
            AuthScheme::ApiKey(key) => builder.header("Authorization", format!("Api-Key {}", key)),
            AuthScheme::GoogApiKey(key) => builder.header("x-goog-api-key", key),
        }
    }

    /// POST a JSON body and return the raw response without checking its status.
    pub async fn post_raw<Req: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &Req,
        accept: &str,
    ) -> Result<Response> {
        let url = self.url(path);
        let builder = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("Accept", accept)
            .json(request);

        self.authorize(builder).send().await.map_err(|e| {
            tracing::error!("Failed to send request to {}: {}", self.provider, e);
            Error::from(e)
        })
    }

    async fn ensure_success(&self, response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await?;
        tracing::error!(
            "{} API error (status {}): {}",
            self.provider,
            status,
            error_text
        );
        Err(Error::AiProvider(format!(
            "{} API error (status {}): {}",
            self.provider, status, error_text
        )))
    }

    pub async fn post_json<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let response = self.post_raw(path, request, "application/json").await?;
        let response = self.ensure_success(response).await?;

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                "Failed to parse {} response: {}\nBody: {}",
                self.provider,
                e,
                body
            );
            Error::AiProvider(format!("Failed to parse {} response: {}", self.provider, e))
        })
    }

    /// POST a JSON body to an endpoint that answers with binary image data.
    pub async fn post_for_bytes<Req: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &Req,
        accept: &str,
    ) -> Result<Vec<u8>> {
        let response = self.post_raw(path, request, accept).await?;
        let response = self.ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Download a result URL handed out by the vendor. No credentials are attached.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to download {} result {}: {}", self.provider, url, e);
                Error::from(e)
            })?;
        let response = self.ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
