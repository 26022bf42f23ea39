//! Submit/poll protocol for Fireworks flux-kontext workflow jobs.
//!
//! A job is submitted once, then `get_result` is polled on the configured
//! [`PollPolicy`] schedule until the status reaches a terminal value or the
//! attempt ceiling is hit. There is no cancellation: an abandoned job still
//! polls to completion.

use crate::ai::http::ProviderHttpClient;
use crate::ai::image_data;
use crate::config::PollPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const SUCCESS_STATUSES: &[&str] = &["Ready", "Complete", "Finished"];
const FAILURE_STATUSES: &[&str] = &["Failed", "Error"];

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    prompt: &'a str,
    seed: i64,
    prompt_upsampling: bool,
    safety_tolerance: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_image: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResultRequest<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<PollResult>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PollResult {
    #[serde(default)]
    sample: Option<String>,
}

/// What one poll told us.
#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Done(String),
    Failed(String),
    Pending,
}

fn classify(poll: PollResponse) -> PollOutcome {
    let status = poll.status.as_deref().unwrap_or_default();

    if SUCCESS_STATUSES.contains(&status) {
        // A terminal status without a sample keeps polling
        if let Some(sample) = poll.result.and_then(|r| r.sample) {
            return PollOutcome::Done(sample);
        }
    }

    if FAILURE_STATUSES.contains(&status) {
        let details = match poll.details {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Null) | None => "Unknown error".to_string(),
            Some(other) => other.to_string(),
        };
        return PollOutcome::Failed(details);
    }

    PollOutcome::Pending
}

pub(super) struct FluxJobRunner<'a> {
    pub http: &'a ProviderHttpClient,
    pub policy: &'a PollPolicy,
}

impl FluxJobRunner<'_> {
    fn workflow_path(model: &str) -> String {
        format!(
            "/inference/v1/workflows/accounts/fireworks/models/{}",
            model
        )
    }

    async fn submit(&self, model: &str, prompt: &str, input_image: Option<&str>) -> Result<String> {
        let request = SubmitRequest {
            prompt,
            seed: -1,
            prompt_upsampling: false,
            safety_tolerance: 2,
            input_image,
        };

        let response: SubmitResponse = self
            .http
            .post_json(&Self::workflow_path(model), &request)
            .await?;

        response.request_id.ok_or_else(|| {
            tracing::error!("Fireworks workflow response had no request_id");
            Error::AiProvider("Failed to get request_id from Fireworks API".to_string())
        })
    }

    async fn poll_once(&self, result_path: &str, request_id: &str) -> Result<PollOutcome> {
        let response = self
            .http
            .post_raw(
                result_path,
                &ResultRequest { id: request_id },
                "application/json",
            )
            .await?;

        if !response.status().is_success() {
            tracing::debug!(
                "Fireworks poll for {} returned status {}, continuing",
                request_id,
                response.status()
            );
            return Ok(PollOutcome::Pending);
        }

        let body = response.text().await?;
        match serde_json::from_str::<PollResponse>(&body) {
            Ok(poll) => Ok(classify(poll)),
            Err(e) => {
                tracing::debug!("Unreadable Fireworks poll body ({}): {}", e, body);
                Ok(PollOutcome::Pending)
            }
        }
    }

    /// Turn a finished sample into base64, downloading it when it is a URL.
    async fn resolve_sample(&self, sample: String) -> Result<String> {
        if sample.starts_with("http") {
            let bytes = self.http.fetch_bytes(&sample).await?;
            Ok(image_data::encode_base64(&bytes))
        } else {
            Ok(sample)
        }
    }

    /// Submit a job and wait for its image. Returns base64 image data.
    pub async fn run(&self, model: &str, prompt: &str, input_image: Option<&str>) -> Result<String> {
        let request_id = self.submit(model, prompt, input_image).await?;
        tracing::info!("Fireworks flux job submitted with ID: {}", request_id);

        let result_path = format!("{}/get_result", Self::workflow_path(model));

        for (attempt, delay) in self.policy.delays().enumerate() {
            tokio::time::sleep(delay).await;

            match self.poll_once(&result_path, &request_id).await? {
                PollOutcome::Done(sample) => {
                    tracing::info!(
                        "Fireworks flux job {} finished after {} polls",
                        request_id,
                        attempt + 1
                    );
                    return self.resolve_sample(sample).await;
                }
                PollOutcome::Failed(details) => {
                    tracing::error!("Fireworks flux job {} failed: {}", request_id, details);
                    return Err(Error::GenerationFailed(details));
                }
                PollOutcome::Pending => {}
            }
        }

        tracing::error!(
            "Fireworks flux job {} timed out after {} polls",
            request_id,
            self.policy.max_attempts
        );
        Err(Error::Timeout {
            attempts: self.policy.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::http::AuthScheme;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "flux-kontext-pro";
    const SUBMIT_PATH: &str = "/inference/v1/workflows/accounts/fireworks/models/flux-kontext-pro";
    const RESULT_PATH: &str =
        "/inference/v1/workflows/accounts/fireworks/models/flux-kontext-pro/get_result";

    fn http(server: &MockServer) -> ProviderHttpClient {
        ProviderHttpClient::new(
            "Fireworks",
            server.uri(),
            AuthScheme::Bearer("key".to_string()),
            Duration::from_secs(5),
            reqwest::Client::new(),
        )
    }

    fn fast_policy(max_attempts: usize) -> PollPolicy {
        PollPolicy::fixed(Duration::from_millis(20), max_attempts)
    }

    async fn mount_submit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "request_id": "req-1" })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn pending() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "Pending" }))
    }

    #[test]
    fn test_classify_statuses() {
        let done = PollResponse {
            status: Some("Finished".to_string()),
            result: Some(PollResult {
                sample: Some("abc".to_string()),
            }),
            details: None,
        };
        assert_eq!(classify(done), PollOutcome::Done("abc".to_string()));

        let failed = PollResponse {
            status: Some("Error".to_string()),
            result: None,
            details: Some(serde_json::json!("nsfw")),
        };
        assert_eq!(classify(failed), PollOutcome::Failed("nsfw".to_string()));

        let failed_without_details = PollResponse {
            status: Some("Failed".to_string()),
            result: None,
            details: None,
        };
        assert_eq!(
            classify(failed_without_details),
            PollOutcome::Failed("Unknown error".to_string())
        );

        let ready_without_sample = PollResponse {
            status: Some("Ready".to_string()),
            result: Some(PollResult { sample: None }),
            details: None,
        };
        assert_eq!(classify(ready_without_sample), PollOutcome::Pending);
    }

    #[tokio::test]
    async fn test_ready_on_third_poll_returns_sample() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .and(body_json(serde_json::json!({ "id": "req-1" })))
            .respond_with(pending())
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Ready",
                "result": { "sample": "aGVsbG8=" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = http(&server);
        let policy = fast_policy(60);
        let runner = FluxJobRunner {
            http: &http,
            policy: &policy,
        };

        let started = Instant::now();
        let image = runner.run(MODEL, "a lighthouse", None).await.unwrap();

        assert_eq!(image, "aGVsbG8=");
        // Three 20ms waits, nowhere near the 60-attempt ceiling
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_never_terminal_times_out_after_ceiling() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(pending())
            .expect(5)
            .mount(&server)
            .await;

        let http = http(&server);
        let policy = fast_policy(5);
        let runner = FluxJobRunner {
            http: &http,
            policy: &policy,
        };

        let err = runner.run(MODEL, "a lighthouse", None).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { attempts: 5 }));
    }

    #[tokio::test]
    async fn test_failed_status_stops_polling() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Failed",
                "details": "content moderated"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = http(&server);
        let policy = fast_policy(10);
        let runner = FluxJobRunner {
            http: &http,
            policy: &policy,
        };

        let err = runner.run(MODEL, "a lighthouse", None).await.unwrap_err();
        assert!(matches!(err, Error::GenerationFailed(d) if d == "content moderated"));
    }

    #[tokio::test]
    async fn test_missing_request_id_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "detail": "nope" })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(pending())
            .expect(0)
            .mount(&server)
            .await;

        let http = http(&server);
        let policy = fast_policy(3);
        let runner = FluxJobRunner {
            http: &http,
            policy: &policy,
        };

        let err = runner.run(MODEL, "a lighthouse", None).await.unwrap_err();
        assert!(matches!(err, Error::AiProvider(msg) if msg.contains("request_id")));
    }

    #[tokio::test]
    async fn test_non_ok_polls_are_ignored() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Complete",
                "result": { "sample": "Ymxvb2Q=" }
            })))
            .mount(&server)
            .await;

        let http = http(&server);
        let policy = fast_policy(5);
        let runner = FluxJobRunner {
            http: &http,
            policy: &policy,
        };

        assert_eq!(runner.run(MODEL, "p", None).await.unwrap(), "Ymxvb2Q=");
    }

    #[tokio::test]
    async fn test_url_sample_is_downloaded_and_encoded() {
        let server = MockServer::start().await;
        mount_submit(&server).await;

        let sample_url = format!("{}/samples/out.jpg", server.uri());
        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Ready",
                "result": { "sample": sample_url }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/samples/out.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .expect(1)
            .mount(&server)
            .await;

        let http = http(&server);
        let policy = fast_policy(3);
        let runner = FluxJobRunner {
            http: &http,
            policy: &policy,
        };

        let image = runner.run(MODEL, "p", None).await.unwrap();
        assert_eq!(image, image_data::encode_base64(&[0xFF, 0xD8, 0xFF]));
    }

    #[tokio::test]
    async fn test_reference_image_is_sent_as_input_image() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SUBMIT_PATH))
            .and(wiremock::matchers::body_partial_json(serde_json::json!({
                "prompt": "p",
                "seed": -1,
                "safety_tolerance": 2,
                "input_image": "QUJD"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "request_id": "req-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path(RESULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Ready",
                "result": { "sample": "QUJD" }
            })))
            .mount(&server)
            .await;

        let http = http(&server);
        let policy = fast_policy(3);
        let runner = FluxJobRunner {
            http: &http,
            policy: &policy,
        };

        runner.run(MODEL, "p", Some("QUJD")).await.unwrap();
    }
}
