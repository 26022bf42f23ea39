//! HTTP API: image generation, evaluation and model listing.

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use crate::ai::ProviderAdapters;
use crate::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub adapters: ProviderAdapters,
}

impl AppState {
    pub fn new(adapters: ProviderAdapters) -> Self {
        Self { adapters }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/generateImage",
            get(handlers::generate_image_query).post(handlers::generate_image_json),
        )
        .route("/api/evaluateImage", post(handlers::evaluate_image))
        .route("/api/models", get(handlers::list_models))
        .route("/api/health", get(handlers::health))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn run(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockImageEvaluationClient, MockImageGenerationClient};
    use crate::models::{GeneratedImage, Provider};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app_with(
        generator: MockImageGenerationClient,
        evaluator: MockImageEvaluationClient,
    ) -> (Router, Arc<MockImageGenerationClient>, Arc<MockImageEvaluationClient>) {
        let generator = Arc::new(generator);
        let evaluator = Arc::new(evaluator);
        let adapters = ProviderAdapters::new()
            .with_generator(Provider::Fireworks, generator.clone())
            .with_evaluator(Provider::Fireworks, evaluator.clone());
        (
            router(Arc::new(AppState::new(adapters))),
            generator,
            evaluator,
        )
    }

    fn default_app() -> Router {
        app_with(MockImageGenerationClient::new(), MockImageEvaluationClient::new()).0
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_get_returns_base64() {
        let (app, generator, _) = app_with(
            MockImageGenerationClient::new().with_response(GeneratedImage::Base64("QUJD".to_string())),
            MockImageEvaluationClient::new(),
        );

        let (status, body) = send(
            app,
            get("/api/generateImage?prompt=a%20fox&model=SSD-1B&provider=fireworks"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "base64": "QUJD" }));
        assert_eq!(generator.requests()[0].prompt, "a fox");
    }

    #[tokio::test]
    async fn test_generate_post_passes_reference_image() {
        let (app, generator, _) = app_with(
            MockImageGenerationClient::new().with_response(GeneratedImage::Url("https://img".to_string())),
            MockImageEvaluationClient::new(),
        );

        let (status, body) = send(
            app,
            post_json(
                "/api/generateImage",
                serde_json::json!({
                    "prompt": "a fox",
                    "model": "flux-kontext-pro",
                    "provider": "fireworks",
                    "referenceImage": "data:image/png;base64,UkVG"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "url": "https://img" }));
        assert_eq!(
            generator.requests()[0].reference_image.as_deref(),
            Some("data:image/png;base64,UkVG")
        );
    }

    #[tokio::test]
    async fn test_generate_drops_reference_for_non_flux_model() {
        let (app, generator, _) = app_with(
            MockImageGenerationClient::new(),
            MockImageEvaluationClient::new(),
        );

        let (status, _) = send(
            app,
            post_json(
                "/api/generateImage",
                serde_json::json!({
                    "prompt": "a fox",
                    "model": "SSD-1B",
                    "provider": "fireworks",
                    "referenceImage": "https://inspiration/neon.png"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(generator.requests()[0].reference_image.is_none());
    }

    #[tokio::test]
    async fn test_generate_drops_title_reference_for_flux_model() {
        let (app, generator, _) = app_with(
            MockImageGenerationClient::new(),
            MockImageEvaluationClient::new(),
        );

        let (status, _) = send(
            app,
            post_json(
                "/api/generateImage",
                serde_json::json!({
                    "prompt": "a fox",
                    "model": "flux-kontext-pro",
                    "provider": "fireworks",
                    "referenceImage": "Neon Dreams"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(generator.requests()[0].reference_image.is_none());
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_and_long_prompts() {
        let long = "a".repeat(513);
        for prompt in ["", long.as_str()] {
            let (status, body) = send(
                default_app(),
                post_json(
                    "/api/generateImage",
                    serde_json::json!({ "prompt": prompt, "model": "SSD-1B", "provider": "fireworks" }),
                ),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body["error"],
                "Prompt is required and must be less than 512 characters"
            );
        }
    }

    #[tokio::test]
    async fn test_generate_accepts_512_char_prompt() {
        let prompt = "a".repeat(512);
        let (status, _) = send(
            default_app(),
            post_json(
                "/api/generateImage",
                serde_json::json!({ "prompt": prompt, "model": "SSD-1B", "provider": "fireworks" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_generate_requires_model() {
        let (status, body) =
            send(default_app(), get("/api/generateImage?prompt=fox&provider=fireworks")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Model is required");
    }

    #[tokio::test]
    async fn test_generate_rejects_unknown_and_missing_provider() {
        for uri in [
            "/api/generateImage?prompt=fox&model=SSD-1B&provider=openai",
            "/api/generateImage?prompt=fox&model=SSD-1B",
        ] {
            let (status, body) = send(default_app(), get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid provider");
        }
    }

    #[tokio::test]
    async fn test_generate_rejects_unlisted_model() {
        let (status, body) = send(
            default_app(),
            get("/api/generateImage?prompt=fox&model=dall-e-3&provider=fireworks"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("dall-e-3"));
    }

    #[tokio::test]
    async fn test_generate_upstream_failure_is_500_with_message() {
        let (app, _, _) = app_with(
            MockImageGenerationClient::new().with_failure_for("SSD-1B"),
            MockImageEvaluationClient::new(),
        );

        let (status, body) = send(
            app,
            get("/api/generateImage?prompt=fox&model=SSD-1B&provider=fireworks"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("Mock generation failure"));
    }

    #[tokio::test]
    async fn test_generate_unconfigured_provider_is_500() {
        let (status, body) = send(
            default_app(),
            get("/api/generateImage?prompt=fox&model=flux-schnell&provider=base-ten"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_evaluate_wraps_prompt_and_returns_completion() {
        let (app, _, evaluator) = app_with(
            MockImageGenerationClient::new(),
            MockImageEvaluationClient::new().with_result(81, "vivid"),
        );

        let (status, body) = send(
            app,
            post_json(
                "/api/evaluateImage",
                serde_json::json!({
                    "imageBase64": "QUJD",
                    "prompt": "a fox",
                    "model": "qwen2p5-vl-32b-instruct",
                    "provider": "fireworks"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let content: Value =
            serde_json::from_str(body["choices"][0]["message"]["content"].as_str().unwrap())
                .unwrap();
        assert_eq!(content, serde_json::json!({ "reasoning": "vivid", "score": 81 }));

        let request = &evaluator.requests()[0];
        assert!(request
            .prompt
            .starts_with("Evaluate this image against the prompt: \"a fox\""));
    }

    #[tokio::test]
    async fn test_evaluate_prefers_image_url() {
        let (app, _, evaluator) = app_with(
            MockImageGenerationClient::new(),
            MockImageEvaluationClient::new(),
        );

        let (status, _) = send(
            app,
            post_json(
                "/api/evaluateImage",
                serde_json::json!({
                    "imageUrl": "https://img/a.png",
                    "imageBase64": "QUJD",
                    "prompt": "a fox",
                    "model": "qwen2p5-vl-32b-instruct",
                    "provider": "fireworks"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            evaluator.requests()[0].image,
            crate::models::ImageInput::Url("https://img/a.png".to_string())
        );
    }

    #[tokio::test]
    async fn test_evaluate_requires_fields() {
        let (status, body) = send(
            default_app(),
            post_json(
                "/api/evaluateImage",
                serde_json::json!({ "prompt": "a fox", "model": "m", "provider": "fireworks" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Prompt, image, and model are required");
    }

    #[tokio::test]
    async fn test_evaluate_rejects_bad_provider() {
        let (status, body) = send(
            default_app(),
            post_json(
                "/api/evaluateImage",
                serde_json::json!({
                    "imageBase64": "QUJD",
                    "prompt": "a fox",
                    "model": "m",
                    "provider": "midjourney"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid provider");
    }

    #[tokio::test]
    async fn test_evaluate_upstream_failure_hides_detail() {
        let (app, _, _) = app_with(
            MockImageGenerationClient::new(),
            MockImageEvaluationClient::failing(),
        );

        let (status, body) = send(
            app,
            post_json(
                "/api/evaluateImage",
                serde_json::json!({
                    "imageBase64": "QUJD",
                    "prompt": "a fox",
                    "model": "qwen2p5-vl-32b-instruct",
                    "provider": "fireworks"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({ "error": "Failed to evaluate image" }));
    }

    #[tokio::test]
    async fn test_models_lists_vision_models() {
        let (status, body) = send(
            default_app(),
            get("/api/models?provider=amazon-bedrock&kind=vision"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["provider"], "amazon-bedrock");
        assert_eq!(body["kind"], "vision");
        assert!(body["models"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("amazon.nova-pro-v1:0")));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(default_app(), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["timestamp"].is_string());
    }
}
