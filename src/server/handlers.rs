use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::ai::evaluation::evaluation_schema;
use crate::ai::{image_data, ChatCompletion};
use crate::game::validate_prompt;
use crate::models::{EvaluationRequest, GeneratedImage, GenerationRequest, ImageInput, Provider};
use crate::prompts;
use crate::registry::{
    ensure_generation_model, ensure_vision_model, is_flux_model, models, ModelKind,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Generation parameters, from either the query string or a JSON body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateParams {
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub reference_image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    pub image_url: Option<String>,
    pub image_base64: Option<String>,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub provider: Option<String>,
    pub kind: Option<ModelKind>,
}

fn parse_provider(raw: Option<&str>) -> ApiResult<Provider> {
    raw.unwrap_or_default()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid provider"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_generation(params: GenerateParams) -> ApiResult<GenerationRequest> {
    let prompt = validate_prompt(params.prompt.as_deref().unwrap_or_default())?.to_string();
    let model =
        non_empty(params.model).ok_or_else(|| ApiError::bad_request("Model is required"))?;
    let provider = parse_provider(params.provider.as_deref())?;
    ensure_generation_model(provider, &model)?;

    let mut request = GenerationRequest::new(provider, model, prompt);
    if let Some(reference) = non_empty(params.reference_image) {
        if is_flux_model(&request.model) && image_data::is_image_reference(&reference) {
            request = request.with_reference_image(reference);
        } else {
            debug!("Ignoring reference image for {}", request.model);
        }
    }
    Ok(request)
}

async fn generate(state: &AppState, params: GenerateParams) -> ApiResult<Json<GeneratedImage>> {
    let request = validate_generation(params)?;

    let span = info_span!(
        "generate_image",
        request_id = %Uuid::new_v4(),
        provider = %request.provider,
        model = %request.model
    );

    async move {
        info!("Generating image");
        let generator = state.adapters.image_generator(request.provider)?;
        let image = generator.generate_image(&request).await.map_err(|e| {
            error!("Image generation failed: {}", e);
            ApiError::from(e)
        })?;
        info!("Image generated");
        Ok::<_, ApiError>(Json(image))
    }
    .instrument(span)
    .await
}

/// `GET /api/generateImage?prompt&model&provider`
pub async fn generate_image_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GenerateParams>,
) -> ApiResult<Json<GeneratedImage>> {
    generate(&state, params).await
}

/// `POST /api/generateImage`
pub async fn generate_image_json(
    State(state): State<Arc<AppState>>,
    Json(params): Json<GenerateParams>,
) -> ApiResult<Json<GeneratedImage>> {
    generate(&state, params).await
}

/// `POST /api/evaluateImage`
pub async fn evaluate_image(
    State(state): State<Arc<AppState>>,
    Json(params): Json<EvaluateParams>,
) -> ApiResult<Json<ChatCompletion>> {
    let image = match (non_empty(params.image_url), non_empty(params.image_base64)) {
        (Some(url), _) => Some(ImageInput::Url(url)),
        (None, Some(data)) => Some(ImageInput::Base64(data)),
        (None, None) => None,
    };
    let (Some(image), Some(prompt), Some(model)) =
        (image, non_empty(params.prompt), non_empty(params.model))
    else {
        return Err(ApiError::bad_request("Prompt, image, and model are required"));
    };
    let provider = parse_provider(params.provider.as_deref())?;
    ensure_vision_model(provider, &model)?;

    let request = EvaluationRequest {
        image,
        prompt: prompts::evaluation_instruction(&prompt),
        model,
        provider,
    };

    let span = info_span!(
        "evaluate_image",
        request_id = %Uuid::new_v4(),
        provider = %request.provider,
        model = %request.model
    );

    async move {
        let evaluator = state.adapters.image_evaluator(request.provider)?;
        let completion = evaluator
            .evaluate_image(&request, &evaluation_schema())
            .await
            .map_err(|e| {
                error!("Image evaluation failed: {}", e);
                ApiError::internal("Failed to evaluate image")
            })?;
        info!("Image evaluated");
        Ok::<_, ApiError>(Json(completion))
    }
    .instrument(span)
    .await
}

/// `GET /api/models?provider&kind`
pub async fn list_models(Query(query): Query<ModelsQuery>) -> ApiResult<impl IntoResponse> {
    let provider = parse_provider(query.provider.as_deref())?;
    let kind = query.kind.unwrap_or(ModelKind::Generation);

    Ok(Json(json!({
        "provider": provider,
        "kind": kind,
        "models": models(provider, kind),
    })))
}

/// `GET /api/health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339()
    }))
}
