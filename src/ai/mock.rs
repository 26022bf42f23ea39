use super::evaluation::wrap_evaluation;
use super::{ChatCompletion, ImageEvaluationService, ImageGenerationService};
use crate::models::{EvaluationRequest, EvaluationResult, GeneratedImage, GenerationRequest};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Tiny valid PNG returned when no response is queued
const DEFAULT_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVR4nGP4z8AAAAMBAQDJ/pLvAAAAAElFTkSuQmCC";

pub struct MockImageGenerationClient {
    responses: Arc<Mutex<Vec<GeneratedImage>>>,
    failing_models: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageGenerationClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            failing_models: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: GeneratedImage) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Requests for `model` fail with an upstream error.
    pub fn with_failure_for(self, model: &str) -> Self {
        self.failing_models.lock().unwrap().push(model.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockImageGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageGenerationService for MockImageGenerationClient {
    async fn generate_image(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.requests.lock().unwrap().push(request.clone());

        if self.failing_models.lock().unwrap().contains(&request.model) {
            return Err(Error::AiProvider(format!(
                "Mock generation failure for {}",
                request.model
            )));
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(GeneratedImage::Base64(DEFAULT_PNG_BASE64.to_string()))
        } else {
            let index = (*count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

/// Replies with queued results in rotation, or a flat 50 when none are queued.
pub struct MockImageEvaluationClient {
    results: Arc<Mutex<Vec<EvaluationResult>>>,
    raw_content: Arc<Mutex<Option<String>>>,
    fail: bool,
    requests: Arc<Mutex<Vec<EvaluationRequest>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockImageEvaluationClient {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(Vec::new())),
            raw_content: Arc::new(Mutex::new(None)),
            fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_result(self, score: u8, reasoning: &str) -> Self {
        self.results.lock().unwrap().push(EvaluationResult {
            score,
            reasoning: reasoning.to_string(),
        });
        self
    }

    /// Reply with this exact message content instead of a wrapped result.
    pub fn with_raw_content(self, content: &str) -> Self {
        *self.raw_content.lock().unwrap() = Some(content.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<EvaluationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockImageEvaluationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageEvaluationService for MockImageEvaluationClient {
    async fn evaluate_image(
        &self,
        request: &EvaluationRequest,
        _schema: &serde_json::Value,
    ) -> Result<ChatCompletion> {
        let mut count = self.call_count.lock().unwrap();
        *count += 1;
        self.requests.lock().unwrap().push(request.clone());

        if self.fail {
            return Err(Error::AiProvider("Mock evaluation failure".to_string()));
        }

        if let Some(content) = self.raw_content.lock().unwrap().clone() {
            let mut completion = wrap_evaluation(&EvaluationResult::default());
            completion.choices[0].message.content = Some(content);
            return Ok(completion);
        }

        let results = self.results.lock().unwrap();
        let result = if results.is_empty() {
            EvaluationResult {
                score: 50,
                reasoning: "Mock evaluation".to_string(),
            }
        } else {
            let index = (*count - 1) % results.len();
            results[index].clone()
        };
        Ok(wrap_evaluation(&result))
    }
}
