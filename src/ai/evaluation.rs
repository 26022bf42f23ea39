//! Scoring schema and the canonical evaluation envelope.
//!
//! Vision models are asked for `{"reasoning": String, "score": 0..=100}`. What
//! comes back is parsed leniently: a reply that cannot be understood scores 0
//! with empty reasoning and is only logged.

use super::openai_compat::{AssistantMessage, ChatChoice, ChatCompletion};
use crate::models::EvaluationResult;
use serde_json::Value;

/// JSON schema handed to vision models.
pub fn evaluation_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "reasoning": {
                "type": "string",
                "description": "Detailed reasoning for why this image matches or doesn't match the given prompt, considering artistic style, composition, theme, and suitability for Dixit"
            },
            "score": {
                "type": "integer",
                "minimum": 0,
                "maximum": 100,
                "description": "Numerical score from 0-100 indicating how well the image matches the prompt"
            }
        },
        "required": ["reasoning", "score"],
        "additionalProperties": false
    })
}

/// Wrap a score in the OpenAI chat-completion shape.
pub fn wrap_evaluation(result: &EvaluationResult) -> ChatCompletion {
    let content = serde_json::json!({
        "reasoning": result.reasoning,
        "score": result.score,
    });

    ChatCompletion {
        id: None,
        model: None,
        choices: vec![ChatChoice {
            index: 0,
            message: AssistantMessage {
                role: "assistant".to_string(),
                content: Some(content.to_string()),
            },
            finish_reason: Some("stop".to_string()),
        }],
    }
}

/// Drop a surrounding markdown code fence (```json ... ```), if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn score_from_value(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    Some(raw.round().clamp(0.0, 100.0) as u8)
}

fn field<'a>(answer: &'a Value, name: &str) -> Option<&'a Value> {
    answer
        .get(name)
        .or_else(|| answer.get("properties").and_then(|p| p.get(name)))
}

/// Parse a model reply, returning `None` when it is not a JSON object.
///
/// Some models echo the schema back and nest their answer under
/// `properties`; both layouts are accepted.
pub fn try_parse_evaluation(content: &str) -> Option<EvaluationResult> {
    let answer: Value = serde_json::from_str(strip_code_fences(content)).ok()?;
    if !answer.is_object() {
        return None;
    }

    let score = field(&answer, "score").and_then(score_from_value).unwrap_or(0);
    let reasoning = field(&answer, "reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(EvaluationResult { score, reasoning })
}

/// Parse a model reply, defaulting to a zero score instead of failing.
pub fn parse_evaluation_content(content: &str) -> EvaluationResult {
    try_parse_evaluation(content).unwrap_or_else(|| {
        tracing::warn!("Failed to parse evaluation response: {}", content);
        EvaluationResult::default()
    })
}

/// Extract the score from a canonical envelope.
pub fn evaluation_from_completion(completion: &ChatCompletion) -> EvaluationResult {
    match completion.first_content() {
        Some(content) => parse_evaluation_content(content),
        None => {
            tracing::warn!("Evaluation response carried no content");
            EvaluationResult::default()
        }
    }
}
