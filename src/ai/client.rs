use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::AppError;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySetting {
    pub category: &'static str,
    pub threshold: &'static str,
}

/// The fixed safety table: every category blocked at medium and above.
pub const BLOCK_MEDIUM_AND_ABOVE: [SafetySetting; 5] = [
    SafetySetting {
        category: "HARM_CATEGORY_HATE_SPEECH",
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    },
    SafetySetting {
        category: "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    },
    SafetySetting {
        category: "HARM_CATEGORY_HARASSMENT",
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    },
    SafetySetting {
        category: "HARM_CATEGORY_DANGEROUS_CONTENT",
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    },
    SafetySetting {
        category: "HARM_CATEGORY_CIVIC_INTEGRITY",
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    },
];

/// Thin wrapper over the `generateContent` REST endpoint, always in
/// structured-output mode: the caller declares a JSON response schema
/// and gets back the parsed JSON value, or a ModelInvocation error.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// One request, one typed answer. No retry, no partial result.
    pub async fn generate(
        &self,
        prompt: &str,
        response_schema: Value,
        safety: Option<&[SafetySetting]>,
    ) -> Result<Value, AppError> {
        let url = format!(
            "{BASE_URL}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = request_body(prompt, response_schema, safety);

        debug!("invoking {} for structured output", self.model);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ModelInvocation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ModelInvocation(format!(
                "model returned status {status}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::ModelInvocation(format!("malformed response: {e}")))?;

        extract_structured_output(&payload)
    }
}

fn request_body(prompt: &str, response_schema: Value, safety: Option<&[SafetySetting]>) -> Value {
    let mut body = json!({
        "contents": [{
            "parts": [{ "text": prompt }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema,
        },
    });

    if let Some(settings) = safety {
        body["safetySettings"] = json!(settings);
    }

    body
}

/// Dig the structured text out of the first candidate and parse it as
/// JSON. A refusal, an empty candidate list, or non-JSON text all
/// count as a failed invocation.
fn extract_structured_output(payload: &Value) -> Result<Value, AppError> {
    let text = payload["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| AppError::ModelInvocation("model returned no content".into()))?;

    serde_json::from_str(text)
        .map_err(|e| AppError::ModelInvocation(format!("unparseable model output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_declares_structured_output() {
        let schema = json!({ "type": "object" });
        let body = request_body("hello", schema.clone(), None);

        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
        assert!(body.get("safetySettings").is_none());
    }

    #[test]
    fn safety_table_is_attached_when_requested() {
        let body = request_body("x", json!({}), Some(&BLOCK_MEDIUM_AND_ABOVE));
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 5);
        assert_eq!(settings[0]["category"], "HARM_CATEGORY_HATE_SPEECH");
        assert!(settings
            .iter()
            .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE"));
    }

    #[test]
    fn structured_output_is_parsed_from_the_first_candidate() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"isHarmful\": false}" }] }
            }]
        });
        let out = extract_structured_output(&payload).unwrap();
        assert_eq!(out["isHarmful"], false);
    }

    #[test]
    fn refusals_and_garbage_are_invocation_errors() {
        let refusal = json!({ "candidates": [] });
        assert!(matches!(
            extract_structured_output(&refusal),
            Err(AppError::ModelInvocation(_))
        ));

        let garbage = json!({
            "candidates": [{ "content": { "parts": [{ "text": "not json" }] } }]
        });
        assert!(matches!(
            extract_structured_output(&garbage),
            Err(AppError::ModelInvocation(_))
        ));
    }
}
