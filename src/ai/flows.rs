use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::ai::client::{GeminiClient, BLOCK_MEDIUM_AND_ABOVE};
use crate::config::Config;
use crate::error::AppError;

/// Shared input for the two romance generators.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatePreferences {
    pub restaurant_preference: String,
    pub cuisine_preference: String,
    pub activity_preference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateNightIdea {
    pub date_night_idea: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomanticMessage {
    pub romantic_message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterInput {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterVerdict {
    pub is_harmful: bool,
}

/// The three prompt-template generators. Stateless request/response:
/// interpolate the inputs into an instruction, send it with a declared
/// output shape, parse the single typed field back out. Any failure
/// surfaces as a generic message with no underlying cause.
pub struct Generators {
    client: Option<GeminiClient>,
}

impl Generators {
    pub fn new(config: &Config) -> Self {
        let client = config
            .gemini_api_key
            .as_ref()
            .map(|key| GeminiClient::new(key, &config.gemini_model));
        Self { client }
    }

    pub async fn date_night_idea(
        &self,
        prefs: &DatePreferences,
    ) -> Result<DateNightIdea, AppError> {
        let schema = json!({
            "type": "object",
            "properties": { "dateNightIdea": { "type": "string" } },
            "required": ["dateNightIdea"]
        });

        self.invoke(
            &date_night_prompt(prefs),
            schema,
            false,
            "Failed to generate date night idea.",
        )
        .await
    }

    pub async fn romantic_message(
        &self,
        prefs: &DatePreferences,
    ) -> Result<RomanticMessage, AppError> {
        let schema = json!({
            "type": "object",
            "properties": { "romanticMessage": { "type": "string" } },
            "required": ["romanticMessage"]
        });

        self.invoke(
            &romantic_message_prompt(prefs),
            schema,
            false,
            "Failed to generate romantic message.",
        )
        .await
    }

    /// Harmful-message check, with the full safety table attached to
    /// the request.
    pub async fn filter_chat_message(
        &self,
        input: &FilterInput,
    ) -> Result<FilterVerdict, AppError> {
        let schema = json!({
            "type": "object",
            "properties": { "isHarmful": { "type": "boolean" } },
            "required": ["isHarmful"]
        });

        self.invoke(
            &filter_prompt(&input.message),
            schema,
            true,
            "Failed to filter chat message.",
        )
        .await
    }

    async fn invoke<T: serde::de::DeserializeOwned>(
        &self,
        prompt: &str,
        schema: Value,
        with_safety: bool,
        failure: &str,
    ) -> Result<T, AppError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| AppError::ModelInvocation(failure.to_string()))?;

        let safety = with_safety.then_some(&BLOCK_MEDIUM_AND_ABOVE[..]);

        let output = client
            .generate(prompt, schema, safety)
            .await
            .map_err(|e| {
                error!("generator failed: {e}");
                AppError::ModelInvocation(failure.to_string())
            })?;

        serde_json::from_value(output).map_err(|e| {
            error!("generator output did not match schema: {e}");
            AppError::ModelInvocation(failure.to_string())
        })
    }
}

fn date_night_prompt(prefs: &DatePreferences) -> String {
    format!(
        "You are a date night idea generator. Given the following preferences, \
         generate a creative and unique date night idea. Consider the restaurant, \
         cuisine, and activity preferences when crafting the idea.\n\n\
         Restaurant Preference: {}\n\
         Cuisine Preference: {}\n\
         Activity Preference: {}\n\n\
         Date Night Idea: ",
        prefs.restaurant_preference, prefs.cuisine_preference, prefs.activity_preference
    )
}

fn romantic_message_prompt(prefs: &DatePreferences) -> String {
    format!(
        "You are a romantic message generator. Generate a heartfelt and creative \
         romantic message based on the following preferences:\n\n\
         Restaurant Preference: {}\n\
         Cuisine Preference: {}\n\
         Activity Preference: {}\n\n\
         The message should be no more than 50 words.",
        prefs.restaurant_preference, prefs.cuisine_preference, prefs.activity_preference
    )
}

fn filter_prompt(message: &str) -> String {
    format!(
        "You are an AI assistant that determines whether a given chat message is \
         harmful or not.\n\n\
         A harmful message is defined as one that contains hate speech, is sexually \
         explicit, contains harassment, promotes dangerous content, or violates \
         civic integrity.\n\n\
         Given the following chat message, determine if it is harmful. Return true \
         if the message is harmful, and false if it is not.\n\n\
         Message: {message}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> DatePreferences {
        DatePreferences {
            restaurant_preference: "cozy".into(),
            cuisine_preference: "Italian".into(),
            activity_preference: "stargazing".into(),
        }
    }

    #[test]
    fn prompts_interpolate_every_preference() {
        let p = date_night_prompt(&prefs());
        assert!(p.contains("Restaurant Preference: cozy"));
        assert!(p.contains("Cuisine Preference: Italian"));
        assert!(p.contains("Activity Preference: stargazing"));

        let r = romantic_message_prompt(&prefs());
        assert!(r.contains("no more than 50 words"));
        assert!(r.contains("stargazing"));

        let f = filter_prompt("you are wonderful");
        assert!(f.contains("Message: you are wonderful"));
    }

    #[test]
    fn typed_outputs_parse_from_structured_json() {
        let idea: DateNightIdea =
            serde_json::from_value(json!({ "dateNightIdea": "Candlelit pasta, then the stars" }))
                .unwrap();
        assert!(!idea.date_night_idea.is_empty());

        let verdict: FilterVerdict =
            serde_json::from_value(json!({ "isHarmful": true })).unwrap();
        assert!(verdict.is_harmful);
    }

    #[test]
    fn camel_case_inputs_deserialize() {
        let p: DatePreferences = serde_json::from_value(json!({
            "restaurantPreference": "fancy",
            "cuisinePreference": "Thai",
            "activityPreference": "movies"
        }))
        .unwrap();
        assert_eq!(p.cuisine_preference, "Thai");
    }

    #[tokio::test]
    async fn missing_api_key_fails_with_the_generic_message() {
        let generators = Generators { client: None };

        let err = generators.date_night_idea(&prefs()).await.unwrap_err();
        match err {
            AppError::ModelInvocation(msg) => {
                assert_eq!(msg, "Failed to generate date night idea.")
            }
            other => panic!("expected ModelInvocation, got {other:?}"),
        }

        let err = generators
            .filter_chat_message(&FilterInput {
                message: "hi".into(),
            })
            .await
            .unwrap_err();
        match err {
            AppError::ModelInvocation(msg) => {
                assert_eq!(msg, "Failed to filter chat message.")
            }
            other => panic!("expected ModelInvocation, got {other:?}"),
        }
    }
}
