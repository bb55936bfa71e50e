use futures::future::BoxFuture;

use super::{OrganizeError, OrganizerService};
use crate::config::OrganizerConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You turn a person's unstructured brain dump into a list of discrete, \
    actionable items. Return ONLY a JSON array, no explanation.\n\n\
    Each element must be an object with:\n\
    - \"text\": one concise item, phrased as the person would write it\n\
    - \"category\": a short category such as \"Work\", \"Personal\", \"Errands\", \"Health\"\n\n\
    Keep the person's order where it makes sense. Split lines that hold several tasks. \
    Drop lines that carry no task or note.";

/// Organizes brain dumps through the Anthropic Messages API.
pub struct AnthropicOrganizer {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    http: reqwest::Client,
}

impl AnthropicOrganizer {
    pub fn new(api_key: impl Into<String>, config: &OrganizerConfig) -> Self {
        Self {
            api_key: api_key.into(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            max_tokens: config.max_tokens,
            http: reqwest::Client::new(),
        }
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": text }
            ]
        })
    }

    async fn send(&self, text: &str) -> Result<String, OrganizeError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&self.request_body(text))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OrganizeError::Api { status, message });
        }

        let api_resp: serde_json::Value = resp.json().await?;
        response_text(&api_resp).ok_or(OrganizeError::NoContent)
    }
}

/// Text of the first content block of a Messages API response.
fn response_text(api_resp: &serde_json::Value) -> Option<String> {
    api_resp["content"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|block| block["text"].as_str())
        .map(str::to_string)
}

impl OrganizerService for AnthropicOrganizer {
    fn organize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<String, OrganizeError>> {
        Box::pin(self.send(text))
    }
}
