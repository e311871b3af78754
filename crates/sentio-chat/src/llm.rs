//! Text-generation service interface and clients.
//!
//! `TextGenerator` is the single seam to the generative model: both reply
//! composition and emotion classification go through `generate` with
//! different prompts. `GeminiClient` talks to the Gemini REST API;
//! `MockGenerator` is a scripted stand-in for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use sentio_core::config::LlmConfig;

use crate::error::ChatError;

/// A text-in, text-out generative model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError>;
}

/// Run `generate` with a deadline. Expiry is reported as `ChatError::Timeout`.
pub async fn generate_within(
    generator: &dyn TextGenerator,
    prompt: &str,
    limit: Duration,
) -> Result<String, ChatError> {
    tokio::time::timeout(limit, generator.generate(prompt))
        .await
        .map_err(|_| ChatError::Timeout(limit.as_millis()))?
}

// =============================================================================
// GeminiClient
// =============================================================================

/// Google Gemini `generateContent` client.
#[derive(Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, ChatError> {
        if api_key.trim().is_empty() {
            return Err(ChatError::Config("API key must not be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.trim_start_matches("models/").to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_body(prompt))
            .send()
            .await
            .map_err(|e| ChatError::ServiceUnavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable>".to_string());
            return Err(ChatError::ServiceUnavailable(format!(
                "API returned {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChatError::ServiceUnavailable(format!("malformed response: {e}")))?;
        extract_text(&body)
    }
}

fn build_body(prompt: &str) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt } ] }
        ]
    })
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &Value) -> Result<String, ChatError> {
    if let Some(message) = body["error"]["message"].as_str() {
        return Err(ChatError::ServiceUnavailable(message.to_string()));
    }

    let parts = body["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| ChatError::ServiceUnavailable("response has no candidates".to_string()))?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        return Err(ChatError::ServiceUnavailable("response has no text".to_string()));
    }
    Ok(text)
}

// =============================================================================
// MockGenerator
// =============================================================================

/// Scripted outcome of one mock call.
#[derive(Debug, Clone)]
enum Outcome {
    Text(String),
    Fail(String),
    Hang,
}

#[derive(Debug)]
struct Rule {
    needle: String,
    outcomes: VecDeque<Outcome>,
}

/// Scripted generator.
///
/// A call is answered by the first rule whose needle occurs in the prompt,
/// or by the default outcome otherwise. A rule with several outcomes plays
/// them in order and then keeps repeating the last one. Every prompt is
/// recorded.
#[derive(Debug)]
pub struct MockGenerator {
    default: Outcome,
    rules: Mutex<Vec<Rule>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Generator answering every prompt with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self::with_default(Outcome::Text(reply.into()))
    }

    /// Generator failing every unmatched prompt.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_default(Outcome::Fail(reason.into()))
    }

    /// Generator that never answers unmatched prompts.
    pub fn hanging() -> Self {
        Self::with_default(Outcome::Hang)
    }

    fn with_default(default: Outcome) -> Self {
        Self {
            default,
            rules: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer prompts containing `needle` with `reply`.
    pub fn on(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push_rule(needle.into(), vec![Outcome::Text(reply.into())])
    }

    /// Answer prompts containing `needle` with `replies`, one per call.
    pub fn on_sequence<I, S>(self, needle: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outcomes = replies.into_iter().map(|r| Outcome::Text(r.into())).collect();
        self.push_rule(needle.into(), outcomes)
    }

    /// Fail prompts containing `needle`.
    pub fn fail_on(self, needle: impl Into<String>, reason: impl Into<String>) -> Self {
        self.push_rule(needle.into(), vec![Outcome::Fail(reason.into())])
    }

    /// Never answer prompts containing `needle`.
    pub fn hang_on(self, needle: impl Into<String>) -> Self {
        self.push_rule(needle.into(), vec![Outcome::Hang])
    }

    fn push_rule(self, needle: String, outcomes: Vec<Outcome>) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                needle,
                outcomes: outcomes.into(),
            });
        }
        self
    }

    /// Every prompt received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Number of calls received.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Number of calls whose prompt contained `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .map(|p| p.iter().filter(|prompt| prompt.contains(needle)).count())
            .unwrap_or(0)
    }

    fn next_outcome(&self, prompt: &str) -> Outcome {
        let mut rules = match self.rules.lock() {
            Ok(r) => r,
            Err(_) => return Outcome::Fail("mock lock poisoned".to_string()),
        };
        match rules.iter_mut().find(|r| prompt.contains(&r.needle)) {
            Some(rule) if rule.outcomes.len() > 1 => {
                rule.outcomes.pop_front().unwrap_or_else(|| self.default.clone())
            }
            Some(rule) => rule
                .outcomes
                .front()
                .cloned()
                .unwrap_or_else(|| self.default.clone()),
            None => self.default.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        match self.next_outcome(prompt) {
            Outcome::Text(text) => Ok(text),
            Outcome::Fail(reason) => Err(ChatError::ServiceUnavailable(reason)),
            Outcome::Hang => std::future::pending().await,
        }
    }
}
