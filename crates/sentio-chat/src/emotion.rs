//! Emotion classification through the text-generation service.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ChatError;
use crate::llm::{generate_within, TextGenerator};

/// Labels the dominant emotion of a message with a single free-text word.
pub struct EmotionClassifier {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl EmotionClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Classify `message`. The label is trimmed but not validated against
    /// any taxonomy; an empty answer is a classification failure.
    pub async fn classify(&self, message: &str) -> Result<String, ChatError> {
        let prompt = classification_prompt(message);
        let raw = generate_within(self.generator.as_ref(), &prompt, self.timeout)
            .await
            .map_err(|e| ChatError::ClassificationFailure(e.to_string()))?;

        let label = raw.trim();
        if label.is_empty() {
            return Err(ChatError::ClassificationFailure("empty label".to_string()));
        }
        Ok(label.to_string())
    }
}

/// Prompt asking for a one-word emotion label.
pub fn classification_prompt(message: &str) -> String {
    format!(
        "Identifica la emoción principal en: '{}'. Responde solo con una palabra.",
        message
    )
}
