//! Cheap keyword intents: gratitude and requests for advice.
//!
//! Plain substring membership over the lowercased message. No tokenization
//! and no stemming, so "agradecida" and "muchas gracias" both hit.

use sentio_core::config::KeywordConfig;

/// Intent predicates consulted before and after composing a reply.
pub trait IntentClassifier: Send + Sync {
    /// The message thanks the assistant.
    fn is_gratitude(&self, text: &str) -> bool;
    /// The message asks for advice or recommendations.
    fn needs_advice(&self, text: &str) -> bool;
}

/// Keyword-set intent classifier.
#[derive(Debug, Clone)]
pub struct KeywordIntentClassifier {
    gratitude: Vec<String>,
    advice: Vec<String>,
}

impl KeywordIntentClassifier {
    pub fn new(gratitude: Vec<String>, advice: Vec<String>) -> Self {
        Self {
            gratitude: lowercase_all(gratitude),
            advice: lowercase_all(advice),
        }
    }

    pub fn from_config(config: &KeywordConfig) -> Self {
        Self::new(config.gratitude.clone(), config.advice.clone())
    }
}

impl Default for KeywordIntentClassifier {
    fn default() -> Self {
        Self::from_config(&KeywordConfig::default())
    }
}

impl IntentClassifier for KeywordIntentClassifier {
    fn is_gratitude(&self, text: &str) -> bool {
        contains_any(text, &self.gratitude)
    }

    fn needs_advice(&self, text: &str) -> bool {
        contains_any(text, &self.advice)
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|k| !k.is_empty() && lower.contains(k.as_str()))
}

fn lowercase_all(words: Vec<String>) -> Vec<String> {
    words.into_iter().map(|w| w.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gratitude_keywords() {
        let c = KeywordIntentClassifier::default();
        assert!(c.is_gratitude("Gracias por escucharme"));
        assert!(c.is_gratitude("MUCHAS GRACIAS"));
        assert!(c.is_gratitude("estoy muy agradecida"));
        assert!(c.is_gratitude("thanks a lot"));
        assert!(!c.is_gratitude("me siento triste"));
    }

    #[test]
    fn test_advice_keywords() {
        let c = KeywordIntentClassifier::default();
        assert!(c.needs_advice("¿Me das consejos?"));
        assert!(c.needs_advice("No sé qué hacer"));
        assert!(c.needs_advice("Ayúdame por favor"));
        assert!(c.needs_advice("any tips?"));
        assert!(!c.needs_advice("hoy fue un buen día"));
    }

    #[test]
    fn test_substring_matching_has_no_word_boundaries() {
        let c = KeywordIntentClassifier::default();
        // "gracias" inside "desgracias" still counts.
        assert!(c.is_gratitude("qué desgracias"));
    }

    #[test]
    fn test_custom_keywords_are_lowercased() {
        let c = KeywordIntentClassifier::new(vec!["MERCI".to_string()], vec![]);
        assert!(c.is_gratitude("merci beaucoup"));
        assert!(!c.needs_advice("anything"));
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        let c = KeywordIntentClassifier::new(vec![String::new()], vec![String::new()]);
        assert!(!c.is_gratitude("hola"));
        assert!(!c.needs_advice("hola"));
    }
}
