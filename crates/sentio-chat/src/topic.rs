//! Topic-change heuristic.
//!
//! Not semantic topic detection: a message continues the current topic when
//! one of the recent user turns contains a connective word ("y", "pero",
//! "también", ...). Anything else starts a new topic.
//!
//! Connectives match whole words only, so "y" never matches inside "hoy".
//! Keyword intents in `intent` use plain substring matching instead, so
//! "gracias" does match inside "desgracias". The two are not meant to agree.

use sentio_core::config::KeywordConfig;

use crate::types::{Role, Turn};

/// Decides whether the latest user message opens a new topic.
pub trait TopicDetector: Send + Sync {
    /// `turns` already includes the message being judged.
    fn is_new_topic(&self, turns: &[Turn]) -> bool;
}

/// Connective-word topic detector.
#[derive(Debug, Clone)]
pub struct ConnectiveTopicDetector {
    connectives: Vec<String>,
    window: usize,
}

impl ConnectiveTopicDetector {
    pub fn new(connectives: Vec<String>, window: usize) -> Self {
        Self {
            connectives: connectives.into_iter().map(|c| c.to_lowercase()).collect(),
            window,
        }
    }

    pub fn from_config(config: &KeywordConfig, window: usize) -> Self {
        Self::new(config.connectives.clone(), window)
    }
}

impl Default for ConnectiveTopicDetector {
    fn default() -> Self {
        Self::from_config(&KeywordConfig::default(), 3)
    }
}

impl TopicDetector for ConnectiveTopicDetector {
    fn is_new_topic(&self, turns: &[Turn]) -> bool {
        if turns.len() < 2 {
            return true;
        }

        let start = turns.len().saturating_sub(self.window);
        let recent_user_text = turns[start..]
            .iter()
            .filter(|t| t.role == Role::User)
            .map(|t| t.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        // Whole words only: "y" must not match inside "hoy" or "estoy".
        let has_connective = recent_user_text
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| self.connectives.iter().any(|c| c == word));

        !has_connective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ConnectiveTopicDetector {
        ConnectiveTopicDetector::default()
    }

    #[test]
    fn test_bootstrap_zero_and_one_turns() {
        assert!(detector().is_new_topic(&[]));
        assert!(detector().is_new_topic(&[Turn::user("y también")]));
        assert!(detector().is_new_topic(&[Turn::assistant("¡Hola!")]));
    }

    #[test]
    fn test_no_connective_is_new_topic() {
        let turns = vec![
            Turn::assistant("¡Hola!"),
            Turn::user("me siento triste por mi examen"),
        ];
        assert!(detector().is_new_topic(&turns));
    }

    #[test]
    fn test_connective_in_recent_user_turn_is_continuation() {
        let turns = vec![
            Turn::assistant("¡Hola!"),
            Turn::user("me siento triste por mi examen"),
            Turn::assistant("Lo siento mucho."),
            Turn::user("y también estoy preocupada"),
        ];
        assert!(!detector().is_new_topic(&turns));
    }

    #[test]
    fn test_connective_inside_word_does_not_count() {
        let turns = vec![
            Turn::assistant("¡Hola!"),
            Turn::user("hoy estoy cansada"),
        ];
        assert!(detector().is_new_topic(&turns));
    }

    #[test]
    fn test_punctuation_separates_words() {
        let turns = vec![Turn::assistant("¿Y?"), Turn::user("Pero, no sé")];
        assert!(!detector().is_new_topic(&turns));
    }

    #[test]
    fn test_assistant_connectives_are_ignored() {
        let turns = vec![
            Turn::assistant("Entiendo y también te escucho"),
            Turn::user("tengo miedo"),
        ];
        assert!(detector().is_new_topic(&turns));
    }

    #[test]
    fn test_only_last_window_turns_are_inspected() {
        let turns = vec![
            Turn::user("y además"),
            Turn::assistant("ok"),
            Turn::user("tengo miedo"),
            Turn::assistant("cuéntame"),
            Turn::user("no puedo dormir"),
        ];
        // Window of 3 covers only the last three turns.
        assert!(detector().is_new_topic(&turns));

        let wide = ConnectiveTopicDetector::from_config(&KeywordConfig::default(), 5);
        assert!(!wide.is_new_topic(&turns));
    }

    #[test]
    fn test_english_connectives() {
        let turns = vec![Turn::assistant("Hi"), Turn::user("And then it got worse")];
        assert!(!detector().is_new_topic(&turns));
    }
}
