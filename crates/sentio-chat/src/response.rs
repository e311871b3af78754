//! Reply composition.
//!
//! Turns one user message into the assistant reply: gratitude short-circuit,
//! model call over a bounded context window, emotion banner on new topics,
//! bullet recommendations on advice requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use sentio_core::config::{ChatConfig, KeywordConfig};

use crate::emotion::EmotionClassifier;
use crate::format::{
    banner, bulletize, capitalize, render_context, starts_with_banner, BULLET, FALLBACK_REPLY,
    GRATITUDE_REPLY,
};
use crate::intent::{IntentClassifier, KeywordIntentClassifier};
use crate::llm::{generate_within, TextGenerator};
use crate::topic::{ConnectiveTopicDetector, TopicDetector};
use crate::types::{Composition, Session, Turn};

/// Composes empathic replies and decides when to classify emotions.
pub struct ResponseComposer {
    generator: Arc<dyn TextGenerator>,
    emotions: EmotionClassifier,
    intents: Box<dyn IntentClassifier>,
    topics: Box<dyn TopicDetector>,
    assistant_name: String,
    context_turns: usize,
    max_recommendations: usize,
    timeout: Duration,
}

impl ResponseComposer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        chat: &ChatConfig,
        keywords: &KeywordConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            emotions: EmotionClassifier::new(Arc::clone(&generator), timeout),
            generator,
            intents: Box::new(KeywordIntentClassifier::from_config(keywords)),
            topics: Box::new(ConnectiveTopicDetector::from_config(
                keywords,
                chat.topic_window,
            )),
            assistant_name: chat.assistant_name.clone(),
            context_turns: chat.context_turns,
            max_recommendations: chat.max_recommendations,
            timeout,
        }
    }

    /// Replace the topic-change heuristic.
    pub fn with_topic_detector(mut self, topics: Box<dyn TopicDetector>) -> Self {
        self.topics = topics;
        self
    }

    /// Replace the intent heuristics.
    pub fn with_intent_classifier(mut self, intents: Box<dyn IntentClassifier>) -> Self {
        self.intents = intents;
        self
    }

    /// Compose the reply to `message`, updating `session.turns`.
    ///
    /// Never fails: a generation failure yields the fallback reply and
    /// leaves the session as it was before the call.
    pub async fn compose(&self, session: &mut Session, message: &str) -> Composition {
        if self.intents.is_gratitude(message) {
            debug!("Gratitude detected; skipping generation");
            return Composition::plain(GRATITUDE_REPLY);
        }

        let turns_before = session.turns.len();
        let sets_first_message = session.first_message.is_none();
        session.turns.push(Turn::user(message));
        if sets_first_message {
            session.first_message = Some(message.to_string());
        }

        let prompt = self.reply_prompt(session, message);
        let mut reply = match generate_within(self.generator.as_ref(), &prompt, self.timeout).await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                error!("Reply generation returned no text");
                rollback(session, turns_before, sets_first_message);
                return Composition::plain(FALLBACK_REPLY);
            }
            Err(e) => {
                error!(error = %e, "Reply generation failed");
                rollback(session, turns_before, sets_first_message);
                return Composition::plain(FALLBACK_REPLY);
            }
        };

        let mut emotion = None;
        if self.topics.is_new_topic(&session.turns) && !starts_with_banner(&reply) {
            match self.emotions.classify(message).await {
                Ok(label) => {
                    reply = format!("{}{}", banner(&capitalize(&label)), reply);
                    emotion = Some(label);
                }
                Err(e) => warn!(error = %e, "Replying without emotion banner"),
            }
        }

        if self.intents.needs_advice(message) && !reply.contains(BULLET) {
            reply = bulletize(&reply, self.max_recommendations);
        }

        session.turns.push(Turn::assistant(reply.clone()));
        Composition { reply, emotion }
    }

    fn reply_prompt(&self, session: &Session, message: &str) -> String {
        format!(
            "\nEres {}, un asistente emocional para jóvenes. Contexto previo:\n{}\n\n\
             Nuevo mensaje: \"{}\"\n\n\
             Responde de forma empática y natural, identificando emociones cuando sea nuevo tema.\n",
            self.assistant_name,
            render_context(&session.turns, self.context_turns),
            message
        )
    }
}

/// Undo the user turn appended by a failed composition.
fn rollback(session: &mut Session, turns_before: usize, clear_first_message: bool) {
    session.turns.truncate(turns_before);
    if clear_first_message {
        session.first_message = None;
    }
}
