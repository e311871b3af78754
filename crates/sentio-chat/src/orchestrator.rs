//! Conversation orchestrator: owns per-user sessions and runs each chat
//! turn through composition and the emotion ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use sentio_core::SentioConfig;
use sentio_storage::DocumentStore;

use crate::error::ChatError;
use crate::format::welcome_message;
use crate::intent::IntentClassifier;
use crate::ledger::EmotionLedger;
use crate::llm::TextGenerator;
use crate::response::ResponseComposer;
use crate::topic::TopicDetector;
use crate::types::{Session, Turn};

type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Coordinates sessions, reply composition and emotion recording.
///
/// Sessions are keyed by normalized user id and only `welcome` creates them.
/// Turns for the same user are serialized by the session's own lock;
/// different users never contend beyond the brief map lookup. A chat that
/// names no user runs in a throwaway session that is never stored.
pub struct ConversationOrchestrator {
    composer: ResponseComposer,
    ledger: EmotionLedger,
    sessions: Mutex<HashMap<String, SessionHandle>>,
    assistant_name: String,
    enabled: bool,
    max_message_length: usize,
}

impl ConversationOrchestrator {
    pub fn new(
        config: &SentioConfig,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let generation_timeout = Duration::from_secs(config.llm.timeout_secs.max(1));
        let storage_timeout = Duration::from_secs(config.storage.timeout_secs.max(1));

        Self {
            composer: ResponseComposer::new(
                generator,
                &config.chat,
                &config.keywords,
                generation_timeout,
            ),
            ledger: EmotionLedger::new(store, storage_timeout),
            sessions: Mutex::new(HashMap::new()),
            assistant_name: config.chat.assistant_name.clone(),
            enabled: config.chat.enabled,
            max_message_length: config.chat.max_message_length,
        }
    }

    pub fn with_topic_detector(mut self, topics: Box<dyn TopicDetector>) -> Self {
        self.composer = self.composer.with_topic_detector(topics);
        self
    }

    pub fn with_intent_classifier(mut self, intents: Box<dyn IntentClassifier>) -> Self {
        self.composer = self.composer.with_intent_classifier(intents);
        self
    }

    /// Start a fresh session for `email` and return the greeting.
    ///
    /// Any previous session for the same user is discarded.
    pub async fn welcome(&self, email: &str) -> Result<String, ChatError> {
        let key = session_key(email);
        if key.is_empty() {
            return Err(ChatError::MissingUser);
        }

        let greeting = welcome_message(&self.assistant_name, &key);
        let mut session = Session::new(Some(key.clone()));
        session.turns.push(Turn::assistant(greeting.clone()));

        let replaced = self
            .lock_sessions()?
            .insert(key.clone(), Arc::new(tokio::sync::Mutex::new(session)))
            .is_some();
        info!(user = %key, replaced, "Session started");
        Ok(greeting)
    }

    /// Handle one chat turn and return the reply.
    ///
    /// Only input validation and a missing session can fail; model and
    /// storage failures are absorbed into the fallback reply or logged.
    pub async fn handle_message(&self, user_key: &str, message: &str) -> Result<String, ChatError> {
        if !self.enabled {
            return Err(ChatError::Disabled);
        }
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if trimmed.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let key = session_key(user_key);
        if key.is_empty() {
            debug!("Chat without user; using a one-off session");
            let mut session = Session::new(None);
            return Ok(self.run_turn(&mut session, &key, message).await);
        }

        let handle = self
            .lock_sessions()?
            .get(&key)
            .cloned()
            .ok_or(ChatError::NoSession)?;
        let mut session = handle.lock().await;
        Ok(self.run_turn(&mut session, &key, message).await)
    }

    async fn run_turn(&self, session: &mut Session, key: &str, message: &str) -> String {
        let composition = self.composer.compose(session, message).await;
        if let Some(label) = composition.emotion.as_deref() {
            let update = self.ledger.record_if_new(session, label, message).await;
            debug!(user = %key, ?update, "Ledger updated");
        }
        composition.reply
    }

    /// Copy of a user's current session state.
    pub async fn session_snapshot(&self, user_key: &str) -> Result<Option<Session>, ChatError> {
        let handle = self.lock_sessions()?.get(&session_key(user_key)).cloned();
        match handle {
            Some(handle) => Ok(Some(handle.lock().await.clone())),
            None => Ok(None),
        }
    }

    /// Drop a user's session. Returns whether one existed.
    pub fn reset(&self, user_key: &str) -> Result<bool, ChatError> {
        let key = session_key(user_key);
        let removed = self.lock_sessions()?.remove(&key).is_some();
        if removed {
            info!(user = %key, "Session reset");
        }
        Ok(removed)
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn lock_sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, SessionHandle>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::SessionState(format!("session lock poisoned: {}", e)))
    }
}

fn session_key(user_key: &str) -> String {
    user_key.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FALLBACK_REPLY, GRATITUDE_REPLY};
    use crate::ledger::LEDGER_COLLECTION;
    use crate::llm::MockGenerator;
    use crate::types::Role;
    use sentio_storage::MemoryDocumentStore;

    const ANA: &str = "ana.gomez@spc.edu.pe";
    const LUIS: &str = "luis.perez@spc.edu.pe";
    const CLASSIFY: &str = "Identifica la emoción principal";

    fn setup(
        mock: MockGenerator,
    ) -> (
        Arc<MockGenerator>,
        Arc<MemoryDocumentStore>,
        ConversationOrchestrator,
    ) {
        let mock = Arc::new(mock);
        let store = Arc::new(MemoryDocumentStore::new());
        let orchestrator =
            ConversationOrchestrator::new(&SentioConfig::default(), mock.clone(), store.clone());
        (mock, store, orchestrator)
    }

    #[tokio::test]
    async fn test_sad_then_worried_conversation() {
        let (mock, store, orch) =
            setup(MockGenerator::new("Siento que estés así.").on(CLASSIFY, "Tristeza"));

        let greeting = orch.welcome(ANA).await.unwrap();
        assert!(greeting.contains("Ana Gomez"));

        let reply = orch
            .handle_message(ANA, "me siento triste por mi examen")
            .await
            .unwrap();
        assert!(reply.starts_with("Emotion detected: Tristeza"));

        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert_eq!(session.emotions, vec!["Tristeza"]);
        assert_eq!(session.situations, vec!["me siento triste por mi examen"]);
        assert_eq!(store.create_calls(), 1);

        let reply = orch
            .handle_message(ANA, "y también estoy preocupada")
            .await
            .unwrap();
        assert_eq!(reply, "Siento que estés así.");
        assert_eq!(mock.calls_matching(CLASSIFY), 1);

        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert_eq!(session.emotions, vec!["Tristeza"]);
        assert_eq!(session.situations.len(), 1);
        assert_eq!(session.turns.len(), 5);
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_new_emotions_update_the_same_document() {
        let (_, store, orch) = setup(
            MockGenerator::new("Te escucho.")
                .on_sequence(CLASSIFY, ["Tristeza", "miedo", "tristeza", "Alegría"]),
        );
        orch.welcome(ANA).await.unwrap();

        // No connectives, so every message opens a new topic.
        for msg in ["reprobé", "tengo miedo al examen", "sigo triste hoy", "aprobé otro curso"] {
            orch.handle_message(ANA, msg).await.unwrap();
        }

        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert_eq!(session.emotions, vec!["Tristeza", "Miedo", "Alegría"]);
        assert_eq!(
            session.situations,
            vec!["reprobé", "tengo miedo al examen", "aprobé otro curso"]
        );
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.update_calls(), 2);

        let docs = store.documents(LEDGER_COLLECTION);
        assert_eq!(docs.len(), 1);
        assert_eq!(session.ledger_doc_id.as_deref(), Some(docs[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_gratitude_touches_nothing() {
        let (mock, store, orch) = setup(MockGenerator::new("no"));
        orch.welcome(ANA).await.unwrap();

        let reply = orch.handle_message(ANA, "Muchas gracias").await.unwrap();

        assert_eq!(reply, GRATITUDE_REPLY);
        assert_eq!(mock.calls(), 0);
        assert_eq!(store.create_calls() + store.update_calls(), 0);
        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert!(session.emotions.is_empty());
        assert_eq!(session.turns.len(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_returns_fallback() {
        let (_, store, orch) = setup(MockGenerator::failing("unavailable"));
        orch.welcome(ANA).await.unwrap();

        let reply = orch.handle_message(ANA, "me siento sola").await.unwrap();

        assert_eq!(reply, FALLBACK_REPLY);
        assert_eq!(store.create_calls(), 0);
        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert_eq!(session.turns.len(), 1);
    }

    #[tokio::test]
    async fn test_classification_failure_keeps_reply_and_skips_ledger() {
        let (_, store, orch) =
            setup(MockGenerator::new("Aquí estoy.").fail_on(CLASSIFY, "down"));
        orch.welcome(ANA).await.unwrap();

        let reply = orch.handle_message(ANA, "tengo miedo").await.unwrap();

        assert_eq!(reply, "Aquí estoy.");
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_turn() {
        let (_, store, orch) = setup(MockGenerator::new("Ánimo.").on(CLASSIFY, "Estrés"));
        store.set_fail_writes(true);
        orch.welcome(ANA).await.unwrap();

        let reply = orch.handle_message(ANA, "tengo exámenes").await.unwrap();

        assert!(reply.starts_with("Emotion detected: Estrés"));
        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert_eq!(session.emotions, vec!["Estrés"]);
        assert!(session.ledger_doc_id.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_per_user() {
        let (_, store, orch) = setup(
            MockGenerator::new("Te escucho.")
                .on("'estoy feliz'", "Alegría")
                .on("'estoy enojado'", "Enojo"),
        );
        orch.welcome(ANA).await.unwrap();
        orch.welcome(LUIS).await.unwrap();

        orch.handle_message(ANA, "estoy feliz").await.unwrap();
        orch.handle_message(LUIS, "estoy enojado").await.unwrap();

        let ana = orch.session_snapshot(ANA).await.unwrap().unwrap();
        let luis = orch.session_snapshot(LUIS).await.unwrap().unwrap();
        assert_eq!(ana.emotions, vec!["Alegría"]);
        assert_eq!(luis.emotions, vec!["Enojo"]);
        assert_ne!(ana.ledger_doc_id, luis.ledger_doc_id);
        assert_eq!(store.documents(LEDGER_COLLECTION).len(), 2);
        assert_eq!(orch.active_sessions(), 2);
    }

    #[tokio::test]
    async fn test_welcome_resets_session() {
        let (_, _, orch) = setup(MockGenerator::new("ok").on(CLASSIFY, "Calma"));
        orch.welcome(ANA).await.unwrap();
        orch.handle_message(ANA, "hola").await.unwrap();
        let first = orch.session_snapshot(ANA).await.unwrap().unwrap();

        orch.welcome("  ANA.Gomez@spc.edu.pe ").await.unwrap();

        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert!(session.started_at >= first.started_at);
        assert_eq!(session.user_id.as_deref(), Some(ANA));
        assert_eq!(session.turns.len(), 1);
        assert_eq!(session.turns[0].role, Role::Assistant);
        assert!(session.emotions.is_empty());
        assert!(session.first_message.is_none());
        assert!(session.ledger_doc_id.is_none());
        assert_eq!(orch.active_sessions(), 1);
    }

    #[tokio::test]
    async fn test_welcome_requires_user() {
        let (_, _, orch) = setup(MockGenerator::new("ok"));
        assert!(matches!(
            orch.welcome("   ").await,
            Err(ChatError::MissingUser)
        ));
    }

    #[tokio::test]
    async fn test_chat_without_user_is_never_persisted() {
        let (_, store, orch) = setup(MockGenerator::new("ok").on(CLASSIFY, "Miedo"));

        let reply = orch.handle_message("", "tengo miedo").await.unwrap();

        assert!(reply.starts_with("Emotion detected: Miedo"));
        assert_eq!(store.create_calls(), 0);
        assert_eq!(orch.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_chats_without_user_do_not_share_context() {
        let (mock, _, orch) = setup(MockGenerator::new("ok").on(CLASSIFY, "Tristeza"));

        orch.handle_message("", "mi secreto es que reprobé").await.unwrap();
        orch.handle_message("  ", "hola").await.unwrap();

        let second: Vec<_> = mock
            .prompts()
            .into_iter()
            .filter(|p| p.contains("\"hola\""))
            .collect();
        assert_eq!(second.len(), 1);
        assert!(!second[0].contains("reprobé"));
        assert_eq!(orch.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_chat_for_unwelcomed_user_is_rejected() {
        let (mock, store, orch) = setup(MockGenerator::new("ok"));

        for i in 0..50 {
            let user = format!("alumno{i}@spc.edu.pe");
            assert!(matches!(
                orch.handle_message(&user, "hola").await,
                Err(ChatError::NoSession)
            ));
        }

        assert_eq!(orch.active_sessions(), 0);
        assert_eq!(mock.calls(), 0);
        assert_eq!(store.create_calls(), 0);

        orch.welcome(LUIS).await.unwrap();
        orch.reset(LUIS).unwrap();
        assert!(matches!(
            orch.handle_message(LUIS, "hola").await,
            Err(ChatError::NoSession)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classification_timeout_keeps_reply_and_skips_ledger() {
        let (_, store, orch) = setup(MockGenerator::new("Aquí estoy.").hang_on(CLASSIFY));
        orch.welcome(ANA).await.unwrap();

        let reply = orch.handle_message(ANA, "tengo miedo").await.unwrap();

        assert_eq!(reply, "Aquí estoy.");
        assert_eq!(store.create_calls(), 0);
        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert!(session.emotions.is_empty());
        assert_eq!(session.turns.len(), 3);
    }

    #[tokio::test]
    async fn test_message_is_stored_as_sent() {
        let (_, store, orch) = setup(MockGenerator::new("ok").on(CLASSIFY, "Tristeza"));
        orch.welcome(ANA).await.unwrap();

        orch.handle_message(ANA, "  me siento triste\n").await.unwrap();

        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert_eq!(session.first_message.as_deref(), Some("  me siento triste\n"));
        assert_eq!(session.situations, vec!["  me siento triste\n"]);
        assert_eq!(
            store.documents(LEDGER_COLLECTION)[0].fields["situacion"],
            serde_json::json!(["  me siento triste\n"])
        );
    }

    #[tokio::test]
    async fn test_message_validation() {
        let (mock, _, orch) = setup(MockGenerator::new("ok"));

        assert!(matches!(
            orch.handle_message(ANA, "  \n ").await,
            Err(ChatError::EmptyMessage)
        ));
        let long = "a".repeat(2001);
        assert!(matches!(
            orch.handle_message(ANA, &long).await,
            Err(ChatError::MessageTooLong(2000))
        ));
        assert_eq!(mock.calls(), 0);
        assert_eq!(orch.active_sessions(), 0);
    }

    #[tokio::test]
    async fn test_disabled_chat_rejects_messages() {
        let mut config = SentioConfig::default();
        config.chat.enabled = false;
        let orch = ConversationOrchestrator::new(
            &config,
            Arc::new(MockGenerator::new("ok")),
            Arc::new(MemoryDocumentStore::new()),
        );
        assert!(matches!(
            orch.handle_message(ANA, "hola").await,
            Err(ChatError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_reset_drops_session() {
        let (_, _, orch) = setup(MockGenerator::new("ok"));
        orch.welcome(ANA).await.unwrap();

        assert!(orch.reset(ANA).unwrap());
        assert!(!orch.reset(ANA).unwrap());
        assert!(orch.session_snapshot(ANA).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_turns_for_one_user_stay_alternating() {
        let (_, _, orch) = setup(MockGenerator::new("ok").on(CLASSIFY, "Calma"));
        let orch = Arc::new(orch);
        orch.welcome(ANA).await.unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let orch = Arc::clone(&orch);
                tokio::spawn(async move { orch.handle_message(ANA, &format!("mensaje {i}")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let session = orch.session_snapshot(ANA).await.unwrap().unwrap();
        assert_eq!(session.turns.len(), 17);
        for pair in session.turns[1..].chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
        assert_eq!(session.emotions, vec!["Calma"]);
    }

    #[tokio::test]
    async fn test_pluggable_topic_detector() {
        struct AlwaysContinuation;
        impl TopicDetector for AlwaysContinuation {
            fn is_new_topic(&self, _: &[Turn]) -> bool {
                false
            }
        }

        let (mock, store, _) = setup(MockGenerator::new("ok"));
        let orch = ConversationOrchestrator::new(
            &SentioConfig::default(),
            mock.clone(),
            store.clone(),
        )
        .with_topic_detector(Box::new(AlwaysContinuation));
        orch.welcome(ANA).await.unwrap();
        orch.handle_message(ANA, "tengo miedo").await.unwrap();

        assert_eq!(mock.calls_matching(CLASSIFY), 0);
        assert_eq!(store.create_calls(), 0);
    }
}
