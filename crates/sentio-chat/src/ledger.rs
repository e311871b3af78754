//! Emotion ledger: folds detected emotions into the session and mirrors
//! them to the document store.
//!
//! One ledger document per session. The first newly detected emotion
//! creates it; later ones update the same document by id. Writes are
//! best-effort: failures are logged and the session keeps its in-memory
//! state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use sentio_storage::{server_timestamp, DocumentStore, Fields, StorageError};

use crate::format::capitalize;
use crate::types::Session;

/// Collection holding one emotion record per session.
pub const LEDGER_COLLECTION: &str = "emocionesDetectadas";

/// What `record_if_new` did with a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerUpdate {
    /// Empty label or anonymous session.
    Ignored,
    /// The session already holds this emotion.
    AlreadyKnown,
    /// The emotion was added; `persisted` tells whether the write landed.
    Recorded { persisted: bool },
}

pub struct EmotionLedger {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl EmotionLedger {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Add `label` to the session unless already present, then upsert the
    /// session's ledger document.
    pub async fn record_if_new(
        &self,
        session: &mut Session,
        label: &str,
        message: &str,
    ) -> LedgerUpdate {
        let owner = match session.owner() {
            Some(owner) => owner.to_string(),
            None => return LedgerUpdate::Ignored,
        };
        let label = label.trim();
        if label.is_empty() {
            return LedgerUpdate::Ignored;
        }

        let normalized = capitalize(label);
        if session.has_emotion(&normalized) {
            debug!(emotion = %normalized, "Emotion already recorded this session");
            return LedgerUpdate::AlreadyKnown;
        }

        session.emotions.push(normalized.clone());
        session.situations.push(message.to_string());

        let record = ledger_record(&owner, session);
        let persisted = match self.persist(session, record).await {
            Ok(id) => {
                info!(user = %owner, emotion = %normalized, doc_id = %id, "Emotion recorded");
                true
            }
            Err(e) => {
                warn!(user = %owner, emotion = %normalized, error = %e, "Failed to persist emotion ledger");
                false
            }
        };
        LedgerUpdate::Recorded { persisted }
    }

    /// Update the session's document if it has one, otherwise create it.
    async fn persist(&self, session: &mut Session, record: Fields) -> Result<String, StorageError> {
        match session.ledger_doc_id.clone() {
            Some(id) => {
                self.bounded(self.store.update(LEDGER_COLLECTION, &id, record))
                    .await?;
                Ok(id)
            }
            None => {
                let id = self
                    .bounded(self.store.create(LEDGER_COLLECTION, record))
                    .await?;
                session.ledger_doc_id = Some(id.clone());
                Ok(id)
            }
        }
    }

    async fn bounded<T>(
        &self,
        write: impl std::future::Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| {
                StorageError::Unavailable(format!(
                    "write timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
    }
}

fn ledger_record(owner: &str, session: &Session) -> Fields {
    let mut fields = Fields::new();
    fields.insert("alumno".to_string(), Value::String(owner.to_string()));
    fields.insert("emociones".to_string(), json!(session.emotions));
    fields.insert("situacion".to_string(), json!(session.situations));
    fields.insert("fechaHora".to_string(), server_timestamp());
    fields
}
