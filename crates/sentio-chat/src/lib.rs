//! Conversational core for Sentio.
//!
//! Tracks per-user chat sessions, composes empathic replies through a
//! text-generation service, classifies the emotion behind each new topic,
//! and mirrors newly detected emotions into the document store.

pub mod emotion;
pub mod error;
pub mod format;
pub mod intent;
pub mod ledger;
pub mod llm;
pub mod orchestrator;
pub mod response;
pub mod topic;
pub mod types;

pub use emotion::EmotionClassifier;
pub use error::ChatError;
pub use intent::{IntentClassifier, KeywordIntentClassifier};
pub use ledger::{EmotionLedger, LedgerUpdate, LEDGER_COLLECTION};
pub use llm::{GeminiClient, MockGenerator, TextGenerator};
pub use orchestrator::ConversationOrchestrator;
pub use response::ResponseComposer;
pub use topic::{ConnectiveTopicDetector, TopicDetector};
pub use types::{Composition, Role, Session, Turn};
