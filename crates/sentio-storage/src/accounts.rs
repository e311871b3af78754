//! Account registration and credential lookup.
//!
//! Accounts live in the `correosEstudiantes` collection as
//! `{correoEstudiante, pswEstudiante}` documents. Emails are normalized to
//! lowercase before validation and lookup.

use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Value};
use tracing::info;

use sentio_core::config::AccountConfig;

use crate::error::StorageError;
use crate::store::{DocumentStore, Fields, Filter};

/// Collection holding registered accounts.
pub const ACCOUNTS_COLLECTION: &str = "correosEstudiantes";
const EMAIL_FIELD: &str = "correoEstudiante";
const PASSWORD_FIELD: &str = "pswEstudiante";

/// Errors from account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("email must have the form nombre.apellido@spc.edu.pe")]
    InvalidEmail,
    #[error("password must be exactly {0} characters")]
    InvalidPassword(usize),
    #[error("email is already registered")]
    AlreadyRegistered,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid email pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Registers and authenticates accounts against a document store.
pub struct AccountRepository {
    store: Arc<dyn DocumentStore>,
    email_pattern: Regex,
    password_length: usize,
}

impl AccountRepository {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AccountConfig) -> Result<Self, AccountError> {
        Ok(Self {
            store,
            email_pattern: Regex::new(&config.email_pattern)?,
            password_length: config.password_length,
        })
    }

    /// Register a new account. Returns the normalized email.
    pub async fn register(&self, email: &str, password: &str) -> Result<String, AccountError> {
        let email = normalize_email(email);
        let password = password.trim();

        if !self.email_pattern.is_match(&email) {
            return Err(AccountError::InvalidEmail);
        }
        if password.chars().count() != self.password_length {
            return Err(AccountError::InvalidPassword(self.password_length));
        }

        let existing = self
            .store
            .find_one(ACCOUNTS_COLLECTION, &[Filter::eq(EMAIL_FIELD, email.as_str())])
            .await?;
        if existing.is_some() {
            return Err(AccountError::AlreadyRegistered);
        }

        let mut fields = Fields::new();
        fields.insert(EMAIL_FIELD.to_string(), Value::String(email.clone()));
        fields.insert(PASSWORD_FIELD.to_string(), json!(password));
        self.store.create(ACCOUNTS_COLLECTION, fields).await?;

        info!(user = %email, "Account registered");
        Ok(email)
    }

    /// Check credentials. Returns the normalized email on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AccountError> {
        let email = normalize_email(email);
        let found = self
            .store
            .find_one(
                ACCOUNTS_COLLECTION,
                &[
                    Filter::eq(EMAIL_FIELD, email.as_str()),
                    Filter::eq(PASSWORD_FIELD, password.trim()),
                ],
            )
            .await?;

        match found {
            Some(_) => Ok(email),
            None => Err(AccountError::InvalidCredentials),
        }
    }
}

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
