//! Route handlers.

use axum::extract::State;
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.orchestrator.active_sessions(),
    })
}

/// GET / redirects to the health check.
pub async fn root() -> Redirect {
    Redirect::temporary("/health")
}

// =============================================================================
// Accounts
// =============================================================================

/// Request body for /register and /login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub success: bool,
    pub user_id: String,
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user_id = state.accounts.register(&body.email, &body.password).await?;
    Ok(Json(AccountResponse {
        success: true,
        user_id,
    }))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user_id = state.accounts.login(&body.email, &body.password).await?;
    info!(user = %user_id, "Login");
    Ok(Json(AccountResponse {
        success: true,
        user_id,
    }))
}

// =============================================================================
// Conversation
// =============================================================================

/// Request body for /welcome. The password is accepted but unused.
#[derive(Debug, Deserialize)]
pub struct WelcomeRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Session owner. Omitted requests run in a one-off session.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub response: String,
}

/// POST /welcome starts a fresh session and returns the greeting.
pub async fn welcome(
    State(state): State<AppState>,
    Json(body): Json<WelcomeRequest>,
) -> Result<Json<ReplyResponse>, ApiError> {
    let response = state.orchestrator.welcome(&body.email).await?;
    Ok(Json(ReplyResponse { response }))
}

/// POST /chat runs one conversation turn. A `user_id` needs a prior
/// /welcome.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ReplyResponse>, ApiError> {
    let user = body.user_id.as_deref().unwrap_or_default();
    let response = state.orchestrator.handle_message(user, &body.message).await?;
    Ok(Json(ReplyResponse { response }))
}
