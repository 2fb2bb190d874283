//! HTTP API.
//!
//! Handlers are thin: they extract and validate the request, run the ledger
//! call on a blocking thread (redb transactions are synchronous), and wrap the
//! result in the `{ success, message?, data? }` envelope.

pub mod dto;
pub mod extract;
mod referral;
mod session;

use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use campus_ledger_state::{ReferralLedger, SessionManager};
use campus_ledger_storage::StorageEngine;
use campus_ledger_types::config::{ReferralConfig, SessionConfig};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use self::dto::ApiResponse;
use crate::error::ApiError;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Referral ledger.
    pub referrals: ReferralLedger,
    /// Refresh token session manager.
    pub sessions: SessionManager,
}

impl AppState {
    /// Builds the ledger and session manager over one storage engine.
    pub fn new(engine: StorageEngine, referral: ReferralConfig, session: SessionConfig) -> Self {
        Self {
            referrals: ReferralLedger::new(engine.clone(), referral),
            sessions: SessionManager::new(engine, session),
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/students", post(referral::register_student))
        .route("/referral", get(referral::get_referral_info))
        .route("/referral/apply", post(referral::apply_referral_code))
        .route("/referral/credit/{referee_id}", post(referral::credit_referral))
        .route("/auth/sessions", post(session::issue_session))
        .route("/auth/sessions/{user_id}", get(session::list_sessions))
        .route("/auth/refresh", post(session::refresh))
        .route("/auth/logout", post(session::logout))
        .route("/auth/logout-all", post(session::logout_all))
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

async fn health() -> Json<ApiResponse<()>> {
    Json(ApiResponse::ok())
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Runs a synchronous ledger call on the blocking pool.
pub(crate) async fn blocking<F, T, E>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal { message: format!("ledger task failed: {e}") })?
        .map_err(Into::into)
}
