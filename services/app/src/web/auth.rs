//! services/app/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout. They go through
//! the same auth gateway the WebSocket view router uses and hand the access
//! token back as a session cookie.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use raffle_core::domain::{Credentials, Session};
use raffle_core::ports::{AuthGateway, PortError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::adapters::PgAuthClient;
use crate::web::{middleware::session_token, state::AppState};

const MIN_PASSWORD_LEN: usize = 8;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for AuthResponse {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user.user_id,
            email: session.user.email.clone(),
            access_token: session.access_token.clone(),
            expires_at: session.expires_at,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token,
        ttl.num_seconds()
    )
}

const CLEARED_COOKIE: &str = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new customer account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let email = req.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email address".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    let credentials = Credentials::new(email, req.password);
    let client = state.auth_client();
    client.sign_up(&credentials).await.map_err(|e| match e {
        PortError::Conflict(message) => (StatusCode::CONFLICT, message),
        other => {
            error!("Failed to create user: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
        }
    })?;

    let session = client.sign_in(&credentials).await.map_err(|e| {
        error!("Failed to create auth session: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, session_cookie(&session.access_token, state.config.session_ttl))],
        Json(AuthResponse::from(&session)),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let credentials = Credentials::new(req.email, req.password);
    let session = state
        .auth_client()
        .sign_in(&credentials)
        .await
        .map_err(|e| match e {
            PortError::InvalidCredentials(message) => (StatusCode::UNAUTHORIZED, message),
            other => {
                error!("Failed to sign in: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
            }
        })?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&session.access_token, state.config.session_ttl))],
        Json(AuthResponse::from(&session)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token = session_token(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    let client =
        PgAuthClient::restore(state.db.clone(), state.config.session_ttl, Some(token)).await;
    client.sign_out().await.map_err(|e| {
        error!("Failed to delete auth session: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
    })?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, CLEARED_COOKIE.to_string())]))
}
