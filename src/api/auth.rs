use axum::{
    Json,
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, MessageResponse, PrincipalDto};
use crate::entities::accounts::Role;
use crate::services::access::{self, AccessError};
use crate::services::{AuthError, NewPassword, RegisterRequest, Registration};

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Self::Unauthorized(err.to_string()),
            AccessError::Forbidden { .. } => Self::Forbidden(err.to_string()),
            AccessError::Session(msg) => Self::internal(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::DuplicateUsername => Self::conflict(err.to_string()),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::ChallengeFailed => Self::validation(err.to_string()),
            AuthError::InvalidResetToken => Self::NotFound(err.to_string()),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or student number
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub username: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct ResetTokenResponse {
    pub token: String,
    pub reset_url: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub use_default: bool,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Admits the request only when the session principal has exactly `role`.
/// The principal is handed to handlers as a request extension.
pub async fn require_role(
    State(role): State<Role>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = access::authorize(&session, role).await?;

    tracing::Span::current().record("user_id", principal.username.as_str());
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<Registration>>, ApiError> {
    let registration = state.auth_service().register(payload).await?;
    Ok(Json(ApiResponse::success(registration)))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<PrincipalDto>>, ApiError> {
    let principal = state
        .auth_service()
        .login(&payload.username, &payload.password)
        .await?;

    access::sign_in(&session, &principal).await?;

    Ok(Json(ApiResponse::success(principal.into())))
}

/// GET|POST /logout
pub async fn logout(session: Session) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    access::sign_out(&session).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out",
    ))))
}

/// GET /me
pub async fn me(session: Session) -> Result<Json<ApiResponse<PrincipalDto>>, ApiError> {
    let principal = access::current(&session)
        .await?
        .ok_or(AccessError::Unauthenticated)?;

    Ok(Json(ApiResponse::success(principal.into())))
}

/// POST /forgot_password
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<ResetTokenResponse>>, ApiError> {
    let token = state
        .auth_service()
        .forgot_password(&payload.username, &payload.name)
        .await?;

    Ok(Json(ApiResponse::success(ResetTokenResponse {
        reset_url: format!("/api/reset_password/{token}"),
        token,
    })))
}

/// POST /reset_password/{token}
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let password = if payload.use_default {
        NewPassword::UseDefault
    } else {
        NewPassword::Custom {
            password: payload.password.unwrap_or_default(),
            confirm: payload.confirm_password.unwrap_or_default(),
        }
    };

    state.auth_service().reset_password(&token, password).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password has been reset",
    ))))
}
