//! Domain service for accounts: registration, login and password recovery.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::accounts::Role;
use crate::services::access::Principal;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Identity verification failed")]
    ChallengeFailed,

    #[error("Reset link is invalid or has expired")]
    InvalidResetToken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub room_number: Option<String>,
    #[serde(default)]
    pub bed_number: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub account_id: i32,
    pub username: String,
    pub role: Role,
    /// Student or staff number assigned at registration
    pub number: String,
    pub dormitory_id: Option<i32>,
    /// True when the given building and room were unknown and got created
    pub dormitory_created: bool,
}

#[derive(Debug, Clone)]
pub enum NewPassword {
    /// Reset to the configured default password
    UseDefault,
    Custom { password: String, confirm: String },
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a student or staff account together with its record.
    ///
    /// # Errors
    ///
    /// [`AuthError::DuplicateUsername`] when the username exists,
    /// [`AuthError::Validation`] for bad input or an admin role.
    async fn register(&self, request: RegisterRequest) -> Result<Registration, AuthError>;

    /// Accepts a username or a student number as `identifier`.
    async fn login(&self, identifier: &str, password: &str) -> Result<Principal, AuthError>;

    /// Runs the identity challenge and returns a one-time reset token.
    async fn forgot_password(&self, identifier: &str, name: &str) -> Result<String, AuthError>;

    async fn reset_password(&self, token: &str, password: NewPassword) -> Result<(), AuthError>;
}
