//! Role gate over the server-side session.
//!
//! A successful login stores exactly one [`Principal`] under [`PRINCIPAL_KEY`];
//! logout flushes the session. Every protected operation names the single role
//! it requires and goes through [`authorize`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;

use crate::entities::accounts::Role;

pub const PRINCIPAL_KEY: &str = "principal";

/// Identity carried by an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub account_id: i32,
    pub role: Role,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Login required")]
    Unauthenticated,

    #[error("This action requires the {required} role")]
    Forbidden { required: Role },

    #[error("Session error: {0}")]
    Session(String),
}

impl From<tower_sessions::session::Error> for AccessError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Session(err.to_string())
    }
}

/// Pure role check behind [`authorize`].
pub fn check(principal: Option<Principal>, required: Role) -> Result<Principal, AccessError> {
    let principal = principal.ok_or(AccessError::Unauthenticated)?;

    if principal.role != required {
        return Err(AccessError::Forbidden { required });
    }

    Ok(principal)
}

pub async fn current(session: &Session) -> Result<Option<Principal>, AccessError> {
    Ok(session.get::<Principal>(PRINCIPAL_KEY).await?)
}

pub async fn authorize(session: &Session, required: Role) -> Result<Principal, AccessError> {
    check(current(session).await?, required)
}

/// Rotates the session id and stores the principal in one insert.
pub async fn sign_in(session: &Session, principal: &Principal) -> Result<(), AccessError> {
    session.cycle_id().await?;
    session.insert(PRINCIPAL_KEY, principal).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> Result<(), AccessError> {
    session.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal {
            account_id: 7,
            role,
            username: "u".to_string(),
            name: "N".to_string(),
        }
    }

    #[test]
    fn test_check_requires_session() {
        assert!(matches!(
            check(None, Role::Admin),
            Err(AccessError::Unauthenticated)
        ));
    }

    #[test]
    fn test_check_requires_exact_role() {
        let err = check(Some(principal(Role::Student)), Role::Staff).unwrap_err();
        assert!(matches!(
            err,
            AccessError::Forbidden {
                required: Role::Staff
            }
        ));

        assert!(matches!(
            check(Some(principal(Role::Admin)), Role::Student),
            Err(AccessError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_check_passes_matching_role() {
        let p = check(Some(principal(Role::Staff)), Role::Staff).unwrap();
        assert_eq!(p.account_id, 7);
    }

    #[tokio::test]
    async fn test_sign_in_then_authorize() {
        use std::sync::Arc;
        use tower_sessions::MemoryStore;

        let session = Session::new(None, Arc::new(MemoryStore::default()), None);

        assert!(matches!(
            authorize(&session, Role::Student).await,
            Err(AccessError::Unauthenticated)
        ));

        sign_in(&session, &principal(Role::Student)).await.unwrap();
        let p = authorize(&session, Role::Student).await.unwrap();
        assert_eq!(p.username, "u");

        sign_out(&session).await.unwrap();
        assert!(current(&session).await.unwrap().is_none());
    }
}
