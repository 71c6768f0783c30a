//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::repositories::account::{Account, NewAccount};
use crate::db::repositories::student::NewStudent;
use crate::db::{
    AccountRepository, DormitoryRepository, StaffRepository, Store, StudentRepository,
    caused_by_unique_violation,
};
use crate::domain::{non_blank, normalize_location};
use crate::entities::accounts::Role;
use crate::services::access::Principal;
use crate::services::auth_service::{
    AuthError, AuthService, NewPassword, RegisterRequest, Registration,
};

pub struct SeaOrmAuthService {
    store: Store,
    config: Config,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, config: Config) -> Self {
        Self { store, config }
    }

    fn check_new_password(&self, password: &str, confirm: &str) -> Result<(), AuthError> {
        let min = self.config.security.min_password_length;

        if password.chars().count() < min {
            return Err(AuthError::Validation(format!(
                "Password must be at least {min} characters"
            )));
        }

        if password != confirm {
            return Err(AuthError::Validation("Passwords do not match".to_string()));
        }

        Ok(())
    }

    /// Account behind a login identifier: username first, then student number.
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, AuthError> {
        if let Some(account) = self.store.accounts().get_by_username(identifier).await? {
            return Ok(Some(account));
        }

        match self.store.students().get_by_number(identifier).await? {
            Some(student) => Ok(self.store.accounts().get_by_id(student.account_id).await?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<Registration, AuthError> {
        let username = request.username.trim().to_string();
        let name = request.name.trim().to_string();

        if username.is_empty() || name.is_empty() {
            return Err(AuthError::Validation(
                "Username and name are required".to_string(),
            ));
        }

        let role = match Role::parse(&request.role) {
            Some(role @ (Role::Student | Role::Staff)) => role,
            Some(Role::Admin) => {
                return Err(AuthError::Validation(
                    "Administrator accounts cannot be self-registered".to_string(),
                ));
            }
            None => {
                return Err(AuthError::Validation(format!(
                    "Unknown role: {}",
                    request.role
                )));
            }
        };

        self.check_new_password(&request.password, &request.confirm_password)?;

        if self.store.accounts().username_exists(&username).await? {
            return Err(AuthError::DuplicateUsername);
        }

        let location = match (&request.building, &request.room_number) {
            (Some(building), Some(room)) if role == Role::Student => {
                normalize_location(building, room)
            }
            _ => None,
        };

        let txn = self.store.begin().await?;

        // Resolution writes first so the transaction holds the write lock
        // before it reads anything.
        let resolution = match &location {
            Some((building, room)) => Some(
                DormitoryRepository::new(&txn)
                    .resolve(building, room, &self.config.housing.placeholder())
                    .await?,
            ),
            None => None,
        };

        let account = AccountRepository::new(&txn)
            .create(
                NewAccount {
                    username: username.clone(),
                    name,
                    password: &request.password,
                    role,
                },
                &self.config.security,
            )
            .await
            .map_err(|e| {
                if caused_by_unique_violation(&e) {
                    AuthError::DuplicateUsername
                } else {
                    AuthError::from(e)
                }
            })?;

        let number = match role {
            Role::Student => {
                let student = StudentRepository::new(&txn)
                    .insert(NewStudent {
                        account_id: account.id,
                        student_number: format!("S{:06}", account.id),
                        major: self.config.housing.default_major.clone(),
                        gender: self.config.housing.default_gender.clone(),
                        dormitory_id: resolution.as_ref().map(|r| r.dormitory.id),
                        bed_number: non_blank(request.bed_number.as_deref()),
                        phone: non_blank(request.phone.as_deref()),
                    })
                    .await?;
                student.student_number
            }
            Role::Staff | Role::Admin => {
                StaffRepository::new(&txn)
                    .insert(account.id, format!("E{:06}", account.id))
                    .await?
                    .staff_number
            }
        };

        txn.commit().await?;

        let dormitory_created = resolution.as_ref().is_some_and(|r| r.created);
        info!(
            username = %account.username,
            role = %role,
            number = %number,
            dormitory_created,
            "Account registered"
        );

        Ok(Registration {
            account_id: account.id,
            username: account.username,
            role,
            number,
            dormitory_id: resolution.map(|r| r.dormitory.id),
            dormitory_created,
        })
    }

    async fn login(&self, identifier: &str, password: &str) -> Result<Principal, AuthError> {
        let identifier = identifier.trim();

        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let Some(account) = self.find_by_identifier(identifier).await? else {
            warn!(identifier, "Login failed: unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .store
            .accounts()
            .verify_password(account.id, password)
            .await?
        {
            warn!(username = %account.username, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(username = %account.username, role = %account.role, "Login succeeded");

        Ok(Principal {
            account_id: account.id,
            role: account.role,
            username: account.username,
            name: account.name,
        })
    }

    async fn forgot_password(&self, identifier: &str, name: &str) -> Result<String, AuthError> {
        let identifier = identifier.trim();
        let name = name.trim();

        if identifier.is_empty() || name.is_empty() {
            return Err(AuthError::Validation(
                "Username and name are required".to_string(),
            ));
        }

        let accounts = self.store.accounts();

        let mut matched = accounts.get_by_username_and_name(identifier, name).await?;

        if matched.is_none()
            && let Some(student) = self.store.students().get_by_number(identifier).await?
        {
            matched = accounts
                .get_by_id(student.account_id)
                .await?
                .filter(|a| a.name == name);
        }

        if matched.is_none() && self.config.seed.find_by_alias(identifier, name).is_some() {
            matched = accounts.get_by_username(identifier).await?;
        }

        let Some(account) = matched else {
            warn!(identifier, "Password reset challenge failed");
            return Err(AuthError::ChallengeFailed);
        };

        let token = accounts.issue_reset_token(account.id).await?;
        info!(username = %account.username, "Password reset token issued");

        Ok(token)
    }

    async fn reset_password(&self, token: &str, password: NewPassword) -> Result<(), AuthError> {
        let accounts = self.store.accounts();

        let account = accounts
            .get_by_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let new_password = match password {
            NewPassword::UseDefault => self.config.security.default_reset_password.clone(),
            NewPassword::Custom { password, confirm } => {
                self.check_new_password(&password, &confirm)?;
                password
            }
        };

        if !accounts
            .reset_password(token, &new_password, &self.config.security)
            .await?
        {
            return Err(AuthError::InvalidResetToken);
        }

        info!(username = %account.username, "Password reset");
        Ok(())
    }
}
