use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::accounts::{self, Role};
use crate::entities::prelude::*;

/// Account data returned from the repository (without the password hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            name: model.name,
            role: model.role,
        }
    }
}

pub struct NewAccount<'p> {
    pub username: String,
    pub name: String,
    pub password: &'p str,
    pub role: Role,
}

pub struct AccountRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> AccountRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Account>> {
        let account = Accounts::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query account by ID")?;

        Ok(account.map(Account::from))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        let account = Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .one(self.conn)
            .await
            .context("Failed to query account by username")?;

        Ok(account.map(Account::from))
    }

    pub async fn get_by_username_and_name(
        &self,
        username: &str,
        name: &str,
    ) -> Result<Option<Account>> {
        let account = Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .filter(accounts::Column::Name.eq(name))
            .one(self.conn)
            .await
            .context("Failed to query account by username and name")?;

        Ok(account.map(Account::from))
    }

    pub async fn get_many(&self, ids: &[i32]) -> Result<Vec<Account>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = Accounts::find()
            .filter(accounts::Column::Id.is_in(ids.iter().copied()))
            .all(self.conn)
            .await
            .context("Failed to query accounts by IDs")?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool> {
        let count = Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .count(self.conn)
            .await?;
        Ok(count > 0)
    }

    /// Takes the write lock for the surrounding transaction without
    /// changing any row.
    pub async fn reserve_writes(&self) -> Result<()> {
        Accounts::update_many()
            .col_expr(accounts::Column::Id, Expr::col(accounts::Column::Id).into())
            .filter(accounts::Column::Id.lt(0))
            .exec(self.conn)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(Accounts::find().count(self.conn).await?)
    }

    /// Hashes the password off the async runtime and inserts the account.
    pub async fn create(
        &self,
        account: NewAccount<'_>,
        security: &SecurityConfig,
    ) -> Result<Account> {
        let password = account.password.to_string();
        let security = security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now();
        let model = accounts::ActiveModel {
            username: Set(account.username),
            name: Set(account.name),
            password_hash: Set(password_hash),
            role: Set(account.role),
            reset_token: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await?;

        Ok(Account::from(model))
    }

    /// Verifies a password for an account.
    /// Argon2 verification is CPU-bound, so it runs in `spawn_blocking`.
    pub async fn verify_password(&self, account_id: i32, password: &str) -> Result<bool> {
        let account = Accounts::find_by_id(account_id)
            .one(self.conn)
            .await
            .context("Failed to query account for password verification")?;

        let Some(account) = account else {
            return Ok(false);
        };

        let password_hash = account.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    pub async fn update_name(&self, account_id: i32, name: &str) -> Result<()> {
        let account = Accounts::find_by_id(account_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {account_id}"))?;

        let mut active: accounts::ActiveModel = account.into();
        active.name = Set(name.to_string());
        active.updated_at = Set(chrono::Utc::now());
        active.update(self.conn).await?;

        Ok(())
    }

    /// Stores a fresh reset token on the account and returns it.
    pub async fn issue_reset_token(&self, account_id: i32) -> Result<String> {
        let account = Accounts::find_by_id(account_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {account_id}"))?;

        let token = generate_token();

        let mut active: accounts::ActiveModel = account.into();
        active.reset_token = Set(Some(token.clone()));
        active.updated_at = Set(chrono::Utc::now());
        active.update(self.conn).await?;

        Ok(token)
    }

    pub async fn get_by_reset_token(&self, token: &str) -> Result<Option<Account>> {
        let account = Accounts::find()
            .filter(accounts::Column::ResetToken.eq(token))
            .one(self.conn)
            .await
            .context("Failed to query account by reset token")?;

        Ok(account.map(Account::from))
    }

    /// Replaces the password hash and clears the reset token in one update
    /// keyed on the token itself. Returns false when the token was already
    /// consumed or replaced.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
        security: &SecurityConfig,
    ) -> Result<bool> {
        let password = new_password.to_string();
        let security = security.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
            .await
            .context("Password hashing task panicked")??;

        let result = Accounts::update_many()
            .col_expr(accounts::Column::PasswordHash, Expr::value(new_hash))
            .col_expr(accounts::Column::ResetToken, Expr::value(Option::<String>::None))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(accounts::Column::ResetToken.eq(token))
            .exec(self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete(&self, account_id: i32) -> Result<bool> {
        let result = Accounts::delete_by_id(account_id).exec(self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random one-time token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
