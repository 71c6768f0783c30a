use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    SqlErr, Statement, TransactionTrait,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;
pub mod seed;

pub use repositories::account::AccountRepository;
pub use repositories::dormitory::{DormitoryRepository, Resolution};
pub use repositories::repair::{RepairRepository, TicketFilter, TicketScope};
pub use repositories::staff::StaffRepository;
pub use repositories::student::StudentRepository;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        // WAL is persisted in the database file, so one statement covers every pooled connection.
        if !in_memory {
            conn.execute_unprepared("PRAGMA journal_mode=WAL").await?;
        }

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.conn.begin().await
    }

    #[must_use]
    pub const fn accounts(&self) -> AccountRepository<'_, DatabaseConnection> {
        AccountRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn dormitories(&self) -> DormitoryRepository<'_, DatabaseConnection> {
        DormitoryRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn students(&self) -> StudentRepository<'_, DatabaseConnection> {
        StudentRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn staff(&self) -> StaffRepository<'_, DatabaseConnection> {
        StaffRepository::new(&self.conn)
    }

    #[must_use]
    pub const fn repairs(&self) -> RepairRepository<'_, DatabaseConnection> {
        RepairRepository::new(&self.conn)
    }
}

/// True when the store rejected a write because of a unique index.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Same as [`is_unique_violation`] for errors that went through `anyhow`.
#[must_use]
pub fn caused_by_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DbErr>().is_some_and(is_unique_violation)
}
