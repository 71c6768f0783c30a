use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::dormitory::DormitoryDefaults;
use crate::domain::ticket::TransitionPolicy;
use crate::entities::accounts::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub housing: HousingConfig,

    pub repairs: RepairConfig,

    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Directory that receives finalized ticket images
    pub uploads_path: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/dormkeep.db".to_string(),
            log_level: "info".to_string(),
            uploads_path: "uploads".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    pub session_inactivity_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            cors_allowed_origins: vec![
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
            secure_cookies: true,
            session_inactivity_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    /// Applies to registration and custom password resets
    pub min_password_length: usize,

    /// Password set when a reset is completed with `use_default`
    pub default_reset_password: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 6,
            default_reset_password: "123456".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HousingConfig {
    /// Attributes given to a dormitory created implicitly by registration,
    /// profile update or ticket submission.
    pub placeholder_room_type: String,

    pub placeholder_capacity: i32,

    pub placeholder_status: String,

    pub default_major: String,

    pub default_gender: String,

    /// Initial password for students added by an administrator
    pub admin_default_password: String,
}

impl Default for HousingConfig {
    fn default() -> Self {
        Self {
            placeholder_room_type: "未指定".to_string(),
            placeholder_capacity: 0,
            placeholder_status: "良好".to_string(),
            default_major: "待定".to_string(),
            default_gender: "待定".to_string(),
            admin_default_password: "123456".to_string(),
        }
    }
}

impl HousingConfig {
    #[must_use]
    pub fn placeholder(&self) -> DormitoryDefaults {
        DormitoryDefaults {
            room_type: self.placeholder_room_type.clone(),
            capacity: self.placeholder_capacity,
            status: self.placeholder_status.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub transition_policy: TransitionPolicy,

    pub max_image_bytes: usize,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            transition_policy: TransitionPolicy::Strict,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub enabled: bool,

    pub dormitory: SeedDormitory,

    pub accounts: Vec<SeedAccount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDormitory {
    pub building: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: i32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    pub username: String,

    pub name: String,

    pub password: String,

    pub role: Role,

    /// Alternate name accepted by the password reset challenge for this username
    #[serde(default)]
    pub recovery_alias: Option<String>,

    #[serde(default)]
    pub student_number: Option<String>,

    #[serde(default)]
    pub major: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub staff_number: Option<String>,

    #[serde(default)]
    pub assign_seed_dormitory: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dormitory: SeedDormitory {
                building: "1号楼".to_string(),
                room_number: "101".to_string(),
                room_type: "4人间".to_string(),
                capacity: 4,
                status: "良好".to_string(),
            },
            accounts: vec![
                SeedAccount {
                    username: "admin".to_string(),
                    name: "系统管理员".to_string(),
                    password: "admin123".to_string(),
                    role: Role::Admin,
                    recovery_alias: Some("admin".to_string()),
                    student_number: None,
                    major: None,
                    gender: None,
                    staff_number: None,
                    assign_seed_dormitory: false,
                },
                SeedAccount {
                    username: "student".to_string(),
                    name: "张三".to_string(),
                    password: "student123".to_string(),
                    role: Role::Student,
                    recovery_alias: Some("student".to_string()),
                    student_number: Some("2024001".to_string()),
                    major: Some("计算机科学与技术".to_string()),
                    gender: Some("男".to_string()),
                    staff_number: None,
                    assign_seed_dormitory: true,
                },
                SeedAccount {
                    username: "staff1".to_string(),
                    name: "李师傅".to_string(),
                    password: "staff123".to_string(),
                    role: Role::Staff,
                    recovery_alias: Some("staff".to_string()),
                    student_number: None,
                    major: None,
                    gender: None,
                    staff_number: Some("S2024001".to_string()),
                    assign_seed_dormitory: false,
                },
            ],
        }
    }
}

impl SeedConfig {
    /// Seed account whose configured recovery alias matches the challenge.
    #[must_use]
    pub fn find_by_alias(&self, username: &str, alias: &str) -> Option<&SeedAccount> {
        self.accounts
            .iter()
            .find(|a| a.username == username && a.recovery_alias.as_deref() == Some(alias))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
            housing: HousingConfig::default(),
            repairs: RepairConfig::default(),
            seed: SeedConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("dormkeep").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".dormkeep").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.trim().is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.security.min_password_length == 0 {
            anyhow::bail!("Minimum password length must be at least 1");
        }

        if self.housing.placeholder_capacity < 0 {
            anyhow::bail!("Placeholder dormitory capacity cannot be negative");
        }

        let mut seen = HashSet::new();
        for account in &self.seed.accounts {
            if account.username.trim().is_empty() {
                anyhow::bail!("Seed account username cannot be empty");
            }
            if !seen.insert(account.username.as_str()) {
                anyhow::bail!("Duplicate seed account username: {}", account.username);
            }
        }

        Ok(())
    }
}
