use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    /// Which backend family serves the matcher, object store and record
    /// store: `aws` in deployment, `memory` for local development and tests.
    pub backend: BackendKind,

    pub aws: AwsConfig,

    pub matcher: MatcherConfig,

    pub enrollment: EnrollmentConfig,

    pub maintenance: MaintenanceConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Aws,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,

    /// Number of tokio worker threads (default: 2). Set to 0 to use the
    /// number of CPU cores.
    pub worker_threads: usize,

    /// Directory where uploaded images are spooled before cleanup.
    pub upload_temp_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 2,
            upload_temp_dir: "uploads/tmp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local
    /// development without HTTPS.
    pub secure_cookies: bool,

    /// Sessions expire after this many minutes of inactivity.
    pub session_expiry_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_allowed_origins: vec![
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            secure_cookies: true,
            session_expiry_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region override; when absent the SDK's default provider chain decides.
    pub region: Option<String>,

    pub bucket: String,

    pub collection_id: String,

    pub users_table: String,

    pub logs_table: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: None,
            bucket: "face-auth-storage-bucket".to_string(),
            collection_id: "my-face-collection".to_string(),
            users_table: "face-users".to_string(),
            logs_table: "face-logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum similarity (percent) to accept a candidate as a match.
    pub similarity_threshold: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 85.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Opening balance written on every regular-user record.
    pub default_balance: Decimal,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            default_balance: Decimal::new(1_000_000, 2),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Spooled uploads older than this many minutes are deleted by cleanup.
    pub max_age_minutes: u64,

    /// Optional cron expression for automatic cleanup. When unset, cleanup
    /// only runs via the endpoint or the CLI.
    pub auto_cleanup_cron: Option<String>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 60,
            auto_cleanup_cron: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "facegate".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            backend: BackendKind::Aws,
            aws: AwsConfig::default(),
            matcher: MatcherConfig::default(),
            enrollment: EnrollmentConfig::default(),
            maintenance: MaintenanceConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Deployment-sensitive values can be supplied without a config file.
    pub fn apply_env_overrides(&mut self) {
        let string_var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(port) = string_var("FACEGATE_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(backend) = string_var("FACEGATE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "aws" => self.backend = BackendKind::Aws,
                "memory" => self.backend = BackendKind::Memory,
                other => info!("Ignoring unknown FACEGATE_BACKEND value: {other}"),
            }
        }
        if let Some(level) = string_var("FACEGATE_LOG_LEVEL") {
            self.general.log_level = level;
        }
        if let Some(region) = string_var("FACEGATE_AWS_REGION") {
            self.aws.region = Some(region);
        }
        if let Some(bucket) = string_var("FACEGATE_S3_BUCKET") {
            self.aws.bucket = bucket;
        }
        if let Some(collection) = string_var("FACEGATE_COLLECTION_ID") {
            self.aws.collection_id = collection;
        }
        if let Some(table) = string_var("FACEGATE_USERS_TABLE") {
            self.aws.users_table = table;
        }
        if let Some(table) = string_var("FACEGATE_LOGS_TABLE") {
            self.aws.logs_table = table;
        }
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
            paths.push(config_dir.join("facegate").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".facegate").join("config.toml"));
        }

        paths
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = PathBuf::from("config.toml");
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
        if !(0.0..=100.0).contains(&self.matcher.similarity_threshold) {
            anyhow::bail!("Similarity threshold must be between 0 and 100");
        }

        if self.server.session_expiry_minutes <= 0 {
            anyhow::bail!("Session expiry must be positive");
        }

        if self.enrollment.default_balance.is_sign_negative() {
            anyhow::bail!("Default balance cannot be negative");
        }

        if self.backend == BackendKind::Aws && self.aws.bucket.is_empty() {
            anyhow::bail!("S3 bucket cannot be empty with the aws backend");
        }

        Ok(())
    }
}
