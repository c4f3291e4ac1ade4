//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabsynth_common::ArtifactLayout;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://tabsynth.db";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 1;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Storage / Synthesis Constants
// ============================================================================

pub const DEFAULT_DATASET_DIR: &str = "./static/data";
pub const DEFAULT_SYNTHETIC_DIR: &str = "./static/synthetic";
pub const DEFAULT_PLOT_DIR: &str = "./static/plots";

/// Default upload size cap (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Default number of synthesis/evaluation jobs allowed to run at once.
pub const DEFAULT_WORKERS: usize = 2;

/// Default number of synthetic rows echoed back after generation.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub synthesis: SynthesisConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Where artifacts live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub dataset_dir: PathBuf,
    pub synthetic_dir: PathBuf,
    pub plot_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl StorageConfig {
    pub fn layout(&self) -> ArtifactLayout {
        ArtifactLayout::new(&self.dataset_dir, &self.synthetic_dir, &self.plot_dir)
    }
}

/// Synthesis worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub workers: usize,
    /// Fixed sampler seed; unset means fresh entropy per request.
    pub sampler_seed: Option<u64>,
    pub preview_rows: usize,
}

/// Credential hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("TABSYNTH_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("TABSYNTH_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "TABSYNTH_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            storage: StorageConfig {
                dataset_dir: env_or("TABSYNTH_DATASET_DIR", PathBuf::from(DEFAULT_DATASET_DIR)),
                synthetic_dir: env_or(
                    "TABSYNTH_SYNTHETIC_DIR",
                    PathBuf::from(DEFAULT_SYNTHETIC_DIR),
                ),
                plot_dir: env_or("TABSYNTH_PLOT_DIR", PathBuf::from(DEFAULT_PLOT_DIR)),
                max_upload_bytes: env_or("TABSYNTH_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            },
            synthesis: SynthesisConfig {
                workers: env_or("TABSYNTH_WORKERS", DEFAULT_WORKERS),
                sampler_seed: std::env::var("TABSYNTH_SAMPLER_SEED")
                    .ok()
                    .and_then(|s| s.parse().ok()),
                preview_rows: env_or("TABSYNTH_PREVIEW_ROWS", DEFAULT_PREVIEW_ROWS),
            },
            auth: AuthConfig {
                bcrypt_cost: env_or("TABSYNTH_BCRYPT_COST", bcrypt::DEFAULT_COST),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.synthesis.workers == 0 {
            anyhow::bail!("TABSYNTH_WORKERS must be greater than 0");
        }

        // bcrypt rejects anything outside this range at hash time
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            anyhow::bail!(
                "bcrypt cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            storage: StorageConfig {
                dataset_dir: PathBuf::from(DEFAULT_DATASET_DIR),
                synthetic_dir: PathBuf::from(DEFAULT_SYNTHETIC_DIR),
                plot_dir: PathBuf::from(DEFAULT_PLOT_DIR),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            synthesis: SynthesisConfig {
                workers: DEFAULT_WORKERS,
                sampler_seed: None,
                preview_rows: DEFAULT_PREVIEW_ROWS,
            },
            auth: AuthConfig {
                bcrypt_cost: bcrypt::DEFAULT_COST,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
        }
    }
}
