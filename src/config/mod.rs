use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::campaign::{PipelineConfig, RankingPolicy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub pipeline: PipelineSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let shortlist_size = env::var("CAMPAIGN_SHORTLIST_SIZE")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidShortlistSize)?;
        if shortlist_size == 0 {
            return Err(ConfigError::InvalidShortlistSize);
        }

        let rank_flagged = env::var("CAMPAIGN_RANK_FLAGGED")
            .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let stage_timeout_secs = env::var("CAMPAIGN_STAGE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidStageTimeout)?;
        if stage_timeout_secs == 0 {
            return Err(ConfigError::InvalidStageTimeout);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            pipeline: PipelineSettings {
                shortlist_size,
                rank_flagged,
                stage_timeout_secs,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Pipeline policy knobs the product deliberately left configurable: the
/// shortlist size, whether bias-flagged candidates may be ranked, and the
/// per-call collaborator budget.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub shortlist_size: usize,
    pub rank_flagged: bool,
    pub stage_timeout_secs: u64,
}

impl PipelineSettings {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            ranking: RankingPolicy {
                shortlist_size: self.shortlist_size,
                rank_flagged: self.rank_flagged,
            },
            stage_timeout: Duration::from_secs(self.stage_timeout_secs),
        }
    }
}

/// Error enumeration for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid TCP port")]
    InvalidPort,
    #[error("APP_HOST must be an IP address or 'localhost'")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("CAMPAIGN_SHORTLIST_SIZE must be a positive integer")]
    InvalidShortlistSize,
    #[error("CAMPAIGN_STAGE_TIMEOUT_SECS must be a positive integer")]
    InvalidStageTimeout,
}
