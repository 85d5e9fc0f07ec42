/// Configuration management for Meeting Mirror
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub provider: ProviderConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Browser origin allowed by CORS
    pub frontend_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued session tokens, in seconds
    pub session_ttl_secs: i64,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
}

/// Meeting provider OAuth and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Callback URL registered with the provider
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Where the browser lands after a successful link
    pub post_link_redirect: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env_or("MIRROR_HOSTNAME", "127.0.0.1");
        let port = env_or("MIRROR_PORT", "8000")
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let frontend_url = env_or("URL_FRONTEND", "http://localhost:3000");

        let data_directory: PathBuf = env_or("MIRROR_DATA_DIRECTORY", "./data").into();
        let database = env::var("MIRROR_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("mirror.sqlite"));

        let jwt_secret = env::var("MIRROR_JWT_SECRET")
            .map_err(|_| AppError::Validation("JWT secret required".to_string()))?;
        let session_ttl_secs = env_parse("MIRROR_SESSION_TTL_SECS", 3600);
        let cookie_domain = env::var("MIRROR_COOKIE_DOMAIN").ok().filter(|d| !d.is_empty());
        let cookie_secure = env_parse("MIRROR_COOKIE_SECURE", false);

        let client_id = env::var("ZOOM_CLIENT_ID")
            .map_err(|_| AppError::Validation("ZOOM_CLIENT_ID required".to_string()))?;
        let client_secret = env::var("ZOOM_CLIENT_SECRET")
            .map_err(|_| AppError::Validation("ZOOM_CLIENT_SECRET required".to_string()))?;
        let redirect_uri = env_or("ZOOM_REDIRECT_URI", "http://localhost:8000/auth/callback");
        let authorize_url = env_or("ZOOM_AUTHORIZE_URL", "https://zoom.us/oauth/authorize");
        let token_url = env_or("ZOOM_TOKEN_URL", "https://zoom.us/oauth/token");
        let api_base_url = env_or("ZOOM_API_BASE_URL", "https://api.zoom.us/v2");
        let request_timeout_secs = env_parse("ZOOM_REQUEST_TIMEOUT_SECS", 15);
        let post_link_redirect = env_or("REDIRECT_FRONTEND", &frontend_url);

        let rate_limit = RateLimitSettings {
            enabled: env_parse("MIRROR_RATE_LIMITS_ENABLED", true),
            authenticated_rps: env_parse("MIRROR_RATE_LIMIT_AUTHENTICATED_RPS", 100),
            unauthenticated_rps: env_parse("MIRROR_RATE_LIMIT_UNAUTHENTICATED_RPS", 10),
            burst_size: env_parse("MIRROR_RATE_LIMIT_BURST", 50),
        };

        let log_level = env_or("RUST_LOG", "info");

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                frontend_url,
            },
            storage: StorageConfig {
                data_directory,
                database,
            },
            authentication: AuthConfig {
                jwt_secret,
                session_ttl_secs,
                cookie_domain,
                cookie_secure,
            },
            provider: ProviderConfig {
                client_id,
                client_secret,
                redirect_uri,
                authorize_url,
                token_url,
                api_base_url: api_base_url.trim_end_matches('/').to_string(),
                request_timeout_secs,
                post_link_redirect,
            },
            rate_limit,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.authentication.session_ttl_secs <= 0 {
            return Err(AppError::Validation(
                "Session TTL must be positive".to_string(),
            ));
        }

        if self.provider.client_id.is_empty() || self.provider.client_secret.is_empty() {
            return Err(AppError::Validation(
                "Provider client credentials cannot be empty".to_string(),
            ));
        }

        if self.provider.request_timeout_secs == 0 {
            return Err(AppError::Validation(
                "Provider request timeout must be at least one second".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_config(provider_base: &str) -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 0,
                frontend_url: "http://localhost:3000".to_string(),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("./data"),
                database: PathBuf::from("./data/mirror.sqlite"),
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-that-is-at-least-32-chars!!".to_string(),
                session_ttl_secs: 3600,
                cookie_domain: None,
                cookie_secure: false,
            },
            provider: ProviderConfig {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                redirect_uri: "http://localhost:8000/auth/callback".to_string(),
                authorize_url: format!("{}/oauth/authorize", provider_base),
                token_url: format!("{}/oauth/token", provider_base),
                api_base_url: format!("{}/v2", provider_base),
                request_timeout_secs: 5,
                post_link_redirect: "http://localhost:3000/dashboard".to_string(),
            },
            rate_limit: RateLimitSettings {
                enabled: false,
                authenticated_rps: 100,
                unauthenticated_rps: 10,
                burst_size: 50,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }

    #[test]
    fn test_validate_accepts_test_config() {
        assert!(test_config("http://localhost:9").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = test_config("http://localhost:9");
        config.authentication.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = test_config("http://localhost:9");
        config.provider.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
