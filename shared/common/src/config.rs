use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// `DATABASE_URL` wins over the discrete `DATABASE_*` variables.
    pub fn from_env() -> Result<Self, AppError> {
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", "10").parse().unwrap_or(10);

        if let Ok(url) = std::env::var("DATABASE_URL") {
            let mut config = Self::from_url(&url)?;
            config.max_connections = max_connections;
            return Ok(config);
        }

        Ok(Self {
            host: env_or("DATABASE_HOST", "localhost"),
            port: env_or("DATABASE_PORT", "5432").parse().unwrap_or(5432),
            username: env_or("DATABASE_USERNAME", "retouch_user"),
            password: env_or("DATABASE_PASSWORD", "retouch_password"),
            database: env_or("DATABASE_NAME", "retouch"),
            max_connections,
        })
    }

    pub fn from_url(database_url: &str) -> Result<Self, AppError> {
        let url = url::Url::parse(database_url)
            .map_err(|e| AppError::Internal(format!("Invalid database URL: {}", e)))?;

        Ok(Self {
            host: url.host_str().unwrap_or("localhost").to_string(),
            port: url.port().unwrap_or(5432),
            username: url.username().to_string(),
            password: url.password().unwrap_or("").to_string(),
            database: url.path().trim_start_matches('/').to_string(),
            max_connections: 10,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
    pub issuer: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env_or("JWT_SECRET", "dev-secret-key-change-in-production"),
            expiration_hours: env_or("JWT_EXPIRATION_HOURS", "24").parse().unwrap_or(24),
            issuer: env_or("JWT_ISSUER", "retouch"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env(default_port: u16) -> Self {
        Self {
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(default_port),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
