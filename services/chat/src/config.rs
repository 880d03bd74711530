use retouch_common::{env_or, AppError, DatabaseConfig, JwtConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub payments: PaymentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    /// HMAC key shared with the payment provider. The webhook is disabled without it.
    pub webhook_secret: Option<String>,
    /// Lets the client mark its own order as paid through `/update-payment`.
    pub allow_client_confirmation: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            server: ServerConfig::from_env(8002),
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env(),
            payments: PaymentConfig {
                webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET")
                    .ok()
                    .filter(|s| !s.is_empty()),
                allow_client_confirmation: env_or("PAYMENT_ALLOW_CLIENT_CONFIRMATION", "true")
                    .parse()
                    .unwrap_or(true),
            },
        })
    }
}
