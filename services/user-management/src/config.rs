use retouch_common::{env_or, AppError, DatabaseConfig, JwtConfig, ServerConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub account: AccountConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// How long a reset code and the verification it grants stay valid.
    pub otp_expiry_minutes: i64,
    /// Wrong guesses allowed before a reset code is burned.
    pub otp_max_attempts: i32,
    /// A user counts as online when seen within this window.
    pub online_window_minutes: i64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            otp_expiry_minutes: 15,
            otp_max_attempts: 5,
            online_window_minutes: 5,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = AccountConfig::default();

        Ok(Self {
            server: ServerConfig::from_env(8001),
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env(),
            account: AccountConfig {
                otp_expiry_minutes: env_or("OTP_EXPIRY_MINUTES", "15")
                    .parse()
                    .unwrap_or(defaults.otp_expiry_minutes),
                otp_max_attempts: env_or("OTP_MAX_ATTEMPTS", "5")
                    .parse()
                    .unwrap_or(defaults.otp_max_attempts),
                online_window_minutes: env_or("ONLINE_WINDOW_MINUTES", "5")
                    .parse()
                    .unwrap_or(defaults.online_window_minutes),
            },
        })
    }
}
