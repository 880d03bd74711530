use bcrypt::{hash, verify, DEFAULT_COST};
use retouch_common::AppError;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String, AppError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(format!("Failed to verify password: {}", e)))
    }

    pub fn validate_password_strength(password: &str) -> Result<(), AppError> {
        if password.chars().count() < 8 {
            return Err(AppError::Validation("Password must be at least 8 characters long".to_string()));
        }

        if !password.chars().any(|c| c.is_alphabetic()) {
            return Err(AppError::Validation("Password must contain at least one letter".to_string()));
        }

        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation("Password must contain at least one digit".to_string()));
        }

        Ok(())
    }
}
