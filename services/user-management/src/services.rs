use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use retouch_auth::{Caller, JwtService, OtpService, PasswordService};
use retouch_common::{AppError, UserRole};
use retouch_database::User;

use crate::config::AccountConfig;
use crate::models::*;
use crate::AppState;

/// Seen within `window_minutes` of `now`.
pub fn is_online(last_seen_at: Option<DateTime<Utc>>, now: DateTime<Utc>, window_minutes: i64) -> bool {
    match last_seen_at {
        Some(seen) => seen > now - Duration::minutes(window_minutes),
        None => false,
    }
}

pub fn humanize_last_seen(last_seen_at: Option<DateTime<Utc>>, now: DateTime<Utc>, window_minutes: i64) -> String {
    let Some(seen) = last_seen_at else {
        return "Never".to_string();
    };
    if is_online(last_seen_at, now, window_minutes) {
        return "Online".to_string();
    }

    let elapsed = now.signed_duration_since(seen);
    let (amount, unit) = if elapsed.num_minutes() < 60 {
        (elapsed.num_minutes(), "minute")
    } else if elapsed.num_hours() < 24 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_days() < 7 {
        (elapsed.num_days(), "day")
    } else if elapsed.num_days() < 30 {
        (elapsed.num_weeks(), "week")
    } else if elapsed.num_days() < 365 {
        (elapsed.num_days() / 30, "month")
    } else {
        (elapsed.num_days() / 365, "year")
    };

    let amount = amount.max(1);
    if amount == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", amount, unit)
    }
}

/// A code is discarded once the failed attempts reach the limit.
pub fn otp_exhausted(failed_attempts: i32, max_attempts: i32) -> bool {
    failed_attempts >= max_attempts.max(1)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService {
    db_pool: PgPool,
    jwt_service: JwtService,
    account: AccountConfig,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db_pool: state.db_pool.clone(),
            jwt_service: state.jwt_service.clone(),
            account: state.config.account.clone(),
        }
    }

    // User Registration
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        PasswordService::validate_password_strength(&request.password)?;

        let user = create_account(
            &self.db_pool,
            NewAccount {
                name: &request.name,
                email: &request.email,
                password: &request.password,
                phone: request.phone.as_deref(),
                role: UserRole::User,
            },
        )
        .await?;

        tracing::info!("User registered: {} ({})", user.name, user.email);
        self.auth_response(user)
    }

    // User Login
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(&request.email))
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !PasswordService::verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        if user.is_blocked {
            return Err(AppError::Authorization("Your account has been blocked".to_string()));
        }

        let user = sqlx::query_as::<_, User>("UPDATE users SET last_seen_at = NOW() WHERE id = $1 RETURNING *")
            .bind(user.id)
            .fetch_one(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        tracing::info!("User logged in: {}", user.email);
        self.auth_response(user)
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse, AppError> {
        let (token, expires_at) = self.jwt_service.issue(user.id, &user.email, user.role)?;
        Ok(AuthResponse {
            token,
            user: UserInfo::from(user),
            expires_at,
        })
    }

    // Password reset
    pub async fn forget_password(&self, request: ForgetPasswordRequest) -> Result<(), AppError> {
        let email = normalize_email(&request.email);
        let otp = OtpService::generate();
        let expires_at = Utc::now() + Duration::minutes(self.account.otp_expiry_minutes);

        let updated = sqlx::query(
            r#"
            UPDATE users SET otp = $2, otp_expires_at = $3, otp_attempts = 0, reset_verified_at = NULL,
                updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(&email)
        .bind(&otp)
        .bind(expires_at)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("No account found with this email".to_string()));
        }

        // No mail transport yet, the code only reaches the debug log.
        tracing::info!("Password reset code issued for {}", email);
        tracing::debug!("Reset code for {}: {}", email, otp);
        Ok(())
    }

    /// Checks a reset code. Every wrong guess counts against the code, and
    /// once `otp_max_attempts` is reached the code is discarded.
    pub async fn verify_code(&self, request: VerifyCodeRequest) -> Result<(), AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 FOR UPDATE")
            .bind(normalize_email(&request.email))
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("No account found with this email".to_string()))?;

        if !OtpService::verify(user.otp.as_deref(), user.otp_expires_at, &request.otp, Utc::now()) {
            if user.otp.is_some() {
                let burned = otp_exhausted(user.otp_attempts + 1, self.account.otp_max_attempts);
                sqlx::query(
                    r#"
                    UPDATE users SET
                        otp_attempts = otp_attempts + 1,
                        otp = CASE WHEN $2 THEN NULL ELSE otp END,
                        otp_expires_at = CASE WHEN $2 THEN NULL ELSE otp_expires_at END,
                        updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(user.id)
                .bind(burned)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;

                if burned {
                    tracing::warn!(
                        "Reset code for {} discarded after {} failed attempts",
                        user.email,
                        user.otp_attempts + 1
                    );
                }
            }
            tx.commit().await.map_err(AppError::Database)?;
            return Err(AppError::Validation("Invalid OTP".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE users SET otp = NULL, otp_expires_at = NULL, otp_attempts = 0, reset_verified_at = NOW(),
                is_verified = TRUE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn change_password(&self, request: ChangePasswordRequest) -> Result<(), AppError> {
        PasswordService::validate_password_strength(&request.password)?;
        let user = self.find_by_email(&request.email).await?;

        let window_start = Utc::now() - Duration::minutes(self.account.otp_expiry_minutes);
        match user.reset_verified_at {
            Some(verified_at) if verified_at > window_start => {}
            _ => {
                return Err(AppError::Authorization(
                    "Verify the reset code before changing the password".to_string(),
                ))
            }
        }

        let password_hash = PasswordService::hash_password(&request.password)?;
        sqlx::query(
            "UPDATE users SET password_hash = $2, reset_verified_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(user.id)
        .bind(password_hash)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Password changed for {}", user.email);
        Ok(())
    }

    // Profile
    pub async fn me(&self, caller: &Caller) -> Result<UserInfo, AppError> {
        find_user(&self.db_pool, caller.user_id).await.map(UserInfo::from)
    }

    pub async fn edit_profile(&self, caller: &Caller, request: EditProfileRequest) -> Result<UserInfo, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                profile_picture = COALESCE($4, profile_picture),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(caller.user_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(&request.phone)
        .bind(&request.profile_picture)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .map(UserInfo::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn set_fcm_token(&self, caller: &Caller, request: FcmTokenRequest) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET fcm_token = $2, updated_at = NOW() WHERE id = $1")
            .bind(caller.user_id)
            .bind(request.fcm_token.trim())
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    // Presence
    pub async fn heartbeat(&self, caller: &Caller) -> Result<OnlineStatus, AppError> {
        let seen = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "UPDATE users SET last_seen_at = NOW() WHERE id = $1 RETURNING last_seen_at",
        )
        .bind(caller.user_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(self.status_of(caller.user_id, seen, Utc::now()))
    }

    pub async fn online_status(&self, user_id: Uuid) -> Result<OnlineStatus, AppError> {
        let user = find_user(&self.db_pool, user_id).await?;
        Ok(self.status_of(user.id, user.last_seen_at, Utc::now()))
    }

    /// Unknown ids are left out of the result.
    pub async fn bulk_online_status(&self, user_ids: &[Uuid]) -> Result<Vec<OnlineStatus>, AppError> {
        let rows = sqlx::query_as::<_, (Uuid, Option<DateTime<Utc>>)>(
            "SELECT id, last_seen_at FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let now = Utc::now();
        Ok(rows
            .into_iter()
            .map(|(id, seen)| self.status_of(id, seen, now))
            .collect())
    }

    fn status_of(&self, user_id: Uuid, last_seen_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> OnlineStatus {
        let window = self.account.online_window_minutes;
        OnlineStatus {
            user_id,
            is_online: is_online(last_seen_at, now, window),
            last_seen_at,
            last_seen: humanize_last_seen(last_seen_at, now, window),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(normalize_email(email))
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("No account found with this email".to_string()))
    }
}

pub(crate) struct NewAccount<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone: Option<&'a str>,
    pub role: UserRole,
}

/// Inserts an account. A taken email is reported as a conflict.
pub(crate) async fn create_account(db_pool: &PgPool, account: NewAccount<'_>) -> Result<User, AppError> {
    let password_hash = PasswordService::hash_password(account.password)?;

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account.name.trim())
    .bind(normalize_email(account.email))
    .bind(password_hash)
    .bind(account.role)
    .bind(account.phone)
    .fetch_one(db_pool)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "An account with this email already exists"))
}

pub(crate) async fn find_user(db_pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_window() {
        let now = Utc::now();
        assert!(is_online(Some(now - Duration::minutes(4)), now, 5));
        assert!(!is_online(Some(now - Duration::minutes(6)), now, 5));
        assert!(!is_online(None, now, 5));
    }

    #[test]
    fn test_humanize_last_seen() {
        let now = Utc::now();
        assert_eq!(humanize_last_seen(None, now, 5), "Never");
        assert_eq!(humanize_last_seen(Some(now - Duration::minutes(2)), now, 5), "Online");
        assert_eq!(humanize_last_seen(Some(now - Duration::minutes(10)), now, 5), "10 minutes ago");
        assert_eq!(humanize_last_seen(Some(now - Duration::minutes(61)), now, 5), "1 hour ago");
        assert_eq!(humanize_last_seen(Some(now - Duration::days(3)), now, 5), "3 days ago");
        assert_eq!(humanize_last_seen(Some(now - Duration::days(15)), now, 5), "2 weeks ago");
        assert_eq!(humanize_last_seen(Some(now - Duration::days(400)), now, 5), "1 year ago");
    }

    #[test]
    fn test_otp_exhausted_at_limit() {
        assert!(!otp_exhausted(4, 5));
        assert!(otp_exhausted(5, 5));
        assert!(otp_exhausted(1, 0));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Editor@Retouch.App "), "editor@retouch.app");
    }
}
