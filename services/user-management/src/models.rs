use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use retouch_common::{RecipientType, UserRole};
use retouch_database::{SystemNotification, User};

// Request/Response DTOs
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub is_verified: bool,
    pub is_blocked: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            phone: user.phone,
            profile_picture: user.profile_picture,
            is_verified: user.is_verified,
            is_blocked: user.is_blocked,
            last_seen_at: user.last_seen_at,
            created_at: user.created_at,
        }
    }
}

// Password reset
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ForgetPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 4, max = 4))]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

// Profile
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct EditProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    #[validate(length(max = 2048))]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct FcmTokenRequest {
    #[validate(length(min = 1, max = 512))]
    pub fcm_token: String,
}

// Presence
#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineStatus {
    pub user_id: Uuid,
    pub is_online: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_seen: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct BulkOnlineStatusRequest {
    #[validate(length(min = 1, max = 200))]
    pub user_ids: Vec<Uuid>,
}

// Notifications
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationCount {
    pub unread: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SendNotificationRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(min = 1, max = 5000))]
    pub content: String,

    pub recipient_type: RecipientType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SentNotification {
    pub notification: SystemNotification,
    pub recipients: u64,
}

// Admin: users
#[derive(Debug, Deserialize)]
pub struct AdminUserQuery {
    pub role: Option<UserRole>,
    pub is_blocked: Option<bool>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserDetail {
    pub user: UserInfo,
    pub chat_count: i64,
    pub order_count: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    pub role: Option<UserRole>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 30))]
    pub phone: Option<String>,

    pub role: Option<UserRole>,
    pub is_verified: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateAdminRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(length(max = 30))]
    pub phone: Option<String>,
}
