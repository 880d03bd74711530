use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use retouch_common::*;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
    pub is_blocked: bool,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub otp: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub otp_attempts: i32,
    #[serde(skip_serializing)]
    pub reset_verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub fcm_token: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub user_id: Option<Uuid>,
    pub user_2_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub is_deleted_by_admin: bool,
    pub hidden_by_user: bool,
    pub hidden_by_user_2: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id) || self.user_2_id == Some(user_id)
    }

    /// The participant on the other side of `sender_id`.
    pub fn receiver_for(&self, sender_id: Uuid) -> Option<Uuid> {
        if self.user_id == Some(sender_id) {
            self.user_2_id
        } else {
            self.user_id
        }
    }

    /// Whether `user_id` has hidden this chat from their own list.
    pub fn is_hidden_for(&self, user_id: Uuid) -> bool {
        if self.user_id == Some(user_id) {
            self.hidden_by_user
        } else if self.user_2_id == Some(user_id) {
            self.hidden_by_user_2
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub message: Option<String>,
    pub file: Option<String>,
    pub duration: Option<i32>,
    pub order_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    pub is_forwarded: bool,
    pub original_id: Option<Uuid>,
    pub reply_to_id: Option<Uuid>,
    pub reply_preview: Option<String>,
    pub is_read: bool,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub chat_id: Option<Uuid>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub no_of_photos: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    pub service_type: String,
    pub txn: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub service_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Questionnaire {
    pub id: Uuid,
    pub title: String,
    pub icon: Option<String>,
    pub color: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionnaireQuestion {
    pub id: Uuid,
    pub questionnaire_id: Uuid,
    pub question_type: QuestionType,
    pub label: Option<String>,
    pub options: Option<serde_json::Value>,
    pub state_key: String,
    pub sort_order: i32,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionnaireAnswer {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub answers: serde_json::Value,
    pub completed_sections: i32,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuickReply {
    pub id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemNotification {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub recipient_type: RecipientType,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
