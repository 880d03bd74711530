use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use retouch_common::{
    ChatType, MessageType, OrderStatus, PaymentStatus, QuestionType, TransactionStatus, UserRole,
};
use retouch_database::{Chat, Message, Order, Questionnaire, QuestionnaireAnswer, QuestionnaireQuestion};

// Shared views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub status: OrderStatus,
    pub amount: Decimal,
    pub service_type: String,
    pub payment_status: PaymentStatus,
    pub delivery_date: Option<NaiveDate>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            amount: order.total_amount,
            service_type: order.service_type.clone(),
            payment_status: order.payment_status,
            delivery_date: order.delivery_date,
        }
    }
}

// Agent assignment
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AssignAgentRequest {
    #[validate(length(min = 1, max = 100))]
    pub service_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignedMessage {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub message: Option<String>,
    pub file: Option<String>,
    pub sender_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for AssignedMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            message_type: message.message_type,
            message: visible(message, &message.message),
            file: visible(message, &message.file),
            sender_id: message.sender_id,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignedAgentView {
    pub chat_id: Uuid,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub user: Option<UserSummary>,
    pub agent: Option<UserSummary>,
    pub messages: Vec<AssignedMessage>,
    pub order: Option<OrderSummary>,
}

// Messaging
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    #[serde(rename = "type")]
    pub message_type: Option<MessageType>,
    #[validate(length(max = 5000))]
    pub message: Option<String>,
    #[validate(length(max = 2048))]
    pub file: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i32>,
    pub order_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    pub reply_to_id: Option<Uuid>,
    pub original_id: Option<Uuid>,
    pub is_forwarded: Option<bool>,
}

impl SendMessageRequest {
    pub fn is_forward(&self) -> bool {
        self.is_forwarded.unwrap_or(false) || self.original_id.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ForwardMessageRequest {
    pub original_id: Uuid,
    pub chat_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}

/// A reply or forward target as shown alongside the message that points at it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferencedMessage {
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub message_type: Option<MessageType>,
    pub message: Option<String>,
    pub file: Option<String>,
    pub is_deleted: bool,
}

impl ReferencedMessage {
    pub const DELETED_TEXT: &'static str = "original message deleted";

    pub fn from_message(message: &Message) -> Self {
        if message.is_deleted {
            return Self::deleted(Some(message.id));
        }
        Self {
            id: Some(message.id),
            message_type: Some(message.message_type),
            message: message.message.clone(),
            file: message.file.clone(),
            is_deleted: false,
        }
    }

    pub fn deleted(id: Option<Uuid>) -> Self {
        Self {
            id,
            message_type: None,
            message: Some(Self::DELETED_TEXT.to_string()),
            file: None,
            is_deleted: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageView {
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
    pub original_message: Option<ReferencedMessage>,
    pub reply_to_id: Option<Uuid>,
    pub reply_preview: Option<String>,
    pub reply_to: Option<ReferencedMessage>,
    pub is_read: bool,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub sender: Option<UserSummary>,
    pub receiver: Option<UserSummary>,
    pub payment_order: Option<OrderSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatHistory {
    pub order: Option<Order>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, FromRow)]
pub struct ChatSummaryRow {
    pub id: Uuid,
    pub chat_type: ChatType,
    pub user_id: Option<Uuid>,
    pub user_2_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub category: Option<String>,
    pub order_status: Option<OrderStatus>,
    pub counterpart_id: Option<Uuid>,
    pub counterpart_name: Option<String>,
    pub counterpart_picture: Option<String>,
    pub last_message_id: Option<Uuid>,
    pub last_message_type: Option<MessageType>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LastMessage {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub user_id: Option<Uuid>,
    pub user_2_id: Option<Uuid>,
    pub agent_id: Option<Uuid>,
    pub category: Option<String>,
    pub status: Option<OrderStatus>,
    pub counterpart: Option<UserSummary>,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ChatSummaryRow> for ChatSummary {
    fn from(row: ChatSummaryRow) -> Self {
        let counterpart = match (row.counterpart_id, row.counterpart_name) {
            (Some(id), Some(name)) => Some(UserSummary {
                id,
                name,
                profile_picture: row.counterpart_picture,
            }),
            _ => None,
        };

        let last_message = match (row.last_message_id, row.last_message_type, row.last_message_at) {
            (Some(id), Some(message_type), Some(created_at)) => Some(LastMessage {
                id,
                message_type,
                message: row.last_message,
                created_at,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            chat_type: row.chat_type,
            user_id: row.user_id,
            user_2_id: row.user_2_id,
            agent_id: row.agent_id,
            category: row.category,
            status: row.order_status,
            counterpart,
            last_message,
            unread_count: row.unread_count,
            created_at: row.created_at,
        }
    }
}

// Staff conversations
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct StaffMember {
    pub id: Uuid,
    pub name: String,
    pub profile_picture: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct StaffChatView {
    pub chat: Chat,
    pub counterpart: Option<UserSummary>,
    pub messages: Vec<MessageView>,
}

// Quick replies
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QuickReplyRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
}

// Orders and payments
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub chat_id: Uuid,
    pub total_amount: Decimal,
    #[validate(range(min = 1, max = 10000))]
    pub no_of_photos: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    pub chat_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    pub chat_id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentWebhookPayload {
    pub order_id: Uuid,
    pub status: PaymentStatus,
    pub txn: Option<String>,
}

// Questionnaire
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(rename = "stateKey")]
    pub state_key: String,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    pub is_required: bool,
}

impl From<&QuestionnaireQuestion> for QuestionView {
    fn from(question: &QuestionnaireQuestion) -> Self {
        Self {
            id: question.id,
            question_type: question.question_type,
            state_key: question.state_key.clone(),
            order: question.sort_order,
            label: question.label.clone(),
            options: question.options.clone(),
            is_required: question.is_required,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub title: String,
    pub icon: Option<String>,
    pub color: String,
    pub description: Option<String>,
    pub order: i32,
    pub is_active: bool,
    pub questions: Vec<QuestionView>,
}

impl CategoryView {
    pub fn new(questionnaire: Questionnaire, questions: Vec<QuestionView>) -> Self {
        Self {
            id: questionnaire.id,
            title: questionnaire.title,
            icon: questionnaire.icon,
            color: questionnaire.color,
            description: questionnaire.description,
            order: questionnaire.sort_order,
            is_active: questionnaire.is_active,
            questions,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub answers: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressView {
    pub progress: i32,
    pub completed_sections: i32,
    pub answers: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnswersView {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub answers: serde_json::Value,
    pub progress: i32,
    pub completed_sections: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<QuestionnaireAnswer> for AnswersView {
    fn from(answer: QuestionnaireAnswer) -> Self {
        Self {
            chat_id: answer.chat_id,
            user_id: answer.user_id,
            answers: answer.answers,
            progress: answer.progress,
            completed_sections: answer.completed_sections,
            updated_at: answer.updated_at,
        }
    }
}

// Admin: chats
#[derive(Debug, Deserialize)]
pub struct AdminChatQuery {
    #[serde(rename = "type")]
    pub chat_type: Option<ChatType>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct AdminChatRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub chat: Chat,
    pub user_name: Option<String>,
    pub user_2_name: Option<String>,
    pub message_count: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminChatDetail {
    pub chat: Chat,
    pub user: Option<UserSummary>,
    pub user_2: Option<UserSummary>,
    pub orders: Vec<Order>,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct NewOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub service_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AvailableChatQuery {
    pub search: Option<String>,
}

/// A chat an admin can share into.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AvailableChat {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub user_picture: Option<String>,
    pub user_2_id: Option<Uuid>,
    pub user_2_name: Option<String>,
    pub last_sender_name: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Forwards `message_id` from `from_chat_id`, or posts `content` as text.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ShareToChatRequest {
    pub from_chat_id: Uuid,
    pub to_chat_id: Uuid,
    pub message_id: Option<Uuid>,
    #[validate(length(max = 5000))]
    pub content: Option<String>,
}

// Admin: orders and transactions
#[derive(Debug, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub service_type: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    pub total_amount: Option<Decimal>,
    #[validate(range(min = 1, max = 10000))]
    pub no_of_photos: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 100))]
    pub service_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderStatusPatch {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentStatusPatch {
    pub payment_status: PaymentStatus,
    pub txn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub status: Option<TransactionStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionStatusPatch {
    pub status: TransactionStatus,
}

// Admin: questionnaire management
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateQuestionnaireRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub color: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateQuestionnaireRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    pub color: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QuestionRequest {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[validate(length(max = 255))]
    pub label: Option<String>,
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 100))]
    pub state_key: String,
    #[validate(range(min = 0))]
    pub order: Option<i32>,
    pub is_required: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    #[validate(length(max = 255))]
    pub label: Option<String>,
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1, max = 100))]
    pub state_key: Option<String>,
    #[validate(range(min = 0))]
    pub order: Option<i32>,
    pub is_required: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReorderItem {
    pub id: Uuid,
    pub order: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReorderRequest {
    #[validate(length(min = 1))]
    pub items: Vec<ReorderItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionOrder {
    pub question_id: Uuid,
    pub order: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReorderQuestionsRequest {
    #[validate(length(min = 1))]
    pub question_orders: Vec<QuestionOrder>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionTypeInfo {
    pub value: QuestionType,
    pub label: String,
    pub has_options: bool,
}

/// Content of a soft-deleted message is never shown.
fn visible(message: &Message, field: &Option<String>) -> Option<String> {
    if message.is_deleted {
        None
    } else {
        field.clone()
    }
}
