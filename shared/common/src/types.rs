use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
    Support,
    Editor,
    ChiefEditor,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Support => "support",
            UserRole::Editor => "editor",
            UserRole::ChiefEditor => "chief_editor",
        }
    }

    /// Every non-customer account counts as staff.
    pub fn is_staff(&self) -> bool {
        !matches!(self, UserRole::User)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
pub enum ChatType {
    UserAgent,
    AdminAdmin,
    AgentAgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
    Voice,
    Order,
    Form,
    Questionnaire,
    Payment,
    Video,
}

impl MessageType {
    /// Media messages carry their payload in `file`.
    pub fn requires_file(&self) -> bool {
        matches!(
            self,
            MessageType::Image | MessageType::File | MessageType::Voice | MessageType::Video
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Success => "success",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Success | OrderStatus::Failed)
    }

    /// Re-applying the current status is allowed and changes nothing.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            OrderStatus::Pending => true,
            OrderStatus::Processing => next.is_terminal(),
            OrderStatus::Success | OrderStatus::Failed => false,
        }
    }

    pub fn check_transition(&self, next: OrderStatus) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Order status cannot change from {} to {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Initialized,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Initialized => "initialized",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    /// unpaid -> initialized -> {success, failed}
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (PaymentStatus::Unpaid, PaymentStatus::Initialized)
                | (PaymentStatus::Initialized, PaymentStatus::Success)
                | (PaymentStatus::Initialized, PaymentStatus::Failed)
        )
    }

    pub fn check_transition(&self, next: PaymentStatus) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "Payment status cannot change from {} to {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        *self == next || matches!(self, TransactionStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "camelCase")]
#[sqlx(type_name = "text", rename_all = "camelCase")]
pub enum QuestionType {
    Select,
    Toggle,
    RadioGroup,
    Textarea,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Select,
        QuestionType::Toggle,
        QuestionType::RadioGroup,
        QuestionType::Textarea,
    ];

    /// Choice questions need a non-empty option list.
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::Select | QuestionType::RadioGroup)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum RecipientType {
    All,
    Users,
    Agents,
}

// API Response types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: "Request successful".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            status: ResponseStatus::Error,
            message,
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PaginationQuery {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, query: &PaginationQuery, total: i64) -> Self {
        Self {
            items,
            page: query.page(),
            per_page: query.per_page(),
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_transitions() {
        use PaymentStatus::*;

        assert!(Unpaid.can_transition_to(Initialized));
        assert!(Initialized.can_transition_to(Success));
        assert!(Initialized.can_transition_to(Failed));
        assert!(Success.can_transition_to(Success));

        assert!(!Unpaid.can_transition_to(Success));
        assert!(!Success.can_transition_to(Initialized));
        assert!(!Failed.can_transition_to(Success));
        assert!(Unpaid.check_transition(Failed).is_err());
    }

    #[test]
    fn test_order_status_terminal_states() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Success));
        assert!(Processing.can_transition_to(Failed));
        assert!(!Processing.can_transition_to(Pending));
        assert!(!Success.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Success));
        assert!(Success.check_transition(Success).is_ok());
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&ChatType::UserAgent).unwrap(), "\"user-agent\"");
        assert_eq!(serde_json::to_string(&QuestionType::RadioGroup).unwrap(), "\"radioGroup\"");
        assert_eq!(serde_json::to_string(&UserRole::ChiefEditor).unwrap(), "\"chief_editor\"");
        assert!(UserRole::Editor.is_staff());
        assert!(!UserRole::User.is_staff());
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::success(5).with_message("Done")).unwrap();
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Done");
        assert_eq!(body["data"], 5);

        let body = serde_json::to_value(ApiResponse::<()>::error("nope".into())).unwrap();
        assert_eq!(body["status"], "error");
        assert!(body["data"].is_null());
    }

    #[test]
    fn test_pagination_bounds() {
        let query = PaginationQuery::new(Some(0), Some(500));
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), 100);
        assert_eq!(query.offset(), 0);

        let query = PaginationQuery::new(Some(3), None);
        assert_eq!(query.offset(), 40);
    }
}
