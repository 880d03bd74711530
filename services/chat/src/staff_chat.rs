use sqlx::PgPool;
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::{AppError, ChatType, UserRole};
use retouch_database::Chat;

use crate::message_service::{user_summaries, MessageService};
use crate::models::{StaffChatView, StaffMember};

/// Two admins get an admin chat, any other pair of staff an agent chat.
pub fn staff_chat_type(a: UserRole, b: UserRole) -> ChatType {
    if a.is_admin() && b.is_admin() {
        ChatType::AdminAdmin
    } else {
        ChatType::AgentAgent
    }
}

/// Direct conversations between staff members.
#[derive(Clone)]
pub struct StaffChatService {
    db_pool: PgPool,
    messages: MessageService,
}

impl StaffChatService {
    pub fn new(db_pool: PgPool) -> Self {
        Self {
            messages: MessageService::new(db_pool.clone()),
            db_pool,
        }
    }

    /// Every other active staff account the caller can open a chat with.
    pub async fn list_staff(&self, caller: &Caller) -> Result<Vec<StaffMember>, AppError> {
        caller.require_staff()?;

        sqlx::query_as::<_, StaffMember>(
            r#"
            SELECT id, name, profile_picture, role FROM users
            WHERE role <> 'user' AND id <> $1 AND is_blocked = FALSE
            ORDER BY name, id
            "#,
        )
        .bind(caller.user_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Finds or creates the chat between the caller and another staff member.
    pub async fn open_chat(&self, caller: &Caller, other_id: Uuid) -> Result<StaffChatView, AppError> {
        caller.require_staff()?;
        if other_id == caller.user_id {
            return Err(AppError::Domain("You cannot open a chat with yourself".to_string()));
        }

        let other_role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
            .bind(other_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !other_role.is_staff() {
            return Err(AppError::Domain("Staff chats are only available between staff members".to_string()));
        }

        let chat_type = staff_chat_type(caller.role, other_role);

        let created = sqlx::query(
            r#"
            INSERT INTO chats (id, chat_type, user_id, user_2_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat_type)
        .bind(caller.user_id)
        .bind(other_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .rows_affected();

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            SELECT * FROM chats
            WHERE chat_type = $1
              AND ((user_id = $2 AND user_2_id = $3) OR (user_id = $3 AND user_2_id = $2))
            "#,
        )
        .bind(chat_type)
        .bind(caller.user_id)
        .bind(other_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Internal("Staff chat went missing after insert".to_string()))?;

        if created > 0 {
            tracing::info!("{:?} chat {} opened by {} with {}", chat_type, chat.id, caller.user_id, other_id);
        }

        let mut counterpart = user_summaries(&self.db_pool, &[other_id]).await?;
        let messages = self.messages.chat_messages(chat.id).await?;

        Ok(StaffChatView {
            counterpart: counterpart.remove(&other_id),
            chat,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_chat_type() {
        assert_eq!(staff_chat_type(UserRole::Admin, UserRole::Admin), ChatType::AdminAdmin);
        assert_eq!(staff_chat_type(UserRole::Admin, UserRole::Editor), ChatType::AgentAgent);
        assert_eq!(staff_chat_type(UserRole::Support, UserRole::ChiefEditor), ChatType::AgentAgent);
    }
}
