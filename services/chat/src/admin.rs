use sqlx::PgPool;
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::{AppError, MessageType, Paginated, PaginationQuery};
use retouch_database::{Message, Order};

use crate::access::fetch_chat;
use crate::message_service::{insert_message, user_summaries, MessageDraft, MessageService};
use crate::models::{
    AdminChatDetail, AdminChatQuery, AdminChatRow, AvailableChat, AvailableChatQuery, MessageView, NewOrderRequest,
    ShareToChatRequest,
};

/// `%term%` for ILIKE, with the pattern characters escaped.
fn name_pattern(search: Option<&str>) -> Option<String> {
    let term = search?.trim();
    if term.is_empty() {
        return None;
    }
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

/// What an admin posts into a chat when sharing: a copy of `original`, or a
/// plain text message.
pub fn share_draft(original: Option<&Message>, content: Option<&str>) -> Result<MessageDraft, AppError> {
    if let Some(original) = original {
        if original.is_deleted {
            return Err(AppError::Domain("Deleted messages cannot be shared".to_string()));
        }
        return Ok(MessageDraft::forwarded(original));
    }

    let text = content.map(str::trim).filter(|text| !text.is_empty()).ok_or_else(|| {
        AppError::Validation("content: required when no message_id is given".to_string())
    })?;

    Ok(MessageDraft {
        message_type: MessageType::Text,
        message: Some(text.to_string()),
        file: None,
        duration: None,
        order_id: None,
        form_id: None,
        is_forwarded: false,
        original_id: None,
    })
}

/// Most recently active chats a share can target.
pub const AVAILABLE_CHAT_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct AdminChatService {
    db_pool: PgPool,
    messages: MessageService,
}

impl AdminChatService {
    pub fn new(db_pool: PgPool) -> Self {
        Self {
            messages: MessageService::new(db_pool.clone()),
            db_pool,
        }
    }

    pub async fn list_chats(&self, query: AdminChatQuery) -> Result<Paginated<AdminChatRow>, AppError> {
        let page = PaginationQuery::new(query.page, query.per_page);
        let chat_type = query.chat_type;

        let rows = sqlx::query_as::<_, AdminChatRow>(
            r#"
            SELECT c.*,
                   u1.name AS user_name,
                   u2.name AS user_2_name,
                   (SELECT COUNT(*) FROM messages m WHERE m.chat_id = c.id) AS message_count
            FROM chats c
            LEFT JOIN users u1 ON u1.id = c.user_id
            LEFT JOIN users u2 ON u2.id = c.user_2_id
            WHERE c.is_deleted_by_admin = FALSE
              AND ($1::text IS NULL OR c.chat_type = $1)
            ORDER BY c.updated_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(chat_type)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM chats
            WHERE is_deleted_by_admin = FALSE AND ($1::text IS NULL OR chat_type = $1)
            "#,
        )
        .bind(chat_type)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Paginated::new(rows, &page, total))
    }

    /// Full chat for moderation. Read state is left untouched.
    pub async fn show_chat(&self, chat_id: Uuid) -> Result<AdminChatDetail, AppError> {
        let chat = fetch_chat(&self.db_pool, chat_id).await?;

        let participant_ids: Vec<Uuid> = [chat.user_id, chat.user_2_id].into_iter().flatten().collect();
        let users = user_summaries(&self.db_pool, &participant_ids).await?;

        let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE chat_id = $1 ORDER BY created_at DESC")
            .bind(chat.id)
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        let messages = self.messages.chat_messages(chat.id).await?;

        Ok(AdminChatDetail {
            user: chat.user_id.and_then(|id| users.get(&id).cloned()),
            user_2: chat.user_2_id.and_then(|id| users.get(&id).cloned()),
            chat,
            orders,
            messages,
        })
    }

    pub async fn delete_chat(&self, chat_id: Uuid) -> Result<(), AppError> {
        let updated = sqlx::query(
            "UPDATE chats SET is_deleted_by_admin = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(chat_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("Chat not found".to_string()));
        }
        tracing::info!("Chat {} hidden by admin", chat_id);
        Ok(())
    }

    pub async fn available_chats(&self, query: AvailableChatQuery) -> Result<Vec<AvailableChat>, AppError> {
        let search = name_pattern(query.search.as_deref());

        sqlx::query_as::<_, AvailableChat>(
            r#"
            SELECT c.id, c.chat_type,
                   c.user_id, u1.name AS user_name, u1.profile_picture AS user_picture,
                   c.user_2_id, u2.name AS user_2_name,
                   sender.name AS last_sender_name,
                   lm.created_at AS last_message_at
            FROM chats c
            LEFT JOIN users u1 ON u1.id = c.user_id
            LEFT JOIN users u2 ON u2.id = c.user_2_id
            LEFT JOIN LATERAL (
                SELECT sender_id, created_at FROM messages
                WHERE chat_id = c.id ORDER BY created_at DESC LIMIT 1
            ) lm ON TRUE
            LEFT JOIN users sender ON sender.id = lm.sender_id
            WHERE c.is_deleted_by_admin = FALSE
              AND ($1::text IS NULL OR u1.name ILIKE $1 OR u2.name ILIKE $1)
            ORDER BY c.updated_at DESC
            LIMIT $2
            "#,
        )
        .bind(&search)
        .bind(AVAILABLE_CHAT_LIMIT)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    /// Posts into `to_chat_id` as the admin, either forwarding a message of
    /// `from_chat_id` or sending the given text.
    pub async fn share_to_chat(&self, admin: &Caller, request: ShareToChatRequest) -> Result<MessageView, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        fetch_chat(&mut *tx, request.from_chat_id).await?;
        let to_chat = fetch_chat(&mut *tx, request.to_chat_id).await?;

        let original = match request.message_id {
            Some(message_id) => Some(
                sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1 AND chat_id = $2")
                    .bind(message_id)
                    .bind(request.from_chat_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(AppError::Database)?
                    .ok_or_else(|| AppError::NotFound("Message not found in the source chat".to_string()))?,
            ),
            None => None,
        };

        let draft = share_draft(original.as_ref(), request.content.as_deref())?;
        let message = insert_message(&mut tx, &to_chat, admin.user_id, &draft, None, None).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Admin {} shared into chat {} from chat {}",
            admin.user_id, to_chat.id, request.from_chat_id
        );
        self.messages.render_one(message).await
    }

    /// Opens a new pending order in an existing chat.
    pub async fn new_order(&self, chat_id: Uuid, request: NewOrderRequest) -> Result<Order, AppError> {
        let chat = fetch_chat(&self.db_pool, chat_id).await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, user_id, agent_id, chat_id, service_type, total_amount)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat.user_id)
        .bind(chat.agent_id)
        .bind(chat.id)
        .bind(request.service_type.trim())
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "A pending order for this service already exists"))?;

        tracing::info!("Order {} ({}) opened in chat {}", order.id, order.service_type, chat.id);
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(is_deleted: bool) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: None,
            message_type: MessageType::Image,
            message: Some("before / after".to_string()),
            file: Some("uploads/after.jpg".to_string()),
            duration: None,
            order_id: None,
            form_id: None,
            is_forwarded: false,
            original_id: None,
            reply_to_id: None,
            reply_preview: None,
            is_read: false,
            is_deleted,
            is_edited: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_share_forwards_the_original() {
        let original = message(false);
        let draft = share_draft(Some(&original), Some("ignored")).unwrap();

        assert!(draft.is_forwarded);
        assert_eq!(draft.original_id, Some(original.id));
        assert_eq!(draft.file, original.file);
    }

    #[test]
    fn test_share_text_needs_content() {
        let draft = share_draft(None, Some("  Look at this edit ")).unwrap();
        assert_eq!(draft.message_type, MessageType::Text);
        assert_eq!(draft.message.as_deref(), Some("Look at this edit"));
        assert!(!draft.is_forwarded);

        assert!(matches!(share_draft(None, Some("   ")), Err(AppError::Validation(_))));
        assert!(matches!(share_draft(None, None), Err(AppError::Validation(_))));
        assert!(matches!(share_draft(Some(&message(true)), None), Err(AppError::Domain(_))));
    }

    #[test]
    fn test_name_pattern_escapes_wildcards() {
        assert_eq!(name_pattern(Some("  ")), None);
        assert_eq!(name_pattern(Some("an_na")).as_deref(), Some("%an\\_na%"));
    }
}
