use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::{AppError, MessageType};
use retouch_database::{Chat, Message, Order};

use crate::access::{authorized_chat, ensure_chat_access, fetch_chat};
use crate::models::{
    ChatHistory, ChatSummary, ChatSummaryRow, EditMessageRequest, ForwardMessageRequest,
    MessageView, OrderSummary, ReferencedMessage, SendMessageRequest, UserSummary,
};

pub const REPLY_PREVIEW_LIMIT: usize = 80;

/// Preview cached on a reply, derived from the message being replied to.
pub fn reply_preview(parent_type: MessageType, parent_text: Option<&str>) -> String {
    match parent_type {
        MessageType::Text => limit_chars(&squish(parent_text.unwrap_or_default()), REPLY_PREVIEW_LIMIT),
        MessageType::Image => "📷 Photo".to_string(),
        MessageType::Video => "🎥 Video".to_string(),
        MessageType::Voice => "🎤 Voice message".to_string(),
        MessageType::File => "📄 File".to_string(),
        MessageType::Order => "🧾 Order".to_string(),
        _ => "Replied message".to_string(),
    }
}

fn squish(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn limit_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}…", cut.trim_end())
}

/// Column values of a message about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDraft {
    pub message_type: MessageType,
    pub message: Option<String>,
    pub file: Option<String>,
    pub duration: Option<i32>,
    pub order_id: Option<Uuid>,
    pub form_id: Option<Uuid>,
    pub is_forwarded: bool,
    pub original_id: Option<Uuid>,
}

impl MessageDraft {
    pub fn from_request(request: &SendMessageRequest) -> Result<Self, AppError> {
        let message_type = request
            .message_type
            .ok_or_else(|| AppError::Validation("type: required".to_string()))?;

        let draft = Self {
            message_type,
            message: request.message.clone().filter(|m| !m.trim().is_empty()),
            file: request.file.clone().filter(|f| !f.trim().is_empty()),
            duration: request.duration,
            order_id: request.order_id,
            form_id: request.form_id,
            is_forwarded: false,
            original_id: None,
        };
        draft.validate_content()?;
        Ok(draft)
    }

    /// Copies the content of `original` verbatim.
    pub fn forwarded(original: &Message) -> Self {
        Self {
            message_type: original.message_type,
            message: original.message.clone(),
            file: original.file.clone(),
            duration: original.duration,
            order_id: original.order_id,
            form_id: original.form_id,
            is_forwarded: true,
            original_id: Some(original.id),
        }
    }

    fn validate_content(&self) -> Result<(), AppError> {
        if self.message_type == MessageType::Text && self.message.is_none() {
            return Err(AppError::Validation("message: required for text messages".to_string()));
        }
        if self.message_type.requires_file() && self.file.is_none() {
            return Err(AppError::Validation("file: required for media messages".to_string()));
        }
        Ok(())
    }
}

/// Resolves a weak reference against already loaded messages.
/// `expected` marks rows that once pointed somewhere, so a missing target renders as deleted.
pub fn resolve_reference(
    reference_id: Option<Uuid>,
    expected: bool,
    lookup: &HashMap<Uuid, Message>,
) -> Option<ReferencedMessage> {
    match reference_id {
        Some(id) => Some(
            lookup
                .get(&id)
                .map(ReferencedMessage::from_message)
                .unwrap_or_else(|| ReferencedMessage::deleted(Some(id))),
        ),
        None if expected => Some(ReferencedMessage::deleted(None)),
        None => None,
    }
}

#[derive(Clone)]
pub struct MessageService {
    db_pool: PgPool,
}

impl MessageService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn send_message(&self, caller: &Caller, request: SendMessageRequest) -> Result<MessageView, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let chat = authorized_chat(&mut *tx, request.chat_id, caller).await?;

        let draft = if request.is_forward() {
            let original_id = request
                .original_id
                .ok_or_else(|| AppError::Validation("original_id: required when forwarding".to_string()))?;
            let original = fetch_message(&mut tx, original_id).await?;
            if original.is_deleted {
                return Err(AppError::Domain("Deleted messages cannot be forwarded".to_string()));
            }
            if original.chat_id != chat.id {
                let source_chat = fetch_chat(&mut *tx, original.chat_id).await?;
                ensure_chat_access(&source_chat, caller)?;
            }
            MessageDraft::forwarded(&original)
        } else {
            let draft = MessageDraft::from_request(&request)?;
            if let Some(order_id) = draft.order_id {
                ensure_order_in_chat(&mut tx, order_id, chat.id).await?;
            }
            draft
        };

        let preview = match request.reply_to_id {
            Some(reply_to_id) => {
                let parent = fetch_message(&mut tx, reply_to_id).await?;
                if parent.chat_id != chat.id {
                    return Err(AppError::Validation("reply_to_id: must reference a message in this chat".to_string()));
                }
                if parent.is_deleted {
                    return Err(AppError::Domain("Cannot reply to a deleted message".to_string()));
                }
                Some(reply_preview(parent.message_type, parent.message.as_deref()))
            }
            None => None,
        };

        let message = insert_message(&mut tx, &chat, caller.user_id, &draft, request.reply_to_id, preview).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Message {} ({:?}) sent in chat {} by {}",
            message.id, message.message_type, chat.id, caller.user_id
        );

        self.render_one(message).await
    }

    pub async fn forward_message(&self, caller: &Caller, request: ForwardMessageRequest) -> Result<MessageView, AppError> {
        self.send_message(
            caller,
            SendMessageRequest {
                chat_id: request.chat_id,
                original_id: Some(request.original_id),
                is_forwarded: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Edits a text message and refreshes the previews cached on its replies.
    pub async fn edit_message(
        &self,
        caller: &Caller,
        message_id: Uuid,
        request: EditMessageRequest,
    ) -> Result<MessageView, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1 FOR UPDATE")
            .bind(message_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        if message.sender_id != caller.user_id {
            return Err(AppError::Authorization("Only the sender can edit this message".to_string()));
        }
        if message.is_deleted {
            return Err(AppError::Domain("Deleted messages cannot be edited".to_string()));
        }
        if message.message_type != MessageType::Text {
            return Err(AppError::Domain("Only text messages can be edited".to_string()));
        }

        let text = request.message.trim();
        if text.is_empty() {
            return Err(AppError::Validation("message: must not be blank".to_string()));
        }

        let updated = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages SET message = $2, is_edited = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(text)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let refreshed = sqlx::query("UPDATE messages SET reply_preview = $2 WHERE reply_to_id = $1")
            .bind(message_id)
            .bind(reply_preview(MessageType::Text, Some(text)))
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Message {} edited, {} reply previews refreshed", message_id, refreshed);
        self.render_one(updated).await
    }

    pub async fn delete_message(&self, caller: &Caller, message_id: Uuid) -> Result<MessageView, AppError> {
        let message = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        if message.sender_id != caller.user_id && !caller.is_staff() {
            return Err(AppError::Authorization("Only the sender can delete this message".to_string()));
        }

        let deleted = sqlx::query_as::<_, Message>(
            "UPDATE messages SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(message_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Message {} deleted by {}", message_id, caller.user_id);
        self.render_one(deleted).await
    }

    /// Returns the chat's latest order and full history, then marks everything
    /// addressed to the caller as read.
    pub async fn chat_history(&self, caller: &Caller, chat_id: Uuid) -> Result<ChatHistory, AppError> {
        let chat = authorized_chat(&self.db_pool, chat_id, caller).await?;

        let order = latest_order(&self.db_pool, chat.id).await?;
        let messages = self.chat_messages(chat.id).await?;

        let marked = sqlx::query(
            "UPDATE messages SET is_read = TRUE WHERE chat_id = $1 AND receiver_id = $2 AND is_read = FALSE",
        )
        .bind(chat.id)
        .bind(caller.user_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .rows_affected();

        if marked > 0 {
            tracing::debug!("Marked {} messages read in chat {} for {}", marked, chat.id, caller.user_id);
        }

        Ok(ChatHistory { order, messages })
    }

    /// Every message of a chat, oldest first, without touching read state.
    pub async fn chat_messages(&self, chat_id: Uuid) -> Result<Vec<MessageView>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE chat_id = $1 ORDER BY created_at, id",
        )
        .bind(chat_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        self.render(messages).await
    }

    pub async fn list_chats(&self, caller: &Caller) -> Result<Vec<ChatSummary>, AppError> {
        let rows = sqlx::query_as::<_, ChatSummaryRow>(
            r#"
            SELECT c.id, c.chat_type, c.user_id, c.user_2_id, c.agent_id, c.created_at,
                   o.service_type AS category,
                   o.status AS order_status,
                   u.id AS counterpart_id,
                   u.name AS counterpart_name,
                   u.profile_picture AS counterpart_picture,
                   lm.id AS last_message_id,
                   lm.message_type AS last_message_type,
                   CASE WHEN lm.is_deleted THEN NULL ELSE lm.message END AS last_message,
                   lm.created_at AS last_message_at,
                   (SELECT COUNT(*) FROM messages m
                     WHERE m.chat_id = c.id AND m.is_read = FALSE AND m.sender_id <> $1) AS unread_count
            FROM chats c
            LEFT JOIN LATERAL (
                SELECT service_type, status FROM orders
                WHERE chat_id = c.id ORDER BY created_at DESC LIMIT 1
            ) o ON TRUE
            LEFT JOIN LATERAL (
                SELECT id, message_type, message, is_deleted, created_at FROM messages
                WHERE chat_id = c.id ORDER BY created_at DESC LIMIT 1
            ) lm ON TRUE
            LEFT JOIN users u
                ON u.id = CASE WHEN c.user_id = $1 THEN c.user_2_id ELSE c.user_id END
            WHERE (c.user_id = $1 OR c.user_2_id = $1)
              AND c.is_deleted_by_admin = FALSE
              AND NOT CASE WHEN c.user_id = $1 THEN c.hidden_by_user ELSE c.hidden_by_user_2 END
            ORDER BY COALESCE(lm.created_at, c.created_at) DESC
            "#,
        )
        .bind(caller.user_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows.into_iter().map(ChatSummary::from).collect())
    }

    /// Hides a chat from the caller's list only. The other participant keeps
    /// seeing it, and the next message or assignment brings it back.
    pub async fn hide_chat(&self, caller: &Caller, chat_id: Uuid) -> Result<(), AppError> {
        let chat = fetch_chat(&self.db_pool, chat_id).await?;
        if !chat.has_participant(caller.user_id) {
            return Err(AppError::Authorization("You are not a participant of this chat".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE chats SET
                hidden_by_user = hidden_by_user OR user_id IS NOT DISTINCT FROM $2,
                hidden_by_user_2 = hidden_by_user_2 OR user_2_id IS NOT DISTINCT FROM $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .bind(caller.user_id)
        .execute(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::debug!("Chat {} hidden by {}", chat_id, caller.user_id);
        Ok(())
    }

    pub(crate) async fn render_one(&self, message: Message) -> Result<MessageView, AppError> {
        self.render(vec![message])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Rendered message went missing".to_string()))
    }

    /// Builds message resources, loading reply/forward targets, participants
    /// and the payment order of forwarded messages in bulk.
    pub async fn render(&self, messages: Vec<Message>) -> Result<Vec<MessageView>, AppError> {
        let mut lookup: HashMap<Uuid, Message> = messages.iter().map(|m| (m.id, m.clone())).collect();

        let missing: Vec<Uuid> = messages
            .iter()
            .flat_map(|m| [m.original_id, m.reply_to_id])
            .flatten()
            .filter(|id| !lookup.contains_key(id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if !missing.is_empty() {
            let referenced = sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ANY($1)")
                .bind(&missing)
                .fetch_all(&self.db_pool)
                .await
                .map_err(AppError::Database)?;
            lookup.extend(referenced.into_iter().map(|m| (m.id, m)));
        }

        let user_ids: Vec<Uuid> = messages
            .iter()
            .flat_map(|m| [Some(m.sender_id), m.receiver_id])
            .flatten()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let users = user_summaries(&self.db_pool, &user_ids).await?;

        let source_chats: Vec<Uuid> = messages
            .iter()
            .filter(|m| m.is_forwarded)
            .filter_map(|m| m.original_id.and_then(|id| lookup.get(&id)).map(|o| o.chat_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let payment_orders: HashMap<Uuid, Order> = if source_chats.is_empty() {
            HashMap::new()
        } else {
            sqlx::query_as::<_, Order>(
                r#"
                SELECT DISTINCT ON (chat_id) * FROM orders
                WHERE chat_id = ANY($1)
                ORDER BY chat_id, created_at DESC
                "#,
            )
            .bind(&source_chats)
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .into_iter()
            .filter_map(|o| o.chat_id.map(|chat_id| (chat_id, o)))
            .collect()
        };

        Ok(messages
            .into_iter()
            .map(|message| {
                let original_message = resolve_reference(message.original_id, message.is_forwarded, &lookup);
                let reply_to = resolve_reference(message.reply_to_id, message.reply_preview.is_some(), &lookup);
                let payment_order = if message.is_forwarded {
                    message
                        .original_id
                        .and_then(|id| lookup.get(&id))
                        .and_then(|original| payment_orders.get(&original.chat_id))
                        .map(OrderSummary::from)
                } else {
                    None
                };
                let hidden = message.is_deleted;

                MessageView {
                    id: message.id,
                    chat_id: message.chat_id,
                    sender_id: message.sender_id,
                    receiver_id: message.receiver_id,
                    message_type: message.message_type,
                    message: if hidden { None } else { message.message },
                    file: if hidden { None } else { message.file },
                    duration: message.duration,
                    order_id: message.order_id,
                    form_id: message.form_id,
                    is_forwarded: message.is_forwarded,
                    original_id: message.original_id,
                    original_message,
                    reply_to_id: message.reply_to_id,
                    reply_preview: message.reply_preview,
                    reply_to,
                    is_read: message.is_read,
                    is_deleted: message.is_deleted,
                    is_edited: message.is_edited,
                    sender: users.get(&message.sender_id).cloned(),
                    receiver: message.receiver_id.and_then(|id| users.get(&id).cloned()),
                    payment_order,
                    created_at: message.created_at,
                    updated_at: message.updated_at,
                }
            })
            .collect())
    }
}

async fn fetch_message(conn: &mut PgConnection, message_id: Uuid) -> Result<Message, AppError> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
        .bind(message_id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
}

async fn ensure_order_in_chat(conn: &mut PgConnection, order_id: Uuid, chat_id: Uuid) -> Result<(), AppError> {
    let belongs = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1 AND chat_id = $2)")
        .bind(order_id)
        .bind(chat_id)
        .fetch_one(conn)
        .await
        .map_err(AppError::Database)?;

    if belongs {
        Ok(())
    } else {
        Err(AppError::Validation("order_id: must reference an order of this chat".to_string()))
    }
}

/// Inserts a message, deriving the receiver from the chat's participants.
/// A new message puts the chat back into both participants' lists.
pub(crate) async fn insert_message(
    conn: &mut PgConnection,
    chat: &Chat,
    sender_id: Uuid,
    draft: &MessageDraft,
    reply_to_id: Option<Uuid>,
    reply_preview: Option<String>,
) -> Result<Message, AppError> {
    let now = Utc::now();

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages
            (id, chat_id, sender_id, receiver_id, message_type, message, file, duration, order_id,
             form_id, is_forwarded, original_id, reply_to_id, reply_preview, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(chat.id)
    .bind(sender_id)
    .bind(chat.receiver_for(sender_id))
    .bind(draft.message_type)
    .bind(&draft.message)
    .bind(&draft.file)
    .bind(draft.duration)
    .bind(draft.order_id)
    .bind(draft.form_id)
    .bind(draft.is_forwarded)
    .bind(draft.original_id)
    .bind(reply_to_id)
    .bind(reply_preview)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    sqlx::query(
        r#"
        UPDATE chats SET hidden_by_user = FALSE, hidden_by_user_2 = FALSE, updated_at = $2
        WHERE id = $1 AND (hidden_by_user OR hidden_by_user_2)
        "#,
    )
    .bind(chat.id)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    Ok(message)
}

pub(crate) async fn latest_order<'e, E>(executor: E, chat_id: Uuid) -> Result<Option<Order>, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE chat_id = $1 ORDER BY created_at DESC LIMIT 1")
        .bind(chat_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)
}

pub(crate) async fn user_summaries<'e, E>(executor: E, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserSummary>, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = sqlx::query_as::<_, UserSummary>("SELECT id, name, profile_picture FROM users WHERE id = ANY($1)")
        .bind(user_ids)
        .fetch_all(executor)
        .await
        .map_err(AppError::Database)?;

    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(message_type: MessageType, text: Option<&str>) -> Message {
        Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: None,
            message_type,
            message: text.map(str::to_string),
            file: Some("uploads/photo.jpg".to_string()),
            duration: Some(12),
            order_id: Some(Uuid::new_v4()),
            form_id: None,
            is_forwarded: false,
            original_id: None,
            reply_to_id: None,
            reply_preview: None,
            is_read: false,
            is_deleted: false,
            is_edited: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_reply_preview_labels() {
        assert_eq!(reply_preview(MessageType::Image, None), "📷 Photo");
        assert_eq!(reply_preview(MessageType::Video, None), "🎥 Video");
        assert_eq!(reply_preview(MessageType::Voice, None), "🎤 Voice message");
        assert_eq!(reply_preview(MessageType::File, None), "📄 File");
        assert_eq!(reply_preview(MessageType::Order, None), "🧾 Order");
        assert_eq!(reply_preview(MessageType::Payment, Some("pay")), "Replied message");
    }

    #[test]
    fn test_reply_preview_squishes_short_text() {
        assert_eq!(
            reply_preview(MessageType::Text, Some("  Hello \n\n  world\t again ")),
            "Hello world again"
        );
    }

    #[test]
    fn test_reply_preview_truncates_long_text() {
        let text = "Hello world this is a long message that keeps going well past the eighty character preview limit";
        let preview = reply_preview(MessageType::Text, Some(text));

        let expected: String = text.chars().take(REPLY_PREVIEW_LIMIT).collect();
        assert_eq!(preview, format!("{}…", expected));
        assert_eq!(preview.chars().count(), REPLY_PREVIEW_LIMIT + 1);
    }

    #[test]
    fn test_reply_preview_counts_characters_not_bytes() {
        let text = "é".repeat(90);
        let preview = reply_preview(MessageType::Text, Some(&text));
        assert_eq!(preview, format!("{}…", "é".repeat(80)));
    }

    #[test]
    fn test_forward_copies_content() {
        let original = message(MessageType::Image, Some("caption"));
        let draft = MessageDraft::forwarded(&original);

        assert!(draft.is_forwarded);
        assert_eq!(draft.original_id, Some(original.id));
        assert_eq!(draft.message_type, original.message_type);
        assert_eq!(draft.message, original.message);
        assert_eq!(draft.file, original.file);
        assert_eq!(draft.duration, original.duration);
        assert_eq!(draft.order_id, original.order_id);
    }

    #[test]
    fn test_draft_validation() {
        let chat_id = Uuid::new_v4();

        let text_without_body = SendMessageRequest {
            chat_id,
            message_type: Some(MessageType::Text),
            message: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            MessageDraft::from_request(&text_without_body),
            Err(AppError::Validation(_))
        ));

        let image_without_file = SendMessageRequest {
            chat_id,
            message_type: Some(MessageType::Image),
            ..Default::default()
        };
        assert!(MessageDraft::from_request(&image_without_file).is_err());

        let missing_type = SendMessageRequest {
            chat_id,
            message: Some("hi".to_string()),
            ..Default::default()
        };
        assert!(MessageDraft::from_request(&missing_type).is_err());

        let voice = SendMessageRequest {
            chat_id,
            message_type: Some(MessageType::Voice),
            file: Some("voice/note.m4a".to_string()),
            duration: Some(7),
            ..Default::default()
        };
        let draft = MessageDraft::from_request(&voice).unwrap();
        assert_eq!(draft.duration, Some(7));
        assert!(!draft.is_forwarded);
    }

    #[test]
    fn test_resolve_reference() {
        let parent = message(MessageType::Text, Some("hello"));
        let mut deleted = message(MessageType::Text, Some("secret"));
        deleted.is_deleted = true;

        let lookup: HashMap<Uuid, Message> = [(parent.id, parent.clone()), (deleted.id, deleted.clone())]
            .into_iter()
            .collect();

        let found = resolve_reference(Some(parent.id), true, &lookup).unwrap();
        assert_eq!(found.message.as_deref(), Some("hello"));
        assert!(!found.is_deleted);

        let masked = resolve_reference(Some(deleted.id), true, &lookup).unwrap();
        assert!(masked.is_deleted);
        assert_eq!(masked.message.as_deref(), Some(ReferencedMessage::DELETED_TEXT));

        let dangling = resolve_reference(Some(Uuid::new_v4()), true, &lookup).unwrap();
        assert!(dangling.is_deleted);

        let cleared = resolve_reference(None, true, &lookup).unwrap();
        assert_eq!(cleared.id, None);
        assert!(cleared.is_deleted);

        assert!(resolve_reference(None, false, &lookup).is_none());
    }
}
