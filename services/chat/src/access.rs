use sqlx::PgExecutor;
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::AppError;
use retouch_database::Chat;

pub async fn fetch_chat<'e, E>(executor: E, chat_id: Uuid) -> Result<Chat, AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1")
        .bind(chat_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))
}

/// Participants and staff may act on a chat. Nobody else.
/// A chat removed by an admin no longer exists for its participants.
pub fn ensure_chat_access(chat: &Chat, caller: &Caller) -> Result<(), AppError> {
    if caller.is_staff() {
        return Ok(());
    }
    if !chat.has_participant(caller.user_id) {
        return Err(AppError::Authorization("You are not a participant of this chat".to_string()));
    }
    if chat.is_deleted_by_admin {
        return Err(AppError::NotFound("Chat not found".to_string()));
    }
    Ok(())
}

pub async fn authorized_chat<'e, E>(executor: E, chat_id: Uuid, caller: &Caller) -> Result<Chat, AppError>
where
    E: PgExecutor<'e>,
{
    let chat = fetch_chat(executor, chat_id).await?;
    ensure_chat_access(&chat, caller)?;
    Ok(chat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use retouch_common::{ChatType, UserRole};

    fn chat(user_id: Uuid, agent_id: Uuid) -> Chat {
        Chat {
            id: Uuid::new_v4(),
            chat_type: ChatType::UserAgent,
            user_id: Some(user_id),
            user_2_id: Some(agent_id),
            agent_id: Some(agent_id),
            is_deleted_by_admin: false,
            hidden_by_user: false,
            hidden_by_user_2: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_participants_and_staff_have_access() {
        let customer = Uuid::new_v4();
        let agent = Uuid::new_v4();
        let chat = chat(customer, agent);

        let as_customer = Caller { user_id: customer, role: UserRole::User };
        let as_editor = Caller { user_id: Uuid::new_v4(), role: UserRole::Editor };
        let as_stranger = Caller { user_id: Uuid::new_v4(), role: UserRole::User };

        assert!(ensure_chat_access(&chat, &as_customer).is_ok());
        assert!(ensure_chat_access(&chat, &as_editor).is_ok());
        assert!(matches!(
            ensure_chat_access(&chat, &as_stranger),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn test_admin_removed_chat_is_gone_for_participants() {
        let customer = Uuid::new_v4();
        let agent = Uuid::new_v4();
        let mut chat = chat(customer, agent);
        chat.is_deleted_by_admin = true;

        let as_customer = Caller { user_id: customer, role: UserRole::User };
        let as_admin = Caller { user_id: Uuid::new_v4(), role: UserRole::Admin };

        assert!(matches!(
            ensure_chat_access(&chat, &as_customer),
            Err(AppError::NotFound(_))
        ));
        assert!(ensure_chat_access(&chat, &as_admin).is_ok());
    }
}
