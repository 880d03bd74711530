use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::{AppError, ChatType};
use retouch_database::{Chat, Message, User};

use crate::access::fetch_chat;
use crate::message_service::{latest_order, user_summaries};
use crate::models::{AssignedAgentView, AssignedMessage, OrderSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentPlan {
    /// A pending order for the service already exists; nothing changes.
    ReuseExisting,
    /// The chat exists but has no pending order for the service.
    NewOrderInChat,
    NewChatAndOrder,
}

impl AssignmentPlan {
    pub fn created_something(&self) -> bool {
        !matches!(self, AssignmentPlan::ReuseExisting)
    }

    pub fn message(&self) -> &'static str {
        match self {
            AssignmentPlan::ReuseExisting => "Existing chat found",
            AssignmentPlan::NewOrderInChat => "New order created in existing chat",
            AssignmentPlan::NewChatAndOrder => "Agent assigned successfully",
        }
    }
}

/// Chats are unique per participant pair, so a chat whose earlier orders
/// were completed or failed gets its new order in place.
pub fn plan_assignment(chat_exists: bool, has_pending_order: bool) -> AssignmentPlan {
    match (chat_exists, has_pending_order) {
        (false, _) => AssignmentPlan::NewChatAndOrder,
        (true, true) => AssignmentPlan::ReuseExisting,
        (true, false) => AssignmentPlan::NewOrderInChat,
    }
}

#[derive(Debug)]
pub struct AssignmentOutcome {
    pub plan: AssignmentPlan,
    pub view: AssignedAgentView,
}

#[derive(Clone)]
pub struct AssignmentService {
    db_pool: PgPool,
}

impl AssignmentService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn assign_agent(&self, caller: &Caller, service_type: &str) -> Result<AssignmentOutcome, AppError> {
        let service_type = service_type.trim();
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        // Serialises concurrent assignments for the same customer.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("assign-agent:{}", caller.user_id))
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let agent = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE role = 'support' AND is_blocked = FALSE
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::Domain("No support agent available".to_string()))?;

        if agent.id == caller.user_id {
            return Err(AppError::Domain("Support agents cannot assign themselves".to_string()));
        }

        let chat = sqlx::query_as::<_, Chat>(
            r#"
            SELECT * FROM chats
            WHERE chat_type = 'user-agent'
              AND ((user_id = $1 AND user_2_id = $2) OR (user_id = $2 AND user_2_id = $1))
            LIMIT 1
            "#,
        )
        .bind(caller.user_id)
        .bind(agent.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        if chat.as_ref().is_some_and(|chat| chat.is_deleted_by_admin) {
            return Err(AppError::Domain("This chat was closed by an administrator".to_string()));
        }

        let has_pending_order = match &chat {
            Some(chat) => sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM orders
                    WHERE chat_id = $1 AND service_type = $2 AND status = 'pending'
                )
                "#,
            )
            .bind(chat.id)
            .bind(service_type)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?,
            None => false,
        };

        let plan = plan_assignment(chat.is_some(), has_pending_order);

        let chat_id = match (plan, chat) {
            (AssignmentPlan::NewChatAndOrder, _) | (_, None) => {
                let chat_id = insert_chat(&mut tx, caller.user_id, agent.id).await?;
                insert_pending_order(&mut tx, chat_id, caller.user_id, agent.id, service_type).await?;
                chat_id
            }
            (AssignmentPlan::NewOrderInChat, Some(chat)) => {
                unhide_chat(&mut tx, chat.id, caller.user_id).await?;
                insert_pending_order(&mut tx, chat.id, caller.user_id, agent.id, service_type).await?;
                chat.id
            }
            (AssignmentPlan::ReuseExisting, Some(chat)) => {
                unhide_chat(&mut tx, chat.id, caller.user_id).await?;
                chat.id
            }
        };

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Assignment for user {} ({}): {:?} -> chat {} with agent {}",
            caller.user_id, service_type, plan, chat_id, agent.id
        );

        let view = self.assigned_view(chat_id).await?;
        Ok(AssignmentOutcome { plan, view })
    }

    pub async fn assigned_view(&self, chat_id: Uuid) -> Result<AssignedAgentView, AppError> {
        let chat = fetch_chat(&self.db_pool, chat_id).await?;

        let participant_ids: Vec<Uuid> = [chat.user_id, chat.agent_id].into_iter().flatten().collect();
        let users = user_summaries(&self.db_pool, &participant_ids).await?;

        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE chat_id = $1 ORDER BY created_at, id",
        )
        .bind(chat.id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let order = latest_order(&self.db_pool, chat.id).await?;

        Ok(AssignedAgentView {
            chat_id: chat.id,
            chat_type: chat.chat_type,
            user: chat.user_id.and_then(|id| users.get(&id).cloned()),
            agent: chat.agent_id.and_then(|id| users.get(&id).cloned()),
            messages: messages.iter().map(AssignedMessage::from).collect(),
            order: order.as_ref().map(OrderSummary::from),
        })
    }
}

async fn insert_chat(conn: &mut PgConnection, user_id: Uuid, agent_id: Uuid) -> Result<Uuid, AppError> {
    let chat_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO chats (id, chat_type, user_id, user_2_id, agent_id)
        VALUES ($1, $2, $3, $4, $4)
        "#,
    )
    .bind(chat_id)
    .bind(ChatType::UserAgent)
    .bind(user_id)
    .bind(agent_id)
    .execute(conn)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "A chat with this agent already exists"))?;

    Ok(chat_id)
}

async fn insert_pending_order(
    conn: &mut PgConnection,
    chat_id: Uuid,
    user_id: Uuid,
    agent_id: Uuid,
    service_type: &str,
) -> Result<Uuid, AppError> {
    let order_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO orders (id, user_id, agent_id, chat_id, service_type, total_amount)
        VALUES ($1, $2, $3, $4, $5, 0)
        "#,
    )
    .bind(order_id)
    .bind(user_id)
    .bind(agent_id)
    .bind(chat_id)
    .bind(service_type)
    .execute(conn)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "A pending order for this service already exists"))?;

    Ok(order_id)
}

/// Clears the hide flag on `user_id`'s side of the chat.
async fn unhide_chat(conn: &mut PgConnection, chat_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE chats SET
            hidden_by_user = hidden_by_user AND user_id IS DISTINCT FROM $2,
            hidden_by_user_2 = hidden_by_user_2 AND user_2_id IS DISTINCT FROM $2,
            updated_at = NOW()
        WHERE id = $1 AND (hidden_by_user OR hidden_by_user_2)
        "#,
    )
    .bind(chat_id)
    .bind(user_id)
    .execute(conn)
    .await
    .map_err(AppError::Database)?;

    Ok(())
}
