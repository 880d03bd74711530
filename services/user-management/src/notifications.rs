use sqlx::PgPool;
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::{AppError, Paginated, PaginationQuery, RecipientType};
use retouch_database::{Notification, SystemNotification};

use crate::models::{NotificationCount, SendNotificationRequest, SentNotification};

/// Roles that receive a broadcast for the given audience.
pub fn audience_roles(recipient_type: RecipientType) -> &'static [&'static str] {
    match recipient_type {
        RecipientType::All => &["user", "support", "editor", "chief_editor", "admin"],
        RecipientType::Users => &["user"],
        RecipientType::Agents => &["support", "editor", "chief_editor"],
    }
}

#[derive(Clone)]
pub struct NotificationService {
    db_pool: PgPool,
}

impl NotificationService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_for(&self, caller: &Caller) -> Result<Vec<Notification>, AppError> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(caller.user_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn unread_count(&self, caller: &Caller) -> Result<NotificationCount, AppError> {
        let unread = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(caller.user_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(NotificationCount { unread })
    }

    pub async fn mark_read(&self, caller: &Caller, notification_id: Uuid) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(notification_id)
        .bind(caller.user_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
    }

    /// Records the broadcast and fans it out to every matching account in one statement.
    pub async fn send(&self, admin: &Caller, request: SendNotificationRequest) -> Result<SentNotification, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let notification = sqlx::query_as::<_, SystemNotification>(
            r#"
            INSERT INTO system_notifications (id, title, content, recipient_type, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.title.trim())
        .bind(request.content.trim())
        .bind(request.recipient_type)
        .bind(admin.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let roles: Vec<String> = audience_roles(request.recipient_type)
            .iter()
            .map(|r| r.to_string())
            .collect();

        let recipients = sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, title, content)
            SELECT gen_random_uuid(), id, $1, $2 FROM users
            WHERE role = ANY($3) AND is_blocked = FALSE
            "#,
        )
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(&roles)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .rows_affected();

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "System notification {} sent to {} recipients ({:?})",
            notification.id, recipients, notification.recipient_type
        );

        Ok(SentNotification { notification, recipients })
    }

    pub async fn list_system(&self, query: PaginationQuery) -> Result<Paginated<SystemNotification>, AppError> {
        let items = sqlx::query_as::<_, SystemNotification>(
            "SELECT * FROM system_notifications ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(query.per_page())
        .bind(query.offset())
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM system_notifications")
            .fetch_one(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        Ok(Paginated::new(items, &query, total))
    }

    pub async fn delete_system(&self, notification_id: Uuid) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM system_notifications WHERE id = $1")
            .bind(notification_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }
}
