use sqlx::PgPool;
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::AppError;
use retouch_database::QuickReply;

use crate::models::QuickReplyRequest;

fn reply_text(request: &QuickReplyRequest) -> Result<&str, AppError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("text: must not be blank".to_string()));
    }
    Ok(text)
}

/// Canned answers each account keeps for itself.
#[derive(Clone)]
pub struct QuickReplyService {
    db_pool: PgPool,
}

impl QuickReplyService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self, caller: &Caller) -> Result<Vec<QuickReply>, AppError> {
        sqlx::query_as::<_, QuickReply>("SELECT * FROM quick_replies WHERE user_id = $1 ORDER BY created_at, id")
            .bind(caller.user_id)
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn create(&self, caller: &Caller, request: QuickReplyRequest) -> Result<QuickReply, AppError> {
        let text = reply_text(&request)?;

        sqlx::query_as::<_, QuickReply>(
            "INSERT INTO quick_replies (id, user_id, text) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(caller.user_id)
        .bind(text)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        reply_id: Uuid,
        request: QuickReplyRequest,
    ) -> Result<QuickReply, AppError> {
        let text = reply_text(&request)?;

        sqlx::query_as::<_, QuickReply>(
            r#"
            UPDATE quick_replies SET text = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(reply_id)
        .bind(caller.user_id)
        .bind(text)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Quick reply not found".to_string()))
    }

    pub async fn delete(&self, caller: &Caller, reply_id: Uuid) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM quick_replies WHERE id = $1 AND user_id = $2")
            .bind(reply_id)
            .bind(caller.user_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Quick reply not found".to_string()));
        }
        Ok(())
    }
}
