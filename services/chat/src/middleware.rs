use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use retouch_auth::{AccountStanding, Caller};
use retouch_common::{AppError, UserRole};

use crate::AppState;

/// Stamps `last_seen_at` for authenticated requests and turns away accounts
/// that were blocked or changed role after their token was issued.
/// Anonymous requests pass through.
pub async fn track_last_seen(
    State(state): State<AppState>,
    caller: Option<Caller>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(caller) = caller {
        let standing = sqlx::query_as::<_, (bool, UserRole)>(
            "UPDATE users SET last_seen_at = NOW() WHERE id = $1 RETURNING is_blocked, role",
        )
        .bind(caller.user_id)
        .fetch_optional(&state.db_pool)
        .await?;

        caller.check_standing(standing.map(|(is_blocked, role)| AccountStanding { is_blocked, role }))?;
    }

    Ok(next.run(request).await)
}
