use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use retouch_auth::{AccountStanding, Caller};
use retouch_common::{AppError, UserRole};

use crate::AppState;

/// Keeps presence fresh on every authenticated call. Blocked accounts and
/// tokens minted for a role the account no longer has are rejected here.
pub async fn track_last_seen(
    State(state): State<AppState>,
    caller: Option<Caller>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(caller) = caller else {
        return Ok(next.run(request).await);
    };

    let standing = sqlx::query_as::<_, (bool, UserRole)>(
        "UPDATE users SET last_seen_at = NOW() WHERE id = $1 RETURNING is_blocked, role",
    )
    .bind(caller.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .map(|(is_blocked, role)| AccountStanding { is_blocked, role });

    caller.check_standing(standing)?;
    Ok(next.run(request).await)
}
