use sqlx::PgPool;
use uuid::Uuid;

use retouch_auth::PasswordService;
use retouch_common::{AppError, Paginated, PaginationQuery, UserRole};
use retouch_database::{Chat, Order, User};

use crate::models::*;
use crate::services::{create_account, find_user, normalize_email, NewAccount};

/// `%term%` for ILIKE, with the pattern characters escaped.
pub fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search?.trim();
    if term.is_empty() {
        return None;
    }
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

#[derive(Clone)]
pub struct AdminUserService {
    db_pool: PgPool,
}

impl AdminUserService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn list_users(&self, query: AdminUserQuery) -> Result<Paginated<UserInfo>, AppError> {
        let page = PaginationQuery::new(query.page, query.per_page);
        let role = query.role.map(|r| r.as_str());
        let search = search_pattern(query.search.as_deref());

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::boolean IS NULL OR is_blocked = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(role)
        .bind(query.is_blocked)
        .bind(&search)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::boolean IS NULL OR is_blocked = $2)
              AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3)
            "#,
        )
        .bind(role)
        .bind(query.is_blocked)
        .bind(&search)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Paginated::new(
            users.into_iter().map(UserInfo::from).collect(),
            &page,
            total,
        ))
    }

    pub async fn show_user(&self, user_id: Uuid) -> Result<AdminUserDetail, AppError> {
        let user = find_user(&self.db_pool, user_id).await?;

        let (chat_count, order_count) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM chats WHERE user_id = $1 OR user_2_id = $1),
                (SELECT COUNT(*) FROM orders WHERE user_id = $1 OR agent_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(AdminUserDetail {
            user: UserInfo::from(user),
            chat_count,
            order_count,
        })
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserInfo, AppError> {
        PasswordService::validate_password_strength(&request.password)?;

        let user = create_account(
            &self.db_pool,
            NewAccount {
                name: &request.name,
                email: &request.email,
                password: &request.password,
                phone: request.phone.as_deref(),
                role: request.role.unwrap_or(UserRole::User),
            },
        )
        .await?;

        tracing::info!("Account {} created with role {}", user.email, user.role);
        Ok(UserInfo::from(user))
    }

    pub async fn update_user(&self, user_id: Uuid, request: UpdateUserRequest) -> Result<UserInfo, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                role = COALESCE($5, role),
                is_verified = COALESCE($6, is_verified),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.email.as_deref().map(normalize_email))
        .bind(&request.phone)
        .bind(request.role)
        .bind(request.is_verified)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "An account with this email already exists"))?
        .map(UserInfo::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn delete_user(&self, admin_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if admin_id == user_id {
            return Err(AppError::Domain("You cannot delete your own account".to_string()));
        }

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        tracing::info!("User {} deleted by admin {}", user_id, admin_id);
        Ok(())
    }

    pub async fn toggle_block(&self, admin_id: Uuid, user_id: Uuid) -> Result<UserInfo, AppError> {
        if admin_id == user_id {
            return Err(AppError::Domain("You cannot block your own account".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_blocked = NOT is_blocked, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!("User {} blocked = {}", user.id, user.is_blocked);
        Ok(UserInfo::from(user))
    }

    pub async fn user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, AppError> {
        find_user(&self.db_pool, user_id).await?;

        sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats WHERE user_id = $1 OR user_2_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn user_orders(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        find_user(&self.db_pool, user_id).await?;

        sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 OR agent_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    // Admin accounts
    pub async fn list_admins(&self) -> Result<Vec<UserInfo>, AppError> {
        let admins = sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = 'admin' ORDER BY created_at")
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        Ok(admins.into_iter().map(UserInfo::from).collect())
    }

    pub async fn create_admin(&self, request: CreateAdminRequest) -> Result<UserInfo, AppError> {
        self.create_user(CreateUserRequest {
            name: request.name,
            email: request.email,
            password: request.password,
            phone: request.phone,
            role: Some(UserRole::Admin),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some(" anna ")).as_deref(), Some("%anna%"));
        assert_eq!(search_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
    }
}
