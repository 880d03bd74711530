use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use retouch_auth::AdminCaller;
use retouch_common::{ApiResponse, AppError, JsonBody, Paginated, PaginationQuery};
use retouch_database::{Chat, Order, SystemNotification};

use crate::admin::AdminUserService;
use crate::models::*;
use crate::notifications::NotificationService;
use crate::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

fn users(state: &AppState) -> AdminUserService {
    AdminUserService::new(state.db_pool.clone())
}

// Users
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<AdminUserQuery>,
) -> ApiResult<Paginated<UserInfo>> {
    let page = users(&state).list_users(query).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Created<UserInfo> {
    request.validate()?;

    let user = users(&state).create_user(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user).with_message("User created")),
    ))
}

pub async fn show_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(user_id): Path<Uuid>,
) -> ApiResult<AdminUserDetail> {
    let detail = users(&state).show_user(user_id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(user_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateUserRequest>,
) -> ApiResult<UserInfo> {
    request.validate()?;

    let user = users(&state).update_user(user_id, request).await?;
    Ok(Json(ApiResponse::success(user).with_message("User updated")))
}

pub async fn delete_user(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(user_id): Path<Uuid>,
) -> ApiResult<()> {
    users(&state).delete_user(admin.user_id, user_id).await?;
    Ok(Json(ApiResponse::success(()).with_message("User deleted")))
}

pub async fn toggle_block(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(user_id): Path<Uuid>,
) -> ApiResult<UserInfo> {
    let user = users(&state).toggle_block(admin.user_id, user_id).await?;
    let message = if user.is_blocked { "User blocked" } else { "User unblocked" };
    Ok(Json(ApiResponse::success(user).with_message(message)))
}

pub async fn user_chats(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Vec<Chat>> {
    let chats = users(&state).user_chats(user_id).await?;
    Ok(Json(ApiResponse::success(chats)))
}

pub async fn user_orders(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Vec<Order>> {
    let orders = users(&state).user_orders(user_id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

// Admin accounts
pub async fn list_admins(State(state): State<AppState>, _admin: AdminCaller) -> ApiResult<Vec<UserInfo>> {
    let admins = users(&state).list_admins().await?;
    Ok(Json(ApiResponse::success(admins)))
}

pub async fn create_admin(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    JsonBody(request): JsonBody<CreateAdminRequest>,
) -> Created<UserInfo> {
    request.validate()?;

    let created = users(&state).create_admin(request).await?;
    tracing::info!("Admin {} created admin account {}", admin.user_id, created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created).with_message("Admin created")),
    ))
}

// System notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<PaginationQuery>,
) -> ApiResult<Paginated<SystemNotification>> {
    let page = NotificationService::new(state.db_pool.clone())
        .list_system(query)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn send_notification(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    JsonBody(request): JsonBody<SendNotificationRequest>,
) -> Created<SentNotification> {
    request.validate()?;

    let sent = NotificationService::new(state.db_pool.clone())
        .send(&admin, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(sent).with_message("Notification sent")),
    ))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<()> {
    NotificationService::new(state.db_pool.clone())
        .delete_system(notification_id)
        .await?;
    Ok(Json(ApiResponse::success(()).with_message("Notification deleted")))
}
