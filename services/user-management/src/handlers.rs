use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use retouch_auth::Caller;
use retouch_common::{ApiResponse, AppError, JsonBody};
use retouch_database::Notification;

use crate::models::*;
use crate::notifications::NotificationService;
use crate::services::UserService;
use crate::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("User Management Service is healthy".to_string()))
}

// User Registration
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), AppError> {
    request.validate()?;

    let auth = UserService::new(&state).register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(auth).with_message("Registration successful")),
    ))
}

// User Login
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<AuthResponse> {
    request.validate()?;

    let auth = UserService::new(&state).login(request).await?;
    Ok(Json(ApiResponse::success(auth).with_message("Login successful")))
}

// Password reset
pub async fn forget_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ForgetPasswordRequest>,
) -> ApiResult<()> {
    request.validate()?;

    UserService::new(&state).forget_password(request).await?;
    Ok(Json(ApiResponse::success(()).with_message("A reset code has been sent to your email")))
}

pub async fn verify_code(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyCodeRequest>,
) -> ApiResult<()> {
    request.validate()?;

    UserService::new(&state).verify_code(request).await?;
    Ok(Json(ApiResponse::success(()).with_message("Code verified")))
}

pub async fn change_password(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ChangePasswordRequest>,
) -> ApiResult<()> {
    request.validate()?;

    UserService::new(&state).change_password(request).await?;
    Ok(Json(ApiResponse::success(()).with_message("Password changed successfully")))
}

// Profile
pub async fn me(State(state): State<AppState>, caller: Caller) -> ApiResult<UserInfo> {
    let user = UserService::new(&state).me(&caller).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn edit_profile(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<EditProfileRequest>,
) -> ApiResult<UserInfo> {
    request.validate()?;

    let user = UserService::new(&state).edit_profile(&caller, request).await?;
    Ok(Json(ApiResponse::success(user).with_message("Profile updated")))
}

pub async fn set_fcm_token(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<FcmTokenRequest>,
) -> ApiResult<()> {
    request.validate()?;

    UserService::new(&state).set_fcm_token(&caller, request).await?;
    Ok(Json(ApiResponse::success(())))
}

// Presence
pub async fn heartbeat(State(state): State<AppState>, caller: Caller) -> ApiResult<OnlineStatus> {
    let status = UserService::new(&state).heartbeat(&caller).await?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn online_status(
    State(state): State<AppState>,
    _caller: Caller,
    Path(user_id): Path<Uuid>,
) -> ApiResult<OnlineStatus> {
    let status = UserService::new(&state).online_status(user_id).await?;
    Ok(Json(ApiResponse::success(status)))
}

pub async fn bulk_online_status(
    State(state): State<AppState>,
    _caller: Caller,
    JsonBody(request): JsonBody<BulkOnlineStatusRequest>,
) -> ApiResult<Vec<OnlineStatus>> {
    request.validate()?;

    let statuses = UserService::new(&state)
        .bulk_online_status(&request.user_ids)
        .await?;
    Ok(Json(ApiResponse::success(statuses)))
}

// Notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Vec<Notification>> {
    let notifications = NotificationService::new(state.db_pool.clone())
        .list_for(&caller)
        .await?;
    Ok(Json(ApiResponse::success(notifications)))
}

pub async fn notification_count(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<NotificationCount> {
    let count = NotificationService::new(state.db_pool.clone())
        .unread_count(&caller)
        .await?;
    Ok(Json(ApiResponse::success(count)))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    caller: Caller,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<Notification> {
    let notification = NotificationService::new(state.db_pool.clone())
        .mark_read(&caller, notification_id)
        .await?;
    Ok(Json(ApiResponse::success(notification)))
}
