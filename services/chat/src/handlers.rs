use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use retouch_auth::Caller;
use retouch_common::{ApiResponse, AppError, JsonBody};
use retouch_database::{Order, QuickReply};

use crate::assignment::AssignmentService;
use crate::message_service::MessageService;
use crate::models::*;
use crate::order_service::OrderService;
use crate::questionnaire::QuestionnaireService;
use crate::quick_replies::QuickReplyService;
use crate::staff_chat::StaffChatService;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature";

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

// Health check
pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Chat Service is healthy".to_string()))
}

// Agent assignment
pub async fn assign_agent(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<AssignAgentRequest>,
) -> Created<AssignedAgentView> {
    request.validate()?;

    let outcome = AssignmentService::new(state.db_pool.clone())
        .assign_agent(&caller, &request.service_type)
        .await?;

    let status = if outcome.plan.created_something() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(ApiResponse::success(outcome.view).with_message(outcome.plan.message())),
    ))
}

// Messaging
pub async fn send_message(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<SendMessageRequest>,
) -> Created<MessageView> {
    request.validate()?;

    let message = MessageService::new(state.db_pool.clone())
        .send_message(&caller, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(message).with_message("Message sent")),
    ))
}

pub async fn forward_message(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<ForwardMessageRequest>,
) -> Created<MessageView> {
    let message = MessageService::new(state.db_pool.clone())
        .forward_message(&caller, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(message).with_message("Message forwarded")),
    ))
}

pub async fn edit_message(
    State(state): State<AppState>,
    caller: Caller,
    Path(message_id): Path<Uuid>,
    JsonBody(request): JsonBody<EditMessageRequest>,
) -> ApiResult<MessageView> {
    request.validate()?;

    let message = MessageService::new(state.db_pool.clone())
        .edit_message(&caller, message_id, request)
        .await?;

    Ok(Json(ApiResponse::success(message).with_message("Message updated")))
}

pub async fn delete_message(
    State(state): State<AppState>,
    caller: Caller,
    Path(message_id): Path<Uuid>,
) -> ApiResult<MessageView> {
    let message = MessageService::new(state.db_pool.clone())
        .delete_message(&caller, message_id)
        .await?;

    Ok(Json(ApiResponse::success(message).with_message("Message deleted")))
}

// Chats
pub async fn get_chat(
    State(state): State<AppState>,
    caller: Caller,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<ChatHistory> {
    let history = MessageService::new(state.db_pool.clone())
        .chat_history(&caller, chat_id)
        .await?;

    Ok(Json(ApiResponse::success(history)))
}

pub async fn list_chats(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<ChatSummary>> {
    let chats = MessageService::new(state.db_pool.clone()).list_chats(&caller).await?;
    Ok(Json(ApiResponse::success(chats)))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    caller: Caller,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<()> {
    MessageService::new(state.db_pool.clone())
        .hide_chat(&caller, chat_id)
        .await?;

    Ok(Json(ApiResponse::success(()).with_message("Chat deleted")))
}

// Staff conversations
pub async fn list_staff(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<StaffMember>> {
    let staff = StaffChatService::new(state.db_pool.clone()).list_staff(&caller).await?;
    Ok(Json(ApiResponse::success(staff)))
}

pub async fn open_staff_chat(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StaffChatView> {
    let chat = StaffChatService::new(state.db_pool.clone())
        .open_chat(&caller, user_id)
        .await?;

    Ok(Json(ApiResponse::success(chat)))
}

// Quick replies
pub async fn list_quick_replies(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<QuickReply>> {
    let replies = QuickReplyService::new(state.db_pool.clone()).list(&caller).await?;
    Ok(Json(ApiResponse::success(replies)))
}

pub async fn create_quick_reply(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<QuickReplyRequest>,
) -> Created<QuickReply> {
    request.validate()?;

    let reply = QuickReplyService::new(state.db_pool.clone())
        .create(&caller, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(reply).with_message("Quick reply saved")),
    ))
}

pub async fn update_quick_reply(
    State(state): State<AppState>,
    caller: Caller,
    Path(reply_id): Path<Uuid>,
    JsonBody(request): JsonBody<QuickReplyRequest>,
) -> ApiResult<QuickReply> {
    request.validate()?;

    let reply = QuickReplyService::new(state.db_pool.clone())
        .update(&caller, reply_id, request)
        .await?;

    Ok(Json(ApiResponse::success(reply).with_message("Quick reply updated")))
}

pub async fn delete_quick_reply(
    State(state): State<AppState>,
    caller: Caller,
    Path(reply_id): Path<Uuid>,
) -> ApiResult<()> {
    QuickReplyService::new(state.db_pool.clone())
        .delete(&caller, reply_id)
        .await?;

    Ok(Json(ApiResponse::success(()).with_message("Quick reply deleted")))
}

// Orders and payments
pub async fn create_payment(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<CreatePaymentRequest>,
) -> ApiResult<Order> {
    request.validate()?;

    let order = order_service(&state).create_payment(&caller, request).await?;
    Ok(Json(ApiResponse::success(order).with_message("Payment created")))
}

pub async fn update_payment(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<ChatRequest>,
) -> ApiResult<Order> {
    let order = order_service(&state).confirm_payment(&caller, request.chat_id).await?;
    Ok(Json(ApiResponse::success(order).with_message("Payment updated")))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<UpdateOrderStatusRequest>,
) -> ApiResult<Order> {
    let order = order_service(&state).update_order_status(&caller, request).await?;
    Ok(Json(ApiResponse::success(order).with_message("Order status updated")))
}

pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Order> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());

    let order = order_service(&state).handle_webhook(signature, &body).await?;
    Ok(Json(ApiResponse::success(order).with_message("Webhook processed")))
}

pub async fn list_orders(State(state): State<AppState>, caller: Caller) -> ApiResult<Vec<Order>> {
    let orders = order_service(&state).list_orders(&caller).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    let order = order_service(&state).get_order(&caller, order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

// Questionnaire
pub async fn questionnaire_all(State(state): State<AppState>, _caller: Caller) -> ApiResult<Vec<CategoryView>> {
    let categories = QuestionnaireService::new(state.db_pool.clone()).list_active().await?;
    Ok(Json(ApiResponse::success(categories)))
}

pub async fn save_answer(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(request): JsonBody<SaveAnswerRequest>,
) -> ApiResult<ProgressView> {
    let progress = QuestionnaireService::new(state.db_pool.clone())
        .save_answer(&caller, request)
        .await?;

    Ok(Json(ApiResponse::success(progress).with_message("Answers saved")))
}

pub async fn questionnaire_progress(
    State(state): State<AppState>,
    caller: Caller,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<ProgressView> {
    let progress = QuestionnaireService::new(state.db_pool.clone())
        .progress(&caller, chat_id)
        .await?;

    Ok(Json(ApiResponse::success(progress)))
}

pub async fn questionnaire_answers(
    State(state): State<AppState>,
    caller: Caller,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<AnswersView> {
    let answers = QuestionnaireService::new(state.db_pool.clone())
        .answers(&caller, chat_id)
        .await?;

    Ok(Json(ApiResponse::success(answers)))
}

pub(crate) fn order_service(state: &AppState) -> OrderService {
    OrderService::new(state.db_pool.clone(), state.config.payments.clone())
}
