use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use retouch_auth::AdminCaller;
use retouch_common::{ApiResponse, AppError, JsonBody, Paginated};
use retouch_database::{Order, Questionnaire, QuestionnaireQuestion, Transaction};

use crate::admin::AdminChatService;
use crate::handlers::order_service;
use crate::models::*;
use crate::questionnaire::QuestionnaireService;
use crate::AppState;

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

fn questionnaires(state: &AppState) -> QuestionnaireService {
    QuestionnaireService::new(state.db_pool.clone())
}

// Chats
pub async fn list_chats(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<AdminChatQuery>,
) -> ApiResult<Paginated<AdminChatRow>> {
    let chats = AdminChatService::new(state.db_pool.clone()).list_chats(query).await?;
    Ok(Json(ApiResponse::success(chats)))
}

pub async fn show_chat(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<AdminChatDetail> {
    let chat = AdminChatService::new(state.db_pool.clone()).show_chat(chat_id).await?;
    Ok(Json(ApiResponse::success(chat)))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(chat_id): Path<Uuid>,
) -> ApiResult<()> {
    AdminChatService::new(state.db_pool.clone()).delete_chat(chat_id).await?;
    tracing::info!("Admin {} deleted chat {}", admin.user_id, chat_id);
    Ok(Json(ApiResponse::success(()).with_message("Chat deleted")))
}

pub async fn available_chats(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<AvailableChatQuery>,
) -> ApiResult<Vec<AvailableChat>> {
    let chats = AdminChatService::new(state.db_pool.clone())
        .available_chats(query)
        .await?;

    Ok(Json(ApiResponse::success(chats)))
}

pub async fn share_to_chat(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    JsonBody(request): JsonBody<ShareToChatRequest>,
) -> Created<MessageView> {
    request.validate()?;

    let message = AdminChatService::new(state.db_pool.clone())
        .share_to_chat(&admin, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(message).with_message("Shared successfully")),
    ))
}

pub async fn new_order(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(chat_id): Path<Uuid>,
    JsonBody(request): JsonBody<NewOrderRequest>,
) -> Created<Order> {
    request.validate()?;

    let order = AdminChatService::new(state.db_pool.clone())
        .new_order(chat_id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(order).with_message("Order created")),
    ))
}

// Orders
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<AdminOrderQuery>,
) -> ApiResult<Paginated<Order>> {
    let orders = order_service(&state).admin_list_orders(query).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn show_order(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Order> {
    let order = order_service(&state).find_order(order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_order(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(order_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateOrderRequest>,
) -> ApiResult<Order> {
    request.validate()?;

    let order = order_service(&state).admin_update_order(order_id, request).await?;
    Ok(Json(ApiResponse::success(order).with_message("Order updated")))
}

pub async fn delete_order(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(order_id): Path<Uuid>,
) -> ApiResult<()> {
    order_service(&state).admin_delete_order(order_id).await?;
    Ok(Json(ApiResponse::success(()).with_message("Order deleted")))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(order_id): Path<Uuid>,
    JsonBody(request): JsonBody<OrderStatusPatch>,
) -> ApiResult<Order> {
    let order = order_service(&state)
        .admin_set_order_status(order_id, request.status)
        .await?;

    Ok(Json(ApiResponse::success(order).with_message("Order status updated")))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(order_id): Path<Uuid>,
    JsonBody(request): JsonBody<PaymentStatusPatch>,
) -> ApiResult<Order> {
    let order = order_service(&state)
        .admin_set_payment_status(order_id, request.payment_status, request.txn)
        .await?;

    Ok(Json(ApiResponse::success(order).with_message("Payment status updated")))
}

// Transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<Paginated<Transaction>> {
    let transactions = order_service(&state).list_transactions(query).await?;
    Ok(Json(ApiResponse::success(transactions)))
}

pub async fn show_transaction(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(transaction_id): Path<Uuid>,
) -> ApiResult<Transaction> {
    let transaction = order_service(&state).find_transaction(transaction_id).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

pub async fn update_transaction_status(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(transaction_id): Path<Uuid>,
    JsonBody(request): JsonBody<TransactionStatusPatch>,
) -> ApiResult<Transaction> {
    let transaction = order_service(&state)
        .set_transaction_status(transaction_id, request.status)
        .await?;

    Ok(Json(ApiResponse::success(transaction).with_message("Transaction updated")))
}

// Questionnaire management
pub async fn list_questionnaires(State(state): State<AppState>, _admin: AdminCaller) -> ApiResult<Vec<CategoryView>> {
    let categories = questionnaires(&state).list_all().await?;
    Ok(Json(ApiResponse::success(categories)))
}

pub async fn show_questionnaire(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(questionnaire_id): Path<Uuid>,
) -> ApiResult<CategoryView> {
    let category = questionnaires(&state).show(questionnaire_id).await?;
    Ok(Json(ApiResponse::success(category)))
}

pub async fn create_questionnaire(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(request): JsonBody<CreateQuestionnaireRequest>,
) -> Created<Questionnaire> {
    request.validate()?;

    let questionnaire = questionnaires(&state).create(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(questionnaire).with_message("Questionnaire created")),
    ))
}

pub async fn update_questionnaire(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(questionnaire_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateQuestionnaireRequest>,
) -> ApiResult<Questionnaire> {
    request.validate()?;

    let questionnaire = questionnaires(&state).update(questionnaire_id, request).await?;
    Ok(Json(ApiResponse::success(questionnaire).with_message("Questionnaire updated")))
}

pub async fn delete_questionnaire(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(questionnaire_id): Path<Uuid>,
) -> ApiResult<()> {
    questionnaires(&state).delete(questionnaire_id).await?;
    Ok(Json(ApiResponse::success(()).with_message("Questionnaire deleted")))
}

pub async fn toggle_questionnaire(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(questionnaire_id): Path<Uuid>,
) -> ApiResult<Questionnaire> {
    let questionnaire = questionnaires(&state).toggle_status(questionnaire_id).await?;
    Ok(Json(ApiResponse::success(questionnaire).with_message("Questionnaire status updated")))
}

pub async fn add_question(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(questionnaire_id): Path<Uuid>,
    JsonBody(request): JsonBody<QuestionRequest>,
) -> Created<QuestionnaireQuestion> {
    request.validate()?;

    let question = questionnaires(&state).add_question(questionnaire_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(question).with_message("Question added")),
    ))
}

pub async fn update_question(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(question_id): Path<Uuid>,
    JsonBody(request): JsonBody<UpdateQuestionRequest>,
) -> ApiResult<QuestionnaireQuestion> {
    request.validate()?;

    let question = questionnaires(&state).update_question(question_id, request).await?;
    Ok(Json(ApiResponse::success(question).with_message("Question updated")))
}

pub async fn delete_question(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(question_id): Path<Uuid>,
) -> ApiResult<()> {
    questionnaires(&state).delete_question(question_id).await?;
    Ok(Json(ApiResponse::success(()).with_message("Question deleted")))
}

pub async fn reorder_questionnaires(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(request): JsonBody<ReorderRequest>,
) -> ApiResult<Vec<Questionnaire>> {
    request.validate()?;

    let reordered = questionnaires(&state).reorder(request).await?;
    Ok(Json(ApiResponse::success(reordered).with_message("Questionnaires reordered")))
}

pub async fn reorder_questions(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(questionnaire_id): Path<Uuid>,
    JsonBody(request): JsonBody<ReorderQuestionsRequest>,
) -> ApiResult<CategoryView> {
    request.validate()?;

    let category = questionnaires(&state)
        .reorder_questions(questionnaire_id, request)
        .await?;

    Ok(Json(ApiResponse::success(category).with_message("Questions reordered")))
}

pub async fn question_types(State(state): State<AppState>, _admin: AdminCaller) -> ApiResult<Vec<QuestionTypeInfo>> {
    Ok(Json(ApiResponse::success(questionnaires(&state).question_types())))
}
