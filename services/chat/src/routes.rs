use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::admin_handlers as admin;
use crate::handlers;
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Agent assignment
        .route("/assign-agent", post(handlers::assign_agent))

        // Messaging
        .route("/send-message", post(handlers::send_message))
        .route("/forward-message", post(handlers::forward_message))
        .route("/edit-message/:id", post(handlers::edit_message))
        .route("/delete-message/:id", post(handlers::delete_message))
        .route("/chat/:id", get(handlers::get_chat))
        .route("/chats", get(handlers::list_chats))
        .route("/delete-chat/:id", post(handlers::delete_chat))

        // Staff conversations
        .route("/non-users", get(handlers::list_staff))
        .route("/open-agent-chat/:id", get(handlers::open_staff_chat))

        // Quick replies
        .route(
            "/quick-replies",
            get(handlers::list_quick_replies).post(handlers::create_quick_reply),
        )
        .route(
            "/quick-replies/:id",
            put(handlers::update_quick_reply).delete(handlers::delete_quick_reply),
        )

        // Orders and payments
        .route("/create-payment", post(handlers::create_payment))
        .route("/update-payment", post(handlers::update_payment))
        .route("/update-order-status", post(handlers::update_order_status))
        .route("/webhooks/payment", post(handlers::payment_webhook))
        .route("/orders", get(handlers::list_orders))
        .route("/order/:id", get(handlers::get_order))

        // Questionnaire
        .route("/questionnaire/all", get(handlers::questionnaire_all))
        .route("/questionnaire/save-answer", post(handlers::save_answer))
        .route("/questionnaire/progress/:chat_id", get(handlers::questionnaire_progress))
        .route("/questionnaire/answers/:chat_id", get(handlers::questionnaire_answers))

        .merge(admin_routes())
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        // Chats
        .route("/admin/chats", get(admin::list_chats))
        .route("/admin/chats/:id", get(admin::show_chat).delete(admin::delete_chat))
        .route("/admin/chats/:id/new-order", post(admin::new_order))
        .route("/admin/chats/available/list", get(admin::available_chats))
        .route("/admin/chats/share", post(admin::share_to_chat))

        // Orders
        .route("/admin/orders", get(admin::list_orders))
        .route(
            "/admin/orders/:id",
            get(admin::show_order).put(admin::update_order).delete(admin::delete_order),
        )
        .route("/admin/orders/:id/status", patch(admin::update_order_status))
        .route("/admin/orders/:id/payment-status", patch(admin::update_payment_status))

        // Transactions
        .route("/admin/transactions", get(admin::list_transactions))
        .route("/admin/transactions/:id", get(admin::show_transaction))
        .route("/admin/transactions/:id/status", patch(admin::update_transaction_status))

        // Questionnaire management
        .route(
            "/admin/questionnaires",
            get(admin::list_questionnaires).post(admin::create_questionnaire),
        )
        .route("/admin/questionnaires/reorder", post(admin::reorder_questionnaires))
        .route("/admin/questionnaires/question-types", get(admin::question_types))
        .route(
            "/admin/questionnaires/questions/:question_id",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route(
            "/admin/questionnaires/:id",
            get(admin::show_questionnaire)
                .put(admin::update_questionnaire)
                .delete(admin::delete_questionnaire),
        )
        .route("/admin/questionnaires/:id/toggle-status", post(admin::toggle_questionnaire))
        .route("/admin/questionnaires/:id/questions", post(admin::add_question))
        .route("/admin/questionnaires/:id/reorder-questions", post(admin::reorder_questions))
}
