use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::admin_handlers as admin;
use crate::handlers;
use crate::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Authentication
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/forget-password", post(handlers::forget_password))
        .route("/auth/verify-code", post(handlers::verify_code))
        .route("/auth/change-password", post(handlers::change_password))

        // Profile
        .route("/auth/me", get(handlers::me))
        .route("/auth/edit-profile", post(handlers::edit_profile))
        .route("/auth/set-fcm-token", post(handlers::set_fcm_token))

        // Presence
        .route("/heartbeat", post(handlers::heartbeat))
        .route("/user/:id/online-status", get(handlers::online_status))
        .route("/users/online-status", post(handlers::bulk_online_status))

        // Notifications
        .route("/get-notifications", get(handlers::list_notifications))
        .route("/get-notifications-count", get(handlers::notification_count))
        .route("/mark-notification-as-read/:id", post(handlers::mark_notification_read))

        .merge(admin_routes())
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        // Users
        .route("/admin/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/admin/users/:id",
            get(admin::show_user).put(admin::update_user).delete(admin::delete_user),
        )
        .route("/admin/users/:id/toggle-block", post(admin::toggle_block))
        .route("/admin/users/:id/chats", get(admin::user_chats))
        .route("/admin/users/:id/orders", get(admin::user_orders))

        // Admin accounts
        .route("/admin/manage-admin", get(admin::list_admins).post(admin::create_admin))

        // System notifications
        .route("/admin/notifications", get(admin::list_notifications))
        .route("/admin/notifications/send", post(admin::send_notification))
        .route("/admin/notifications/:id", delete(admin::delete_notification))
}
