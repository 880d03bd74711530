use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use retouch_auth::Caller;
use retouch_common::{
    AppError, MessageType, OrderStatus, Paginated, PaginationQuery, PaymentStatus, TransactionStatus,
};
use retouch_database::{Order, Transaction};

use crate::access::authorized_chat;
use crate::config::PaymentConfig;
use crate::message_service::{insert_message, MessageDraft};
use crate::models::{
    AdminOrderQuery, CreatePaymentRequest, PaymentWebhookPayload, TransactionQuery, UpdateOrderRequest,
    UpdateOrderStatusRequest,
};

pub const PAYMENT_REQUEST_TEXT: &str = "Please Check this Order and make payment";

type HmacSha256 = Hmac<Sha256>;

/// Checks a hex encoded HMAC-SHA256 of `body` keyed with `secret`.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Ledger status recorded when a payment settles.
pub fn ledger_status(payment_status: PaymentStatus) -> Option<TransactionStatus> {
    match payment_status {
        PaymentStatus::Success => Some(TransactionStatus::Completed),
        PaymentStatus::Failed => Some(TransactionStatus::Failed),
        PaymentStatus::Unpaid | PaymentStatus::Initialized => None,
    }
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: PgPool,
    payments: PaymentConfig,
}

impl OrderService {
    pub fn new(db_pool: PgPool, payments: PaymentConfig) -> Self {
        Self { db_pool, payments }
    }

    /// Prices the chat's latest pending order and posts the payment request message.
    pub async fn create_payment(&self, caller: &Caller, request: CreatePaymentRequest) -> Result<Order, AppError> {
        if request.total_amount <= Decimal::ZERO {
            return Err(AppError::Validation("total_amount: must be greater than zero".to_string()));
        }

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;
        let chat = authorized_chat(&mut *tx, request.chat_id, caller).await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE chat_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(chat.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("No pending order found for this chat".to_string()))?;

        order.payment_status.check_transition(PaymentStatus::Initialized)?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET total_amount = $2, no_of_photos = $3, delivery_date = CURRENT_DATE,
                payment_status = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(request.total_amount)
        .bind(request.no_of_photos)
        .bind(PaymentStatus::Initialized)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        let draft = MessageDraft {
            message_type: MessageType::Payment,
            message: Some(PAYMENT_REQUEST_TEXT.to_string()),
            file: None,
            duration: None,
            order_id: Some(order.id),
            form_id: None,
            is_forwarded: false,
            original_id: None,
        };
        insert_message(&mut tx, &chat, caller.user_id, &draft, None, None).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!(
            "Payment of {} for {} photos requested on order {} in chat {}",
            order.total_amount, request.no_of_photos, order.id, chat.id
        );
        Ok(order)
    }

    /// Client-side payment confirmation. Disabled when
    /// `PAYMENT_ALLOW_CLIENT_CONFIRMATION` is false.
    pub async fn confirm_payment(&self, caller: &Caller, chat_id: Uuid) -> Result<Order, AppError> {
        if !self.payments.allow_client_confirmation {
            return Err(AppError::Authorization(
                "Client payment confirmation is disabled".to_string(),
            ));
        }

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;
        let chat = authorized_chat(&mut *tx, chat_id, caller).await?;

        let order = lock_latest_order(&mut tx, chat.id).await?;
        let order = apply_payment_status(&mut tx, order, PaymentStatus::Success, None).await?;

        tx.commit().await.map_err(AppError::Database)?;

        tracing::warn!(
            "Order {} marked paid on client confirmation by {}",
            order.id, caller.user_id
        );
        Ok(order)
    }

    /// Provider callback. The signature is checked before the body is parsed.
    pub async fn handle_webhook(&self, signature: Option<&str>, body: &[u8]) -> Result<Order, AppError> {
        let secret = self
            .payments
            .webhook_secret
            .as_deref()
            .ok_or_else(|| AppError::NotFound("Payment webhook is not configured".to_string()))?;

        let signature = signature
            .ok_or_else(|| AppError::Authentication("Missing webhook signature".to_string()))?;
        if !verify_signature(secret, body, signature) {
            return Err(AppError::Authentication("Invalid webhook signature".to_string()));
        }

        let payload: PaymentWebhookPayload = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("body: {}", e)))?;

        if ledger_status(payload.status).is_none() {
            return Err(AppError::Validation("status: must be success or failed".to_string()));
        }

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;
        let order = lock_order(&mut tx, payload.order_id).await?;
        let order = apply_payment_status(&mut tx, order, payload.status, payload.txn).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Webhook set payment status of order {} to {}", order.id, order.payment_status);
        Ok(order)
    }

    pub async fn update_order_status(
        &self,
        caller: &Caller,
        request: UpdateOrderStatusRequest,
    ) -> Result<Order, AppError> {
        caller.require_staff()?;

        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;
        let chat = authorized_chat(&mut *tx, request.chat_id, caller).await?;
        let order = lock_latest_order(&mut tx, chat.id).await?;
        let order = apply_order_status(&mut tx, order, request.status).await?;
        tx.commit().await.map_err(AppError::Database)?;

        tracing::info!("Order {} status set to {} by {}", order.id, order.status, caller.user_id);
        Ok(order)
    }

    pub async fn list_orders(&self, caller: &Caller) -> Result<Vec<Order>, AppError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(caller.user_id)
            .fetch_all(&self.db_pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn get_order(&self, caller: &Caller, order_id: Uuid) -> Result<Order, AppError> {
        let order = self.find_order(order_id).await?;

        let owns = order.user_id == Some(caller.user_id) || order.agent_id == Some(caller.user_id);
        if !owns && !caller.is_staff() {
            return Err(AppError::Authorization("You cannot view this order".to_string()));
        }
        Ok(order)
    }

    // Admin

    pub async fn admin_list_orders(&self, query: AdminOrderQuery) -> Result<Paginated<Order>, AppError> {
        let page = PaginationQuery::new(query.page, query.per_page);
        let status = query.status.map(|s| s.as_str());
        let payment_status = query.payment_status.map(|s| s.as_str());

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR payment_status = $2)
              AND ($3::text IS NULL OR service_type = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(status)
        .bind(payment_status)
        .bind(&query.service_type)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR payment_status = $2)
              AND ($3::text IS NULL OR service_type = $3)
            "#,
        )
        .bind(status)
        .bind(payment_status)
        .bind(&query.service_type)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Paginated::new(orders, &page, total))
    }

    pub async fn find_order(&self, order_id: Uuid) -> Result<Order, AppError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    pub async fn admin_update_order(&self, order_id: Uuid, request: UpdateOrderRequest) -> Result<Order, AppError> {
        if matches!(request.total_amount, Some(amount) if amount < Decimal::ZERO) {
            return Err(AppError::Validation("total_amount: must not be negative".to_string()));
        }

        sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                total_amount = COALESCE($2, total_amount),
                no_of_photos = COALESCE($3, no_of_photos),
                delivery_date = COALESCE($4, delivery_date),
                service_type = COALESCE($5, service_type),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(request.total_amount)
        .bind(request.no_of_photos)
        .bind(request.delivery_date)
        .bind(request.service_type.as_deref().map(str::trim))
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, "A pending order for this service already exists"))?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    pub async fn admin_delete_order(&self, order_id: Uuid) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Order not found".to_string()));
        }
        tracing::info!("Order {} deleted", order_id);
        Ok(())
    }

    pub async fn admin_set_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<Order, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;
        let order = lock_order(&mut tx, order_id).await?;
        let order = apply_order_status(&mut tx, order, status).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(order)
    }

    pub async fn admin_set_payment_status(
        &self,
        order_id: Uuid,
        status: PaymentStatus,
        txn: Option<String>,
    ) -> Result<Order, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;
        let order = lock_order(&mut tx, order_id).await?;
        let order = apply_payment_status(&mut tx, order, status, txn).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(order)
    }

    pub async fn list_transactions(&self, query: TransactionQuery) -> Result<Paginated<Transaction>, AppError> {
        let page = PaginationQuery::new(query.page, query.per_page);
        let status = query.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(page.per_page())
        .bind(page.offset())
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(Paginated::new(items, &page, total))
    }

    pub async fn find_transaction(&self, transaction_id: Uuid) -> Result<Transaction, AppError> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
    }

    pub async fn set_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.db_pool.begin().await.map_err(AppError::Database)?;

        let current = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
            .bind(transaction_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(AppError::Conflict(
                "Only pending transactions can change status".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Transaction>(
            "UPDATE transactions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(transaction_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(updated)
    }
}

async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

async fn lock_latest_order(conn: &mut PgConnection, chat_id: Uuid) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE chat_id = $1 ORDER BY created_at DESC LIMIT 1 FOR UPDATE",
    )
    .bind(chat_id)
    .fetch_optional(conn)
    .await
    .map_err(AppError::Database)?
    .ok_or_else(|| AppError::NotFound("No order found for this chat".to_string()))
}

async fn apply_order_status(conn: &mut PgConnection, order: Order, next: OrderStatus) -> Result<Order, AppError> {
    order.status.check_transition(next)?;
    if order.status == next {
        return Ok(order);
    }

    sqlx::query_as::<_, Order>("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(order.id)
        .bind(next)
        .fetch_one(conn)
        .await
        .map_err(AppError::Database)
}

/// Moves the payment status through the transition table and appends a
/// ledger entry once the payment settles.
async fn apply_payment_status(
    conn: &mut PgConnection,
    order: Order,
    next: PaymentStatus,
    txn: Option<String>,
) -> Result<Order, AppError> {
    order.payment_status.check_transition(next)?;
    if order.payment_status == next {
        return Ok(order);
    }

    let updated = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET payment_status = $2, txn = COALESCE($3, txn), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(next)
    .bind(txn)
    .fetch_one(&mut *conn)
    .await
    .map_err(AppError::Database)?;

    if let Some(status) = ledger_status(next) {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, order_id, amount, status, service_type)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(updated.id)
        .bind(updated.total_amount)
        .bind(status)
        .bind(&updated.service_type)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;
    }

    Ok(updated)
}
