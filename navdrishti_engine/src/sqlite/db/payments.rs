use log::trace;
use nvd_common::Paise;
use sqlx::SqliteConnection;

use crate::{
    db_types::Payment,
    traits::OrderFlowError,
};

pub async fn insert_payment(
    order_id: i64,
    gateway_order_id: &str,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Payment, OrderFlowError> {
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, gateway_order_id, amount) VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(gateway_order_id)
    .bind(amount)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            OrderFlowError::PaymentAlreadyExists(gateway_order_id.to_string())
        },
        _ => OrderFlowError::from(e),
    })?;
    Ok(payment)
}

pub async fn fetch_payment_by_gateway_order_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payment_by_gateway_payment_id(
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE gateway_payment_id = $1")
        .bind(gateway_payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payment_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Conditionally record a capture. The status guard in the WHERE clause makes this the idempotency point
/// for the verify-payment/webhook race: only the first caller flips the row, everyone else sees `None`.
pub async fn capture_payment(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    method: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, OrderFlowError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = 'Captured',
                gateway_payment_id = $1,
                method = $2,
                captured_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE gateway_order_id = $3 AND status IN ('Created', 'Pending')
            RETURNING *;
        "#,
    )
    .bind(gateway_payment_id)
    .bind(method)
    .bind(gateway_order_id)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️💰️ capture_payment for [{gateway_payment_id}] affected {} row(s)", i32::from(payment.is_some()));
    Ok(payment)
}

/// Conditionally record a failed attempt; same discipline as [`capture_payment`].
pub async fn fail_payment(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, OrderFlowError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = 'Failed',
                gateway_payment_id = $1,
                failure_reason = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE gateway_order_id = $3 AND status IN ('Created', 'Pending')
            RETURNING *;
        "#,
    )
    .bind(gateway_payment_id)
    .bind(reason)
    .bind(gateway_order_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Mark a captured payment as refunded. Guarded on `Captured` so a double refund affects zero rows.
pub async fn refund_payment(
    payment_id: i64,
    amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, OrderFlowError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = 'Refunded',
                refund_amount = $1,
                refunded_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'Captured'
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(payment_id)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
