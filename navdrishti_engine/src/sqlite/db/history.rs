use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderStatusType, StatusChange},
    traits::OrderFlowError,
};

/// Append one audit row. Called inside the same transaction as the transition it records; never on its own.
pub async fn insert_status_change(
    order_id: i64,
    previous_status: Option<OrderStatusType>,
    new_status: OrderStatusType,
    changed_by: &str,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<StatusChange, OrderFlowError> {
    let change = sqlx::query_as(
        r#"
            INSERT INTO order_status_history (order_id, previous_status, new_status, changed_by, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(previous_status.map(|s| s.to_string()))
    .bind(new_status.to_string())
    .bind(changed_by)
    .bind(reason)
    .fetch_one(conn)
    .await?;
    Ok(change)
}

pub async fn fetch_status_history(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusChange>, sqlx::Error> {
    let history = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(history)
}
