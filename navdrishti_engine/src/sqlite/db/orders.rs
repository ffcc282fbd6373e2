use chrono::Duration;
use log::{debug, trace};
use nvd_common::Paise;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    api::order_objects::OrderQueryFilter,
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType},
    traits::OrderFlowError,
};

/// Insert the order row. The seller and total are resolved by the caller inside the same transaction,
/// from the catalog rows being snapshotted.
pub async fn insert_order(
    order: &NewOrder,
    seller_id: &str,
    total_amount: Paise,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderFlowError> {
    let order_id = &order.order_id;
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                buyer_id,
                seller_id,
                total_amount,
                currency,
                shipping_address,
                billing_address,
                memo
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(&order.buyer_id)
    .bind(seller_id)
    .bind(total_amount)
    .bind(&order.currency)
    .bind(&order.shipping_address)
    .bind(order.billing_address.as_deref())
    .bind(order.memo.as_deref())
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order {order_id} inserted");
    Ok(inserted)
}

pub async fn insert_order_item(
    order_id: i64,
    item_id: i64,
    quantity: i64,
    unit_price: Paise,
    snapshot: &str,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, OrderFlowError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, item_id, quantity, unit_price, total_price, item_snapshot)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(unit_price * quantity)
    .bind(snapshot)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order_by_number(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Conditionally move an order to `new_status`. The legal source states travel in the WHERE clause, so a
/// concurrent writer that already moved the order simply sees zero rows here; `None` is returned and the
/// caller decides whether that is a race loss (fine) or an illegal transition (error).
pub async fn transition_order(
    id: i64,
    from: &[OrderStatusType],
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let mut builder =
        QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = ");
    builder.push_bind(new_status.to_string());
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for status in from {
        statuses.push_bind(status.to_string());
    }
    builder.push(") RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.as_str().to_string());
    }
    if let Some(buyer) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer);
    }
    if let Some(seller) = query.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let mut statuses = vec![];
        query.status.as_ref().unwrap().iter().for_each(|s| {
            statuses.push(format!("'{s}'"));
        });
        let status_clause = statuses.join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("📝️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}

/// Cancel `PaymentPending` orders that have not been updated for longer than `limit`.
pub async fn expire_stale_orders(
    limit: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, OrderFlowError> {
    let rows = sqlx::query_as(
        format!(
            "UPDATE orders SET updated_at = CURRENT_TIMESTAMP, status = 'Cancelled' WHERE status = \
             'PaymentPending' AND (unixepoch(CURRENT_TIMESTAMP) - unixepoch(updated_at)) > {} RETURNING *;",
            limit.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
