use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InventoryItem, NewInventoryItem},
    traits::InventoryError,
};

pub async fn insert_item(
    item: NewInventoryItem,
    conn: &mut SqliteConnection,
) -> Result<InventoryItem, InventoryError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO inventory_items (seller_id, name, description, price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(item.seller_id)
    .bind(item.name)
    .bind(item.description)
    .bind(item.price)
    .bind(item.quantity)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_item(item_id: i64, conn: &mut SqliteConnection) -> Result<Option<InventoryItem>, InventoryError> {
    let item = sqlx::query_as("SELECT * FROM inventory_items WHERE id = $1")
        .bind(item_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

pub async fn items_for_seller(
    seller_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryItem>, InventoryError> {
    let items = sqlx::query_as("SELECT * FROM inventory_items WHERE seller_id = $1 ORDER BY created_at ASC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Atomic check-and-decrement. The WHERE clause carries the stock and status guards, so two buyers racing
/// for the last unit resolve inside SQLite: one update affects a row, the other affects zero rows and maps
/// to [`InventoryError::InsufficientStock`]. Quantity cannot go negative through this path.
pub async fn reserve_if_available(
    item_id: i64,
    qty: i64,
    conn: &mut SqliteConnection,
) -> Result<(), InventoryError> {
    if qty <= 0 {
        return Err(InventoryError::InvalidQuantity(qty));
    }
    let result = sqlx::query(
        r#"
            UPDATE inventory_items
            SET quantity = quantity - $1,
                status = CASE WHEN quantity - $1 = 0 THEN 'Sold' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'Active' AND quantity >= $1
        "#,
    )
    .bind(qty)
    .bind(item_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 1 {
        trace!("🗃️📦️ Reserved {qty} units of item {item_id}");
        return Ok(());
    }
    // Zero rows: work out why so the caller gets a precise error.
    match fetch_item(item_id, conn).await? {
        None => Err(InventoryError::ItemNotFound(item_id)),
        Some(item) if item.status != crate::db_types::ItemStatus::Active => {
            Err(InventoryError::ItemNotActive(item_id))
        },
        Some(item) => {
            Err(InventoryError::InsufficientStock { item_id, requested: qty, available: item.quantity })
        },
    }
}

/// Return stock to the shelf. Items that sold out flip back from `Sold` to `Active`.
pub async fn restore(item_id: i64, qty: i64, conn: &mut SqliteConnection) -> Result<(), InventoryError> {
    if qty <= 0 {
        return Err(InventoryError::InvalidQuantity(qty));
    }
    let result = sqlx::query(
        r#"
            UPDATE inventory_items
            SET quantity = quantity + $1,
                status = CASE WHEN status = 'Sold' THEN 'Active' ELSE status END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
        "#,
    )
    .bind(qty)
    .bind(item_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(InventoryError::ItemNotFound(item_id));
    }
    trace!("🗃️📦️ Restored {qty} units of item {item_id}");
    Ok(())
}
