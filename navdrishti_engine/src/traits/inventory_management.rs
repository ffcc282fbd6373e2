use thiserror::Error;

use crate::db_types::{InventoryItem, NewInventoryItem};

/// The inventory ledger. The only mutations the engine ever applies are the conditional decrement at
/// payment confirmation and the restore on cancellation/refund; both must be single atomic statements, not
/// read-then-write pairs.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn insert_item(&self, item: NewInventoryItem) -> Result<InventoryItem, InventoryError>;

    async fn fetch_item(&self, item_id: i64) -> Result<Option<InventoryItem>, InventoryError>;

    async fn items_for_seller(&self, seller_id: &str) -> Result<Vec<InventoryItem>, InventoryError>;

    /// Atomic check-and-decrement. The update is guarded with `quantity >= qty AND status = 'Active'`;
    /// zero rows affected means the stock is gone (or the item was withdrawn) and the caller gets
    /// [`InventoryError::InsufficientStock`]. Quantity can never go negative through this path.
    async fn reserve_if_available(&self, item_id: i64, qty: i64) -> Result<(), InventoryError>;

    /// Return stock to the shelf. An item that had sold out flips back from `Sold` to `Active`.
    async fn restore(&self, item_id: i64, qty: i64) -> Result<(), InventoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("We have an internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Item {0} does not exist")]
    ItemNotFound(i64),
    #[error("Item {0} is not available for purchase")]
    ItemNotActive(i64),
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock { item_id: i64, requested: i64, available: i64 },
    #[error("Quantity must be a positive integer, not {0}")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}
