use chrono::Duration;
use log::*;
use navdrishti_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the stale-order expiry worker. Do not await the returned JoinHandle, as it runs indefinitely.
///
/// Orders sit in `PaymentPending` between creation and capture without holding stock. Buyers who abandon
/// checkout leave those orders dangling; this worker cancels any that have been untouched for longer than
/// the configured timeout, which is the reconciliation path for that window.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    pending_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Stale order expiry worker started (timeout {} min)", pending_timeout.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running stale order expiry job");
            match api.expire_stale_orders(pending_timeout).await {
                Ok(expired) if expired.is_empty() => {},
                Ok(expired) => {
                    info!("🕰️ {} unpaid orders expired: {}", expired.len(), order_list(&expired));
                },
                Err(e) => {
                    error!("🕰️ Error running stale order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("{} (buyer {})", o.order_id, o.buyer_id))
        .collect::<Vec<String>>()
        .join(", ")
}
