use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewShipment, NewTrackingEvent, ShippingDetail, TrackingEvent},
    traits::OrderFlowError,
};

pub async fn insert_shipment(
    order_id: i64,
    shipment: NewShipment,
    conn: &mut SqliteConnection,
) -> Result<ShippingDetail, OrderFlowError> {
    let detail = sqlx::query_as(
        r#"
            INSERT INTO shipping_details (order_id, waybill, carrier, pickup_date, expected_delivery)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(shipment.waybill)
    .bind(shipment.carrier)
    .bind(shipment.pickup_date)
    .bind(shipment.expected_delivery)
    .fetch_one(conn)
    .await?;
    Ok(detail)
}

pub async fn fetch_shipment_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ShippingDetail>, sqlx::Error> {
    let detail = sqlx::query_as("SELECT * FROM shipping_details WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(detail)
}

pub async fn fetch_shipment_by_waybill(
    waybill: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ShippingDetail>, sqlx::Error> {
    let detail = sqlx::query_as("SELECT * FROM shipping_details WHERE waybill = $1")
        .bind(waybill)
        .fetch_optional(conn)
        .await?;
    Ok(detail)
}

pub async fn fetch_tracking_events(
    waybill: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<TrackingEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM tracking_events WHERE waybill = $1 ORDER BY occurred_at ASC, id ASC")
        .bind(waybill)
        .fetch_all(conn)
        .await?;
    Ok(events)
}

/// Append a tracking event. The `(waybill, status, occurred_at)` uniqueness constraint makes carrier
/// replays no-ops; `false` is returned when the event was already on file.
pub async fn append_tracking_event(
    waybill: &str,
    event: &NewTrackingEvent,
    conn: &mut SqliteConnection,
) -> Result<bool, OrderFlowError> {
    let result = sqlx::query(
        r#"
            INSERT INTO tracking_events (waybill, status, location, occurred_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (waybill, status, occurred_at) DO NOTHING;
        "#,
    )
    .bind(waybill)
    .bind(&event.status)
    .bind(&event.location)
    .bind(event.occurred_at)
    .execute(conn)
    .await?;
    let inserted = result.rows_affected() == 1;
    trace!("🗃️🚚️ Tracking event [{}] for {waybill} {}", event.status, if inserted { "appended" } else { "replayed" });
    Ok(inserted)
}

pub async fn update_tracking_status(
    waybill: &str,
    status: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ShippingDetail>, OrderFlowError> {
    let detail = sqlx::query_as(
        "UPDATE shipping_details SET tracking_status = $1, updated_at = CURRENT_TIMESTAMP WHERE waybill = $2 \
         RETURNING *",
    )
    .bind(status)
    .bind(waybill)
    .fetch_optional(conn)
    .await?;
    Ok(detail)
}

pub async fn stamp_actual_delivery(
    waybill: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ShippingDetail>, OrderFlowError> {
    let detail = sqlx::query_as(
        "UPDATE shipping_details SET actual_delivery = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE \
         waybill = $1 AND actual_delivery IS NULL RETURNING *",
    )
    .bind(waybill)
    .fetch_optional(conn)
    .await?;
    Ok(detail)
}
