//! `SqliteDatabase` is a concrete implementation of a Navdrishti order-flow backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. The idempotency and no-oversell guarantees all reduce to conditional UPDATE statements here: the
//! WHERE clause carries the state guard, and a zero-row result means another writer got there first.

use std::fmt::Debug;

use chrono::Duration;
use log::*;
use nvd_common::Paise;
use sqlx::SqlitePool;

use super::db::{db_url, history, inventory, new_pool, orders, payments, shipping};
use crate::{
    api::order_objects::OrderQueryFilter,
    db_types::{
        InventoryItem,
        ItemStatus,
        NewInventoryItem,
        NewOrder,
        NewShipment,
        NewTrackingEvent,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        Payment,
        PaymentStatusType,
        ShippingDetail,
        StatusChange,
        TrackingEvent,
    },
    traits::{
        CancelResult,
        ConfirmOutcome,
        FailOutcome,
        InventoryError,
        InventoryManagement,
        OrderFlowDatabase,
        OrderFlowError,
        OrderManagement,
        OrderQueryError,
    },
};

/// Actor recorded in the audit trail for transitions driven by the payment gateway.
const GATEWAY_ACTOR: &str = "gateway";
/// Actor recorded for transitions driven by carrier tracking updates.
const CARRIER_ACTOR: &str = "carrier";
/// Actor recorded for transitions applied by background workers.
const SYSTEM_ACTOR: &str = "system";

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderFlowDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order(&self, order: NewOrder) -> Result<(Order, Payment), OrderFlowError> {
        if order.items.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        let mut tx = self.pool.begin().await?;
        let mut seller_id: Option<String> = None;
        let mut total = Paise::default();
        let mut resolved = Vec::with_capacity(order.items.len());
        for line in &order.items {
            if line.quantity <= 0 {
                return Err(InventoryError::InvalidQuantity(line.quantity).into());
            }
            let item = inventory::fetch_item(line.item_id, &mut tx)
                .await?
                .ok_or(InventoryError::ItemNotFound(line.item_id))?;
            if item.status != ItemStatus::Active {
                return Err(InventoryError::ItemNotActive(item.id).into());
            }
            if item.quantity < line.quantity {
                return Err(InventoryError::InsufficientStock {
                    item_id: item.id,
                    requested: line.quantity,
                    available: item.quantity,
                }
                .into());
            }
            if item.seller_id == order.buyer_id {
                return Err(OrderFlowError::BuyerIsSeller);
            }
            match &seller_id {
                None => seller_id = Some(item.seller_id.clone()),
                Some(s) if s != &item.seller_id => return Err(OrderFlowError::MixedSellers),
                Some(_) => {},
            }
            total += item.price * line.quantity;
            resolved.push((item, line.quantity));
        }
        if total != order.expected_total {
            return Err(OrderFlowError::AmountMismatch { expected: total, actual: order.expected_total });
        }
        let seller_id = seller_id.ok_or(OrderFlowError::EmptyOrder)?;
        let db_order = orders::insert_order(&order, &seller_id, total, &mut tx).await?;
        for (item, qty) in &resolved {
            let snapshot =
                serde_json::to_string(item).map_err(|e| OrderFlowError::DatabaseError(e.to_string()))?;
            orders::insert_order_item(db_order.id, item.id, *qty, item.price, &snapshot, &mut tx).await?;
        }
        let payment = payments::insert_payment(db_order.id, &order.gateway_order_id, total, &mut tx).await?;
        history::insert_status_change(
            db_order.id,
            None,
            OrderStatusType::PaymentPending,
            &order.buyer_id,
            Some("order created"),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!("🗃️📦️ Order {} saved with payment row for gateway order {}", db_order.order_id, payment.gateway_order_id);
        Ok((db_order, payment))
    }

    async fn confirm_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        method: Option<&str>,
    ) -> Result<ConfirmOutcome, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        // The conditional capture is the idempotency point. Exactly one caller ever sees Some here for a
        // given gateway order; replays and race losers fall through to the status triage below.
        let payment = match payments::capture_payment(gateway_order_id, gateway_payment_id, method, &mut tx).await? {
            Some(p) => p,
            None => {
                let existing = payments::fetch_payment_by_gateway_order_id(gateway_order_id, &mut tx)
                    .await?
                    .ok_or_else(|| OrderFlowError::PaymentNotFound(gateway_order_id.to_string()))?;
                let order = orders::fetch_order_by_id(existing.order_id, &mut tx)
                    .await?
                    .ok_or(OrderFlowError::OrderIdNotFound(existing.order_id))?;
                tx.commit().await?;
                return match (existing.status, order.status) {
                    (PaymentStatusType::Captured | PaymentStatusType::Refunded, OrderStatusType::PaymentPending) => {
                        // Captured earlier but never confirmed (stock ran out). Try again; stock may be back.
                        self.retry_confirmation(order, gateway_payment_id).await
                    },
                    (PaymentStatusType::Captured | PaymentStatusType::Refunded, _) => {
                        Ok(ConfirmOutcome::AlreadyConfirmed(order))
                    },
                    (PaymentStatusType::Failed, _) => {
                        // A capture arriving after we recorded a failure (out-of-order delivery on a
                        // cancelled order). Funds were taken; hand it to a human.
                        error!(
                            "🗃️💰️ Capture [{gateway_payment_id}] arrived for gateway order {gateway_order_id} after \
                             the payment was marked as failed. Order {} is {}. Flagging for manual reconciliation.",
                            order.order_id, order.status
                        );
                        Ok(ConfirmOutcome::FlaggedForReconciliation(order))
                    },
                    (status, _) => Err(OrderFlowError::DatabaseError(format!(
                        "Payment for gateway order {gateway_order_id} is in unexpected state {status}"
                    ))),
                };
            },
        };
        match orders::transition_order(
            payment.order_id,
            &[OrderStatusType::PaymentPending],
            OrderStatusType::Confirmed,
            &mut tx,
        )
        .await?
        {
            Some(order) => {
                let items = orders::fetch_order_items(order.id, &mut tx).await?;
                for line in &items {
                    match inventory::reserve_if_available(line.item_id, line.quantity, &mut tx).await {
                        Ok(()) => {},
                        Err(
                            InventoryError::InsufficientStock { .. }
                            | InventoryError::ItemNotActive(_)
                            | InventoryError::ItemNotFound(_),
                        ) => {
                            // The stock promised at creation is gone. Roll the confirmation back, then
                            // record the capture on its own so the money is not lost track of.
                            tx.rollback().await?;
                            return self
                                .flag_for_reconciliation(gateway_order_id, gateway_payment_id, method)
                                .await;
                        },
                        Err(e) => return Err(e.into()),
                    }
                }
                history::insert_status_change(
                    order.id,
                    Some(OrderStatusType::PaymentPending),
                    OrderStatusType::Confirmed,
                    GATEWAY_ACTOR,
                    Some(&format!("payment {gateway_payment_id} captured")),
                    &mut tx,
                )
                .await?;
                tx.commit().await?;
                debug!("🗃️✅️ Order {} confirmed by payment [{gateway_payment_id}]", order.order_id);
                Ok(ConfirmOutcome::Confirmed(order))
            },
            None => {
                // The payment row was ours but the order has already left PaymentPending. The only way
                // this happens is a cancellation racing the capture.
                let order = orders::fetch_order_by_id(payment.order_id, &mut tx)
                    .await?
                    .ok_or(OrderFlowError::OrderIdNotFound(payment.order_id))?;
                tx.commit().await?;
                warn!(
                    "🗃️💰️ Payment [{gateway_payment_id}] captured but order {} is already {}. Flagging for manual \
                     reconciliation.",
                    order.order_id, order.status
                );
                Ok(ConfirmOutcome::FlaggedForReconciliation(order))
            },
        }
    }

    async fn fail_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        reason: Option<&str>,
    ) -> Result<FailOutcome, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        match payments::fail_payment(gateway_order_id, gateway_payment_id, reason, &mut tx).await? {
            Some(payment) => {
                match orders::transition_order(
                    payment.order_id,
                    &[OrderStatusType::PaymentPending],
                    OrderStatusType::Cancelled,
                    &mut tx,
                )
                .await?
                {
                    Some(order) => {
                        history::insert_status_change(
                            order.id,
                            Some(OrderStatusType::PaymentPending),
                            OrderStatusType::Cancelled,
                            GATEWAY_ACTOR,
                            Some(reason.unwrap_or("payment failed")),
                            &mut tx,
                        )
                        .await?;
                        tx.commit().await?;
                        Ok(FailOutcome::Cancelled(order))
                    },
                    None => {
                        let order = orders::fetch_order_by_id(payment.order_id, &mut tx)
                            .await?
                            .ok_or(OrderFlowError::OrderIdNotFound(payment.order_id))?;
                        tx.commit().await?;
                        Ok(FailOutcome::Stale(order))
                    },
                }
            },
            None => {
                let existing = payments::fetch_payment_by_gateway_order_id(gateway_order_id, &mut tx)
                    .await?
                    .ok_or_else(|| OrderFlowError::PaymentNotFound(gateway_order_id.to_string()))?;
                let order = orders::fetch_order_by_id(existing.order_id, &mut tx)
                    .await?
                    .ok_or(OrderFlowError::OrderIdNotFound(existing.order_id))?;
                tx.commit().await?;
                match existing.status {
                    PaymentStatusType::Failed => Ok(FailOutcome::AlreadyResolved(order)),
                    _ => Ok(FailOutcome::Stale(order)),
                }
            },
        }
    }

    async fn mark_processing(&self, order_id: &OrderId, actor: &str) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let updated =
            orders::transition_order(order.id, &[OrderStatusType::Confirmed], OrderStatusType::Processing, &mut tx)
                .await?
                .ok_or(OrderFlowError::InvalidStateTransition {
                    order_id: order_id.clone(),
                    from: order.status,
                    to: OrderStatusType::Processing,
                })?;
        history::insert_status_change(
            order.id,
            Some(order.status),
            OrderStatusType::Processing,
            actor,
            None,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn create_shipment(
        &self,
        order_id: &OrderId,
        shipment: NewShipment,
        actor: &str,
    ) -> Result<(Order, ShippingDetail), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if shipping::fetch_shipment_for_order(order.id, &mut tx).await?.is_some() {
            return Err(OrderFlowError::ShipmentAlreadyExists(order_id.clone()));
        }
        let updated = orders::transition_order(
            order.id,
            &[OrderStatusType::Confirmed, OrderStatusType::Processing],
            OrderStatusType::Shipped,
            &mut tx,
        )
        .await?
        .ok_or(OrderFlowError::InvalidStateTransition {
            order_id: order_id.clone(),
            from: order.status,
            to: OrderStatusType::Shipped,
        })?;
        let waybill = shipment.waybill.clone();
        let detail = shipping::insert_shipment(order.id, shipment, &mut tx).await?;
        history::insert_status_change(
            order.id,
            Some(order.status),
            OrderStatusType::Shipped,
            actor,
            Some(&format!("waybill {waybill}")),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok((updated, detail))
    }

    async fn record_tracking_event(
        &self,
        waybill: &str,
        event: NewTrackingEvent,
    ) -> Result<(ShippingDetail, Option<Order>), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let detail = shipping::fetch_shipment_by_waybill(waybill, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::ShipmentNotFound(waybill.to_string()))?;
        let inserted = shipping::append_tracking_event(waybill, &event, &mut tx).await?;
        if !inserted {
            // Replayed carrier event; nothing changes.
            tx.commit().await?;
            return Ok((detail, None));
        }
        let mut detail = shipping::update_tracking_status(waybill, &event.status, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::ShipmentNotFound(waybill.to_string()))?;
        let mut delivered_order = None;
        if event.is_delivery() {
            if let Some(stamped) = shipping::stamp_actual_delivery(waybill, &mut tx).await? {
                detail = stamped;
            }
            match orders::transition_order(
                detail.order_id,
                &[OrderStatusType::Shipped],
                OrderStatusType::Delivered,
                &mut tx,
            )
            .await?
            {
                Some(order) => {
                    history::insert_status_change(
                        order.id,
                        Some(OrderStatusType::Shipped),
                        OrderStatusType::Delivered,
                        CARRIER_ACTOR,
                        Some(&format!("waybill {waybill} delivered")),
                        &mut tx,
                    )
                    .await?;
                    delivered_order = Some(order);
                },
                None => {
                    warn!("🗃️🚚️ Delivery event for waybill {waybill} but the order is not in Shipped state");
                },
            }
        }
        tx.commit().await?;
        Ok((detail, delivered_order))
    }

    async fn cancel_order(&self, order_id: &OrderId, actor: &str, reason: &str) -> Result<CancelResult, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let updated = orders::transition_order(
            order.id,
            &[OrderStatusType::PaymentPending, OrderStatusType::Confirmed],
            OrderStatusType::Cancelled,
            &mut tx,
        )
        .await?
        .ok_or(OrderFlowError::InvalidStateTransition {
            order_id: order_id.clone(),
            from: order.status,
            to: OrderStatusType::Cancelled,
        })?;
        // Stock was only taken at confirmation, so only a confirmed order returns it.
        if order.status == OrderStatusType::Confirmed {
            let items = orders::fetch_order_items(order.id, &mut tx).await?;
            for line in &items {
                inventory::restore(line.item_id, line.quantity, &mut tx).await?;
            }
        }
        let mut refunded_payment = None;
        if let Some(payment) = payments::fetch_payment_for_order(order.id, &mut tx).await? {
            if payment.status == PaymentStatusType::Captured {
                refunded_payment = payments::refund_payment(payment.id, payment.amount, &mut tx).await?;
            }
        }
        history::insert_status_change(
            order.id,
            Some(order.status),
            OrderStatusType::Cancelled,
            actor,
            Some(reason),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!("🗃️🛑️ Order {order_id} cancelled by {actor}");
        Ok(CancelResult { order: updated, refunded_payment })
    }

    async fn refund_order(
        &self,
        order_id: &OrderId,
        actor: &str,
        amount: Option<Paise>,
    ) -> Result<(Order, Payment), OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let payment = payments::fetch_payment_for_order(order.id, &mut tx)
            .await?
            .filter(|p| p.status == PaymentStatusType::Captured)
            .ok_or_else(|| OrderFlowError::PaymentNotCaptured(order_id.clone()))?;
        let amount = amount.unwrap_or(payment.amount);
        if amount.value() <= 0 {
            return Err(OrderFlowError::InvalidRefundAmount(amount));
        }
        if amount > payment.amount {
            return Err(OrderFlowError::RefundExceedsCapture { requested: amount, captured: payment.amount });
        }
        let updated = orders::transition_order(
            order.id,
            &[OrderStatusType::Confirmed, OrderStatusType::Processing, OrderStatusType::Shipped],
            OrderStatusType::Refunded,
            &mut tx,
        )
        .await?
        .ok_or(OrderFlowError::InvalidStateTransition {
            order_id: order_id.clone(),
            from: order.status,
            to: OrderStatusType::Refunded,
        })?;
        let refunded = payments::refund_payment(payment.id, amount, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::PaymentNotCaptured(order_id.clone()))?;
        let items = orders::fetch_order_items(order.id, &mut tx).await?;
        for line in &items {
            inventory::restore(line.item_id, line.quantity, &mut tx).await?;
        }
        history::insert_status_change(
            order.id,
            Some(order.status),
            OrderStatusType::Refunded,
            actor,
            Some(&format!("refunded {amount}")),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!("🗃️↩️ Order {order_id} refunded ({amount}) by {actor}");
        Ok((updated, refunded))
    }

    async fn expire_stale_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let expired = orders::expire_stale_orders(older_than, &mut tx).await?;
        for order in &expired {
            history::insert_status_change(
                order.id,
                Some(OrderStatusType::PaymentPending),
                OrderStatusType::Cancelled,
                SYSTEM_ACTOR,
                Some("stock reservation timeout"),
                &mut tx,
            )
            .await?;
        }
        tx.commit().await?;
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Record a capture that cannot confirm its order (stock exhausted or the order already annulled). The
    /// capture and an audit row commit together; the order status is left untouched for the
    /// reconciliation queue.
    async fn flag_for_reconciliation(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        method: Option<&str>,
    ) -> Result<ConfirmOutcome, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let payment = match payments::capture_payment(gateway_order_id, gateway_payment_id, method, &mut tx).await? {
            Some(p) => p,
            None => payments::fetch_payment_by_gateway_order_id(gateway_order_id, &mut tx)
                .await?
                .ok_or_else(|| OrderFlowError::PaymentNotFound(gateway_order_id.to_string()))?,
        };
        let order = orders::fetch_order_by_id(payment.order_id, &mut tx)
            .await?
            .ok_or(OrderFlowError::OrderIdNotFound(payment.order_id))?;
        history::insert_status_change(
            order.id,
            Some(order.status),
            order.status,
            GATEWAY_ACTOR,
            Some(&format!("payment {gateway_payment_id} captured but insufficient stock at confirmation")),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        warn!(
            "🗃️🚩️ Payment [{gateway_payment_id}] captured without stock to confirm order {}. Manual reconciliation \
             required.",
            order.order_id
        );
        Ok(ConfirmOutcome::FlaggedForReconciliation(order))
    }

    /// Re-attempt confirmation of an order whose payment was captured earlier but could not be confirmed
    /// at the time. Runs the same conditional transition + decrement as the first attempt.
    async fn retry_confirmation(
        &self,
        order: Order,
        gateway_payment_id: &str,
    ) -> Result<ConfirmOutcome, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        match orders::transition_order(
            order.id,
            &[OrderStatusType::PaymentPending],
            OrderStatusType::Confirmed,
            &mut tx,
        )
        .await?
        {
            Some(confirmed) => {
                let items = orders::fetch_order_items(confirmed.id, &mut tx).await?;
                for line in &items {
                    match inventory::reserve_if_available(line.item_id, line.quantity, &mut tx).await {
                        Ok(()) => {},
                        Err(
                            InventoryError::InsufficientStock { .. }
                            | InventoryError::ItemNotActive(_)
                            | InventoryError::ItemNotFound(_),
                        ) => {
                            tx.rollback().await?;
                            return Ok(ConfirmOutcome::FlaggedForReconciliation(order));
                        },
                        Err(e) => return Err(e.into()),
                    }
                }
                history::insert_status_change(
                    confirmed.id,
                    Some(OrderStatusType::PaymentPending),
                    OrderStatusType::Confirmed,
                    GATEWAY_ACTOR,
                    Some(&format!("payment {gateway_payment_id} captured (retried)")),
                    &mut tx,
                )
                .await?;
                tx.commit().await?;
                Ok(ConfirmOutcome::Confirmed(confirmed))
            },
            None => {
                tx.commit().await?;
                Ok(ConfirmOutcome::AlreadyConfirmed(order))
            },
        }
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_number(&self, order_id: &OrderId) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let order = orders::fetch_order_by_number(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let payment = payments::fetch_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Payment>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let payment = payments::fetch_payment_by_gateway_order_id(gateway_order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_shipment_for_order(&self, order_id: i64) -> Result<Option<ShippingDetail>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let detail = shipping::fetch_shipment_for_order(order_id, &mut conn).await?;
        Ok(detail)
    }

    async fn fetch_shipment_by_waybill(&self, waybill: &str) -> Result<Option<ShippingDetail>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let detail = shipping::fetch_shipment_by_waybill(waybill, &mut conn).await?;
        Ok(detail)
    }

    async fn fetch_tracking_events(&self, waybill: &str) -> Result<Vec<TrackingEvent>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let events = shipping::fetch_tracking_events(waybill, &mut conn).await?;
        Ok(events)
    }

    async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusChange>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let history = history::fetch_status_history(order_id, &mut conn).await?;
        Ok(history)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn insert_item(&self, item: NewInventoryItem) -> Result<InventoryItem, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::insert_item(item, &mut conn).await
    }

    async fn fetch_item(&self, item_id: i64) -> Result<Option<InventoryItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_item(item_id, &mut conn).await
    }

    async fn items_for_seller(&self, seller_id: &str) -> Result<Vec<InventoryItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::items_for_seller(seller_id, &mut conn).await
    }

    async fn reserve_if_available(&self, item_id: i64, qty: i64) -> Result<(), InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::reserve_if_available(item_id, qty, &mut conn).await
    }

    async fn restore(&self, item_id: i64, qty: i64) -> Result<(), InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::restore(item_id, qty, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
