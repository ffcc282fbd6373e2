//! End-to-end exercises of the order lifecycle against a real SQLite database.
//!
//! Each test gets its own throwaway database, seeded with a seller listing, and drives the flow the way
//! the server does: create the order, converge on a payment signal, then ship/cancel/refund.

use chrono::{Duration, Utc};
use navdrishti_engine::{
    db_types::{
        InventoryItem,
        ItemQuantity,
        ItemStatus,
        NewInventoryItem,
        NewOrder,
        NewShipment,
        NewTrackingEvent,
        Order,
        OrderStatusType,
        Payment,
        PaymentStatusType,
    },
    helpers::new_order_number,
    ConfirmOutcome,
    FailOutcome,
    InventoryError,
    InventoryManagement,
    OrderFlowDatabase,
    OrderFlowError,
    OrderManagement,
    SqliteDatabase,
};
use nvd_common::Paise;

mod support;

use support::prepare_env::prepare_test_env;

async fn seed_item(db: &SqliteDatabase, seller: &str, price: i64, quantity: i64) -> InventoryItem {
    let item = NewInventoryItem::new(seller, "Handwoven shawl", Paise::from(price), quantity)
        .with_description("Wool, 2m x 1m");
    db.insert_item(item).await.expect("Error seeding inventory item")
}

async fn place_order(
    db: &SqliteDatabase,
    buyer: &str,
    item: &InventoryItem,
    qty: i64,
    gateway_order_id: &str,
) -> (Order, Payment) {
    let total = item.price * qty;
    let order = NewOrder::new(new_order_number(), buyer.to_string(), vec![ItemQuantity {
        item_id: item.id,
        quantity: qty,
    }])
    .with_shipping_address("12 MG Road, Bengaluru 560001")
    .with_gateway_order(gateway_order_id, total);
    db.create_order(order).await.expect("Error creating order")
}

async fn item_quantity(db: &SqliteDatabase, item_id: i64) -> i64 {
    db.fetch_item(item_id).await.unwrap().expect("item should exist").quantity
}

#[tokio::test]
async fn confirm_decrements_stock_exactly_once() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, payment) = place_order(&db, "buyer-1", &item, 2, "gord_001").await;
    assert_eq!(order.status, OrderStatusType::PaymentPending);
    assert_eq!(order.total_amount, Paise::from(100_000));
    assert_eq!(payment.status, PaymentStatusType::Created);
    assert_eq!(item_quantity(&db, item.id).await, 5, "creation must not reserve stock");

    let outcome = db.confirm_payment("gord_001", "pay_001", Some("upi")).await.unwrap();
    assert!(outcome.newly_confirmed());
    assert_eq!(outcome.order().status, OrderStatusType::Confirmed);
    assert_eq!(item_quantity(&db, item.id).await, 3);

    let history = db.fetch_status_history(order.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].new_status, OrderStatusType::Confirmed);
}

#[tokio::test]
async fn replayed_capture_is_a_no_op() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 2, "gord_001").await;

    let first = db.confirm_payment("gord_001", "pay_001", Some("upi")).await.unwrap();
    assert!(first.newly_confirmed());
    for _ in 0..3 {
        let replay = db.confirm_payment("gord_001", "pay_001", Some("upi")).await.unwrap();
        assert!(matches!(replay, ConfirmOutcome::AlreadyConfirmed(_)));
    }
    assert_eq!(item_quantity(&db, item.id).await, 3, "inventory must be decremented exactly once");
    let history = db.fetch_status_history(order.id).await.unwrap();
    assert_eq!(history.len(), 2, "replays must not append history rows");
}

#[tokio::test]
async fn concurrent_confirmations_converge_on_one_winner() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let _ = place_order(&db, "buyer-1", &item, 2, "gord_001").await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.confirm_payment("gord_001", "pay_001", Some("upi")).await.unwrap()
        }));
    }
    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().newly_confirmed() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one caller may win the confirmation race");
    assert_eq!(item_quantity(&db, item.id).await, 3);
}

#[tokio::test]
async fn last_unit_cannot_be_sold_twice() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 1).await;
    // Both orders pass the creation-time stock check; only one can survive confirmation.
    let _ = place_order(&db, "buyer-1", &item, 1, "gord_001").await;
    let _ = place_order(&db, "buyer-2", &item, 1, "gord_002").await;

    let first = db.confirm_payment("gord_001", "pay_001", None).await.unwrap();
    let second = db.confirm_payment("gord_002", "pay_002", None).await.unwrap();
    assert!(first.newly_confirmed());
    assert!(matches!(second, ConfirmOutcome::FlaggedForReconciliation(_)));
    assert_eq!(item_quantity(&db, item.id).await, 0);
    let refreshed = db.fetch_item(item.id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, ItemStatus::Sold);
}

#[tokio::test]
async fn cancel_before_confirmation_leaves_stock_alone() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 2, "gord_001").await;

    let result = db.cancel_order(&order.order_id, "buyer-1", "changed my mind").await.unwrap();
    assert_eq!(result.order.status, OrderStatusType::Cancelled);
    assert!(result.refunded_payment.is_none(), "nothing was captured, nothing to refund");
    assert_eq!(item_quantity(&db, item.id).await, 5);
}

#[tokio::test]
async fn cancel_after_confirmation_refunds_and_restores() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 2, "gord_001").await;
    db.confirm_payment("gord_001", "pay_001", None).await.unwrap();

    let result = db.cancel_order(&order.order_id, "seller-1", "cannot fulfil").await.unwrap();
    assert_eq!(result.order.status, OrderStatusType::Cancelled);
    let refunded = result.refunded_payment.expect("captured payment must be refunded");
    assert_eq!(refunded.status, PaymentStatusType::Refunded);
    assert_eq!(refunded.refund_amount, Some(Paise::from(100_000)));
    assert_eq!(item_quantity(&db, item.id).await, 5);
}

#[tokio::test]
async fn refund_after_confirmation_restores_stock() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 2, "gord_001").await;
    db.confirm_payment("gord_001", "pay_001", None).await.unwrap();
    assert_eq!(item_quantity(&db, item.id).await, 3);

    let (refunded_order, payment) = db.refund_order(&order.order_id, "seller-1", None).await.unwrap();
    assert_eq!(refunded_order.status, OrderStatusType::Refunded);
    assert_eq!(payment.status, PaymentStatusType::Refunded);
    assert_eq!(payment.refund_amount, Some(Paise::from(100_000)));
    assert_eq!(item_quantity(&db, item.id).await, 5);
}

#[tokio::test]
async fn refund_cannot_exceed_the_captured_amount() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 2, "gord_001").await;
    db.confirm_payment("gord_001", "pay_001", None).await.unwrap();

    let err = db.refund_order(&order.order_id, "seller-1", Some(Paise::from(200_000))).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::RefundExceedsCapture { .. }));
}

#[tokio::test]
async fn illegal_transitions_are_rejected() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 1, "gord_001").await;

    // Shipping an unpaid order.
    let shipment = NewShipment {
        carrier: "IndiPost Express".into(),
        waybill: "WB-0001".into(),
        pickup_date: None,
        expected_delivery: None,
    };
    let err = db.create_shipment(&order.order_id, shipment.clone(), "seller-1").await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidStateTransition { .. }));

    // Refunding an unpaid order.
    let err = db.refund_order(&order.order_id, "seller-1", None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::PaymentNotCaptured(_)));

    // Refunding a delivered order.
    db.confirm_payment("gord_001", "pay_001", None).await.unwrap();
    db.create_shipment(&order.order_id, shipment, "seller-1").await.unwrap();
    let event = NewTrackingEvent { status: "Delivered".into(), location: None, occurred_at: Utc::now() };
    let (_, delivered) = db.record_tracking_event("WB-0001", event).await.unwrap();
    assert!(delivered.is_some());
    let err = db.refund_order(&order.order_id, "seller-1", None).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn shipment_and_delivery_flow() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 1, "gord_001").await;
    db.confirm_payment("gord_001", "pay_001", None).await.unwrap();
    let processing = db.mark_processing(&order.order_id, "seller-1").await.unwrap();
    assert_eq!(processing.status, OrderStatusType::Processing);

    let shipment = NewShipment {
        carrier: "IndiPost Express".into(),
        waybill: "WB-0001".into(),
        pickup_date: Some(Utc::now()),
        expected_delivery: None,
    };
    let (shipped, detail) = db.create_shipment(&order.order_id, shipment, "seller-1").await.unwrap();
    assert_eq!(shipped.status, OrderStatusType::Shipped);
    assert_eq!(detail.waybill, "WB-0001");

    let transit = NewTrackingEvent { status: "InTransit".into(), location: Some("Nagpur hub".into()), occurred_at: Utc::now() };
    let (detail, delivered) = db.record_tracking_event("WB-0001", transit).await.unwrap();
    assert_eq!(detail.tracking_status, "InTransit");
    assert!(delivered.is_none());

    let delivery = NewTrackingEvent { status: "Delivered".into(), location: Some("Bengaluru".into()), occurred_at: Utc::now() };
    let (detail, delivered) = db.record_tracking_event("WB-0001", delivery.clone()).await.unwrap();
    let delivered = delivered.expect("delivery event must close the order");
    assert_eq!(delivered.status, OrderStatusType::Delivered);
    assert!(detail.actual_delivery.is_some());

    // Carrier replays the delivery event; nothing changes.
    let (_, replay) = db.record_tracking_event("WB-0001", delivery).await.unwrap();
    assert!(replay.is_none());
    let events = db.fetch_tracking_events("WB-0001").await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn failed_payment_cancels_a_pending_order() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 1, "gord_001").await;

    let outcome = db.fail_payment("gord_001", "pay_001", Some("card declined")).await.unwrap();
    match outcome {
        FailOutcome::Cancelled(o) => assert_eq!(o.order_id, order.order_id),
        other => panic!("Expected Cancelled, got {other:?}"),
    }
    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Cancelled);
    assert_eq!(item_quantity(&db, item.id).await, 5);
    // The order was settled; a replay of the failure resolves quietly.
    let replay = db.fail_payment("gord_001", "pay_001", Some("card declined")).await.unwrap();
    assert!(matches!(replay, FailOutcome::AlreadyResolved(_)));
}

#[tokio::test]
async fn stale_failure_never_unconfirms_an_order() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 1, "gord_001").await;
    db.confirm_payment("gord_001", "pay_001", None).await.unwrap();

    let outcome = db.fail_payment("gord_001", "pay_001", Some("late failure")).await.unwrap();
    assert!(matches!(outcome, FailOutcome::Stale(_)));
    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Confirmed);
    assert_eq!(item_quantity(&db, item.id).await, 4);
}

#[tokio::test]
async fn order_creation_guards() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 2).await;

    // More stock than the shelf holds.
    let order = NewOrder::new(new_order_number(), "buyer-1".to_string(), vec![ItemQuantity {
        item_id: item.id,
        quantity: 3,
    }])
    .with_shipping_address("12 MG Road, Bengaluru")
    .with_gateway_order("gord_001", item.price * 3);
    let err = db.create_order(order).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Inventory(InventoryError::InsufficientStock { .. })));

    // Buying your own listing.
    let order = NewOrder::new(new_order_number(), "seller-1".to_string(), vec![ItemQuantity {
        item_id: item.id,
        quantity: 1,
    }])
    .with_shipping_address("12 MG Road, Bengaluru")
    .with_gateway_order("gord_002", item.price);
    let err = db.create_order(order).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::BuyerIsSeller));

    // Gateway order issued for a different amount than the catalog resolves to.
    let order = NewOrder::new(new_order_number(), "buyer-1".to_string(), vec![ItemQuantity {
        item_id: item.id,
        quantity: 1,
    }])
    .with_shipping_address("12 MG Road, Bengaluru")
    .with_gateway_order("gord_003", Paise::from(1));
    let err = db.create_order(order).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::AmountMismatch { .. }));
}

#[tokio::test]
async fn stale_pending_orders_are_expired() {
    let (db, _url) = prepare_test_env().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = place_order(&db, "buyer-1", &item, 1, "gord_001").await;

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let expired = db.expire_stale_orders(Duration::zero()).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].order_id, order.order_id);
    assert_eq!(expired[0].status, OrderStatusType::Cancelled);

    // A capture arriving for an expired order must not confirm it.
    let outcome = db.confirm_payment("gord_001", "pay_001", None).await.unwrap();
    assert!(matches!(outcome, ConfirmOutcome::FlaggedForReconciliation(_)));
    assert_eq!(item_quantity(&db, item.id).await, 5);
}
