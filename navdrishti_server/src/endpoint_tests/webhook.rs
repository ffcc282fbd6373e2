use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use gateway_tools::helpers::webhook_signature;
use navdrishti_engine::{
    db_types::{OrderStatusType, PaymentStatusType},
    events::EventProducers,
    InventoryManagement,
    OrderFlowApi,
    OrderFlowDatabase,
    OrderManagement,
    SqliteDatabase,
};
use nvd_common::Secret;
use serde_json::json;

use super::helpers::{seed_item, seed_order, send_request, test_db, WEBHOOK_SECRET};
use crate::{middleware::HmacMiddlewareFactory, webhook_routes::payments_webhook};

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/payments")
                .wrap(HmacMiddlewareFactory::new("X-Signature", Secret::new(WEBHOOK_SECRET.to_string()), true))
                .route("/webhook", web::post().to(payments_webhook::<SqliteDatabase>)),
        );
    }
}

fn captured_event(gateway_order_id: &str, payment_id: &str, amount: i64) -> String {
    json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": {
            "id": payment_id,
            "order_id": gateway_order_id,
            "amount": amount,
            "currency": "INR",
            "status": "captured",
            "method": "upi"
        }}}
    })
    .to_string()
}

fn failed_event(gateway_order_id: &str, payment_id: &str) -> String {
    json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": {
            "id": payment_id,
            "order_id": gateway_order_id,
            "amount": 0,
            "currency": "INR",
            "status": "failed",
            "error_description": "card declined"
        }}}
    })
    .to_string()
}

fn signed_webhook(body: &str) -> TestRequest {
    let signature = webhook_signature(body.as_bytes(), WEBHOOK_SECRET);
    TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("X-Signature", signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn captured_webhook_confirms_the_order() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 2, "gord_001").await;

    let body = captured_event("gord_001", "pay_001", 100_000);
    let (status, resp) = send_request(signed_webhook(&body), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {resp}");

    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Confirmed);
    let payment = db.fetch_payment_for_order(refreshed.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Captured);
    assert_eq!(payment.gateway_payment_id.as_deref(), Some("pay_001"));
    assert_eq!(db.fetch_item(item.id).await.unwrap().unwrap().quantity, 3);
}

#[actix_web::test]
async fn replayed_webhook_deliveries_are_idempotent() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 2, "gord_001").await;

    let body = captured_event("gord_001", "pay_001", 100_000);
    for _ in 0..3 {
        let (status, _) = send_request(signed_webhook(&body), configure(db.clone())).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(db.fetch_item(item.id).await.unwrap().unwrap().quantity, 3, "stock decremented exactly once");
    let history = db.fetch_status_history(order.id).await.unwrap();
    assert_eq!(history.len(), 2);
}

#[actix_web::test]
async fn tampered_webhook_body_is_rejected_without_state_change() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 2, "gord_001").await;

    // Sign one body, deliver another.
    let signature = webhook_signature(captured_event("gord_001", "pay_001", 100_000).as_bytes(), WEBHOOK_SECRET);
    let tampered = captured_event("gord_001", "pay_001", 1);
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("X-Signature", signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(tampered);
    let (status, resp) = send_request(req, configure(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp.contains("Invalid signature"), "unexpected body: {resp}");

    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::PaymentPending);
    let payment = db.fetch_payment_for_order(refreshed.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatusType::Created);
    assert_eq!(db.fetch_item(item.id).await.unwrap().unwrap().quantity, 5);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let body = captured_event("gord_001", "pay_001", 100_000);
    let req = TestRequest::post()
        .uri("/payments/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body);
    let (status, _) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_event_types_are_acknowledged() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let body = json!({ "event": "payment.authorized", "payload": {} }).to_string();
    let (status, resp) = send_request(signed_webhook(&body), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(resp.contains("acknowledged"), "unexpected body: {resp}");
}

#[actix_web::test]
async fn failed_webhook_cancels_pending_and_is_stale_after_confirmation() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (first, _) = seed_order(&db, "buyer-1", &item, 1, "gord_001").await;
    let (second, _) = seed_order(&db, "buyer-2", &item, 1, "gord_002").await;

    // Failure on a pending order cancels it.
    let (status, _) = send_request(signed_webhook(&failed_event("gord_001", "pay_001")), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = db.fetch_order_by_number(&first.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Cancelled);

    // A failure arriving after confirmation is stale and ignored.
    db.confirm_payment("gord_002", "pay_002", None).await.unwrap();
    let (status, _) = send_request(signed_webhook(&failed_event("gord_002", "pay_002")), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = db.fetch_order_by_number(&second.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Confirmed, "a confirmed order is never un-confirmed");
}
