use actix_web::{http::StatusCode, web, web::ServiceConfig};
use gateway_tools::helpers::payment_signature;
use navdrishti_engine::{
    db_types::{OrderStatusType, Role},
    events::EventProducers,
    InventoryManagement,
    OrderFlowApi,
    OrderFlowDatabase,
    OrderManagement,
    SqliteDatabase,
};
use nvd_common::Secret;
use serde_json::json;

use super::helpers::{
    gateway_config,
    get,
    issue_token,
    patch,
    post,
    seed_item,
    seed_order,
    send_request,
    test_db,
    TEST_JWT_SECRET,
    WEBHOOK_SECRET,
};
use crate::{
    middleware::JwtAuthMiddlewareFactory,
    routes::{MyOrdersRoute, OrderByNumberRoute, RefundOrderRoute, UpdateOrderRoute, VerifyPaymentRoute},
};

fn configure(db: SqliteDatabase) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).app_data(web::Data::new(gateway_config())).service(
            web::scope("/api")
                .wrap(JwtAuthMiddlewareFactory::new(Secret::new(TEST_JWT_SECRET.to_string())))
                .service(MyOrdersRoute::<SqliteDatabase>::new())
                .service(VerifyPaymentRoute::<SqliteDatabase>::new())
                .service(OrderByNumberRoute::<SqliteDatabase>::new())
                .service(UpdateOrderRoute::<SqliteDatabase>::new())
                .service(RefundOrderRoute::<SqliteDatabase>::new()),
        );
    }
}

#[actix_web::test]
async fn orders_require_an_access_token() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let req = actix_web::test::TestRequest::get().uri("/api/orders");
    let (status, body) = send_request(req, configure(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token"), "unexpected body: {body}");
}

#[actix_web::test]
async fn buyers_see_only_their_own_orders() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    seed_order(&db, "buyer-1", &item, 1, "gord_001").await;
    seed_order(&db, "buyer-2", &item, 2, "gord_002").await;

    let token = issue_token("buyer-1", vec![Role::User]);
    let (status, body) = send_request(get(&token, "/api/orders"), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let result: serde_json::Value = serde_json::from_str(&body).unwrap();
    let orders = result["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["buyer_id"], "buyer-1");
}

#[actix_web::test]
async fn strangers_cannot_view_an_order() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 1, "gord_001").await;

    let token = issue_token("somebody-else", vec![Role::User]);
    let path = format!("/api/orders/{}", order.order_id.as_str());
    let (status, _) = send_request(get(&token, &path), configure(db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = issue_token("ops-1", vec![Role::Admin]);
    let (status, body) = send_request(get(&admin, &path), configure(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"history\""));
}

#[actix_web::test]
async fn verify_payment_confirms_with_a_valid_signature() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 2, "gord_001").await;

    let signature = payment_signature("gord_001", "pay_001", WEBHOOK_SECRET);
    let body = json!({ "gateway_order_id": "gord_001", "gateway_payment_id": "pay_001", "signature": signature });
    let token = issue_token("buyer-1", vec![Role::User]);
    let (status, resp) =
        send_request(post(&token, "/api/orders/verify-payment", &body), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {resp}");

    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Confirmed);
    assert_eq!(db.fetch_item(item.id).await.unwrap().unwrap().quantity, 3);
}

#[actix_web::test]
async fn verify_payment_rejects_a_bad_signature_without_state_change() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 2, "gord_001").await;

    // Signature computed over different ids than the ones submitted.
    let signature = payment_signature("gord_001", "pay_other", WEBHOOK_SECRET);
    let body = json!({ "gateway_order_id": "gord_001", "gateway_payment_id": "pay_001", "signature": signature });
    let token = issue_token("buyer-1", vec![Role::User]);
    let (status, resp) =
        send_request(post(&token, "/api/orders/verify-payment", &body), configure(db.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp.contains("Invalid signature"), "error must not leak signature details: {resp}");

    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::PaymentPending);
    assert_eq!(db.fetch_item(item.id).await.unwrap().unwrap().quantity, 5);
}

#[actix_web::test]
async fn buyers_can_cancel_but_not_fast_forward_their_orders() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 1, "gord_001").await;
    let path = format!("/api/orders/{}", order.order_id.as_str());
    let token = issue_token("buyer-1", vec![Role::User]);

    // Buyers cannot request shipped/delivered.
    let (status, _) =
        send_request(patch(&token, &path, &json!({ "status": "Delivered" })), configure(db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = send_request(
        patch(&token, &path, &json!({ "status": "Cancelled", "reason": "changed my mind" })),
        configure(db.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {resp}");
    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Cancelled);
}

#[actix_web::test]
async fn illegal_patch_transition_is_a_conflict() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 1, "gord_001").await;
    let path = format!("/api/orders/{}", order.order_id.as_str());

    // Processing before payment: allowed for the seller by the guard, rejected by the state machine.
    let seller = issue_token("seller-1", vec![Role::User, Role::Seller]);
    let (status, resp) =
        send_request(patch(&seller, &path, &json!({ "status": "Processing" })), configure(db.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT, "unexpected response: {resp}");
}

#[actix_web::test]
async fn refunds_are_for_the_orders_own_seller() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let item = seed_item(&db, "seller-1", 50_000, 5).await;
    let (order, _) = seed_order(&db, "buyer-1", &item, 2, "gord_001").await;
    db.confirm_payment("gord_001", "pay_001", None).await.unwrap();
    let path = format!("/api/orders/{}/refund", order.order_id.as_str());

    // A different seller fails the ownership guard.
    let other = issue_token("seller-2", vec![Role::User, Role::Seller]);
    let (status, _) = send_request(post(&other, &path, &json!({})), configure(db.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let seller = issue_token("seller-1", vec![Role::User, Role::Seller]);
    let (status, resp) = send_request(post(&seller, &path, &json!({})), configure(db.clone())).await;
    assert_eq!(status, StatusCode::OK, "unexpected response: {resp}");
    let refreshed = db.fetch_order_by_number(&order.order_id).await.unwrap().unwrap();
    assert_eq!(refreshed.status, OrderStatusType::Refunded);
    assert_eq!(db.fetch_item(item.id).await.unwrap().unwrap().quantity, 5);
}
