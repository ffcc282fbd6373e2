use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{Days, Utc};
use gateway_tools::GatewayConfig;
use navdrishti_engine::{
    db_types::{InventoryItem, ItemQuantity, NewInventoryItem, NewOrder, Order, Payment, Roles},
    helpers::new_order_number,
    test_utils::{prepare_test_env, random_db_path},
    InventoryManagement,
    OrderFlowDatabase,
    SqliteDatabase,
};
use nvd_common::{Paise, Secret};
use serde::Serialize;

use crate::{auth::TokenIssuer, config::AuthConfig};

pub const TEST_JWT_SECRET: &str = "endpoint-test-secret-0123456789abcdef0123456789";
pub const WEBHOOK_SECRET: &str = "whsec_endpoint_tests_0001";

pub fn auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()) }
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        base_url: "https://api.gateway.example".to_string(),
        key_id: "key_test_0001".to_string(),
        key_secret: Secret::new("key_secret_0001".to_string()),
        webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()),
        hmac_checks: true,
    }
}

pub fn issue_token(user_id: &str, roles: Roles) -> String {
    TokenIssuer::new(&auth_config())
        .issue_token(user_id, roles, Utc::now() + Days::new(1))
        .expect("Could not issue test token")
}

/// Fresh migrated database in the system temp dir.
pub async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 10).await.expect("Could not open test database")
}

pub async fn seed_item(db: &SqliteDatabase, seller: &str, price: i64, quantity: i64) -> InventoryItem {
    db.insert_item(NewInventoryItem::new(seller, "Block-printed dupatta", Paise::from(price), quantity))
        .await
        .expect("Could not seed item")
}

pub async fn seed_order(
    db: &SqliteDatabase,
    buyer: &str,
    item: &InventoryItem,
    qty: i64,
    gateway_order_id: &str,
) -> (Order, Payment) {
    let order = NewOrder::new(new_order_number(), buyer.to_string(), vec![ItemQuantity {
        item_id: item.id,
        quantity: qty,
    }])
    .with_shipping_address("4 Park Street, Kolkata 700016")
    .with_gateway_order(gateway_order_id, item.price * qty);
    db.create_order(order).await.expect("Could not seed order")
}

pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    let resp = test::call_service(&app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    (status, String::from_utf8_lossy(&body).to_string())
}

pub fn get(token: &str, path: &str) -> TestRequest {
    TestRequest::get().uri(path).insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn post<B: Serialize>(token: &str, path: &str, body: &B) -> TestRequest {
    TestRequest::post()
        .uri(path)
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(body)
}

pub fn patch<B: Serialize>(token: &str, path: &str, body: &B) -> TestRequest {
    TestRequest::patch()
        .uri(path)
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(body)
}
