use std::time::Duration;

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gateway_tools::GatewayApi;
use log::info;
use navdrishti_engine::{events::EventHandlers, OrderFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{
        carrier::CarrierApi,
        notifications::{notification_hooks, NotificationSink},
    },
    middleware::{HmacMiddlewareFactory, JwtAuthMiddlewareFactory},
    routes::{
        health,
        CreateOrderRoute,
        CreateShipmentRoute,
        MyOrdersRoute,
        MySalesRoute,
        OrderByNumberRoute,
        OrdersSearchRoute,
        RefundOrderRoute,
        TrackShipmentRoute,
        UpdateOrderRoute,
        VerifyPaymentRoute,
    },
    webhook_routes::payments_webhook,
};

/// The header the payment gateway uses to deliver its webhook signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Signature";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    // Event hooks feed the notification sink; handlers outlive any single request.
    let hooks = notification_hooks(NotificationSink::from_env());
    let handlers = EventHandlers::new(32, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _expiry = start_expiry_worker(db.clone(), producers.clone(), config.pending_order_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: navdrishti_engine::events::EventProducers,
) -> Result<actix_web::dev::Server, ServerError> {
    let gateway_api =
        GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let carrier_api =
        CarrierApi::new(config.carrier.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let webhook_secret = config.gateway.webhook_secret.clone();
    let jwt_secret = config.auth.jwt_secret.clone();
    let gateway_config = config.gateway.clone();
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("nvd::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(gateway_api.clone()))
            .app_data(web::Data::new(carrier_api.clone()))
            .app_data(web::Data::new(gateway_config.clone()));
        // Routes that require an authenticated caller
        let api_scope = web::scope("/api")
            .wrap(JwtAuthMiddlewareFactory::new(jwt_secret.clone()))
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MySalesRoute::<SqliteDatabase>::new())
            .service(OrdersSearchRoute::<SqliteDatabase>::new())
            .service(OrderByNumberRoute::<SqliteDatabase>::new())
            .service(UpdateOrderRoute::<SqliteDatabase>::new())
            .service(RefundOrderRoute::<SqliteDatabase>::new())
            .service(CreateShipmentRoute::<SqliteDatabase, CarrierApi>::new())
            .service(TrackShipmentRoute::<SqliteDatabase, CarrierApi>::new());
        // The gateway's webhook: raw-body HMAC verification happens before any parsing.
        let webhook_scope = web::scope("/payments")
            .wrap(HmacMiddlewareFactory::new(
                WEBHOOK_SIGNATURE_HEADER,
                webhook_secret.clone(),
                gateway_config.hmac_checks,
            ))
            .route("/webhook", web::post().to(payments_webhook::<SqliteDatabase>));
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Server listening on {}:{}", config.host, config.port);
    Ok(srv)
}
