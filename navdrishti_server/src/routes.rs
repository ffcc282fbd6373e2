//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate function. Keep this module neat and
//! tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread
//! will cause the current worker to stop processing new requests. For this reason, any long, non-cpu-bound
//! operation (database calls, gateway calls, carrier calls) must be awaited, never blocked on.

use actix_web::{get, web, HttpResponse, Responder};
use gateway_tools::{helpers::verify_payment_signature, GatewayApi, GatewayConfig};
use log::*;
use navdrishti_engine::{
    api::guards::{authorize_transition, authorize_view},
    db_types::{ItemQuantity, NewOrder, NewShipment, OrderId, OrderStatusType, Role},
    helpers::new_order_number,
    order_objects::{OrderQueryFilter, OrderResult},
    OrderFlowApi,
    OrderFlowDatabase,
};
use serde_json::json;

use crate::{
    auth::JwtClaims,
    data_objects::{
        CreateShipmentRequest,
        NewOrderRequest,
        NewOrderResponse,
        OrderUpdateRequest,
        RefundRequest,
        RefundResponse,
        ShipmentResponse,
        TrackingResponse,
        VerifyPaymentRequest,
    },
    errors::ServerError,
    integrations::carrier::Carrier,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:ty),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:ty),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/orders" impl OrderFlowDatabase where requires [Role::User]);
/// Route handler for the order creation endpoint.
///
/// The gateway order is issued **before** the local order is persisted: if the gateway is down the caller
/// gets a retryable 502 and nothing is written. The local order is created in `PaymentPending` without
/// touching stock; the decrement happens when the capture lands.
pub async fn create_order<B: OrderFlowDatabase>(
    claims: JwtClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<GatewayApi>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    debug!("💻️ POST order for item {} x{} by {}", req.item_id, req.quantity, claims.sub);
    if req.quantity <= 0 {
        return Err(ServerError::InvalidRequestBody("quantity must be a positive integer".into()));
    }
    if req.shipping_address.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("shipping_address must not be empty".into()));
    }
    let item = api
        .db()
        .fetch_item(req.item_id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Item {} does not exist", req.item_id)))?;
    if item.seller_id == claims.sub {
        return Err(ServerError::InvalidRequestBody("You cannot purchase your own listing".into()));
    }
    let total = item.price * req.quantity;
    let order_number = new_order_number();
    let notes = json!({ "buyer_id": claims.sub, "order_number": order_number.as_str() });
    let gateway_order = gateway.create_order(total, order_number.as_str(), notes).await?;
    let new_order = NewOrder::new(order_number, claims.sub.clone(), vec![ItemQuantity {
        item_id: item.id,
        quantity: req.quantity,
    }])
    .with_shipping_address(req.shipping_address);
    let mut new_order = new_order.with_gateway_order(gateway_order.id.clone(), total);
    if let Some(billing) = req.billing_address {
        new_order = new_order.with_billing_address(billing);
    }
    if let Some(memo) = req.memo {
        new_order = new_order.with_memo(memo);
    }
    let (order, payment) = api.place_order(new_order).await?;
    info!("💻️ Order {} created for {} ({})", order.order_id, order.buyer_id, order.total_amount);
    Ok(HttpResponse::Ok().json(NewOrderResponse {
        order_number: order.order_id.as_str().to_string(),
        gateway_order_id: payment.gateway_order_id,
        amount: order.total_amount.value(),
        currency: order.currency,
    }))
}

route!(verify_payment => Post "/orders/verify-payment" impl OrderFlowDatabase);
/// Route handler for client-side payment verification.
///
/// The browser returns from checkout with the gateway order id, payment id and an HMAC signature over the
/// pair. A bad signature is rejected with 400 before any state is touched — and logged as a security
/// event, without echoing back which part failed. A good signature converges on the same idempotent
/// confirmation the webhook uses, so whichever path lands first wins and the other is a no-op.
pub async fn verify_payment<B: OrderFlowDatabase>(
    claims: JwtClaims,
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<OrderFlowApi<B>>,
    gateway_config: web::Data<GatewayConfig>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    debug!("💻️ POST verify-payment for gateway order {} by {}", req.gateway_order_id, claims.sub);
    let secret = gateway_config.webhook_secret.reveal();
    if !verify_payment_signature(&req.gateway_order_id, &req.gateway_payment_id, &req.signature, secret) {
        warn!(
            "💻️🚨️ Payment signature verification failed for gateway order {} (user {})",
            req.gateway_order_id, claims.sub
        );
        return Err(ServerError::InvalidSignature);
    }
    let outcome = api.confirm_payment(&req.gateway_order_id, &req.gateway_payment_id, None).await?;
    let order = outcome.order();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "order_number": order.order_id.as_str(),
        "status": order.status,
    })))
}

route!(my_orders => Get "/orders" impl OrderFlowDatabase);
/// Authenticated users fetch their own purchases with this endpoint. Admins can use `/search/orders` to
/// query any account.
pub async fn my_orders<B: OrderFlowDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let query = OrderQueryFilter::default().with_buyer_id(claims.sub.clone());
    let orders = api.db().search_orders(query).await.map_err(|e| {
        debug!("💻️ Could not fetch orders. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(OrderResult::from(orders)))
}

route!(my_sales => Get "/sales" impl OrderFlowDatabase where requires [Role::Seller]);
/// Sellers fetch the orders placed against their listings.
pub async fn my_sales<B: OrderFlowDatabase>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_sales for {}", claims.sub);
    let query = OrderQueryFilter::default().with_seller_id(claims.sub.clone());
    let orders = api.db().search_orders(query).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(OrderResult::from(orders)))
}

route!(order_by_number => Get "/orders/{order_number}" impl OrderFlowDatabase);
/// The full view of a single order: line items, payment, shipment, tracking and the audit trail. Only the
/// order's buyer, its seller, or an admin may look.
pub async fn order_by_number<B: OrderFlowDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let full = api
        .full_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    if !authorize_view(&claims.actor(), &full.order) {
        return Err(ServerError::InsufficientPermissions("This is not your order".into()));
    }
    Ok(HttpResponse::Ok().json(full))
}

route!(orders_search => Get "/search/orders" impl OrderFlowDatabase where requires [Role::Admin]);
pub async fn orders_search<B: OrderFlowDatabase>(
    query: web::Query<OrderQueryFilter>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders search for [{query}]");
    let query = query.into_inner();
    let orders = api.db().search_orders(query).await.map_err(|e| {
        debug!("💻️ Could not fetch orders. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_order => Patch "/orders/{order_number}" impl OrderFlowDatabase);
/// Route handler for order lifecycle updates.
///
/// The body carries the requested status and an optional reason. The request is validated twice: the
/// transition guard decides whether *this caller* may request the move, and the state machine (enforced
/// in the database transaction) decides whether the move is legal from the current state. Only
/// `Processing` and `Cancelled` are requestable here — confirmation belongs to the payment paths, and
/// `Shipped`/`Delivered` to the shipping flow.
pub async fn update_order<B: OrderFlowDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<OrderUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let update = body.into_inner();
    debug!("💻️ PATCH order {order_id} -> {} by {}", update.status, claims.sub);
    let order = api
        .db()
        .fetch_order_by_number(&order_id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    let actor = claims.actor();
    authorize_transition(&actor, &order, update.status)?;
    let updated = match update.status {
        OrderStatusType::Processing => api.mark_processing(&order_id, &actor.id).await?,
        OrderStatusType::Cancelled => {
            let reason = update.reason.unwrap_or_else(|| "cancelled by user".to_string());
            api.cancel_order(&order_id, &actor.id, &reason).await?.order
        },
        other => {
            return Err(ServerError::InvalidRequestBody(format!(
                "Status {other} cannot be requested through this endpoint"
            )));
        },
    };
    Ok(HttpResponse::Ok().json(updated))
}

route!(refund_order => Post "/orders/{order_number}/refund" impl OrderFlowDatabase where requires [Role::Seller]);
/// Seller-initiated refund. The transition guard restricts this to the order's own seller (or an admin);
/// a partial amount may be supplied, defaulting to the full capture.
pub async fn refund_order<B: OrderFlowDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    body: web::Json<RefundRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let req = body.into_inner();
    debug!("💻️ POST refund for order {order_id} by {}", claims.sub);
    let order = api
        .db()
        .fetch_order_by_number(&order_id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    let actor = claims.actor();
    authorize_transition(&actor, &order, OrderStatusType::Refunded)?;
    let (order, payment) = api.refund_order(&order_id, &actor.id, req.amount.map(Into::into)).await?;
    Ok(HttpResponse::Ok().json(RefundResponse { order, payment }))
}

//----------------------------------------------   Shipping  ----------------------------------------------------

route!(create_shipment => Post "/shipping/create" impl OrderFlowDatabase, Carrier);
/// Books the shipment with the carrier, then persists the waybill and marks the order shipped. The
/// carrier call happens first: if it fails nothing is written and the seller gets a retryable 502.
pub async fn create_shipment<BOrderFlowDatabase, BCarrier>(
    claims: JwtClaims,
    body: web::Json<CreateShipmentRequest>,
    api: web::Data<OrderFlowApi<BOrderFlowDatabase>>,
    carrier: web::Data<BCarrier>,
) -> Result<HttpResponse, ServerError>
where
    BOrderFlowDatabase: OrderFlowDatabase,
    BCarrier: Carrier,
{
    let req = body.into_inner();
    let order_id = OrderId(req.order_number.clone());
    debug!("💻️ POST create shipment for order {order_id} by {}", claims.sub);
    let order = api
        .db()
        .fetch_order_by_number(&order_id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    let actor = claims.actor();
    authorize_transition(&actor, &order, OrderStatusType::Shipped)?;
    // The order must be in a shippable state before we spend a carrier call on it.
    if !order.status.can_transition_to(OrderStatusType::Shipped) {
        return Err(ServerError::Conflict(format!(
            "Order {order_id} cannot move from {} to {}",
            order.status,
            OrderStatusType::Shipped
        )));
    }
    let booked = carrier.create_shipment(&order, &req.booking).await.map_err(|e| {
        warn!("💻️🚚️ Carrier rejected shipment for order {order_id}: {e}");
        ServerError::CarrierUnavailable(e.to_string())
    })?;
    let shipment = NewShipment {
        carrier: booked.courier,
        waybill: booked.waybill,
        pickup_date: req.booking.pickup_date,
        expected_delivery: booked.expected_delivery,
    };
    let (order, detail) = api.create_shipment(&order_id, shipment, &actor.id).await?;
    Ok(HttpResponse::Ok().json(ShipmentResponse { order, shipment: detail }))
}

route!(track_shipment => Get "/shipping/track/{waybill}" impl OrderFlowDatabase, Carrier);
/// Returns the stored shipment detail and tracking history, refreshing from the carrier first. Fresh
/// carrier events are ingested through the same idempotent path as everything else, so a `Delivered`
/// milestone observed here closes out the order. A carrier outage degrades to serving stored data.
pub async fn track_shipment<BOrderFlowDatabase, BCarrier>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<BOrderFlowDatabase>>,
    carrier: web::Data<BCarrier>,
) -> Result<HttpResponse, ServerError>
where
    BOrderFlowDatabase: OrderFlowDatabase,
    BCarrier: Carrier,
{
    let waybill = path.into_inner();
    debug!("💻️ GET tracking for waybill {waybill} by {}", claims.sub);
    let shipment = api
        .db()
        .fetch_shipment_by_waybill(&waybill)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No shipment exists for waybill {waybill}")))?;
    let order = api
        .db()
        .fetch_order_by_id(shipment.order_id)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound("Order for shipment does not exist".into()))?;
    if !authorize_view(&claims.actor(), &order) {
        return Err(ServerError::InsufficientPermissions("This is not your shipment".into()));
    }
    match carrier.track(&waybill).await {
        Ok(events) => {
            for event in events {
                api.record_tracking_event(&waybill, event.into()).await?;
            }
        },
        Err(e) => {
            warn!("💻️🚚️ Could not refresh tracking for {waybill}: {e}. Serving stored events.");
        },
    }
    let shipment = api
        .db()
        .fetch_shipment_by_waybill(&waybill)
        .await
        .map_err(ServerError::from)?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No shipment exists for waybill {waybill}")))?;
    let events = api.db().fetch_tracking_events(&waybill).await.map_err(ServerError::from)?;
    Ok(HttpResponse::Ok().json(TrackingResponse { shipment, events }))
}

