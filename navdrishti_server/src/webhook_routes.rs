//----------------------------------------------   Webhook ingest  ----------------------------------------------------

use actix_web::{web, HttpResponse};
use gateway_tools::GatewayEvent;
use log::{debug, info, warn};
use navdrishti_engine::{ConfirmOutcome, FailOutcome, OrderFlowApi, OrderFlowDatabase, OrderFlowError};

use crate::data_objects::JsonResponse;

/// Route handler for the payment gateway's asynchronous event stream.
///
/// The HMAC middleware has already verified the signature over the raw bytes we receive here, so the body
/// is authentic — but it may be a duplicate, and it may arrive before or after the client-side verify
/// call. Every branch below is therefore idempotent, and the response is always 2xx once the signature
/// checks out: the gateway retries on any other status, and retrying cannot make anything better for
/// events we have already either applied or rejected as stale.
pub async fn payments_webhook<B>(body: web::Bytes, api: web::Data<OrderFlowApi<B>>) -> HttpResponse
where B: OrderFlowDatabase
{
    let event = match GatewayEvent::from_slice(body.as_ref()) {
        Ok(event) => event,
        Err(e) => {
            warn!("🪝️ Could not decode webhook payload: {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not decode event."));
        },
    };
    let result = match event {
        GatewayEvent::Captured { order_id, payment_id, amount, method } => {
            debug!("🪝️ payment.captured for gateway order {order_id} ({amount})");
            match api.confirm_payment(&order_id, &payment_id, method.as_deref()).await {
                Ok(ConfirmOutcome::Confirmed(order)) => {
                    info!("🪝️ Order {} confirmed via webhook.", order.order_id);
                    JsonResponse::success("Order confirmed.")
                },
                Ok(ConfirmOutcome::AlreadyConfirmed(order)) => {
                    info!("🪝️ Order {} was already confirmed. Webhook replay ignored.", order.order_id);
                    JsonResponse::success("Order already confirmed.")
                },
                Ok(ConfirmOutcome::FlaggedForReconciliation(order)) => {
                    warn!("🪝️ Capture for order {} flagged for manual reconciliation.", order.order_id);
                    JsonResponse::success("Capture recorded for reconciliation.")
                },
                Err(OrderFlowError::PaymentNotFound(id)) => {
                    warn!("🪝️ Capture for unknown gateway order {id}. Acknowledging to stop retries.");
                    JsonResponse::failure("Unknown gateway order.")
                },
                Err(e) => {
                    warn!("🪝️ Could not process capture for gateway order {order_id}. {e}");
                    JsonResponse::failure("Unexpected error handling event.")
                },
            }
        },
        GatewayEvent::Failed { order_id, payment_id, reason } => {
            debug!("🪝️ payment.failed for gateway order {order_id}");
            match api.fail_payment(&order_id, &payment_id, reason.as_deref()).await {
                Ok(FailOutcome::Cancelled(order)) => {
                    info!("🪝️ Order {} cancelled after payment failure.", order.order_id);
                    JsonResponse::success("Order cancelled.")
                },
                Ok(FailOutcome::Stale(order)) => {
                    warn!(
                        "🪝️ Stale payment failure for order {} (already {}). Ignored.",
                        order.order_id, order.status
                    );
                    JsonResponse::success("Stale event ignored.")
                },
                Ok(FailOutcome::AlreadyResolved(order)) => {
                    info!("🪝️ Payment failure for order {} already recorded.", order.order_id);
                    JsonResponse::success("Failure already recorded.")
                },
                Err(OrderFlowError::PaymentNotFound(id)) => {
                    warn!("🪝️ Failure for unknown gateway order {id}. Acknowledging to stop retries.");
                    JsonResponse::failure("Unknown gateway order.")
                },
                Err(e) => {
                    warn!("🪝️ Could not process failure for gateway order {order_id}. {e}");
                    JsonResponse::failure("Unexpected error handling event.")
                },
            }
        },
        GatewayEvent::Other(event_type) => {
            // Events this system does not model are acknowledged so the gateway stops retrying them.
            debug!("🪝️ Ignoring unmodelled webhook event type [{event_type}]");
            JsonResponse::success("Event acknowledged.")
        },
    };
    HttpResponse::Ok().json(result)
}
