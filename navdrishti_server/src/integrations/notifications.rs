//! Notification sink wiring.
//!
//! Order lifecycle events fan out to users through a fire-and-forget sink. Delivery problems are logged
//! and never propagated — a failed notification must not disturb an already-committed order transition.
//! The default sink writes to the log; a deployment can point `NVD_NOTIFY_WEBHOOK_URL` at an internal
//! notification service instead.

use std::env;

use log::*;
use navdrishti_engine::events::EventHooks;
use reqwest::Client;
use serde_json::json;

#[derive(Clone)]
pub struct NotificationSink {
    webhook_url: Option<String>,
    client: Client,
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::from_env()
    }
}

impl NotificationSink {
    pub fn from_env() -> Self {
        let webhook_url = env::var("NVD_NOTIFY_WEBHOOK_URL").ok();
        match &webhook_url {
            Some(url) => info!("🔔️ Notifications will be POSTed to {url}"),
            None => info!("🔔️ NVD_NOTIFY_WEBHOOK_URL is not set. Notifications will only be logged."),
        }
        Self { webhook_url, client: Client::new() }
    }

    /// Fire-and-forget delivery. Failures are logged, never returned.
    pub async fn notify(&self, user_id: &str, message: &str) {
        debug!("🔔️ [{user_id}] {message}");
        let Some(url) = &self.webhook_url else {
            return;
        };
        let body = json!({ "user_id": user_id, "message": message });
        match self.client.post(url).json(&body).timeout(std::time::Duration::from_secs(5)).send().await {
            Ok(resp) if resp.status().is_success() => {},
            Ok(resp) => warn!("🔔️ Notification sink returned {} for user {user_id}", resp.status()),
            Err(e) => warn!("🔔️ Could not deliver notification for user {user_id}: {e}"),
        }
    }
}

/// Build the engine event hooks that forward lifecycle events to the sink.
pub fn notification_hooks(sink: NotificationSink) -> EventHooks {
    let mut hooks = EventHooks::default();
    let confirmed_sink = sink.clone();
    hooks.on_order_confirmed(move |event| {
        let sink = confirmed_sink.clone();
        Box::pin(async move {
            let order = &event.order;
            sink.notify(&order.buyer_id, &format!("Your order {} is confirmed.", order.order_id)).await;
            sink.notify(&order.seller_id, &format!("You have a new paid order {}.", order.order_id)).await;
        })
    });
    let annulled_sink = sink.clone();
    hooks.on_order_annulled(move |event| {
        let sink = annulled_sink.clone();
        Box::pin(async move {
            let order = &event.order;
            sink.notify(&order.buyer_id, &format!("Order {} is now {}.", order.order_id, event.status)).await;
            sink.notify(&order.seller_id, &format!("Order {} is now {}.", order.order_id, event.status)).await;
        })
    });
    let shipped_sink = sink.clone();
    hooks.on_order_shipped(move |event| {
        let sink = shipped_sink.clone();
        Box::pin(async move {
            let order = &event.order;
            let message = format!(
                "Order {} has shipped via {} (waybill {}).",
                order.order_id, event.shipment.carrier, event.shipment.waybill
            );
            sink.notify(&order.buyer_id, &message).await;
        })
    });
    hooks.on_order_delivered(move |event| {
        let sink = sink.clone();
        Box::pin(async move {
            let order = &event.order;
            sink.notify(&order.buyer_id, &format!("Order {} was delivered. Enjoy!", order.order_id)).await;
            sink.notify(&order.seller_id, &format!("Order {} was delivered.", order.order_id)).await;
        })
    });
    hooks
}
