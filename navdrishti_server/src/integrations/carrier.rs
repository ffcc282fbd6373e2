//! Shipping carrier adapter.
//!
//! The carrier assigns waybills and reports tracking milestones. The engine only ever sees the narrow
//! [`Carrier`] trait; [`CarrierApi`] is the reqwest-backed implementation, and the endpoint tests swap in
//! a mock. Carrier outages are surfaced as [`CarrierApiError`] and never abort an already-committed order
//! transition — tracking is re-polled on the next request.

use std::{env, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;
use navdrishti_engine::db_types::{NewTrackingEvent, Order};
use nvd_common::Secret;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarrierApiError {
    #[error("Could not initialize carrier client: {0}")]
    Initialization(String),
    #[error("Carrier request failed: {0}")]
    RequestError(String),
    #[error("Could not deserialize carrier response: {0}")]
    JsonError(String),
    #[error("Carrier call failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

/// What the carrier hands back when a shipment is booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierShipment {
    pub waybill: String,
    pub courier: String,
    #[serde(default)]
    pub expected_delivery: Option<DateTime<Utc>>,
}

/// A tracking milestone as the carrier reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierTrackingEvent {
    pub status: String,
    #[serde(default)]
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<CarrierTrackingEvent> for NewTrackingEvent {
    fn from(e: CarrierTrackingEvent) -> Self {
        NewTrackingEvent { status: e.status, location: e.location, occurred_at: e.timestamp }
    }
}

/// Booking details the seller supplies when dispatching an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentBooking {
    #[serde(default)]
    pub pickup_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weight_grams: Option<i64>,
    #[serde(default)]
    pub dimensions_cm: Option<(i64, i64, i64)>,
}

/// The narrow seam to the shipping provider.
#[allow(async_fn_in_trait)]
pub trait Carrier {
    async fn create_shipment(&self, order: &Order, booking: &ShipmentBooking) -> Result<CarrierShipment, CarrierApiError>;

    async fn track(&self, waybill: &str) -> Result<Vec<CarrierTrackingEvent>, CarrierApiError>;
}

#[derive(Debug, Clone, Default)]
pub struct CarrierConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
}

impl CarrierConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("NVD_CARRIER_BASE_URL").unwrap_or_else(|_| {
            warn!("NVD_CARRIER_BASE_URL not set, using https://api.carrier.example as default");
            "https://api.carrier.example".to_string()
        });
        let api_key = Secret::new(env::var("NVD_CARRIER_API_KEY").unwrap_or_else(|_| {
            warn!("NVD_CARRIER_API_KEY not set, using (probably useless) default");
            "carrier_key_000000".to_string()
        }));
        Self { base_url, api_key }
    }
}

#[derive(Clone)]
pub struct CarrierApi {
    config: CarrierConfig,
    client: Arc<Client>,
}

#[derive(Debug, Serialize)]
struct NewShipmentRequest<'a> {
    order_number: &'a str,
    delivery_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pickup_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight_grams: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions_cm: Option<(i64, i64, i64)>,
}

#[derive(Debug, Deserialize)]
struct TrackingResponse {
    events: Vec<CarrierTrackingEvent>,
}

impl CarrierApi {
    pub fn new(config: CarrierConfig) -> Result<Self, CarrierApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| CarrierApiError::Initialization(e.to_string()))?;
        headers.insert("X-Api-Key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| CarrierApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }
}

impl Carrier for CarrierApi {
    async fn create_shipment(
        &self,
        order: &Order,
        booking: &ShipmentBooking,
    ) -> Result<CarrierShipment, CarrierApiError> {
        let body = NewShipmentRequest {
            order_number: order.order_id.as_str(),
            delivery_address: &order.shipping_address,
            pickup_date: booking.pickup_date,
            weight_grams: booking.weight_grams,
            dimensions_cm: booking.dimensions_cm,
        };
        let response = self
            .client
            .post(self.url("/v1/shipments"))
            .json(&body)
            .send()
            .await
            .map_err(|e| CarrierApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            let shipment: CarrierShipment =
                response.json().await.map_err(|e| CarrierApiError::JsonError(e.to_string()))?;
            debug!("🚚️ Carrier assigned waybill {} for order {}", shipment.waybill, order.order_id);
            Ok(shipment)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| CarrierApiError::RequestError(e.to_string()))?;
            Err(CarrierApiError::QueryError { status, message })
        }
    }

    async fn track(&self, waybill: &str) -> Result<Vec<CarrierTrackingEvent>, CarrierApiError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/track/{waybill}")))
            .send()
            .await
            .map_err(|e| CarrierApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            let tracking: TrackingResponse =
                response.json().await.map_err(|e| CarrierApiError::JsonError(e.to_string()))?;
            Ok(tracking.events)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| CarrierApiError::RequestError(e.to_string()))?;
            Err(CarrierApiError::QueryError { status, message })
        }
    }
}
