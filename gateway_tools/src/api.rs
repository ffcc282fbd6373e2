use std::sync::Arc;

use log::*;
use nvd_common::{Paise, INR_CURRENCY_CODE};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    config::GatewayConfig,
    data_objects::{GatewayOrder, GatewayPayment, GatewayRefund, NewGatewayOrder},
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Create a gateway order for the given amount. The `receipt` links the gateway's checkout session back
    /// to the marketplace order number. The caller must not treat the local order as confirmed if this call
    /// fails.
    pub async fn create_order(&self, amount: Paise, receipt: &str, notes: Value) -> Result<GatewayOrder, GatewayApiError> {
        if amount.value() <= 0 {
            return Err(GatewayApiError::InvalidCurrencyAmount(amount.to_string()));
        }
        let body = NewGatewayOrder {
            amount: amount.value(),
            currency: INR_CURRENCY_CODE.to_string(),
            receipt: receipt.to_string(),
            notes,
        };
        let order: GatewayOrder = self.rest_query(Method::POST, "/v1/orders", Some(body)).await?;
        debug!("🌐️ Gateway order {} created for receipt {receipt} ({amount})", order.id);
        Ok(order)
    }

    /// Fetch the gateway's view of a payment. Used by reconciliation tooling, not the hot path.
    pub async fn fetch_payment(&self, gateway_payment_id: &str) -> Result<GatewayPayment, GatewayApiError> {
        let path = format!("/v1/payments/{gateway_payment_id}");
        self.rest_query::<GatewayPayment, ()>(Method::GET, &path, None).await
    }

    /// Instruct the gateway to return captured funds to the buyer. Partial refunds pass the amount to
    /// return; the gateway rejects anything exceeding the capture.
    pub async fn refund_payment(
        &self,
        gateway_payment_id: &str,
        amount: Paise,
    ) -> Result<GatewayRefund, GatewayApiError> {
        if amount.value() <= 0 {
            return Err(GatewayApiError::InvalidCurrencyAmount(amount.to_string()));
        }
        let path = format!("/v1/payments/{gateway_payment_id}/refund");
        let body = serde_json::json!({ "amount": amount.value() });
        let refund: GatewayRefund = self.rest_query(Method::POST, &path, Some(body)).await?;
        debug!("🌐️ Refund {} issued against payment {gateway_payment_id} ({amount})", refund.id);
        Ok(refund)
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        trace!("🌐️ Sending gateway request: {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🌐️ Gateway request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RestResponseError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }
}
