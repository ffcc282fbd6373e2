//! Client tools for the upstream payment gateway.
//!
//! This crate wraps the gateway's REST API (order issuance) and the signature schemes it uses to authenticate
//! client-confirmed payments and asynchronous webhook deliveries. Nothing in here touches the database; the
//! engine and server compose these pieces.

mod api;
mod config;
pub mod data_objects;
mod error;
pub mod helpers;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{GatewayEvent, GatewayOrder, GatewayPayment, WebhookEnvelope};
pub use error::GatewayApiError;
