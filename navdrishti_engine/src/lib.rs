//! Navdrishti order & payment engine
//!
//! This library holds the core logic for the marketplace's order lifecycle: order creation, gateway payment
//! reconciliation, inventory accounting, shipment tracking and refunds. It is transport-agnostic; the HTTP
//! server crate drives it and the gateway/carrier clients live elsewhere.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend today. You should
//!    never need to access the database directly; use the public API instead. The exception is the data
//!    types, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@api`]). [`api::OrderFlowApi`] drives every order state transition.
//!    Backends implement the traits in [`mod@traits`] to plug in.
//! 3. A set of events emitted when orders change state ([`mod@events`]). A simple actor framework lets the
//!    server hook notification delivery into these without the engine knowing about it.

pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "test_utils")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use api::{order_objects, OrderFlowApi};
pub use traits::{
    ConfirmOutcome,
    FailOutcome,
    InventoryError,
    InventoryManagement,
    OrderFlowDatabase,
    OrderFlowError,
    OrderManagement,
    OrderQueryError,
};
