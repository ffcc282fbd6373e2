use mockall::mock;
use navdrishti_engine::db_types::Order;

use crate::integrations::carrier::{Carrier, CarrierApiError, CarrierShipment, CarrierTrackingEvent, ShipmentBooking};

mock! {
    pub Carrier {}
    impl Carrier for Carrier {
        async fn create_shipment(&self, order: &Order, booking: &ShipmentBooking) -> Result<CarrierShipment, CarrierApiError>;
        async fn track(&self, waybill: &str) -> Result<Vec<CarrierTrackingEvent>, CarrierApiError>;
    }
}
