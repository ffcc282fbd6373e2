//! Centralised "who may transition what" predicates.
//!
//! Every route that moves an order through its lifecycle funnels through one of these guards instead of
//! doing ad-hoc ownership checks per endpoint. The guards decide *authorization* only; whether the
//! transition is legal from the current state is the state machine's job and is enforced again, under the
//! transaction, by the database layer.

use thiserror::Error;

use crate::db_types::{Order, OrderStatusType, Role, Roles};

/// The resolved caller identity, as extracted from the identity token by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub roles: Roles,
}

impl Actor {
    pub fn new<S: Into<String>>(id: S, roles: Roles) -> Self {
        Self { id: id.into(), roles }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn is_buyer_of(&self, order: &Order) -> bool {
        self.id == order.buyer_id
    }

    pub fn is_seller_of(&self, order: &Order) -> bool {
        self.id == order.seller_id
    }
}

#[derive(Debug, Clone, Error)]
#[error("{actor} may not move order {order_id} to {target}")]
pub struct TransitionForbidden {
    pub actor: String,
    pub order_id: String,
    pub target: OrderStatusType,
}

/// May `actor` request the given status for this order?
///
/// * Admins may request any transition the state machine allows.
/// * `Cancelled`: the order's buyer or seller.
/// * `Processing` and `Shipped`: the order's seller.
/// * `Refunded`: the order's seller (buyer-side disputes go through support, i.e. an admin).
/// * `Confirmed` and `Delivered` are never requestable by a user; they are driven by the payment gateway
///   and the carrier respectively.
pub fn authorize_transition(actor: &Actor, order: &Order, target: OrderStatusType) -> Result<(), TransitionForbidden> {
    use OrderStatusType::*;
    if actor.is_admin() {
        return Ok(());
    }
    let allowed = match target {
        Cancelled => actor.is_buyer_of(order) || actor.is_seller_of(order),
        Processing | Shipped | Refunded => actor.is_seller_of(order),
        PaymentPending | Confirmed | Delivered => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(TransitionForbidden {
            actor: actor.id.clone(),
            order_id: order.order_id.as_str().to_string(),
            target,
        })
    }
}

/// May `actor` view this order? Buyers and sellers see their own orders; admins see everything.
pub fn authorize_view(actor: &Actor, order: &Order) -> bool {
    actor.is_admin() || actor.is_buyer_of(order) || actor.is_seller_of(order)
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use nvd_common::Paise;

    use super::*;
    use crate::db_types::OrderId;

    fn order() -> Order {
        Order {
            id: 1,
            order_id: OrderId("NVD-0000000001".into()),
            buyer_id: "buyer-1".into(),
            seller_id: "seller-1".into(),
            status: OrderStatusType::Confirmed,
            total_amount: Paise::from(5000),
            currency: "INR".into(),
            shipping_address: "12 MG Road, Bengaluru".into(),
            billing_address: None,
            memo: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn buyer_may_cancel_but_not_ship() {
        let buyer = Actor::new("buyer-1", vec![Role::User]);
        let order = order();
        assert!(authorize_transition(&buyer, &order, OrderStatusType::Cancelled).is_ok());
        assert!(authorize_transition(&buyer, &order, OrderStatusType::Shipped).is_err());
        assert!(authorize_transition(&buyer, &order, OrderStatusType::Refunded).is_err());
    }

    #[test]
    fn seller_may_progress_and_refund_their_own_sales() {
        let seller = Actor::new("seller-1", vec![Role::User, Role::Seller]);
        let order = order();
        assert!(authorize_transition(&seller, &order, OrderStatusType::Processing).is_ok());
        assert!(authorize_transition(&seller, &order, OrderStatusType::Refunded).is_ok());
        let other_seller = Actor::new("seller-2", vec![Role::Seller]);
        assert!(authorize_transition(&other_seller, &order, OrderStatusType::Processing).is_err());
    }

    #[test]
    fn nobody_requests_confirmed_or_delivered() {
        let seller = Actor::new("seller-1", vec![Role::Seller]);
        let order = order();
        assert!(authorize_transition(&seller, &order, OrderStatusType::Confirmed).is_err());
        assert!(authorize_transition(&seller, &order, OrderStatusType::Delivered).is_err());
    }

    #[test]
    fn admin_is_unrestricted() {
        let admin = Actor::new("ops-1", vec![Role::Admin]);
        let order = order();
        assert!(authorize_transition(&admin, &order, OrderStatusType::Delivered).is_ok());
        assert!(authorize_view(&admin, &order));
    }

    #[test]
    fn strangers_cannot_view() {
        let stranger = Actor::new("someone-else", vec![Role::User]);
        assert!(!authorize_view(&stranger, &order()));
    }
}
