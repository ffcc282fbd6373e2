use crate::db_types::{Order, Payment};

/// Result of applying a `payment.captured` signal (from either the client verify path or the webhook).
/// Races and replays surface as data here rather than as errors, because both are expected in normal
/// operation: the gateway delivers at least once, and the browser races the webhook.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// This call won: the payment is captured, inventory is decremented, the order is `Confirmed`.
    Confirmed(Order),
    /// Another call got there first with the same gateway payment id. No state was changed.
    AlreadyConfirmed(Order),
    /// The capture was recorded, but the stock sold out between order creation and capture. The order
    /// remains `PaymentPending` and the payment needs manual reconciliation (refund or restock).
    FlaggedForReconciliation(Order),
}

impl ConfirmOutcome {
    pub fn order(&self) -> &Order {
        match self {
            ConfirmOutcome::Confirmed(o)
            | ConfirmOutcome::AlreadyConfirmed(o)
            | ConfirmOutcome::FlaggedForReconciliation(o) => o,
        }
    }

    pub fn newly_confirmed(&self) -> bool {
        matches!(self, ConfirmOutcome::Confirmed(_))
    }
}

/// Result of applying a `payment.failed` signal.
#[derive(Debug, Clone)]
pub enum FailOutcome {
    /// The order was still unpaid and has been cancelled.
    Cancelled(Order),
    /// The order was already confirmed via another payment path; the failure event is stale and was
    /// ignored. A confirmed order is never un-confirmed.
    Stale(Order),
    /// The payment was already in a settled state; nothing to do.
    AlreadyResolved(Order),
}

impl FailOutcome {
    pub fn order(&self) -> &Order {
        match self {
            FailOutcome::Cancelled(o) | FailOutcome::Stale(o) | FailOutcome::AlreadyResolved(o) => o,
        }
    }
}

/// Result of a buyer/seller cancellation. If a captured payment had to be reversed, the refunded payment
/// row is included.
#[derive(Debug, Clone)]
pub struct CancelResult {
    pub order: Order,
    pub refunded_payment: Option<Payment>,
}
