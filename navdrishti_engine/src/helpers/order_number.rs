use rand::Rng;

use crate::db_types::OrderId;

/// Generate a fresh public order number, `NVD-` followed by 10 lowercase hex characters. Uniqueness is
/// enforced by the database; on the (cosmically unlikely) collision the insert fails and the caller retries.
pub fn new_order_number() -> OrderId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..10).map(|_| format!("{:x}", rng.gen_range(0..16u8))).collect();
    OrderId(format!("NVD-{suffix}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_numbers_have_the_expected_shape() {
        let id = new_order_number();
        assert!(id.as_str().starts_with("NVD-"));
        assert_eq!(id.as_str().len(), 14);
        assert!(id.as_str()[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn order_numbers_are_not_constant() {
        let a = new_order_number();
        let b = new_order_number();
        assert_ne!(a, b);
    }
}
