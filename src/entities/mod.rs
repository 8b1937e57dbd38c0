//! Domain documents: catalog, orders and accounts
//!
//! Every type here implements [`Record`](crate::core::entity::Record) and
//! serializes with camelCase field names, which is both the wire format and
//! the stored document shape.

pub mod account;
pub mod category;
pub mod order;
pub mod product;

pub use account::{AccountView, Admin, AdminRole, User, normalize_email};
pub use category::Category;
pub use order::{
    Order, OrderDraft, OrderItem, OrderLine, OrderStatus, PaymentStatus, PricingPolicy,
    ShippingAddress, StatusActor, StatusChange, StatusEffect, StatusUpdate,
};
pub use product::{Product, ProductPatch, Review};

/// Round a money amount to cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(10.005_1), 10.01);
        assert_eq!(round_cents(3.0), 3.0);
        assert_eq!(round_cents(0.1 + 0.2), 0.3);
    }
}
