//! Orders: placement pricing and status transitions
//!
//! The functions here are pure. Storage backends call them inside their
//! transactional boundary so that the in-memory and MongoDB backends share
//! one definition of what placing or updating an order means.

use crate::core::entity::Record;
use crate::core::error::{ShopError, ShopResult};
use crate::entities::{Product, round_cents};
use crate::impl_record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use validator::Validate;

/// Fulfillment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

/// Billing state, independent of [`OrderStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    #[serde(alias = "paid")]
    Completed,
    Failed,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// A customer may cancel only before the order ships
    pub fn customer_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Whether the order still counts toward revenue and best sellers
    pub fn counts_as_sale(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// Price/name snapshot taken at purchase time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: Uuid,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub price: f64,
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 1, max = 250))]
    pub address: String,
    #[validate(length(min = 1, max = 120))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 1, max = 80))]
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: f64,
    pub shipping_price: f64,
    pub tax_price: f64,
    pub total_price: f64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub is_paid: bool,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl_record!(Order, "orders", "order");

/// Largest quantity a single checkout line may request
pub const MAX_LINE_QUANTITY: i64 = 10_000;

/// One requested line of a checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: Uuid,
    #[validate(range(min = 1, max = 10_000))]
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Everything a customer submits at checkout, minus prices
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
}

/// Shipping and tax rules applied to the items subtotal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    pub tax_rate: f64,
    pub flat_shipping: f64,
    pub free_shipping_threshold: f64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: 0.15,
            flat_shipping: 10.0,
            free_shipping_threshold: 100.0,
        }
    }
}

impl PricingPolicy {
    /// (shipping, tax) for an items subtotal
    pub fn quote(&self, items_price: f64) -> (f64, f64) {
        let shipping = if items_price >= self.free_shipping_threshold {
            0.0
        } else {
            self.flat_shipping
        };
        let tax = round_cents(items_price * self.tax_rate);
        (round_cents(shipping), tax)
    }
}

impl OrderDraft {
    /// Requested quantity per product, duplicate lines summed.
    ///
    /// Ordered by product id so backends touch products in a stable order.
    pub fn requested_quantities(&self) -> ShopResult<BTreeMap<Uuid, i64>> {
        if self.lines.is_empty() {
            return Err(ShopError::validation("Order must contain at least one item"));
        }

        let mut requested = BTreeMap::new();
        for line in &self.lines {
            if line.quantity < 1 {
                return Err(ShopError::validation(format!(
                    "Quantity for product '{}' must be at least 1",
                    line.product
                )));
            }
            let total = requested.entry(line.product).or_insert(0i64);
            *total = total
                .checked_add(line.quantity)
                .filter(|sum| *sum <= MAX_LINE_QUANTITY)
                .ok_or_else(|| {
                    ShopError::validation(format!(
                        "Quantity for product '{}' may not exceed {}",
                        line.product, MAX_LINE_QUANTITY
                    ))
                })?;
        }
        Ok(requested)
    }

    /// Build the order from current product records.
    ///
    /// Fails if any product is missing, inactive or short on stock. Stock is
    /// not modified here.
    pub fn build(
        &self,
        products: &HashMap<Uuid, Product>,
        pricing: PricingPolicy,
        now: DateTime<Utc>,
    ) -> ShopResult<Order> {
        let requested = self.requested_quantities()?;

        for (product_id, quantity) in &requested {
            let product = products
                .get(product_id)
                .filter(|p| p.is_active)
                .ok_or_else(|| {
                    ShopError::rule(format!("Product '{}' is not available", product_id))
                })?;
            if !product.can_fulfil(*quantity) {
                return Err(ShopError::insufficient_stock(
                    product.id,
                    &product.name,
                    *quantity,
                    product.stock,
                ));
            }
        }

        let mut order_items = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            // Presence was checked above
            let Some(product) = products.get(&line.product) else {
                continue;
            };
            order_items.push(OrderItem {
                product: product.id,
                name: product.name.clone(),
                image: product.images.first().cloned(),
                price: product.price,
                quantity: line.quantity,
                size: line.size.clone(),
                color: line.color.clone(),
            });
        }

        let mut order = Order {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            order_items,
            shipping_address: self.shipping_address.clone(),
            payment_method: self.payment_method.clone(),
            items_price: 0.0,
            shipping_price: 0.0,
            tax_price: 0.0,
            total_price: 0.0,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };
        order.recompute_totals(pricing);
        Ok(order)
    }
}

/// Who is asking for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusActor {
    /// Unrestricted transitions
    Admin,
    /// The owning customer; may only cancel early orders
    Customer(Uuid),
}

/// Requested field changes; absent fields are left alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    #[serde(default)]
    pub order_status: Option<OrderStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusChange {
    pub actor: StatusActor,
    pub update: StatusUpdate,
}

impl StatusChange {
    pub fn admin(update: StatusUpdate) -> Self {
        Self {
            actor: StatusActor::Admin,
            update,
        }
    }

    pub fn customer_cancel(user_id: Uuid) -> Self {
        Self {
            actor: StatusActor::Customer(user_id),
            update: StatusUpdate {
                order_status: Some(OrderStatus::Cancelled),
                payment_status: None,
            },
        }
    }
}

/// Side effects the storage layer must carry out with the order update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusEffect {
    /// Return every item's quantity to stock
    pub restock: bool,
}

impl Order {
    /// itemsPrice from the snapshot, shipping and tax from the policy,
    /// totalPrice = items + shipping + tax
    pub fn recompute_totals(&mut self, pricing: PricingPolicy) {
        let items: f64 = self
            .order_items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum();
        self.items_price = round_cents(items);
        let (shipping, tax) = pricing.quote(self.items_price);
        self.shipping_price = shipping;
        self.tax_price = tax;
        self.total_price = round_cents(self.items_price + self.shipping_price + self.tax_price);
    }

    /// Quantity per product across all items
    pub fn quantities(&self) -> BTreeMap<Uuid, i64> {
        let mut quantities = BTreeMap::new();
        for item in &self.order_items {
            let total = quantities.entry(item.product).or_insert(0i64);
            *total = total.saturating_add(item.quantity);
        }
        quantities
    }

    /// Apply a status change in place and report the stock side effect.
    pub fn apply_status_change(
        &mut self,
        change: &StatusChange,
        now: DateTime<Utc>,
    ) -> ShopResult<StatusEffect> {
        let update = change.update;
        if update.order_status.is_none() && update.payment_status.is_none() {
            return Err(ShopError::validation(
                "Provide orderStatus and/or paymentStatus",
            ));
        }

        if let StatusActor::Customer(user_id) = change.actor {
            if self.user_id != user_id {
                // Other customers' orders are invisible, not forbidden
                return Err(ShopError::not_found("order", self.id));
            }
            if update.payment_status.is_some()
                || update.order_status != Some(OrderStatus::Cancelled)
            {
                return Err(ShopError::Forbidden(
                    "Customers may only cancel their orders".to_string(),
                ));
            }
            if !self.order_status.customer_cancellable() {
                return Err(ShopError::rule(format!(
                    "Order cannot be cancelled once it is {}",
                    self.order_status.as_str()
                )));
            }
        }

        let mut effect = StatusEffect::default();

        if let Some(next) = update.order_status {
            let previous = self.order_status;
            if previous == OrderStatus::Cancelled && next != OrderStatus::Cancelled {
                return Err(ShopError::Conflict(
                    "Cancelled orders cannot be reopened".to_string(),
                ));
            }
            if next == OrderStatus::Cancelled && previous != OrderStatus::Cancelled {
                effect.restock = true;
                self.cancelled_at = Some(now);
            }
            if next == OrderStatus::Delivered {
                self.is_delivered = true;
                self.delivered_at.get_or_insert(now);
            }
            self.order_status = next;
        }

        if let Some(payment) = update.payment_status {
            if payment == PaymentStatus::Completed {
                self.is_paid = true;
                self.paid_at.get_or_insert(now);
            }
            self.payment_status = payment;
        }

        self.touch();
        Ok(effect)
    }
}
