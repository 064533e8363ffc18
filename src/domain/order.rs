use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    /// Units currently in stock.
    pub quantity: i32,
}

/// One product/quantity pair as requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl OrderLineRequest {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A validated line handed to the order store. `price` is the product price
/// captured at placement time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

/// Absolute stock level to store for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityUpdate {
    pub product_id: Uuid,
    pub quantity: i32,
}
