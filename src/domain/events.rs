use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::Order;

pub const ORDER_AGGREGATE: &str = "Order";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Serialized as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
}

/// Emitted once per committed order, in the same transaction as the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderPlacedLine>,
}

impl OrderPlaced {
    pub const EVENT_TYPE: &'static str = "OrderPlaced";
}

impl From<&Order> for OrderPlaced {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            customer_id: order.customer_id,
            created_at: order.created_at,
            lines: order
                .lines
                .iter()
                .map(|l| OrderPlacedLine {
                    product_id: l.product_id,
                    quantity: l.quantity,
                    price: l.price.to_string(),
                })
                .collect(),
        }
    }
}
