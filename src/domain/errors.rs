use thiserror::Error;
use uuid::Uuid;

/// Faults raised by a storage backend. These are never validation outcomes;
/// callers decide whether to retry or surface them.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Stock for product {0} would become negative")]
    NegativeStock(Uuid),
}

#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error("Could not find any customer with id {0}")]
    CustomerNotFound(Uuid),
    #[error("Could not find any of the requested products")]
    NoProductsFound,
    #[error("Could not find any product with id {0}")]
    ProductNotFound(Uuid),
    #[error("The quantity {requested} is not available for product {product_id}")]
    InsufficientStock { product_id: Uuid, requested: i32 },
    #[error("Quantity {quantity} for product {product_id} must be positive")]
    InvalidQuantity { product_id: Uuid, quantity: i32 },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl PlaceOrderError {
    /// True when the request itself was refused, as opposed to the storage
    /// backend failing underneath it.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, PlaceOrderError::Gateway(_))
    }
}
