use uuid::Uuid;

use super::errors::GatewayError;
use super::events::OrderPlaced;
use super::order::{Customer, NewOrderLine, Order, Product, QuantityUpdate};

pub trait CustomerGateway {
    fn find_customer(&mut self, id: Uuid) -> Result<Option<Customer>, GatewayError>;
}

pub trait InventoryGateway {
    /// Returns the subset of `ids` that exists. Missing ids are not an error.
    ///
    /// The returned rows stay locked against concurrent reservations until
    /// the surrounding transaction ends.
    fn find_all_by_id(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, GatewayError>;

    fn update_quantities(&mut self, updates: &[QuantityUpdate]) -> Result<Vec<Product>, GatewayError>;
}

pub trait OrderStore {
    /// Persists the order header and its lines as one aggregate, assigning
    /// the order id and creation time.
    fn create(&mut self, customer: &Customer, lines: Vec<NewOrderLine>) -> Result<Order, GatewayError>;
    fn find_by_id(&mut self, id: Uuid) -> Result<Option<Order>, GatewayError>;
}

pub trait EventOutbox {
    fn append(&mut self, event: &OrderPlaced) -> Result<(), GatewayError>;
}

/// A storage backend able to run work against all gateways in one
/// transaction. Returning `Err` from the closure rolls everything back.
pub trait UnitOfWork: Send + Sync + 'static {
    type Tx<'a>: CustomerGateway + InventoryGateway + OrderStore + EventOutbox
    where
        Self: 'a;

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx<'_>) -> Result<T, E>,
        E: From<GatewayError>;
}
