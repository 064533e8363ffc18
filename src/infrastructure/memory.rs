use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::GatewayError;
use crate::domain::events::OrderPlaced;
use crate::domain::order::{Customer, NewOrderLine, Order, OrderLine, Product, QuantityUpdate};
use crate::domain::ports::{CustomerGateway, EventOutbox, InventoryGateway, OrderStore, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct State {
    customers: HashMap<Uuid, Customer>,
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    outbox: Vec<OrderPlaced>,
}

/// In-memory backend.
///
/// Intended for tests/dev. A transaction holds the store-wide lock from start
/// to commit, so reservations are fully serialized.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    #[cfg(test)]
    fail_stock_updates: std::sync::atomic::AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_customer(&self, customer: Customer) {
        self.state().customers.insert(customer.id, customer);
    }

    pub fn insert_product(&self, product: Product) {
        self.state().products.insert(product.id, product);
    }

    pub fn product(&self, id: Uuid) -> Option<Product> {
        self.state().products.get(&id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.state().orders.len()
    }

    pub fn outbox(&self) -> Vec<OrderPlaced> {
        self.state().outbox.clone()
    }

    #[cfg(test)]
    pub(crate) fn fail_stock_updates(&self) {
        self.fail_stock_updates
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Works on a private copy of the store; the copy replaces the shared state
/// only when the transaction commits.
pub struct InMemoryTx<'a> {
    guard: MutexGuard<'a, State>,
    staged: State,
    #[cfg(test)]
    fail_stock_updates: bool,
}

impl UnitOfWork for InMemoryStore {
    type Tx<'a> = InMemoryTx<'a>;

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx<'_>) -> Result<T, E>,
        E: From<GatewayError>,
    {
        let guard = self
            .state
            .lock()
            .map_err(|_| GatewayError::Unavailable("lock poisoned".to_string()))?;
        let staged = guard.clone();

        let mut tx = InMemoryTx {
            guard,
            staged,
            #[cfg(test)]
            fail_stock_updates: self
                .fail_stock_updates
                .load(std::sync::atomic::Ordering::SeqCst),
        };
        let out = f(&mut tx)?;

        let InMemoryTx {
            mut guard, staged, ..
        } = tx;
        *guard = staged;
        Ok(out)
    }
}

impl CustomerGateway for InMemoryTx<'_> {
    fn find_customer(&mut self, id: Uuid) -> Result<Option<Customer>, GatewayError> {
        Ok(self.staged.customers.get(&id).cloned())
    }
}

impl InventoryGateway for InMemoryTx<'_> {
    fn find_all_by_id(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, GatewayError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.staged.products.get(id).cloned())
            .collect())
    }

    fn update_quantities(&mut self, updates: &[QuantityUpdate]) -> Result<Vec<Product>, GatewayError> {
        #[cfg(test)]
        if self.fail_stock_updates {
            return Err(GatewayError::Unavailable("stock updates disabled".to_string()));
        }

        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            if update.quantity < 0 {
                return Err(GatewayError::NegativeStock(update.product_id));
            }
            if let Some(product) = self.staged.products.get_mut(&update.product_id) {
                product.quantity = update.quantity;
                updated.push(product.clone());
            }
        }
        Ok(updated)
    }
}

impl OrderStore for InMemoryTx<'_> {
    fn create(&mut self, customer: &Customer, lines: Vec<NewOrderLine>) -> Result<Order, GatewayError> {
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            created_at: Utc::now(),
            lines: lines
                .into_iter()
                .map(|l| OrderLine {
                    id: Uuid::new_v4(),
                    product_id: l.product_id,
                    price: l.price,
                    quantity: l.quantity,
                })
                .collect(),
        };
        self.staged.orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn find_by_id(&mut self, id: Uuid) -> Result<Option<Order>, GatewayError> {
        Ok(self.staged.orders.get(&id).cloned())
    }
}

impl EventOutbox for InMemoryTx<'_> {
    fn append(&mut self, event: &OrderPlaced) -> Result<(), GatewayError> {
        self.staged.outbox.push(event.clone());
        Ok(())
    }
}
