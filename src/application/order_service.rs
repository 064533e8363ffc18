use uuid::Uuid;

use crate::domain::errors::{GatewayError, PlaceOrderError};
use crate::domain::events::OrderPlaced;
use crate::domain::order::{Order, OrderLineRequest};
use crate::domain::ports::{CustomerGateway, EventOutbox, InventoryGateway, OrderStore, UnitOfWork};
use crate::domain::reservation::{coalesce, plan_reservation};

pub struct OrderService<S> {
    store: S,
}

impl<S: UnitOfWork> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates `requested` against current stock, persists the order and
    /// reserves the stock.
    ///
    /// Everything runs in one transaction of the backing store: the order
    /// insert and the stock decrement commit together or not at all, and the
    /// product rows read for validation stay locked until commit so
    /// concurrent placements cannot both pass the availability check.
    /// Duplicate product ids are summed; lines keep the caller's order.
    pub fn place_order(
        &self,
        customer_id: Uuid,
        requested: &[OrderLineRequest],
    ) -> Result<Order, PlaceOrderError> {
        let result = self
            .store
            .transaction(|tx| place_in_transaction(tx, customer_id, requested));

        match &result {
            Ok(order) => log::info!(
                "Placed order {} for customer {} with {} line(s)",
                order.id,
                customer_id,
                order.lines.len()
            ),
            Err(e) if e.is_rejection() => {
                log::warn!("Rejected order for customer {}: {}", customer_id, e)
            }
            Err(e) => log::error!("Failed to place order for customer {}: {}", customer_id, e),
        }
        result
    }

    pub fn get_order(&self, id: Uuid) -> Result<Option<Order>, GatewayError> {
        self.store.transaction(|tx| tx.find_by_id(id))
    }
}

fn place_in_transaction<T>(
    tx: &mut T,
    customer_id: Uuid,
    requested: &[OrderLineRequest],
) -> Result<Order, PlaceOrderError>
where
    T: CustomerGateway + InventoryGateway + OrderStore + EventOutbox,
{
    let customer = tx
        .find_customer(customer_id)?
        .ok_or(PlaceOrderError::CustomerNotFound(customer_id))?;

    let wanted = coalesce(requested)?;
    if wanted.is_empty() {
        return Err(PlaceOrderError::NoProductsFound);
    }

    let ids: Vec<Uuid> = wanted.iter().map(|l| l.product_id).collect();
    let products = tx.find_all_by_id(&ids)?;
    log::debug!("Resolved {} of {} requested product(s)", products.len(), ids.len());

    let plan = plan_reservation(&wanted, &products)?;

    let order = tx.create(&customer, plan.iter().map(|r| r.order_line()).collect())?;

    let updates: Vec<_> = plan.iter().map(|r| r.quantity_update()).collect();
    tx.update_quantities(&updates)?;

    tx.append(&OrderPlaced::from(&order))?;

    Ok(order)
}
