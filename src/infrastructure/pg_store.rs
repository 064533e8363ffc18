use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::GatewayError;
use crate::domain::events::{OrderPlaced, ORDER_AGGREGATE};
use crate::domain::order::{Customer, NewOrderLine, Order, OrderLine, Product, QuantityUpdate};
use crate::domain::ports::{CustomerGateway, EventOutbox, InventoryGateway, OrderStore, UnitOfWork};
use crate::schema::{commerce_order_outbox, customers, order_lines, orders, products};

use super::models::{
    CustomerRow, NewCustomerRow, NewOrderLineRow, NewOrderRow, NewOutboxEventRow, NewProductRow,
    OrderLineRow, OrderRow, ProductRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for GatewayError {
    fn from(e: diesel::result::Error) -> Self {
        GatewayError::Storage(e.to_string())
    }
}

impl From<r2d2::Error> for GatewayError {
    fn from(e: r2d2::Error) -> Self {
        GatewayError::Unavailable(e.to_string())
    }
}

/// Keeps the caller's error apart from the database error that diesel's
/// transaction wrapper needs to be able to produce.
enum TxError<E> {
    Aborted(E),
    Database(diesel::result::Error),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(e: diesel::result::Error) -> Self {
        TxError::Database(e)
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn insert_customer(&self, id: Uuid) -> Result<Customer, GatewayError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(customers::table)
            .values(&NewCustomerRow { id })
            .returning(CustomerRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    pub fn insert_product(
        &self,
        name: &str,
        price: BigDecimal,
        quantity: i32,
    ) -> Result<Product, GatewayError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: name.to_string(),
                price,
                quantity,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }
}

pub struct PgTx<'a> {
    conn: &'a mut PgConnection,
}

impl UnitOfWork for PgStore {
    type Tx<'a> = PgTx<'a>;

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self::Tx<'_>) -> Result<T, E>,
        E: From<GatewayError>,
    {
        let mut pooled = self.pool.get().map_err(GatewayError::from)?;
        let conn: &mut PgConnection = &mut pooled;

        conn.transaction::<_, TxError<E>, _>(|conn| f(&mut PgTx { conn }).map_err(TxError::Aborted))
            .map_err(|e| match e {
                TxError::Aborted(e) => e,
                TxError::Database(e) => GatewayError::from(e).into(),
            })
    }
}

impl CustomerGateway for PgTx<'_> {
    fn find_customer(&mut self, id: Uuid) -> Result<Option<Customer>, GatewayError> {
        let row = customers::table
            .find(id)
            .select(CustomerRow::as_select())
            .first(self.conn)
            .optional()?;
        Ok(row.map(Customer::from))
    }
}

impl InventoryGateway for PgTx<'_> {
    fn find_all_by_id(&mut self, ids: &[Uuid]) -> Result<Vec<Product>, GatewayError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        // Locked in id order so two placements touching the same products
        // cannot deadlock each other.
        let rows = products::table
            .select(ProductRow::as_select())
            .filter(products::id.eq_any(ids))
            .order(products::id.asc())
            .for_update()
            .load(self.conn)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn update_quantities(&mut self, updates: &[QuantityUpdate]) -> Result<Vec<Product>, GatewayError> {
        let mut updated = Vec::with_capacity(updates.len());
        for update in updates {
            if update.quantity < 0 {
                return Err(GatewayError::NegativeStock(update.product_id));
            }
            let row = diesel::update(products::table.find(update.product_id))
                .set((
                    products::quantity.eq(update.quantity),
                    products::updated_at.eq(Utc::now()),
                ))
                .returning(ProductRow::as_returning())
                .get_result(self.conn)
                .optional()?;
            updated.extend(row.map(Product::from));
        }
        Ok(updated)
    }
}

impl OrderStore for PgTx<'_> {
    fn create(&mut self, customer: &Customer, lines: Vec<NewOrderLine>) -> Result<Order, GatewayError> {
        // 1. Insert the order
        let order_id = Uuid::new_v4();
        let header = diesel::insert_into(orders::table)
            .values(&NewOrderRow {
                id: order_id,
                customer_id: customer.id,
            })
            .returning(OrderRow::as_returning())
            .get_result(self.conn)?;

        // 2. Insert order lines, numbered in the order they were given
        let new_lines = lines
            .into_iter()
            .enumerate()
            .map(|(idx, l)| {
                let position = i32::try_from(idx)
                    .map_err(|_| GatewayError::Storage(format!("too many order lines: {}", idx)))?;
                Ok(NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: l.product_id,
                    position,
                    quantity: l.quantity,
                    price: l.price,
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        let mut rows: Vec<OrderLineRow> = if new_lines.is_empty() {
            vec![]
        } else {
            diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .returning(OrderLineRow::as_returning())
                .get_results(self.conn)?
        };
        rows.sort_by_key(|l| l.position);

        Ok(Order {
            id: header.id,
            customer_id: header.customer_id,
            created_at: header.created_at,
            lines: rows.into_iter().map(OrderLine::from).collect(),
        })
    }

    fn find_by_id(&mut self, id: Uuid) -> Result<Option<Order>, GatewayError> {
        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(self.conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = order_lines::table
            .filter(order_lines::order_id.eq(order.id))
            .order(order_lines::position.asc())
            .select(OrderLineRow::as_select())
            .load(self.conn)?;

        Ok(Some(Order {
            id: order.id,
            customer_id: order.customer_id,
            created_at: order.created_at,
            lines: lines.into_iter().map(OrderLine::from).collect(),
        }))
    }
}

impl EventOutbox for PgTx<'_> {
    /// Debezium's EventRouter SMT derives the Kafka topic from `aggregate_type`.
    fn append(&mut self, event: &OrderPlaced) -> Result<(), GatewayError> {
        let payload = serde_json::to_value(event).map_err(|e| GatewayError::Storage(e.to_string()))?;

        diesel::insert_into(commerce_order_outbox::table)
            .values(&NewOutboxEventRow {
                id: Uuid::new_v4(),
                aggregate_type: ORDER_AGGREGATE.to_string(),
                aggregate_id: event.order_id.to_string(),
                event_type: OrderPlaced::EVENT_TYPE.to_string(),
                payload,
            })
            .execute(self.conn)?;
        Ok(())
    }
}
