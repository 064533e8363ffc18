pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod infrastructure;
pub mod schema;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub use application::order_service::OrderService;
pub use config::{Config, ConfigError, PoolSettings};
pub use db::{create_pool, DbPool};
pub use domain::errors::{GatewayError, PlaceOrderError};
pub use domain::order::{Customer, Order, OrderLine, OrderLineRequest, Product};
pub use infrastructure::memory::InMemoryStore;
pub use infrastructure::pg_store::PgStore;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database and return
/// how many were applied.
pub fn run_migrations(pool: &DbPool) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    Ok(applied.len())
}
