use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};

use crate::config::PoolSettings;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Connection checkout is bounded by `settings.connection_timeout`; storage
/// timeouts are enforced here rather than by the order engine.
pub fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<DbPool, PoolError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(settings.max_size)
        .connection_timeout(settings.connection_timeout)
        .build(manager)
}
