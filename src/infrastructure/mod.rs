pub mod memory;
pub mod models;
pub mod pg_store;
