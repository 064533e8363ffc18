use dotenvy::dotenv;
use order_placement::{create_pool, run_migrations, Config};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env()?;
    let pool = create_pool(&config.database_url, &config.pool)?;

    let applied = run_migrations(&pool)?;
    log::info!(
        "Database ready ({} migration(s) applied, pool size {})",
        applied,
        config.pool.max_size
    );

    Ok(())
}
