use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Each import holds one connection for the whole upload, so a small pool
/// is enough. Overridable via `DATABASE_POOL_SIZE`.
const DEFAULT_POOL_SIZE: u32 = 10;

fn pool_size(raw: Option<String>) -> u32 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_POOL_SIZE)
}

pub fn init_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .max_size(pool_size(std::env::var("DATABASE_POOL_SIZE").ok()))
        .build(manager)
        .expect("Failed to create database pool");

    // Run pending migrations automatically
    let mut conn = pool.get().expect("Failed to get database connection");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");

    log::info!("Database schema is up to date");

    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size_parsing() {
        assert_eq!(pool_size(None), DEFAULT_POOL_SIZE);
        assert_eq!(pool_size(Some("4".to_string())), 4);
        assert_eq!(pool_size(Some("many".to_string())), DEFAULT_POOL_SIZE);
    }
}
