//! Global database connection pool.

use once_cell::sync::OnceCell;
use sea_orm::{Database, DatabaseConnection};

static DB_POOL: OnceCell<DatabaseConnection> = OnceCell::new();

/// Connect to the database and install the global pool.
/// Called once at startup; panics on connection failure.
pub async fn init_db(database_url: String) {
    let pool = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database.");

    if DB_POOL.set(pool).is_err() {
        log::warn!("init_db called twice; keeping existing pool");
    }
}

/// Get the global database pool.
/// Panics if init_db has not run.
pub fn get_db_pool() -> &'static DatabaseConnection {
    DB_POOL.get().expect("Database pool not initialized.")
}
