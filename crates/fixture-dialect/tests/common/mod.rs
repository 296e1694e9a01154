//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::sync::Once;

use fixture_dialect::{Connection, Queryable};
use sqlx::Connection as _;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Schema shared by the scenarios: `orders.user_id` references `users.id`.
pub const SCHEMA: &str = "
    CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        total REAL
    );
    CREATE TABLE \"weird name\" (id INTEGER PRIMARY KEY);
";

pub const SEED: &str = "
    INSERT INTO users VALUES (1, 'ann'), (2, 'bob');
    INSERT INTO orders VALUES (10, 1, 9.5), (11, 2, 20.0);
";

/// Fresh in-memory SQLite database with the schema applied.
pub async fn sqlite() -> Connection {
    init_tracing();
    let conn = sqlx::SqliteConnection::connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    let mut conn = Connection::from(conn);
    conn.execute(SCHEMA, &[]).await.expect("create schema");
    conn
}

/// Same as [`sqlite`], with a user and an order per user.
pub async fn seeded_sqlite() -> Connection {
    let mut conn = sqlite().await;
    conn.execute(SEED, &[]).await.expect("seed rows");
    conn
}

pub async fn count(q: &mut dyn Queryable, table: &str) -> i64 {
    q.query_row(&format!("SELECT COUNT(*) FROM {}", table), &[])
        .await
        .expect("count rows")
        .try_get_i64(0)
        .expect("integer count")
}
