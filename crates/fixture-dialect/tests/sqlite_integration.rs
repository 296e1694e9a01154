//! End-to-end fixture cycles against in-memory SQLite.
//!
//! Schema: `orders.user_id` references `users.id`, plus a table whose name
//! needs quoting.

mod common;

use std::sync::Arc;

use fixture_dialect::{
    load_fn, DialectImpl, DialectKind, FixtureError, Helper, HelperConfig, ParamType, Queryable,
};

use common::{count, seeded_sqlite, sqlite};

fn helper() -> DialectImpl {
    let config = HelperConfig::from_yaml("driver: sqlite\n").unwrap();
    DialectImpl::from_config(&config).unwrap()
}

// =============================================================================
// Selection and introspection
// =============================================================================

#[tokio::test]
async fn test_sqlite_driver_selects_sqlite_dialect() {
    let helper = helper();
    assert_eq!(helper.kind(), DialectKind::Sqlite);
    assert_eq!(helper.name(), "sqlite");
    assert_eq!(helper.param_type(), ParamType::Question);
    assert!(helper.batch_splitter().is_none());
}

#[tokio::test]
async fn test_database_name_and_tables() {
    let helper = helper();
    let mut conn = sqlite().await;

    helper.init(&mut conn).await.unwrap();
    assert_eq!(helper.database_name(&mut conn).await.unwrap(), ":memory:");
    assert_eq!(
        helper.table_names(&mut conn).await.unwrap(),
        vec!["users", "orders", "weird name"]
    );
}

#[tokio::test]
async fn test_quoted_keyword_resolves_to_table() {
    let helper = helper();
    let mut conn = sqlite().await;
    let table = helper.quote_keyword("weird name");

    conn.execute(&format!("INSERT INTO {} VALUES (1)", table), &[])
        .await
        .unwrap();
    assert_eq!(count(&mut conn, &table).await, 1);
}

// =============================================================================
// Default hooks
// =============================================================================

#[tokio::test]
async fn test_default_hooks() {
    let helper = helper();
    let mut conn = seeded_sqlite().await;

    for table in ["users", "orders", "missing"] {
        assert!(helper.is_table_modified(&mut conn, table).await.unwrap());
    }
    helper.after_load(&mut conn).await.unwrap();
    helper
        .save_state(&mut conn, &["users".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_default_while_insert_calls_insert_once() {
    let helper = helper();
    let mut conn = sqlite().await;
    let mut calls = 0;

    let mut tx = conn.begin().await.unwrap();
    let mut insert = load_fn(|tx| {
        calls += 1;
        Box::pin(async move {
            tx.execute("INSERT INTO users VALUES (1, 'ann')", &[]).await?;
            Ok::<(), FixtureError>(())
        })
    });
    helper
        .while_insert_on_table(&mut tx, "users", &mut insert)
        .await
        .unwrap();
    drop(insert);
    tx.commit().await.unwrap();

    assert_eq!(calls, 1);
    assert_eq!(count(&mut conn, "users").await, 1);
}

#[tokio::test]
async fn test_default_while_insert_returns_insert_error() {
    let helper = helper();
    let mut conn = sqlite().await;

    let mut tx = conn.begin().await.unwrap();
    let mut insert = load_fn(|_tx| Box::pin(async { Err::<(), _>(FixtureError::load("bad row")) }));
    let err = helper
        .while_insert_on_table(&mut tx, "users", &mut insert)
        .await
        .unwrap_err();
    tx.rollback().await.unwrap();

    assert_eq!(err.to_string(), "Fixture load failed: bad row");
}

// =============================================================================
// Cleaning
// =============================================================================

#[tokio::test]
async fn test_clean_tables_children_first() {
    let helper = helper();
    let mut conn = seeded_sqlite().await;
    let weird = helper.quote_keyword("weird name");
    conn.execute(&format!("INSERT INTO {} VALUES (7)", weird), &[])
        .await
        .unwrap();

    let tables = vec![helper.quote_keyword("orders"), helper.quote_keyword("users")];
    let mut tx = conn.begin().await.unwrap();
    helper.clean_tables(&mut tx, &tables).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(count(&mut conn, "orders").await, 0);
    assert_eq!(count(&mut conn, "users").await, 0);
    assert_eq!(count(&mut conn, &weird).await, 1);
}

#[tokio::test]
async fn test_clean_tables_unknown_table_names_it() {
    let helper = helper();
    let mut conn = seeded_sqlite().await;
    let tables = vec!["orders".to_string(), "no_such_table".to_string()];

    let mut tx = conn.begin().await.unwrap();
    let err = helper.clean_tables(&mut tx, &tables).await.unwrap_err();
    tx.rollback().await.unwrap();

    let msg = err.to_string();
    assert!(msg.contains("no_such_table"), "{}", msg);
    assert!(msg.contains("DELETE FROM orders ;"), "{}", msg);
    assert_eq!(count(&mut conn, "orders").await, 2);
}

// =============================================================================
// Referential integrity
// =============================================================================

#[tokio::test]
async fn test_full_cycle_inserts_children_before_parents() {
    let helper = Arc::new(helper());
    let mut conn = seeded_sqlite().await;
    helper.init(&mut conn).await.unwrap();

    let cycle = helper.clone();
    let tables = vec![helper.quote_keyword("users"), helper.quote_keyword("orders")];
    let mut load = load_fn(|tx| {
        let helper = cycle.clone();
        let tables = tables.clone();
        Box::pin(async move {
            // Parents are cleaned first, which only works while checks are deferred.
            helper.clean_tables(tx, &tables).await?;

            let mut orders = load_fn(|tx| {
                Box::pin(async move {
                    tx.execute(
                        "INSERT INTO orders VALUES (?, ?, ?)",
                        &[20_i64.into(), 3_i64.into(), 12.5.into()],
                    )
                    .await?;
                    Ok::<(), FixtureError>(())
                })
            });
            helper.while_insert_on_table(tx, "orders", &mut orders).await?;

            let mut users = load_fn(|tx| {
                Box::pin(async move {
                    tx.execute("INSERT INTO users VALUES (?, ?)", &[3_i64.into(), "cy".into()])
                        .await?;
                    Ok::<(), FixtureError>(())
                })
            });
            helper.while_insert_on_table(tx, "users", &mut users).await?;
            Ok::<(), FixtureError>(())
        })
    });

    helper
        .disable_referential_integrity(&mut conn, &mut load)
        .await
        .unwrap();
    drop(load);
    helper.after_load(&mut conn).await.unwrap();

    assert_eq!(count(&mut conn, "users").await, 1);
    assert_eq!(count(&mut conn, "orders").await, 1);
    let row = conn
        .query_row("SELECT user_id FROM orders WHERE id = ?", &[20_i64.into()])
        .await
        .unwrap();
    assert_eq!(row.try_get_i64(0).unwrap(), 3);
}

#[tokio::test]
async fn test_integrity_enforced_after_successful_load() {
    let helper = helper();
    let mut conn = seeded_sqlite().await;
    let mut load = load_fn(|tx| {
        Box::pin(async move {
            tx.execute("INSERT INTO users VALUES (3, 'cy')", &[]).await?;
            Ok::<(), FixtureError>(())
        })
    });

    helper
        .disable_referential_integrity(&mut conn, &mut load)
        .await
        .unwrap();

    let violation = conn
        .execute("INSERT INTO orders VALUES (99, 404, 1.0)", &[])
        .await;
    assert!(violation.is_err());
    assert_eq!(count(&mut conn, "orders").await, 2);
}

#[tokio::test]
async fn test_load_error_is_root_cause_and_integrity_restored() {
    let helper = helper();
    let mut conn = seeded_sqlite().await;
    let mut load = load_fn(|tx| {
        Box::pin(async move {
            tx.execute("DELETE FROM users", &[]).await?;
            Err::<(), _>(FixtureError::load("fixture users.yml is malformed"))
        })
    });

    let err = helper
        .disable_referential_integrity(&mut conn, &mut load)
        .await
        .unwrap_err();
    assert_eq!(
        err.root_cause().to_string(),
        "Fixture load failed: fixture users.yml is malformed"
    );

    // Rolled back, and enforcement is back.
    assert_eq!(count(&mut conn, "users").await, 2);
    let violation = conn
        .execute("INSERT INTO orders VALUES (99, 404, 1.0)", &[])
        .await;
    assert!(violation.is_err());
}

#[tokio::test]
async fn test_driver_error_inside_load_is_propagated() {
    let helper = helper();
    let mut conn = seeded_sqlite().await;
    let mut load = load_fn(|tx| {
        Box::pin(async move {
            tx.execute("INSERT INTO users VALUES (1, 'duplicate')", &[])
                .await?;
            Ok::<(), FixtureError>(())
        })
    });

    let err = helper
        .disable_referential_integrity(&mut conn, &mut load)
        .await
        .unwrap_err();
    assert!(matches!(err, FixtureError::Sqlx(_)), "{}", err.format_detailed());
    assert_eq!(count(&mut conn, "users").await, 2);
}
