//! Shared algorithms used by the default [`Helper`](super::Helper) methods
//! and by the dialect implementations.

use tracing::{debug, warn};

use crate::error::{FixtureError, Result};

use super::connection::Connection;
use super::identifier::validate_identifier;
use super::traits::{LoadFn, Queryable};

/// Build the delete script for `tables`: one `DELETE FROM <table> ;` line
/// per table, in the given order.
pub fn delete_script(tables: &[String]) -> String {
    tables
        .iter()
        .map(|table| format!("DELETE FROM {} ;\n", table))
        .collect()
}

/// Delete every row from `tables` with one script.
///
/// An empty list sends nothing. On failure the error names every table and
/// the script that was sent; nothing is retried.
pub async fn clean_tables(q: &mut dyn Queryable, tables: &[String]) -> Result<()> {
    if tables.is_empty() {
        return Ok(());
    }

    for table in tables {
        validate_identifier(table)?;
    }

    let script = delete_script(tables);
    debug!("Cleaning {} tables", tables.len());

    q.execute(&script, &[])
        .await
        .map_err(|e| FixtureError::clean(tables, script.clone(), e))?;

    Ok(())
}

/// Statements that suspend and restore referential integrity around a load.
///
/// Any of the three may be empty, in which case it is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityPlan {
    /// Run on the connection before the transaction opens.
    pub disable: String,
    /// Run inside the transaction before the load.
    pub begin: String,
    /// Run on the connection after the transaction ends, on every path.
    pub restore: String,
}

impl IntegrityPlan {
    /// Plan with only connection-level disable/restore statements.
    pub fn on_connection(disable: impl Into<String>, restore: impl Into<String>) -> Self {
        Self {
            disable: disable.into(),
            begin: String::new(),
            restore: restore.into(),
        }
    }

    /// Plan that suspends inside the transaction and restores on the
    /// connection afterwards.
    pub fn in_transaction(begin: impl Into<String>, restore: impl Into<String>) -> Self {
        Self {
            disable: String::new(),
            begin: begin.into(),
            restore: restore.into(),
        }
    }
}

/// Run `load` in a new transaction, with `prelude` executed first inside it.
///
/// Commits when `load` succeeds and rolls back otherwise. A failing
/// rollback is logged and the load error is returned.
pub async fn load_in_transaction(
    conn: &mut Connection,
    prelude: &str,
    load: &mut dyn LoadFn,
) -> Result<()> {
    let mut tx = conn.begin().await?;

    if !prelude.trim().is_empty() {
        if let Err(e) = tx.execute(prelude, &[]).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback after failed integrity suspension failed: {}", rollback_err);
            }
            return Err(FixtureError::integrity("disable", e));
        }
    }

    match load.run(&mut tx).await {
        Ok(()) => tx.commit().await,
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback after failed load failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

/// Suspend integrity according to `plan`, run `load` in a transaction, and
/// always run the restore statement afterwards.
pub async fn with_integrity_suspended(
    conn: &mut Connection,
    plan: &IntegrityPlan,
    load: &mut dyn LoadFn,
) -> Result<()> {
    if !plan.disable.trim().is_empty() {
        debug!("Suspending referential integrity:\n{}", plan.disable);
        if let Err(e) = conn.execute(&plan.disable, &[]).await {
            // The script may have partially applied.
            if let Err(restore_err) = restore(conn, &plan.restore).await {
                warn!("Restore after failed integrity suspension failed: {}", restore_err);
            }
            return Err(FixtureError::integrity("disable", e));
        }
    }

    let outcome = load_in_transaction(conn, &plan.begin, load).await;
    let restored = restore(conn, &plan.restore).await;

    merge(outcome, restored)
}

async fn restore(conn: &mut Connection, sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Ok(());
    }
    debug!("Restoring referential integrity:\n{}", sql);
    conn.execute(sql, &[]).await.map(|_| ())
}

/// Combine a load outcome with the result of restoring integrity.
///
/// The load error wins; a restore failure on its own becomes an
/// `Integrity` error; both together become `LoadAndRestore`.
pub fn merge(outcome: Result<()>, restored: Result<()>) -> Result<()> {
    match (outcome, restored) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(load), Ok(())) => Err(load),
        (Ok(()), Err(restore)) => Err(FixtureError::integrity("restore", restore)),
        (Err(load), Err(restore)) => Err(FixtureError::LoadAndRestore {
            load: Box::new(load),
            restore: Box::new(restore),
        }),
    }
}
