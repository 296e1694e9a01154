//! PostgreSQL fixture helper.
//!
//! Foreign keys are suspended with one of three strategies (see
//! [`PostgresIntegrityStrategy`]). Triggers are the default: it needs
//! superuser rights but leaves the schema untouched.

use std::sync::OnceLock;

use async_trait::async_trait;
use tracing::debug;

use crate::config::{PostgresIntegrityStrategy, PostgresOptions};
use crate::core::base::{self, IntegrityPlan};
use crate::core::identifier::{quote_ansi, quote_pg};
use crate::core::traits::{Helper, LoadFn, ParamType, Queryable};
use crate::core::Connection;
use crate::error::{FixtureError, Result};

const TABLES_QUERY: &str = r#"
    SELECT pg_namespace.nspname || '.' || pg_class.relname
    FROM pg_class
    INNER JOIN pg_namespace ON pg_namespace.oid = pg_class.relnamespace
    WHERE pg_class.relkind = 'r'
      AND pg_namespace.nspname NOT IN ('pg_catalog', 'information_schema')
      AND pg_namespace.nspname NOT LIKE 'pg_toast%'
      AND pg_namespace.nspname NOT LIKE '\_timescaledb%'
    ORDER BY pg_class.oid
"#;

const SEQUENCES_QUERY: &str = r#"
    SELECT pg_namespace.nspname || '.' || pg_class.relname
    FROM pg_class
    INNER JOIN pg_namespace ON pg_namespace.oid = pg_class.relnamespace
    WHERE pg_class.relkind = 'S'
      AND pg_namespace.nspname NOT LIKE '\_timescaledb%'
    ORDER BY pg_class.oid
"#;

const NON_DEFERRABLE_QUERY: &str = r#"
    SELECT table_schema || '.' || table_name, constraint_name
    FROM information_schema.table_constraints
    WHERE constraint_type = 'FOREIGN KEY'
      AND is_deferrable = 'NO'
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT pg_namespace.nspname || '.' || pg_class.relname,
           pg_constraint.conname,
           pg_get_constraintdef(pg_constraint.oid)
    FROM pg_constraint
    INNER JOIN pg_class ON pg_class.oid = pg_constraint.conrelid
    INNER JOIN pg_namespace ON pg_namespace.oid = pg_class.relnamespace
    WHERE pg_constraint.contype = 'f'
      AND pg_namespace.nspname NOT IN ('pg_catalog', 'information_schema')
    ORDER BY pg_namespace.nspname, pg_class.relname, pg_constraint.conname
"#;

/// A foreign key as cached by [`PostgresDialect::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// `schema.table` owning the constraint.
    pub table: String,
    /// Constraint name.
    pub name: String,
    /// `pg_get_constraintdef` output; empty when only deferrability is needed.
    pub definition: String,
}

/// PostgreSQL helper.
#[derive(Debug, Default)]
pub struct PostgresDialect {
    options: PostgresOptions,
    tables: OnceLock<Vec<String>>,
    sequences: OnceLock<Vec<String>>,
    foreign_keys: OnceLock<Vec<ForeignKey>>,
}

impl PostgresDialect {
    /// Create a PostgreSQL helper with the given options.
    pub fn new(options: PostgresOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Options this helper was built with.
    pub fn options(&self) -> &PostgresOptions {
        &self.options
    }

    async fn cached_tables(&self, q: &mut dyn Queryable) -> Result<&[String]> {
        if let Some(tables) = self.tables.get() {
            return Ok(tables);
        }
        let tables = self.table_names(q).await?;
        debug!("Cached {} PostgreSQL tables", tables.len());
        Ok(self.tables.get_or_init(|| tables))
    }

    async fn cached_sequences(&self, q: &mut dyn Queryable) -> Result<&[String]> {
        if let Some(sequences) = self.sequences.get() {
            return Ok(sequences);
        }
        let sequences = q
            .query(SEQUENCES_QUERY, &[])
            .await
            .and_then(|rows| rows.iter().map(|r| r.try_get_string(0)).collect::<Result<Vec<_>>>())
            .map_err(|e| FixtureError::query("sequence names", e))?;
        debug!("Cached {} PostgreSQL sequences", sequences.len());
        Ok(self.sequences.get_or_init(|| sequences))
    }

    /// Foreign keys relevant to the configured strategy: the non-deferrable
    /// ones for `AlterConstraint`, all of them (with definitions) for
    /// `DropConstraint`, none for `DisableTriggers`.
    async fn cached_foreign_keys(&self, q: &mut dyn Queryable) -> Result<&[ForeignKey]> {
        if let Some(fks) = self.foreign_keys.get() {
            return Ok(fks);
        }

        let fks = match self.options.strategy() {
            PostgresIntegrityStrategy::DisableTriggers => Vec::new(),
            PostgresIntegrityStrategy::AlterConstraint => {
                let rows = q
                    .query(NON_DEFERRABLE_QUERY, &[])
                    .await
                    .map_err(|e| FixtureError::query("non-deferrable constraints", e))?;
                rows.iter()
                    .map(|r| {
                        Ok(ForeignKey {
                            table: r.try_get_string(0)?,
                            name: r.try_get_string(1)?,
                            definition: String::new(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            PostgresIntegrityStrategy::DropConstraint => {
                let rows = q
                    .query(FOREIGN_KEYS_QUERY, &[])
                    .await
                    .map_err(|e| FixtureError::query("foreign key definitions", e))?;
                rows.iter()
                    .map(|r| {
                        Ok(ForeignKey {
                            table: r.try_get_string(0)?,
                            name: r.try_get_string(1)?,
                            definition: r.try_get_string(2)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        debug!("Cached {} PostgreSQL foreign keys", fks.len());
        Ok(self.foreign_keys.get_or_init(|| fks))
    }

    async fn integrity_plan(&self, q: &mut dyn Queryable) -> Result<IntegrityPlan> {
        let plan = match self.options.strategy() {
            PostgresIntegrityStrategy::DisableTriggers => {
                let tables = self.cached_tables(q).await?;
                IntegrityPlan::in_transaction(
                    trigger_script(tables, "DISABLE"),
                    trigger_script(tables, "ENABLE"),
                )
            }
            PostgresIntegrityStrategy::AlterConstraint => {
                let fks = self.cached_foreign_keys(q).await?;
                IntegrityPlan {
                    disable: deferrable_script(fks, "DEFERRABLE"),
                    begin: "SET CONSTRAINTS ALL DEFERRED".to_string(),
                    restore: deferrable_script(fks, "NOT DEFERRABLE"),
                }
            }
            PostgresIntegrityStrategy::DropConstraint => {
                let fks = self.cached_foreign_keys(q).await?;
                IntegrityPlan::on_connection(drop_script(fks), add_script(fks))
            }
        };
        Ok(plan)
    }
}

fn trigger_script(tables: &[String], action: &str) -> String {
    tables
        .iter()
        .map(|t| format!("ALTER TABLE {} {} TRIGGER ALL;\n", quote_pg(t), action))
        .collect()
}

fn deferrable_script(fks: &[ForeignKey], mode: &str) -> String {
    fks.iter()
        .map(|fk| {
            format!(
                "ALTER TABLE {} ALTER CONSTRAINT {} {};\n",
                quote_pg(&fk.table),
                quote_ansi(&fk.name),
                mode
            )
        })
        .collect()
}

fn drop_script(fks: &[ForeignKey]) -> String {
    fks.iter()
        .map(|fk| {
            format!(
                "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};\n",
                quote_pg(&fk.table),
                quote_ansi(&fk.name)
            )
        })
        .collect()
}

fn add_script(fks: &[ForeignKey]) -> String {
    fks.iter()
        .map(|fk| {
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {} {};\n",
                quote_pg(&fk.table),
                quote_ansi(&fk.name),
                fk.definition
            )
        })
        .collect()
}

#[async_trait]
impl Helper for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn init(&self, conn: &mut dyn Queryable) -> Result<()> {
        let init_err = |e| FixtureError::init("postgres", e);
        self.cached_tables(conn).await.map_err(init_err)?;
        self.cached_sequences(conn).await.map_err(init_err)?;
        self.cached_foreign_keys(conn).await.map_err(init_err)?;
        Ok(())
    }

    async fn disable_referential_integrity(
        &self,
        conn: &mut Connection,
        load: &mut dyn LoadFn,
    ) -> Result<()> {
        let plan = self.integrity_plan(conn).await?;
        base::with_integrity_suspended(conn, &plan, load).await
    }

    fn param_type(&self) -> ParamType {
        ParamType::Dollar
    }

    async fn database_name(&self, q: &mut dyn Queryable) -> Result<String> {
        q.query_row("SELECT current_database()", &[])
            .await
            .and_then(|row| row.try_get_string(0))
            .map_err(|e| FixtureError::query("database name", e))
    }

    async fn table_names(&self, q: &mut dyn Queryable) -> Result<Vec<String>> {
        let rows = q
            .query(TABLES_QUERY, &[])
            .await
            .map_err(|e| FixtureError::query("table names", e))?;
        rows.iter().map(|r| r.try_get_string(0)).collect()
    }

    async fn after_load(&self, q: &mut dyn Queryable) -> Result<()> {
        if self.options.skip_reset_sequences {
            return Ok(());
        }

        let sql = format!(
            "SELECT SETVAL(CAST({} AS TEXT)::regclass, {})",
            self.param_type().placeholder(1),
            self.param_type().placeholder(2)
        );
        let sequences = self.cached_sequences(q).await?.to_vec();
        for sequence in &sequences {
            debug!("Resetting sequence {} to {}", sequence, self.options.reset_sequences_to);
            q.query(
                &sql,
                &[quote_pg(sequence).into(), self.options.reset_sequences_to.into()],
            )
            .await
            .map_err(|e| FixtureError::query(format!("resetting sequence {}", sequence), e))?;
        }
        Ok(())
    }

    fn quote_keyword(&self, name: &str) -> String {
        quote_pg(name)
    }
}
