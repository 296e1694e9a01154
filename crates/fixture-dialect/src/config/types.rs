//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Value sequences and auto-increment counters are reset to after a load.
pub const DEFAULT_RESET_SEQUENCES_TO: i64 = 10_000;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Driver name used to select the dialect (e.g. "postgres", "mysql",
    /// "sqlite", "sqlserver").
    pub driver: String,

    /// PostgreSQL-specific options.
    #[serde(default)]
    pub postgres: PostgresOptions,

    /// MySQL-specific options.
    #[serde(default)]
    pub mysql: MysqlOptions,
}

impl HelperConfig {
    /// Create a configuration for the given driver with default options.
    pub fn for_driver(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            postgres: PostgresOptions::default(),
            mysql: MysqlOptions::default(),
        }
    }
}

/// How PostgreSQL suspends foreign key checks during a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostgresIntegrityStrategy {
    /// `ALTER TABLE ... DISABLE TRIGGER ALL` (requires superuser).
    DisableTriggers,
    /// Make foreign keys `DEFERRABLE` and defer them for the transaction.
    AlterConstraint,
    /// Drop foreign keys and re-create them afterwards.
    DropConstraint,
}

/// PostgreSQL options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresOptions {
    /// Defer foreign keys instead of disabling triggers.
    #[serde(default)]
    pub use_alter_constraint: bool,

    /// Drop and re-create foreign keys instead of disabling triggers.
    #[serde(default)]
    pub use_drop_constraint: bool,

    /// Do not reset sequences after a load.
    #[serde(default)]
    pub skip_reset_sequences: bool,

    /// Value sequences are reset to (default: 10000).
    #[serde(default = "default_reset_sequences_to")]
    pub reset_sequences_to: i64,
}

impl PostgresOptions {
    /// Integrity strategy selected by the flags.
    pub fn strategy(&self) -> PostgresIntegrityStrategy {
        if self.use_drop_constraint {
            PostgresIntegrityStrategy::DropConstraint
        } else if self.use_alter_constraint {
            PostgresIntegrityStrategy::AlterConstraint
        } else {
            PostgresIntegrityStrategy::DisableTriggers
        }
    }
}

impl Default for PostgresOptions {
    fn default() -> Self {
        Self {
            use_alter_constraint: false,
            use_drop_constraint: false,
            skip_reset_sequences: false,
            reset_sequences_to: DEFAULT_RESET_SEQUENCES_TO,
        }
    }
}

/// MySQL options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysqlOptions {
    /// Do not reset AUTO_INCREMENT counters after a load.
    #[serde(default)]
    pub skip_reset_sequences: bool,

    /// Value AUTO_INCREMENT counters are reset to (default: 10000).
    #[serde(default = "default_reset_sequences_to")]
    pub reset_sequences_to: i64,
}

impl Default for MysqlOptions {
    fn default() -> Self {
        Self {
            skip_reset_sequences: false,
            reset_sequences_to: DEFAULT_RESET_SEQUENCES_TO,
        }
    }
}

fn default_reset_sequences_to() -> i64 {
    DEFAULT_RESET_SEQUENCES_TO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_strategy() {
        let mut opts = PostgresOptions::default();
        assert_eq!(opts.strategy(), PostgresIntegrityStrategy::DisableTriggers);

        opts.use_alter_constraint = true;
        assert_eq!(opts.strategy(), PostgresIntegrityStrategy::AlterConstraint);

        opts.use_alter_constraint = false;
        opts.use_drop_constraint = true;
        assert_eq!(opts.strategy(), PostgresIntegrityStrategy::DropConstraint);
    }
}
