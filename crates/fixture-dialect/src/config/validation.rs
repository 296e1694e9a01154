//! Configuration validation.

use super::HelperConfig;
use crate::drivers::DialectKind;
use crate::error::{FixtureError, Result};

/// Validate the configuration.
pub fn validate(config: &HelperConfig) -> Result<()> {
    if config.driver.is_empty() {
        return Err(FixtureError::Config("driver is required".into()));
    }
    DialectKind::from_driver_name(&config.driver)?;

    if config.postgres.use_alter_constraint && config.postgres.use_drop_constraint {
        return Err(FixtureError::Config(
            "postgres.use_alter_constraint and postgres.use_drop_constraint are mutually exclusive"
                .into(),
        ));
    }
    if config.postgres.reset_sequences_to < 1 {
        return Err(FixtureError::Config(
            "postgres.reset_sequences_to must be at least 1".into(),
        ));
    }
    if config.mysql.reset_sequences_to < 1 {
        return Err(FixtureError::Config(
            "mysql.reset_sequences_to must be at least 1".into(),
        ));
    }

    Ok(())
}
