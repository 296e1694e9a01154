//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl HelperConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HelperConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yaml_minimal() {
        let config = HelperConfig::from_yaml("driver: sqlite\n").unwrap();
        assert_eq!(config.driver, "sqlite");
        assert_eq!(config.postgres.reset_sequences_to, DEFAULT_RESET_SEQUENCES_TO);
        assert!(!config.postgres.use_alter_constraint);
        assert!(!config.mysql.skip_reset_sequences);
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
driver: postgres
postgres:
  use_alter_constraint: true
  skip_reset_sequences: false
  reset_sequences_to: 500
mysql:
  skip_reset_sequences: true
"#;
        let config = HelperConfig::from_yaml(yaml).unwrap();
        assert!(config.postgres.use_alter_constraint);
        assert!(!config.postgres.use_drop_constraint);
        assert_eq!(config.postgres.reset_sequences_to, 500);
        assert!(config.mysql.skip_reset_sequences);
        assert_eq!(config.mysql.reset_sequences_to, DEFAULT_RESET_SEQUENCES_TO);
    }

    #[test]
    fn test_from_yaml_rejects_invalid() {
        let yaml = "driver: oracle\n";
        assert!(HelperConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = HelperConfig::load("/nonexistent/fixtures.yaml").unwrap_err();
        assert!(matches!(err, crate::error::FixtureError::Io(_)));
    }
}
