//! Error types for the fixture helpers.

use thiserror::Error;

/// Main error type for fixture helper operations.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Configuration error (invalid YAML, unknown driver, bad identifier, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// PostgreSQL driver error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL or SQLite driver error
    #[error("SQL driver error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// SQL Server driver error
    #[error("SQL Server error: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// One-time dialect initialization failed
    #[error("Failed to initialize {dialect} helper: {source}")]
    Init {
        dialect: String,
        #[source]
        source: Box<FixtureError>,
    },

    /// Suspending or restoring referential integrity failed
    #[error("Could not {action} referential integrity: {source}")]
    Integrity {
        action: &'static str,
        #[source]
        source: Box<FixtureError>,
    },

    /// The load function failed and restoring integrity failed afterwards
    #[error("{load}\n  Additionally failed to restore referential integrity: {restore}")]
    LoadAndRestore {
        #[source]
        load: Box<FixtureError>,
        restore: Box<FixtureError>,
    },

    /// Introspection query failed (database name, table names, ...)
    #[error("Query for {operation} failed: {source}")]
    Query {
        operation: String,
        #[source]
        source: Box<FixtureError>,
    },

    /// Cleaning a batch of tables failed
    #[error("Could not clean tables {tables:?} using query {query:?}: {source}")]
    Clean {
        tables: Vec<String>,
        query: String,
        #[source]
        source: Box<FixtureError>,
    },

    /// A single-row query returned nothing
    #[error("Query returned no rows: {query}")]
    NoRows { query: String },

    /// A column value could not be mapped to a SqlValue
    #[error("Unsupported value in column {column}: {type_name}")]
    UnsupportedValue { column: String, type_name: String },

    /// Error raised by a caller-supplied load function
    #[error("Fixture load failed: {0}")]
    Load(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl FixtureError {
    /// Create an Init error for the given dialect
    pub fn init(dialect: impl Into<String>, source: FixtureError) -> Self {
        FixtureError::Init {
            dialect: dialect.into(),
            source: Box::new(source),
        }
    }

    /// Create an Integrity error; `action` is "disable" or "restore"
    pub fn integrity(action: &'static str, source: FixtureError) -> Self {
        FixtureError::Integrity {
            action,
            source: Box::new(source),
        }
    }

    /// Create a Query error naming the failed operation
    pub fn query(operation: impl Into<String>, source: FixtureError) -> Self {
        FixtureError::Query {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a Clean error for a batch of tables
    pub fn clean(tables: &[String], query: impl Into<String>, source: FixtureError) -> Self {
        FixtureError::Clean {
            tables: tables.to_vec(),
            query: query.into(),
            source: Box::new(source),
        }
    }

    /// Create a Load error from anything printable
    pub fn load(message: impl std::fmt::Display) -> Self {
        FixtureError::Load(message.to_string())
    }

    /// Walk the source chain down to the innermost error.
    pub fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        let mut current: &(dyn std::error::Error + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for fixture helper operations.
pub type Result<T> = std::result::Result<T, FixtureError>;
