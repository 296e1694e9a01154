//! Identifier validation and quoting.
//!
//! Table names cannot be bound as statement parameters, so every helper
//! that builds SQL around a table name routes it through here first. The
//! quoting functions are infallible; [`validate_identifier`] is applied at
//! the points where names enter a generated script.

use crate::error::{FixtureError, Result};

/// Validate a table name before it is embedded in generated SQL.
///
/// `name` may already be quoted and schema-qualified, so only empty names
/// and names containing a NUL byte are rejected. Length limits are left to
/// the engine.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(FixtureError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(FixtureError::Config(format!(
            "Identifier contains a null byte: {:?}",
            name
        )));
    }

    Ok(())
}

/// Wrap a name in ANSI double quotes, doubling embedded quotes.
///
/// ```
/// use fixture_dialect::core::identifier::quote_ansi;
/// assert_eq!(quote_ansi("users"), "\"users\"");
/// assert_eq!(quote_ansi("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_ansi(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified PostgreSQL name, one part at a time.
///
/// `public.users` becomes `"public"."users"`.
pub fn quote_pg(name: &str) -> String {
    quote_parts(name, quote_ansi)
}

/// Quote a MySQL name with backticks, doubling embedded backticks.
///
/// The name is treated as a single identifier; MySQL table names may
/// legitimately contain dots.
pub fn quote_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quote a possibly schema-qualified SQL Server name with brackets.
///
/// `dbo.users` becomes `[dbo].[users]`; a `]` inside a part is doubled.
pub fn quote_mssql(name: &str) -> String {
    quote_parts(name, |part| format!("[{}]", part.replace(']', "]]")))
}

fn quote_parts(name: &str, quote: impl Fn(&str) -> String) -> String {
    name.split('.').map(quote).collect::<Vec<_>>().join(".")
}
