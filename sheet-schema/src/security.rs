//! SQL identifier handling.
//!
//! Table and column names come from user uploads. Anything spliced into a
//! DataFusion query or an emitted DDL statement goes through [`SqlSecurity`]
//! first.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SchemaError};
use crate::schema::normalizer::SQL_RESERVED;

/// Longest identifier accepted in generated SQL.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

// Compile-time constant pattern.
#[allow(clippy::expect_used)]
static PLAIN_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*$").expect("Hard-coded regex pattern should be valid")
});

/// SQL identifier validation and escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates an identifier and wraps it in double quotes, doubling any
    /// embedded quote.
    ///
    /// # Examples
    /// ```rust
    /// use sheet_schema::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::escape_identifier("customer_id").unwrap(), "\"customer_id\"");
    /// assert_eq!(SqlSecurity::escape_identifier("a\"b").unwrap(), "\"a\"\"b\"");
    /// assert!(SqlSecurity::escape_identifier("").is_err());
    /// ```
    pub fn escape_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Rejects identifiers that cannot be quoted safely.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(SchemaError::InvalidReference(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }
        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(SchemaError::InvalidReference(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }
        if identifier.contains('\0') {
            return Err(SchemaError::InvalidReference(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the identifier can appear unquoted in DDL: lower-case ASCII,
    /// digits and underscores, not starting with a digit, not a keyword.
    pub fn is_plain_identifier(identifier: &str) -> bool {
        PLAIN_IDENTIFIER.is_match(identifier) && !SQL_RESERVED.contains(&identifier)
    }

    /// The identifier as it should be written in emitted DDL: bare when
    /// plain, quoted otherwise.
    pub fn ddl_identifier(identifier: &str) -> Result<String> {
        if Self::is_plain_identifier(identifier) {
            Ok(identifier.to_string())
        } else {
            Self::escape_identifier(identifier)
        }
    }
}
