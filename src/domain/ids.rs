//! Domain identifier types with validation
//!
//! Newtype wrappers for the names that flow between the source store, the
//! migration engine and the target store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source table name newtype wrapper
///
/// Names a table in the source store. The same name is passed to the export
/// procedure, used to look up the export log, and used to tag and namespace
/// the migrated documents.
///
/// # Examples
///
/// ```
/// use ferry::domain::ids::TableName;
/// use std::str::FromStr;
///
/// let table = TableName::from_str("tb_app_clientes").unwrap();
/// assert_eq!(table.as_str(), "tb_app_clientes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a new TableName from a string
    ///
    /// Surrounding whitespace is trimmed. Empty names and names containing
    /// whitespace, control characters or path separators are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err("Table name cannot be empty".to_string());
        }

        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(format!(
                "Invalid table name '{trimmed}': whitespace and control characters are not allowed"
            ));
        }

        // names end up in snapshot file paths
        if trimmed.contains(['/', '\\']) || trimmed.starts_with('.') {
            return Err(format!(
                "Invalid table name '{trimmed}': path separators and leading dots are not allowed"
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Returns the table name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Collection name used when each table has its own collection
    ///
    /// Format: `{prefix}{table}`; an empty prefix yields the bare table name.
    pub fn to_collection_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TableName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(table: TableName) -> Self {
        table.0
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
