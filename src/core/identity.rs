//! Record identity resolution
//!
//! A record's identity is taken from the first configured identity field that
//! holds a usable value. Records without one get a generated identity: by
//! default a SHA-256 digest of the record's canonical JSON, so that re-running
//! a migration over unchanged data produces the same identities.

use crate::config::FerryConfig;
use crate::domain::{FerryError, Record, Result, TableName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One candidate identity field
///
/// A rule with an empty `tables` list applies to every table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRule {
    /// Field holding the natural key
    pub field: String,

    /// Tables the rule is restricted to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<String>,
}

impl IdentityRule {
    /// Rule applying to every table
    pub fn any_table(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            tables: Vec::new(),
        }
    }

    /// Rule restricted to the given tables
    pub fn for_tables<I, S>(field: impl Into<String>, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    fn applies_to(&self, table: &TableName) -> bool {
        self.tables.is_empty() || self.tables.iter().any(|t| t == table.as_str())
    }
}

/// How identities are generated when no rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackStrategy {
    /// Digest of the record content; stable across runs
    #[default]
    ContentHash,
    /// Random UUID v4; a new identity on every run
    Random,
}

impl FromStr for FallbackStrategy {
    type Err = FerryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "content_hash" => Ok(Self::ContentHash),
            "random" => Ok(Self::Random),
            other => Err(FerryError::Configuration(format!(
                "Unknown identity fallback '{other}'"
            ))),
        }
    }
}

/// Where an identity value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// Copied from a natural key field
    Natural { field: String },
    /// Digest of the record content
    ContentHash,
    /// Randomly generated
    Random,
}

/// Identity assigned to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIdentity {
    value: String,
    source: IdentitySource,
}

impl RecordIdentity {
    /// Identity value without table prefix
    pub fn bare(&self) -> &str {
        &self.value
    }

    /// Identity value prefixed with the table name: `<table>_<value>`
    pub fn namespaced(&self, table: &TableName) -> String {
        format!("{}_{}", table.as_str(), self.value)
    }

    /// Where the value came from
    pub fn source(&self) -> &IdentitySource {
        &self.source
    }

    /// Returns true if re-resolving the same record yields the same identity
    pub fn is_deterministic(&self) -> bool {
        !matches!(self.source, IdentitySource::Random)
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A decoded record paired with its identity
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiedRecord {
    /// Resolved identity
    pub identity: RecordIdentity,
    /// Record as decoded
    pub record: Record,
}

/// Resolves record identities from an ordered rule list
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    rules: Vec<IdentityRule>,
    fallback: FallbackStrategy,
    /// Fields written by the engine itself; left out of content digests
    engine_fields: Vec<String>,
}

impl IdentityResolver {
    /// Creates a resolver over `rules`, evaluated in order
    pub fn new(rules: Vec<IdentityRule>, fallback: FallbackStrategy) -> Self {
        Self {
            rules,
            fallback,
            engine_fields: vec!["_id".to_string(), "table_name".to_string()],
        }
    }

    /// Sets the identity and table-tag field names excluded from digests
    pub fn with_engine_fields(
        mut self,
        identity_field: impl Into<String>,
        table_field: impl Into<String>,
    ) -> Self {
        self.engine_fields = vec![identity_field.into(), table_field.into()];
        self
    }

    /// Builds a resolver from the `[identity]` and `[migration]` sections
    pub fn from_config(config: &FerryConfig) -> Result<Self> {
        let fallback = config.identity.fallback.parse()?;
        Ok(Self::new(config.identity.rules.clone(), fallback).with_engine_fields(
            config.migration.identity_field.clone(),
            config.migration.table_field.clone(),
        ))
    }

    /// Resolves the identity of `record` exported from `table`
    pub fn resolve(&self, record: &Record, table: &TableName) -> RecordIdentity {
        for rule in self.rules.iter().filter(|rule| rule.applies_to(table)) {
            if let Some(value) = record.get(&rule.field).and_then(natural_key) {
                return RecordIdentity {
                    value,
                    source: IdentitySource::Natural {
                        field: rule.field.clone(),
                    },
                };
            }
        }

        match self.fallback {
            FallbackStrategy::ContentHash => RecordIdentity {
                value: self.content_digest(record),
                source: IdentitySource::ContentHash,
            },
            FallbackStrategy::Random => RecordIdentity {
                value: uuid::Uuid::new_v4().to_string(),
                source: IdentitySource::Random,
            },
        }
    }

    /// Resolves every record of a table, keeping payload order
    pub fn identify(&self, records: Vec<Record>, table: &TableName) -> Vec<IdentifiedRecord> {
        records
            .into_iter()
            .map(|record| IdentifiedRecord {
                identity: self.resolve(&record, table),
                record,
            })
            .collect()
    }

    fn content_digest(&self, record: &Record) -> String {
        let canonical: BTreeMap<&String, Value> = record
            .as_map()
            .iter()
            .filter(|(key, _)| !self.engine_fields.contains(*key))
            .map(|(key, value)| (key, canonical_json(value)))
            .collect();

        // Serializing a BTreeMap of canonical values cannot fail
        let text = serde_json::to_string(&canonical).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Renders a usable natural key, or None for null, empty and composite values
fn natural_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Recursively sorts object keys
fn canonical_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), canonical_json(v)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical_json).collect()),
        _ => value.clone(),
    }
}
