//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::FerryConfig;
use super::secret::secret_string;
use crate::domain::errors::FerryError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into FerryConfig
/// 4. Applies environment variable overrides (FERRY_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`FerryError::Configuration`] if the file cannot be read or parsed,
/// a referenced environment variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use ferry::config::loader::load_config;
///
/// let config = load_config("ferry.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FerryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FerryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        FerryError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration text
///
/// Same pipeline as [`load_config`] minus the file read.
pub fn parse_config(contents: &str) -> Result<FerryConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: FerryConfig = toml::from_str(&contents)
        .map_err(|e| FerryError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        FerryError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| FerryError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(FerryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using the FERRY_* prefix
///
/// Variables follow the pattern FERRY_<SECTION>_<KEY>, for example
/// FERRY_MIGRATION_POLICY or FERRY_COSMOSDB_KEY. Unparseable numeric and
/// boolean values leave the file value in place.
fn apply_env_overrides(config: &mut FerryConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("FERRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("FERRY_APPLICATION_DRY_RUN") {
        if let Ok(dry_run) = val.parse() {
            config.application.dry_run = dry_run;
        }
    }

    // Source overrides
    if let Some(ref mut pg) = config.source.postgresql {
        if let Ok(val) = std::env::var("FERRY_SOURCE_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_EXPORT_PROCEDURE") {
        config.source.export_procedure = val;
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_EXPORT_LOG_TABLE") {
        config.source.export_log_table = val;
    }
    if let Ok(val) = std::env::var("FERRY_SOURCE_SNAPSHOT_DIR") {
        config.source.snapshot_dir = Some(val);
    }

    // Cosmos DB overrides (only if CosmosDB is configured)
    if let Some(ref mut cosmos_config) = config.cosmosdb {
        if let Ok(val) = std::env::var("FERRY_COSMOSDB_ENDPOINT") {
            cosmos_config.endpoint = val;
        }
        if let Ok(val) = std::env::var("FERRY_COSMOSDB_KEY") {
            cosmos_config.key = secret_string(val);
        }
        if let Ok(val) = std::env::var("FERRY_COSMOSDB_DATABASE_NAME") {
            cosmos_config.database_name = val;
        }
    }

    // PostgreSQL target overrides
    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("FERRY_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Ok(val) = std::env::var("FERRY_POSTGRESQL_DOCUMENTS_TABLE") {
            pg.documents_table = val;
        }
    }

    // Migration overrides
    if let Ok(val) = std::env::var("FERRY_MIGRATION_POLICY") {
        config.migration.policy = val;
    }
    if let Ok(val) = std::env::var("FERRY_MIGRATION_MODE") {
        config.migration.mode = val;
    }
    if let Ok(val) = std::env::var("FERRY_MIGRATION_SHARED_COLLECTION") {
        config.migration.shared_collection = val;
    }
    if let Ok(val) = std::env::var("FERRY_MIGRATION_BATCH_SIZE") {
        if let Ok(size) = val.parse() {
            config.migration.batch_size = size;
        }
    }
    if let Ok(val) = std::env::var("FERRY_MIGRATION_MAX_CONCURRENCY") {
        if let Ok(concurrency) = val.parse() {
            config.migration.max_concurrency = concurrency;
        }
    }
    if let Ok(val) = std::env::var("FERRY_MIGRATION_TABLE_TIMEOUT_SECONDS") {
        if let Ok(seconds) = val.parse() {
            config.migration.table_timeout_seconds = seconds;
        }
    }
    if let Ok(val) = std::env::var("FERRY_MIGRATION_EXPORT_DIR") {
        config.migration.export_dir = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FERRY_LOGGING_LOCAL_ENABLED") {
        if let Ok(enabled) = val.parse() {
            config.logging.local_enabled = enabled;
        }
    }
    if let Ok(val) = std::env::var("FERRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{DatabaseTarget, SourceKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
database_target = "memory"

[source]
kind = "snapshot_dir"
snapshot_dir = "/srv/snapshots"

[migration]
tables = ["tb_app_fornecedor", "tb_app_clientes"]
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("FERRY_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${FERRY_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"");
        std::env::remove_var("FERRY_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("FERRY_LOADER_MISSING_VAR");
        let input = "password = \"${FERRY_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("FERRY_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_ignores_comments() {
        std::env::remove_var("FERRY_LOADER_COMMENTED_VAR");
        let input = "# key = \"${FERRY_LOADER_COMMENTED_VAR}\"\nlog_level = \"info\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_minimal_config_applies_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.database_target, DatabaseTarget::Memory);
        assert_eq!(config.source.kind, SourceKind::SnapshotDir);
        assert_eq!(config.migration.policy, "insert_if_absent");
        assert_eq!(config.migration.shared_collection, "oracle_energy");
        assert_eq!(config.migration.identity_field, "_id");
        assert_eq!(config.migration.table_field, "table_name");
        assert_eq!(config.migration.max_concurrency, 1);
        assert_eq!(config.identity.rules.len(), 6);
        assert_eq!(config.identity.fallback, "content_hash");
        assert_eq!(config.tables().len(), 2);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let text = MINIMAL.replace(
            "[migration]",
            "[migration]\npolicy = \"overwrite\"",
        );
        let err = parse_config(&text).unwrap_err();
        assert!(err.to_string().contains("migration.policy"));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
environment = "staging"
database_target = "cosmosdb"

[application]
log_level = "debug"

[source]
kind = "postgresql"
export_procedure = "erp.export_table_to_json"

[source.postgresql]
connection_string = "postgresql://ferry:pw@erp:5432/erp"
ssl_mode = "require"

[cosmosdb]
endpoint = "https://test.documents.azure.com:443/"
key = "test-key"
database_name = "ferry"

[migration]
tables = ["tb_app_energia"]
policy = "upsert"
identity_field = "id"
collection_prefix = "erp_"
max_concurrency = 4

[[identity.rules]]
field = "energia_id"
tables = ["tb_app_energia"]
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.source.export_procedure, "erp.export_table_to_json");
        assert_eq!(config.migration.policy, "upsert");
        assert_eq!(config.migration.max_concurrency, 4);
        assert_eq!(config.identity.rules.len(), 1);
        assert_eq!(config.identity.rules[0].tables, vec!["tb_app_energia"]);
        assert_eq!(
            config.cosmosdb.as_ref().map(|c| c.database_name.as_str()),
            Some("ferry")
        );
    }
}
