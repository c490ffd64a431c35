//! Configuration loading from TOML (or legacy JSON) files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use placeload_core::{
    BatchErrorPolicy, ConflictPolicy, DEFAULT_BATCH_CAPACITY, LoadConfig, TablePreset,
    TableSchema,
};
use serde::Deserialize;

/// Global configuration for placeload
///
/// Also accepts the legacy `db.json` layout (`{"DSN": ..., "Input": ...}`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// DuckDB database path; empty or `:memory:` for in-memory
    #[serde(alias = "DSN", deserialize_with = "deserialize_env_var")]
    pub dsn: String,
    #[serde(alias = "Input")]
    pub input: Option<PathBuf>,
    pub delimiter: String,
    /// Must match the table's column count when set
    pub field_arity: Option<usize>,
    pub batch_capacity: usize,
    pub on_batch_error: BatchErrorPolicy,
    pub conflict: ConflictPolicy,
    pub table: TableConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dsn: "places.duckdb".to_string(),
            input: None,
            delimiter: ",".to_string(),
            field_arity: None,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            on_batch_error: BatchErrorPolicy::default(),
            conflict: ConflictPolicy::default(),
            table: TableConfig::default(),
        }
    }
}

/// Either a built-in table shape or a full table definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TableConfig {
    Preset { preset: TablePreset },
    Custom(TableSchema),
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::Preset {
            preset: TablePreset::Places,
        }
    }
}

impl TableConfig {
    pub fn schema(&self) -> TableSchema {
        match self {
            Self::Preset { preset } => preset.schema(),
            Self::Custom(schema) => schema.clone(),
        }
    }

    /// Short label for display
    pub fn describe(&self) -> String {
        match self {
            Self::Preset { preset } => format!("preset: {preset}"),
            Self::Custom(schema) => format!("custom: {}", schema.name),
        }
    }
}

/// Deserialize a string that may be an environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    expand_env_var(&s).map_err(serde::de::Error::custom)
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Result<String, String> {
    match s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name)
            .map_err(|_| format!("environment variable {var_name} is not set")),
        None => Ok(s.to_string()),
    }
}

/// True for client/server connection strings such as `user:pw@tcp(host:3306)/geo`
/// or `mysql://host/geo`, which DuckDB would otherwise create as a file name.
fn is_server_dsn(dsn: &str) -> bool {
    dsn.contains("://")
        || dsn
            .split_once('@')
            .is_some_and(|(user, rest)| {
                !user.contains('/') && (rest.contains('(') || rest.contains('/'))
            })
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./placeload.toml
    /// 2. ./db.json (legacy)
    /// 3. ~/.config/placeload/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        for local in ["placeload.toml", "db.json"] {
            let path = PathBuf::from(local);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "placeload") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file (JSON if it ends in `.json`, else TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Turn file + CLI settings into what the loader runs with.
    pub fn resolve(&self) -> Result<(LoadConfig, TableSchema)> {
        if is_server_dsn(&self.dsn) {
            bail!(
                "dsn '{}' looks like a server connection string; placeload expects a DuckDB database path or \":memory:\"",
                self.dsn
            );
        }
        let Some(input) = &self.input else {
            bail!("No input file configured (set `input` in the config file or pass --input)");
        };
        let schema = self.table.schema();
        let config = LoadConfig {
            data_source: self.dsn.clone(),
            input_path: input.clone(),
            field_delimiter: self.delimiter.clone(),
            field_arity: self.field_arity.unwrap_or_else(|| schema.arity()),
            batch_capacity: self.batch_capacity,
            on_batch_error: self.on_batch_error,
        };
        config.validate(&schema)?;
        Ok((config, schema))
    }
}
