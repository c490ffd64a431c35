//! Error type for a load run

use std::path::PathBuf;

/// Failure of a load run, or of a single batch within it.
///
/// Malformed input lines are not errors; see [`crate::record::MalformedRecord`].
#[derive(Debug)]
pub enum LoadError {
    /// Invalid or inconsistent configuration
    Config(String),
    /// Database could not be opened
    Connect {
        dsn: String,
        source: anyhow::Error,
    },
    /// Input file could not be opened or read
    Input {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A drop/create/index statement failed
    SchemaInit {
        statement: String,
        source: anyhow::Error,
    },
    /// A bulk insert failed
    BatchExecution {
        batch: usize,
        rows: usize,
        source: anyhow::Error,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration: {msg}"),
            Self::Connect { dsn, .. } => write!(f, "connect to '{dsn}'"),
            Self::Input { path, .. } => write!(f, "input {}", path.display()),
            Self::SchemaInit { statement, .. } => {
                let first = statement.lines().next().unwrap_or_default();
                write!(f, "schema init failed on `{first}`")
            }
            Self::BatchExecution { batch, rows, .. } => {
                write!(f, "batch {batch} ({rows} rows) failed")
            }
        }
    }
}

// Causes are reported through `source()`; format with `{:#}` via anyhow for the full chain.
impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(_) => None,
            Self::Input { source, .. } => Some(source),
            Self::Connect { source, .. }
            | Self::SchemaInit { source, .. }
            | Self::BatchExecution { source, .. } => Some(&**source),
        }
    }
}

impl LoadError {
    /// Whether the run must stop. Only batch failures can be skipped over.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BatchExecution { .. })
    }
}
