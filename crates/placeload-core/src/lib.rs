//! placeload-core - streaming batch loader for delimited place records
//!
//! Reads a delimited text file line by line, keeps the lines with the
//! expected field count, and bulk-inserts them into a freshly recreated
//! DuckDB table with multi-row `INSERT OR IGNORE` statements.

pub mod accumulator;
pub mod error;
pub mod insert;
pub mod loader;
pub mod logging;
pub mod progress;
pub mod record;
pub mod schema;
pub mod target;

// Re-exports for convenience
pub use accumulator::{Batch, BatchAccumulator, DEFAULT_BATCH_CAPACITY};
pub use error::LoadError;
pub use insert::{ConflictPolicy, InsertBuilder};
pub use loader::{
    BatchErrorPolicy, LoadConfig, LoadState, LoadSummary, Loader, MAX_BATCH_PARAMS, run,
};
pub use logging::{ProgressLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, fmt_num};
pub use record::{MalformedRecord, parse_line};
pub use schema::{Column, Index, TablePreset, TableSchema};
pub use target::{DuckDbTarget, Target};
