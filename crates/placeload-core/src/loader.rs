//! Load driver: schema init, then stream → accumulate → bulk insert.
//!
//! ```text
//! Initializing ──▶ Streaming ──▶ Flushing ──▶ Done
//!      │               │             │
//!      └───────────────┴─────────────┴──▶ Failed
//! ```
//!
//! Fatal errors (config, input, DDL) move to `Failed` from any state. A
//! failed bulk insert is handled by [`BatchErrorPolicy`], the same way at
//! every flush site.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use indicatif::ProgressBar;
use serde::Deserialize;

use crate::accumulator::{BatchAccumulator, DEFAULT_BATCH_CAPACITY};
use crate::error::LoadError;
use crate::insert::{ConflictPolicy, InsertBuilder};
use crate::progress::fmt_num;
use crate::record::parse_line;
use crate::schema::{self, TableSchema};
use crate::target::{DuckDbTarget, Target};

/// Read buffer for the input file
const READ_BUF_CAPACITY: usize = 1 << 20;

/// Initial capacity for the per-line buffer
const LINE_BUF_CAPACITY: usize = 256;

/// Largest `batch_capacity * field_arity` a single insert may bind.
pub const MAX_BATCH_PARAMS: usize = 1 << 22;

/// What to do when a bulk insert fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchErrorPolicy {
    /// Log the failed batch and keep streaming
    #[default]
    Continue,
    /// Stop the run with the batch error
    Abort,
}

impl std::str::FromStr for BatchErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "unknown batch error policy '{other}' (expected 'continue' or 'abort')"
            )),
        }
    }
}

/// Resolved options for one load run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    /// DuckDB database path (`""` or `":memory:"` for in-memory)
    pub data_source: String,
    pub input_path: PathBuf,
    pub field_delimiter: String,
    pub field_arity: usize,
    /// Rows per bulk insert
    pub batch_capacity: usize,
    pub on_batch_error: BatchErrorPolicy,
}

impl LoadConfig {
    /// Comma-delimited input, default batch capacity, continue on batch errors.
    pub fn new(data_source: impl Into<String>, input_path: impl Into<PathBuf>, field_arity: usize) -> Self {
        Self {
            data_source: data_source.into(),
            input_path: input_path.into(),
            field_delimiter: ",".to_string(),
            field_arity,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            on_batch_error: BatchErrorPolicy::Continue,
        }
    }

    /// Check internal consistency and agreement with the table shape.
    pub fn validate(&self, schema: &TableSchema) -> Result<(), LoadError> {
        if self.field_delimiter.is_empty() {
            return Err(LoadError::Config("field delimiter is empty".to_string()));
        }
        if self.field_arity == 0 {
            return Err(LoadError::Config("field arity must be at least 1".to_string()));
        }
        if self.batch_capacity == 0 {
            return Err(LoadError::Config(
                "batch capacity must be at least 1".to_string(),
            ));
        }
        match self.batch_capacity.checked_mul(self.field_arity) {
            Some(params) if params <= MAX_BATCH_PARAMS => {}
            _ => {
                return Err(LoadError::Config(format!(
                    "batch capacity {} with {} fields exceeds {MAX_BATCH_PARAMS} parameters per insert",
                    self.batch_capacity, self.field_arity
                )));
            }
        }
        if self.field_arity != schema.arity() {
            return Err(LoadError::Config(format!(
                "field arity {} does not match table '{}' ({} columns)",
                self.field_arity,
                schema.name,
                schema.arity()
            )));
        }
        schema.validate()
    }
}

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Initializing,
    Streaming,
    Flushing,
    Done,
    Failed,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Lines parsed into a record and handed to a batch
    pub records: usize,
    /// Non-blank lines dropped for the wrong field count or bad encoding
    pub skipped_lines: usize,
    /// Insert statements attempted
    pub batches: usize,
    pub failed_batches: usize,
    /// Records in failed batches
    pub failed_rows: usize,
    /// Rows the database reported as inserted
    pub rows_written: usize,
    /// Size of the remainder batch flushed at end of input (0 if none)
    pub final_batch_rows: usize,
}

impl LoadSummary {
    /// Records that reached the database but were dropped by the conflict policy.
    pub fn rows_ignored(&self) -> usize {
        self.records
            .saturating_sub(self.failed_rows)
            .saturating_sub(self.rows_written)
    }
}

/// Streams one input file into one table through a [`Target`].
pub struct Loader<T: Target> {
    target: T,
    config: LoadConfig,
    schema: TableSchema,
    insert: InsertBuilder,
    acc: BatchAccumulator,
    summary: LoadSummary,
    state: LoadState,
    pb: ProgressBar,
}

impl<T: Target> Loader<T> {
    /// Validate `config` against `schema` and build a driver in `Initializing`.
    pub fn new(
        target: T,
        config: LoadConfig,
        schema: TableSchema,
        conflict: ConflictPolicy,
    ) -> Result<Self, LoadError> {
        config.validate(&schema)?;
        let insert = InsertBuilder::new(&schema, conflict);
        let acc = BatchAccumulator::new(config.batch_capacity, config.field_arity);
        Ok(Self {
            target,
            config,
            schema,
            insert,
            acc,
            summary: LoadSummary::default(),
            state: LoadState::Initializing,
            pb: ProgressBar::hidden(),
        })
    }

    /// Report byte progress on `pb`.
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Run the whole load. On error the driver is left in `Failed`.
    pub fn run(&mut self) -> Result<LoadSummary, LoadError> {
        match self.drive() {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.transition(LoadState::Failed);
                self.pb.abandon();
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> Result<LoadSummary, LoadError> {
        self.transition(LoadState::Initializing);
        self.summary = LoadSummary::default();
        self.acc.reset();
        // Open input before touching the database
        let mut reader = self.open_input()?;
        schema::initialize(&mut self.target, &self.schema)?;

        self.transition(LoadState::Streaming);
        log::info!(
            "Loading {} into {} (batches of {})",
            self.config.input_path.display(),
            self.schema.name,
            fmt_num(self.config.batch_capacity)
        );
        self.stream(&mut reader)?;

        self.transition(LoadState::Flushing);
        if !self.acc.is_empty() {
            self.summary.final_batch_rows = self.acc.len();
            self.flush()?;
        }

        self.transition(LoadState::Done);
        self.pb.finish_and_clear();
        log::info!(
            "Finished: {} records in {} batches ({} skipped lines, {} failed batches)",
            fmt_num(self.summary.records),
            self.summary.batches,
            fmt_num(self.summary.skipped_lines),
            self.summary.failed_batches
        );
        Ok(self.summary.clone())
    }

    fn transition(&mut self, next: LoadState) {
        if self.state != next {
            log::debug!("{:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    fn open_input(&self) -> Result<BufReader<File>, LoadError> {
        let path = &self.config.input_path;
        let file = File::open(path).map_err(|source| LoadError::Input {
            path: path.clone(),
            source,
        })?;
        if let Ok(meta) = file.metadata() {
            self.pb.set_length(meta.len());
        }
        Ok(BufReader::with_capacity(READ_BUF_CAPACITY, file))
    }

    fn stream<R: BufRead>(&mut self, reader: &mut R) -> Result<(), LoadError> {
        let arity = self.config.field_arity;
        let mut buf = Vec::with_capacity(LINE_BUF_CAPACITY);
        let mut bytes_read = 0u64;
        let mut line_no = 0usize;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| LoadError::Input {
                    path: self.config.input_path.clone(),
                    source,
                })?;
            if n == 0 {
                break;
            }
            bytes_read += n as u64;
            line_no += 1;

            let Ok(line) = std::str::from_utf8(&buf) else {
                log::trace!("line {line_no}: not valid UTF-8");
                self.summary.skipped_lines += 1;
                continue;
            };

            match parse_line(line, &self.config.field_delimiter, arity) {
                Ok(fields) => {
                    self.acc.add(&fields);
                    self.summary.records += 1;
                }
                Err(e) if e.found == 0 => continue,
                Err(e) => {
                    log::trace!("line {line_no}: {e}");
                    self.summary.skipped_lines += 1;
                    continue;
                }
            }

            if self.acc.is_full() {
                self.flush()?;
                self.pb.set_position(bytes_read);
                self.pb
                    .set_message(format!("{} records", fmt_num(self.summary.records)));
            }
        }
        Ok(())
    }

    /// Seal the pending rows and insert them.
    ///
    /// The accumulator is emptied before the statement runs, so a failed
    /// batch never carries rows into the next one.
    fn flush(&mut self) -> Result<(), LoadError> {
        let batch = self.acc.take_batch();
        let Some(sql) = self.insert.statement(batch.rows()) else {
            return Ok(());
        };
        self.summary.batches += 1;
        let batch_no = self.summary.batches;

        match self.target.insert(&sql, batch.params()) {
            Ok(inserted) => {
                self.summary.rows_written += inserted;
                log::debug!(
                    "Batch {batch_no}: {} rows, {inserted} inserted",
                    batch.rows()
                );
                Ok(())
            }
            Err(source) => {
                self.summary.failed_batches += 1;
                self.summary.failed_rows += batch.rows();
                let err = LoadError::BatchExecution {
                    batch: batch_no,
                    rows: batch.rows(),
                    source,
                };
                match self.config.on_batch_error {
                    BatchErrorPolicy::Continue => {
                        log::error!("{:#}", anyhow::Error::new(err));
                        Ok(())
                    }
                    BatchErrorPolicy::Abort => Err(err),
                }
            }
        }
    }
}

/// Open the configured DuckDB database and run a full load into it.
pub fn run(
    config: LoadConfig,
    schema: TableSchema,
    conflict: ConflictPolicy,
    pb: ProgressBar,
) -> Result<LoadSummary, LoadError> {
    config.validate(&schema)?;
    let target = DuckDbTarget::open(&config.data_source).map_err(|source| LoadError::Connect {
        dsn: config.data_source.clone(),
        source,
    })?;
    Loader::new(target, config, schema, conflict)?
        .with_progress(pb)
        .run()
}
