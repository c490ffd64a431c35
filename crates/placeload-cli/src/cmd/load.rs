//! Load subcommand - recreate the table and stream the input into it

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use placeload_core::{BatchErrorPolicy, ConflictPolicy, ProgressContext, TablePreset, fmt_num};

use crate::config::{Config, TableConfig};

#[derive(Args, Debug, Default)]
pub struct LoadArgs {
    /// Delimited input file (overrides `input`)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// DuckDB database path, or ":memory:" (overrides `dsn`)
    #[arg(long)]
    pub dsn: Option<String>,

    /// Field delimiter (overrides `delimiter`)
    #[arg(short, long)]
    pub delimiter: Option<String>,

    /// Rows per INSERT statement (overrides `batch_capacity`)
    #[arg(short, long)]
    pub batch_capacity: Option<usize>,

    /// Built-in table shape: places | place-bounds (overrides `[table]`)
    #[arg(long)]
    pub table: Option<TablePreset>,

    /// Duplicate key handling: ignore | fail
    #[arg(long)]
    pub conflict: Option<ConflictPolicy>,

    /// Failed batch handling: continue | abort
    #[arg(long)]
    pub on_batch_error: Option<BatchErrorPolicy>,
}

impl LoadArgs {
    /// CLI flags take precedence over file settings.
    fn apply(self, config: &mut Config) {
        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(dsn) = self.dsn {
            config.dsn = dsn;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(capacity) = self.batch_capacity {
            config.batch_capacity = capacity;
        }
        if let Some(preset) = self.table {
            config.table = TableConfig::Preset { preset };
            config.field_arity = None;
        }
        if let Some(conflict) = self.conflict {
            config.conflict = conflict;
        }
        if let Some(policy) = self.on_batch_error {
            config.on_batch_error = policy;
        }
    }
}

pub fn run(args: LoadArgs, mut config: Config, progress: &ProgressContext) -> Result<()> {
    args.apply(&mut config);
    let (load, schema) = config.resolve()?;

    let name = load
        .input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pb = progress.load_bar(&name);

    log::info!("Loading geodata into {}...", config.dsn);
    let summary = placeload_core::run(load, schema, config.conflict, pb)
        .context("Load failed")?;

    if summary.skipped_lines > 0 {
        log::warn!("Skipped {} malformed lines", fmt_num(summary.skipped_lines));
    }
    if summary.failed_batches > 0 {
        log::warn!(
            "{} batches failed ({} records not loaded)",
            summary.failed_batches,
            fmt_num(summary.failed_rows)
        );
    }
    if summary.rows_ignored() > 0 {
        log::info!(
            "{} records ignored as duplicates",
            fmt_num(summary.rows_ignored())
        );
    }

    println!("Finished. Loaded {} places", summary.records);
    Ok(())
}
