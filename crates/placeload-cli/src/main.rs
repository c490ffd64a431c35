//! placeload - load a delimited place dump into DuckDB
//!
//! Drops and recreates the target table, then streams the input file
//! into it with batched multi-row inserts.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "placeload")]
#[command(about = "Bulk-load delimited place records into DuckDB")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./placeload.toml, ./db.json or ~/.config/placeload/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recreate the table and load the input file
    Load(cmd::load::LoadArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = placeload_core::ProgressContext::new();
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let verbosity = placeload_core::Verbosity::for_output(is_tty, cli.debug);
    placeload_core::init_logging(verbosity, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Load(args) => cmd::load::run(args, config, &progress),
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let schema = config.table.schema();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Database", config.dsn.as_str()]);
            table.add_row(vec![
                "Input",
                &config
                    .input
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "not set".to_string()),
            ]);
            table.add_row(vec!["Delimiter", &format!("{:?}", config.delimiter)]);
            table.add_row(vec![
                "Table",
                &format!("{} ({})", schema.name, config.table.describe()),
            ]);
            table.add_row(vec!["Columns", &schema.column_names().join(", ")]);
            table.add_row(vec![
                "Field arity",
                &config.field_arity.unwrap_or(schema.arity()).to_string(),
            ]);
            table.add_row(vec![
                "Batch capacity",
                &placeload_core::fmt_num(config.batch_capacity),
            ]);
            table.add_row(vec!["Conflicts", &format!("{:?}", config.conflict)]);
            table.add_row(vec![
                "On batch error",
                &format!("{:?}", config.on_batch_error),
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
