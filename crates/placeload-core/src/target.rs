//! Database target: the only component that talks to the connection

use anyhow::{Context, Result};
use duckdb::Connection;

/// Statement execution as the loader needs it.
pub trait Target {
    /// Execute a parameterless statement (DDL).
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Execute a parameterized insert, returning the number of rows inserted.
    fn insert(&mut self, sql: &str, params: &[String]) -> Result<usize>;
}

/// DuckDB-backed target.
pub struct DuckDbTarget {
    conn: Connection,
}

impl DuckDbTarget {
    /// Open a database file, or an in-memory database for `""` / `":memory:"`.
    pub fn open(dsn: &str) -> Result<Self> {
        let conn = if dsn.is_empty() || dsn == ":memory:" {
            Connection::open_in_memory().context("Failed to open DuckDB in-memory connection")?
        } else {
            Connection::open(dsn).with_context(|| format!("Failed to open DuckDB database: {dsn}"))?
        };
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl std::fmt::Debug for DuckDbTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbTarget").finish_non_exhaustive()
    }
}

impl Target for DuckDbTarget {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn insert(&mut self, sql: &str, params: &[String]) -> Result<usize> {
        // Full-size batches reuse the same statement text
        let mut stmt = self.conn.prepare_cached(sql)?;
        let inserted = stmt.execute(duckdb::params_from_iter(params.iter()))?;
        Ok(inserted)
    }
}
