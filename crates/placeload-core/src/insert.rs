//! Multi-row INSERT statement generation.
//!
//! Statements only ever carry `?` markers; field values travel as bound
//! parameters so the database does the text → column type coercion.

use serde::Deserialize;

use crate::schema::TableSchema;

/// What the statement does when a row collides with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// `INSERT OR IGNORE`: colliding rows are skipped, the rest of the batch lands
    #[default]
    Ignore,
    /// Plain `INSERT`: any collision fails the whole statement
    Fail,
}

impl ConflictPolicy {
    fn verb(self) -> &'static str {
        match self {
            Self::Ignore => "INSERT OR IGNORE INTO",
            Self::Fail => "INSERT INTO",
        }
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "unknown conflict policy '{other}' (expected 'ignore' or 'fail')"
            )),
        }
    }
}

/// Builds `INSERT ... VALUES (?, ...), (?, ...)` for a given row count.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    prefix: String,
    group: String,
}

impl InsertBuilder {
    pub fn new(schema: &TableSchema, conflict: ConflictPolicy) -> Self {
        let arity = schema.arity();
        let prefix = format!(
            "{} {} ({}) VALUES ",
            conflict.verb(),
            schema.name,
            schema.column_names().join(", ")
        );
        let group = format!("({})", vec!["?"; arity].join(", "));
        Self { prefix, group }
    }

    /// Statement with exactly `rows` placeholder groups, or `None` for zero rows.
    pub fn statement(&self, rows: usize) -> Option<String> {
        if rows == 0 {
            return None;
        }
        let mut sql =
            String::with_capacity(self.prefix.len() + rows * (self.group.len() + 2));
        sql.push_str(&self.prefix);
        for i in 0..rows {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&self.group);
        }
        Some(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_row_places() {
        let builder = InsertBuilder::new(&TableSchema::places(), ConflictPolicy::Ignore);
        assert_eq!(
            builder.statement(1).unwrap(),
            "INSERT OR IGNORE INTO place \
             (woeid, admin1, admin2, admin3, swlat, swlng, nelat, nelng) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn group_and_marker_counts() {
        let builder = InsertBuilder::new(&TableSchema::place_bounds(), ConflictPolicy::Ignore);
        for rows in [1, 2, 7, 100] {
            let sql = builder.statement(rows).unwrap();
            let values = sql.split(" VALUES ").nth(1).unwrap();
            assert_eq!(values.matches('(').count(), rows);
            assert_eq!(values.matches('?').count(), rows * 6);
        }
    }

    #[test]
    fn zero_rows_has_no_statement() {
        let builder = InsertBuilder::new(&TableSchema::places(), ConflictPolicy::Ignore);
        assert!(builder.statement(0).is_none());
    }

    #[test]
    fn fail_policy_is_plain_insert() {
        let builder = InsertBuilder::new(&TableSchema::places(), ConflictPolicy::Fail);
        let sql = builder.statement(2).unwrap();
        assert!(sql.starts_with("INSERT INTO place ("));
        assert!(!sql.contains("IGNORE"));
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("ignore".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Ignore));
        assert_eq!("fail".parse::<ConflictPolicy>(), Ok(ConflictPolicy::Fail));
        assert!("replace".parse::<ConflictPolicy>().is_err());
    }
}
