//! Target table definitions and the drop/create/index initializer.
//!
//! The loader owns its table outright: every run drops it, recreates it and
//! builds the secondary indexes before any row is streamed in.

use serde::Deserialize;

use crate::error::LoadError;
use crate::target::Target;

/// A column of the target table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Column {
    pub name: String,
    /// SQL type as written in the DDL (e.g. `INTEGER`, `VARCHAR(80)`)
    #[serde(rename = "type")]
    pub sql_type: String,
}

impl Column {
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
        }
    }
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
}

impl Index {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Shape of the destination table.
///
/// Input lines map onto `columns` positionally, so the column count is the
/// field arity of every record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    /// Optional composite uniqueness constraint
    #[serde(default)]
    pub unique: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<Index>,
}

/// Built-in table shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TablePreset {
    /// WOEID, three admin name levels and a bounding box (8 fields)
    Places,
    /// WOEID, a single name and a bounding box (6 fields)
    PlaceBounds,
}

impl TablePreset {
    pub fn schema(self) -> TableSchema {
        match self {
            Self::Places => TableSchema::places(),
            Self::PlaceBounds => TableSchema::place_bounds(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Places => "places",
            Self::PlaceBounds => "place-bounds",
        }
    }
}

impl std::fmt::Display for TablePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TablePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "places" => Ok(Self::Places),
            "place-bounds" => Ok(Self::PlaceBounds),
            other => Err(format!(
                "unknown table preset '{other}' (expected 'places' or 'place-bounds')"
            )),
        }
    }
}

const BBOX_COLUMNS: [&str; 4] = ["swlat", "swlng", "nelat", "nelng"];

impl TableSchema {
    /// `place (woeid, admin1, admin2, admin3, swlat, swlng, nelat, nelng)`
    pub fn places() -> Self {
        let mut columns = vec![
            Column::new("woeid", "INTEGER"),
            Column::new("admin1", "VARCHAR(80)"),
            Column::new("admin2", "VARCHAR(80)"),
            Column::new("admin3", "VARCHAR(80)"),
        ];
        columns.extend(BBOX_COLUMNS.iter().map(|c| Column::new(c, "FLOAT")));

        Self {
            name: "place".to_string(),
            columns,
            primary_key: vec!["woeid".to_string()],
            unique: vec![
                "admin1".to_string(),
                "admin2".to_string(),
                "admin3".to_string(),
            ],
            indexes: vec![
                Index::new("coord", &BBOX_COLUMNS),
                Index::new("place_name", &["admin1", "admin2", "admin3"]),
            ],
        }
    }

    /// `place (woeid, name, swlat, swlng, nelat, nelng)`
    pub fn place_bounds() -> Self {
        let mut columns = vec![
            Column::new("woeid", "INTEGER"),
            Column::new("name", "VARCHAR(200)"),
        ];
        columns.extend(BBOX_COLUMNS.iter().map(|c| Column::new(c, "FLOAT")));

        Self {
            name: "place".to_string(),
            columns,
            primary_key: vec!["woeid".to_string()],
            unique: Vec::new(),
            indexes: vec![
                Index::new("coord", &BBOX_COLUMNS),
                Index::new("place_name", &["name"]),
            ],
        }
    }

    /// Number of fields each input record must have.
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Reject definitions that would produce invalid or unsafe DDL.
    pub fn validate(&self) -> Result<(), LoadError> {
        check_identifier("table", &self.name)?;
        if self.columns.is_empty() {
            return Err(LoadError::Config(format!(
                "table '{}' has no columns",
                self.name
            )));
        }
        for col in &self.columns {
            check_identifier("column", &col.name)?;
            if !is_sql_type(&col.sql_type) {
                return Err(LoadError::Config(format!(
                    "column '{}' has invalid type '{}'",
                    col.name, col.sql_type
                )));
            }
        }
        let names = self.column_names();
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(LoadError::Config(format!("duplicate column '{name}'")));
            }
        }

        if self.primary_key.is_empty() {
            return Err(LoadError::Config(format!(
                "table '{}' needs a primary key",
                self.name
            )));
        }
        self.check_columns_exist("primary key", &self.primary_key)?;
        self.check_columns_exist("unique key", &self.unique)?;
        for index in &self.indexes {
            check_identifier("index", &index.name)?;
            if index.columns.is_empty() {
                return Err(LoadError::Config(format!(
                    "index '{}' has no columns",
                    index.name
                )));
            }
            self.check_columns_exist(&format!("index '{}'", index.name), &index.columns)?;
        }
        Ok(())
    }

    fn check_columns_exist(&self, what: &str, cols: &[String]) -> Result<(), LoadError> {
        let names = self.column_names();
        match cols.iter().find(|c| !names.contains(&c.as_str())) {
            Some(missing) => Err(LoadError::Config(format!(
                "{what} references unknown column '{missing}'"
            ))),
            None => Ok(()),
        }
    }

    pub fn drop_statement(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }

    pub fn create_statement(&self) -> String {
        let mut defs: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.sql_type))
            .collect();
        defs.push(format!("PRIMARY KEY ({})", self.primary_key.join(", ")));
        if !self.unique.is_empty() {
            defs.push(format!("UNIQUE ({})", self.unique.join(", ")));
        }
        format!("CREATE TABLE {} (\n    {}\n)", self.name, defs.join(",\n    "))
    }

    pub fn index_statements(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|idx| {
                format!(
                    "CREATE INDEX {} ON {} ({})",
                    idx.name,
                    self.name,
                    idx.columns.join(", ")
                )
            })
            .collect()
    }

    /// All DDL in execution order: drop, create, indexes.
    pub fn ddl(&self) -> Vec<String> {
        let mut stmts = vec![self.drop_statement(), self.create_statement()];
        stmts.extend(self.index_statements());
        stmts
    }
}

fn check_identifier(what: &str, name: &str) -> Result<(), LoadError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(LoadError::Config(format!("invalid {what} name '{name}'")))
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_sql_type(s: &str) -> bool {
    !s.trim().is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ','))
}

/// Drop and recreate the table and its indexes. Any failure is fatal.
pub fn initialize<T: Target + ?Sized>(target: &mut T, schema: &TableSchema) -> Result<(), LoadError> {
    for stmt in schema.ddl() {
        log::debug!("DDL: {stmt}");
        target
            .execute(&stmt)
            .map_err(|source| LoadError::SchemaInit {
                statement: stmt.clone(),
                source,
            })?;
    }
    log::info!(
        "Initialized table {} ({} columns, {} indexes)",
        schema.name,
        schema.arity(),
        schema.indexes.len()
    );
    Ok(())
}
