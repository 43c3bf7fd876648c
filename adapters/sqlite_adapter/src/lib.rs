use etl_core::domain::{Table, Value, WriteMode};
use etl_core::ports::{EtlError, Result, TableSink};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::PathBuf;
use tracing::debug;

/// SQLite implementation of the TableSink trait.
/// The table is named after the database path, as given.
pub struct SqliteTableSink {
    db_path: PathBuf,
    table_name: String,
    mode: WriteMode,
}

impl SqliteTableSink {
    /// Creates a new SqliteTableSink writing to the given database path
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        let table_name = db_path.to_string_lossy().into_owned();
        Self {
            db_path,
            table_name,
            mode: WriteMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn column_type(table: &Table, index: usize) -> &'static str {
        let mut declared = None;
        for value in table.column_values(index) {
            declared = match (declared, value) {
                (_, Value::Null) => declared,
                (_, Value::Text(_)) => return "TEXT",
                (None | Some("INTEGER"), Value::Integer(_)) => Some("INTEGER"),
                (_, Value::Integer(_) | Value::Real(_)) => Some("REAL"),
            };
        }
        declared.unwrap_or("TEXT")
    }

    fn write_table(&self, conn: &mut Connection, table: &Table) -> rusqlite::Result<()> {
        let name = quote_identifier(&self.table_name);
        let tx = conn.transaction()?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [&self.table_name],
            |row| row.get(0),
        )?;

        if exists {
            match self.mode {
                WriteMode::Fail => {
                    return Err(rusqlite::Error::SqliteFailure(
                        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                        Some(format!("table {} already exists", name)),
                    ))
                }
                WriteMode::Replace => {
                    tx.execute(&format!("DROP TABLE {}", name), [])?;
                }
                WriteMode::Append => {}
            }
        }

        if !exists || self.mode == WriteMode::Replace {
            let definitions: Vec<String> = table
                .columns
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} {}", quote_identifier(c), Self::column_type(table, i)))
                .collect();
            tx.execute(
                &format!("CREATE TABLE {} ({})", name, definitions.join(", ")),
                [],
            )?;
        }

        {
            let columns: Vec<String> = table.columns.iter().map(|c| quote_identifier(c)).collect();
            let placeholders: Vec<String> =
                (1..=table.columns.len()).map(|i| format!("?{}", i)).collect();
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                name,
                columns.join(", "),
                placeholders.join(", ")
            ))?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter().map(to_sql_value)))?;
            }
        }

        tx.commit()
    }
}

impl TableSink for SqliteTableSink {
    fn write(&self, table: &Table) -> Result<()> {
        let write_error = |e: rusqlite::Error| {
            EtlError::Write(format!("{}: {}", self.db_path.display(), e))
        };

        let mut conn = Connection::open(&self.db_path).map_err(write_error)?;
        self.write_table(&mut conn, table).map_err(write_error)?;

        debug!(
            db = %self.db_path.display(),
            table = %self.table_name,
            rows = table.len(),
            "wrote table"
        );
        Ok(())
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
    }
}

/// Quotes an SQL identifier, doubling embedded quotes
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cleaned() -> Table {
        Table {
            columns: vec!["id".into(), "message".into(), "related".into(), "offer".into()],
            rows: vec![
                vec![Value::Integer(2), "water please".into(), Value::Integer(1), Value::Integer(0)],
                vec![Value::Integer(7), Value::Null, Value::Integer(0), Value::Null],
            ],
        }
    }

    fn read_back(db: &std::path::Path, table: &str) -> Vec<(i64, Option<String>, i64, Option<i64>)> {
        let conn = Connection::open(db).unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, message, related, offer FROM {} ORDER BY rowid",
                quote_identifier(table)
            ))
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_write_creates_database_and_table_named_after_path() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("DisasterResponse.db");
        let sink = SqliteTableSink::new(&db);
        sink.write(&cleaned()).unwrap();

        assert!(db.exists());
        let rows = read_back(&db, sink.table_name());
        assert_eq!(
            rows,
            vec![
                (2, Some("water please".to_string()), 1, Some(0)),
                (7, None, 0, None),
            ]
        );
    }

    #[test]
    fn test_write_declares_column_types() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("out.db");
        let mut table = cleaned();
        table.columns.push("score".into());
        table.rows[0].push(Value::Integer(1));
        table.rows[1].push(Value::Real(0.5));
        let sink = SqliteTableSink::new(&db);
        sink.write(&table).unwrap();

        let conn = Connection::open(&db).unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT name, type FROM pragma_table_info({})",
                quote_literal(sink.table_name())
            ))
            .unwrap();
        let types: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            types,
            vec![
                ("id".to_string(), "INTEGER".to_string()),
                ("message".to_string(), "TEXT".to_string()),
                ("related".to_string(), "INTEGER".to_string()),
                ("offer".to_string(), "INTEGER".to_string()),
                ("score".to_string(), "REAL".to_string()),
            ]
        );
    }

    fn quote_literal(s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    #[test]
    fn test_write_fails_when_table_exists() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("out.db");
        let sink = SqliteTableSink::new(&db);
        sink.write(&cleaned()).unwrap();
        assert!(matches!(sink.write(&cleaned()), Err(EtlError::Write(_))));
        assert_eq!(read_back(&db, sink.table_name()).len(), 2);
    }

    #[test]
    fn test_write_replace_mode() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("out.db");
        let sink = SqliteTableSink::new(&db).with_mode(WriteMode::Replace);
        sink.write(&cleaned()).unwrap();
        sink.write(&cleaned()).unwrap();
        assert_eq!(read_back(&db, sink.table_name()).len(), 2);
    }

    #[test]
    fn test_write_append_mode() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("out.db");
        let sink = SqliteTableSink::new(&db).with_mode(WriteMode::Append);
        sink.write(&cleaned()).unwrap();
        sink.write(&cleaned()).unwrap();
        assert_eq!(read_back(&db, sink.table_name()).len(), 4);
    }

    #[test]
    fn test_write_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("missing_dir").join("out.db");
        assert!(matches!(
            SqliteTableSink::new(&db).write(&cleaned()),
            Err(EtlError::Write(_))
        ));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("data/x.db"), "\"data/x.db\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
