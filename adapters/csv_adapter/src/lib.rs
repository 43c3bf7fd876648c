use csv::ReaderBuilder;
use etl_core::domain::Table;
use etl_core::ports::{EtlError, Result, TableSource};
use etl_core::utils::infer_column;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use tracing::debug;

/// CSV implementation of the TableSource trait.
/// The first column of the file is a positional index and is not loaded.
pub struct CsvTableSource {
    path: PathBuf,
}

impl CsvTableSource {
    /// Creates a new CsvTableSource reading from the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_error(&self, e: impl std::fmt::Display) -> EtlError {
        EtlError::Parse(format!("{}: {}", self.path.display(), e))
    }

    /// Reads a header row plus records, dropping the index column and
    /// inferring a type for every remaining column
    fn read_table<R: Read>(&self, reader: R) -> Result<Table> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = rdr.headers().map_err(|e| self.parse_error(e))?.clone();
        if headers.is_empty() {
            return Err(self.parse_error("missing header row"));
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut raw: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
        for record in rdr.records() {
            let record = record.map_err(|e| self.parse_error(e))?;
            for (cells, field) in raw.iter_mut().zip(record.iter().skip(1)) {
                cells.push(field.to_string());
            }
        }

        let typed: Vec<Vec<_>> = raw
            .iter()
            .map(|cells| {
                let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
                infer_column(&cells)
            })
            .collect();

        let row_count = raw.first().map_or(0, Vec::len);
        let mut table = Table::new(columns);
        table.rows = (0..row_count)
            .map(|i| typed.iter().map(|column| column[i].clone()).collect())
            .collect();

        debug!(
            path = %self.path.display(),
            rows = table.len(),
            columns = table.columns.len(),
            "read csv table"
        );
        Ok(table)
    }
}

impl TableSource for CsvTableSource {
    fn load(&self) -> Result<Table> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EtlError::InputNotFound {
                path: self.path.clone(),
            },
            _ => self.parse_error(e),
        })?;
        self.read_table(file)
    }
}
