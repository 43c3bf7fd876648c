use crate::domain::Table;
use std::path::PathBuf;

/// Failures surfaced by any stage of the pipeline. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cannot convert label token {token:?} in row {row} to an integer")]
    NumericCoercion { row: usize, token: String },

    #[error("write error: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// Port for reading one delimited input into a record set
pub trait TableSource {
    fn load(&self) -> Result<Table>;
}

/// Port for persisting the cleaned record set
pub trait TableSink {
    fn write(&self, table: &Table) -> Result<()>;
}
