use crate::cleaner::clean_data;
use crate::domain::Table;
use crate::loader::merge_datasets;
use crate::ports::{Result, TableSink, TableSource};
use tracing::info;

/// Application service running the load, clean and save stages
pub struct EtlServiceImpl {
    messages: Box<dyn TableSource>,
    categories: Box<dyn TableSource>,
    sink: Box<dyn TableSink>,
}

impl EtlServiceImpl {
    /// Creates a new EtlServiceImpl with the given dependencies
    pub fn new(
        messages: Box<dyn TableSource>,
        categories: Box<dyn TableSource>,
        sink: Box<dyn TableSink>,
    ) -> Self {
        Self {
            messages,
            categories,
            sink,
        }
    }

    /// Loads both inputs and left-joins categories onto messages
    pub fn load_data(&self) -> Result<Table> {
        let messages = self.messages.load()?;
        let categories = self.categories.load()?;
        let merged = merge_datasets(&messages, &categories)?;
        info!(rows = merged.len(), "loaded datasets");
        Ok(merged)
    }

    /// Decodes category labels and drops invalid and duplicate rows
    pub fn clean_data(&self, merged: Table) -> Result<Table> {
        let cleaned = clean_data(merged)?;
        info!(
            rows = cleaned.len(),
            columns = cleaned.columns.len(),
            "cleaned dataset"
        );
        Ok(cleaned)
    }

    /// Writes the cleaned record set through the sink
    pub fn save_data(&self, cleaned: &Table) -> Result<()> {
        self.sink.write(cleaned)?;
        info!(rows = cleaned.len(), "saved dataset");
        Ok(())
    }

    /// Runs all three stages back to back
    pub fn execute(&self) -> Result<()> {
        let merged = self.load_data()?;
        let cleaned = self.clean_data(merged)?;
        self.save_data(&cleaned)
    }
}
