use clap::Parser;
use csv_adapter::CsvTableSource;
use etl_core::application::EtlServiceImpl;
use etl_core::ports::{TableSink, TableSource};
use sqlite_adapter::SqliteTableSink;
use std::error::Error;
use std::ffi::OsString;
use std::io::Write;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Please provide the filepaths of the messages and categories \
datasets as the first and second argument respectively, as \
well as the filepath of the database to save the cleaned data \
to as the third argument. \n\nExample: process-data \
disaster_messages.csv disaster_categories.csv \
DisasterResponse.db";

/// CLI tool to merge and clean disaster messages and store them in SQLite
#[derive(Parser, Debug)]
#[command(name = "process-data")]
#[command(about = "Merges messages with their categories, cleans them and saves them to SQLite")]
#[command(disable_help_flag = true)]
struct Cli {
    /// Path to the messages CSV file
    messages_filepath: String,

    /// Path to the categories CSV file
    categories_filepath: String,

    /// Path of the SQLite database to write; also used as the table name
    database_filepath: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut stdout = std::io::stdout();
    if let Err(e) = run(std::env::args_os(), &mut stdout) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Number of raw arguments, program name included, that runs the pipeline
const EXPECTED_ARGS: usize = 4;

/// Parses the three positional paths and runs the pipeline, printing progress
/// to `out`. Any other argument count prints the usage text and does nothing.
fn run<I, T>(args: I, out: &mut dyn Write) -> Result<(), Box<dyn Error>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    if args.len() != EXPECTED_ARGS {
        writeln!(out, "{}", USAGE)?;
        return Ok(());
    }

    // Everything after the program name is a path, even "--" or "-h".
    args.insert(1, OsString::from("--"));
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            tracing::debug!(error = %e, "argument parsing failed");
            writeln!(out, "{}", USAGE)?;
            return Ok(());
        }
    };

    // Instantiate concrete implementations of secondary adapters
    let messages: Box<dyn TableSource> = Box::new(CsvTableSource::new(&cli.messages_filepath));
    let categories: Box<dyn TableSource> =
        Box::new(CsvTableSource::new(&cli.categories_filepath));
    let sink: Box<dyn TableSink> = Box::new(SqliteTableSink::new(&cli.database_filepath));

    let service = EtlServiceImpl::new(messages, categories, sink);

    writeln!(
        out,
        "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}",
        cli.messages_filepath, cli.categories_filepath
    )?;
    let merged = service.load_data()?;

    writeln!(out, "Cleaning data...")?;
    let cleaned = service.clean_data(merged)?;

    writeln!(out, "Saving data...\n    DATABASE: {}", cli.database_filepath)?;
    service.save_data(&cleaned)?;

    writeln!(out, "Cleaned data saved to database!")?;
    Ok(())
}
