use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use terminal_auth::application::processor::TransactionProcessor;
use terminal_auth::config::ProcessorConfig;
use terminal_auth::domain::ports::SharedTransactionStore;
use terminal_auth::domain::protocol::ProtocolCatalog;
use terminal_auth::infrastructure::acquirer::{AcquirerBehavior, SimulatedAcquirer};
use terminal_auth::infrastructure::event_log::TracingEventLog;
use terminal_auth::infrastructure::in_memory::InMemoryTransactionStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment requests CSV file
    input: PathBuf,

    /// Protocol catalog JSON file (defaults to the built-in catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let catalog = match &cli.catalog {
        Some(path) => ProtocolCatalog::from_path(path).into_diagnostic()?,
        None => ProtocolCatalog::default(),
    };

    let store: SharedTransactionStore = build_store(&cli)?;
    let processor = TransactionProcessor::new(
        ProcessorConfig::from_env(),
        catalog,
        store,
        Arc::new(SimulatedAcquirer::new(AcquirerBehavior::ApproveGenerated {
            code_length: 6,
        })),
        Arc::new(TracingEventLog::new()),
    );

    // Submit the whole batch, then wait for every authorization to settle
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = terminal_auth::interfaces::csv::request_reader::RequestReader::new(file);
    let mut ids = Vec::new();
    let mut handles = Vec::new();
    for request in reader.requests() {
        match request {
            Ok(request) => match processor.submit(request).await {
                Ok((snapshot, handle)) => {
                    ids.push(snapshot.id);
                    handles.push(handle);
                }
                Err(e) => eprintln!("Error submitting payment: {}", e),
            },
            Err(e) => eprintln!("Error reading payment request: {}", e),
        }
    }
    for handle in handles {
        let _ = handle.await;
    }

    let mut transactions = Vec::with_capacity(ids.len());
    for id in ids {
        transactions.push(processor.get_transaction(id).await.into_diagnostic()?);
    }

    let stdout = io::stdout();
    let mut writer =
        terminal_auth::interfaces::csv::report_writer::ReportWriter::new(stdout.lock());
    writer.write_transactions(transactions).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn build_store(cli: &Cli) -> Result<SharedTransactionStore> {
    use terminal_auth::infrastructure::rocksdb::RocksDBStore;

    Ok(match &cli.db_path {
        Some(db_path) => Arc::new(RocksDBStore::open(db_path).into_diagnostic()?),
        None => Arc::new(InMemoryTransactionStore::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_store(_cli: &Cli) -> Result<SharedTransactionStore> {
    Ok(Arc::new(InMemoryTransactionStore::new()))
}
