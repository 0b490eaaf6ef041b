use clap::Parser;
use gateway_proxy::application::orchestrator::PaymentOrchestrator;
use gateway_proxy::config::Cli;
use gateway_proxy::domain::ports::{MerchantDirectory, MerchantDirectoryBox, TransactionStoreBox};
use gateway_proxy::infrastructure::gateway::registry::ProviderRegistry;
use gateway_proxy::infrastructure::in_memory::{InMemoryMerchantDirectory, InMemoryTransactionStore};
#[cfg(feature = "storage-rocksdb")]
use gateway_proxy::infrastructure::rocksdb::RocksDBStore;
use gateway_proxy::interfaces::csv::merchant_reader::MerchantReader;
use gateway_proxy::interfaces::http::{AppState, create_router};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let service_config = cli.service_config().into_diagnostic()?;
    let registry = ProviderRegistry::with_builtin();
    let gateway = registry
        .resolve(&cli.gateway, &cli.gateway_config())
        .into_diagnostic()?;

    let (merchants, transactions) = open_storage(cli.db_path.as_deref())?;
    if let Some(path) = &cli.merchants {
        seed_merchants(merchants.as_ref(), path).await?;
    }

    let orchestrator = PaymentOrchestrator::new(merchants, transactions, gateway, service_config);
    let gateway_name = orchestrator.gateway_name();
    let app = create_router(Arc::new(AppState { orchestrator }));

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .into_diagnostic()?;
    info!(addr = %cli.bind, gateway = gateway_name, "Payment proxy listening");
    axum::serve(listener, app).await.into_diagnostic()?;

    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_storage(db_path: Option<&Path>) -> Result<(MerchantDirectoryBox, TransactionStoreBox)> {
    match db_path {
        Some(path) => {
            // Use persistent storage (RocksDB)
            let store = RocksDBStore::open(path).into_diagnostic()?;
            info!(path = %path.display(), "Using RocksDB storage");
            Ok((Box::new(store.clone()), Box::new(store)))
        }
        None => Ok(in_memory()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_storage(db_path: Option<&Path>) -> Result<(MerchantDirectoryBox, TransactionStoreBox)> {
    if let Some(path) = db_path {
        warn!(
            path = %path.display(),
            "Built without the storage-rocksdb feature; falling back to in-memory storage"
        );
    }
    Ok(in_memory())
}

fn in_memory() -> (MerchantDirectoryBox, TransactionStoreBox) {
    (
        Box::new(InMemoryMerchantDirectory::new()),
        Box::new(InMemoryTransactionStore::new()),
    )
}

/// Registers every merchant in the CSV file whose API key is not yet known.
async fn seed_merchants(directory: &dyn MerchantDirectory, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let mut added = 0usize;
    for merchant in MerchantReader::new(file).merchants() {
        let merchant = merchant.into_diagnostic()?;
        if directory
            .find_by_api_key(&merchant.api_key)
            .await
            .into_diagnostic()?
            .is_some()
        {
            warn!(merchant = merchant.id, "Merchant already registered, skipping");
            continue;
        }
        directory.register(merchant).await.into_diagnostic()?;
        added += 1;
    }
    info!(added, path = %path.display(), "Merchants loaded");
    Ok(())
}
