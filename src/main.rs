use std::sync::Arc;

use packwise::api::{self, AppState};
use packwise::catalog::PackagingCatalogCache;
use packwise::chain::ResolutionChain;
use packwise::config::AppConfig;
use packwise::engine::HeuristicPacker;
use packwise::products::ProductRegistry;
use packwise::remote::{BinPackingClient, RemotePackingApi};
use packwise::results::ResultStore;
use packwise::store::{JsonFileStore, PersistentStore};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = dotenv {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!(error = %err, "could not load .env");
        }
    }

    if let Err(err) = run(AppConfig::from_env()).await {
        error!(error = %err, "service stopped");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("packwise starting");

    let store: Arc<dyn PersistentStore> = Arc::new(JsonFileStore::open(config.store.path()).await?);
    let catalog = Arc::new(PackagingCatalogCache::new(
        Arc::clone(&store),
        config.catalog.ttl(),
    ));

    let remote: Option<Arc<dyn RemotePackingApi>> = match &config.remote {
        Some(remote) => Some(Arc::new(BinPackingClient::new(
            remote.base_url(),
            remote.username(),
            remote.api_key(),
            remote.timeout(),
        )?)),
        None => None,
    };

    let chain = ResolutionChain::assemble(
        config.resolution.order(),
        ResultStore::new(Arc::clone(&store)),
        catalog,
        remote,
        Arc::new(HeuristicPacker::new(config.optimizer.packing_config())),
    );
    let order = chain
        .order()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ");
    info!(%order, catalog_ttl_secs = config.catalog.ttl().as_secs(), "resolution chain ready");

    let state = AppState::new(ProductRegistry::new(store), chain);
    api::start_api_server(&config.api, state).await?;
    Ok(())
}
