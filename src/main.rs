mod config;
mod container;
mod fetch;
mod http;
mod ingest;
mod location;
mod query;
mod rdf;
mod registry;
mod source;
mod store;
mod stream;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

use crate::config::Config;
use crate::container::resolve_leaf_locations;
use crate::fetch::{DocumentSource, TripleFetcher};
use crate::rdf::Namespaces;
use crate::registry::SourceRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let flags = xflags::parse_or_exit! {
        /// Path of the TOML configuration file
        optional -c,--config CONFIG: PathBuf
        /// HTTP port, overrides the configured one
        optional -p,--port PORT: u16
        /// Print every leaf location below a container and exit
        optional --resolve LOCATION: String
    };

    let config = match &flags.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let namespaces = Arc::new(Namespaces::from_config(&config.namespaces));
    let timeout = config.polling.fetch_timeout();
    let fetcher = TripleFetcher::new(
        Arc::new(DocumentSource::new(timeout)?),
        namespaces,
        timeout,
    );

    if let Some(location) = &flags.resolve {
        for leaf in resolve_leaf_locations(&fetcher, location).await {
            println!("{leaf}");
        }
        return Ok(());
    }

    let registry = SourceRegistry::new(fetcher, config.polling.clone());
    let port = flags.port.unwrap_or(config.server.http_port);
    let mut server = tokio::spawn(http::serve(registry.clone(), port));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        served = &mut server => {
            registry.stop_all().await;
            return served?;
        }
        _ = sigterm.recv() => {
            info!(target: "lifecycle", "Received the terminate signal; stopping");
        }
        _ = sigint.recv() => {
            info!(target: "lifecycle", "Received the interrupt signal; stopping");
        }
    }

    registry.stop_all().await;
    server.abort();

    Ok(())
}
