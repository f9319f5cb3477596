//! Retrieval of triples for a location.

mod document;
mod http;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, warn};

use crate::rdf::{Namespaces, Notation, RawTriple, Record, Triple, fold_triples};

pub(crate) use self::document::DocumentSource;

pub(crate) type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<RawTriple>>> + Send + 'a>>;

/// Anything able to produce the raw triples found at a location.
pub(crate) trait TripleSource: Send + Sync {
    fn fetch<'a>(&'a self, location: &'a str) -> FetchFuture<'a>;
}

/// Fetches and normalizes triples. Failures never reach the caller: they are
/// logged and the location is treated as empty.
#[derive(Clone)]
pub(crate) struct TripleFetcher {
    source: Arc<dyn TripleSource>,
    namespaces: Arc<Namespaces>,
    timeout: Duration,
}

impl TripleFetcher {
    pub(crate) fn new(
        source: Arc<dyn TripleSource>,
        namespaces: Arc<Namespaces>,
        timeout: Duration,
    ) -> TripleFetcher {
        TripleFetcher {
            source,
            namespaces,
            timeout,
        }
    }

    pub(crate) fn namespaces(&self) -> &Arc<Namespaces> {
        &self.namespaces
    }

    pub(crate) async fn try_fetch(&self, location: &str) -> Result<Vec<Triple>> {
        let raw = tokio::time::timeout(self.timeout, self.source.fetch(location))
            .await
            .map_err(|_| anyhow!("timed out after {:?}", self.timeout))??;
        debug!(target: "fetch", location, triples = raw.len(), "fetched");
        Ok(raw
            .iter()
            .map(|triple| self.namespaces.triple(triple, Notation::Expanded))
            .collect())
    }

    pub(crate) async fn fetch(&self, location: &str) -> Vec<Triple> {
        match self.try_fetch(location).await {
            Ok(triples) => triples,
            Err(error) => {
                warn!(target: "fetch", location, "unable to fetch triples: {error:#}");
                Vec::new()
            }
        }
    }

    pub(crate) async fn fetch_records(&self, location: &str) -> Vec<Record> {
        fold_triples(&self.fetch(location).await)
    }
}
