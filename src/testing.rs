//! Fixtures shared by unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;

use crate::config::NamespaceConfig;
use crate::fetch::{FetchFuture, TripleFetcher, TripleSource};
use crate::rdf::{Namespaces, Notation, RawTriple, Triple, TransformSpec};

/// Built-in namespaces plus `p:` (sorted on `p:time`, numeric `p:val`) and
/// `ex:`.
pub(crate) fn namespaces() -> Namespaces {
    let mut transforms = BTreeMap::new();
    transforms.insert("time".to_string(), TransformSpec::new("timestamp", "ISO8601"));
    transforms.insert("val".to_string(), TransformSpec::new("data", "number"));
    Namespaces::from_config(&[
        NamespaceConfig {
            key: "p:".to_string(),
            uri: "http://example.org/p#".to_string(),
            sorting: Some("time".to_string()),
            transforms,
        },
        NamespaceConfig {
            key: "ex:".to_string(),
            uri: "http://example.org/".to_string(),
            ..Default::default()
        },
    ])
}

/// Compact notation triples normalized against [`namespaces`].
pub(crate) fn triples(raw: &[(&str, &str, &str)]) -> Vec<Triple> {
    let namespaces = namespaces();
    raw.iter()
        .map(|&(s, p, o)| namespaces.triple(&RawTriple::new(s, p, o), Notation::Compact))
        .collect()
}

/// The two subject sensor source used across ingestion and query tests.
pub(crate) fn sensor_triples() -> Vec<Triple> {
    triples(&[
        ("ex:s1", "p:time", "2024-01-01T00:00:00Z"),
        ("ex:s1", "p:val", "1.0"),
        ("ex:s2", "p:time", "2024-01-02T00:00:00Z"),
        ("ex:s2", "p:val", "2.0"),
    ])
}

/// In-memory documents keyed by location. Unknown locations fail to fetch.
#[derive(Default)]
pub(crate) struct StaticSource {
    documents: Mutex<HashMap<String, Vec<RawTriple>>>,
    fetched: Mutex<Vec<String>>,
    stalled: Mutex<HashSet<String>>,
}

impl StaticSource {
    pub(crate) fn with(self, location: &str, triples: &[(&str, &str, &str)]) -> StaticSource {
        self.set(location, triples);
        self
    }

    /// Replace the document served at `location`.
    pub(crate) fn set(&self, location: &str, triples: &[(&str, &str, &str)]) {
        let triples = triples
            .iter()
            .map(|&(s, p, o)| RawTriple::new(s, p, o))
            .collect();
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(location.to_string(), triples);
        }
    }

    /// Make every later fetch of `location` hang forever.
    pub(crate) fn stall(&self, location: &str) {
        if let Ok(mut stalled) = self.stalled.lock() {
            stalled.insert(location.to_string());
        }
    }

    /// Every location fetched so far, in request order.
    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

impl TripleSource for StaticSource {
    fn fetch<'a>(&'a self, location: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            if let Ok(mut fetched) = self.fetched.lock() {
                fetched.push(location.to_string());
            }
            let stalled = self
                .stalled
                .lock()
                .map(|stalled| stalled.contains(location))
                .unwrap_or(false);
            if stalled {
                std::future::pending::<()>().await;
            }
            let documents = self
                .documents
                .lock()
                .map_err(|_| anyhow::anyhow!("poisoned"))?;
            documents
                .get(location)
                .cloned()
                .with_context(|| format!("no document at {location}"))
        })
    }
}

pub(crate) fn fetcher(source: StaticSource) -> TripleFetcher {
    shared_fetcher(Arc::new(source))
}

pub(crate) fn shared_fetcher(source: Arc<StaticSource>) -> TripleFetcher {
    TripleFetcher::new(source, Arc::new(namespaces()), Duration::from_secs(1))
}
