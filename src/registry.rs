use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use ractor::{Actor, ActorRef};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::PollingConfig;
use crate::fetch::TripleFetcher;
use crate::location::Location;
use crate::query::{QueryArguments, Warning, warning_only};
use crate::source::{DataSource, DataSourceInit, DataSourceMsg};

/// Location to data source mapping for the lifetime of the server.
#[derive(Clone)]
pub(crate) struct SourceRegistry {
    fetcher: TripleFetcher,
    polling: PollingConfig,
    sources: Arc<Mutex<HashMap<Location, ActorRef<DataSourceMsg>>>>,
}

impl SourceRegistry {
    pub(crate) fn new(fetcher: TripleFetcher, polling: PollingConfig) -> SourceRegistry {
        SourceRegistry {
            fetcher,
            polling,
            sources: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The data source for `location`, started on first use. The flag tells
    /// whether it was created by this call.
    pub(crate) async fn register_or_get(
        &self,
        location: &Location,
    ) -> Result<(ActorRef<DataSourceMsg>, bool)> {
        let mut sources = self.sources.lock().await;
        if let Some(source) = sources.get(location) {
            return Ok((source.clone(), false));
        }
        let (source, _) = Actor::spawn(
            None,
            DataSource,
            DataSourceInit {
                location: location.clone(),
                fetcher: self.fetcher.clone(),
                polling: self.polling.clone(),
            },
        )
        .await
        .with_context(|| format!("failed to start data source for {location}"))?;
        info!(target: "registry", %location, "registered location");
        sources.insert(location.clone(), source.clone());
        Ok((source, true))
    }

    /// Answer a `/get` request for the base64 encoded `raw` location.
    pub(crate) async fn query(&self, raw: &str, args: QueryArguments) -> Value {
        let location = match Location::decode(raw) {
            Ok(location) => location,
            Err(error) => return invalid_location(&error),
        };
        let source = match self.register_or_get(&location).await {
            Ok((_, true)) => {
                return warning_only(
                    Warning::InvalidLocation,
                    "Given location does not (yet) contain data.",
                );
            }
            Ok((source, false)) => source,
            Err(error) => return invalid_location(&error),
        };
        match ractor::call!(source, DataSourceMsg::Query, args) {
            Ok(result) => result,
            Err(error) => self.lost(&location, &error.to_string()).await,
        }
    }

    /// Answer an `/info` request, registering the location if needed.
    pub(crate) async fn info(&self, raw: &str) -> Value {
        let location = match Location::decode(raw) {
            Ok(location) => location,
            Err(error) => return invalid_location(&error),
        };
        let source = match self.register_or_get(&location).await {
            Ok((source, _)) => source,
            Err(error) => return invalid_location(&error),
        };
        match ractor::call!(source, DataSourceMsg::Info) {
            Ok(info) => info,
            Err(error) => self.lost(&location, &error.to_string()).await,
        }
    }

    /// Info of every registered source.
    pub(crate) async fn list(&self) -> Value {
        let sources: Vec<_> = self.sources.lock().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(sources.len());
        for source in sources {
            if let Ok(info) = ractor::call!(source, DataSourceMsg::Info) {
                infos.push(info);
            }
        }
        Value::Array(infos)
    }

    pub(crate) async fn stop_all(&self) {
        let mut sources = self.sources.lock().await;
        for (_, source) in sources.drain() {
            source.stop(None);
        }
    }

    /// Forget a source that no longer answers so the next request starts a
    /// fresh one.
    async fn lost(&self, location: &Location, error: &str) -> Value {
        warn!(target: "registry", %location, error, "data source is not responding");
        self.sources.lock().await.remove(location);
        warning_only(
            Warning::InvalidLocation,
            "Given location does not (yet) contain data.",
        )
    }
}

fn invalid_location(error: &anyhow::Error) -> Value {
    warning_only(
        Warning::InvalidLocation,
        &format!("Given location is invalid: {error:#}"),
    )
}
