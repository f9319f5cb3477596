use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef, MessagingErr, RpcReplyPort};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::fetch::TripleFetcher;
use crate::ingest::Ingestor;
use crate::location::Location;
use crate::query::{self, QueryArguments, Warning};
use crate::rdf::{Notation, Transform, Triple, fold_triples};
use crate::store::Slot;
use crate::stream::{StreamHandle, TripleSink, subscribe};

/// Ingests and serves the data found at one location.
pub(crate) struct DataSource;

pub(crate) struct DataSourceInit {
    pub(crate) location: Location,
    pub(crate) fetcher: TripleFetcher,
    pub(crate) polling: PollingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SourceStatus {
    Loading,
    Ready,
    Empty,
    Failed(String),
}

impl SourceStatus {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            SourceStatus::Loading => "loading",
            SourceStatus::Ready => "ready",
            SourceStatus::Empty => "empty",
            SourceStatus::Failed(_) => "failed",
        }
    }

    /// Explanation returned in place of data while the source is not ready.
    fn warning(&self) -> Option<String> {
        match self {
            SourceStatus::Ready => None,
            SourceStatus::Loading => Some("Given location does not (yet) contain data.".to_string()),
            SourceStatus::Empty => Some("Given location does not contain any data.".to_string()),
            SourceStatus::Failed(error) => Some(format!("Given location could not be ingested: {error}")),
        }
    }
}

pub(crate) struct DataSourceState {
    location: Location,
    fetcher: TripleFetcher,
    polling: PollingConfig,
    ingestor: Ingestor,
    status: SourceStatus,
    streams: Vec<StreamHandle>,
}

pub(crate) enum DataSourceMsg {
    Ingest(Vec<Triple>),
    /// The initial load finished; no more data unless a stream is attached
    Loaded,
    Streaming(StreamHandle),
    Query(QueryArguments, RpcReplyPort<Value>),
    Info(RpcReplyPort<Value>),
}

impl Actor for DataSource {
    type Msg = DataSourceMsg;
    type State = DataSourceState;
    type Arguments = DataSourceInit;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let DataSourceInit {
            location,
            fetcher,
            polling,
        } = args;
        let ingestor = Ingestor::new(Arc::clone(fetcher.namespaces()));
        Ok(DataSourceState {
            location,
            fetcher,
            polling,
            ingestor,
            status: SourceStatus::Loading,
            streams: vec![],
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        info!(target: "lifecycle", location = %state.location, remote = state.location.is_remote(), "data source started");
        let fetcher = state.fetcher.clone();
        let polling = state.polling.clone();
        match &state.location {
            Location::Remote(url) => {
                tokio::spawn(load_remote(myself, fetcher, url.clone(), polling));
            }
            Location::Local(path) => {
                let path = path.display().to_string();
                tokio::spawn(async move {
                    let triples = fetcher.fetch(&path).await;
                    let _ = myself.send_message(DataSourceMsg::Ingest(triples));
                    let _ = myself.send_message(DataSourceMsg::Loaded);
                });
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        for stream in state.streams.drain(..) {
            stream.stop();
            if let Err(error) = stream.stopped().await {
                warn!(target: "lifecycle", location = %state.location, "stream poller did not stop cleanly: {error:#}");
            }
        }
        info!(target: "lifecycle", location = %state.location, "data source stopped");
        Ok(())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DataSourceMsg::Ingest(triples) => state.ingest(triples),
            DataSourceMsg::Loaded => {
                if state.status == SourceStatus::Loading {
                    state.status = SourceStatus::Empty;
                    info!(target: "ingest", location = %state.location, "location holds no data");
                }
            }
            DataSourceMsg::Streaming(handle) => {
                if matches!(state.status, SourceStatus::Failed(_)) {
                    handle.stop();
                } else {
                    state.streams.push(handle);
                }
            }
            DataSourceMsg::Query(args, reply) => {
                if reply.send(state.query(&args)).is_err() {
                    debug!(target: "registry", location = %state.location, "query caller went away");
                }
            }
            DataSourceMsg::Info(reply) => {
                if reply.send(state.info()).is_err() {
                    debug!(target: "registry", location = %state.location, "info caller went away");
                }
            }
        }
        Ok(())
    }
}

/// Subscribe to the stream at `url` and start polling it. Documents that
/// describe no stream are ingested as plain data from the same fetch.
async fn load_remote(
    myself: ActorRef<DataSourceMsg>,
    fetcher: TripleFetcher,
    url: String,
    polling: PollingConfig,
) {
    let sink_target = myself.clone();
    let on_triples: TripleSink = Arc::new(move |triples: Vec<Triple>| {
        let _ = sink_target.send_message(DataSourceMsg::Ingest(triples));
    });
    let triples = fetcher.fetch(&url).await;
    let records = fold_triples(&triples);
    let mut subscriptions = subscribe(&fetcher, &url, &records, on_triples).into_iter();
    let Some(subscription) = subscriptions.next() else {
        debug!(target: "stream", %url, "no event stream found, reading as a plain document");
        let _ = myself.send_message(DataSourceMsg::Ingest(triples));
        let _ = myself.send_message(DataSourceMsg::Loaded);
        return;
    };
    let ignored = subscriptions.count();
    if ignored > 0 {
        info!(target: "stream", %url, ignored, "location describes several streams, following the first");
    }
    info!(target: "stream", %url, mode = ?subscription.root().mode(), "following event stream");
    match subscription
        .start(polling.interval(), polling.initial_delay())
        .await
    {
        Ok(handle) => {
            if let Err(MessagingErr::SendErr(DataSourceMsg::Streaming(handle))) =
                myself.send_message(DataSourceMsg::Streaming(handle))
            {
                debug!(target: "stream", %url, "data source went away before its stream started");
                handle.stop();
            }
        }
        Err(error) => {
            warn!(target: "stream", %url, "unable to start stream poller: {error:#}");
            let _ = myself.send_message(DataSourceMsg::Loaded);
        }
    }
}

impl DataSourceState {
    /// Push one batch through the ingestor and seal its last record.
    fn ingest(&mut self, triples: Vec<Triple>) {
        if let Some(error) = self.ingestor.error() {
            debug!(target: "ingest", location = %self.location, %error, "dropping batch for failed source");
            return;
        }
        let count = triples.len();
        let result = triples
            .into_iter()
            .try_for_each(|triple| self.ingestor.push(triple))
            .and_then(|()| self.ingestor.finish());
        if let Err(error) = result {
            warn!(target: "ingest", location = %self.location, %error, "ingestion stopped");
            self.status = SourceStatus::Failed(error.to_string());
            self.stop_streams();
            return;
        }
        if !self.ingestor.store().is_empty() {
            self.status = SourceStatus::Ready;
        }
        debug!(target: "ingest", location = %self.location, triples = count, records = self.ingestor.store().len(), "batch ingested");
    }

    fn query(&self, args: &QueryArguments) -> Value {
        match self.status.warning() {
            Some(message) => query::warning_only(Warning::InvalidLocation, &message),
            None => query::run(
                self.ingestor.store(),
                self.ingestor.schema(),
                self.fetcher.namespaces(),
                args,
            ),
        }
    }

    fn info(&self) -> Value {
        let namespaces = self.fetcher.namespaces();
        let store = self.ingestor.store();
        let schema = self.ingestor.schema();
        let predicates: Vec<_> = schema
            .map(|schema| {
                schema
                    .slots()
                    .iter()
                    .map(|slot| namespaces.render(&slot.predicate, Notation::Compact))
                    .collect()
            })
            .unwrap_or_default();
        // sort predicate and the transform its values were decoded with
        let sort = schema.and_then(|schema| {
            let index = schema.sort_slot()?;
            let transform = store.iter().find_map(|record| match record.slots.get(index) {
                Some(Slot::One(term)) => term.transform(),
                _ => None,
            });
            Some(json!({
                "predicate": namespaces.render(&schema.slots()[index].predicate, Notation::Compact),
                "transform": transform.map(Transform::name),
            }))
        });
        let mut info = json!({
            "location": self.location.to_string(),
            "status": self.status.name(),
            "records": store.len(),
            "sortable": schema.is_some_and(|schema| schema.is_sortable()),
            "predicates": predicates,
            "sort": sort,
            "streams": self.streams.len(),
            "first": store.first().and_then(|record| record.sort_key),
            "last": store.last().and_then(|record| record.sort_key),
        });
        if let SourceStatus::Failed(error) = &self.status {
            info["error"] = Value::from(error.as_str());
        }
        info
    }

    fn stop_streams(&mut self) {
        for stream in self.streams.drain(..) {
            stream.stop();
        }
    }
}
