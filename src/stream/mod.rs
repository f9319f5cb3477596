//! Incremental polling of LDES event streams.
//!
//! A subscription owns a tree of [`Page`]s mirroring the container hierarchy
//! below a stream's TREE view. Leaf pages feed newly listed data locations
//! into a pending queue; the [`StreamPoller`] actor drains that queue after an
//! initial delay and on every poll tick, handing fetched triples to the
//! subscriber.

mod page;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, ensure};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::container::{Container, parse_container, stream_view};
use crate::fetch::TripleFetcher;
use crate::rdf::vocab::LDES_STREAM_TYPES;
use crate::rdf::{Record, Triple};

pub(crate) use self::page::{Dispatch, Page, PagePath, StreamShared};

/// Receives every batch of triples fetched from a data location.
pub(crate) type TripleSink = Arc<dyn Fn(Vec<Triple>) + Send + Sync>;

/// A resolved event stream, ready to be polled.
pub(crate) struct Subscription {
    fetcher: TripleFetcher,
    root: Page,
    shared: StreamShared,
    initial: Vec<Dispatch>,
    on_triples: TripleSink,
}

/// Find the event streams among the `records` fetched from `location` and
/// build one subscription per stream whose view resolves.
pub(crate) fn subscribe(
    fetcher: &TripleFetcher,
    location: &str,
    records: &[Record],
    on_triples: TripleSink,
) -> Vec<Subscription> {
    let mut subscriptions = vec![];
    for record in records {
        if !record.is_a(&LDES_STREAM_TYPES) {
            continue;
        }
        match stream_view(record, fetcher.namespaces()) {
            Ok(view) => {
                let mut root = Page::new(location.to_string(), Container::Tree(view));
                let mut shared = StreamShared::default();
                let initial = root.interpret(&[], &mut shared);
                subscriptions.push(Subscription {
                    fetcher: fetcher.clone(),
                    root,
                    shared,
                    initial,
                    on_triples: on_triples.clone(),
                });
            }
            Err(error) => {
                info!(target: "stream", location, subject = %record.subject, "unable to parse stream: {error:#}");
            }
        }
    }
    subscriptions
}

impl Subscription {
    pub(crate) fn root(&self) -> &Page {
        &self.root
    }

    /// Spawn the poller. The pending queue is first drained after
    /// `initial_delay`, then the stream is refreshed every `interval`.
    pub(crate) async fn start(
        self,
        interval: Duration,
        initial_delay: Duration,
    ) -> Result<StreamHandle> {
        ensure!(!interval.is_zero(), "poll interval must be positive");
        let (actor, handle) = Actor::spawn(
            None,
            StreamPoller,
            StreamPollerInit {
                subscription: self,
                interval,
                initial_delay,
            },
        )
        .await?;
        Ok(StreamHandle { actor, handle })
    }
}

/// Controls a running subscription.
pub(crate) struct StreamHandle {
    actor: ActorRef<StreamPollerMsg>,
    handle: JoinHandle<()>,
}

impl StreamHandle {
    /// Stop polling. Fetches still in flight are discarded.
    pub(crate) fn stop(&self) {
        self.actor.stop(None);
    }

    pub(crate) async fn stopped(self) -> Result<()> {
        self.handle.await?;
        Ok(())
    }
}

pub(crate) struct StreamPoller;

pub(crate) struct StreamPollerInit {
    subscription: Subscription,
    interval: Duration,
    initial_delay: Duration,
}

pub(crate) struct StreamPollerState {
    fetcher: TripleFetcher,
    root: Page,
    shared: StreamShared,
    on_triples: TripleSink,
    interval: Duration,
    initial_delay: Duration,
    initial: Vec<Dispatch>,
    refreshing: HashSet<PagePath>,
    timer: Option<JoinHandle<()>>,
}

pub(crate) enum StreamPollerMsg {
    /// Initial delay elapsed
    Start,
    Tick,
    PageFetched {
        path: PagePath,
        container: Option<Container>,
    },
    ChildResolved {
        parent: PagePath,
        location: String,
        container: Option<Container>,
    },
}

impl Actor for StreamPoller {
    type Msg = StreamPollerMsg;
    type State = StreamPollerState;
    type Arguments = StreamPollerInit;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let StreamPollerInit {
            subscription,
            interval,
            initial_delay,
        } = args;
        let Subscription {
            fetcher,
            root,
            shared,
            initial,
            on_triples,
        } = subscription;
        Ok(StreamPollerState {
            fetcher,
            root,
            shared,
            on_triples,
            interval,
            initial_delay,
            initial,
            refreshing: HashSet::new(),
            timer: None,
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        info!(target: "lifecycle", location = state.root.location(), mode = ?state.root.mode(), "stream poller started");
        let initial = std::mem::take(&mut state.initial);
        state.run(&myself, initial);
        myself.send_after(state.initial_delay, || StreamPollerMsg::Start);
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        info!(target: "lifecycle", location = state.root.location(), "stream poller stopped");
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            StreamPollerMsg::Start => {
                state.drain();
                if state.timer.is_none() {
                    state.timer = Some(myself.send_interval(state.interval, || StreamPollerMsg::Tick));
                }
            }
            StreamPollerMsg::Tick => {
                debug!(target: "stream", location = state.root.location(), seen = state.root.seen().len(), "poll");
                state.run(&myself, vec![Dispatch::Refresh(vec![])]);
                state.drain();
            }
            StreamPollerMsg::PageFetched { path, container } => {
                state.refreshing.remove(&path);
                let dispatches = state.page_fetched(&path, container);
                state.run(&myself, dispatches);
            }
            StreamPollerMsg::ChildResolved {
                parent,
                location,
                container,
            } => {
                let dispatches = state.child_resolved(parent, location, container);
                state.run(&myself, dispatches);
            }
        }
        Ok(())
    }
}

impl StreamPollerState {
    /// Start the fetches requested by an interpretation pass without waiting
    /// for them. Results come back as messages.
    fn run(&mut self, myself: &ActorRef<StreamPollerMsg>, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            match dispatch {
                Dispatch::Refresh(path) => {
                    let Some(page) = self.root.page(&path) else {
                        continue;
                    };
                    if !self.refreshing.insert(path.clone()) {
                        debug!(target: "stream", location = page.location(), "refresh already in flight");
                        continue;
                    }
                    let location = page.location().to_string();
                    let fetcher = self.fetcher.clone();
                    let myself = myself.clone();
                    tokio::spawn(async move {
                        let container = fetch_container(&fetcher, &location).await;
                        if container.is_none() {
                            info!(target: "stream", %location, "no valid container structure found");
                        }
                        let _ = myself.send_message(StreamPollerMsg::PageFetched { path, container });
                    });
                }
                Dispatch::Discover { parent, location } => {
                    debug!(target: "stream", %location, "fetching new page");
                    let fetcher = self.fetcher.clone();
                    let myself = myself.clone();
                    tokio::spawn(async move {
                        let container = fetch_container(&fetcher, &location).await;
                        let _ = myself.send_message(StreamPollerMsg::ChildResolved {
                            parent,
                            location,
                            container,
                        });
                    });
                }
            }
        }
    }

    /// Fetch every queued data location and pass its triples on.
    fn drain(&mut self) {
        while let Some(location) = self.shared.pending.pop_front() {
            let fetcher = self.fetcher.clone();
            let on_triples = self.on_triples.clone();
            tokio::spawn(async move {
                let triples = fetcher.fetch(&location).await;
                if !triples.is_empty() {
                    debug!(target: "stream", %location, triples = triples.len(), "page data received");
                    on_triples(triples);
                }
            });
        }
    }

    fn page_fetched(&mut self, path: &[usize], container: Option<Container>) -> Vec<Dispatch> {
        let Some(container) = container else {
            return vec![];
        };
        let Some(page) = self.root.page_mut(path) else {
            return vec![];
        };
        page.replace_container(container);
        page.interpret(path, &mut self.shared)
    }

    fn child_resolved(
        &mut self,
        parent: PagePath,
        location: String,
        container: Option<Container>,
    ) -> Vec<Dispatch> {
        let Some(container) = container else {
            info!(target: "stream", %location, "page did not contain a valid container structure");
            return vec![];
        };
        let Some(page) = self.root.page_mut(&parent) else {
            return vec![];
        };
        let index = page.attach(Page::new(location, container));
        debug!(target: "stream", parent = page.location(), children = page.children().len(), "page attached");
        let mut path = parent;
        path.push(index);
        match self.root.page_mut(&path) {
            Some(child) => child.interpret(&path, &mut self.shared),
            None => vec![],
        }
    }
}

/// The first container found at `location`.
async fn fetch_container(fetcher: &TripleFetcher, location: &str) -> Option<Container> {
    fetcher
        .fetch_records(location)
        .await
        .iter()
        .find_map(|record| parse_container(record, fetcher.namespaces()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::rdf::Triple;
    use crate::testing::{StaticSource, shared_fetcher};

    use crate::fetch::TripleFetcher;

    use super::page::PageMode;
    use super::{Subscription, TripleSink, subscribe};

    const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    const STREAM: &str = "https://w3id.org/ldes#EventStream";
    const VIEW: &str = "https://w3id.org/tree#view";
    const NODE: &str = "https://w3id.org/tree#Node";
    const RELATION: &str = "https://w3id.org/tree#relation";
    const RELATION_NODE: &str = "https://w3id.org/tree#node";
    const PATH: &str = "https://w3id.org/tree#path";
    const VALUE: &str = "https://w3id.org/tree#value";
    const RESULT_TIME: &str = "http://www.w3.org/ns/sosa/resultTime";
    const CONTAINER: &str = "http://www.w3.org/ns/ldp#Container";
    const CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
    const ROOT: &str = "http://example.org/stream";

    type RawTriple = (&'static str, &'static str, &'static str);

    fn stream_root(relations: &[RawTriple]) -> Vec<RawTriple> {
        let mut raw = vec![
            (ROOT, TYPE, STREAM),
            (ROOT, VIEW, "http://example.org/view"),
            ("http://example.org/view", TYPE, NODE),
        ];
        for &(relation, target, value) in relations {
            raw.push(("http://example.org/view", RELATION, relation));
            raw.push((relation, RELATION_NODE, target));
            raw.push((relation, PATH, RESULT_TIME));
            raw.push((relation, VALUE, value));
        }
        raw
    }

    fn observation(subject: &'static str, time: &'static str) -> [RawTriple; 1] {
        [(subject, RESULT_TIME, time)]
    }

    async fn subscriptions(fetcher: &TripleFetcher, on_triples: TripleSink) -> Vec<Subscription> {
        subscribe(fetcher, ROOT, &fetcher.fetch_records(ROOT).await, on_triples)
    }

    fn sink() -> (TripleSink, mpsc::UnboundedReceiver<Vec<Triple>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let on_triples: TripleSink = Arc::new(move |triples: Vec<Triple>| {
            let _ = tx.send(triples);
        });
        (on_triples, rx)
    }

    async fn next_subject(rx: &mut mpsc::UnboundedReceiver<Vec<Triple>>) -> Result<String> {
        let batch = timeout(Duration::from_secs(2), rx.recv())
            .await?
            .context("sink closed")?;
        Ok(batch[0].subject.value().to_string())
    }

    #[tokio::test]
    async fn leaf_pages_are_polled_incrementally() -> Result<()> {
        let source = Arc::new(
            StaticSource::default()
                .with(
                    ROOT,
                    &stream_root(&[("_:r1", "http://example.org/page1", "2024-01-01T00:00:00Z")]),
                )
                .with(
                    "http://example.org/page1",
                    &observation("http://example.org/obs1", "2024-01-01T00:00:00Z"),
                )
                .with(
                    "http://example.org/page2",
                    &observation("http://example.org/obs2", "2024-01-02T00:00:00Z"),
                ),
        );
        let fetcher = shared_fetcher(source.clone());
        let (on_triples, mut rx) = sink();
        let mut subscriptions = subscriptions(&fetcher, on_triples).await;
        assert_eq!(subscriptions.len(), 1);
        let subscription = subscriptions.remove(0);
        assert_eq!(subscription.root().mode(), PageMode::Leaves);

        let handle = subscription
            .start(Duration::from_millis(50), Duration::from_millis(10))
            .await?;
        assert_eq!(next_subject(&mut rx).await?, "obs1");

        source.set(
            ROOT,
            &stream_root(&[
                ("_:r1", "http://example.org/page1", "2024-01-01T00:00:00Z"),
                ("_:r2", "http://example.org/page2", "2024-01-02T00:00:00Z"),
            ]),
        );
        assert_eq!(next_subject(&mut rx).await?, "obs2");

        handle.stop();
        handle.stopped().await?;
        let page1_fetches = source
            .fetched()
            .iter()
            .filter(|location| location.as_str() == "http://example.org/page1")
            .count();
        assert_eq!(page1_fetches, 1);
        Ok(())
    }

    #[tokio::test]
    async fn container_pages_become_children() -> Result<()> {
        let source = Arc::new(
            StaticSource::default()
                .with(
                    ROOT,
                    &[
                        (ROOT, TYPE, STREAM),
                        (ROOT, VIEW, "http://example.org/view"),
                        ("http://example.org/view", TYPE, NODE),
                        ("http://example.org/view", RELATION, "_:r"),
                        ("_:r", RELATION_NODE, "http://example.org/day1"),
                        ("_:r", PATH, RESULT_TIME),
                        ("_:r", VALUE, "2024-01-01T00:00:00Z"),
                        ("http://example.org/day1", TYPE, CONTAINER),
                    ],
                )
                .with(
                    "http://example.org/day1",
                    &[
                        ("http://example.org/day1", TYPE, CONTAINER),
                        ("http://example.org/day1", CONTAINS, "http://example.org/day1/a"),
                    ],
                )
                .with(
                    "http://example.org/day1/a",
                    &observation("http://example.org/obs1", "2024-01-01T00:00:00Z"),
                ),
        );
        let fetcher = shared_fetcher(source);
        let (on_triples, mut rx) = sink();
        let subscription = subscriptions(&fetcher, on_triples)
            .await
            .pop()
            .context("stream expected")?;
        assert_eq!(subscription.root().mode(), PageMode::Containers);
        assert!(subscription.root().seen().contains("http://example.org/day1"));

        let handle = subscription
            .start(Duration::from_millis(50), Duration::from_millis(10))
            .await?;
        assert_eq!(next_subject(&mut rx).await?, "obs1");
        handle.stop();
        handle.stopped().await?;
        Ok(())
    }

    #[tokio::test]
    async fn documents_without_streams_yield_nothing() {
        let source = Arc::new(StaticSource::default().with(
            ROOT,
            &[(ROOT, TYPE, CONTAINER), (ROOT, CONTAINS, "http://example.org/a")],
        ));
        let (on_triples, _rx) = sink();
        assert!(subscriptions(&shared_fetcher(source), on_triples).await.is_empty());
    }

    #[tokio::test]
    async fn slow_refreshes_are_not_repeated() -> Result<()> {
        let source = Arc::new(StaticSource::default().with(
            ROOT,
            &stream_root(&[("_:r1", "http://example.org/page1", "2024-01-01T00:00:00Z")]),
        ));
        let fetcher = shared_fetcher(source.clone());
        let (on_triples, _rx) = sink();
        let subscription = subscriptions(&fetcher, on_triples)
            .await
            .pop()
            .context("stream expected")?;
        source.stall(ROOT);

        let handle = subscription
            .start(Duration::from_millis(20), Duration::from_millis(5))
            .await?;
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop();
        handle.stopped().await?;

        // one fetch to subscribe, then a single refresh that never returns
        let root_fetches = source
            .fetched()
            .iter()
            .filter(|location| location.as_str() == ROOT)
            .count();
        assert_eq!(root_fetches, 2);
        Ok(())
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() -> Result<()> {
        let source = Arc::new(StaticSource::default().with(
            ROOT,
            &stream_root(&[("_:r1", "http://example.org/page1", "2024-01-01T00:00:00Z")]),
        ));
        let (on_triples, _rx) = sink();
        let subscription = subscriptions(&shared_fetcher(source), on_triples)
            .await
            .pop()
            .context("stream expected")?;
        assert!(subscription.start(Duration::ZERO, Duration::ZERO).await.is_err());
        Ok(())
    }
}
