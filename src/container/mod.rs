//! Hypermedia page lists: TREE nodes, LDP containers and the TREE view of an
//! LDES event stream.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::fetch::TripleFetcher;
use crate::rdf::vocab::{
    LDP_CONTAINER_TYPES, LDP_CONTAINS, LDP_INBOX, LDES_STREAM_TYPES, TREE_NODE_TYPES, TREE_PATH,
    TREE_RELATION, TREE_RELATION_NODE, TREE_VALUE, TREE_VIEW,
};
use crate::rdf::{Namespaces, Node, Notation, Record};
use crate::store::{Sortable, SortedStore};

#[derive(Debug, Clone)]
pub(crate) enum Container {
    Tree(TreeContainer),
    Ldp(LdpContainer),
}

/// Pages reached through `tree:relation`, ordered by relation value.
#[derive(Debug, Clone)]
pub(crate) struct TreeContainer {
    relations: SortedStore<TreeRelation>,
    inbox: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct LdpContainer {
    pages: Vec<String>,
    inbox: Option<String>,
    container_of_containers: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct TreeRelation {
    location: String,
    sort_key: f64,
    container_of_containers: bool,
}

impl Sortable for TreeRelation {
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.sort_key.total_cmp(&other.sort_key)
    }

    fn same_content(&self, other: &Self) -> bool {
        self.sort_key == other.sort_key && self.location == other.location
    }
}

impl Container {
    /// Page locations in container order.
    pub(crate) fn pages(&self) -> Vec<&str> {
        match self {
            Container::Tree(tree) => tree
                .relations
                .iter()
                .map(|relation| relation.location.as_str())
                .collect(),
            Container::Ldp(ldp) => ldp.pages.iter().map(String::as_str).collect(),
        }
    }

    pub(crate) fn inbox(&self) -> Option<&str> {
        match self {
            Container::Tree(tree) => tree.inbox.as_deref(),
            Container::Ldp(ldp) => ldp.inbox.as_deref(),
        }
    }

    /// Whether the pages are containers themselves rather than data.
    pub(crate) fn container_of_containers(&self) -> bool {
        match self {
            Container::Tree(tree) => tree
                .relations
                .iter()
                .any(|relation| relation.container_of_containers),
            Container::Ldp(ldp) => ldp.container_of_containers,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Container::Tree(_) => "tree",
            Container::Ldp(_) => "ldp",
        }
    }
}

/// Classify a record as a container. Records of another type, and
/// containers missing required properties, resolve to `None`.
pub(crate) fn parse_container(record: &Record, namespaces: &Namespaces) -> Option<Container> {
    let parsed = if record.is_a(&TREE_NODE_TYPES) {
        TreeContainer::from_record(record, namespaces).map(Container::Tree)
    } else if record.is_a(&LDP_CONTAINER_TYPES) {
        LdpContainer::from_record(record, namespaces).map(Container::Ldp)
    } else if record.is_a(&LDES_STREAM_TYPES) {
        stream_view(record, namespaces).map(Container::Tree)
    } else {
        return None;
    };
    match parsed {
        Ok(container) => {
            debug!(target: "container", subject = %record.subject, kind = container.kind(), pages = container.pages().len(), "container parsed");
            Some(container)
        }
        Err(error) => {
            info!(target: "container", subject = %record.subject, "ignoring incomplete container: {error:#}");
            None
        }
    }
}

/// The TREE view an event stream descriptor points at.
pub(crate) fn stream_view(record: &Record, namespaces: &Namespaces) -> Result<TreeContainer> {
    let view = record
        .get(&TREE_VIEW)
        .and_then(|view| view.single())
        .and_then(Node::as_record)
        .context("stream has no inlined tree:view")?;
    TreeContainer::from_record(view, namespaces)
}

impl TreeContainer {
    fn from_record(record: &Record, namespaces: &Namespaces) -> Result<TreeContainer> {
        let relations = record
            .get(&TREE_RELATION)
            .context("tree node has no tree:relation")?;
        let mut store = SortedStore::new();
        for node in relations.nodes() {
            let relation = TreeRelation::from_node(node, namespaces)?;
            if store.contains(&relation) {
                debug!(target: "container", location = %relation.location, "duplicate relation");
                continue;
            }
            store.insert(relation);
        }
        Ok(TreeContainer {
            relations: store,
            inbox: inbox(record, namespaces),
        })
    }
}

impl TreeRelation {
    fn from_node(node: &Node, namespaces: &Namespaces) -> Result<TreeRelation> {
        let Some(relation) = node.as_record() else {
            bail!("relation `{}` has no properties", node.identity());
        };
        let target = relation
            .get(&TREE_RELATION_NODE)
            .and_then(|p| p.single())
            .context("relation has no single tree:node")?;
        let path = relation
            .get(&TREE_PATH)
            .and_then(|p| p.single())
            .context("relation has no single tree:path")?
            .identity();
        let transform = namespaces
            .transform_for(path)
            .with_context(|| format!("tree:path `{path}` declares no transform"))?;
        let value = relation
            .get(&TREE_VALUE)
            .and_then(|p| p.single())
            .context("relation has no single tree:value")?
            .identity();
        let sort_key = transform
            .apply(&namespaces.render(value, Notation::Expanded))?
            .as_f64();
        Ok(TreeRelation {
            location: namespaces.render(target.identity(), Notation::Expanded),
            sort_key,
            container_of_containers: is_container(target),
        })
    }
}

impl LdpContainer {
    fn from_record(record: &Record, namespaces: &Namespaces) -> Result<LdpContainer> {
        let pages = record
            .get(&LDP_CONTAINS)
            .context("container has no ldp:contains")?
            .nodes();
        Ok(LdpContainer {
            pages: pages
                .iter()
                .map(|page| namespaces.render(page.identity(), Notation::Expanded))
                .collect(),
            inbox: inbox(record, namespaces),
            container_of_containers: pages.iter().any(is_container),
        })
    }
}

fn is_container(node: &Node) -> bool {
    node.as_record()
        .is_some_and(|record| record.is_a(&LDP_CONTAINER_TYPES))
}

fn inbox(record: &Record, namespaces: &Namespaces) -> Option<String> {
    let node = record.get(&LDP_INBOX)?.nodes().first()?;
    Some(namespaces.render(node.identity(), Notation::Expanded))
}

/// Flatten a container hierarchy into the locations holding data. Sibling
/// results are concatenated in container order; locations already visited
/// are skipped.
pub(crate) async fn resolve_leaf_locations(fetcher: &TripleFetcher, location: &str) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut leaves = Vec::new();
    resolve_into(fetcher, location.to_string(), &mut visited, &mut leaves).await;
    leaves
}

fn resolve_into<'a>(
    fetcher: &'a TripleFetcher,
    location: String,
    visited: &'a mut HashSet<String>,
    leaves: &'a mut Vec<String>,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        if !visited.insert(location.clone()) {
            debug!(target: "container", %location, "skipping already visited container");
            return;
        }
        let records = fetcher.fetch_records(&location).await;
        let containers: Vec<_> = records
            .iter()
            .filter_map(|record| parse_container(record, fetcher.namespaces()))
            .collect();
        if containers.is_empty() {
            info!(target: "container", %location, "container is either empty or invalid");
            return;
        }
        for container in containers {
            if container.container_of_containers() {
                for page in container.pages() {
                    resolve_into(fetcher, page.to_string(), visited, leaves).await;
                }
            } else {
                leaves.extend(container.pages().into_iter().map(str::to_string));
            }
        }
    })
}
