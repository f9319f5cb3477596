use super::{NsId, Term};

pub(crate) const RDF_TYPE: Term = Term::const_term(NsId::RDF, "type");

pub(crate) const TREE_NODE: Term = Term::const_term(NsId::TREE, "Node");
pub(crate) const TREE_RELATION: Term = Term::const_term(NsId::TREE, "relation");
pub(crate) const TREE_RELATION_NODE: Term = Term::const_term(NsId::TREE, "node");
pub(crate) const TREE_PATH: Term = Term::const_term(NsId::TREE, "path");
pub(crate) const TREE_VALUE: Term = Term::const_term(NsId::TREE, "value");
pub(crate) const TREE_VIEW: Term = Term::const_term(NsId::TREE, "view");

pub(crate) const LDP_CONTAINS: Term = Term::const_term(NsId::LDP, "contains");
pub(crate) const LDP_INBOX: Term = Term::const_term(NsId::LDP, "inbox");

pub(crate) const LDES_EVENT_STREAM: Term = Term::const_term(NsId::LDES, "EventStream");

/// Types marking a TREE node
pub(crate) const TREE_NODE_TYPES: [Term; 1] = [TREE_NODE];

/// Types marking a generic container
pub(crate) const LDP_CONTAINER_TYPES: [Term; 4] = [
    Term::const_term(NsId::LDP, "Container"),
    Term::const_term(NsId::LDP, "BasicContainer"),
    Term::const_term(NsId::LDP, "DirectContainer"),
    Term::const_term(NsId::LDP, "IndirectContainer"),
];

/// Types marking an event stream descriptor
pub(crate) const LDES_STREAM_TYPES: [Term; 1] = [LDES_EVENT_STREAM];

pub(crate) fn any_is(types: &[&Term], expected: &[Term]) -> bool {
    types.iter().any(|ty| expected.contains(*ty))
}
