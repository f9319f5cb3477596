//! Namespace aware RDF terms, triples and subject records.

use std::borrow::Cow;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

mod namespace;
mod record;
mod transform;
pub(crate) mod vocab;

pub(crate) use namespace::{Namespaces, NsId};
pub(crate) use record::{Node, Record, fold_triples};
pub(crate) use transform::{Reasoned, Transform, TransformSpec};

/// Which form of a namespace is used when reading or rendering a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Notation {
    /// Short namespace key, e.g. `tree:node`
    Compact,
    /// Full namespace URI, e.g. `https://w3id.org/tree#node`
    Expanded,
}

impl Notation {
    pub(crate) fn from_long(long: bool) -> Notation {
        if long {
            Notation::Expanded
        } else {
            Notation::Compact
        }
    }
}

/// A value with its recognized namespace stripped off.
///
/// Identity is the namespace and local value only; the reasoned value and
/// the transform that produced it are derived from the raw value.
#[derive(Debug, Clone)]
pub(crate) struct Term {
    value: Cow<'static, str>,
    ns: Option<NsId>,
    reasoned: Option<Reasoned>,
    transform: Option<Transform>,
}

impl Term {
    pub(crate) fn new(value: &str, ns: Option<NsId>) -> Term {
        Term {
            value: Cow::Owned(value.to_owned()),
            ns,
            reasoned: None,
            transform: None,
        }
    }

    pub(crate) const fn const_term(ns: NsId, value: &'static str) -> Term {
        Term {
            value: Cow::Borrowed(value),
            ns: Some(ns),
            reasoned: None,
            transform: None,
        }
    }

    pub(crate) fn reasoned(value: &str, transform: Transform, reasoned: Reasoned) -> Term {
        Term {
            value: Cow::Owned(value.to_owned()),
            ns: None,
            reasoned: Some(reasoned),
            transform: Some(transform),
        }
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn namespace(&self) -> Option<NsId> {
        self.ns
    }

    pub(crate) fn reasoned_value(&self) -> Option<&Reasoned> {
        self.reasoned.as_ref()
    }

    pub(crate) fn transform(&self) -> Option<Transform> {
        self.transform
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.ns == other.ns && self.value == other.value
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ns.hash(state);
        self.value.hash(state);
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

/// Raw subject, predicate and object strings as produced by a triple source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTriple {
    pub(crate) subject: String,
    pub(crate) predicate: String,
    pub(crate) object: String,
}

impl RawTriple {
    pub(crate) fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> RawTriple {
        RawTriple {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Triple {
    pub(crate) subject: Term,
    pub(crate) predicate: Term,
    pub(crate) object: Term,
}
