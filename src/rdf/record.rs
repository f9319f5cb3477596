//! Folding of triple batches into subject records.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::vocab::{RDF_TYPE, any_is};
use super::{Term, Triple};

/// Object position of a record property: a plain term, or a temporary
/// subject's record inlined in place of its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Term(Term),
    Record(Record),
}

/// A predicate holds one node until a second value shows up, then a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Property {
    Single(Node),
    Many(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    pub(crate) subject: Term,
    pub(crate) properties: Vec<(Term, Property)>,
}

impl Node {
    /// The term this node stands for: the term itself or the inlined
    /// record's subject.
    pub(crate) fn identity(&self) -> &Term {
        match self {
            Node::Term(term) => term,
            Node::Record(record) => &record.subject,
        }
    }

    pub(crate) fn as_record(&self) -> Option<&Record> {
        match self {
            Node::Term(_) => None,
            Node::Record(record) => Some(record),
        }
    }
}

impl Property {
    fn push(&mut self, node: Node) {
        *self = match std::mem::replace(self, Property::Many(vec![])) {
            Property::Single(first) => Property::Many(vec![first, node]),
            Property::Many(mut nodes) => {
                nodes.push(node);
                Property::Many(nodes)
            }
        };
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        match self {
            Property::Single(node) => std::slice::from_ref(node),
            Property::Many(nodes) => nodes,
        }
    }

    pub(crate) fn single(&self) -> Option<&Node> {
        match self {
            Property::Single(node) => Some(node),
            Property::Many(_) => None,
        }
    }
}

impl Record {
    pub(crate) fn new(subject: Term) -> Record {
        Record {
            subject,
            properties: vec![],
        }
    }

    pub(crate) fn add(&mut self, predicate: &Term, object: &Term) {
        let node = Node::Term(object.clone());
        match self.properties.iter_mut().find(|(p, _)| p == predicate) {
            Some((_, property)) => property.push(node),
            None => self
                .properties
                .push((predicate.clone(), Property::Single(node))),
        }
    }

    pub(crate) fn get(&self, predicate: &Term) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(p, _)| p == predicate)
            .map(|(_, property)| property)
    }

    /// Declared `rdf:type` values
    pub(crate) fn types(&self) -> Vec<&Term> {
        self.get(&RDF_TYPE)
            .map(|property| property.nodes().iter().map(Node::identity).collect())
            .unwrap_or_default()
    }

    pub(crate) fn is_a(&self, expected: &[Term]) -> bool {
        any_is(&self.types(), expected)
    }
}

/// Group a batch of triples into records of the named subjects.
///
/// A subject is temporary when its value is used as an object anywhere in the
/// batch. Temporary records are never returned on their own; they replace
/// every reference to their subject value, recursively. A reference that
/// would expand into itself is left as a plain term.
pub(crate) fn fold_triples(triples: &[Triple]) -> Vec<Record> {
    let objects: HashSet<&str> = triples.iter().map(|t| t.object.value()).collect();

    let mut temporary: HashMap<&str, Record> = HashMap::new();
    let mut named: Vec<Record> = vec![];
    let mut named_index: HashMap<&str, usize> = HashMap::new();
    for triple in triples {
        let subject = triple.subject.value();
        if objects.contains(subject) {
            temporary
                .entry(subject)
                .or_insert_with(|| Record::new(triple.subject.clone()))
                .add(&triple.predicate, &triple.object);
        } else {
            let index = *named_index.entry(subject).or_insert_with(|| {
                named.push(Record::new(triple.subject.clone()));
                named.len() - 1
            });
            named[index].add(&triple.predicate, &triple.object);
        }
    }

    let mut visiting = HashSet::new();
    named
        .into_iter()
        .map(|record| expand(record, &temporary, &mut visiting))
        .collect()
}

fn expand(
    record: Record,
    temporary: &HashMap<&str, Record>,
    visiting: &mut HashSet<String>,
) -> Record {
    let properties = record
        .properties
        .into_iter()
        .map(|(predicate, property)| {
            let property = match property {
                Property::Single(node) => Property::Single(expand_node(node, temporary, visiting)),
                Property::Many(nodes) => Property::Many(
                    nodes
                        .into_iter()
                        .map(|node| expand_node(node, temporary, visiting))
                        .collect(),
                ),
            };
            (predicate, property)
        })
        .collect();
    Record {
        subject: record.subject,
        properties,
    }
}

fn expand_node(
    node: Node,
    temporary: &HashMap<&str, Record>,
    visiting: &mut HashSet<String>,
) -> Node {
    let term = match node {
        Node::Term(term) => term,
        Node::Record(record) => return Node::Record(expand(record, temporary, visiting)),
    };
    let Some(inlined) = temporary.get(term.value()) else {
        return Node::Term(term);
    };
    if visiting.contains(term.value()) {
        debug!(target: "rdf", subject = %term, "leaving cyclic reference unexpanded");
        return Node::Term(term);
    }
    visiting.insert(term.value().to_string());
    let expanded = expand(inlined.clone(), temporary, visiting);
    visiting.remove(term.value());
    Node::Record(expanded)
}

#[cfg(test)]
mod tests {
    use crate::rdf::{Namespaces, Notation, RawTriple, Triple};

    use super::{Node, Property, fold_triples};

    fn triples(raw: &[(&str, &str, &str)]) -> Vec<Triple> {
        let namespaces = Namespaces::builtin();
        raw.iter()
            .map(|&(s, p, o)| namespaces.triple(&RawTriple::new(s, p, o), Notation::Compact))
            .collect()
    }

    #[test]
    fn promotes_repeated_predicates_to_lists() {
        let records = fold_triples(&triples(&[
            ("ex:a", "rdf:type", "ldp:Container"),
            ("ex:a", "rdf:type", "ldp:BasicContainer"),
            ("ex:a", "dct:title", "A"),
        ]));
        assert_eq!(records.len(), 1);
        let types = records[0].types();
        assert_eq!(types.len(), 2);
        assert_eq!(types[1].value(), "BasicContainer");
        assert!(matches!(
            records[0].properties[1].1,
            Property::Single(Node::Term(_))
        ));
    }

    #[test]
    fn inlines_temporary_subjects_recursively() {
        let records = fold_triples(&triples(&[
            ("ex:root", "tree:relation", "_b1"),
            ("ex:root", "tree:relation", "_b2"),
            ("_b1", "tree:node", "ex:page1"),
            ("_b2", "tree:node", "ex:page2"),
            ("ex:page2", "rdf:type", "ldp:Container"),
        ]));
        // only the root is named, the relations and page2 are temporary
        assert_eq!(records.len(), 1);
        let root = &records[0];
        assert_eq!(root.subject.value(), "ex:root");

        let relations = root.properties[0].1.nodes();
        assert_eq!(relations.len(), 2);
        let first = relations[0].as_record().expect("relation should be inlined");
        let page1 = first.properties[0].1.single().expect("single node");
        assert!(matches!(page1, Node::Term(term) if term.value() == "ex:page1"));

        let second = relations[1].as_record().expect("relation should be inlined");
        let page2 = second.properties[0].1.single().and_then(Node::as_record);
        assert!(page2.is_some_and(|page| page.types().len() == 1));
    }

    #[test]
    fn cyclic_references_terminate() {
        let records = fold_triples(&triples(&[
            ("ex:s", "ex:p", "_a"),
            ("_a", "ex:next", "_b"),
            ("_b", "ex:next", "_a"),
        ]));
        assert_eq!(records.len(), 1);
        let a = records[0].properties[0].1.single().and_then(Node::as_record);
        let a = a.expect("_a should be inlined");
        let b = a.properties[0].1.single().and_then(Node::as_record);
        let b = b.expect("_b should be inlined");
        let back = b.properties[0].1.single();
        assert!(matches!(back, Some(Node::Term(term)) if term.value() == "_a"));
    }

    #[test]
    fn self_reference_is_not_substituted() {
        let records = fold_triples(&triples(&[
            ("ex:s", "ex:p", "_a"),
            ("_a", "ex:same", "_a"),
        ]));
        let a = records[0].properties[0].1.single().and_then(Node::as_record);
        let inner = a.and_then(|a| a.properties[0].1.single());
        assert!(matches!(inner, Some(Node::Term(_))));
    }
}
