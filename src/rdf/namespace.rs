use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::NamespaceConfig;

use super::transform::{Transform, TransformSpec};
use super::{Notation, RawTriple, Term, Triple};

/// Position of a namespace in the [`Namespaces`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NsId(u16);

impl NsId {
    pub(crate) const RDF: NsId = NsId(0);
    pub(crate) const TREE: NsId = NsId(1);
    pub(crate) const LDP: NsId = NsId(2);
    pub(crate) const LDES: NsId = NsId(3);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered namespace table. Matching is first-match in table order, so the
/// built-in vocabularies always win over configured ones.
#[derive(Debug, Clone)]
pub(crate) struct Namespaces {
    entries: Vec<NamespaceConfig>,
}

impl Default for Namespaces {
    fn default() -> Self {
        Namespaces::builtin()
    }
}

impl Namespaces {
    pub(crate) fn builtin() -> Namespaces {
        let mut sosa = namespace("sosa:", "http://www.w3.org/ns/sosa/");
        sosa.sorting = Some("resultTime".to_string());
        sosa.transforms.insert(
            "resultTime".to_string(),
            TransformSpec::new("timestamp", "ISO8601"),
        );
        sosa.transforms.insert(
            "hasSimpleResult".to_string(),
            TransformSpec::new("data", "number"),
        );
        // The first entries must match the NsId constants above
        Namespaces {
            entries: vec![
                namespace("rdf:", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
                namespace("tree:", "https://w3id.org/tree#"),
                namespace("ldp:", "http://www.w3.org/ns/ldp#"),
                namespace("ldes:", "https://w3id.org/ldes#"),
                namespace("xsd:", "http://www.w3.org/2001/XMLSchema#"),
                namespace("rdfs:", "http://www.w3.org/2000/01/rdf-schema#"),
                sosa,
                namespace("dct:", "http://purl.org/dc/terms/"),
            ],
        }
    }

    /// Built-in table extended by the configured namespaces. An entry reusing
    /// a built-in key replaces that entry in place.
    pub(crate) fn from_config(configured: &[NamespaceConfig]) -> Namespaces {
        let mut namespaces = Namespaces::builtin();
        for entry in configured {
            if entry.key.is_empty() || entry.uri.is_empty() {
                info!(target: "config", key = %entry.key, uri = %entry.uri, "ignoring incomplete namespace");
                continue;
            }
            match namespaces.entries.iter_mut().find(|ns| ns.key == entry.key) {
                Some(existing) => *existing = entry.clone(),
                None => namespaces.entries.push(entry.clone()),
            }
        }
        namespaces
    }

    pub(crate) fn key(&self, id: NsId) -> &str {
        &self.entries[id.index()].key
    }

    pub(crate) fn uri(&self, id: NsId) -> &str {
        &self.entries[id.index()].uri
    }

    /// Strip the first matching namespace (short key for compact notation,
    /// full URI for expanded notation) from the trimmed raw value.
    pub(crate) fn normalize(&self, raw: &str, notation: Notation) -> Term {
        let raw = raw.trim();
        for (i, ns) in self.entries.iter().enumerate() {
            let prefix = match notation {
                Notation::Compact => &ns.key,
                Notation::Expanded => &ns.uri,
            };
            if prefix.is_empty() {
                continue;
            }
            if let Some(value) = raw.strip_prefix(prefix.as_str()) {
                return Term::new(value, Some(NsId(i as u16)));
            }
        }
        Term::new(raw, None)
    }

    /// Like [`Namespaces::normalize`] but accepts either notation, checking
    /// the short key before the full URI of every entry.
    pub(crate) fn normalize_any(&self, raw: &str) -> Term {
        let raw = raw.trim();
        for (i, ns) in self.entries.iter().enumerate() {
            for prefix in [&ns.key, &ns.uri] {
                if prefix.is_empty() {
                    continue;
                }
                if let Some(value) = raw.strip_prefix(prefix.as_str()) {
                    return Term::new(value, Some(NsId(i as u16)));
                }
            }
        }
        Term::new(raw, None)
    }

    /// Normalize an object value, decoding it with the transform the
    /// predicate's namespace declares for it. Transforms that are unknown or
    /// fail to decode fall back to plain normalization.
    pub(crate) fn normalize_object(&self, raw: &str, predicate: &Term, notation: Notation) -> Term {
        if let Some(spec) = self.transform_spec(predicate) {
            match Transform::from_spec(spec) {
                Ok(transform) => match transform.apply(raw) {
                    Ok(reasoned) => return Term::reasoned(raw.trim(), transform, reasoned),
                    Err(error) => {
                        debug!(target: "rdf", %error, predicate = %predicate.value(), "unable to decode object");
                    }
                },
                Err(error) => {
                    info!(target: "rdf", %error, predicate = %predicate.value(), "unsupported transform");
                }
            }
        }
        self.normalize(raw, notation)
    }

    /// The transform a predicate declares, if it declares a supported one.
    pub(crate) fn transform_for(&self, predicate: &Term) -> Option<Transform> {
        self.transform_spec(predicate)
            .and_then(|spec| Transform::from_spec(spec).ok())
    }

    fn transform_spec(&self, predicate: &Term) -> Option<&TransformSpec> {
        let ns = predicate.namespace()?;
        self.entries[ns.index()].transforms.get(predicate.value())
    }

    /// Whether the term is the sort predicate its namespace declares.
    pub(crate) fn is_sort_predicate(&self, term: &Term) -> bool {
        let Some(ns) = term.namespace() else {
            return false;
        };
        self.entries[ns.index()].sorting.as_deref() == Some(term.value())
    }

    pub(crate) fn render(&self, term: &Term, notation: Notation) -> String {
        match term.namespace() {
            Some(ns) => {
                let prefix = match notation {
                    Notation::Compact => self.key(ns),
                    Notation::Expanded => self.uri(ns),
                };
                format!("{prefix}{}", term.value())
            }
            None => term.value().to_string(),
        }
    }

    pub(crate) fn triple(&self, raw: &RawTriple, notation: Notation) -> Triple {
        let predicate = self.normalize(&raw.predicate, notation);
        Triple {
            subject: self.normalize(&raw.subject, notation),
            object: self.normalize_object(&raw.object, &predicate, notation),
            predicate,
        }
    }
}

fn namespace(key: &str, uri: &str) -> NamespaceConfig {
    NamespaceConfig {
        key: key.to_string(),
        uri: uri.to_string(),
        sorting: None,
        transforms: BTreeMap::new(),
    }
}
