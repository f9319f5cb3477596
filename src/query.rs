//! Range, subject and predicate filtered reads over a source's sorted store.

use std::collections::HashMap;

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::ingest::Schema;
use crate::rdf::{Namespaces, Notation, Term};
use crate::store::{BoundRecord, Slot, SortedStore};

const WARNING_KEY: &str = "@warning";

/// Filters of a single `/get` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct QueryArguments {
    pub(crate) start: Option<f64>,
    pub(crate) end: Option<f64>,
    pub(crate) subjects: Option<Vec<String>>,
    pub(crate) predicates: Option<Vec<String>>,
    pub(crate) long: bool,
}

impl QueryArguments {
    /// Read `start`, `end`, `subj=[a,b]`, `pred=[a,b]` and `long` from a
    /// request's query parameters. Values that do not parse are ignored.
    pub(crate) fn from_params(params: &HashMap<String, String>) -> QueryArguments {
        QueryArguments {
            start: number_param(params, "start"),
            end: number_param(params, "end"),
            subjects: params.get("subj").and_then(|raw| bracket_list(raw)),
            predicates: params.get("pred").and_then(|raw| bracket_list(raw)),
            long: params
                .get("long")
                .is_some_and(|raw| !matches!(raw.trim(), "false" | "0")),
        }
    }

    pub(crate) fn notation(&self) -> Notation {
        Notation::from_long(self.long)
    }

    fn has_range(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    fn in_range(&self, key: f64) -> bool {
        self.start.is_none_or(|start| key > start) && self.end.is_none_or(|end| key < end)
    }
}

fn number_param(params: &HashMap<String, String>, name: &str) -> Option<f64> {
    let raw = params.get(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(error) => {
            debug!(target: "http", %error, name, %raw, "ignoring query parameter");
            None
        }
    }
}

fn bracket_list(raw: &str) -> Option<Vec<String>> {
    let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?;
    Some(
        inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Warning {
    InvalidLocation,
    NotSortable,
    NoData,
}

impl Warning {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Warning::InvalidLocation => "InvalidLocation",
            Warning::NotSortable => "NotSortable",
            Warning::NoData => "NoData",
        }
    }
}

/// A result object holding nothing but one warning.
pub(crate) fn warning_only(kind: Warning, message: &str) -> Value {
    let mut result = Map::new();
    add_warning(&mut result, kind, message);
    Value::Object(result)
}

fn add_warning(result: &mut Map<String, Value>, kind: Warning, message: &str) {
    let warnings = result
        .entry(WARNING_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(warnings) = warnings {
        warnings.insert(kind.name().to_string(), Value::from(message));
    }
}

/// Evaluate `args` against one source and build the result object:
/// `{ subject: { predicate: value | [values] } }` plus an optional
/// `@warning` entry.
pub(crate) fn run(
    store: &SortedStore<BoundRecord>,
    schema: Option<&Schema>,
    namespaces: &Namespaces,
    args: &QueryArguments,
) -> Value {
    let mut result = Map::new();
    let sortable = schema.is_some_and(Schema::is_sortable);
    if args.has_range() && !sortable {
        debug!(target: "query", "range requested on an unsortable source");
        add_warning(
            &mut result,
            Warning::NotSortable,
            "Requested data type does not allow sorting, which makes filtering using start-stop not possible",
        );
    }

    let subjects: Option<Vec<Term>> = args.subjects.as_ref().map(|subjects| {
        subjects
            .iter()
            .map(|raw| namespaces.normalize_any(raw))
            .collect()
    });
    let columns = match (schema, &args.predicates) {
        (Some(schema), Some(predicates)) => predicate_columns(schema, namespaces, predicates),
        (Some(schema), None) => Some((0..schema.len()).collect()),
        (None, _) => None,
    };

    let notation = args.notation();
    let mut matched = 0;
    if let (Some(schema), Some(columns)) = (schema, columns) {
        let records = store.iter().filter(|record| {
            let in_range = !(sortable && args.has_range())
                || record.sort_key.is_some_and(|key| args.in_range(key));
            let subject_ok = subjects
                .as_ref()
                .is_none_or(|subjects| subjects.contains(&record.subject));
            in_range && subject_ok
        });
        for record in records {
            matched += 1;
            let mut properties = Map::new();
            for &column in &columns {
                let Some(value) = render_slot(&record.slots[column], namespaces, notation) else {
                    continue;
                };
                let predicate = &schema.slots()[column].predicate;
                properties.insert(namespaces.render(predicate, notation), value);
            }
            result.insert(
                namespaces.render(&record.subject, notation),
                Value::Object(properties),
            );
        }
    }

    if matched == 0 {
        add_warning(
            &mut result,
            Warning::NoData,
            "The resulting query has no data. Please check the values used for the location and filter arguments",
        );
    }
    Value::Object(result)
}

/// Slot indices of the requested predicates, or `None` when any of them is
/// missing from the schema.
fn predicate_columns(
    schema: &Schema,
    namespaces: &Namespaces,
    predicates: &[String],
) -> Option<Vec<usize>> {
    let mut columns = Vec::with_capacity(predicates.len());
    for raw in predicates {
        let predicate = namespaces.normalize_any(raw);
        let Some(column) = schema.slot_of(&predicate) else {
            debug!(target: "query", predicate = %raw, "requested predicate is not part of the schema");
            return None;
        };
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    columns.sort_unstable();
    Some(columns)
}

fn render_slot(slot: &Slot, namespaces: &Namespaces, notation: Notation) -> Option<Value> {
    match slot {
        Slot::Empty => None,
        Slot::One(term) => Some(render_object(term, namespaces, notation)),
        Slot::Many(terms) => Some(Value::Array(
            terms
                .iter()
                .map(|term| render_object(term, namespaces, notation))
                .collect(),
        )),
    }
}

fn render_object(term: &Term, namespaces: &Namespaces, notation: Notation) -> Value {
    match term.reasoned_value() {
        Some(reasoned) => reasoned.to_json(),
        None => json!(namespaces.render(term, notation)),
    }
}
