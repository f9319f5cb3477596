//! Two phase ingestion of an ordered triple stream into a sorted store.
//!
//! All triples of one subject must arrive contiguously. The first subject
//! fixes the predicate layout of the whole source; every following subject is
//! written into that layout and sealed into the store once the next subject
//! starts (or [`Ingestor::finish`] is called).

mod error;
mod schema;

use std::sync::Arc;

use tracing::debug;

use crate::rdf::{Namespaces, Term, Triple};
use crate::store::{BoundRecord, Slot, SortedStore};

pub(crate) use self::error::IngestError;
pub(crate) use self::schema::{Schema, SchemaSlot};

pub(crate) struct Ingestor {
    namespaces: Arc<Namespaces>,
    phase: Phase,
    open: Option<OpenRecord>,
    store: SortedStore<BoundRecord>,
}

enum Phase {
    AwaitingSchema(Discovery),
    Appending(Schema),
    Failed(IngestError),
}

/// Predicates and values of the first subject, in first-seen order.
#[derive(Default)]
struct Discovery {
    subject: Option<Term>,
    values: Vec<(Term, Slot)>,
}

struct OpenRecord {
    subject: Term,
    slots: Vec<Slot>,
}

impl Discovery {
    fn accepts(&self, subject: &Term) -> bool {
        self.subject.as_ref().is_none_or(|first| first == subject)
    }

    fn add(&mut self, triple: Triple) {
        if self.subject.is_none() {
            self.subject = Some(triple.subject);
        }
        match self.values.iter_mut().find(|(p, _)| *p == triple.predicate) {
            Some((_, slot)) => slot.push_list(triple.object),
            None => self
                .values
                .push((triple.predicate, Slot::One(triple.object))),
        }
    }
}

impl OpenRecord {
    fn seal(self, schema: &Schema) -> BoundRecord {
        BoundRecord::new(self.subject, self.slots, schema.sort_slot())
    }
}

impl Ingestor {
    pub(crate) fn new(namespaces: Arc<Namespaces>) -> Ingestor {
        Ingestor {
            namespaces,
            phase: Phase::AwaitingSchema(Discovery::default()),
            open: None,
            store: SortedStore::new(),
        }
    }

    pub(crate) fn push(&mut self, triple: Triple) -> Result<(), IngestError> {
        match &mut self.phase {
            Phase::Failed(error) => return Err(error.clone()),
            Phase::AwaitingSchema(discovery) => {
                if discovery.accepts(&triple.subject) {
                    discovery.add(triple);
                    return Ok(());
                }
                // Subject boundary, the current triple is handled by the
                // appending rules below
                self.freeze_schema()?;
            }
            Phase::Appending(_) => {}
        }

        let Phase::Appending(schema) = &self.phase else {
            return Ok(());
        };
        if let Some(done) = self.open.take_if(|open| open.subject != triple.subject) {
            self.store.insert(done.seal(schema));
        }
        let open = self.open.get_or_insert_with(|| OpenRecord {
            subject: triple.subject.clone(),
            slots: vec![Slot::Empty; schema.len()],
        });
        match schema.slot_of(&triple.predicate) {
            Some(index) if schema.slots()[index].is_list => {
                open.slots[index].push_list(triple.object);
            }
            Some(index) => open.slots[index].set_scalar(triple.object),
            None => {
                debug!(target: "ingest", predicate = %triple.predicate, "dropping predicate missing from schema");
            }
        }
        Ok(())
    }

    /// Seal the record still open at the end of a triple stream. Freezes the
    /// schema first when the stream held a single subject.
    pub(crate) fn finish(&mut self) -> Result<(), IngestError> {
        if matches!(self.phase, Phase::AwaitingSchema(_)) {
            return self.freeze_schema();
        }
        match &self.phase {
            Phase::Appending(schema) => {
                if let Some(open) = self.open.take() {
                    self.store.insert(open.seal(schema));
                }
                Ok(())
            }
            Phase::Failed(error) => Err(error.clone()),
            Phase::AwaitingSchema(_) => Ok(()),
        }
    }

    pub(crate) fn store(&self) -> &SortedStore<BoundRecord> {
        &self.store
    }

    pub(crate) fn schema(&self) -> Option<&Schema> {
        match &self.phase {
            Phase::Appending(schema) => Some(schema),
            _ => None,
        }
    }

    pub(crate) fn error(&self) -> Option<&IngestError> {
        match &self.phase {
            Phase::Failed(error) => Some(error),
            _ => None,
        }
    }

    fn freeze_schema(&mut self) -> Result<(), IngestError> {
        let discovery = match std::mem::replace(
            &mut self.phase,
            Phase::AwaitingSchema(Discovery::default()),
        ) {
            Phase::AwaitingSchema(discovery) => discovery,
            other => {
                self.phase = other;
                return Ok(());
            }
        };
        let Some(subject) = discovery.subject else {
            // nothing seen yet
            return Ok(());
        };

        let (layout, values): (Vec<_>, Vec<_>) = discovery
            .values
            .into_iter()
            .map(|(predicate, slot)| {
                let is_list = matches!(slot, Slot::Many(_));
                (SchemaSlot { predicate, is_list }, slot)
            })
            .unzip();
        match Schema::freeze(layout, &self.namespaces) {
            Ok(schema) => {
                debug!(target: "ingest", slots = schema.len(), sortable = schema.is_sortable(), "schema frozen");
                self.store
                    .insert(BoundRecord::new(subject, values, schema.sort_slot()));
                self.phase = Phase::Appending(schema);
                Ok(())
            }
            Err(error) => {
                self.phase = Phase::Failed(error.clone());
                Err(error)
            }
        }
    }
}
