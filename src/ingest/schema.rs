use std::collections::HashMap;

use crate::rdf::{Namespaces, Notation, Term};

use super::IngestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SchemaSlot {
    pub(crate) predicate: Term,
    pub(crate) is_list: bool,
}

/// Fixed predicate layout of one source, discovered from its first subject.
#[derive(Debug, Clone, Default)]
pub(crate) struct Schema {
    slots: Vec<SchemaSlot>,
    index: HashMap<Term, usize>,
    sort_slot: Option<usize>,
}

impl Schema {
    /// Assign every predicate the slot of its first-seen position and locate
    /// the sort predicate. A list valued sort predicate is rejected.
    pub(crate) fn freeze(
        slots: Vec<SchemaSlot>,
        namespaces: &Namespaces,
    ) -> Result<Schema, IngestError> {
        let mut sort_slot = None;
        if let Some(index) = slots
            .iter()
            .position(|slot| namespaces.is_sort_predicate(&slot.predicate))
        {
            if slots[index].is_list {
                return Err(IngestError::SortPredicateIsList {
                    predicate: namespaces.render(&slots[index].predicate, Notation::Compact),
                });
            }
            sort_slot = Some(index);
        }
        let index = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.predicate.clone(), i))
            .collect();
        Ok(Schema {
            slots,
            index,
            sort_slot,
        })
    }

    pub(crate) fn slot_of(&self, predicate: &Term) -> Option<usize> {
        self.index.get(predicate).copied()
    }

    pub(crate) fn slots(&self) -> &[SchemaSlot] {
        &self.slots
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn sort_slot(&self) -> Option<usize> {
        self.sort_slot
    }

    pub(crate) fn is_sortable(&self) -> bool {
        self.sort_slot.is_some()
    }
}
