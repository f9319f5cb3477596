use std::cmp::Ordering;

use crate::rdf::Term;

use super::Sortable;

/// Value held by one schema slot of a [`BoundRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum Slot {
    #[default]
    Empty,
    One(Term),
    Many(Vec<Term>),
}

impl Slot {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub(crate) fn push_list(&mut self, term: Term) {
        match self {
            Slot::Many(terms) => terms.push(term),
            Slot::Empty => *self = Slot::Many(vec![term]),
            Slot::One(first) => {
                let first = first.clone();
                *self = Slot::Many(vec![first, term]);
            }
        }
    }

    /// Scalar slots keep the first value they receive.
    pub(crate) fn set_scalar(&mut self, term: Term) {
        if self.is_empty() {
            *self = Slot::One(term);
        }
    }
}

/// A subject with its objects laid out in the slots of its source's schema.
#[derive(Debug, Clone)]
pub(crate) struct BoundRecord {
    pub(crate) subject: Term,
    pub(crate) slots: Vec<Slot>,
    pub(crate) sort_key: Option<f64>,
}

impl BoundRecord {
    /// Seal a record, caching the reasoned value of the sort slot as its key.
    pub(crate) fn new(subject: Term, slots: Vec<Slot>, sort_slot: Option<usize>) -> BoundRecord {
        let sort_key = sort_slot
            .and_then(|index| match slots.get(index) {
                Some(Slot::One(term)) => term.reasoned_value(),
                _ => None,
            })
            .map(|reasoned| reasoned.as_f64());
        BoundRecord {
            subject,
            slots,
            sort_key,
        }
    }
}

impl Sortable for BoundRecord {
    /// Records without a sort key compare equal to everything.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.sort_key, other.sort_key) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => Ordering::Equal,
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        self.sort_cmp(other) == Ordering::Equal
            && self.subject == other.subject
            && self.slots == other.slots
    }
}

#[cfg(test)]
mod tests {
    use crate::rdf::{Reasoned, Term, Transform};
    use crate::store::{Sortable, SortedStore};

    use super::{BoundRecord, Slot};

    fn record(subject: &str, key: Option<f64>) -> BoundRecord {
        let time = match key {
            Some(key) => Slot::One(Term::reasoned(
                &key.to_string(),
                Transform::Number,
                Reasoned::Number(key),
            )),
            None => Slot::Empty,
        };
        BoundRecord::new(
            Term::new(subject, None),
            vec![time, Slot::One(Term::new("v", None))],
            Some(0),
        )
    }

    #[test]
    fn sort_key_comes_from_sort_slot() {
        assert_eq!(record("s", Some(3.0)).sort_key, Some(3.0));
        assert_eq!(record("s", None).sort_key, None);
        let unsorted = BoundRecord::new(Term::new("s", None), vec![Slot::Empty], None);
        assert_eq!(unsorted.sort_key, None);
    }

    #[test]
    fn content_equality_is_elementwise() {
        let a = record("s", Some(1.0));
        assert!(a.same_content(&record("s", Some(1.0))));
        assert!(!a.same_content(&record("t", Some(1.0))));
        assert!(!a.same_content(&record("s", Some(2.0))));
        let mut b = record("s", Some(1.0));
        b.slots[1].push_list(Term::new("w", None));
        assert!(!a.same_content(&b));
    }

    #[test]
    fn store_orders_records_by_key() {
        let store: SortedStore<_> = [3.0, 1.0, 2.0]
            .into_iter()
            .map(|k| record(&format!("s{k}"), Some(k)))
            .collect();
        let subjects: Vec<_> = store.iter().map(|r| r.subject.value().to_string()).collect();
        assert_eq!(subjects, vec!["s1", "s2", "s3"]);
        assert!(store.contains(&record("s2", Some(2.0))));
    }

    #[test]
    fn slots_promote_and_keep_first_scalar() {
        let mut slot = Slot::Empty;
        slot.set_scalar(Term::new("a", None));
        slot.set_scalar(Term::new("b", None));
        assert_eq!(slot, Slot::One(Term::new("a", None)));
        slot.push_list(Term::new("c", None));
        assert_eq!(
            slot,
            Slot::Many(vec![Term::new("a", None), Term::new("c", None)])
        );
    }
}
