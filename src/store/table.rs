use std::collections::HashMap;

use serde::Serialize;

use super::Upsert;
use crate::domain::AssetId;

/// Result of a single upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub id: AssetId,
    pub inserted: bool,
}

/// A row that has been merged against the table but not stored yet.
///
/// Writers fill derived fields on `row` between `stage` and `commit`, which
/// lets resolvers read the rest of the store while the row is in flight.
#[derive(Debug, Clone)]
pub struct Staged<T> {
    pub row: T,
    inserted: bool,
}

/// Rows of one asset type, unique by business key, in ascending id order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<T> {
    rows: Vec<T>,
    by_key: HashMap<String, usize>,
    next_id: AssetId,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            by_key: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Upsert> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.rows.iter_mut()
    }

    pub fn get(&self, id: AssetId) -> Option<&T> {
        self.position(id).map(|pos| &self.rows[pos])
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut T> {
        self.position(id).map(move |pos| &mut self.rows[pos])
    }

    pub fn get_by_key(&self, key: &str) -> Option<&T> {
        self.by_key.get(key).map(|&pos| &self.rows[pos])
    }

    pub fn get_by_key_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.by_key.get(key) {
            Some(&pos) => Some(&mut self.rows[pos]),
            None => None,
        }
    }

    /// Candidate with the lowest id among those matching `pred`.
    ///
    /// This is the tie-break for every spatial lookup: when several rows satisfy
    /// a predicate the oldest one wins, regardless of storage order.
    pub fn first_match(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.rows.iter().filter(|r| pred(r)).min_by_key(|r| r.id())
    }

    /// Merges `incoming` against the current row for its key without storing it.
    pub fn stage(&self, incoming: T) -> Staged<T> {
        match self.by_key.get(incoming.business_key()) {
            Some(&pos) => {
                let mut row = self.rows[pos].clone();
                row.merge_from(incoming);
                Staged {
                    row,
                    inserted: false,
                }
            }
            None => {
                let mut row = incoming;
                row.set_id(self.next_id);
                Staged {
                    row,
                    inserted: true,
                }
            }
        }
    }

    pub fn commit(&mut self, staged: Staged<T>) -> UpsertOutcome {
        let Staged { row, inserted } = staged;
        let id = row.id();
        match self.by_key.get(row.business_key()) {
            Some(&pos) => self.rows[pos] = row,
            None => {
                self.by_key.insert(row.business_key().to_string(), self.rows.len());
                self.rows.push(row);
                self.next_id = self.next_id.max(id + 1);
            }
        }
        UpsertOutcome { id, inserted }
    }

    /// Insert-or-overwrite by business key.
    pub fn upsert(&mut self, incoming: T) -> UpsertOutcome {
        let staged = self.stage(incoming);
        self.commit(staged)
    }

    fn position(&self, id: AssetId) -> Option<usize> {
        self.rows.binary_search_by_key(&id, |r| r.id()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransformerType;

    fn kva(name: &str, rating: Option<f64>) -> TransformerType {
        TransformerType {
            id: 0,
            name: name.to_string(),
            kva_rating: rating,
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut table = Table::new();
        let a = table.upsert(kva("A 10", Some(10.0)));
        let b = table.upsert(kva("B 15", Some(15.0)));
        assert_eq!(a, UpsertOutcome { id: 1, inserted: true });
        assert_eq!(b, UpsertOutcome { id: 2, inserted: true });
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_upsert_overwrites_but_keeps_id_and_key() {
        let mut table = Table::new();
        table.upsert(kva("A 10", Some(10.0)));
        let again = table.upsert(kva("A 10", Some(12.5)));
        assert_eq!(again, UpsertOutcome { id: 1, inserted: false });
        assert_eq!(table.len(), 1);
        let row = table.get_by_key("A 10").unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(row.kva_rating, Some(12.5));
    }

    #[test]
    fn test_repeated_upsert_is_idempotent() {
        let mut table = Table::new();
        table.upsert(kva("A 10", Some(10.0)));
        table.upsert(kva("B 15", Some(15.0)));
        let before = table.clone();
        table.upsert(kva("A 10", Some(10.0)));
        table.upsert(kva("B 15", Some(15.0)));
        assert_eq!(table, before);
    }

    #[test]
    fn test_first_match_prefers_lowest_id() {
        let mut table = Table::new();
        table.upsert(kva("A 10", Some(10.0)));
        table.upsert(kva("B 10", Some(10.0)));
        let hit = table.first_match(|t| t.kva_rating == Some(10.0)).unwrap();
        assert_eq!(hit.name, "A 10");
        assert!(table.first_match(|t| t.kva_rating == Some(99.0)).is_none());
    }

    #[test]
    fn test_get_by_id() {
        let mut table = Table::new();
        table.upsert(kva("A 10", None));
        table.upsert(kva("B 15", None));
        assert_eq!(table.get(2).unwrap().name, "B 15");
        assert!(table.get(3).is_none());
    }
}
