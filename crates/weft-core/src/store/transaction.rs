//! Atomic multi-row mutations.
//!
//! Mutations are queued against a snapshot of the trees and executed in one
//! sled transaction on commit: deletes first, then inserts, so a reorder
//! that reuses an order slot lands correctly.

use sled::transaction::ConflictableTransactionError;
use sled::Transactional;
use tracing::trace;
use weft_proto::Ref;

use crate::error::Error;

use super::engine::JoinStore;
use super::key::{self, component_key};
use super::row::LinkRow;

/// A queued set of join store mutations, committed atomically.
pub struct JoinTransaction<'a> {
    store: &'a JoinStore,
    link_inserts: Vec<(Vec<u8>, LinkRow)>,
    link_deletes: Vec<Vec<u8>>,
    component_puts: Vec<Vec<u8>>,
    component_deletes: Vec<Vec<u8>>,
}

impl<'a> JoinTransaction<'a> {
    pub(crate) fn new(store: &'a JoinStore) -> Self {
        Self {
            store,
            link_inserts: Vec::new(),
            link_deletes: Vec::new(),
            component_puts: Vec::new(),
            component_deletes: Vec::new(),
        }
    }

    /// Queue a link row write at an explicit order value.
    pub fn insert_link(
        &mut self,
        table: &str,
        owner: &Ref,
        field: &str,
        order: u64,
        row: LinkRow,
    ) -> &mut Self {
        self.link_inserts
            .push((key::link_key(table, owner, field, order), row));
        self
    }

    /// Queue removal of every link row on a field pointing at a target.
    ///
    /// Resolution scans the committed state; a target that is not linked
    /// queues nothing.
    pub fn delete_link_by_target(
        &mut self,
        table: &str,
        owner: &Ref,
        field: &str,
        target: &Ref,
    ) -> Result<&mut Self, Error> {
        for (order, row) in self.store.links_for(table, owner, field)? {
            if row.target == *target {
                self.link_deletes
                    .push(key::link_key(table, owner, field, order));
            }
        }
        Ok(self)
    }

    /// Queue removal of every link row on one relation field.
    pub fn clear_field(&mut self, table: &str, owner: &Ref, field: &str) -> Result<&mut Self, Error> {
        for (order, _) in self.store.links_for(table, owner, field)? {
            self.link_deletes
                .push(key::link_key(table, owner, field, order));
        }
        Ok(self)
    }

    /// Queue removal of every link row owned by a row, across all fields of
    /// one logical table.
    pub fn clear_owner(&mut self, table: &str, owner: &Ref) -> Result<&mut Self, Error> {
        self.link_deletes
            .extend(self.store.keys_for_owner(table, owner)?);
        Ok(self)
    }

    /// Queue a component row marker write.
    pub fn put_component_row(&mut self, component_type: &str, id: i64) -> &mut Self {
        self.component_puts.push(component_key(component_type, id));
        self
    }

    /// Queue a component row marker removal.
    pub fn delete_component_row(&mut self, component_type: &str, id: i64) -> &mut Self {
        self.component_deletes
            .push(component_key(component_type, id));
        self
    }

    /// Number of queued mutations.
    pub fn pending(&self) -> usize {
        self.link_inserts.len()
            + self.link_deletes.len()
            + self.component_puts.len()
            + self.component_deletes.len()
    }

    /// Commit all queued mutations atomically across both trees.
    pub fn commit(self) -> Result<(), Error> {
        if self.pending() == 0 {
            return Ok(());
        }

        trace!(
            inserts = self.link_inserts.len(),
            deletes = self.link_deletes.len(),
            "committing join transaction"
        );

        let links = self.store.links_tree();
        let components = self.store.components_tree();

        let result: Result<(), sled::transaction::TransactionError<Error>> =
            (links, components).transaction(|(links_tx, components_tx)| {
                for key_bytes in &self.link_deletes {
                    links_tx.remove(key_bytes.clone())?;
                }
                for (key_bytes, row) in &self.link_inserts {
                    let value = row
                        .to_bytes()
                        .map_err(ConflictableTransactionError::Abort)?;
                    links_tx.insert(key_bytes.clone(), value)?;
                }
                for key_bytes in &self.component_deletes {
                    components_tx.remove(key_bytes.clone())?;
                }
                for key_bytes in &self.component_puts {
                    components_tx.insert(key_bytes.clone(), &[] as &[u8])?;
                }
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(sled::transaction::TransactionError::Abort(e)) => Err(e),
            Err(sled::transaction::TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }

    /// Discard all queued mutations.
    pub fn rollback(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_applies_all_or_nothing() {
        let store = JoinStore::temporary().unwrap();
        let owner = Ref::Id(1);

        let mut tx = store.begin();
        tx.insert_link("t", &owner, "f", 1, LinkRow::new(10i64));
        tx.insert_link("t", &owner, "f", 2, LinkRow::new(20i64));
        assert_eq!(tx.pending(), 2);
        tx.commit().unwrap();

        assert_eq!(
            store.refs_for("t", &owner, "f").unwrap(),
            vec![Ref::Id(10), Ref::Id(20)]
        );
    }

    #[test]
    fn test_rollback_discards_queued_ops() {
        let store = JoinStore::temporary().unwrap();
        let owner = Ref::Id(1);

        let mut tx = store.begin();
        tx.insert_link("t", &owner, "f", 1, LinkRow::new(10i64));
        tx.rollback();

        assert!(store.refs_for("t", &owner, "f").unwrap().is_empty());
    }

    #[test]
    fn test_deletes_run_before_inserts() {
        let store = JoinStore::temporary().unwrap();
        let owner = Ref::Id(1);

        let mut tx = store.begin();
        tx.insert_link("t", &owner, "f", 1, LinkRow::new(10i64));
        tx.insert_link("t", &owner, "f", 2, LinkRow::new(20i64));
        tx.commit().unwrap();

        // swap the two rows: both old keys deleted, both slots rewritten
        let mut tx = store.begin();
        tx.delete_link_by_target("t", &owner, "f", &Ref::Id(10)).unwrap();
        tx.delete_link_by_target("t", &owner, "f", &Ref::Id(20)).unwrap();
        tx.insert_link("t", &owner, "f", 1, LinkRow::new(20i64));
        tx.insert_link("t", &owner, "f", 2, LinkRow::new(10i64));
        tx.commit().unwrap();

        assert_eq!(
            store.refs_for("t", &owner, "f").unwrap(),
            vec![Ref::Id(20), Ref::Id(10)]
        );
    }

    #[test]
    fn test_clear_field_and_owner() {
        let store = JoinStore::temporary().unwrap();
        let owner = Ref::Id(1);

        let mut tx = store.begin();
        tx.insert_link("t", &owner, "a", 1, LinkRow::new(10i64));
        tx.insert_link("t", &owner, "b", 1, LinkRow::new(20i64));
        tx.commit().unwrap();

        let mut tx = store.begin();
        tx.clear_field("t", &owner, "a").unwrap();
        tx.commit().unwrap();
        assert!(store.refs_for("t", &owner, "a").unwrap().is_empty());
        assert_eq!(store.refs_for("t", &owner, "b").unwrap(), vec![Ref::Id(20)]);

        let mut tx = store.begin();
        tx.clear_owner("t", &owner).unwrap();
        tx.commit().unwrap();
        assert!(store.refs_for("t", &owner, "b").unwrap().is_empty());
    }
}
