//! Bulk entity deletion cleanup.

use std::thread;

use tracing::{info, warn};
use weft_proto::Ref;

use crate::error::Error;
use crate::registry::{component_table_name, AttributeKind, ModelRegistry};

use super::apply::delete_owner_links;
use super::engine::JoinStore;
use super::transaction::JoinTransaction;

/// Maximum number of owners torn down concurrently in one batch.
pub const BULK_DELETE_CONCURRENCY: usize = 100;

/// Result of a bulk deletion.
///
/// Processing stops at the first failing batch; `deleted` counts the owners
/// whose teardown committed before the failure.
#[derive(Debug)]
pub struct BulkOutcome {
    /// Owners fully torn down.
    pub deleted: usize,
    /// The error that stopped processing, if any.
    pub error: Option<Error>,
}

impl BulkOutcome {
    /// Whether every owner was torn down.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Tear down the join store state of many deleted rows of one model.
///
/// Each owner gets its own transaction: all of its link rows, its component
/// join rows, and every owned component row (recursively, with that row's
/// own links) go together. Owners are processed in batches of
/// [`BULK_DELETE_CONCURRENCY`].
pub fn delete_many(
    store: &JoinStore,
    registry: &ModelRegistry,
    model: &str,
    owners: &[Ref],
) -> BulkOutcome {
    let mut deleted = 0;

    for chunk in owners.chunks(BULK_DELETE_CONCURRENCY) {
        let results: Vec<Result<(), Error>> = thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|owner| scope.spawn(move || delete_one(store, registry, model, owner)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::Transaction("deletion worker panicked".to_string()))
                    })
                })
                .collect()
        });

        for result in results {
            match result {
                Ok(()) => deleted += 1,
                Err(error) => {
                    warn!(model, deleted, %error, "bulk deletion stopped");
                    return BulkOutcome {
                        deleted,
                        error: Some(error),
                    };
                }
            }
        }
    }

    info!(model, deleted, "bulk deletion complete");
    BulkOutcome {
        deleted,
        error: None,
    }
}

fn delete_one(
    store: &JoinStore,
    registry: &ModelRegistry,
    model: &str,
    owner: &Ref,
) -> Result<(), Error> {
    let mut tx = store.begin();
    queue_teardown(store, &mut tx, registry, model, owner)?;
    tx.commit()
}

/// Queue the full teardown of one owner: owned component rows first
/// (recursively), then every link row the owner holds.
fn queue_teardown(
    store: &JoinStore,
    tx: &mut JoinTransaction<'_>,
    registry: &ModelRegistry,
    model: &str,
    owner: &Ref,
) -> Result<(), Error> {
    if let Some(def) = registry.get_model(model) {
        let table = component_table_name(&def.collection_name);
        for attribute in &def.attributes {
            let is_component_field = matches!(
                attribute.kind,
                AttributeKind::Component { .. } | AttributeKind::DynamicZone { .. }
            );
            if !is_component_field {
                continue;
            }
            for (_, row) in store.links_for(&table, owner, &attribute.name)? {
                if let (Ref::Id(id), Some(component_type)) = (&row.target, &row.target_type) {
                    tx.delete_component_row(component_type, *id);
                    queue_teardown(store, tx, registry, component_type, &Ref::Id(*id))?;
                }
            }
        }
    }

    delete_owner_links(tx, registry, model, owner)
}
