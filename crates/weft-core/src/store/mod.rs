//! Persistent join store.
//!
//! Link rows for every pivot, morph, and component join table live in one
//! sled tree, keyed by `(table, owner, field, order)` so a prefix scan
//! yields one relation field's rows in display order. Component row markers
//! live in a second tree. Mutations are queued on a [`JoinTransaction`] and
//! committed atomically across both trees.

mod apply;
mod bulk;
mod engine;
mod key;
mod row;
mod transaction;

pub use apply::{apply_cascade_plan, apply_relation_diff, delete_owner_links, link_address, LinkAddress};
pub use bulk::{delete_many, BulkOutcome, BULK_DELETE_CONCURRENCY};
pub use engine::{JoinStore, JoinStoreConfig};
pub use key::{link_key, link_prefix, order_from_key, owner_prefix};
pub use row::LinkRow;
pub use transaction::JoinTransaction;
