//! The join store engine wrapping sled.

use std::path::PathBuf;

use sled::{Db, Tree};
use tracing::info;
use weft_proto::Ref;

use crate::error::Error;

use super::key::{self, component_key};
use super::row::LinkRow;
use super::transaction::JoinTransaction;

/// Tree name for link rows.
const LINKS_TREE: &str = "links";

/// Tree name for component row markers.
const COMPONENTS_TREE: &str = "components";

/// Configuration for the join store.
#[derive(Debug, Clone)]
pub struct JoinStoreConfig {
    /// Path to the database directory.
    pub path: PathBuf,
    /// Page cache capacity in bytes.
    pub cache_capacity: u64,
    /// Flush interval in milliseconds. None means flush on every write.
    pub flush_every_ms: Option<u64>,
    /// Enable zstd compression.
    pub compression: bool,
    /// Temporary database (deleted on drop).
    pub temporary: bool,
}

impl Default for JoinStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./weft_data"),
            cache_capacity: 256 * 1024 * 1024,
            flush_every_ms: Some(1000),
            compression: true,
            temporary: false,
        }
    }
}

impl JoinStoreConfig {
    /// Convert to a sled configuration.
    fn to_sled_config(&self) -> sled::Config {
        sled::Config::new()
            .path(&self.path)
            .cache_capacity(self.cache_capacity)
            .flush_every_ms(self.flush_every_ms)
            .use_compression(self.compression)
            .temporary(self.temporary)
    }
}

/// The persistent join store.
pub struct JoinStore {
    db: Db,
    links: Tree,
    components: Tree,
}

impl JoinStore {
    /// Open or create a join store with the given configuration.
    pub fn open(config: JoinStoreConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let links = db.open_tree(LINKS_TREE)?;
        let components = db.open_tree(COMPONENTS_TREE)?;

        info!(path = %config.path.display(), "join store opened");

        Ok(Self {
            db,
            links,
            components,
        })
    }

    /// Open a temporary store, deleted on drop.
    pub fn temporary() -> Result<Self, Error> {
        Self::open(JoinStoreConfig {
            temporary: true,
            ..Default::default()
        })
    }

    /// Check if the database was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Allocate a fresh component row id.
    pub fn generate_id(&self) -> Result<i64, Error> {
        // sled ids start at 0; shift so 0 never appears as a row id
        Ok(self.db.generate_id()? as i64 + 1)
    }

    /// One relation field's link rows, ascending by order value.
    pub fn links_for(
        &self,
        table: &str,
        owner: &Ref,
        field: &str,
    ) -> Result<Vec<(u64, LinkRow)>, Error> {
        let prefix = key::link_prefix(table, owner, field);
        let mut rows = Vec::new();
        for entry in self.links.scan_prefix(&prefix) {
            let (key_bytes, value) = entry?;
            let order = key::order_from_key(&key_bytes)
                .ok_or_else(|| Error::Deserialization("truncated link key".to_string()))?;
            rows.push((order, LinkRow::from_bytes(&value)?));
        }
        Ok(rows)
    }

    /// One relation field's current ordered state, targets only.
    pub fn refs_for(&self, table: &str, owner: &Ref, field: &str) -> Result<Vec<Ref>, Error> {
        Ok(self
            .links_for(table, owner, field)?
            .into_iter()
            .map(|(_, row)| row.target)
            .collect())
    }

    /// Number of link rows on one relation field.
    pub fn count_links(&self, table: &str, owner: &Ref, field: &str) -> Result<usize, Error> {
        Ok(self.links.scan_prefix(key::link_prefix(table, owner, field)).count())
    }

    /// Highest order value on one relation field, if any rows exist.
    pub fn max_order(&self, table: &str, owner: &Ref, field: &str) -> Result<Option<u64>, Error> {
        let prefix = key::link_prefix(table, owner, field);
        match self.links.scan_prefix(&prefix).last() {
            Some(entry) => {
                let (key_bytes, _) = entry?;
                Ok(key::order_from_key(&key_bytes))
            }
            None => Ok(None),
        }
    }

    /// Every link key owned by one row of a logical table, across fields.
    pub(crate) fn keys_for_owner(&self, table: &str, owner: &Ref) -> Result<Vec<Vec<u8>>, Error> {
        let prefix = key::owner_prefix(table, owner);
        let mut keys = Vec::new();
        for entry in self.links.scan_prefix(&prefix) {
            let (key_bytes, _) = entry?;
            keys.push(key_bytes.to_vec());
        }
        Ok(keys)
    }

    /// Check whether a component row marker exists.
    pub fn component_exists(&self, component_type: &str, id: i64) -> Result<bool, Error> {
        Ok(self
            .components
            .contains_key(component_key(component_type, id))?)
    }

    /// Begin a transaction over both trees.
    pub fn begin(&self) -> JoinTransaction<'_> {
        JoinTransaction::new(self)
    }

    /// Flush dirty buffers to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.links.flush()?;
        self.components.flush()?;
        Ok(())
    }

    pub(crate) fn links_tree(&self) -> &Tree {
        &self.links
    }

    pub(crate) fn components_tree(&self) -> &Tree {
        &self.components
    }
}
