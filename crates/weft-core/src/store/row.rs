//! Stored link row type.

use rkyv::{Archive, Deserialize, Serialize};
use weft_proto::Ref;

use crate::error::Error;

/// The value stored under one link key.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct LinkRow {
    /// The linked row.
    pub target: Ref,
    /// Collection discriminator, carried for morph and component rows.
    pub target_type: Option<String>,
}

impl LinkRow {
    /// A plain link to a concrete target.
    pub fn new(target: impl Into<Ref>) -> Self {
        Self {
            target: target.into(),
            target_type: None,
        }
    }

    /// A link carrying a collection discriminator.
    pub fn typed(target: impl Into<Ref>, target_type: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            target_type: Some(target_type.into()),
        }
    }

    /// Serialize the row to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a row from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}
