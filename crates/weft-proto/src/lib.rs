//! Weft protocol types.
//!
//! This crate defines the data types that cross the REST boundary of the
//! weft content engine: relation operation sets (connect/disconnect/set with
//! positional hints), filter/sort/pagination specifications, and component
//! payloads for repeatable components and dynamic zones.
//!
//! # Modules
//!
//! - [`value`] - Runtime values and relation target references
//! - [`relation`] - Relation mutation operation sets
//! - [`filter`] - Filter, sort, and pagination specifications
//! - [`component`] - Component and dynamic zone payloads
//!
//! # Serialization
//!
//! All types derive `serde::Serialize`/`Deserialize` matching the documented
//! JSON body shape, e.g.:
//!
//! ```json
//! { "connect": [{ "id": 1, "position": { "before": 2 } }],
//!   "disconnect": [{ "id": 3 }],
//!   "options": { "strict": false } }
//! ```
//!
//! Types that end up embedded in persisted join rows ([`Ref`]) additionally
//! derive `rkyv::Archive`/`Serialize`/`Deserialize`.

pub mod component;
pub mod error;
pub mod filter;
pub mod relation;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use component::{ClientCorrelationId, ComponentEntry};
pub use filter::{
    FilterSpec, FilterValue, Operator, OrderDirection, PublicationState, SortSpec, WhereClause,
};
pub use relation::{Connect, OperationOptions, Position, RelationOperationSet, RelationRef};
pub use value::{Ref, Value};
