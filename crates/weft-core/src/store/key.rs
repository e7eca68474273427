//! Link key encoding.
//!
//! A link key is a sequence of length-prefixed segments followed by a
//! big-endian order value:
//!
//! ```text
//! [len][table] [len][owner ref] [len][field] [order: u64 BE]
//! ```
//!
//! Segment lengths are 2-byte big-endian, so keys for one `(table, owner,
//! field)` triple are contiguous and sort by order.

use weft_proto::Ref;

/// Tag byte for an id reference.
const REF_ID_TAG: u8 = 0;

/// Tag byte for a key reference.
const REF_KEY_TAG: u8 = 1;

/// Tag byte for a collection-scoped reference.
const REF_TYPED_TAG: u8 = 2;

fn push_segment(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn encode_ref(reference: &Ref) -> Vec<u8> {
    match reference {
        Ref::Id(id) => {
            let mut bytes = Vec::with_capacity(9);
            bytes.push(REF_ID_TAG);
            bytes.extend_from_slice(&id.to_be_bytes());
            bytes
        }
        Ref::Key(key) => {
            let mut bytes = Vec::with_capacity(1 + key.len());
            bytes.push(REF_KEY_TAG);
            bytes.extend_from_slice(key.as_bytes());
            bytes
        }
        Ref::Typed { id, kind } => {
            let mut bytes = Vec::with_capacity(11 + kind.len());
            bytes.push(REF_TYPED_TAG);
            bytes.extend_from_slice(&(kind.len() as u16).to_be_bytes());
            bytes.extend_from_slice(kind.as_bytes());
            bytes.extend_from_slice(&id.to_be_bytes());
            bytes
        }
    }
}

/// Prefix covering every link row owned by one row of a logical table.
pub fn owner_prefix(table: &str, owner: &Ref) -> Vec<u8> {
    let mut buf = Vec::with_capacity(table.len() + 16);
    push_segment(&mut buf, table.as_bytes());
    push_segment(&mut buf, &encode_ref(owner));
    buf
}

/// Prefix covering one relation field's link rows.
pub fn link_prefix(table: &str, owner: &Ref, field: &str) -> Vec<u8> {
    let mut buf = owner_prefix(table, owner);
    push_segment(&mut buf, field.as_bytes());
    buf
}

/// Full key for one link row at a given order value.
pub fn link_key(table: &str, owner: &Ref, field: &str, order: u64) -> Vec<u8> {
    let mut buf = link_prefix(table, owner, field);
    buf.extend_from_slice(&order.to_be_bytes());
    buf
}

/// Extract the order value from a full link key.
pub fn order_from_key(key: &[u8]) -> Option<u64> {
    if key.len() < 8 {
        return None;
    }
    let mut order = [0u8; 8];
    order.copy_from_slice(&key[key.len() - 8..]);
    Some(u64::from_be_bytes(order))
}

/// Key for a component row marker: `(component type, id)`.
pub fn component_key(component_type: &str, id: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(component_type.len() + 10);
    push_segment(&mut buf, component_type.as_bytes());
    buf.extend_from_slice(&id.to_be_bytes());
    buf
}
