//! Table alias allocation.

use std::collections::HashMap;

/// Hands out unique table aliases, one counter per base name.
///
/// The same table can be joined several times in one program (self
/// relations, diamond-shaped paths), so every join gets a fresh alias.
#[derive(Debug, Default)]
pub struct AliasAllocator {
    counters: HashMap<String, u32>,
}

impl AliasAllocator {
    /// Create an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next alias for a base table name.
    pub fn alloc(&mut self, base: &str) -> String {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        *counter += 1;
        format!("{base}_{counter}")
    }
}
