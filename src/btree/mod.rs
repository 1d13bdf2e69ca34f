//! Static B+Tree index over sorted 64-bit sequence-number keys.
//!
//! The tree is built once, bottom-up, from a fully sorted stream of
//! `(key, offset, size)` triples — it never mutates after construction.
//! `BTreeReader` performs read-only binary-search descents over an mmap
//! slice, so point lookups never copy node bytes.
//!
//! # Node layout (4 KiB, little-endian)
//!
//! ```text
//! node_type(1)   0 = internal, 1 = leaf
//! key_count(2)
//! level(1)
//! reserved(28)
//! keys[key_count] of 8 bytes each
//! pointers[key_count]:
//!   internal: child_offset(8)
//!   leaf:     data_offset(8), data_size(4)
//! padding to 4096
//! ```


use thiserror::Error;

/// Fixed node size in bytes.
pub const NODE_SIZE: usize = 4096;
const NODE_HEADER_SIZE: usize = 32;
const KEY_SIZE: usize = 8;
const INTERNAL_POINTER_SIZE: usize = 8;
const LEAF_POINTER_SIZE: usize = 12;

const NODE_TYPE_INTERNAL: u8 = 0;
const NODE_TYPE_LEAF: u8 = 1;

/// Errors raised while building or reading a B+Tree index region.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BTreeError {
    /// A node offset or in-node pointer fell outside the backing buffer.
    #[error("offset {0} out of bounds")]
    OutOfBounds(usize),

    /// A node's `node_type` byte was neither 0 nor 1, or another structural
    /// invariant was violated.
    #[error("corrupt node at offset {0}: {1}")]
    Corruption(usize, &'static str),

    /// The builder was given zero entries — there is no tree to build.
    #[error("cannot build a B+Tree from an empty entry stream")]
    EmptyInput,
}

/// One leaf-level entry: a key plus the (offset, size) of its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    pub key: i64,
    pub data_offset: u64,
    pub data_size: u32,
}

/// Builds a static B+Tree bottom-up from a stream of already-sorted leaf
/// entries and serializes it into 4 KiB nodes.
pub struct BTreeBuilder {
    entries: Vec<LeafEntry>,
}

impl BTreeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Appends one leaf entry. Callers must supply entries in ascending key
    /// order; this is the writer's responsibility (rows are fed in seq
    /// order), not re-validated here.
    pub fn push(&mut self, key: i64, data_offset: u64, data_size: u32) {
        self.entries.push(LeafEntry { key, data_offset, data_size });
    }

    /// `true` if no entries have been pushed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leaf entries accumulated so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The smallest key pushed, if any.
    pub fn min_key(&self) -> Option<i64> {
        self.entries.first().map(|e| e.key)
    }

    /// The largest key pushed, if any.
    pub fn max_key(&self) -> Option<i64> {
        self.entries.last().map(|e| e.key)
    }

    /// A worst-case upper bound on the number of bytes the built tree will
    /// occupy, used by the SSTable writer to size its index region
    /// reservation before any data has been written.
    pub fn estimate_size(row_count: usize) -> usize {
        if row_count == 0 {
            return NODE_SIZE;
        }
        let leaf_capacity = leaf_entries_per_node();
        let mut nodes = row_count.div_ceil(leaf_capacity).max(1);
        let mut level_count = nodes;
        let internal_capacity = internal_entries_per_node();
        while level_count > 1 {
            level_count = level_count.div_ceil(internal_capacity).max(1);
            nodes += level_count;
            if level_count == 1 {
                break;
            }
        }
        (nodes.max(1)) * NODE_SIZE
    }

    /// Serializes the tree bottom-up into `out`, writing nodes at
    /// `base_offset + out.len()`. Returns the root node's absolute offset.
    pub fn build(self, base_offset: u64, out: &mut Vec<u8>) -> Result<u64, BTreeError> {
        if self.entries.is_empty() {
            return Err(BTreeError::EmptyInput);
        }

        let leaf_capacity = leaf_entries_per_node();
        let mut level_keys: Vec<i64> = Vec::new();
        let mut level_offsets: Vec<u64> = Vec::new();

        for chunk in self.entries.chunks(leaf_capacity) {
            let offset = base_offset + out.len() as u64;
            write_leaf_node(out, chunk);
            level_keys.push(chunk[0].key);
            level_offsets.push(offset);
        }

        let internal_capacity = internal_entries_per_node();
        let mut level: u8 = 0;
        while level_offsets.len() > 1 {
            level += 1;
            let mut next_keys = Vec::new();
            let mut next_offsets = Vec::new();

            for (key_chunk, offset_chunk) in level_keys
                .chunks(internal_capacity)
                .zip(level_offsets.chunks(internal_capacity))
            {
                let offset = base_offset + out.len() as u64;
                write_internal_node(out, key_chunk, offset_chunk, level);
                next_keys.push(key_chunk[0]);
                next_offsets.push(offset);
            }

            level_keys = next_keys;
            level_offsets = next_offsets;
        }

        Ok(level_offsets[0])
    }
}

impl Default for BTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn leaf_entries_per_node() -> usize {
    (NODE_SIZE - NODE_HEADER_SIZE) / (KEY_SIZE + LEAF_POINTER_SIZE)
}

fn internal_entries_per_node() -> usize {
    (NODE_SIZE - NODE_HEADER_SIZE) / (KEY_SIZE + INTERNAL_POINTER_SIZE)
}

fn write_leaf_node(out: &mut Vec<u8>, entries: &[LeafEntry]) {
    let start = out.len();
    out.resize(start + NODE_SIZE, 0);
    let node = &mut out[start..start + NODE_SIZE];

    node[0] = NODE_TYPE_LEAF;
    node[1..3].copy_from_slice(&(entries.len() as u16).to_le_bytes());
    node[3] = 0; // leaves are always level 0

    let mut off = NODE_HEADER_SIZE;
    for entry in entries {
        node[off..off + 8].copy_from_slice(&entry.key.to_le_bytes());
        off += 8;
    }
    for entry in entries {
        node[off..off + 8].copy_from_slice(&entry.data_offset.to_le_bytes());
        off += 8;
        node[off..off + 4].copy_from_slice(&entry.data_size.to_le_bytes());
        off += 4;
    }
}

fn write_internal_node(out: &mut Vec<u8>, keys: &[i64], children: &[u64], level: u8) {
    let start = out.len();
    out.resize(start + NODE_SIZE, 0);
    let node = &mut out[start..start + NODE_SIZE];

    node[0] = NODE_TYPE_INTERNAL;
    node[1..3].copy_from_slice(&(keys.len() as u16).to_le_bytes());
    node[3] = level;

    let mut off = NODE_HEADER_SIZE;
    for key in keys {
        node[off..off + 8].copy_from_slice(&key.to_le_bytes());
        off += 8;
    }
    for child in children {
        node[off..off + 8].copy_from_slice(&child.to_le_bytes());
        off += 8;
    }
}

/// Read-only B+Tree descent over a byte slice (typically an mmap).
pub struct BTreeReader<'a> {
    data: &'a [u8],
    root_offset: u64,
}

impl<'a> BTreeReader<'a> {
    /// Wraps `data` (the whole file, or at least the whole index region plus
    /// its base offset) rooted at `root_offset`.
    pub fn new(data: &'a [u8], root_offset: u64) -> Self {
        Self { data, root_offset }
    }

    /// Finds `key`, returning `(data_offset, data_size)` on a leaf hit.
    pub fn get(&self, key: i64) -> Result<Option<(u64, u32)>, BTreeError> {
        let mut offset = self.root_offset;
        loop {
            let node = self.node_at(offset)?;
            match node {
                Node::Internal { keys, children, .. } => {
                    let idx = match keys.binary_search(&key) {
                        Ok(i) => i,
                        Err(0) => 0,
                        Err(i) => i - 1,
                    };
                    offset = children[idx];
                }
                Node::Leaf { keys, pointers } => {
                    return Ok(keys
                        .binary_search(&key)
                        .ok()
                        .map(|i| pointers[i]));
                }
            }
        }
    }

    /// Returns every leaf key in ascending order (used by compaction to
    /// enumerate a file's full key set without decoding row bodies).
    pub fn get_all_keys(&self) -> Result<Vec<i64>, BTreeError> {
        let mut keys = Vec::new();
        self.collect_leaf_keys(self.root_offset, &mut keys)?;
        Ok(keys)
    }

    fn collect_leaf_keys(&self, offset: u64, out: &mut Vec<i64>) -> Result<(), BTreeError> {
        match self.node_at(offset)? {
            Node::Internal { children, .. } => {
                for child in children {
                    self.collect_leaf_keys(child, out)?;
                }
                Ok(())
            }
            Node::Leaf { keys, .. } => {
                out.extend(keys);
                Ok(())
            }
        }
    }

    fn node_at(&self, offset: u64) -> Result<Node, BTreeError> {
        let start = usize::try_from(offset).map_err(|_| BTreeError::OutOfBounds(offset as usize))?;
        let end = start
            .checked_add(NODE_SIZE)
            .ok_or(BTreeError::OutOfBounds(start))?;
        let node = self
            .data
            .get(start..end)
            .ok_or(BTreeError::OutOfBounds(start))?;

        let node_type = node[0];
        let key_count = u16::from_le_bytes([node[1], node[2]]) as usize;
        let level = node[3];

        let mut off = NODE_HEADER_SIZE;
        let mut keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            keys.push(i64::from_le_bytes(node[off..off + 8].try_into().unwrap()));
            off += 8;
        }

        match node_type {
            NODE_TYPE_INTERNAL => {
                let mut children = Vec::with_capacity(key_count);
                for _ in 0..key_count {
                    children.push(u64::from_le_bytes(node[off..off + 8].try_into().unwrap()));
                    off += 8;
                }
                Ok(Node::Internal { keys, children, _level: level })
            }
            NODE_TYPE_LEAF => {
                let mut pointers = Vec::with_capacity(key_count);
                for _ in 0..key_count {
                    let data_offset = u64::from_le_bytes(node[off..off + 8].try_into().unwrap());
                    off += 8;
                    let data_size = u32::from_le_bytes(node[off..off + 4].try_into().unwrap());
                    off += 4;
                    pointers.push((data_offset, data_size));
                }
                Ok(Node::Leaf { keys, pointers })
            }
            _ => Err(BTreeError::Corruption(start, "unrecognized node_type")),
        }
    }
}

enum Node {
    Internal { keys: Vec<i64>, children: Vec<u64>, _level: u8 },
    Leaf { keys: Vec<i64>, pointers: Vec<(u64, u32)> },
}
