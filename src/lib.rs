//! # twohash
//!
//! Two in-memory hash tables with unusual collision handling:
//!
//! - [`DoubleKeyTable`]: keyed by a pair `(K1, K2)`. `K1` picks a top-level slot
//!   by linear probing, and that slot owns a second linear-probe table keyed by
//!   `K2`. Leaves grow independently; the top level rehashes as a whole.
//! - [`TrieHashTable`]: keyed by strings. Buckets of 27 slots are indexed one
//!   character per level, and a bucket only gets a child where two keys collide,
//!   so the table deepens locally instead of ever being resized.
//!
//! ## Example
//!
//! ```rust
//! use twohash::{DoubleKeyTable, TableError, TrieHashTable};
//!
//! let mut routes: DoubleKeyTable<&str, &str, u32> = DoubleKeyTable::new();
//! routes.set("cat", "a", 1).unwrap();
//! routes.set("cat", "b", 2).unwrap();
//! assert_eq!(routes.get(&"cat", &"b"), Ok(&2));
//! assert_eq!(routes.keys_of(&"cat").count(), 2);
//!
//! let mut trie: TrieHashTable<u32> = TrieHashTable::new();
//! trie.set("ab", 1).unwrap();
//! trie.set("ac", 2).unwrap();
//! assert_eq!(trie.get_location("ab").map(|p| p.len()), Ok(2));
//! assert_eq!(trie.delete("zz"), Err(TableError::KeyNotFound));
//! ```

#![deny(unsafe_code)]

pub mod double_key;
mod error;
pub mod hash;
pub mod probe;
pub mod trie;

pub use double_key::{DoubleKeyTable, TableConfig};
pub use error::TableError;
pub use hash::PolyHash;
pub use probe::LinearProbeTable;
pub use trie::TrieHashTable;

#[cfg(test)]
mod proptests;
