//! Hash table of fixed-size buckets that deepens instead of resizing.
//!
//! Every bucket has [`TABLE_SIZE`] slots. At level `L` a key goes to the slot
//! chosen by its `L`-th character, or to the terminal slot once the key has run
//! out of characters. A slot is empty, holds one stored key with its value, or
//! owns a child bucket for the next level.
//!
//! A stored key sits at the shallowest level that separates it from every other
//! key. When a new key lands on an occupied slot, the occupant is pushed down
//! into a fresh child bucket and both keys continue one level deeper, so chains
//! of buckets exist only along shared (hashed) prefixes. Deletion undoes this:
//! a non-root bucket left holding a single stored key is removed and the key is
//! spliced into the parent slot, repeatedly up the path.

use std::str::Chars;

use tracing::{debug, trace};

use crate::TableError;

// =============================================================================
// Configuration
// =============================================================================

/// Slots per bucket: 26 character slots plus the terminal slot.
pub const TABLE_SIZE: usize = 27;
const TERMINAL: usize = TABLE_SIZE - 1;

/// Slot index of `key` at `level`.
pub fn hash(key: &str, level: usize) -> usize {
    slot_of(key.chars().nth(level))
}

#[inline]
fn slot_of(c: Option<char>) -> usize {
    match c {
        Some(c) => c as usize % (TABLE_SIZE - 1),
        None => TERMINAL,
    }
}

/// Slot indices for the remaining characters, ending with the terminal slot.
fn slot_path(chars: impl Iterator<Item = char>) -> Vec<usize> {
    chars
        .map(Some)
        .chain(std::iter::once(None))
        .map(slot_of)
        .collect()
}

#[derive(Clone)]
pub(crate) enum Slot<V> {
    Empty,
    Leaf { key: String, value: V },
    Child(Box<Bucket<V>>),
}

impl<V> Slot<V> {
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

#[derive(Clone)]
pub(crate) struct Bucket<V> {
    pub(crate) slots: [Slot<V>; TABLE_SIZE],
    /// Non-empty slots.
    pub(crate) live: usize,
}

impl<V> Bucket<V> {
    fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::Empty),
            live: 0,
        }
    }

    fn put(&mut self, idx: usize, slot: Slot<V>) -> Slot<V> {
        if !slot.is_empty() {
            self.live += 1;
        }
        let old = std::mem::replace(&mut self.slots[idx], slot);
        if !old.is_empty() {
            self.live -= 1;
        }
        old
    }

    #[inline]
    fn take(&mut self, idx: usize) -> Slot<V> {
        self.put(idx, Slot::Empty)
    }

    /// A bucket that no longer separates anything: empty, or a lone stored key.
    fn collapsible(&self) -> bool {
        match self.live {
            0 => true,
            1 => self.slots.iter().any(|s| matches!(s, Slot::Leaf { .. })),
            _ => false,
        }
    }

    /// Removes and returns the only occupied slot (or `Empty`).
    fn take_sole(&mut self) -> Slot<V> {
        match self.slots.iter().position(|s| !s.is_empty()) {
            Some(idx) => self.take(idx),
            None => Slot::Empty,
        }
    }
}

#[derive(Clone)]
pub struct TrieHashTable<V> {
    pub(crate) root: Bucket<V>,
}

impl<V> TrieHashTable<V> {
    pub fn new() -> Self {
        Self {
            root: Bucket::new(),
        }
    }

    /// Slot indices leading from the root to `key`.
    ///
    /// Fails with `KeyNotFound` at the first empty slot, or when the path ends
    /// at a different stored key.
    pub fn get_location(&self, key: &str) -> Result<Vec<usize>, TableError> {
        let mut path = Vec::new();
        let mut bucket = &self.root;
        let mut chars = key.chars();
        loop {
            let idx = slot_of(chars.next());
            path.push(idx);
            match &bucket.slots[idx] {
                Slot::Empty => return Err(TableError::KeyNotFound),
                Slot::Leaf { key: stored, .. } if stored == key => return Ok(path),
                Slot::Leaf { .. } => return Err(TableError::KeyNotFound),
                Slot::Child(child) => bucket = &**child,
            }
        }
    }

    fn slot_at(&self, path: &[usize]) -> Option<&Slot<V>> {
        let (&last, inner) = path.split_last()?;
        let mut bucket = &self.root;
        for &idx in inner {
            match &bucket.slots[idx] {
                Slot::Child(child) => bucket = &**child,
                _ => return None,
            }
        }
        Some(&bucket.slots[last])
    }

    fn slot_at_mut(&mut self, path: &[usize]) -> Option<&mut Slot<V>> {
        let (&last, inner) = path.split_last()?;
        let mut bucket = &mut self.root;
        for &idx in inner {
            match &mut bucket.slots[idx] {
                Slot::Child(child) => bucket = &mut **child,
                _ => return None,
            }
        }
        Some(&mut bucket.slots[last])
    }

    pub fn get(&self, key: &str) -> Result<&V, TableError> {
        let path = self.get_location(key)?;
        match self.slot_at(&path) {
            Some(Slot::Leaf { value, .. }) => Ok(value),
            _ => Err(TableError::KeyNotFound),
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut V, TableError> {
        let path = self.get_location(key)?;
        match self.slot_at_mut(&path) {
            Some(Slot::Leaf { value, .. }) => Ok(value),
            _ => Err(TableError::KeyNotFound),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }

    /// Inserts or overwrites, returning the previous value.
    pub fn set(&mut self, key: &str, value: V) -> Result<Option<V>, TableError> {
        Self::insert_into(&mut self.root, key, key.chars(), 0, value)
    }

    /// `rest` yields the characters of `key` from `level` on.
    fn insert_into(
        bucket: &mut Bucket<V>,
        key: &str,
        mut rest: Chars<'_>,
        level: usize,
        value: V,
    ) -> Result<Option<V>, TableError> {
        let idx = slot_of(rest.next());
        let split = match &mut bucket.slots[idx] {
            Slot::Empty => None,
            Slot::Leaf {
                key: stored,
                value: old,
            } => {
                if stored == key {
                    return Ok(Some(std::mem::replace(old, value)));
                }
                let stored_path = slot_path(stored.chars().skip(level + 1));
                let key_path = slot_path(rest);
                let Some(depth) = stored_path
                    .iter()
                    .zip(&key_path)
                    .position(|(a, b)| a != b)
                else {
                    return Err(TableError::IndistinguishableKeys {
                        existing: stored.clone(),
                        key: key.to_owned(),
                    });
                };
                Some((stored_path, key_path, depth))
            }
            Slot::Child(child) => return Self::insert_into(child, key, rest, level + 1, value),
        };

        let leaf = Slot::Leaf {
            key: key.to_owned(),
            value,
        };
        let Some((stored_path, key_path, depth)) = split else {
            bucket.put(idx, leaf);
            return Ok(None);
        };

        // Both keys share every slot above `depth`: one bucket per shared slot.
        trace!(level = level + 1, buckets = depth + 1, "splitting slot");
        let mut child = Bucket::new();
        child.put(stored_path[depth], bucket.take(idx));
        child.put(key_path[depth], leaf);
        for &shared in stored_path[..depth].iter().rev() {
            let mut parent = Bucket::new();
            parent.put(shared, Slot::Child(Box::new(child)));
            child = parent;
        }
        bucket.put(idx, Slot::Child(Box::new(child)));
        Ok(None)
    }

    /// Removes `key`, collapsing buckets that no longer separate two keys.
    pub fn delete(&mut self, key: &str) -> Result<V, TableError> {
        Self::remove_from(&mut self.root, key, key.chars(), 0)
    }

    fn remove_from(
        bucket: &mut Bucket<V>,
        key: &str,
        mut rest: Chars<'_>,
        level: usize,
    ) -> Result<V, TableError> {
        let idx = slot_of(rest.next());
        let descend = match &bucket.slots[idx] {
            Slot::Empty => return Err(TableError::KeyNotFound),
            Slot::Leaf { key: stored, .. } if stored != key => {
                return Err(TableError::KeyNotFound)
            }
            Slot::Leaf { .. } => false,
            Slot::Child(_) => true,
        };

        if !descend {
            return match bucket.take(idx) {
                Slot::Leaf { value, .. } => Ok(value),
                other => {
                    bucket.put(idx, other);
                    Err(TableError::KeyNotFound)
                }
            };
        }

        let Slot::Child(child) = &mut bucket.slots[idx] else {
            return Err(TableError::KeyNotFound);
        };
        let value = Self::remove_from(child, key, rest, level + 1)?;
        if child.collapsible() {
            debug!(level = level + 1, "collapsing bucket");
            if let Slot::Child(mut child) = bucket.take(idx) {
                let sole = child.take_sole();
                bucket.put(idx, sole);
            }
        }
        Ok(value)
    }

    /// Number of stored keys, counted by walking every bucket.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(bucket) = stack.pop() {
            for slot in &bucket.slots {
                match slot {
                    Slot::Empty => {}
                    Slot::Leaf { .. } => count += 1,
                    Slot::Child(child) => stack.push(child),
                }
            }
        }
        count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.live == 0
    }

    /// Buckets reachable from the root, the root included.
    pub fn bucket_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![&self.root];
        while let Some(bucket) = stack.pop() {
            count += 1;
            for slot in &bucket.slots {
                if let Slot::Child(child) = slot {
                    stack.push(child);
                }
            }
        }
        count
    }

    /// Stored keys, depth first in slot order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: vec![self.root.slots.iter()],
        }
    }
}

impl<V> Default for TrieHashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for TrieHashTable<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, V> {
    stack: Vec<std::slice::Iter<'a, Slot<V>>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let slot = match self.stack.last_mut()?.next() {
                Some(slot) => slot,
                None => {
                    self.stack.pop();
                    continue;
                }
            };
            match slot {
                Slot::Empty => {}
                Slot::Leaf { key, value } => return Some((key.as_str(), value)),
                Slot::Child(child) => self.stack.push(child.slots.iter()),
            }
        }
    }
}

impl<'a, V> IntoIterator for &'a TrieHashTable<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
