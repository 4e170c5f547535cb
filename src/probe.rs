//! Fixed-capacity open-addressed table with linear probing.
//!
//! This is the leaf storage of [`DoubleKeyTable`](crate::DoubleKeyTable) and also
//! its top level. The table never grows on its own: an insert that finds no free
//! slot fails with [`TableError::CapacityExhausted`] and the owner decides how to
//! grow (see [`LinearProbeTable::resized`]).
//!
//! Deletion leaves no tombstones. The remainder of the probe cluster after the
//! vacated slot is lifted out and placed again, so a lookup can always stop at
//! the first empty slot.

use crate::{PolyHash, TableError};

#[derive(Clone)]
pub struct LinearProbeTable<K, V> {
    slots: Box<[Option<(K, V)>]>,
    count: usize,
}

impl<K, V> LinearProbeTable<K, V> {
    pub fn new(capacity: usize) -> Self {
        let slots = std::iter::repeat_with(|| None).take(capacity).collect();
        Self { slots, count: 0 }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Entries in physical slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    #[inline]
    pub(crate) fn entry_at(&self, pos: usize) -> Option<(&K, &V)> {
        self.slots
            .get(pos)
            .and_then(Option::as_ref)
            .map(|(k, v)| (k, v))
    }

    #[inline]
    pub(crate) fn value_at_mut(&mut self, pos: usize) -> Option<&mut V> {
        self.slots
            .get_mut(pos)
            .and_then(Option::as_mut)
            .map(|(_, v)| v)
    }
}

impl<K: PolyHash + Eq, V> LinearProbeTable<K, V> {
    /// Home slot of `key` at the current capacity.
    #[inline]
    pub fn hash(&self, key: &K) -> usize {
        key.poly_hash(self.capacity())
    }

    /// Finds the slot holding `key`.
    ///
    /// With `for_insert`, the first empty slot on the probe sequence is also
    /// returned. Fails with `KeyNotFound` on lookup and `CapacityExhausted` when
    /// inserting a new key into a full table.
    pub fn probe(&self, key: &K, for_insert: bool) -> Result<usize, TableError> {
        let capacity = self.capacity();
        let miss = if for_insert {
            TableError::CapacityExhausted { capacity }
        } else {
            TableError::KeyNotFound
        };
        if capacity == 0 {
            return Err(miss);
        }

        let mut pos = self.hash(key);
        for _ in 0..capacity {
            match &self.slots[pos] {
                None if for_insert => return Ok(pos),
                None => return Err(TableError::KeyNotFound),
                Some((k, _)) if k == key => return Ok(pos),
                Some(_) => pos = (pos + 1) % capacity,
            }
        }
        Err(miss)
    }

    pub fn get(&self, key: &K) -> Result<&V, TableError> {
        let pos = self.probe(key, false)?;
        self.entry_at(pos)
            .map(|(_, v)| v)
            .ok_or(TableError::KeyNotFound)
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut V, TableError> {
        let pos = self.probe(key, false)?;
        self.value_at_mut(pos).ok_or(TableError::KeyNotFound)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.probe(key, false).is_ok()
    }

    /// Inserts or overwrites, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, TableError> {
        let pos = self.probe(&key, true)?;
        Ok(self.insert_at(pos, key, value))
    }

    /// Writes into a slot previously returned by [`probe`](Self::probe) for `key`.
    pub(crate) fn insert_at(&mut self, pos: usize, key: K, value: V) -> Option<V> {
        if let Some((_, v)) = self.slots[pos].as_mut() {
            return Some(std::mem::replace(v, value));
        }
        self.slots[pos] = Some((key, value));
        self.count += 1;
        None
    }

    pub fn remove(&mut self, key: &K) -> Result<V, TableError> {
        let pos = self.probe(key, false)?;
        self.remove_at(pos).map(|(_, v)| v)
    }

    pub(crate) fn remove_at(&mut self, pos: usize) -> Result<(K, V), TableError> {
        let removed = self.slots[pos].take().ok_or(TableError::KeyNotFound)?;
        self.count -= 1;

        // Re-seat the rest of the cluster so no lookup is cut short by the hole.
        let capacity = self.capacity();
        let mut next = (pos + 1) % capacity;
        while let Some((k, v)) = self.slots[next].take() {
            self.count -= 1;
            self.place_vacant(k, v);
            next = (next + 1) % capacity;
        }
        Ok(removed)
    }

    /// Places a key known to be absent. Requires at least one empty slot.
    fn place_vacant(&mut self, key: K, value: V) {
        let capacity = self.capacity();
        let mut pos = self.hash(&key);
        while self.slots[pos].is_some() {
            pos = (pos + 1) % capacity;
        }
        self.slots[pos] = Some((key, value));
        self.count += 1;
    }

    /// Rebuilds at `capacity`, rehashing every key under the new modulus.
    pub fn resized(self, capacity: usize) -> Result<Self, TableError> {
        if capacity < self.count {
            return Err(TableError::CapacityExhausted { capacity });
        }
        let mut table = Self::new(capacity);
        for (k, v) in self {
            table.place_vacant(k, v);
        }
        Ok(table)
    }
}

impl<K, V> Default for LinearProbeTable<K, V> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for LinearProbeTable<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K, V> {
    slots: std::slice::Iter<'a, Option<(K, V)>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots
            .by_ref()
            .find_map(|slot| slot.as_ref().map(|(k, v)| (k, v)))
    }
}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

pub struct IntoIter<K, V> {
    slots: std::vec::IntoIter<Option<(K, V)>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.by_ref().flatten().next()
    }
}

impl<K, V> IntoIterator for LinearProbeTable<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.slots.into_vec().into_iter(),
        }
    }
}

impl<'a, K, V> IntoIterator for &'a LinearProbeTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
