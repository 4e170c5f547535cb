//! Two-level hash table keyed by `(K1, K2)`.
//!
//! The top level is a [`LinearProbeTable`] keyed by `K1`; every occupied top slot
//! exclusively owns a leaf [`LinearProbeTable`] keyed by `K2`. Both levels use the
//! same polynomial hash, each at its own current capacity, so a leaf can be
//! resized without touching anything above it.
//!
//! Growth:
//! - A leaf that reports [`TableError::CapacityExhausted`] is rebuilt at the next
//!   larger entry of `internal_sizes` and the insert is retried.
//! - When the top level is full, or more than 2/3 of its slots are occupied after
//!   a new `K1` arrives, the whole structure is rehashed into a new top level at
//!   the next entry of `sizes`. Every pair is re-inserted through the normal
//!   insert path, so leaves are re-created lazily.
//! - Running past the end of either sequence is reported as
//!   [`TableError::SizesExhausted`].

use tracing::{debug, trace};

use crate::{LinearProbeTable, PolyHash, TableError};

// =============================================================================
// Configuration
// =============================================================================

/// Default size ladder, for both levels. Sized for up to ~10^6 entries.
pub const TABLE_SIZES: [usize; 19] = [
    5, 13, 29, 53, 97, 193, 389, 769, 1543, 3079, 6151, 12289, 24593, 49157, 98317, 196613,
    393241, 786433, 1572869,
];

/// Top-level occupancy above `MAX_LOAD_NUM / MAX_LOAD_DEN` triggers a rehash.
pub const MAX_LOAD_NUM: usize = 2;
pub const MAX_LOAD_DEN: usize = 3;

/// Size sequences for a [`DoubleKeyTable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    /// Top-level capacities; the table starts at the first and climbs on rehash.
    pub sizes: Vec<usize>,
    /// Leaf capacities; a new leaf starts at the first and climbs when it fills up.
    pub internal_sizes: Vec<usize>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            sizes: TABLE_SIZES.to_vec(),
            internal_sizes: TABLE_SIZES.to_vec(),
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), TableError> {
        check_ladder("sizes", &self.sizes)?;
        check_ladder("internal_sizes", &self.internal_sizes)
    }
}

fn check_ladder(name: &str, sizes: &[usize]) -> Result<(), TableError> {
    if sizes.is_empty() {
        return Err(TableError::InvalidConfig(format!("{name} is empty")));
    }
    if let Some(&size) = sizes.iter().find(|&&s| s < 2) {
        return Err(TableError::InvalidConfig(format!(
            "{name} contains {size}, every size must be at least 2"
        )));
    }
    if sizes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(TableError::InvalidConfig(format!(
            "{name} must be strictly ascending"
        )));
    }
    Ok(())
}

/// Second-level store owned by one top-level slot.
pub type Leaf<K2, V> = LinearProbeTable<K2, V>;

#[derive(Clone)]
pub struct DoubleKeyTable<K1, K2, V> {
    table: LinearProbeTable<K1, Leaf<K2, V>>,
    sizes: Vec<usize>,
    internal_sizes: Vec<usize>,
    size_index: usize,
    count: usize,
}

impl<K1, K2, V> DoubleKeyTable<K1, K2, V> {
    /// Number of top-level slots (not the number of entries).
    #[inline]
    pub fn table_size(&self) -> usize {
        self.table.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Every distinct `K1`, in top-level slot order.
    pub fn keys(&self) -> impl Iterator<Item = &K1> + '_ {
        self.table.keys()
    }

    /// Every value, walking one leaf at a time in top-level slot order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.table.values().flat_map(|leaf| leaf.values())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K1, &K2, &V)> + '_ {
        self.table
            .iter()
            .flat_map(|(k1, leaf)| leaf.iter().map(move |(k2, v)| (k1, k2, v)))
    }
}

impl<K1: PolyHash + Eq, K2: PolyHash + Eq, V> DoubleKeyTable<K1, K2, V> {
    pub fn new() -> Self {
        Self::from_validated(TableConfig::default())
    }

    /// Builds a table from optional size ladders.
    ///
    /// `internal_sizes` defaults to `sizes`, which defaults to [`TABLE_SIZES`].
    pub fn with_sizes(
        sizes: Option<Vec<usize>>,
        internal_sizes: Option<Vec<usize>>,
    ) -> Result<Self, TableError> {
        let sizes = sizes.unwrap_or_else(|| TABLE_SIZES.to_vec());
        let internal_sizes = internal_sizes.unwrap_or_else(|| sizes.clone());
        Self::with_config(TableConfig {
            sizes,
            internal_sizes,
        })
    }

    pub fn with_config(config: TableConfig) -> Result<Self, TableError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: TableConfig) -> Self {
        Self {
            table: LinearProbeTable::new(config.sizes[0]),
            sizes: config.sizes,
            internal_sizes: config.internal_sizes,
            size_index: 0,
            count: 0,
        }
    }

    /// Top-level home slot of `k1`.
    #[inline]
    pub fn hash1(&self, k1: &K1) -> usize {
        k1.poly_hash(self.table.capacity())
    }

    /// Home slot of `k2` in the leaf of `k1`, or in a new leaf if `k1` has none.
    pub fn hash2(&self, k1: &K1, k2: &K2) -> usize {
        match self.leaf(k1) {
            Some(leaf) => leaf.hash(k2),
            None => k2.poly_hash(self.internal_sizes[0]),
        }
    }

    fn leaf(&self, k1: &K1) -> Option<&Leaf<K2, V>> {
        let top = self.table.probe(k1, false).ok()?;
        self.table.entry_at(top).map(|(_, leaf)| leaf)
    }

    /// `(top, bottom)` slot indices of an existing pair.
    pub fn locate(&self, k1: &K1, k2: &K2) -> Result<(usize, usize), TableError> {
        let top = self.table.probe(k1, false)?;
        let (_, leaf) = self.table.entry_at(top).ok_or(TableError::KeyNotFound)?;
        let bottom = leaf.probe(k2, false)?;
        Ok((top, bottom))
    }

    pub fn get(&self, k1: &K1, k2: &K2) -> Result<&V, TableError> {
        let (top, bottom) = self.locate(k1, k2)?;
        self.table
            .entry_at(top)
            .and_then(|(_, leaf)| leaf.entry_at(bottom))
            .map(|(_, v)| v)
            .ok_or(TableError::KeyNotFound)
    }

    pub fn get_mut(&mut self, k1: &K1, k2: &K2) -> Result<&mut V, TableError> {
        let (top, bottom) = self.locate(k1, k2)?;
        self.table
            .value_at_mut(top)
            .and_then(|leaf| leaf.value_at_mut(bottom))
            .ok_or(TableError::KeyNotFound)
    }

    pub fn contains(&self, k1: &K1, k2: &K2) -> bool {
        self.get(k1, k2).is_ok()
    }

    /// Removes a pair. A `K1` whose last pair goes away gives up its top slot.
    pub fn delete(&mut self, k1: &K1, k2: &K2) -> Result<V, TableError> {
        let (top, bottom) = self.locate(k1, k2)?;
        let leaf = self
            .table
            .value_at_mut(top)
            .ok_or(TableError::KeyNotFound)?;
        let (_, value) = leaf.remove_at(bottom)?;
        self.count -= 1;
        if leaf.is_empty() {
            self.table.remove_at(top)?;
        }
        Ok(value)
    }

    /// Every `K2` stored under `k1`. Empty if `k1` is absent.
    pub fn keys_of<'a>(&'a self, k1: &K1) -> impl Iterator<Item = &'a K2> + 'a {
        self.leaf(k1).into_iter().flat_map(|leaf| leaf.keys())
    }

    /// Every value stored under `k1`. Empty if `k1` is absent.
    pub fn values_of<'a>(&'a self, k1: &K1) -> impl Iterator<Item = &'a V> + 'a {
        self.leaf(k1).into_iter().flat_map(|leaf| leaf.values())
    }

    #[inline]
    fn overloaded(&self) -> bool {
        self.table.len() * MAX_LOAD_DEN > self.table.capacity() * MAX_LOAD_NUM
    }
}

impl<K1: PolyHash + Eq + Clone, K2: PolyHash + Eq, V> DoubleKeyTable<K1, K2, V> {
    /// Inserts or overwrites a pair, returning the previous value.
    pub fn set(&mut self, k1: K1, k2: K2, value: V) -> Result<Option<V>, TableError> {
        let occupied = self.table.len();
        let previous = self.place(k1, k2, value)?;
        if previous.is_none() {
            self.count += 1;
        }

        // A new `K1` past the load limit grows the top level, unless it is at its last size.
        if self.table.len() > occupied
            && self.overloaded()
            && self.size_index + 1 < self.sizes.len()
        {
            self.rehash()?;
        }
        Ok(previous)
    }

    /// Slot indices where `(k1, k2)` is or would be stored.
    ///
    /// Rehashes a full top level and resizes a full leaf, so the returned slots
    /// are writable. No leaf is created: for a `k1` without one, the bottom
    /// index is the home slot of `k2` in a leaf of the first internal size.
    pub fn locate_for_insert(&mut self, k1: &K1, k2: &K2) -> Result<(usize, usize), TableError> {
        let top = loop {
            match self.table.probe(k1, true) {
                Ok(top) => break top,
                Err(TableError::CapacityExhausted { .. }) => self.rehash()?,
                Err(e) => return Err(e),
            }
        };

        if self.table.entry_at(top).is_none() {
            return Ok((top, k2.poly_hash(self.internal_sizes[0])));
        }

        let leaf = self
            .table
            .value_at_mut(top)
            .ok_or(TableError::KeyNotFound)?;
        loop {
            match leaf.probe(k2, true) {
                Ok(bottom) => return Ok((top, bottom)),
                Err(TableError::CapacityExhausted { capacity }) => {
                    let next = self
                        .internal_sizes
                        .iter()
                        .copied()
                        .find(|&s| s > capacity)
                        .ok_or(TableError::SizesExhausted { size: capacity })?;
                    debug!(top, from = capacity, to = next, "resizing leaf");
                    *leaf = std::mem::take(leaf).resized(next)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Writes a pair at its insert position, creating the leaf for `k1` on first use.
    fn place(&mut self, k1: K1, k2: K2, value: V) -> Result<Option<V>, TableError> {
        let (top, bottom) = self.locate_for_insert(&k1, &k2)?;
        if self.table.entry_at(top).is_none() {
            let capacity = self.internal_sizes[0];
            trace!(top, capacity, "creating leaf");
            self.table.insert_at(top, k1, LinearProbeTable::new(capacity));
        }
        let leaf = self
            .table
            .value_at_mut(top)
            .ok_or(TableError::KeyNotFound)?;
        Ok(leaf.insert_at(bottom, k2, value))
    }

    /// Moves every pair into a fresh top level at the next configured size.
    fn rehash(&mut self) -> Result<(), TableError> {
        let old_size = self.table.capacity();
        let next_index = self.size_index + 1;
        let new_size = *self
            .sizes
            .get(next_index)
            .ok_or(TableError::SizesExhausted { size: old_size })?;

        debug!(
            old_size,
            new_size,
            entries = self.count,
            "rehashing double-key table"
        );
        let old = std::mem::replace(&mut self.table, LinearProbeTable::new(new_size));
        self.size_index = next_index;

        for (k1, leaf) in old {
            for (k2, value) in leaf {
                self.place(k1.clone(), k2, value)?;
            }
        }
        Ok(())
    }
}

impl<K1: PolyHash + Eq, K2: PolyHash + Eq, V> Default for DoubleKeyTable<K1, K2, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K1: std::fmt::Debug, K2: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug
    for DoubleKeyTable<K1, K2, V>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(k1, k2, v)| ((k1, k2), v)))
            .finish()
    }
}
