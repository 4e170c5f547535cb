use thiserror::Error;

/// Failures reported by every table in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The requested key (or key pair) has no stored entry.
    #[error("key not found")]
    KeyNotFound,

    /// A fixed-capacity table has no free slot for a new key.
    #[error("table is full at capacity {capacity}")]
    CapacityExhausted { capacity: usize },

    /// A table needed to grow past the last configured size.
    #[error("no configured table size is larger than {size}")]
    SizesExhausted { size: usize },

    /// Rejected table size configuration.
    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),

    /// Two distinct keys hash to the same slot at every level, terminal slot included.
    #[error("key {key:?} cannot be separated from stored key {existing:?}")]
    IndistinguishableKeys { existing: String, key: String },
}
