//! Polynomial rolling hash shared by both levels of the double-keyed table.
//!
//! The hash is a pure function of `(key, modulus)`: a table never stores a hash
//! function, it passes its own current capacity in. Resizing a table therefore
//! rebinds the hash simply by changing the modulus.

use std::borrow::Cow;

// =============================================================================
// Configuration
// =============================================================================

/// Multiplier step applied after every character.
pub const HASH_BASE: u64 = 31;
/// Starting multiplier.
pub const HASH_SEED: u64 = 31415;

/// Hashes a character sequence into `0..modulus`.
///
/// `value = (code + a * value) mod modulus`, then `a = a * HASH_BASE mod (modulus - 1)`.
/// A modulus of `0` or `1` always yields `0`.
pub fn poly_hash_chars<I>(chars: I, modulus: usize) -> usize
where
    I: IntoIterator<Item = char>,
{
    if modulus <= 1 {
        return 0;
    }
    let m = modulus as u128;
    let step = (modulus - 1) as u128;
    let mut value: u128 = 0;
    let mut a = HASH_SEED as u128;
    for c in chars {
        value = (c as u128 + a * value) % m;
        a = a * HASH_BASE as u128 % step;
    }
    value as usize
}

/// Keys that can be placed in a [`LinearProbeTable`](crate::LinearProbeTable).
///
/// Implemented for the string types; other key types provide their own mapping
/// into `0..modulus`.
pub trait PolyHash {
    fn poly_hash(&self, modulus: usize) -> usize;
}

impl PolyHash for str {
    #[inline]
    fn poly_hash(&self, modulus: usize) -> usize {
        poly_hash_chars(self.chars(), modulus)
    }
}

impl PolyHash for String {
    #[inline]
    fn poly_hash(&self, modulus: usize) -> usize {
        self.as_str().poly_hash(modulus)
    }
}

impl PolyHash for Box<str> {
    #[inline]
    fn poly_hash(&self, modulus: usize) -> usize {
        (**self).poly_hash(modulus)
    }
}

impl PolyHash for Cow<'_, str> {
    #[inline]
    fn poly_hash(&self, modulus: usize) -> usize {
        self.as_ref().poly_hash(modulus)
    }
}

impl PolyHash for char {
    #[inline]
    fn poly_hash(&self, modulus: usize) -> usize {
        poly_hash_chars(std::iter::once(*self), modulus)
    }
}

impl<T: PolyHash + ?Sized> PolyHash for &T {
    #[inline]
    fn poly_hash(&self, modulus: usize) -> usize {
        (**self).poly_hash(modulus)
    }
}
