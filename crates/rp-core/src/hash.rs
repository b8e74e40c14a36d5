//! Fast hash map and hash set type aliases.
//!
//! This module provides type aliases for [`FxHashMap`] and [`FxHashSet`] from the
//! `rustc-hash` crate. Keys in this workspace are short strings and paths
//! (global names, declaration output paths), which is the case Fx hashing
//! is tuned for. Denial-of-service resistance is not needed for build inputs.
//!
//! # Examples
//!
//! ```
//! use rp_core::{FxHashMap, FxHashSet, fx_hash_map, fx_hash_set};
//!
//! let mut globals: FxHashMap<String, String> = fx_hash_map();
//! globals.insert("react".to_owned(), "React".to_owned());
//!
//! let seen: FxHashSet<&str> = fx_hash_set();
//! assert!(seen.is_empty());
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
///
/// This is equivalent to `FxHashMap::default()` but can be more ergonomic
/// in some contexts due to type inference.
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
