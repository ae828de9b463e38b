use core::fmt::Debug;
use core::hash::BuildHasher;

/// The opaque, pointer-sized bit pattern stored for every key and value.
pub type Scalar = u64;

/// Signature of an injected hash function.
pub type HashFn = fn(KeyType, Scalar) -> u64;

/// Signature of an injected key equality function.
pub type EqualFn = fn(KeyType, Scalar, Scalar) -> bool;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        type DefaultBuildHasher = foldhash::fast::FixedState;
    } else if #[cfg(feature = "std")] {
        type DefaultBuildHasher =
            core::hash::BuildHasherDefault<std::collections::hash_map::DefaultHasher>;
    } else {
        compile_error!("the default hash strategy needs either the `foldhash` or the `std` feature");
    }
}

/// Tag describing how the bits of a key should be interpreted.
///
/// The tag is fixed when a table is constructed and handed to the strategy on
/// every hash and equality call, so one strategy can serve several key types.
/// The default strategy uses it to decide which bits of a key are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyType {
    /// All 64 bits are significant and compared verbatim.
    #[default]
    Opaque,
    /// Only the low 32 bits are significant.
    Int32,
    /// A 64-bit integer.
    Int64,
    /// An IEEE-754 double stored by its bit pattern. Positive and negative
    /// zero are the same key.
    Float64,
}

impl KeyType {
    /// Reduces `key` to the canonical bit pattern for this key type.
    ///
    /// Two keys are equal under the default strategy exactly when their
    /// canonical patterns are equal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use coalesced_table::KeyType;
    /// #
    /// assert_eq!(KeyType::Int32.canonical(0xFFFF_0000_0000_0001), 1);
    /// assert_eq!(KeyType::Float64.canonical((-0.0f64).to_bits()), 0);
    /// ```
    pub fn canonical(self, key: Scalar) -> Scalar {
        match self {
            KeyType::Opaque | KeyType::Int64 => key,
            KeyType::Int32 => key & 0xFFFF_FFFF,
            KeyType::Float64 => {
                if f64::from_bits(key) == 0.0 {
                    0
                } else {
                    key
                }
            }
        }
    }
}

/// Hashing and key equality injected into a table.
///
/// Implementations must be deterministic, and keys that compare equal must
/// produce the same hash. The table never calls back into the strategy while
/// its chains are half-updated, but it does call it during every lookup,
/// insertion, removal and rehash.
pub trait HashStrategy {
    /// Hashes `key`, interpreted according to `key_type`.
    fn hash(&self, key_type: KeyType, key: Scalar) -> u64;

    /// Returns `true` if `a` and `b` name the same key.
    fn equal(&self, key_type: KeyType, a: Scalar, b: Scalar) -> bool;
}

/// The strategy used when the caller supplies none.
///
/// Keys are reduced to their [canonical](KeyType::canonical) pattern, hashed
/// with a fixed-seed `foldhash` state (or `std`'s `DefaultHasher` without the
/// `foldhash` feature) and compared by value.
#[derive(Clone, Default)]
pub struct DefaultStrategy {
    hash_builder: DefaultBuildHasher,
}

impl Debug for DefaultStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DefaultStrategy").finish_non_exhaustive()
    }
}

impl HashStrategy for DefaultStrategy {
    #[inline]
    fn hash(&self, key_type: KeyType, key: Scalar) -> u64 {
        self.hash_builder.hash_one(key_type.canonical(key))
    }

    #[inline]
    fn equal(&self, key_type: KeyType, a: Scalar, b: Scalar) -> bool {
        key_type.canonical(a) == key_type.canonical(b)
    }
}

/// The default hash function, usable as a [`HashFn`].
pub fn default_hash(key_type: KeyType, key: Scalar) -> u64 {
    DefaultStrategy::default().hash(key_type, key)
}

/// The default equality function, usable as an [`EqualFn`].
pub fn default_equal(key_type: KeyType, a: Scalar, b: Scalar) -> bool {
    key_type.canonical(a) == key_type.canonical(b)
}

/// A strategy assembled from plain function pointers.
///
/// Either function may be omitted, in which case the default for that
/// function is selected once, here, rather than on every call.
///
/// # Examples
///
/// ```rust
/// # use coalesced_table::{FnStrategy, HashStrategy, KeyType};
/// #
/// let strategy = FnStrategy::new(Some(|_, key| key >> 4), None);
/// assert_eq!(strategy.hash(KeyType::Opaque, 0x40), 4);
/// assert!(strategy.equal(KeyType::Opaque, 7, 7));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FnStrategy {
    hash: HashFn,
    equal: EqualFn,
}

impl FnStrategy {
    /// Builds a strategy from optional hash and equality functions.
    pub fn new(hash: Option<HashFn>, equal: Option<EqualFn>) -> Self {
        Self {
            hash: hash.unwrap_or(default_hash),
            equal: equal.unwrap_or(default_equal),
        }
    }

    /// The hash function in use.
    pub fn hash_fn(&self) -> HashFn {
        self.hash
    }

    /// The equality function in use.
    pub fn equal_fn(&self) -> EqualFn {
        self.equal
    }
}

impl Default for FnStrategy {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl HashStrategy for FnStrategy {
    #[inline]
    fn hash(&self, key_type: KeyType, key: Scalar) -> u64 {
        (self.hash)(key_type, key)
    }

    #[inline]
    fn equal(&self, key_type: KeyType, a: Scalar, b: Scalar) -> bool {
        (self.equal)(key_type, a, b)
    }
}
