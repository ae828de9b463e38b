use crate::strategy::KeyType;

/// Largest supported capacity exponent: tables never exceed `2^24` slots.
pub const MAX_SIZE_LOG: u32 = 24;

/// Construction-time settings for a [`Table`](crate::Table).
///
/// # Examples
///
/// ```rust
/// # use coalesced_table::{KeyType, TableConfig};
/// #
/// let config = TableConfig::new(KeyType::Int32).with_max_size_log(10);
/// assert_eq!(config.max_size_log(), 10);
/// assert_eq!(config.max_slots(), 1024);
///
/// // Limits above the hard cap are clamped.
/// let config = TableConfig::default().with_max_size_log(40);
/// assert_eq!(config.max_size_log(), 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableConfig {
    key_type: KeyType,
    max_size_log: u32,
}

impl TableConfig {
    /// Creates a configuration for keys of `key_type` with the largest
    /// supported size limit.
    pub const fn new(key_type: KeyType) -> Self {
        Self {
            key_type,
            max_size_log: MAX_SIZE_LOG,
        }
    }

    /// Limits the table to `2^max_size_log` slots. Growing past the limit
    /// fails with [`TableError::Overflow`](crate::TableError::Overflow).
    pub const fn with_max_size_log(mut self, max_size_log: u32) -> Self {
        self.max_size_log = if max_size_log > MAX_SIZE_LOG {
            MAX_SIZE_LOG
        } else {
            max_size_log
        };
        self
    }

    /// The key type tag handed to the strategy.
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// The capacity exponent limit.
    pub const fn max_size_log(&self) -> u32 {
        self.max_size_log
    }

    /// The largest number of slots the table may allocate.
    pub const fn max_slots(&self) -> usize {
        1 << self.max_size_log
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::new(KeyType::default())
    }
}

impl From<KeyType> for TableConfig {
    fn from(key_type: KeyType) -> Self {
        Self::new(key_type)
    }
}
