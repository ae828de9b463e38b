use core::fmt;

/// Outcome categories reported by the table.
///
/// Every fallible operation returns a [`TableError`]; `ErrorKind` is the flat
/// classification of those errors, with `None` standing for success. The
/// numeric codes are stable so hosts that speak in integer status codes can
/// round-trip them through [`ErrorKind::code`] and [`ErrorKind::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// The operation succeeded.
    None = 0,
    /// The node array could not be allocated.
    OutOfMemory = 1,
    /// The required capacity exceeds the largest supported table size.
    Overflow = 2,
}

impl ErrorKind {
    /// Returns the numeric code for this kind.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Maps a numeric code back to its kind, if it names one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use coalesced_table::ErrorKind;
    /// #
    /// assert_eq!(ErrorKind::from_code(2), Some(ErrorKind::Overflow));
    /// assert_eq!(ErrorKind::from_code(3), None);
    /// ```
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ErrorKind::None),
            1 => Some(ErrorKind::OutOfMemory),
            2 => Some(ErrorKind::Overflow),
            _ => None,
        }
    }

    /// Human-readable description of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::None => "none",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Overflow => "table size too large",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes a raw status code, including codes no [`ErrorKind`] names.
///
/// # Examples
///
/// ```rust
/// # use coalesced_table::error::describe_code;
/// #
/// assert_eq!(describe_code(1), "out of memory");
/// assert_eq!(describe_code(200), "unknown error");
/// ```
pub fn describe_code(code: u8) -> &'static str {
    ErrorKind::from_code(code).map_or("unknown error", ErrorKind::as_str)
}

/// Errors returned by operations that may allocate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// Allocating a node array of `slots` nodes failed.
    #[error("out of memory: could not allocate {slots} table slots")]
    OutOfMemory {
        /// Number of nodes that were requested.
        slots: usize,
    },
    /// Holding `needed` entries would take more than `limit` slots.
    #[error("table size too large: {needed} entries exceed the limit of {limit} slots")]
    Overflow {
        /// Number of entries the table was asked to hold.
        needed: usize,
        /// Largest number of slots the table may allocate.
        limit: usize,
    },
}

impl TableError {
    /// Returns the flat classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            TableError::Overflow { .. } => ErrorKind::Overflow,
        }
    }
}

/// Result alias used by the table's fallible operations.
pub type Result<T> = core::result::Result<T, TableError>;
