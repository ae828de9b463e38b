#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

/// Construction-time table settings.
pub mod config;

/// Error kinds and the error type returned by fallible table operations.
pub mod error;

/// Key type tags and the hashing and equality strategies a table uses.
pub mod strategy;

pub mod table;

pub use config::MAX_SIZE_LOG;
pub use config::TableConfig;
pub use error::ErrorKind;
pub use error::Result;
pub use error::TableError;
pub use strategy::DefaultStrategy;
pub use strategy::EqualFn;
pub use strategy::FnStrategy;
pub use strategy::HashFn;
pub use strategy::HashStrategy;
pub use strategy::KeyType;
pub use strategy::Scalar;
pub use strategy::default_equal;
pub use strategy::default_hash;
#[cfg(feature = "stats")]
pub use table::DebugStats;
pub use table::Iter;
pub use table::Node;
pub use table::NodeHandle;
pub use table::Table;
