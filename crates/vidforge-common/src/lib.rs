//! vidforge-common: shared error type, configuration, asset model, and
//! byte-range parsing.
//!
//! This crate is the foundational dependency for the other vidforge crates.
//! It has no I/O of its own; everything here is plain data plus the pure
//! arithmetic behind HTTP range requests.

pub mod config;
pub mod error;
pub mod range;
pub mod types;

// Re-export the most commonly used items at the crate root.
pub use config::Config;
pub use error::{Error, Result};
pub use range::{parse_range, ByteRange};
pub use types::{mime, AssetDescriptor, MimeType, VideoMetadata};
