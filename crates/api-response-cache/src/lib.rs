//! Key-value cache for small JSON-serializable API responses
//!
//! Entries live in a synchronous key-value medium under a shared namespace
//! prefix, expire 24 hours after being written, and are flushed wholesale
//! when a write fails and the namespace has outgrown its bound. A cache
//! write never fails from the caller's point of view; storage faults are
//! logged and degrade to a miss.

mod cache;
mod error;
mod medium;

pub use cache::ResponseCache;
pub use error::{MediumError, Result};
pub use medium::{FileMedium, KeyValueMedium, MemoryMedium};
