//! Book Viewer Cache Library
//!
//! Budget-bounded tracking of decoded page content.
//!
//! Decoded content lives in two pools, raw page content and presentation
//! pictures, sharing a single byte limit per open book. Pools own membership
//! only; the content itself belongs to the pages, which implement
//! [`MemoryElement`] so eviction can release their bytes.

pub mod book_memory;
pub mod pool;

pub use book_memory::{BookMemoryService, BookMemoryStats, DEFAULT_LIMIT_SIZE};
pub use pool::{ContentPool, EvictionPolicy, MemoryElement, PoolStats};
