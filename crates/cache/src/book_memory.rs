//! Memory budget service for an open book
//!
//! Tracks decoded content across two pools, raw page content and
//! presentation pictures, under one shared byte limit. The steady-state
//! policy runs on every addition; a deeper cleanup exists as the
//! out-of-memory fallback.

use crate::pool::{ContentPool, EvictionPolicy, MemoryElement, PoolStats};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default shared limit: 256 MB.
pub const DEFAULT_LIMIT_SIZE: usize = 256 * 1024 * 1024;

/// Aggregated statistics for both pools
#[derive(Debug, Clone, Copy, Default)]
pub struct BookMemoryStats {
    /// Raw content pool statistics
    pub source: PoolStats,

    /// Presentation picture pool statistics
    pub picture: PoolStats,
}

impl BookMemoryStats {
    /// Combined tracked size in bytes.
    pub fn total_size(&self) -> usize {
        self.source.total_size + self.picture.total_size
    }

    /// Combined eviction count.
    pub fn total_evictions(&self) -> u64 {
        self.source.evictions + self.picture.evictions
    }
}

/// Two-pool memory budget tracker, one instance per open book
///
/// Raw content evicts by distance from the visible page (the reference
/// index); pictures evict oldest-first. On every addition the owning pool is
/// shrunk to whatever the limit leaves after the other pool's usage, and if
/// the combined total still reaches the limit, the other pool is shrunk too.
///
/// # Example
///
/// ```
/// use book_viewer_cache::{BookMemoryService, MemoryElement};
///
/// struct Raw(u32, usize);
/// impl MemoryElement for Raw {
///     fn page_index(&self) -> u32 { self.0 }
///     fn content_size(&self) -> usize { self.1 }
///     fn is_pinned(&self) -> bool { false }
///     fn release(&self) {}
/// }
///
/// let memory = BookMemoryService::new(1024);
/// memory.set_reference(0);
/// memory.add_source(Box::new(Raw(0, 600)));
/// memory.add_source(Box::new(Raw(1, 600)));
/// // The second addition pushed the pool over budget and evicted page 1.
/// assert!(memory.total_size() <= 1024);
/// ```
pub struct BookMemoryService {
    limit_size: AtomicUsize,
    source_pool: ContentPool,
    picture_pool: ContentPool,
}

impl BookMemoryService {
    /// Create a service with the given shared limit in bytes.
    pub fn new(limit_size: usize) -> Self {
        Self {
            limit_size: AtomicUsize::new(limit_size),
            source_pool: ContentPool::new(EvictionPolicy::DistanceFromReference),
            picture_pool: ContentPool::new(EvictionPolicy::OldestFirst),
        }
    }

    /// Create a service with a limit in megabytes.
    pub fn with_mb_limit(megabytes: usize) -> Self {
        Self::new(megabytes * 1024 * 1024)
    }

    /// The configured shared limit in bytes.
    pub fn limit_size(&self) -> usize {
        self.limit_size.load(Ordering::Relaxed)
    }

    /// Change the shared limit and re-apply the budget.
    pub fn set_limit_size(&self, limit_size: usize) {
        self.limit_size.store(limit_size, Ordering::Relaxed);
        self.cleanup_after_add(&self.source_pool, &self.picture_pool);
    }

    /// Track raw decoded content for a page.
    pub fn add_source(&self, element: Box<dyn MemoryElement>) {
        self.source_pool.add(element);
        self.cleanup_after_add(&self.source_pool, &self.picture_pool);
    }

    /// Track a presentation picture for a page.
    pub fn add_picture(&self, element: Box<dyn MemoryElement>) {
        self.picture_pool.add(element);
        self.cleanup_after_add(&self.picture_pool, &self.source_pool);
    }

    /// Steady-state budget policy, run after every addition.
    fn cleanup_after_add(&self, owning: &ContentPool, other: &ContentPool) {
        let limit = self.limit_size();

        owning.shrink_to(limit.saturating_sub(other.total_size()));

        if owning.total_size() + other.total_size() >= limit {
            other.shrink_to(limit.saturating_sub(owning.total_size()));
        }
    }

    /// Mark the page index currently on screen.
    ///
    /// Raw-content eviction prefers releasing pages far from it.
    pub fn set_reference(&self, page_index: u32) {
        self.source_pool.set_reference(page_index);
    }

    /// Aggressive fallback for an out-of-memory condition: drop all raw
    /// content that is not pinned and every picture.
    pub fn deep_cleanup(&self) {
        log::debug!("deep cleanup, {} bytes tracked", self.total_size());
        self.source_pool.shrink_to(0);
        self.picture_pool.clear();
    }

    /// Empty both pools unconditionally (book switch).
    pub fn clear(&self) {
        self.source_pool.clear();
        self.picture_pool.clear();
    }

    /// Combined tracked size in bytes.
    pub fn total_size(&self) -> usize {
        self.source_pool.total_size() + self.picture_pool.total_size()
    }

    /// Whether the combined total has reached the limit.
    pub fn is_full(&self) -> bool {
        self.total_size() >= self.limit_size()
    }

    /// Statistics snapshot for both pools.
    pub fn stats(&self) -> BookMemoryStats {
        BookMemoryStats {
            source: self.source_pool.stats(),
            picture: self.picture_pool.stats(),
        }
    }
}

impl Default for BookMemoryService {
    /// Create a service with the default 256 MB limit.
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT_SIZE)
    }
}
