//! Eviction pools for decoded page content
//!
//! A pool tracks the decoded content that currently occupies memory and
//! releases it again under budget pressure. The pool owns membership only:
//! the content itself lives on the pages, which implement [`MemoryElement`]
//! so the pool can ask them to drop their bytes.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// A piece of decoded content that a pool may release.
///
/// Implemented by the viewer's pages. `release()` drops the decoded bytes;
/// pinned elements (pages currently on screen) are never released by
/// budget-driven eviction, only by [`ContentPool::clear`].
pub trait MemoryElement: Send + Sync {
    /// Index of the owning page, used for distance-based eviction.
    fn page_index(&self) -> u32;

    /// Size of the decoded content in bytes.
    fn content_size(&self) -> usize;

    /// Whether the element is pinned against eviction.
    fn is_pinned(&self) -> bool;

    /// Drop the decoded content.
    fn release(&self);
}

/// Victim selection order for a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Evict the unpinned element farthest from the reference index first.
    /// Used for raw page content, so pages near the visible one survive.
    DistanceFromReference,

    /// Evict the oldest unpinned element first.
    OldestFirst,
}

/// Pool usage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Number of elements currently in the pool
    pub element_count: usize,

    /// Total tracked size in bytes
    pub total_size: usize,

    /// Number of elements released by eviction
    pub evictions: u64,
}

struct PoolEntry {
    element: Box<dyn MemoryElement>,
    size: usize,
}

struct PoolState {
    entries: HashMap<u32, PoolEntry>,
    /// Insertion order, oldest at the front.
    order: VecDeque<u32>,
    total_size: usize,
    reference_index: u32,
    evictions: u64,
}

impl PoolState {
    fn remove(&mut self, page_index: u32) -> Option<PoolEntry> {
        let entry = self.entries.remove(&page_index)?;
        self.order.retain(|&index| index != page_index);
        self.total_size = self.total_size.saturating_sub(entry.size);
        Some(entry)
    }

    /// Pick the next eviction victim, or `None` if everything is pinned.
    fn pick_victim(&self, policy: EvictionPolicy) -> Option<u32> {
        match policy {
            EvictionPolicy::OldestFirst => self
                .order
                .iter()
                .copied()
                .find(|index| !self.entries[index].element.is_pinned()),
            EvictionPolicy::DistanceFromReference => self
                .order
                .iter()
                .copied()
                .filter(|index| !self.entries[index].element.is_pinned())
                .max_by_key(|&index| {
                    let distance = (i64::from(index) - i64::from(self.reference_index)).abs();
                    // Equal distances fall back to the older entry.
                    (distance, std::cmp::Reverse(self.position(index)))
                }),
        }
    }

    fn position(&self, page_index: u32) -> usize {
        self.order
            .iter()
            .position(|&index| index == page_index)
            .unwrap_or(usize::MAX)
    }
}

/// Budget-bounded pool of decoded content
///
/// Thread-safe. Adding an element for a page that is already tracked
/// replaces the stale entry. `shrink_to` releases elements until the tracked
/// total fits the given limit or only pinned elements remain.
///
/// # Example
///
/// ```
/// use book_viewer_cache::{ContentPool, EvictionPolicy, MemoryElement};
///
/// struct Entry(u32, usize);
/// impl MemoryElement for Entry {
///     fn page_index(&self) -> u32 { self.0 }
///     fn content_size(&self) -> usize { self.1 }
///     fn is_pinned(&self) -> bool { false }
///     fn release(&self) {}
/// }
///
/// let pool = ContentPool::new(EvictionPolicy::DistanceFromReference);
/// pool.set_reference(5);
/// pool.add(Box::new(Entry(5, 100)));
/// pool.add(Box::new(Entry(9, 100)));
/// pool.shrink_to(150); // releases page 9, the farthest from page 5
/// assert_eq!(pool.total_size(), 100);
/// ```
pub struct ContentPool {
    policy: EvictionPolicy,
    state: Mutex<PoolState>,
}

impl ContentPool {
    /// Create an empty pool with the given eviction policy.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(PoolState {
                entries: HashMap::new(),
                order: VecDeque::new(),
                total_size: 0,
                reference_index: 0,
                evictions: 0,
            }),
        }
    }

    /// Track an element. Replaces a stale entry for the same page.
    pub fn add(&self, element: Box<dyn MemoryElement>) {
        let mut state = self.state.lock().unwrap();
        let page_index = element.page_index();
        let size = element.content_size();

        state.remove(page_index);
        state.order.push_back(page_index);
        state.total_size += size;
        state.entries.insert(page_index, PoolEntry { element, size });
    }

    /// Release elements until the tracked total is at most `limit`.
    ///
    /// Pinned elements are skipped; with only pinned elements left the pool
    /// may stay above the limit. Returns the number of bytes released.
    pub fn shrink_to(&self, limit: usize) -> usize {
        let mut state = self.state.lock().unwrap();
        let before = state.total_size;

        while state.total_size > limit {
            let Some(victim) = state.pick_victim(self.policy) else {
                break;
            };
            if let Some(entry) = state.remove(victim) {
                entry.element.release();
                state.evictions += 1;
            }
        }

        let released = before - state.total_size;
        if released > 0 {
            log::trace!("pool released {} bytes down to {}", released, state.total_size);
        }
        released
    }

    /// Release every element, pinned or not.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        for (_, entry) in state.entries.drain() {
            entry.element.release();
        }
        state.order.clear();
        state.total_size = 0;
    }

    /// Stop tracking a page without releasing its content.
    pub fn detach(&self, page_index: u32) -> bool {
        let mut state = self.state.lock().unwrap();
        state.remove(page_index).is_some()
    }

    /// Mark the page index eviction should stay away from.
    pub fn set_reference(&self, page_index: u32) {
        let mut state = self.state.lock().unwrap();
        state.reference_index = page_index;
    }

    /// Tracked total size in bytes.
    pub fn total_size(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.total_size
    }

    /// Whether the pool tracks the given page.
    pub fn contains(&self, page_index: u32) -> bool {
        let state = self.state.lock().unwrap();
        state.entries.contains_key(&page_index)
    }

    /// Number of tracked elements.
    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usage statistics snapshot.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock().unwrap();
        PoolStats {
            element_count: state.entries.len(),
            total_size: state.total_size,
            evictions: state.evictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct TestElement {
        page_index: u32,
        size: usize,
        pinned: AtomicBool,
        released: Arc<AtomicBool>,
    }

    impl TestElement {
        fn new(page_index: u32, size: usize) -> (Box<Self>, Arc<AtomicBool>) {
            let released = Arc::new(AtomicBool::new(false));
            let element = Box::new(Self {
                page_index,
                size,
                pinned: AtomicBool::new(false),
                released: Arc::clone(&released),
            });
            (element, released)
        }

        fn pinned(page_index: u32, size: usize) -> Box<Self> {
            let (element, _) = Self::new(page_index, size);
            element.pinned.store(true, Ordering::Relaxed);
            element
        }
    }

    impl MemoryElement for TestElement {
        fn page_index(&self) -> u32 {
            self.page_index
        }

        fn content_size(&self) -> usize {
            self.size
        }

        fn is_pinned(&self) -> bool {
            self.pinned.load(Ordering::Relaxed)
        }

        fn release(&self) {
            self.released.store(true, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_add_tracks_size() {
        let pool = ContentPool::new(EvictionPolicy::OldestFirst);
        pool.add(TestElement::new(0, 100).0);
        pool.add(TestElement::new(1, 200).0);

        assert_eq!(pool.total_size(), 300);
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(0));
        assert!(pool.contains(1));
    }

    #[test]
    fn test_add_replaces_same_page() {
        let pool = ContentPool::new(EvictionPolicy::OldestFirst);
        pool.add(TestElement::new(0, 100).0);
        pool.add(TestElement::new(0, 250).0);

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.total_size(), 250);
    }

    #[test]
    fn test_shrink_oldest_first() {
        let pool = ContentPool::new(EvictionPolicy::OldestFirst);
        let (first, first_released) = TestElement::new(0, 100);
        let (second, second_released) = TestElement::new(1, 100);
        pool.add(first);
        pool.add(second);

        let released = pool.shrink_to(100);
        assert_eq!(released, 100);
        assert!(first_released.load(Ordering::Relaxed));
        assert!(!second_released.load(Ordering::Relaxed));
        assert!(!pool.contains(0));
    }

    #[test]
    fn test_shrink_distance_from_reference() {
        let pool = ContentPool::new(EvictionPolicy::DistanceFromReference);
        pool.set_reference(5);

        let (near, near_released) = TestElement::new(5, 100);
        let (mid, mid_released) = TestElement::new(7, 100);
        let (far, far_released) = TestElement::new(9, 100);
        pool.add(near);
        pool.add(far);
        pool.add(mid);

        pool.shrink_to(200);
        assert!(far_released.load(Ordering::Relaxed));
        assert!(!mid_released.load(Ordering::Relaxed));
        assert!(!near_released.load(Ordering::Relaxed));

        pool.shrink_to(100);
        assert!(mid_released.load(Ordering::Relaxed));
        assert!(!near_released.load(Ordering::Relaxed));
    }

    #[test]
    fn test_reference_move_changes_victims() {
        let pool = ContentPool::new(EvictionPolicy::DistanceFromReference);
        pool.set_reference(0);
        let (low, low_released) = TestElement::new(1, 100);
        let (high, high_released) = TestElement::new(8, 100);
        pool.add(low);
        pool.add(high);

        // After jumping to the end of the book, page 1 is now the far one.
        pool.set_reference(9);
        pool.shrink_to(100);
        assert!(low_released.load(Ordering::Relaxed));
        assert!(!high_released.load(Ordering::Relaxed));
    }

    #[test]
    fn test_shrink_skips_pinned() {
        let pool = ContentPool::new(EvictionPolicy::OldestFirst);
        pool.add(TestElement::pinned(0, 100));
        let (evictable, evictable_released) = TestElement::new(1, 100);
        pool.add(evictable);

        pool.shrink_to(0);
        assert!(evictable_released.load(Ordering::Relaxed));
        // Only the pinned entry remains; the pool stays above the limit.
        assert_eq!(pool.total_size(), 100);
        assert!(pool.contains(0));
    }

    #[test]
    fn test_clear_releases_pinned_too() {
        let pool = ContentPool::new(EvictionPolicy::OldestFirst);
        pool.add(TestElement::pinned(0, 100));
        let (plain, plain_released) = TestElement::new(1, 100);
        pool.add(plain);

        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.total_size(), 0);
        assert!(plain_released.load(Ordering::Relaxed));
    }

    #[test]
    fn test_detach_keeps_content() {
        let pool = ContentPool::new(EvictionPolicy::OldestFirst);
        let (element, released) = TestElement::new(3, 100);
        pool.add(element);

        assert!(pool.detach(3));
        assert!(!released.load(Ordering::Relaxed));
        assert_eq!(pool.total_size(), 0);
        assert!(!pool.detach(3));
    }

    #[test]
    fn test_stats_count_evictions() {
        let pool = ContentPool::new(EvictionPolicy::OldestFirst);
        for page in 0..4 {
            pool.add(TestElement::new(page, 100).0);
        }

        pool.shrink_to(150);
        let stats = pool.stats();
        assert_eq!(stats.element_count, 1);
        assert_eq!(stats.total_size, 100);
        assert_eq!(stats.evictions, 3);
    }

    #[test]
    fn test_shrink_to_zero_empties_unpinned_pool() {
        let pool = ContentPool::new(EvictionPolicy::DistanceFromReference);
        for page in 0..8 {
            pool.add(TestElement::new(page, 64).0);
        }

        pool.shrink_to(0);
        assert!(pool.is_empty());
        assert_eq!(pool.total_size(), 0);
    }
}
