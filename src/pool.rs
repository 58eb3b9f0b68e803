/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! The table pool allocator: 32 size-bucketed freelists that amortise the
//! churn of the many small, variable-width child-array allocations a HAMT
//! generates.
//!
//! Grounded directly on `cache.c`. The one structural departure is forced
//! by safe Rust's ownership model: `cache.c` bump-allocates table rows out
//! of one contiguous backing chunk and hands out interior pointers into it,
//! which has no safe equivalent
//! (you cannot hand out several independently-owned, growable `Vec`s that
//! alias one allocation). Instead, a "chunk" here is a batch of
//! independently heap-allocated `Vec` buffers of the right capacity,
//! reserved together and pushed onto the freelist in one step; the
//! externally observable behaviour — chunk count growing exponentially,
//! LIFO freelist reuse, never returning memory to the allocator until the
//! whole pool drops — is unchanged.

use crate::allocator::{Allocator, NullAllocator};
use crate::node::Node;
use archery::SharedPointer;
use archery::SharedPointerKind;
use core::cell::RefCell;
use std::rc::Rc;

/// The only failure mode exposed by the pool: the backing allocator could
/// not satisfy a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    AllocationFailure,
}

impl core::fmt::Display for PoolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("table pool allocation failure")
    }
}

impl std::error::Error for PoolError {}

/// The 32-entry tunable vector of initial per-width batch sizes, plus the
/// allocator hook to attach to a pool.
///
/// The defaults are `cache.c`'s empirically derived vector: the width-1
/// pool is far larger than the others because a HAMT's leaves are
/// overwhelmingly narrow tables.
pub struct TablePoolConfig<A: Allocator = NullAllocator> {
    pub bucket_sizes: [usize; 32],
    pub allocator: A,
}

impl Default for TablePoolConfig<NullAllocator> {
    fn default() -> Self {
        TablePoolConfig {
            bucket_sizes: DEFAULT_BUCKET_SIZES,
            allocator: NullAllocator,
        }
    }
}

/// Default initial batch sizes, carried over from
/// `hamt_table_cache_default_bucket_sizes` in the original `cache.c`.
const DEFAULT_BUCKET_SIZES: [usize; 32] = [
    10000, 338900, 220200, 155800, 86700, 39500, 15000, 4900, 4900, 5200, 5000, 4900, 4700, 4600,
    4600, 4600, 4200, 4600, 4700, 4300, 4600, 4800, 4500, 5100, 5100, 5300, 5500, 5900, 7000,
    8000, 9900, 6900,
];

/// Per-width alloc/free counters, always compiled in (the original's
/// `WITH_TABLE_CACHE_STATS` preprocessor flag has no cheap Rust analogue,
/// so the fields just cost a few bytes per pool instead).
#[derive(Debug, Default, Clone, Copy)]
pub struct PoolStats {
    pub alloc_count: u64,
    pub free_count: u64,
    pub chunk_count: usize,
    pub live: usize,
}

type Children<K, V, P> = Vec<SharedPointer<Node<K, V, P>, P>>;

#[derive(Debug)]
struct Pool<K, V, P: SharedPointerKind> {
    width: usize,
    free: Vec<Children<K, V, P>>,
    next_batch: usize,
    stats: PoolStats,
}

impl<K, V, P: SharedPointerKind> Pool<K, V, P> {
    fn new(width: usize, initial_batch: usize) -> Self {
        let initial_batch = initial_batch.max(1);
        let mut pool = Pool { width, free: Vec::with_capacity(initial_batch), next_batch: initial_batch, stats: PoolStats::default() };
        pool.grow(initial_batch);
        pool.stats.chunk_count = 1;
        pool
    }

    fn grow(&mut self, count: usize) {
        self.free.reserve(count);
        for _ in 0..count {
            self.free.push(Vec::with_capacity(self.width));
        }
    }

    fn alloc(&mut self, allocator: &dyn Allocator) -> Result<Children<K, V, P>, PoolError> {
        self.stats.alloc_count += 1;
        if let Some(buf) = self.free.pop() {
            self.stats.live += 1;
            return Ok(buf);
        }
        let batch = self.next_batch;
        // Reserve `batch` buffers; keep one, push the rest onto the
        // freelist. Grounded on the chunk-doubling rule in `cache.c`.
        let mut probe = Vec::new();
        probe.try_reserve_exact(self.width).map_err(|_| PoolError::AllocationFailure)?;
        self.grow(batch - 1);
        self.stats.chunk_count += 1;
        self.next_batch = batch.saturating_mul(2);
        allocator.note_alloc(self.width, batch);
        self.stats.live += 1;
        Ok(probe)
    }

    fn free(&mut self, mut buf: Children<K, V, P>, allocator: &dyn Allocator) {
        buf.clear();
        self.free.push(buf);
        self.stats.free_count += 1;
        self.stats.live -= 1;
        allocator.note_dealloc(self.width);
    }
}

/// Owns 32 independent [`Pool`]s, one per table width `1..=32`.
#[derive(Debug)]
pub struct TablePool<K, V, P: SharedPointerKind, A: Allocator = NullAllocator> {
    pools: Vec<Pool<K, V, P>>,
    allocator: A,
}

impl<K, V, P: SharedPointerKind> TablePool<K, V, P, NullAllocator> {
    pub fn new() -> Self {
        Self::with_config(TablePoolConfig::default())
    }
}

impl<K, V, P: SharedPointerKind, A: Allocator> TablePool<K, V, P, A> {
    pub fn with_config(config: TablePoolConfig<A>) -> Self {
        let pools = (0..32)
            .map(|i| Pool::new(i + 1, config.bucket_sizes[i]))
            .collect();
        TablePool { pools, allocator: config.allocator }
    }

    pub(crate) fn acquire(&mut self, width: usize) -> Result<Children<K, V, P>, PoolError> {
        debug_assert!(width >= 1 && width <= 32, "table width must be in 1..=32");
        self.pools[width - 1].alloc(&self.allocator)
    }

    pub(crate) fn release(&mut self, buf: Children<K, V, P>) {
        let width = buf.capacity().max(1).min(32);
        self.pools[width - 1].free(buf, &self.allocator);
    }

    /// A snapshot of per-width statistics, for diagnostics and tests.
    pub fn stats(&self, width: usize) -> PoolStats {
        self.pools[width - 1].stats
    }
}

/// A shared, reference-counted handle to a [`TablePool`], so that
/// persistent descendants of a [`crate::map::HamtMap`] can keep the pool
/// alive without each owning a private copy.
#[derive(Debug)]
pub struct PoolHandle<K, V, P: SharedPointerKind> {
    inner: Rc<RefCell<TablePool<K, V, P>>>,
}

impl<K, V, P: SharedPointerKind> PoolHandle<K, V, P> {
    pub fn new(pool: TablePool<K, V, P>) -> Self {
        PoolHandle { inner: Rc::new(RefCell::new(pool)) }
    }

    pub(crate) fn acquire(&self, width: usize) -> Result<Children<K, V, P>, PoolError> {
        self.inner.borrow_mut().acquire(width)
    }

    pub(crate) fn release(&self, buf: Children<K, V, P>) {
        self.inner.borrow_mut().release(buf);
    }

    pub fn stats(&self, width: usize) -> PoolStats {
        self.inner.borrow().stats(width)
    }
}

impl<K, V, P: SharedPointerKind> Clone for PoolHandle<K, V, P> {
    fn clone(&self) -> Self {
        PoolHandle { inner: Rc::clone(&self.inner) }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use archery::RcK;

    fn small_config() -> TablePoolConfig {
        let mut sizes = [2usize; 32];
        sizes[0] = 4;
        TablePoolConfig { bucket_sizes: sizes, allocator: NullAllocator }
    }

    #[test]
    fn alloc_reuses_freed_buffers() {
        let mut pool: TablePool<&str, i32, RcK> = TablePool::with_config(small_config());
        let a = pool.acquire(1).unwrap();
        let ptr_before = a.as_ptr();
        pool.release(a);
        let b = pool.acquire(1).unwrap();
        assert_eq!(b.as_ptr(), ptr_before, "freed buffer should be handed back out, not reallocated");
    }

    #[test]
    fn chunk_count_grows_when_freelist_is_exhausted() {
        let mut pool: TablePool<&str, i32, RcK> = TablePool::with_config(small_config());
        assert_eq!(pool.stats(1).chunk_count, 1);
        let mut held = Vec::new();
        for _ in 0..4 {
            held.push(pool.acquire(1).unwrap());
        }
        assert_eq!(pool.stats(1).chunk_count, 1, "initial batch of 4 should not have triggered growth");
        // fifth allocation exhausts the initial batch of 4 and forces growth
        held.push(pool.acquire(1).unwrap());
        assert_eq!(pool.stats(1).chunk_count, 2);
    }

    #[test]
    fn live_count_tracks_outstanding_allocations() {
        let mut pool: TablePool<&str, i32, RcK> = TablePool::with_config(small_config());
        let a = pool.acquire(1).unwrap();
        let b = pool.acquire(1).unwrap();
        assert_eq!(pool.stats(1).live, 2);
        pool.release(a);
        assert_eq!(pool.stats(1).live, 1);
        pool.release(b);
        assert_eq!(pool.stats(1).live, 0);
    }

    #[test]
    fn stress_alloc_free_in_shuffled_order() {
        // A compact analogue of testable property #6: allocate until
        // several chunks exist, free in a shuffled order, and confirm the
        // freelist still serves every buffer back out.
        let mut pool: TablePool<&str, i32, RcK> = TablePool::with_config(small_config());
        let mut bufs: Vec<_> = (0..20).map(|_| pool.acquire(1).unwrap()).collect();
        assert!(pool.stats(1).chunk_count >= 3);

        // deterministic "shuffle": reverse every other pair
        for chunk in bufs.chunks_mut(2) {
            chunk.reverse();
        }
        let count_before = bufs.len();
        for buf in bufs.drain(..) {
            pool.release(buf);
        }
        assert_eq!(pool.stats(1).live, 0);

        let reacquired: Vec<_> = (0..count_before).map(|_| pool.acquire(1).unwrap()).collect();
        assert_eq!(reacquired.len(), count_before);
        assert_eq!(pool.stats(1).alloc_count as usize, count_before * 2);
    }
}
