/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Bitmap-addressed dense child tables, the internal-node payload.

use crate::node::Node;
use crate::pool::{PoolError, PoolHandle};
use archery::{SharedPointer, SharedPointerKind};

/// `true` if `index` (0..32) is set in `bitmap`.
#[inline]
pub(crate) fn has(bitmap: u32, index: usize) -> bool {
    debug_assert!(index < 32, "index must be in 0..32");
    bitmap & (1 << index) != 0
}

/// The dense array offset corresponding to sparse `index`: the popcount of
/// the bits of `bitmap` strictly below `index`.
#[inline]
pub(crate) fn pos(bitmap: u32, index: usize) -> usize {
    debug_assert!(index < 32, "index must be in 0..32");
    (bitmap & ((1u32 << index) - 1)).count_ones() as usize
}

/// A densely packed, bitmap-indexed array of children.
///
/// `children.len() == bitmap.count_ones()` is maintained as an invariant by
/// every mutating method on this type; nothing outside this module
/// constructs a `Table` with a mismatched bitmap and length.
#[derive(Debug, Clone)]
pub(crate) struct Table<K, V, P: SharedPointerKind> {
    pub(crate) bitmap: u32,
    pub(crate) children: Vec<SharedPointer<Node<K, V, P>, P>>,
}

impl<K, V, P: SharedPointerKind> Table<K, V, P> {
    pub(crate) fn empty() -> Self {
        Table { bitmap: 0, children: Vec::new() }
    }

    /// Builds a one-entry table through the pool, used when a cascading
    /// split (see `node::split_leaves`) needs another level of indirection
    /// between two keys that keep colliding.
    pub(crate) fn from_single(
        index: usize,
        child: SharedPointer<Node<K, V, P>, P>,
        pool: Option<&PoolHandle<K, V, P>>,
    ) -> Result<Self, PoolError> {
        let mut buffer = acquire(pool, 1)?;
        buffer.push(child);
        Ok(Table { bitmap: 1 << index, children: buffer })
    }

    /// Builds the innermost two-entry table of a cascading split, once the
    /// two keys' hash slices finally diverge.
    pub(crate) fn from_pair(
        index_a: usize,
        child_a: SharedPointer<Node<K, V, P>, P>,
        index_b: usize,
        child_b: SharedPointer<Node<K, V, P>, P>,
        pool: Option<&PoolHandle<K, V, P>>,
    ) -> Result<Self, PoolError> {
        debug_assert_ne!(index_a, index_b, "a split only happens once indices diverge");
        let mut buffer = acquire(pool, 2)?;
        if index_a < index_b {
            buffer.push(child_a);
            buffer.push(child_b);
        } else {
            buffer.push(child_b);
            buffer.push(child_a);
        }
        Ok(Table { bitmap: (1 << index_a) | (1 << index_b), children: buffer })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn has(&self, index: usize) -> bool {
        has(self.bitmap, index)
    }

    #[inline]
    pub(crate) fn pos(&self, index: usize) -> usize {
        pos(self.bitmap, index)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&SharedPointer<Node<K, V, P>, P>> {
        if self.has(index) {
            Some(&self.children[self.pos(index)])
        } else {
            None
        }
    }

    /// Inserts a fresh child at sparse `index`, which must not already be
    /// set. Grounded on `table_extend` in the original's `hamt.c`: a new
    /// buffer is requested from the pool (falling back to a plain `Vec` if
    /// `pool` is `None`), the existing entries are copied around the
    /// insertion point, and the bitmap bit is set.
    pub(crate) fn try_extend(
        &mut self,
        index: usize,
        child: SharedPointer<Node<K, V, P>, P>,
        pool: Option<&PoolHandle<K, V, P>>,
    ) -> Result<(), PoolError> {
        let new_len = self.children.len() + 1;
        let pos = pos(self.bitmap, index);
        let mut buffer = acquire(pool, new_len)?;
        buffer.extend(self.children.drain(..pos));
        buffer.push(child);
        buffer.extend(self.children.drain(..));
        release(pool, std::mem::replace(&mut self.children, buffer));
        self.bitmap |= 1 << index;
        Ok(())
    }

    /// Removes the child at sparse `index`, which must be set. Grounded on
    /// `table_shrink` in the original.
    pub(crate) fn shrink(
        &mut self,
        index: usize,
        pool: Option<&PoolHandle<K, V, P>>,
    ) -> Result<(), PoolError> {
        let pos = pos(self.bitmap, index);
        let new_len = self.children.len() - 1;
        let mut buffer = acquire(pool, new_len)?;
        buffer.extend(self.children.drain(..pos));
        self.children.remove(0); // drop the removed entry, keep the rest
        buffer.extend(self.children.drain(..));
        release(pool, std::mem::replace(&mut self.children, buffer));
        self.bitmap &= !(1 << index);
        Ok(())
    }

    /// Returns a clone of this table for a path-copy descent. Grounded on
    /// `table_dup` in the original.
    pub(crate) fn duplicate(&self) -> Self
    where
        K: Clone,
        V: Clone,
    {
        Table { bitmap: self.bitmap, children: self.children.clone() }
    }
}

pub(crate) fn acquire<K, V, P: SharedPointerKind>(
    pool: Option<&PoolHandle<K, V, P>>,
    width: usize,
) -> Result<Vec<SharedPointer<Node<K, V, P>, P>>, PoolError> {
    // Width 0 means the table is about to become the `Table::empty()`
    // sentinel; no pool bucket covers that, so hand back a bare `Vec`
    // without dispatching to the pool at all.
    if width == 0 {
        return Ok(Vec::new());
    }
    match pool {
        Some(pool) => pool.acquire(width),
        None => {
            let mut v = Vec::new();
            v.try_reserve_exact(width).map_err(|_| PoolError::AllocationFailure)?;
            Ok(v)
        }
    }
}

pub(crate) fn release<K, V, P: SharedPointerKind>(
    pool: Option<&PoolHandle<K, V, P>>,
    buffer: Vec<SharedPointer<Node<K, V, P>, P>>,
) {
    // A zero-capacity buffer never came out of a pool (it is the
    // `Table::empty()` sentinel children vector), so it must not be
    // mistaken for a width-1 pool buffer and fed back into the freelist.
    if let Some(pool) = pool {
        if buffer.capacity() > 0 {
            pool.release(buffer);
        }
    }
    // Without a pool the buffer is simply dropped.
}
