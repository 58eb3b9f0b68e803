/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Hashing and the roving hash state that drives trie descent.
//!
//! The hash of a key is divided into six 5-bit slices plus two spare top
//! bits. Level `k` of the trie consumes slice `k`. Once all six slices of
//! the current 32-bit word are spent the word is recomputed against the
//! next generation, so a pathologically colliding key still eventually
//! diverges as long as the hash hook salts each generation independently.

use core::hash::{BuildHasher, Hash, Hasher};

/// Number of bits consumed per trie level; also `log2(32)`.
pub(crate) const BITS_PER_LEVEL: u32 = 5;
/// Mask selecting a single 5-bit slice.
pub(crate) const LEVEL_MASK: u32 = (1 << BITS_PER_LEVEL) - 1;
/// Once `shift` exceeds this, all 30 usable bits of the word are spent.
const MAX_SHIFT: u32 = 25;

/// `(key, generation) -> 32-bit hash`, matching the original C contract.
///
/// A blanket implementation is provided for any `BuildHasher`, salting the
/// generation into the hashed bytes; most callers will not need to
/// implement this trait themselves.
pub trait KeyHasher<H: BuildHasher> {
    fn hash_generation(&self, hasher_builder: &H, generation: u32) -> u32;
}

impl<K: Hash + ?Sized, H: BuildHasher> KeyHasher<H> for K {
    fn hash_generation(&self, hasher_builder: &H, generation: u32) -> u32 {
        let mut hasher = hasher_builder.build_hasher();
        generation.hash(&mut hasher);
        self.hash(&mut hasher);
        // `Hasher::finish` returns a `u64`; folding it keeps the full
        // entropy of a 64-bit hasher (e.g. `SipHash`) rather than
        // truncating to the low bits.
        let wide = hasher.finish();
        ((wide >> 32) as u32) ^ (wide as u32)
    }
}

/// The roving hash state threaded through a descent.
///
/// Unlike the C original, which mutates a `hash_state` in place via a
/// pointer, `advance` takes `self` by value and returns a new state — the
/// equivalent the original's own design notes call out as preferable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HashState {
    hash: u32,
    shift: u32,
    generation: u32,
}

impl HashState {
    /// Starts a descent for `key` at generation 0.
    pub(crate) fn start<K, H>(key: &K, hasher_builder: &H) -> Self
    where
        K: Hash + ?Sized,
        H: BuildHasher,
    {
        HashState { hash: key.hash_generation(hasher_builder, 0), shift: 0, generation: 0 }
    }

    /// The 5-bit index into the current level's table.
    pub(crate) fn index(&self) -> usize {
        ((self.hash >> self.shift) & LEVEL_MASK) as usize
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of `advance` calls since `start` that produced this state.
    fn depth(&self) -> u32 {
        let levels_per_generation = MAX_SHIFT / BITS_PER_LEVEL + 1;
        self.generation * levels_per_generation + self.shift / BITS_PER_LEVEL
    }

    /// Rebuilds the descent state of `key` at the same depth as `self`.
    ///
    /// A `HashState` does not retain the key it was computed from, so a
    /// cascading leaf split (`split_leaves`) that needs a second key's state
    /// at the depth of an existing one must replay it from scratch: hash
    /// `key` at generation 0 and call `advance` the same number of times
    /// this state has seen, which reproduces any generation rehashes along
    /// the way using `key`'s own hash rather than the state's original key.
    pub(crate) fn for_key_at_same_depth<K, H>(&self, key: &K, hasher_builder: &H) -> Self
    where
        K: Hash + ?Sized,
        H: BuildHasher,
    {
        let mut state = HashState::start(key, hasher_builder);
        for _ in 0..self.depth() {
            state = state.advance(key, hasher_builder);
        }
        state
    }

    /// Advances to the next level, rehashing `key` if the word is spent.
    pub(crate) fn advance<K, H>(&self, key: &K, hasher_builder: &H) -> Self
    where
        K: Hash + ?Sized,
        H: BuildHasher,
    {
        let shift = self.shift + BITS_PER_LEVEL;
        if shift > MAX_SHIFT {
            let generation = self.generation + 1;
            HashState {
                hash: key.hash_generation(hasher_builder, generation),
                shift: 0,
                generation,
            }
        } else {
            HashState { hash: self.hash, shift, generation: self.generation }
        }
    }
}
