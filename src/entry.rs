/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! The key/value pair stored at a leaf.

/// A key/value pair. Stored behind a `SharedPointer` at leaves so that a
/// path copy can share the pair itself, not just clone it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Entry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub fn new(key: K, value: V) -> Entry<K, V> {
        Entry { key, value }
    }
}
