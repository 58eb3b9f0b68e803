/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

/// Creates a [`HamtMap`](crate::HamtMap) containing the given entries:
///
/// ```
/// # use hamt::*;
/// let m = hamt_map![1 => "one", 2 => "two"];
/// assert_eq!(m.get(&1), Some(&"one"));
/// ```
#[macro_export]
macro_rules! hamt_map {
    ($($k:expr => $v:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut m = $crate::HamtMap::new();
        $(
            m.insert_mut($k, $v);
        )*
        m
    }};
}

/// Creates a [`HamtMapSync`](crate::HamtMapSync) containing the given
/// entries:
///
/// ```
/// # use hamt::*;
/// let m = hamt_map_sync![1 => "one", 2 => "two"];
/// assert_eq!(m.get(&1), Some(&"one"));
/// ```
#[macro_export]
macro_rules! hamt_map_sync {
    ($($k:expr => $v:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut m = $crate::HamtMapSync::new_sync();
        $(
            m.insert_mut($k, $v);
        )*
        m
    }};
}
