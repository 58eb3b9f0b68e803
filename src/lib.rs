/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! A persistent and destructive hash array-mapped trie.
//!
//! [`HamtMap`] supports both ordinary, destructive `&mut self` updates and
//! persistent `&self` updates that return a new handle sharing untouched
//! structure with the source, in the spirit of `std::collections::HashMap`
//! and persistent trie crates like `rpds` respectively. A companion
//! [`pool::TablePool`] amortises the allocation churn both styles of update
//! generate.
//!
//! # Example
//!
//! ```
//! use hamt::HamtMap;
//!
//! let mut m = HamtMap::new();
//! m.insert_mut("pineapple", 3);
//! assert_eq!(m.get("pineapple"), Some(&3));
//!
//! let m2 = m.insert("mango", 5);
//! assert_eq!(m.get("mango"), None);
//! assert_eq!(m2.get("mango"), Some(&5));
//! ```

pub mod allocator;
pub mod hash;
pub mod map;
pub mod pool;

mod entry;
mod macros;
mod node;
mod table;
mod utils;

pub use allocator::{Allocator, NullAllocator};
pub use entry::Entry;
pub use map::{HamtMap, HamtMapSync};
pub use pool::{PoolError, PoolHandle, PoolStats, TablePool, TablePoolConfig};
pub use utils::{DefaultHashBuilder, Fnv1a};
