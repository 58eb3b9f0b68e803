/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! The public map handle: a hash array-mapped trie supporting both
//! destructive, in-place updates and persistent, structurally-shared
//! updates over the same underlying trie.

pub mod iter;

use crate::hash::HashState;
use crate::node::{self, Inserted, Node, Removed};
use crate::pool::PoolHandle;
use crate::utils::DefaultHashBuilder;
use archery::{ArcK, RcK, SharedPointer, SharedPointerKind};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::iter::FromIterator;
use iter::Iter;

/// A hash array-mapped trie, usable both as a destructively-updated,
/// ordinary owned collection and as a persistent one whose `insert`/
/// `remove` return a new handle sharing untouched structure with `self`.
///
/// `P` selects the shared-pointer kind: `RcK` (the default, `!Send`) or
/// `ArcK` (see [`HamtMapSync`]). `H` is the key hasher, defaulting to
/// [`DefaultHashBuilder`].
#[derive(Debug)]
pub struct HamtMap<K, V, P = RcK, H: BuildHasher = DefaultHashBuilder>
where
    P: SharedPointerKind,
{
    root: SharedPointer<Node<K, V, P>, P>,
    size: usize,
    hasher_builder: H,
    pool: Option<PoolHandle<K, V, P>>,
}

/// A [`HamtMap`] built on `Arc`-backed shared pointers.
///
/// This does not currently make the map `Send`/`Sync`: the optional table
/// pool handle is `Rc`-backed for every `P`, so the whole map stays
/// `!Send` regardless of whether a pool is attached (see `DESIGN.md`'s
/// "ArcK pool sharing" note). What `ArcK` does give you is a root that
/// interoperates with other `Arc`-based structural sharing, should a
/// future pool implementation close that gap.
pub type HamtMapSync<K, V, H = DefaultHashBuilder> = HamtMap<K, V, ArcK, H>;

impl<K, V> HamtMap<K, V>
where
    K: Eq + Hash,
{
    #[must_use]
    pub fn new() -> HamtMap<K, V> {
        HamtMap::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V> HamtMapSync<K, V>
where
    K: Eq + Hash,
{
    #[must_use]
    pub fn new_sync() -> HamtMapSync<K, V> {
        HamtMap::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V, P, H> HamtMap<K, V, P, H>
where
    K: Eq + Hash,
    P: SharedPointerKind,
    H: BuildHasher + Clone,
{
    #[must_use]
    pub fn with_hasher(hasher_builder: H) -> Self {
        HamtMap { root: SharedPointer::new(Node::empty_root()), size: 0, hasher_builder, pool: None }
    }

    /// Builds an empty map backed by a shared [`PoolHandle`], so that table
    /// churn from this map and any of its persistent descendants is served
    /// from the same freelists.
    #[must_use]
    pub fn with_hasher_and_pool(hasher_builder: H, pool: PoolHandle<K, V, P>) -> Self {
        HamtMap { root: SharedPointer::new(Node::empty_root()), size: 0, hasher_builder, pool: Some(pool) }
    }

    #[must_use]
    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let state = HashState::start(key, &self.hasher_builder);
        node::get(&self.root, key, state, &self.hasher_builder)
    }

    #[must_use]
    pub fn contains_key<Q: ?Sized>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.get(key).is_some()
    }

    /// Inserts `key`/`value` in place, returning the previous value if the
    /// key was already present.
    ///
    /// # Panics
    ///
    /// Panics if the table pool cannot satisfy an allocation. Use
    /// [`HamtMap::try_insert_mut`] to handle that case explicitly.
    pub fn insert_mut(&mut self, key: K, value: V) -> Option<V>
    where
        K: Clone,
        V: Clone,
    {
        self.try_insert_mut(key, value).expect("table pool allocation failure")
    }

    /// The fallible form of [`HamtMap::insert_mut`].
    pub fn try_insert_mut(
        &mut self,
        key: K,
        value: V,
    ) -> Result<Option<V>, crate::pool::PoolError>
    where
        K: Clone,
        V: Clone,
    {
        let state = HashState::start(&key, &self.hasher_builder);
        let outcome =
            node::insert_mut(&mut self.root, key, value, state, &self.hasher_builder, self.pool.as_ref())?;
        match outcome {
            Inserted::New => {
                self.size += 1;
                Ok(None)
            }
            Inserted::Replaced(old) => Ok(Some(old)),
        }
    }

    /// Removes `key` in place, returning the removed value if it was
    /// present.
    ///
    /// # Panics
    ///
    /// Panics if the table pool cannot satisfy an allocation during
    /// gathering. Use [`HamtMap::try_remove_mut`] to handle that case
    /// explicitly.
    pub fn remove_mut<Q: ?Sized>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Eq + Hash + Clone,
        V: Clone,
        Q: Hash + Eq,
    {
        self.try_remove_mut(key).expect("table pool allocation failure")
    }

    /// The fallible form of [`HamtMap::remove_mut`].
    pub fn try_remove_mut<Q: ?Sized>(
        &mut self,
        key: &Q,
    ) -> Result<Option<V>, crate::pool::PoolError>
    where
        K: Borrow<Q> + Eq + Hash + Clone,
        V: Clone,
        Q: Hash + Eq,
    {
        let state = HashState::start(key, &self.hasher_builder);
        let outcome = node::remove_mut(
            &mut self.root,
            key,
            state,
            &self.hasher_builder,
            self.pool.as_ref(),
            true,
        )?;
        match outcome {
            Removed::NotFound => Ok(None),
            Removed::Removed(value) => {
                self.size -= 1;
                Ok(Some(value))
            }
        }
    }

    /// Returns a new map with `key`/`value` inserted, sharing every
    /// untouched subtree with `self`.
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> HamtMap<K, V, P, H>
    where
        K: Clone,
        V: Clone,
    {
        let mut new_map = self.clone();
        new_map.insert_mut(key, value);
        new_map
    }

    /// Returns a new map with `key` removed, sharing every untouched
    /// subtree with `self`.
    #[must_use]
    pub fn remove<Q: ?Sized>(&self, key: &Q) -> HamtMap<K, V, P, H>
    where
        K: Borrow<Q> + Eq + Hash + Clone,
        V: Clone,
        Q: Hash + Eq,
    {
        let mut new_map = self.clone();
        new_map.remove_mut(key);
        new_map
    }

    #[must_use]
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        Iter::new(&self.root, self.size)
    }

    #[must_use]
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    #[must_use]
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

impl<K, V, P, H> Clone for HamtMap<K, V, P, H>
where
    K: Eq + Hash,
    P: SharedPointerKind,
    H: BuildHasher + Clone,
{
    fn clone(&self) -> Self {
        HamtMap {
            root: SharedPointer::clone(&self.root),
            size: self.size,
            hasher_builder: self.hasher_builder.clone(),
            pool: self.pool.clone(),
        }
    }
}

impl<K, V, P, H> Default for HamtMap<K, V, P, H>
where
    K: Eq + Hash,
    P: SharedPointerKind,
    H: BuildHasher + Clone + Default,
{
    fn default() -> Self {
        HamtMap::with_hasher(H::default())
    }
}

impl<K, V, P, PO, H> PartialEq<HamtMap<K, V, PO, H>> for HamtMap<K, V, P, H>
where
    K: Eq + Hash,
    V: PartialEq,
    P: SharedPointerKind,
    PO: SharedPointerKind,
    H: BuildHasher + Clone,
{
    fn eq(&self, other: &HamtMap<K, V, PO, H>) -> bool {
        self.size() == other.size() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, P, H> Eq for HamtMap<K, V, P, H>
where
    K: Eq + Hash,
    V: Eq,
    P: SharedPointerKind,
    H: BuildHasher + Clone,
{
}

impl<K, V, P, H> FromIterator<(K, V)> for HamtMap<K, V, P, H>
where
    K: Eq + Hash + Clone,
    V: Clone,
    P: SharedPointerKind,
    H: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(into_iter: I) -> Self {
        let mut map = HamtMap::with_hasher(H::default());
        for (k, v) in into_iter {
            map.insert_mut(k, v);
        }
        map
    }
}

impl<'a, K, V, P, H> IntoIterator for &'a HamtMap<K, V, P, H>
where
    K: Eq + Hash,
    P: SharedPointerKind,
    H: BuildHasher + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Iter<'a, K, V, P> {
        self.iter()
    }
}

#[cfg(feature = "serde")]
pub mod serde_impl {
    use super::*;
    use ::serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use ::serde::ser::{Serialize, Serializer};
    use core::fmt;
    use core::marker::PhantomData;

    impl<K, V, P, H> Serialize for HamtMap<K, V, P, H>
    where
        K: Eq + Hash + Serialize,
        V: Serialize,
        P: SharedPointerKind,
        H: BuildHasher + Clone,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_map(self.iter())
        }
    }

    struct HamtMapVisitor<K, V, P, H> {
        marker: PhantomData<(K, V, P, H)>,
    }

    impl<'de, K, V, P, H> Visitor<'de> for HamtMapVisitor<K, V, P, H>
    where
        K: Eq + Hash + Deserialize<'de>,
        V: Deserialize<'de>,
        P: SharedPointerKind,
        H: BuildHasher + Clone + Default,
    {
        type Value = HamtMap<K, V, P, H>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = HamtMap::with_hasher(H::default());
            while let Some((k, v)) = access.next_entry()? {
                map.insert_mut(k, v);
            }
            Ok(map)
        }
    }

    impl<'de, K, V, P, H> Deserialize<'de> for HamtMap<K, V, P, H>
    where
        K: Eq + Hash + Deserialize<'de>,
        V: Deserialize<'de>,
        P: SharedPointerKind,
        H: BuildHasher + Clone + Default,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(HamtMapVisitor { marker: PhantomData })
        }
    }
}
