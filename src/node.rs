/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! The recursive HAMT core: search, and the destructive insert/remove walk
//! that both the destructive and persistent public API in `crate::map`
//! share.
//!
//! Grounded on `search_recursive`, `insert_kv`/`insert_table`, and
//! `rem_recursive` in `hamt.c`, but built around a structural-sharing idiom
//! in place of that C routine's explicit path-copy recursion: there is
//! exactly one insert walk and one remove walk, both taking
//! `&mut SharedPointer<Node<..>>` and calling `SharedPointer::make_mut` on
//! every node they touch. A destructive caller holds the only reference to
//! its root, so every `make_mut` along the way is a no-op clone of nothing;
//! a persistent caller first clones its root handle (see
//! `crate::map::HamtMap::insert`) before calling the very same walk, so
//! `make_mut` clones exactly the nodes on the path being changed and leaves
//! every untouched sibling subtree shared with the source map.

use crate::entry::Entry;
use crate::hash::HashState;
use crate::pool::{PoolError, PoolHandle};
use crate::table::{self, Table};
use archery::{SharedPointer, SharedPointerKind};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};

/// A trie node: either a table of children or a single key/value pair.
///
/// The root of a `HamtMap` is always `Internal`, possibly with an empty
/// `Table`; `Leaf` only ever appears below the root, as the payload of a
/// table slot.
#[derive(Debug)]
pub(crate) enum Node<K, V, P: SharedPointerKind> {
    Leaf(SharedPointer<Entry<K, V>, P>),
    Internal(Table<K, V, P>),
}

impl<K, V, P: SharedPointerKind> Node<K, V, P> {
    pub(crate) fn empty_root() -> Self {
        Node::Internal(Table::empty())
    }

    pub(crate) fn leaf(key: K, value: V) -> Self {
        Node::Leaf(SharedPointer::new(Entry::new(key, value)))
    }
}

impl<K: Clone, V: Clone, P: SharedPointerKind> Clone for Node<K, V, P> {
    fn clone(&self) -> Self {
        match self {
            Node::Leaf(entry) => Node::Leaf(SharedPointer::clone(entry)),
            Node::Internal(table) => Node::Internal(table.duplicate()),
        }
    }
}

/// The outcome of a successful or no-op insert.
pub(crate) enum Inserted<V> {
    New,
    Replaced(V),
}

/// The outcome of a remove attempt.
pub(crate) enum Removed<V> {
    NotFound,
    Removed(V),
}

/// Looks up `key` below `node`, descending one hash slice per level.
pub(crate) fn get<'a, K, V, P, Q, H>(
    node: &'a Node<K, V, P>,
    key: &Q,
    state: HashState,
    hasher: &H,
) -> Option<&'a V>
where
    K: Borrow<Q>,
    P: SharedPointerKind,
    Q: Hash + Eq + ?Sized,
    H: BuildHasher,
{
    match node {
        Node::Leaf(entry) => {
            if entry.key.borrow() == key {
                Some(&entry.value)
            } else {
                None
            }
        }
        Node::Internal(table) => {
            let index = state.index();
            let child = table.get(index)?;
            get(child, key, state.advance(key, hasher), hasher)
        }
    }
}

/// Inserts or overwrites `key` below `this`, growing tables through `pool`
/// as needed. See the module doc for why this single walk serves both the
/// destructive and persistent public API.
pub(crate) fn insert_mut<K, V, P, H>(
    this: &mut SharedPointer<Node<K, V, P>, P>,
    key: K,
    value: V,
    state: HashState,
    hasher: &H,
    pool: Option<&PoolHandle<K, V, P>>,
) -> Result<Inserted<V>, PoolError>
where
    K: Eq + Hash + Clone,
    V: Clone,
    P: SharedPointerKind,
    H: BuildHasher,
{
    let node = SharedPointer::make_mut(this);
    match node {
        Node::Leaf(entry_ptr) => {
            if entry_ptr.key == key {
                let entry = SharedPointer::make_mut(entry_ptr);
                let old = core::mem::replace(&mut entry.value, value);
                Ok(Inserted::Replaced(old))
            } else {
                let old_entry = SharedPointer::clone(entry_ptr);
                let old_state = state.for_key_at_same_depth(&old_entry.key, hasher);
                let new_entry = Entry::new(key, value);
                let split = split_leaves(old_entry, new_entry, old_state, state, hasher, pool)?;
                *node = split;
                Ok(Inserted::New)
            }
        }
        Node::Internal(table) => {
            let index = state.index();
            if table.has(index) {
                let pos = table.pos(index);
                let next_state = state.advance(&key, hasher);
                insert_mut(&mut table.children[pos], key, value, next_state, hasher, pool)
            } else {
                let leaf = SharedPointer::new(Node::leaf(key, value));
                table.try_extend(index, leaf, pool)?;
                Ok(Inserted::New)
            }
        }
    }
}

/// Builds the subtree that replaces a leaf once a second key is found to
/// collide with it at the current level: as long as the two keys' hash
/// slices keep matching, a chain of one-entry tables is built (cascading
/// deeper, possibly across a rehash generation boundary), terminating in
/// the two-entry table where they finally diverge. Grounded on
/// `insert_table` in the original.
fn split_leaves<K, V, P, H>(
    old_entry: SharedPointer<Entry<K, V>, P>,
    new_entry: Entry<K, V>,
    mut old_state: HashState,
    mut new_state: HashState,
    hasher: &H,
    pool: Option<&PoolHandle<K, V, P>>,
) -> Result<Node<K, V, P>, PoolError>
where
    K: Eq + Hash + Clone,
    V: Clone,
    P: SharedPointerKind,
    H: BuildHasher,
{
    let mut chain = Vec::new();
    while old_state.index() == new_state.index() {
        chain.push(old_state.index());
        old_state = old_state.advance(&old_entry.key, hasher);
        new_state = new_state.advance(&new_entry.key, hasher);
    }

    let new_leaf = SharedPointer::new(Node::Leaf(SharedPointer::new(new_entry)));
    let old_leaf = SharedPointer::new(Node::Leaf(old_entry));
    let table = Table::from_pair(old_state.index(), old_leaf, new_state.index(), new_leaf, pool)?;
    let mut node = Node::Internal(table);
    for index in chain.into_iter().rev() {
        let wrapped = Table::from_single(index, SharedPointer::new(node), pool)?;
        node = Node::Internal(wrapped);
    }
    Ok(node)
}

/// Removes `key` below `this` if present, shrinking and gathering tables
/// as the shape invariants require. `is_root` suppresses the final
/// collapse-into-leaf step, since a `HamtMap`'s root must always remain an
/// `Internal` node even when it holds exactly one entry.
pub(crate) fn remove_mut<K, V, P, Q, H>(
    this: &mut SharedPointer<Node<K, V, P>, P>,
    key: &Q,
    state: HashState,
    hasher: &H,
    pool: Option<&PoolHandle<K, V, P>>,
    is_root: bool,
) -> Result<Removed<V>, PoolError>
where
    K: Borrow<Q> + Eq + Hash + Clone,
    V: Clone,
    P: SharedPointerKind,
    Q: Hash + Eq + ?Sized,
    H: BuildHasher,
{
    let node = SharedPointer::make_mut(this);
    let index = state.index();

    let result = {
        let table = match node {
            Node::Internal(table) => table,
            Node::Leaf(_) => unreachable!("remove_mut is only ever called on an internal anchor"),
        };
        if !table.has(index) {
            return Ok(Removed::NotFound);
        }
        let pos = table.pos(index);
        match &*table.children[pos] {
            Node::Leaf(entry) if entry.key.borrow() == key => {
                let value = if let Node::Leaf(entry) = &*table.children[pos] {
                    entry.value.clone()
                } else {
                    unreachable!()
                };
                table.shrink(index, pool)?;
                Removed::Removed(value)
            }
            Node::Leaf(_) => Removed::NotFound,
            Node::Internal(_) => {
                let next_state = state.advance(key, hasher);
                let result =
                    remove_mut(&mut table.children[pos], key, next_state, hasher, pool, false)?;
                if let Removed::Removed(_) = result {
                    let child_is_empty =
                        matches!(&*table.children[pos], Node::Internal(t) if t.len() == 0);
                    if child_is_empty {
                        table.shrink(index, pool)?;
                    }
                }
                result
            }
        }
    };

    if let Removed::Removed(_) = result {
        if !is_root {
            compress(node, pool);
        }
    }
    Ok(result)
}

/// Collapses an internal node holding exactly one leaf child into that
/// leaf directly, discarding the now-redundant table level. Grounded on
/// the "gather" rule of `hamt.c`'s `rem_recursive`/`table_gather`: a
/// one-entry node whose surviving child is itself internal is left alone
/// (no gather without a leaf to gather into).
fn compress<K, V, P>(node: &mut Node<K, V, P>, pool: Option<&PoolHandle<K, V, P>>)
where
    K: Clone,
    V: Clone,
    P: SharedPointerKind,
{
    let should_collapse =
        matches!(node, Node::Internal(t) if t.len() == 1 && matches!(&*t.children[0], Node::Leaf(_)));
    if !should_collapse {
        return;
    }
    if let Node::Internal(table) = node {
        let leaf = table.children.pop().expect("checked len() == 1 above");
        let freed = core::mem::take(&mut table.children);
        table::release(pool, freed);
        *node = (*leaf).clone();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::DefaultHashBuilder;
    use archery::RcK;

    fn hasher() -> DefaultHashBuilder {
        DefaultHashBuilder::default()
    }

    fn root() -> SharedPointer<Node<&'static str, i32, RcK>, RcK> {
        SharedPointer::new(Node::empty_root())
    }

    #[test]
    fn insert_then_get_round_trips() {
        let h = hasher();
        let mut r = root();
        let state = HashState::start(&"a", &h);
        insert_mut(&mut r, "a", 1, state, &h, None).unwrap();
        assert_eq!(get(&r, "a", HashState::start(&"a", &h), &h), Some(&1));
    }

    #[test]
    fn insert_overwrites_existing_key() {
        let h = hasher();
        let mut r = root();
        insert_mut(&mut r, "a", 1, HashState::start(&"a", &h), &h, None).unwrap();
        let outcome =
            insert_mut(&mut r, "a", 2, HashState::start(&"a", &h), &h, None).unwrap();
        assert!(matches!(outcome, Inserted::Replaced(1)));
        assert_eq!(get(&r, "a", HashState::start(&"a", &h), &h), Some(&2));
    }

    #[test]
    fn remove_makes_key_unreachable() {
        let h = hasher();
        let mut r = root();
        insert_mut(&mut r, "a", 1, HashState::start(&"a", &h), &h, None).unwrap();
        insert_mut(&mut r, "b", 2, HashState::start(&"b", &h), &h, None).unwrap();
        let outcome = remove_mut(&mut r, "a", HashState::start(&"a", &h), &h, None, true).unwrap();
        assert!(matches!(outcome, Removed::Removed(1)));
        assert_eq!(get(&r, "a", HashState::start(&"a", &h), &h), None);
        assert_eq!(get(&r, "b", HashState::start(&"b", &h), &h), Some(&2));
    }

    #[test]
    fn remove_missing_key_is_not_found() {
        let h = hasher();
        let mut r = root();
        insert_mut(&mut r, "a", 1, HashState::start(&"a", &h), &h, None).unwrap();
        let outcome = remove_mut(&mut r, "z", HashState::start(&"z", &h), &h, None, true).unwrap();
        assert!(matches!(outcome, Removed::NotFound));
    }

    #[test]
    fn many_distinct_keys_all_remain_reachable() {
        // Exercises whatever mix of plain inserts and cascading splits the
        // real hash function happens to produce for this key set.
        let h = hasher();
        let mut r = root();
        for i in 0..200i32 {
            let key: &'static str = Box::leak(i.to_string().into_boxed_str());
            insert_mut(&mut r, key, i, HashState::start(key, &h), &h, None).unwrap();
        }
        for i in 0..200i32 {
            let key = i.to_string();
            assert_eq!(get(&r, key.as_str(), HashState::start(key.as_str(), &h), &h), Some(&i));
        }
    }

    #[test]
    fn remove_collapses_a_two_leaf_sibling_into_one_level() {
        let h = hasher();
        let mut r = root();
        insert_mut(&mut r, "a", 1, HashState::start(&"a", &h), &h, None).unwrap();
        insert_mut(&mut r, "b", 2, HashState::start(&"b", &h), &h, None).unwrap();
        insert_mut(&mut r, "c", 3, HashState::start(&"c", &h), &h, None).unwrap();
        remove_mut(&mut r, "a", HashState::start(&"a", &h), &h, None, true).unwrap();
        assert_eq!(get(&r, "b", HashState::start(&"b", &h), &h), Some(&2));
        assert_eq!(get(&r, "c", HashState::start(&"c", &h), &h), Some(&3));
        assert_eq!(get(&r, "a", HashState::start(&"a", &h), &h), None);
    }

    // `0` and `1638` are real `i32` keys that collide under
    // `DefaultHashBuilder` at trie depth 0 and depth 1, then diverge at
    // depth 2 (indices 28 vs 19), forcing `split_leaves` to build a
    // two-level chain of one-entry tables before the leaves separate.
    // `2000` shares neither of those depth-0/1 indices, so it lands as an
    // ordinary sibling at the root. Confirmed by replaying this crate's
    // exact FNV-1a/generation-fold hashing outside of this test.
    const COLLIDING_KEY_A: i32 = 0;
    const COLLIDING_KEY_B: i32 = 1638;
    const NON_COLLIDING_KEY: i32 = 2000;

    fn int_root() -> SharedPointer<Node<i32, i32, RcK>, RcK> {
        SharedPointer::new(Node::empty_root())
    }

    #[test]
    fn cascading_split_keeps_both_colliding_keys_reachable() {
        let h = hasher();
        let mut r = int_root();
        insert_mut(&mut r, COLLIDING_KEY_A, 10, HashState::start(&COLLIDING_KEY_A, &h), &h, None)
            .unwrap();
        let outcome = insert_mut(
            &mut r,
            COLLIDING_KEY_B,
            20,
            HashState::start(&COLLIDING_KEY_B, &h),
            &h,
            None,
        )
        .unwrap();
        assert!(matches!(outcome, Inserted::New));
        insert_mut(
            &mut r,
            NON_COLLIDING_KEY,
            30,
            HashState::start(&NON_COLLIDING_KEY, &h),
            &h,
            None,
        )
        .unwrap();

        assert_eq!(get(&r, &COLLIDING_KEY_A, HashState::start(&COLLIDING_KEY_A, &h), &h), Some(&10));
        assert_eq!(get(&r, &COLLIDING_KEY_B, HashState::start(&COLLIDING_KEY_B, &h), &h), Some(&20));
        assert_eq!(
            get(&r, &NON_COLLIDING_KEY, HashState::start(&NON_COLLIDING_KEY, &h), &h),
            Some(&30)
        );
    }

    #[test]
    fn removing_one_colliding_leaf_gathers_the_split_chain_away() {
        let h = hasher();
        let mut r = int_root();
        insert_mut(&mut r, COLLIDING_KEY_A, 10, HashState::start(&COLLIDING_KEY_A, &h), &h, None)
            .unwrap();
        insert_mut(&mut r, COLLIDING_KEY_B, 20, HashState::start(&COLLIDING_KEY_B, &h), &h, None)
            .unwrap();
        insert_mut(
            &mut r,
            NON_COLLIDING_KEY,
            30,
            HashState::start(&NON_COLLIDING_KEY, &h),
            &h,
            None,
        )
        .unwrap();

        let outcome =
            remove_mut(&mut r, &COLLIDING_KEY_A, HashState::start(&COLLIDING_KEY_A, &h), &h, None, true)
                .unwrap();
        assert!(matches!(outcome, Removed::Removed(10)));

        // The two-level chain built for the surviving colliding key should
        // have gathered back into a bare leaf directly under the root,
        // leaving the root with exactly its two remaining leaf children.
        assert!(matches!(&*r, Node::Internal(t)
            if t.children.len() == 2 && t.children.iter().all(|c| matches!(&**c, Node::Leaf(_)))));
        assert_eq!(get(&r, &COLLIDING_KEY_A, HashState::start(&COLLIDING_KEY_A, &h), &h), None);
        assert_eq!(get(&r, &COLLIDING_KEY_B, HashState::start(&COLLIDING_KEY_B, &h), &h), Some(&20));
        assert_eq!(
            get(&r, &NON_COLLIDING_KEY, HashState::start(&NON_COLLIDING_KEY, &h), &h),
            Some(&30)
        );
    }
}
