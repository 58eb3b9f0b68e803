/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! The explicit-stack depth-first iterator over a map's entries.
//!
//! Grounded on `IterPtr`/`IterStackElement` and on `hamt_iterator`/
//! `hamt_it_next` in `hamt.c`: no native recursion is used, a `Vec` of
//! frames stands in for the call stack so that iteration depth is bounded
//! by trie depth rather than by the Rust call stack.

use crate::entry::Entry;
use crate::node::Node;
use archery::{SharedPointer, SharedPointerKind};
use core::iter::Peekable;
use core::slice;

enum Frame<'a, K, V, P: SharedPointerKind> {
    Table(Peekable<slice::Iter<'a, SharedPointer<Node<K, V, P>, P>>>),
    Leaf(&'a SharedPointer<Entry<K, V>, P>),
}

impl<'a, K, V, P: SharedPointerKind> Frame<'a, K, V, P> {
    fn new(node: &'a Node<K, V, P>) -> Self {
        match node {
            Node::Internal(table) => Frame::Table(table.children.iter().peekable()),
            Node::Leaf(entry) => Frame::Leaf(entry),
        }
    }

    fn current(&mut self) -> &'a SharedPointer<Entry<K, V>, P> {
        match self {
            Frame::Table(_) => unreachable!("a table frame is always dug through before reading"),
            Frame::Leaf(entry) => entry,
        }
    }

    /// Advances this frame; returns `true` once it is exhausted.
    fn advance(&mut self) -> bool {
        match self {
            Frame::Table(iter) => {
                iter.next();
                iter.peek().is_none()
            }
            Frame::Leaf(_) => true,
        }
    }
}

/// A depth-first iterator over the entries of a [`crate::map::HamtMap`].
pub struct Iter<'a, K, V, P: SharedPointerKind> {
    stack: Vec<Frame<'a, K, V, P>>,
    remaining: usize,
}

impl<'a, K, V, P: SharedPointerKind> Iter<'a, K, V, P> {
    pub(crate) fn new(root: &'a Node<K, V, P>, size: usize) -> Self {
        let mut stack = Vec::with_capacity(8);
        if size > 0 {
            stack.push(Frame::new(root));
        }
        let mut iter = Iter { stack, remaining: size };
        iter.dig();
        iter
    }

    /// Descends through `Table` frames until the top of the stack is a
    /// `Leaf`, or the stack empties.
    fn dig(&mut self) {
        loop {
            let next = match self.stack.last_mut() {
                Some(Frame::Table(iter)) => iter.peek().map(|node| Frame::new(node)),
                _ => None,
            };
            match next {
                Some(frame) => self.stack.push(frame),
                None => break,
            }
        }
    }

    fn advance(&mut self) {
        while let Some(mut frame) = self.stack.pop() {
            if frame.advance() {
                continue;
            }
            self.stack.push(frame);
            self.dig();
            return;
        }
    }
}

impl<'a, K, V, P: SharedPointerKind> Iterator for Iter<'a, K, V, P> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let current = self.stack.last_mut().map(Frame::current);
        self.advance();
        if current.is_some() {
            self.remaining -= 1;
        }
        current.map(|entry| (&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, P: SharedPointerKind> ExactSizeIterator for Iter<'a, K, V, P> {}
