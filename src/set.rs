extern crate alloc;

use alloc::boxed::Box;
use core::{borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, pin::Pin, ptr::NonNull};

use cordyceps::Linked;

use crate::{iter, AvlTree, InvariantError, Links, TreeNode};

/// An ordered set based on an [AVL tree].
///
/// Each key lives in its own heap-allocated node. Inserting a key that is already present leaves
/// the set unchanged.
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlSet<K: Ord + fmt::Debug> {
    tree: AvlTree<SetNode<K>>,
}

struct SetNode<K> {
    links: Links<SetNode<K>>,
    key: K,
    _unpin: PhantomPinned,
}

impl<K> SetNode<K> {
    fn boxed(key: K) -> Box<Self> {
        Box::new(SetNode {
            links: Links::new(),
            key,
            _unpin: PhantomPinned,
        })
    }
}

unsafe impl<K> Linked<Links<SetNode<K>>> for SetNode<K> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<SetNode<K>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug> TreeNode<Links<SetNode<K>>> for SetNode<K> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

fn node_key<K>(node: Pin<&SetNode<K>>) -> &K {
    &node.get_ref().key
}

impl<K: Ord + fmt::Debug> AvlSet<K> {
    /// Creates a new, empty `AvlSet`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the set contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the set.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree: -1 when empty, 0 for a single element.
    pub fn height(&self) -> i32 {
        self.tree.height()
    }

    /// Returns `true` if the set contains `key`.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the element equal to `key`, if any.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(node_key)
    }

    /// Adds `key` to the set.
    ///
    /// Returns `false`, dropping `key` and leaving the stored element alone, if an equal element
    /// was already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.tree.insert(SetNode::boxed(key)).is_none()
    }

    /// Adds `key` to the set, replacing and returning an equal element if one was present.
    pub fn replace(&mut self, key: K) -> Option<K> {
        self.tree.replace(SetNode::boxed(key)).map(|node| node.key)
    }

    /// Removes `key` from the set. Returns whether it was present.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).is_some()
    }

    /// Removes and returns the element equal to `key`, if any.
    #[inline]
    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|node| node.key)
    }

    /// Returns the minimum element of the set.
    #[inline]
    pub fn first(&self) -> Option<&K> {
        self.tree.first().map(node_key)
    }

    /// Returns the maximum element of the set.
    #[inline]
    pub fn last(&self) -> Option<&K> {
        self.tree.last().map(node_key)
    }

    /// Removes and returns the minimum element of the set.
    #[inline]
    pub fn pop_first(&mut self) -> Option<K> {
        self.tree.pop_first().map(|node| node.key)
    }

    /// Removes and returns the maximum element of the set.
    #[inline]
    pub fn pop_last(&mut self) -> Option<K> {
        self.tree.pop_last().map(|node| node.key)
    }

    /// Returns an iterator over the elements in ascending order.
    pub fn iter(&self) -> SetIter<'_, K> {
        SetIter {
            inner: self.tree.iter(),
        }
    }

    /// Returns an iterator over the elements in pre-order, starting at the root.
    pub fn preorder(&self) -> SetPreorder<'_, K> {
        SetPreorder {
            inner: self.tree.preorder(),
        }
    }

    /// Clears the set, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Checks the structure of the underlying tree. See [`AvlTree::check_invariants`].
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.tree.check_invariants()
    }

    /// Writes the underlying tree as a Graphviz digraph. See [`AvlTree::dotgraph`].
    #[cfg(feature = "std")]
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, w: W) -> fmt::Result
    where
        K: fmt::Display,
    {
        self.tree.dotgraph(name, w)
    }
}

impl<K: Ord + fmt::Debug> Default for AvlSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for AvlSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord + fmt::Debug> Extend<K> for AvlSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord + fmt::Debug> FromIterator<K> for AvlSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = AvlSet::new();
        set.extend(iter);
        set
    }
}

impl<'a, K: Ord + fmt::Debug> IntoIterator for &'a AvlSet<K> {
    type Item = &'a K;
    type IntoIter = SetIter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An in-order iterator over the elements of an [`AvlSet`].
pub struct SetIter<'a, K: Ord + fmt::Debug> {
    inner: iter::Iter<'a, SetNode<K>>,
}

impl<'a, K: Ord + fmt::Debug> Iterator for SetIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| &node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord + fmt::Debug> ExactSizeIterator for SetIter<'_, K> {}

impl<K: Ord + fmt::Debug> FusedIterator for SetIter<'_, K> {}

/// A pre-order iterator over the elements of an [`AvlSet`].
pub struct SetPreorder<'a, K: Ord + fmt::Debug> {
    inner: iter::Preorder<'a, SetNode<K>>,
}

impl<'a, K: Ord + fmt::Debug> Iterator for SetPreorder<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| &node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord + fmt::Debug> ExactSizeIterator for SetPreorder<'_, K> {}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::prelude::v1::*;

    use super::*;

    #[test]
    fn duplicate_insert_keeps_first() {
        let mut set: AvlSet<u32> = [5, 3, 8].into_iter().collect();
        let before: Vec<u32> = set.preorder().copied().collect();

        assert!(!set.insert(3));
        assert_eq!(set.len(), 3);
        assert_eq!(set.preorder().copied().collect::<Vec<_>>(), before);
        set.check_invariants().unwrap();
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut set: AvlSet<u32> = (0..10).collect();
        let before: Vec<u32> = set.preorder().copied().collect();

        assert!(!set.remove(&42));
        assert_eq!(set.take(&42), None);
        assert_eq!(set.preorder().copied().collect::<Vec<_>>(), before);
    }

    #[test]
    fn first_last_pop() {
        let mut set: AvlSet<i64> = [4, -2, 9, 0].into_iter().collect();

        assert_eq!(set.first(), Some(&-2));
        assert_eq!(set.last(), Some(&9));
        assert_eq!(set.pop_first(), Some(-2));
        assert_eq!(set.pop_last(), Some(9));
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![0, 4]);
        set.check_invariants().unwrap();
    }

    #[test]
    fn borrowed_lookup() {
        let mut set = AvlSet::new();
        set.insert(String::from("pear"));
        set.insert(String::from("apple"));

        assert!(set.contains("apple"));
        assert_eq!(set.get("pear").map(String::as_str), Some("pear"));
        assert!(set.remove("apple"));
        assert!(!set.contains("apple"));
    }

    #[test]
    fn replace_returns_previous() {
        let mut set = AvlSet::new();
        assert_eq!(set.replace(7u8), None);
        assert_eq!(set.replace(7u8), Some(7));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn debug_lists_keys_in_order() {
        let set: AvlSet<u32> = [3, 1, 2].into_iter().collect();
        assert_eq!(format!("{set:?}"), "{1, 2, 3}");
    }
}
