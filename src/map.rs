extern crate alloc;

use alloc::boxed::Box;
use core::{borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, pin::Pin, ptr::NonNull};

use cordyceps::Linked;

use crate::{iter, AvlTree, InvariantError, Links, TreeNode};

/// An ordered map based on an [AVL tree].
///
/// Keys are unique. [`insert`](AvlMap::insert) never overwrites an existing entry: the first
/// value stored under a key wins until it is removed or explicitly
/// [`replace`](AvlMap::replace)d.
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlMap<K: Ord + fmt::Debug, V> {
    tree: AvlTree<MapNode<K, V>>,
}

struct MapNode<K, V> {
    links: Links<MapNode<K, V>>,
    key: K,
    value: V,
    _unpin: PhantomPinned,
}

impl<K, V> MapNode<K, V> {
    fn boxed(key: K, value: V) -> Box<Self> {
        Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        })
    }

    fn into_pair(self: Box<Self>) -> (K, V) {
        let MapNode { key, value, .. } = *self;
        (key, value)
    }
}

unsafe impl<K, V> Linked<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug, V> TreeNode<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

fn node_pair<K, V>(node: Pin<&MapNode<K, V>>) -> (&K, &V) {
    let node = node.get_ref();
    (&node.key, &node.value)
}

impl<K: Ord + fmt::Debug, V> AvlMap<K, V> {
    /// Creates a new, empty `AvlMap`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree: -1 when empty, 0 for a single entry.
    pub fn height(&self) -> i32 {
        self.tree.height()
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and the value associated with `key`.
    #[inline]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(node_pair)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .get_mut(key)
            // SAFETY: Pinning is not structural for `node.value`.
            .map(|node| unsafe { &mut node.get_unchecked_mut().value })
    }

    /// Inserts `value` under `key` if the key is not yet present.
    ///
    /// If the key is present, the map is left unchanged and the rejected pair is handed back.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.tree
            .insert(MapNode::boxed(key, value))
            .map(MapNode::into_pair)
    }

    /// Inserts `value` under `key`, replacing and returning an existing entry with an equal key.
    pub fn replace(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.tree
            .replace(MapNode::boxed(key, value))
            .map(MapNode::into_pair)
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(node_pair)
    }

    /// Removes and returns the first key-value pair in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(MapNode::into_pair)
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(node_pair)
    }

    /// Removes and returns the last key-value pair in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(MapNode::into_pair)
    }

    /// Removes the value associated with `key` from the map.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes the entry for `key`, returning the stored key and its value.
    #[inline]
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(MapNode::into_pair)
    }

    /// Returns an iterator over the entries in ascending key order.
    pub fn iter(&self) -> MapIter<'_, K, V> {
        MapIter {
            inner: self.tree.iter(),
        }
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Checks the structure of the underlying tree. See [`AvlTree::check_invariants`].
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.tree.check_invariants()
    }
}

impl<K: Ord + fmt::Debug, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord + fmt::Debug, V> FromIterator<(K, V)> for AvlMap<K, V> {
    /// Builds a map from `iter`. For repeated keys the first pair wins.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AvlMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<'a, K: Ord + fmt::Debug, V> IntoIterator for &'a AvlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = MapIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An in-order iterator over the entries of an [`AvlMap`].
pub struct MapIter<'a, K: Ord + fmt::Debug, V> {
    inner: iter::Iter<'a, MapNode<K, V>>,
}

impl<'a, K: Ord + fmt::Debug, V> Iterator for MapIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord + fmt::Debug, V> ExactSizeIterator for MapIter<'_, K, V> {}

impl<K: Ord + fmt::Debug, V> FusedIterator for MapIter<'_, K, V> {}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::prelude::v1::*;

    use super::*;

    #[test]
    fn first_value_wins() {
        let mut map = AvlMap::new();

        assert_eq!(map.insert(1, "one"), None);
        assert_eq!(map.insert(1, "uno"), Some((1, "uno")));
        assert_eq!(map.get(&1), Some(&"one"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn replace_swaps_in_place() {
        let mut map: AvlMap<u32, &str> = [(2, "b"), (1, "a"), (3, "c")].into_iter().collect();
        let height = map.height();

        assert_eq!(map.replace(2, "B"), Some((2, "b")));
        assert_eq!(map.get(&2), Some(&"B"));
        assert_eq!(map.height(), height);
        map.check_invariants().unwrap();

        assert_eq!(map.replace(4, "d"), None);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn get_mut_and_remove() {
        let mut map: AvlMap<String, Vec<u8>> = AvlMap::new();
        map.insert("a".into(), vec![1]);
        map.insert("b".into(), vec![2]);

        map.get_mut("a").unwrap().push(10);
        assert_eq!(map.get("a"), Some(&vec![1, 10]));

        assert_eq!(map.remove_entry("a"), Some(("a".to_string(), vec![1, 10])));
        assert_eq!(map.remove("a"), None);
        assert_eq!(map.first_key_value(), map.last_key_value());
        map.check_invariants().unwrap();
    }

    #[test]
    fn iterates_in_key_order() {
        let map: AvlMap<i32, i32> = (0..50).rev().map(|k| (k, k * k)).collect();

        let keys: Vec<i32> = map.iter().map(|(&k, _)| k).collect();
        assert_eq!(keys, (0..50).collect::<Vec<_>>());
        assert!(map.iter().all(|(&k, &v)| v == k * k));
        assert_eq!(map.iter().len(), 50);
    }
}
