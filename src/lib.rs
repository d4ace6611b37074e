//! An intrusive AVL tree.
//!
//! [`AvlTree`] stores caller-allocated nodes that embed their own [`Links`]. Ownership of a node
//! moves into the tree through its [`Linked::Handle`] and moves back out when the node is
//! removed. [`AvlSet`] and [`AvlMap`] wrap the tree for the common case of owned keys and values.

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`. A missing node has height -1, so a leaf has
//   height 0.
// - The balance factor of a node `x` is `h(right(x)) - h(left(x))`.
// - A node is left-heavy if its balance factor is negative, right-heavy if it is positive.
//
// The invariants of an AVL tree are:
// 1. Every node's stored height is `1 + max(h(left), h(right))`.
// 2. Every node's balance factor is -1, 0 or 1.
//
// Both may be violated along a single root path while an insertion or removal is in progress.
// Climbing that path and rotating wherever `|balance| == 2` restores them.

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not,
    pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;
use log::{debug, trace};

mod cursor;
#[cfg(feature = "std")]
mod debug;
mod entry;
mod error;
mod iter;
#[cfg(feature = "alloc")]
mod map;
#[cfg(feature = "alloc")]
mod set;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use cursor::{Cursor, CursorMut};
pub use entry::{Entry, OccupiedEntry, VacantEntry};
pub use error::InvariantError;
pub use iter::{Iter, Preorder};
#[cfg(feature = "alloc")]
pub use map::{AvlMap, MapIter};
#[cfg(feature = "alloc")]
pub use set::{AvlSet, SetIter, SetPreorder};

use entry::InsertAs;

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// Every node records the height of its subtree, and every node's subtrees differ in height by at
/// most one. Lookup, insertion and removal complete in _O(log(n))_ time.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// Where the descent for a key stopped.
pub(crate) enum Search<T: ?Sized> {
    Found(NonNull<T>),
    Vacant(InsertAs<T>),
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the height of the tree.
    ///
    /// The height is the number of edges on the longest path from the root to a leaf. A tree with
    /// a single element has height 0, and an empty tree has height -1.
    pub fn height(&self) -> i32 {
        i32::from(unsafe { self.height_of(self.root) })
    }

    /// Returns a reference to the root element, if any.
    pub fn root(&self) -> Option<Pin<&T>> {
        self.root
            .map(|root| unsafe { Pin::new_unchecked(root.as_ref()) })
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("tree invariant violated: {err}");
        }
    }

    /// Checks the structure of the whole tree.
    ///
    /// This walks every node, so it takes _O(n)_ time. It is meant for tests and debugging.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let Some(root) = self.root else {
            return match self.len {
                0 => Ok(()),
                recorded => Err(InvariantError::Len {
                    recorded,
                    counted: 0,
                }),
            };
        };

        unsafe {
            if self.links(root).parent().is_some() {
                return Err(InvariantError::RootHasParent {
                    key: format!("{:?}", root.as_ref().key()),
                });
            }

            let (_, counted) = self.check_invariants_at(root, None, None)?;
            if counted != self.len {
                return Err(InvariantError::Len {
                    recorded: self.len,
                    counted,
                });
            }
        }

        Ok(())
    }

    // Checks the subtree rooted at `node`, whose keys must lie strictly between `lower` and
    // `upper`. Returns the subtree's height and size.
    unsafe fn check_invariants_at<'a>(
        &'a self,
        node: NonNull<T>,
        lower: Option<&'a T::Key>,
        upper: Option<&'a T::Key>,
    ) -> Result<(i8, usize), InvariantError> {
        unsafe {
            let key: &'a T::Key = node.as_ref().key();

            if lower.is_some_and(|lo| lo >= key) || upper.is_some_and(|hi| hi <= key) {
                return Err(InvariantError::OutOfOrder {
                    key: format!("{key:?}"),
                });
            }

            let mut heights = [-1_i8; 2];
            let mut size = 1;

            for dir in [Dir::Left, Dir::Right] {
                let Some(child) = self.links(node).child(dir) else {
                    continue;
                };

                if self.links(child).parent() != Some(node) {
                    return Err(InvariantError::ParentLink {
                        key: format!("{:?}", child.as_ref().key()),
                    });
                }

                let (lo, hi) = match dir {
                    Dir::Left => (lower, Some(key)),
                    Dir::Right => (Some(key), upper),
                };

                let (child_height, child_size) = self.check_invariants_at(child, lo, hi)?;
                heights[dir as usize] = child_height;
                size += child_size;
            }

            let stored = self.links(node).height();
            let computed = 1 + heights[0].max(heights[1]);
            if stored != computed {
                return Err(InvariantError::Height {
                    key: format!("{key:?}"),
                    stored,
                    computed,
                });
            }

            let balance = heights[Dir::Right as usize] - heights[Dir::Left as usize];
            if !(-1..=1).contains(&balance) {
                return Err(InvariantError::Unbalanced {
                    key: format!("{key:?}"),
                    balance,
                });
            }

            Ok((computed, size))
        }
    }

    /// Returns `true` if the tree contains an element with the given key.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the element corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the element corresponding to `key`.
    ///
    /// The key of the element must not be modified in a way that changes its ordering.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }
    }

    // Descends towards `key`, returning either the node holding it or the vacant slot where it
    // belongs.
    pub(crate) fn search<Q>(&self, key: &Q) -> Search<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return Search::Vacant(InsertAs::Root);
        };

        loop {
            let dir = match key.cmp(unsafe { cur.as_ref() }.key().borrow()) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Search::Found(cur),
                Ordering::Greater => Dir::Right,
            };

            match unsafe { self.links(cur).child(dir) } {
                Some(child) => cur = child,
                None => return Search::Vacant(InsertAs::Child { parent: cur, dir }),
            }
        }
    }

    /// Returns the entry for `key`, which is either occupied by an element or vacant.
    pub fn entry<'tree, 'key, Q>(&'tree mut self, key: &'key Q) -> Entry<'tree, 'key, T, Q>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Search::Found(node) => unsafe { Entry::occupied(self, node) },
            Search::Vacant(insert_as) => unsafe { Entry::vacant(self, key, insert_as) },
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.first_raw()
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.last_raw()
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    pub(crate) fn first_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Left) })
    }

    pub(crate) fn last_raw(&self) -> Link<T> {
        self.root
            .map(|root| unsafe { self.extreme_in_subtree(root, Dir::Right) })
    }

    /// Returns an iterator over the elements of the tree in key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Returns an iterator over the elements of the tree in pre-order: each node is yielded before
    /// its left subtree, which is yielded before its right subtree.
    pub fn preorder(&self) -> Preorder<'_, T> {
        Preorder::new(self)
    }

    /// Returns a cursor pointing to the minimum element of the tree.
    pub fn cursor_first(&self) -> Cursor<'_, T> {
        Cursor::first(self)
    }

    /// Returns a cursor pointing to the maximum element of the tree.
    pub fn cursor_last(&self) -> Cursor<'_, T> {
        Cursor::last(self)
    }

    /// Returns a mutable cursor pointing to the minimum element of the tree.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::first(self)
    }

    /// Returns a mutable cursor pointing to the maximum element of the tree.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, T> {
        CursorMut::last(self)
    }

    /// Inserts an item into the tree.
    ///
    /// If the tree already holds an element with an equal key, the tree is left untouched and
    /// `item` is handed back.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);
        let key = unsafe { ptr.as_ref().key() };

        match self.search(key) {
            Search::Found(_) => Some(unsafe { T::from_ptr(ptr) }),
            Search::Vacant(insert_as) => {
                unsafe { self.link_new(insert_as, ptr) };
                None
            }
        }
    }

    /// Inserts an item into the tree, replacing any element with an equal key.
    ///
    /// The replaced element, if any, is returned. The new item takes over its position, so no
    /// rebalancing happens in that case.
    pub fn replace(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);
        let key = unsafe { ptr.as_ref().key() };

        match self.search(key) {
            Search::Found(old) => Some(unsafe { self.replace_at(old, ptr) }),
            Search::Vacant(insert_as) => {
                unsafe { self.link_new(insert_as, ptr) };
                None
            }
        }
    }

    // Links `ptr` into the slot described by `insert_as` and rebalances.
    //
    // # Safety
    //
    // `insert_as` must come from a search for `ptr`'s key with no intervening mutation.
    pub(crate) unsafe fn link_new(&mut self, insert_as: InsertAs<T>, ptr: NonNull<T>) {
        unsafe {
            self.links_mut(ptr).clear();

            match insert_as {
                InsertAs::Root => {
                    debug_assert!(self.root.is_none());
                    self.root = Some(ptr);
                }

                InsertAs::Child { parent, dir } => {
                    debug_assert!(self.links(parent).child(dir).is_none());
                    self.links_mut(parent).set_child(dir, Some(ptr));
                    self.links_mut(ptr).set_parent(Some(parent));
                    self.rebalance_inserted(ptr);
                }
            }
        }

        self.len += 1;
    }

    // Puts `new` in the place of `old`, which must be linked into this tree and have a key equal
    // to `new`'s key. Returns the handle of `old`.
    pub(crate) unsafe fn replace_at(&mut self, old: NonNull<T>, new: NonNull<T>) -> T::Handle {
        unsafe {
            let parent = self.links(old).parent();
            let left = self.links(old).left();
            let right = self.links(old).right();
            let height = self.links(old).height();

            let new_links = self.links_mut(new);
            new_links.set_parent(parent);
            new_links.set_left(left);
            new_links.set_right(right);
            new_links.set_height(height);

            self.replace_child_or_set_root(parent, old, Some(new));
            self.maybe_set_parent(left, Some(new));
            self.maybe_set_parent(right, Some(new));

            self.links_mut(old).clear();

            T::from_ptr(old)
        }
    }

    // Climbs from the freshly linked leaf `node`, fixing heights and rotating at the first
    // unbalanced ancestor.
    //
    // After that rotation the subtree has the height it had before the insertion, so nothing above
    // it changes. The climb also ends early at an ancestor whose height did not change.
    unsafe fn rebalance_inserted(&mut self, node: NonNull<T>) {
        unsafe {
            let key = node.as_ref().key();
            let mut opt_cur = self.links(node).parent();

            while let Some(cur) = opt_cur {
                let old_height = self.links(cur).height();
                self.update_height(cur);

                if let Some(heavy) = self.heavy_side(cur) {
                    let child = self
                        .links(cur)
                        .child(heavy)
                        .expect("heavy side of an unbalanced node must be occupied");

                    // LL/RR if the key went down the outer side of the heavy child, LR/RL if it
                    // went down the inner side.
                    let double = match heavy {
                        Dir::Left => key > child.as_ref().key(),
                        Dir::Right => key < child.as_ref().key(),
                    };

                    self.rotate_heavy(cur, heavy, double);
                    return;
                }

                if self.links(cur).height() == old_height {
                    return;
                }

                opt_cur = self.links(cur).parent();
            }
        }
    }

    // Climbs from `opt_node` to the root, fixing heights and rotating wherever needed.
    //
    // Unlike insertion, a removal can shorten the subtree on every level, so the climb always
    // reaches the root.
    unsafe fn rebalance_removed(&mut self, mut opt_node: Link<T>) {
        unsafe {
            while let Some(cur) = opt_node {
                self.update_height(cur);

                let subtree = match self.heavy_side(cur) {
                    Some(heavy) => {
                        let child = self
                            .links(cur)
                            .child(heavy)
                            .expect("heavy side of an unbalanced node must be occupied");

                        // There is no inserted key to follow here, so the heavy child's own lean
                        // decides: a child leaning the other way needs a double rotation.
                        let double = match heavy {
                            Dir::Left => self.balance(child) > 0,
                            Dir::Right => self.balance(child) < 0,
                        };

                        self.rotate_heavy(cur, heavy, double)
                    }

                    None => cur,
                };

                opt_node = self.links(subtree).parent();
            }
        }
    }

    // Rebalances `node`, whose `heavy` subtree is two levels taller than the other one.
    //
    // A single rotation handles the LL and RR cases. With `double`, the heavy child is first
    // rotated towards the heavy side, which handles the LR and RL cases.
    //
    // Returns the new root of the subtree.
    unsafe fn rotate_heavy(&mut self, node: NonNull<T>, heavy: Dir, double: bool) -> NonNull<T> {
        unsafe {
            if double {
                let child = self
                    .links(node)
                    .child(heavy)
                    .expect("double rotation requires a heavy child");
                self.rotate(child, heavy);
            }

            self.rotate(node, !heavy)
        }
    }

    // Performs a rotation, moving `down` into its own `dir` child position and raising its `!dir`
    // child `up` into its place.
    //
    // `rotate(n, Dir::Right)` is a right rotation of `n` and `rotate(n, Dir::Left)` a left
    // rotation. `up` is reattached to `down`'s former parent (or becomes the root), and the heights
    // of `down` and then `up` are recomputed. Returns `up`.
    unsafe fn rotate(&mut self, down: NonNull<T>, dir: Dir) -> NonNull<T> {
        unsafe {
            let up = self
                .links(down)
                .child(!dir)
                .expect("rotation requires a child to raise");

            trace!(
                "rotating {:?} {dir:?} under {:?}",
                down.as_ref().key(),
                up.as_ref().key()
            );

            // `across` moves from the `dir` child of `up` to the `!dir` child of `down`.
            let across = self.links(up).child(dir);
            self.links_mut(down).set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            self.links_mut(up).set_child(dir, Some(down));
            let parent = self.links_mut(down).set_parent(Some(up));
            self.links_mut(up).set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));

            // `up`'s height depends on `down`'s.
            self.update_height(down);
            self.update_height(up);

            up
        }
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum node's parent.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> (NonNull<T>, Option<NonNull<T>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { self.links(cur).left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    // Returns the node reached by following `dir` links from `root` for as long as possible.
    #[inline]
    unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(next) = unsafe { self.links(cur).child(dir) } {
            cur = next;
        }

        cur
    }

    // Returns the in-order neighbor of `node` in direction `dir` (the successor for `Right`, the
    // predecessor for `Left`).
    pub(crate) unsafe fn neighbor_raw(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        unsafe {
            if let Some(child) = self.links(node).child(dir) {
                return Some(self.extreme_in_subtree(child, !dir));
            }

            let mut cur = node;
            while let Some(parent) = self.links(cur).parent() {
                if self.links(parent).child(!dir) == Some(cur) {
                    return Some(parent);
                }

                cur = parent;
            }

            None
        }
    }

    /// Removes the element with the given key from the tree, returning it.
    ///
    /// Returns `None`, leaving the tree untouched, if no element has that key.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.first_raw()?;
        Some(unsafe { self.remove_at(first) })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.last_raw()?;
        Some(unsafe { self.remove_at(last) })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        // There are three possible cases:
        //
        // 1. `node` has two children.
        //
        //    `node`'s successor (the least node in its right subtree) takes over `node`'s position,
        //    children and height. The successor has no left child, so unlinking it from its old
        //    position is a case 2 or 3 removal there, and rebalancing starts at its old parent
        //    (or at the successor itself, if it was `node`'s right child).
        //
        // 2. `node` has one child.
        //
        //    The child is spliced into `node`'s place. Rebalancing starts at `node`'s parent.
        //
        // 3. `node` is a leaf.
        //
        //    `node` is unlinked from its parent. Rebalancing starts at the parent.

        unsafe {
            let parent = self.links(node).parent();
            let left = self.links(node).left();
            let right = self.links(node).right();

            let rebalance_from = match (left, right) {
                (Some(left), Some(right)) => {
                    let (successor, successor_parent) = self.min_in_subtree(right);

                    let from = match successor_parent {
                        Some(successor_parent) => {
                            // Elevate the successor's right child to replace it.
                            let successor_right = self.links(successor).right();
                            self.links_mut(successor_parent).set_left(successor_right);
                            self.maybe_set_parent(successor_right, Some(successor_parent));

                            self.links_mut(successor).set_right(Some(right));
                            self.links_mut(right).set_parent(Some(successor));

                            successor_parent
                        }

                        // The successor is `right` and keeps its own right subtree.
                        None => successor,
                    };

                    let height = self.links(node).height();
                    let successor_links = self.links_mut(successor);
                    successor_links.set_left(Some(left));
                    successor_links.set_parent(parent);
                    successor_links.set_height(height);
                    self.links_mut(left).set_parent(Some(successor));

                    self.replace_child_or_set_root(parent, node, Some(successor));

                    Some(from)
                }

                (Some(child), None) | (None, Some(child)) => {
                    self.replace_child_or_set_root(parent, node, Some(child));
                    self.links_mut(child).set_parent(parent);

                    parent
                }

                (None, None) => {
                    self.replace_child_or_set_root(parent, node, None);

                    parent
                }
            };

            if let Some(from) = rebalance_from {
                trace!(
                    "removed {:?}, rebalancing from {:?}",
                    node.as_ref().key(),
                    from.as_ref().key()
                );
            }

            self.rebalance_removed(rebalance_from);

            self.links_mut(node).clear();
            self.len -= 1;

            T::from_ptr(node)
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        if self.root.is_some() {
            debug!("clearing tree of {} elements", self.len);
        }

        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| self.links(cur).parent());

                let right = self.links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    #[inline]
    pub(crate) unsafe fn links<'a>(&self, node: NonNull<T>) -> &'a Links<T> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    pub(crate) unsafe fn links_mut<'a>(&mut self, node: NonNull<T>) -> &'a mut Links<T> {
        unsafe { T::links(node).as_mut() }
    }

    /// Returns the height of the subtree at `node`, or -1 if `node` is `None`.
    #[inline]
    unsafe fn height_of(&self, node: Link<T>) -> i8 {
        node.map(|n| unsafe { self.links(n).height() })
            .unwrap_or(-1)
    }

    /// Returns the balance factor of `node`.
    #[inline]
    unsafe fn balance(&self, node: NonNull<T>) -> i8 {
        unsafe {
            let links = self.links(node);
            self.height_of(links.right()) - self.height_of(links.left())
        }
    }

    // Returns the taller side of `node` if the balance invariant is violated there.
    #[inline]
    unsafe fn heavy_side(&self, node: NonNull<T>) -> Option<Dir> {
        match unsafe { self.balance(node) } {
            b if b < -1 => Some(Dir::Left),
            b if b > 1 => Some(Dir::Right),
            _ => None,
        }
    }

    #[inline]
    unsafe fn update_height(&mut self, node: NonNull<T>) {
        unsafe {
            let links = self.links(node);
            let height = 1 + self
                .height_of(links.left())
                .max(self.height_of(links.right()));
            self.links_mut(node).set_height(height);
        }
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { self.links_mut(node).set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(&mut self, parent: NonNull<T>, old_child: NonNull<T>, new_child: Link<T>) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert_eq!(
                self.links(parent).child(dir),
                Some(old_child),
                "`old_child` must be a child of `parent`"
            );
            debug_assert!(
                new_child.is_none() || self.links(parent).child(!dir) != new_child,
                "`new_child` must not be a child of `parent`"
            );

            self.links_mut(parent).set_child(dir, new_child);
        }
    }

    pub(crate) unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if unsafe { self.links(parent).left() } == Some(child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<'tree, T> IntoIterator for &'tree AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> fmt::Debug for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|node| node.key()))
            .finish()
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns `true` if this node is currently linked into a tree with other nodes.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.parent().is_some() || self.left().is_some() || self.right().is_some()
    }

    #[inline]
    fn height(&self) -> i8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_height(&mut self, height: i8) {
        self.inner.get_mut().height = height;
    }

    // Resets the links to those of a detached leaf.
    #[inline]
    fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.height = 0;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("height", &self.height())
            .finish()
    }
}
