use core::{borrow::Borrow, pin::Pin, ptr::NonNull};

use crate::{AvlTree, Dir, Links, TreeNode};

/// A view into a single entry in an [`AvlTree`], which may be either vacant or occupied.
///
/// Returned by [`AvlTree::entry`].
pub enum Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    Vacant(VacantEntry<'tree, 'key, T, Q>),
    Occupied(OccupiedEntry<'tree, T>),
}

impl<'tree, 'key, T, Q> Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    pub(crate) unsafe fn vacant(
        tree: &'tree mut AvlTree<T>,
        key: &'key Q,
        insert_as: InsertAs<T>,
    ) -> Self {
        Entry::Vacant(VacantEntry {
            tree,
            key,
            insert_as,
        })
    }

    pub(crate) unsafe fn occupied(tree: &'tree mut AvlTree<T>, node: NonNull<T>) -> Self {
        Entry::Occupied(OccupiedEntry { tree, node })
    }

    /// Returns `true` if an element with the entry's key is present.
    pub fn is_occupied(&self) -> bool {
        matches!(self, Entry::Occupied(_))
    }

    /// Returns the element in the entry, first inserting the item built by `make` if the entry
    /// is vacant.
    ///
    /// # Safety
    ///
    /// The item returned by `make` must have a key equal to the entry's key. The links and the
    /// key of the returned element must not be modified.
    pub unsafe fn or_insert_with<F>(self, make: F) -> Pin<&'tree mut T>
    where
        F: FnOnce() -> T::Handle,
    {
        match self {
            Entry::Vacant(vacant) => unsafe { vacant.insert(make()) },
            Entry::Occupied(mut occupied) => unsafe { occupied.get_mut() },
        }
    }
}

// The slot a vacant key would occupy.
pub(crate) enum InsertAs<T: ?Sized> {
    Root,
    Child { parent: NonNull<T>, dir: Dir },
}

pub struct VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    pub(crate) tree: &'tree mut AvlTree<T>,
    pub(crate) key: &'key Q,
    pub(crate) insert_as: InsertAs<T>,
}

impl<'tree, 'key, T, Q> VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    /// Returns the key that was used to look up this entry.
    pub fn key(&self) -> &'key Q {
        self.key
    }

    /// Inserts `item` at the key associated with this entry.
    ///
    /// The tree is rebalanced exactly as for [`AvlTree::insert`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the key returned by `item.key()` is equal to the key used to
    /// retrieve this entry.
    pub unsafe fn insert(self, item: T::Handle) -> Pin<&'tree mut T> {
        let mut ptr = T::into_ptr(item);

        unsafe {
            let item_key: &Q = ptr.as_ref().key().borrow();
            debug_assert!(self.key == item_key);

            self.tree.link_new(self.insert_as, ptr);
            Pin::new_unchecked(ptr.as_mut())
        }
    }
}

pub struct OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) tree: &'tree mut AvlTree<T>,
    pub(crate) node: NonNull<T>,
}

impl<'tree, T> OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a reference to the item in the entry.
    pub fn get(&self) -> &'tree T {
        // SAFETY: `self.tree` is mutably borrowed for `'tree`
        unsafe { self.node.as_ref() }
    }

    /// Returns a pinned mutable reference to the item in the entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure that neither the links nor the key of the mutably borrowed item are
    /// modified, as doing so may result in undefined behavior.
    pub unsafe fn get_mut(&mut self) -> Pin<&'tree mut T> {
        // SAFETY: `self.tree` is mutably borrowed for `'tree`, and `self.node` is guaranteed pinned
        // by contract with `Linked`.
        unsafe { Pin::new_unchecked(self.node.as_mut()) }
    }

    /// Puts `item` in the place of the entry's item, returning the previous item.
    ///
    /// The new item inherits the old one's position and height; the shape of the tree does not
    /// change.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `item`'s key is equivalent to the key of the existing item.
    pub unsafe fn replace(&mut self, item: T::Handle) -> T::Handle {
        let new_ptr = T::into_ptr(item);
        let old_ptr = self.node;

        // Point this entry at the new item.
        self.node = new_ptr;

        unsafe {
            debug_assert!(new_ptr.as_ref().key() == old_ptr.as_ref().key());
            self.tree.replace_at(old_ptr, new_ptr)
        }
    }

    /// Removes and returns the item pointed to by this entry.
    pub fn remove(self) -> T::Handle {
        unsafe { self.tree.remove_at(self.node) }
    }
}
