use core::{marker::PhantomData, pin::Pin, ptr::NonNull};

use crate::{AvlTree, Dir, Link, Links, TreeNode};

/// A read-only cursor over an [`AvlTree`].
///
/// The cursor sits either on an element or on the "ghost" position between the last element and
/// the first. Moving past either end lands on the ghost; moving again wraps around.
pub struct Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    curs: CursorRaw<T>,
    phantom: PhantomData<&'tree AvlTree<T>>,
}

impl<'tree, T> Cursor<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn first(tree: &'tree AvlTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::at_end(tree.into(), Dir::Left),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree AvlTree<T>) -> Cursor<'tree, T> {
        Cursor {
            curs: CursorRaw::at_end(tree.into(), Dir::Right),
            phantom: PhantomData,
        }
    }

    /// Moves to the element with the next larger key, or onto the ghost from the last element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.step(Dir::Right) }
    }

    /// Moves to the element with the next smaller key, or onto the ghost from the first element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.step(Dir::Left) }
    }

    /// Returns the element under the cursor, or `None` on the ghost.
    pub fn get(&self) -> Option<&'tree T> {
        self.curs.ptr.map(|p| unsafe { p.as_ref() })
    }

    /// Returns the element [`move_next`](Self::move_next) would land on.
    pub fn peek_next(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek(Dir::Right).map(|p| p.as_ref()) }
    }

    /// Returns the element [`move_prev`](Self::move_prev) would land on.
    pub fn peek_prev(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek(Dir::Left).map(|p| p.as_ref()) }
    }
}

/// A cursor over an [`AvlTree`] that can also remove elements.
///
/// Positioning works as for [`Cursor`].
pub struct CursorMut<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    curs: CursorRaw<T>,
    phantom: PhantomData<&'tree mut AvlTree<T>>,
}

impl<'tree, T> CursorMut<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn first(tree: &'tree mut AvlTree<T>) -> CursorMut<'tree, T> {
        CursorMut {
            curs: CursorRaw::at_end(tree.into(), Dir::Left),
            phantom: PhantomData,
        }
    }

    pub(crate) fn last(tree: &'tree mut AvlTree<T>) -> CursorMut<'tree, T> {
        CursorMut {
            curs: CursorRaw::at_end(tree.into(), Dir::Right),
            phantom: PhantomData,
        }
    }

    /// Returns a read-only cursor at the same position.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, T> {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Moves to the element with the next larger key, or onto the ghost from the last element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.step(Dir::Right) }
    }

    /// Moves to the element with the next smaller key, or onto the ghost from the first element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.step(Dir::Left) }
    }

    /// Returns the element under the cursor, or `None` on the ghost.
    pub fn get(&self) -> Option<&T> {
        self.curs.ptr.map(|p| unsafe { p.as_ref() })
    }

    /// Returns a pinned mutable reference to the element under the cursor.
    ///
    /// # Safety
    ///
    /// The caller must not change the element's links, nor its key in any way that changes how it
    /// compares to the other keys in the tree.
    pub unsafe fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        self.curs
            .ptr
            .map(|mut p| unsafe { Pin::new_unchecked(p.as_mut()) })
    }

    /// Returns the element [`move_next`](Self::move_next) would land on.
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { self.curs.peek(Dir::Right).map(|p| p.as_ref()) }
    }

    /// Returns the element [`move_prev`](Self::move_prev) would land on.
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { self.curs.peek(Dir::Left).map(|p| p.as_ref()) }
    }

    /// Removes the element under the cursor and moves to the next one.
    ///
    /// On the ghost this returns `None` and changes nothing.
    pub fn remove_current(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_and_step(Dir::Right) }
    }

    /// Removes the element under the cursor and moves to the previous one.
    ///
    /// On the ghost this returns `None` and changes nothing.
    pub fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_and_step(Dir::Left) }
    }
}

struct CursorRaw<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: NonNull<AvlTree<T>>,
    ptr: Link<T>,
}

impl<T> CursorRaw<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    // A cursor on the extreme element in direction `end` (`Left` is the minimum).
    fn at_end(tree: NonNull<AvlTree<T>>, end: Dir) -> CursorRaw<T> {
        CursorRaw {
            tree,
            ptr: unsafe { Self::end(tree, end) },
        }
    }

    unsafe fn end(tree: NonNull<AvlTree<T>>, end: Dir) -> Link<T> {
        let tree = unsafe { tree.as_ref() };

        match end {
            Dir::Left => tree.first_raw(),
            Dir::Right => tree.last_raw(),
        }
    }

    // The position one step in direction `dir`. From the ghost, a step enters at the opposite end.
    unsafe fn peek(&self, dir: Dir) -> Link<T> {
        unsafe {
            match self.ptr {
                Some(p) => self.tree.as_ref().neighbor_raw(p, dir),
                None => Self::end(self.tree, !dir),
            }
        }
    }

    unsafe fn step(&mut self, dir: Dir) {
        self.ptr = unsafe { self.peek(dir) };
    }

    // Removing a node only relinks the other nodes, so the neighbor the cursor moves to stays
    // valid.
    unsafe fn remove_and_step(&mut self, dir: Dir) -> Option<T::Handle> {
        let remove = self.ptr?;

        unsafe {
            self.step(dir);
            Some(self.tree.as_mut().remove_at(remove))
        }
    }
}
