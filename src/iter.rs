use core::{iter::FusedIterator, ptr::NonNull};

use crate::{AvlTree, Dir, Link, Links, TreeNode};

enum CameFrom {
    Parent,
    LeftChild,
    Here,
    RightChild,
}

/// An in-order iterator over the elements of an [`AvlTree`].
///
/// Created by [`AvlTree::iter`].
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,

    front_cur: Link<T>,
    front_from: CameFrom,

    len: usize,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        Iter {
            tree,

            front_cur: tree.root,
            front_from: CameFrom::Parent,
            len: tree.len(),
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let mut cur = self.front_cur?;

        loop {
            match self.front_from {
                CameFrom::Parent => {
                    // Upon entering a new subtree, find the minimum element.
                    while let Some(left) = unsafe { self.tree.links(cur).left() } {
                        cur = left;
                    }

                    // Once the minimum is found, its (empty) left subtree has been exhausted.
                    self.front_from = CameFrom::LeftChild;
                }

                CameFrom::LeftChild => {
                    // The left subtree has been exhausted, so this node is up next.
                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::Here;
                    self.len -= 1;

                    return Some(unsafe { cur.as_ref() });
                }

                CameFrom::Here => {
                    // The current node was just yielded.
                    if let Some(right) = unsafe { self.tree.links(cur).right() } {
                        self.front_from = CameFrom::Parent;
                        cur = right;
                    } else if let Some(parent) = unsafe { self.tree.links(cur).parent() } {
                        self.front_from = match unsafe { self.tree.which_child(parent, cur) } {
                            Dir::Left => CameFrom::LeftChild,
                            Dir::Right => CameFrom::RightChild,
                        };

                        cur = parent;
                    } else {
                        // The root was yielded and has no right subtree.
                        self.front_cur = None;
                        return None;
                    }
                }

                CameFrom::RightChild => {
                    // Ascend until we arrive from a left child; that parent is the successor.
                    loop {
                        let Some(parent) = (unsafe { self.tree.links(cur).parent() }) else {
                            self.front_cur = None;
                            return None;
                        };

                        let dir = unsafe { self.tree.which_child(parent, cur) };
                        cur = parent;

                        if dir == Dir::Left {
                            break;
                        }
                    }

                    self.front_from = CameFrom::LeftChild;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'tree, T> {}

/// A pre-order iterator over the elements of an [`AvlTree`].
///
/// Each node is yielded before the nodes of its left subtree, which are yielded before the nodes
/// of its right subtree. Together with the in-order sequence this pins down the shape of the tree.
///
/// Created by [`AvlTree::preorder`].
pub struct Preorder<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    next: Link<T>,
    len: usize,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Preorder<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        Preorder {
            tree,
            next: tree.root,
            len: tree.len(),
        }
    }

    // Returns the node visited after `node`.
    unsafe fn following(&self, node: NonNull<T>) -> Link<T> {
        let tree = self.tree;

        unsafe {
            if let Some(child) = tree.links(node).left().or(tree.links(node).right()) {
                return Some(child);
            }

            // `node` is a leaf. Climb until some ancestor was entered through its left child and
            // still has a right subtree to visit.
            let mut cur = node;
            while let Some(parent) = tree.links(cur).parent() {
                if tree.which_child(parent, cur) == Dir::Left {
                    if let Some(right) = tree.links(parent).right() {
                        return Some(right);
                    }
                }

                cur = parent;
            }

            None
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Preorder<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        self.next = unsafe { self.following(cur) };
        self.len -= 1;

        Some(unsafe { cur.as_ref() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Preorder<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> FusedIterator for Preorder<'tree, T> {}
