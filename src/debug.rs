extern crate std;

use core::ptr::NonNull;
use std::{collections::VecDeque, fmt, prelude::v1::*};

use crate::{AvlTree, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
{
    /// Writes the tree as a Graphviz digraph.
    ///
    /// Nodes are laid out one rank per level and labelled `key (h=height, b=balance)`. Missing
    /// children are drawn as points so that left and right stay distinguishable.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut level = VecDeque::new();
        level.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{\n"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        while !level.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _ in 0..level.len() {
                let node = match level.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let (key, height, balance, children) = unsafe {
                    let links = self.links(node);
                    (
                        node.as_ref().key(),
                        links.height(),
                        self.balance(node),
                        [links.left(), links.right()],
                    )
                };

                write!(
                    w,
                    "\"graph{name}-{key}\" [label=\"{key} (h={height}, b={balance})\"]; "
                )?;

                for child in children {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };
                            level.push_back(Item::Node(child));
                            writeln!(edges, "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";")?;
                        }

                        None => {
                            level.push_back(Item::Missing(missing));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}
