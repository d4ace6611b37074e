//! Model-based testing support: random operation sequences replayed against [`AvlTree`] and a
//! reference collection, with the tree's invariants checked after every step.

extern crate std;

use std::{collections::BTreeSet, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
    /// Distinguishes nodes with equal keys, so replacement is observable.
    pub generation: u32,
}

impl TestNode {
    pub fn new(key: u32) -> Box<TestNode> {
        Self::with_generation(key, 0)
    }

    pub fn with_generation(key: u32, generation: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
            generation,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// Upper bound on the height of an AVL tree holding `len` elements.
///
/// The sparsest AVL tree of a given height is a Fibonacci tree, which gives
/// `h < 1.4405 * log2(len + 2) - 0.3277`.
pub fn max_height(len: usize) -> i32 {
    (1.4405 * ((len + 2) as f64).log2() - 0.3277).floor() as i32
}

/// Asserts every structural invariant of `tree`, including the height bound.
pub fn check_tree<T: TreeNode<Links<T>> + ?Sized>(tree: &AvlTree<T>) {
    tree.assert_invariants();

    let bound = max_height(tree.len());
    assert!(
        tree.height() <= bound,
        "height {} of a tree with {} elements exceeds {bound}",
        tree.height(),
        tree.len()
    );
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Replace(ItemValue),
    Get(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    // Resolves index-based values against the keys currently in the tree, so that operations on
    // present keys are as frequent as operations on absent ones.
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) if v.is_empty() => idx as u32,
                ItemValue::Index(idx) => v[idx % v.len()],
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Replace(item) => FinalOp::Replace(get_value(sorted, item)),
            Op::Get(item) => FinalOp::Get(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Replace(u32),
    Get(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::Insert),
        value_strategy().prop_map(Op::Replace),
        value_strategy().prop_map(Op::Get),
        value_strategy().prop_map(Op::Remove),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

/// Replays `ops` against an [`AvlTree`] and a [`BTreeSet`], asserting that both agree and that
/// the tree is a valid AVL tree after every operation.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree = BTreeSet::new();
    let mut avl: AvlTree<TestNode> = AvlTree::new();

    #[inline]
    #[allow(clippy::boxed_local)]
    fn node_key(node: Box<TestNode>) -> u32 {
        node.key
    }

    #[inline]
    fn ref_key(node: &TestNode) -> &u32 {
        &node.key
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let sorted_values: Vec<u32> = btree.iter().copied().collect();
        let final_op = op.finalize(&sorted_values);

        match final_op {
            FinalOp::Insert(value) => {
                let from_btree = (!btree.insert(value)).then_some(value);
                let from_avl = avl.insert(TestNode::new(value)).map(node_key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Replace(value) => {
                let generation = op_id as u32 + 1;
                let from_btree = btree.replace(value);
                let from_avl = avl
                    .replace(TestNode::with_generation(value, generation))
                    .map(node_key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");

                let stored = avl.get(&value).map(|node| node.generation);
                assert_eq!(stored, Some(generation), "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(value) => {
                let from_btree = btree.get(&value);
                let from_avl = avl.get(&value).map(|node| ref_key(node.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(value) => {
                let from_btree = btree.remove(&value).then_some(value);
                let from_avl = avl.remove(&value).map(node_key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first();
                let from_avl = avl.first().map(|node| ref_key(node.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_avl = avl.pop_first().map(node_key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last();
                let from_avl = avl.last().map(|node| ref_key(node.get_ref()));

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_avl = avl.pop_last().map(node_key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        check_tree(&avl);
        assert_eq!(btree.len(), avl.len());
        assert!(btree.iter().eq(avl.iter().map(ref_key)));
    }
}


/// A cursor movement or edit, replayed by [`run_cursor_equivalence`].
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum CursorOp {
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    RemoveCurrent,
    RemoveCurrentMovePrev,
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
        Just(CursorOp::RemoveCurrent),
        Just(CursorOp::RemoveCurrentMovePrev),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub values: Vec<u32>,
    pub ops: Vec<CursorOp>,
}

impl<'a> Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let num_values = usize::from(u8::arbitrary(u)? % 100);
        let num_ops = usize::from(u16::arbitrary(u)? % 1000);

        // Running out of input yields defaults rather than an error, so short inputs still
        // exercise the tree.
        let mut values = Vec::with_capacity(num_values);
        for _ in 0..num_values {
            values.push(u32::arbitrary(u).unwrap_or_default());
        }

        let mut ops = Vec::with_capacity(num_ops);
        for _ in 0..num_ops {
            ops.push(CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext));
        }

        Ok(CursorEquivalenceInput { values, ops })
    }
}

// Reference cursor over a sorted, deduplicated `Vec`. `None` is the ghost position between the
// last and the first element.
struct VecCursor {
    keys: Vec<u32>,
    pos: Option<usize>,
}

impl VecCursor {
    fn new(keys: Vec<u32>) -> VecCursor {
        let pos = (!keys.is_empty()).then_some(0);
        VecCursor { keys, pos }
    }

    fn next_pos(&self) -> Option<usize> {
        match self.pos {
            Some(i) => Some(i + 1).filter(|&n| n < self.keys.len()),
            None => (!self.keys.is_empty()).then_some(0),
        }
    }

    fn prev_pos(&self) -> Option<usize> {
        match self.pos {
            Some(i) => i.checked_sub(1),
            None => self.keys.len().checked_sub(1),
        }
    }

    fn key_at(&self, pos: Option<usize>) -> Option<u32> {
        pos.map(|i| self.keys[i])
    }

    fn current(&self) -> Option<u32> {
        self.key_at(self.pos)
    }

    fn remove(&mut self, move_prev: bool) -> Option<u32> {
        let i = self.pos?;
        let removed = self.keys.remove(i);

        self.pos = if move_prev {
            i.checked_sub(1)
        } else {
            Some(i).filter(|&i| i < self.keys.len())
        };

        Some(removed)
    }
}

/// Walks a [`CursorMut`](crate::CursorMut) over a tree and a reference cursor over a sorted
/// `Vec` through `ops`, asserting that both always see the same keys.
pub fn run_cursor_equivalence(mut values: Vec<u32>, ops: Vec<CursorOp>) {
    values.sort_unstable();
    values.dedup();

    let mut avl: AvlTree<TestNode> = AvlTree::new();
    for &value in &values {
        assert!(avl.insert(TestNode::new(value)).is_none());
    }

    let mut model = VecCursor::new(values);
    let mut cursor = avl.cursor_first_mut();

    fn key_of(node: &TestNode) -> u32 {
        node.key
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        match op {
            CursorOp::MoveNext => {
                model.pos = model.next_pos();
                cursor.move_next();
            }

            CursorOp::MovePrev => {
                model.pos = model.prev_pos();
                cursor.move_prev();
            }

            CursorOp::PeekNext => {
                let expected = model.key_at(model.next_pos());
                assert_eq!(cursor.peek_next().map(key_of), expected, "op #{op_id}: {op:?}");
            }

            CursorOp::PeekPrev => {
                let expected = model.key_at(model.prev_pos());
                assert_eq!(cursor.peek_prev().map(key_of), expected, "op #{op_id}: {op:?}");
            }

            CursorOp::RemoveCurrent => {
                let expected = model.remove(false);
                let removed = cursor.remove_current().map(|node| node.key);
                assert_eq!(removed, expected, "op #{op_id}: {op:?}");
            }

            CursorOp::RemoveCurrentMovePrev => {
                let expected = model.remove(true);
                let removed = cursor.remove_current_and_move_prev().map(|node| node.key);
                assert_eq!(removed, expected, "op #{op_id}: {op:?}");
            }
        }

        assert_eq!(cursor.get().map(key_of), model.current(), "op #{op_id}: {op:?}");
    }

    drop(cursor);
    check_tree(&avl);
    assert!(model.keys.iter().eq(avl.iter().map(|node| &node.key)));
}
