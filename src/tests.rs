extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn tree_of(keys: &[u32]) -> AvlTree<TestNode> {
    let mut tree = AvlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    tree
}

fn preorder_keys(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.preorder().map(|node| node.key).collect()
}

fn inorder_keys(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

fn height_at(tree: &AvlTree<TestNode>, key: u32) -> i8 {
    let node = tree.get_raw(&key).expect("item not found");
    unsafe { tree.links(node).height() }
}

// Calls `f` with every permutation of `keys`.
fn for_each_permutation(keys: &mut [u32], f: &mut impl FnMut(&[u32])) {
    fn permute(keys: &mut [u32], k: usize, f: &mut impl FnMut(&[u32])) {
        if k == keys.len() {
            f(keys);
            return;
        }

        for i in k..keys.len() {
            keys.swap(k, i);
            permute(keys, k + 1, f);
            keys.swap(k, i);
        }
    }

    permute(keys, 0, f);
}

fn insert_find_all(keys: &[u32]) {
    let tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }

    model::check_tree(&tree);
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        let removed = unsafe { tree.remove_at(node) };
        assert_eq!(removed.key, *key);
        assert!(!removed.links.is_linked());
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert_eq!(tree.remove(key).map(|node| node.key), Some(*key));
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.height(), -1);
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn permutations_find() {
    for n in 2..=6 {
        let mut keys: Vec<u32> = (0..n).collect();
        for_each_permutation(&mut keys, &mut |perm| insert_find_all(perm));
    }
}

#[test]
fn permutations_remove() {
    for n in 1..=6 {
        let mut keys: Vec<u32> = (0..n).collect();
        for_each_permutation(&mut keys, &mut |perm| insert_remove_all(perm));
    }
}

#[test]
fn empty_tree() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    assert!(tree.is_empty());
    assert_eq!(tree.height(), -1);
    assert!(tree.root().is_none());
    assert!(!tree.contains_key(&10));
    assert!(tree.remove(&10).is_none());
    assert!(tree.first().is_none());
    assert!(tree.pop_last().is_none());
    assert_eq!(tree.iter().count(), 0);
    assert_eq!(tree.preorder().count(), 0);
    tree.assert_invariants();
}

#[test]
fn single_elem_is_leaf() {
    let tree = tree_of(&[7]);

    assert_eq!(tree.height(), 0);
    assert_eq!(height_at(&tree, 7), 0);
    assert_eq!(tree.root().map(|root| root.key), Some(7));
}

#[test]
fn ascending_triple_rotates_left() {
    let tree = tree_of(&[10, 20, 30]);

    assert_eq!(preorder_keys(&tree), [20, 10, 30]);
    assert_eq!(tree.height(), 1);
    assert_eq!(height_at(&tree, 10), 0);
    assert_eq!(height_at(&tree, 30), 0);
}

#[test]
fn descending_triple_rotates_right() {
    let tree = tree_of(&[30, 20, 10]);

    assert_eq!(preorder_keys(&tree), [20, 10, 30]);
    assert_eq!(tree.height(), 1);
    assert_eq!(height_at(&tree, 10), 0);
    assert_eq!(height_at(&tree, 30), 0);
}

#[test]
fn left_right_triple_rotates_twice() {
    let tree = tree_of(&[30, 10, 20]);

    assert_eq!(preorder_keys(&tree), [20, 10, 30]);
    assert_eq!(tree.height(), 1);
    assert_eq!(inorder_keys(&tree), [10, 20, 30]);
}

#[test]
fn right_left_triple_rotates_twice() {
    let tree = tree_of(&[10, 30, 20]);

    assert_eq!(preorder_keys(&tree), [20, 10, 30]);
    assert_eq!(tree.height(), 1);
    assert_eq!(inorder_keys(&tree), [10, 20, 30]);
}

#[test]
fn remove_root_with_two_children() {
    let mut tree = tree_of(&[20, 10, 30, 5, 15, 25, 35]);
    assert_eq!(tree.height(), 2);

    let removed = tree.remove(&20).expect("20 is present");
    assert_eq!(removed.key, 20);
    tree.assert_invariants();

    // The successor takes the root's place.
    assert_eq!(tree.root().map(|root| root.key), Some(25));
    assert!(!tree.contains_key(&20));
    assert_eq!(preorder_keys(&tree), [25, 10, 5, 15, 30, 35]);
    assert_eq!(inorder_keys(&tree), [5, 10, 15, 25, 30, 35]);
    assert_eq!(tree.len(), 6);
}

#[test]
fn remove_successor_deep_in_right_subtree() {
    let mut tree = tree_of(&[20, 10, 40, 5, 30, 50, 25]);

    tree.remove(&20);
    tree.assert_invariants();

    assert_eq!(tree.root().map(|root| root.key), Some(25));
    assert_eq!(inorder_keys(&tree), [5, 10, 25, 30, 40, 50]);
}

#[test]
fn remove_picks_single_rotation_for_balanced_child() {
    let mut tree = tree_of(&[20, 10, 30, 5, 15]);

    tree.remove(&30);
    tree.assert_invariants();

    // 10 had balance 0, which a single rotation handles.
    assert_eq!(preorder_keys(&tree), [10, 5, 20, 15]);
    assert_eq!(tree.height(), 2);
}

#[test]
fn remove_picks_double_rotation_for_inner_child() {
    let mut tree = tree_of(&[20, 10, 30, 15]);

    tree.remove(&30);
    tree.assert_invariants();

    assert_eq!(preorder_keys(&tree), [15, 10, 20]);
    assert_eq!(tree.height(), 1);
}

#[test]
fn remove_rebalances_up_to_root() {
    // Level order of a minimal AVL tree of height 4, which needs no rotations to build.
    let mut tree = tree_of(&[8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1]);
    assert_eq!(preorder_keys(&tree), [8, 5, 3, 2, 1, 4, 7, 6, 11, 10, 9, 12]);
    assert_eq!(tree.height(), 4);

    // Rotates at 11, which shortens the right subtree of 8 and forces a second rotation there.
    tree.remove(&12);
    tree.assert_invariants();

    assert_eq!(preorder_keys(&tree), [5, 3, 2, 1, 4, 8, 7, 6, 10, 9, 11]);
    assert_eq!(tree.height(), 3);
}

#[test]
fn duplicate_insert_is_noop() {
    let mut tree = tree_of(&[20, 10, 30, 5]);
    let before = preorder_keys(&tree);

    let rejected = tree
        .insert(TestNode::with_generation(10, 1))
        .expect("duplicate must be handed back");
    assert_eq!((rejected.key, rejected.generation), (10, 1));

    assert_eq!(tree.len(), 4);
    assert_eq!(preorder_keys(&tree), before);
    assert_eq!(tree.get(&10).map(|node| node.generation), Some(0));
    tree.assert_invariants();
}

#[test]
fn remove_absent_is_noop() {
    let mut tree = tree_of(&[20, 10, 30, 5]);
    let before = preorder_keys(&tree);

    assert!(tree.remove(&15).is_none());
    assert_eq!(tree.len(), 4);
    assert_eq!(preorder_keys(&tree), before);
}

#[test]
fn replace_keeps_shape() {
    let mut tree = tree_of(&[20, 10, 30, 5, 15]);
    let before = preorder_keys(&tree);

    let old = tree
        .replace(TestNode::with_generation(10, 3))
        .expect("10 is present");
    assert_eq!(old.generation, 0);
    assert!(!old.links.is_linked());

    assert_eq!(preorder_keys(&tree), before);
    assert_eq!(tree.get(&10).map(|node| node.generation), Some(3));
    tree.assert_invariants();

    assert!(tree.replace(TestNode::new(40)).is_none());
    assert_eq!(tree.len(), 6);
    tree.assert_invariants();
}

#[test]
fn insert_then_remove_restores_contents() {
    let mut tree = tree_of(&[50, 20, 80, 10, 30]);
    let before = inorder_keys(&tree);

    tree.insert(TestNode::new(25));
    assert!(tree.contains_key(&25));
    tree.remove(&25);

    assert_eq!(inorder_keys(&tree), before);
    tree.assert_invariants();
}

#[test]
fn ascending_inserts_fill_levels() {
    let keys: Vec<u32> = (1..=127).collect();
    let tree = tree_of(&keys);

    assert_eq!(tree.height(), 6);
    assert_eq!(tree.root().map(|root| root.key), Some(64));
}

#[test]
fn height_stays_logarithmic() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    // Multiplying by a unit modulo a prime visits every residue once, in scrambled order.
    for i in 0..1009u32 {
        tree.insert(TestNode::new(i * 337 % 1009));
        model::check_tree(&tree);
    }

    assert_eq!(tree.len(), 1009);
    assert!(tree.height() <= model::max_height(1009));

    for i in 0..1009u32 {
        assert!(tree.remove(&(i * 211 % 1009)).is_some());
        model::check_tree(&tree);
    }

    assert!(tree.is_empty());
}

#[test]
fn first_last_and_pop() {
    let mut tree = tree_of(&[4, 9, 1, 7, 3]);

    assert_eq!(tree.first().map(|node| node.key), Some(1));
    assert_eq!(tree.last().map(|node| node.key), Some(9));
    assert_eq!(tree.pop_first().map(|node| node.key), Some(1));
    assert_eq!(tree.pop_last().map(|node| node.key), Some(9));
    assert_eq!(inorder_keys(&tree), [3, 4, 7]);
    tree.assert_invariants();
}

#[test]
fn iterators_report_len() {
    let tree = tree_of(&[5, 2, 8, 1, 3]);

    let mut iter = tree.iter();
    assert_eq!(iter.len(), 5);
    iter.next();
    assert_eq!(iter.len(), 4);

    assert_eq!(tree.preorder().len(), 5);
    assert_eq!(format!("{tree:?}"), "{1, 2, 3, 5, 8}");
}

#[test]
fn entry_vacant_and_occupied() {
    let mut tree = tree_of(&[20, 10, 30]);

    match tree.entry(&25) {
        Entry::Vacant(vacant) => {
            assert_eq!(vacant.key(), &25);
            let node = unsafe { vacant.insert(TestNode::new(25)) };
            assert_eq!(node.key, 25);
        }
        Entry::Occupied(_) => panic!("25 is not present"),
    }
    tree.assert_invariants();
    assert_eq!(tree.len(), 4);

    match tree.entry(&10) {
        Entry::Occupied(mut occupied) => {
            assert_eq!(occupied.get().key, 10);
            let old = unsafe { occupied.replace(TestNode::with_generation(10, 2)) };
            assert_eq!(old.generation, 0);
            assert_eq!(occupied.get().generation, 2);
        }
        Entry::Vacant(_) => panic!("10 is present"),
    }
    tree.assert_invariants();

    match tree.entry(&30) {
        Entry::Occupied(occupied) => assert_eq!(occupied.remove().key, 30),
        Entry::Vacant(_) => panic!("30 is present"),
    }
    tree.assert_invariants();
    assert_eq!(inorder_keys(&tree), [10, 20, 25]);
    assert!(!tree.entry(&30).is_occupied());

    let node = unsafe { tree.entry(&20).or_insert_with(|| TestNode::with_generation(20, 9)) };
    assert_eq!(node.generation, 0);
    let node = unsafe { tree.entry(&5).or_insert_with(|| TestNode::new(5)) };
    assert_eq!(node.key, 5);
    tree.assert_invariants();
    assert_eq!(inorder_keys(&tree), [5, 10, 20, 25]);
}

#[test]
fn cursor_walks_and_removes() {
    let mut tree = tree_of(&[3, 1, 4, 0, 2]);

    {
        let mut cursor = tree.cursor_last();
        assert_eq!(cursor.get().map(|node| node.key), Some(4));
        cursor.move_next();
        assert!(cursor.get().is_none());
        assert_eq!(cursor.peek_next().map(|node| node.key), Some(0));
        assert_eq!(cursor.peek_prev().map(|node| node.key), Some(4));
    }

    let mut cursor = tree.cursor_first_mut();
    cursor.move_next();
    assert_eq!(cursor.remove_current().map(|node| node.key), Some(1));
    assert_eq!(cursor.get().map(|node| node.key), Some(2));
    assert_eq!(
        cursor.remove_current_and_move_prev().map(|node| node.key),
        Some(2)
    );
    assert_eq!(cursor.get().map(|node| node.key), Some(0));
    drop(cursor);

    assert_eq!(inorder_keys(&tree), [0, 3, 4]);
    tree.assert_invariants();
}

#[test]
fn clear_empties_tree() {
    let mut tree = tree_of(&[6, 2, 9, 1, 4, 8]);

    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.height(), -1);
    tree.assert_invariants();

    tree.insert(TestNode::new(3));
    assert_eq!(inorder_keys(&tree), [3]);
}

#[test]
fn detects_corrupted_height() {
    let mut tree = tree_of(&[10, 20, 30]);
    let root = tree.root.expect("tree is not empty");

    unsafe { tree.links_mut(root).set_height(5) };
    assert_eq!(
        tree.check_invariants(),
        Err(InvariantError::Height {
            key: "20".into(),
            stored: 5,
            computed: 1,
        })
    );

    unsafe { tree.links_mut(root).set_height(1) };
    assert_eq!(tree.check_invariants(), Ok(()));
}

#[test]
fn detects_wrong_len() {
    let mut tree = tree_of(&[10, 20, 30]);

    tree.len = 4;
    assert_eq!(
        tree.check_invariants(),
        Err(InvariantError::Len {
            recorded: 4,
            counted: 3,
        })
    );

    tree.len = 3;
    tree.assert_invariants();
}

#[cfg(feature = "std")]
#[test]
fn dotgraph_labels_heights() {
    let tree = tree_of(&[10, 20, 30]);
    let mut out = String::new();
    tree.dotgraph("t", &mut out).unwrap();

    assert!(out.starts_with("digraph \"graph-t\" {"));
    assert!(out.contains("\"grapht-20\" [label=\"20 (h=1, b=0)\"];"));
    assert!(out.contains("\"grapht-20\" -> \"grapht-10\";"));
    assert!(out.contains("\"grapht-10\" -> \"grapht-missing0\";"));

    let empty: AvlTree<TestNode> = AvlTree::new();
    let mut out = String::new();
    empty.dotgraph("e", &mut out).unwrap();
    assert_eq!(out, "digraph \"graph-e\" {}");
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u32..1000, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }
}
