#![no_main]
use libfuzzer_sys::fuzz_target;

use cordyceps_avl::model::{run_btree_equivalence, Op};

// Every step is checked against `BTreeSet` and against the AVL height bound.
fuzz_target!(|ops: Vec<Op>| { run_btree_equivalence(ops) });
