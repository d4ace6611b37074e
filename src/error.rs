use thiserror::Error;

/// A structural invariant of an [`AvlTree`](crate::AvlTree) that does not hold.
///
/// Returned by [`AvlTree::check_invariants`](crate::AvlTree::check_invariants). Keys are
/// rendered with their `Debug` implementation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("key {key} is out of order with respect to its ancestors")]
    OutOfOrder { key: String },

    #[error("node {key} stores height {stored}, but its subtrees give height {computed}")]
    Height {
        key: String,
        stored: i8,
        computed: i8,
    },

    #[error("node {key} has balance factor {balance}")]
    Unbalanced { key: String, balance: i8 },

    #[error("node {key} does not link back to its parent")]
    ParentLink { key: String },

    #[error("root {key} has a parent link")]
    RootHasParent { key: String },

    #[error("tree records {recorded} elements but {counted} are reachable")]
    Len { recorded: usize, counted: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_node() {
        let err = InvariantError::Unbalanced {
            key: "20".into(),
            balance: 2,
        };
        assert_eq!(err.to_string(), "node 20 has balance factor 2");

        let err = InvariantError::Len {
            recorded: 3,
            counted: 2,
        };
        assert_eq!(
            err.to_string(),
            "tree records 3 elements but 2 are reachable"
        );
    }
}
