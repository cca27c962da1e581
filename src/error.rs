//! Contract violations reported by the map, its views and their iterators.

/// Errors returned when an operation is used outside its contract.
///
/// None of these are transient: each one reports a caller bug, and the map is
/// left exactly as it was before the failing call.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapError {
    /// `get_first`/`get_last` was called on a view of an empty map.
    #[error("the map is empty")]
    Empty,

    /// An iterator's `remove` was called before `next`, or twice for the same
    /// element.
    #[error("remove() requires a preceding next() that has not already been removed")]
    InvalidIteratorState,

    /// A value was written through a snapshot [`Entry`](crate::Entry).
    #[error("entries are read-only snapshots; update values through the map")]
    ImmutableEntry,
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(MapError::Empty.to_string(), "the map is empty");
        assert!(
            MapError::InvalidIteratorState
                .to_string()
                .starts_with("remove() requires")
        );
        assert!(MapError::ImmutableEntry.to_string().contains("snapshots"));
    }
}
