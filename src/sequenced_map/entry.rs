use crate::MapError;

/// A read-only snapshot of one key/value pair.
///
/// Entries are handed out by entry iterators and by the first/last accessors
/// of [`SequencedMap`](crate::sequenced_map::SequencedMap). They are copies:
/// later changes to the map are not reflected, and writing through an entry is
/// rejected. Values are changed with `put`, `put_first` or `put_last`.
///
/// # Examples
///
/// ```
/// use sequenced_map::MapError;
/// use sequenced_map::SequencedMap;
///
/// let map = SequencedMap::new();
/// map.put("a", 1);
///
/// let mut entry = map.first_entry().unwrap();
/// assert_eq!(entry.key(), &"a");
/// assert_eq!(entry.value(), &1);
/// assert_eq!(entry.set_value(2), Err(MapError::ImmutableEntry));
/// assert_eq!(map.get(&"a"), Some(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Entry { key, value }
    }

    /// The key this entry was taken from.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The value the key mapped to when the snapshot was taken.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the snapshot, returning the key and value.
    #[inline]
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }

    /// Always fails with [`MapError::ImmutableEntry`]; the snapshot and the
    /// map are both left unchanged.
    pub fn set_value(&mut self, _value: V) -> Result<V, MapError> {
        Err(MapError::ImmutableEntry)
    }
}

impl<K, V> From<Entry<K, V>> for (K, V) {
    fn from(entry: Entry<K, V>) -> Self {
        entry.into_parts()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    #[test]
    fn test_accessors() {
        let entry = Entry::new(1, String::from("one"));
        assert_eq!(entry.key(), &1);
        assert_eq!(entry.value(), "one");

        let (key, value): (i32, String) = entry.into();
        assert_eq!((key, value.as_str()), (1, "one"));
    }

    #[test]
    fn test_set_value_rejected() {
        let mut entry = Entry::new("k", 10);
        assert_eq!(entry.set_value(20), Err(MapError::ImmutableEntry));
        assert_eq!(entry.value(), &10);
    }

    #[test]
    fn test_equality_is_by_content() {
        assert_eq!(Entry::new(1, 'a'), Entry::new(1, 'a'));
        assert_ne!(Entry::new(1, 'a'), Entry::new(1, 'b'));
        assert_ne!(Entry::new(1, 'a'), Entry::new(2, 'a'));
    }
}
