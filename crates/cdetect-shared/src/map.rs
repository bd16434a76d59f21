//! Chained hash map that iterates in insertion order.
//!
//! Value ownership is picked through the type parameter:
//! `OrderedMap<String>` owns the values moved in by the caller (callers
//! wanting a deep copy clone before inserting), while `OrderedMap<&'a T>`
//! only borrows and the caller keeps ownership.
//!
//! Overwriting a key drops (or hands back) the previous value and keeps the
//! key at its original position in the iteration order.

pub const BUCKET_COUNT: usize = 101;

fn bucket_of(key: &str) -> usize {
    let hash = key
        .bytes()
        .fold(0u32, |hash, b| hash.wrapping_mul(31).wrapping_add(u32::from(b)));
    hash as usize % BUCKET_COUNT
}

/// Joins an optional context and a name into a single lookup key.
pub fn composite_key(context: Option<&str>, name: &str, separator: char) -> String {
    match context {
        Some(context) if !context.is_empty() => format!("{context}{separator}{name}"),
        _ => name.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    buckets: Vec<Vec<usize>>,
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        OrderedMap {
            buckets: vec![Vec::new(); BUCKET_COUNT],
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.buckets[bucket_of(key)]
            .iter()
            .copied()
            .find(|&index| self.entries[index].0 == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.index_of(key).map(|index| &self.entries[index].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.index_of(key).map(|index| &mut self.entries[index].1)
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        if let Some(index) = self.index_of(&key) {
            return Some(std::mem::replace(&mut self.entries[index].1, value));
        }
        self.buckets[bucket_of(&key)].push(self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(Vec::clear);
        self.entries.clear();
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut map = OrderedMap::new();
        for key in ["zeta", "alpha", "mid", "beta"] {
            map.insert(key, key.len());
        }
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid", "beta"]
        );
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut map = OrderedMap::new();
        map.insert("a", "1".to_string());
        map.insert("b", "2".to_string());
        let previous = map.insert("a", "3".to_string());
        assert_eq!(previous.as_deref(), Some("1"));
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![("a", &"3".to_string()), ("b", &"2".to_string())]
        );
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut map = OrderedMap::new();
        map.insert("Key", 1);
        assert_eq!(map.get("Key"), Some(&1));
        assert_eq!(map.get("key"), None);
    }

    #[test]
    fn test_many_keys_share_buckets() {
        let map: OrderedMap<usize> = (0..1000).map(|i| (format!("key{i}"), i)).collect();
        assert_eq!(map.len(), 1000);
        assert!((0..1000).all(|i| map.get(&format!("key{i}")) == Some(&i)));
    }

    #[test]
    fn test_borrowing_map() {
        let owned = vec!["x".to_string(), "y".to_string()];
        let mut map: OrderedMap<&String> = OrderedMap::new();
        map.insert("first", &owned[0]);
        map.insert("second", &owned[1]);
        assert_eq!(map.get("second").map(|s| s.as_str()), Some("y"));
        assert!(std::ptr::eq(*map.get("first").unwrap(), &owned[0]));
    }

    #[test]
    fn test_composite_key() {
        assert_eq!(composite_key(Some("m"), "sqrt", '@'), "m@sqrt");
        assert_eq!(composite_key(Some(""), "sqrt", '@'), "sqrt");
        assert_eq!(composite_key(None, "sqrt", '@'), "sqrt");
    }

    #[test]
    fn test_clear() {
        let mut map = OrderedMap::new();
        map.insert("a", 1);
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains_key("a"));
    }
}
