use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use log::debug;

use crate::error::Result;

use super::RBTree;

/// Ordered map: a red-black tree keeps the key order, a hash map holds the values.
///
/// Every write goes to the tree first and then to the hash map, so both always hold the same
/// key set. Lookups go straight to the hash map; the tree is only walked for ordered access.
pub struct TreeMap<K, V> {
    order: RBTree<K, ()>,
    values: HashMap<K, V>,
}

impl<K, V> TreeMap<K, V>
where
    K: Clone + Hash + Eq + PartialOrd,
{
    pub fn new() -> Self {
        Self {
            order: RBTree::new(),
            values: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value stored for `key`, or `None` if there is none.
    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.get(key)
    }

    pub fn find_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.get_mut(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.contains_key(key)
    }

    /// Inserts `key` unless it is already present; an existing value is kept.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool> {
        if !self.order.insert(key.clone(), ())? {
            return Ok(false);
        }
        self.values.insert(key, value);
        Ok(true)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + PartialOrd + ?Sized,
    {
        if !self.order.delete(key)? {
            return Ok(None);
        }
        let value = self.values.remove(key);
        if value.is_none() {
            debug!("key was ordered but had no value");
        }
        Ok(value)
    }

    pub fn delete<Q>(&mut self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + PartialOrd + ?Sized,
    {
        Ok(self.remove(key)?.is_some())
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.values.clear();
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order.iter().filter_map(|(key, ())| self.values.get_key_value(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        let (key, ()) = self.order.first()?;
        self.values.get_key_value(key)
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let (key, ()) = self.order.last()?;
        self.values.get_key_value(key)
    }
}

impl<K, V> Default for TreeMap<K, V>
where
    K: Clone + Hash + Eq + PartialOrd,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for TreeMap<K, V>
where
    K: Clone + Hash + Eq + PartialOrd + fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_logging, TreeError};

    fn letters(keys: &[i32]) -> TreeMap<i32, char> {
        let mut map = TreeMap::new();
        for &k in keys {
            let letter = char::from(b'a' + (k - 1) as u8);
            assert!(map.insert(k, letter).unwrap());
        }
        map
    }

    #[test]
    fn find_on_empty_map_is_none() {
        test_logging::init();
        let map = TreeMap::<i32, char>::new();
        assert_eq!(map.find(&1), None);
    }

    #[test]
    fn find_missing_and_present() {
        test_logging::init();
        let map = letters(&[1, 2, 3, 4, 5]);
        assert_eq!(map.find(&6), None);
        assert_eq!(map.find(&3), Some(&'c'));
    }

    #[test]
    fn insert_reaches_both_structures() {
        test_logging::init();
        let map = letters(&[1, 2]);
        assert!(map.order.contains_key(&2));
        assert_eq!(map.values.get(&2), Some(&'b'));
        assert_eq!(map.order.len(), map.values.len());
    }

    #[test]
    fn insert_never_overwrites() {
        test_logging::init();
        let mut map = letters(&[1]);
        assert!(!map.insert(1, 'z').unwrap());
        assert_eq!(map.find(&1), Some(&'a'));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn delete_missing_is_false() {
        test_logging::init();
        let mut map = TreeMap::<i32, char>::new();
        assert!(!map.delete(&1).unwrap());
        assert_eq!(map.find(&1), None);
    }

    #[test]
    fn delete_from_both_structures() {
        test_logging::init();
        let mut map = letters(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(map.remove(&3).unwrap(), Some('c'));
        assert_eq!(map.find(&3), None);
        assert!(!map.order.contains_key(&3));
        map.order.check().unwrap();
    }

    #[test]
    fn iterates_values_in_key_order() {
        test_logging::init();
        let map = letters(&[1, 3, 5, 7, 9, 11, 13, 6]);
        let values: String = map.values().collect();
        assert_eq!(values, "acefgikm");
    }

    #[test]
    fn iterates_after_delete() {
        test_logging::init();
        let mut map = letters(&[1, 3, 5, 7, 9, 11, 13, 6]);
        assert!(map.delete(&5).unwrap());
        let values: String = map.values().collect();
        assert_eq!(values, "acfgikm");
        assert_eq!(map.first(), Some((&1, &'a')));
        assert_eq!(map.last(), Some((&13, &'m')));
    }

    #[test]
    fn borrowed_string_keys() {
        test_logging::init();
        let mut map = TreeMap::new();
        map.insert(String::from("pear"), 2).unwrap();
        map.insert(String::from("apple"), 1).unwrap();
        assert_eq!(map.find("apple"), Some(&1));
        *map.find_mut("pear").unwrap() += 1;
        assert!(map.delete("apple").unwrap());
        assert_eq!(format!("{map:?}"), r#"{"pear": 3}"#);
    }

    #[test]
    fn invalid_key_leaves_map_untouched() {
        test_logging::init();
        #[derive(Clone, PartialEq, Eq, Hash)]
        struct Unordered;
        impl PartialOrd for Unordered {
            fn partial_cmp(&self, _: &Self) -> Option<std::cmp::Ordering> {
                None
            }
        }

        let mut map = TreeMap::new();
        assert_eq!(map.insert(Unordered, 1), Err(TreeError::InvalidKey));
        assert!(map.is_empty());
        assert_eq!(map.iter().count(), 0);
    }
}
