//! Ordered key/value mapping used for parsed env files.

use std::collections::HashMap;

/// A mapping from variable name to value that remembers insertion order.
///
/// Re-inserting a key replaces its value in place, so the last occurrence in a
/// file wins while the key keeps the position where it first appeared.
/// Equality ignores order.
#[derive(Debug, Clone, Default)]
pub struct EnvMap {
  entries: Vec<(String, String)>,
  index: HashMap<String, usize>,
}

impl EnvMap {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts a variable, returning the previous value if the key was present.
  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    let key = key.into();
    let value = value.into();

    if let Some(&pos) = self.index.get(&key) {
      return Some(std::mem::replace(&mut self.entries[pos].1, value));
    }

    self.index.insert(key.clone(), self.entries.len());
    self.entries.push((key, value));
    None
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .index
      .get(key)
      .map(|&pos| self.entries[pos].1.as_str())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.index.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  /// Returns the entries of `self` whose keys are absent from `other`,
  /// in the order they appear in `self`.
  pub fn difference(&self, other: &EnvMap) -> EnvMap {
    self
      .iter()
      .filter(|(key, _)| !other.contains_key(key))
      .collect()
  }
}

impl PartialEq for EnvMap {
  fn eq(&self, other: &Self) -> bool {
    self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
  }
}

impl Eq for EnvMap {}

impl<K, V> FromIterator<(K, V)> for EnvMap
where
  K: Into<String>,
  V: Into<String>,
{
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut map = EnvMap::new();
    map.extend(iter);
    map
  }
}

impl<K, V> Extend<(K, V)> for EnvMap
where
  K: Into<String>,
  V: Into<String>,
{
  fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
    for (key, value) in iter {
      self.insert(key, value);
    }
  }
}

impl IntoIterator for EnvMap {
  type Item = (String, String);
  type IntoIter = std::vec::IntoIter<(String, String)>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.into_iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_last_write_wins_keeps_first_position() {
    let mut map = EnvMap::new();
    assert_eq!(map.insert("A", "1"), None);
    assert_eq!(map.insert("B", "2"), None);
    assert_eq!(map.insert("A", "3"), Some("1".to_string()));

    assert_eq!(map.len(), 2);
    assert_eq!(map.get("A"), Some("3"));
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["A", "B"]);
  }

  #[test]
  fn test_equality_ignores_order() {
    let left: EnvMap = [("A", "1"), ("B", "2")].into_iter().collect();
    let right: EnvMap = [("B", "2"), ("A", "1")].into_iter().collect();
    assert_eq!(left, right);

    let different: EnvMap = [("A", "1"), ("B", "x")].into_iter().collect();
    assert_ne!(left, different);
  }

  #[test]
  fn test_difference() {
    let source: EnvMap = [("FOO", "bar"), ("BAZ", "qux"), ("NEW", "1")]
      .into_iter()
      .collect();
    let target: EnvMap = [("FOO", "existing")].into_iter().collect();

    let diff = source.difference(&target);
    assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["BAZ", "NEW"]);
    assert_eq!(diff.get("BAZ"), Some("qux"));
    assert!(!diff.contains_key("FOO"));

    assert!(target.difference(&source).is_empty());
  }
}
