use std::collections::HashMap;

/// A string-keyed container that builds missing values on demand.
///
/// Entries are kept in insertion order and are never removed: a key that was
/// never asked for is simply absent. Piles nest, so `Pile<Pile<T>>` models a
/// two dimensional key space (ticker x attribute) without a fixed schema.
#[derive(Clone, Debug)]
pub struct Pile<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
    make: fn(&str) -> T,
}

impl<T> Pile<T> {
    pub fn new(make: fn(&str) -> T) -> Self {
        Pile {
            entries: Vec::new(),
            index: HashMap::new(),
            make,
        }
    }

    /// Returns the value for `key`, creating it with the factory if absent.
    pub fn get(&mut self, key: &str) -> &mut T {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                let value = (self.make)(key);
                self.entries.push((key.to_string(), value));
                let slot = self.entries.len() - 1;
                self.index.insert(key.to_string(), slot);
                slot
            }
        };
        &mut self.entries[slot].1
    }

    /// Overwrites (or inserts) the value for `key`.
    pub fn set(&mut self, key: &str, value: T) {
        match self.index.get(key) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.entries.push((key.to_string(), value));
                self.index.insert(key.to_string(), self.entries.len() - 1);
            }
        }
    }

    /// Looks `key` up without materializing it.
    pub fn peek(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Materialized entries in insertion order. Never creates anything.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a Pile<T> {
    type Item = (&'a str, &'a T);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a T)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
