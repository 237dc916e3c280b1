use std::fmt::{Debug, Formatter, Result as FmtResult};

use indexmap::IndexMap;

use crate::Tag;


/// A compound tag: named child tags in insertion order.
///
/// Child names are unique by convention; insertion with an existing name
/// replaces the previous child in place. Removal preserves the order of the
/// remaining children, since downstream consumers of migrated worlds are not
/// guaranteed to be order-insensitive.
#[repr(transparent)]
#[derive(Clone, PartialEq, Default)]
pub struct TagCompound(IndexMap<String, Tag>);

impl TagCompound {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the child with the given name, if present.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tag> {
        self.0.get_mut(name)
    }

    /// Inserts the given value under the given name, replacing (in place) any
    /// previous child of that name.
    pub fn insert<K: Into<String>, T: Into<Tag>>(&mut self, name: K, value: T) {
        self.0.insert(name.into(), value.into());
    }

    /// Removes and returns the child with the given name, keeping the
    /// remaining children in insertion order.
    pub fn remove(&mut self, name: &str) -> Option<Tag> {
        self.0.shift_remove(name)
    }

    /// Renames a child in place, preserving its position.
    /// Returns false if no child has the old name.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        let Some(index) = self.0.get_index_of(old_name) else {
            return false;
        };
        if let Some((_, value)) = self.0.shift_remove_index(index) {
            self.0.shift_insert(index, new_name.to_owned(), value);
        }
        true
    }

    /// Removes every child.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Tag> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Tag> {
        self.0.iter_mut()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Tag> {
        self.0.keys()
    }
}

impl Debug for TagCompound {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl FromIterator<(String, Tag)> for TagCompound {
    fn from_iter<T: IntoIterator<Item = (String, Tag)>>(iter: T) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

impl IntoIterator for TagCompound {
    type IntoIter = indexmap::map::IntoIter<String, Tag>;
    type Item = (String, Tag);

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TagCompound {
    type IntoIter = indexmap::map::Iter<'a, String, Tag>;
    type Item = (&'a String, &'a Tag);

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_survives_removal() {
        let mut compound = TagCompound::new();
        compound.insert("a", 1i32);
        compound.insert("b", 2i32);
        compound.insert("c", 3i32);
        compound.remove("b");

        let keys: Vec<&str> = compound.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "c"]);
    }

    #[test]
    fn rename_keeps_position() {
        let mut compound = TagCompound::new();
        compound.insert("first", 1i32);
        compound.insert("old", 2i32);
        compound.insert("last", 3i32);

        assert!(compound.rename("old", "new"));
        let keys: Vec<&str> = compound.keys().map(String::as_str).collect();
        assert_eq!(keys, ["first", "new", "last"]);
        assert_eq!(compound.get("new"), Some(&Tag::Int(2)));

        assert!(!compound.rename("missing", "anything"));
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut compound = TagCompound::new();
        compound.insert("x", 1i32);
        compound.insert("y", 2i32);
        compound.insert("x", 9i32);

        let keys: Vec<&str> = compound.keys().map(String::as_str).collect();
        assert_eq!(keys, ["x", "y"]);
        assert_eq!(compound.get("x"), Some(&Tag::Int(9)));
    }
}
