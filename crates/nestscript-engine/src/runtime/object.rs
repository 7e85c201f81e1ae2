// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! JavaScript object representation.

use super::value::Value;
use rustc_hash::FxHashMap;

/// A plain JavaScript object: string keys in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Object {
    /// Property slots, in insertion order
    entries: Vec<(String, Value)>,
    /// Key to slot index
    index: FxHashMap<String, usize>,
}

impl Object {
    /// Creates a new empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a property value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    /// Sets a property value, keeping the original position of an
    /// existing key.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Checks if a property exists.
    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_keeps_insertion_order() {
        let mut obj = Object::new();
        obj.set("b", Value::Number(1.0));
        obj.set("a", Value::Number(2.0));
        obj.set("b", Value::Number(3.0));

        let keys: Vec<&str> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(obj.get("b"), Some(&Value::Number(3.0)));
        assert_eq!(obj.len(), 2);
        assert!(obj.has("a"));
        assert!(!obj.has("c"));
    }
}
