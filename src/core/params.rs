//! Purpose: Ordered key/value mapping used for form fields, query strings and JSON bodies.
//! Exports: `Params`.
//! Role: Unvalidated passthrough; callers' fields are forwarded to the wire verbatim.
//! Invariants: Insertion order is preserved; inserting an existing key replaces it in place.
//! Invariants: No field whitelist is applied here; the server decides what it accepts.
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Params::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        if !self.contains(&key) {
            self.entries.push((key, value.to_string()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn extend(&mut self, other: &Params) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    pub fn to_json_object(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in self.iter() {
            map.insert(key.to_string(), Value::String(value.to_string()));
        }
        Value::Object(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
