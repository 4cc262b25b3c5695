use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct List {
    pub id: String,
    pub name: String,
    pub items: Vec<Value>,
}

/// Result of resolving a user supplied list index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListIndex {
    /// Zero-based position.
    At(usize),
    All,
    Invalid,
}

impl List {
    pub fn new(id: &str, name: &str) -> List {
        List {
            id: id.to_string(),
            name: name.to_string(),
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn insert(&mut self, index: usize, value: Value) {
        if index <= self.items.len() {
            self.items.insert(index, value);
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Value> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn replace(&mut self, index: usize, value: Value) {
        if let Some(item) = self.items.get_mut(index) {
            *item = value;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Zero-based position of the first item equal to `value`.
    pub fn index_of(&self, value: &Value) -> Option<usize> {
        self.items.iter().position(|item| item == value)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.index_of(value).is_some()
    }

    /// Resolves a block-level index (1-based number, `last`, `random`/`any`,
    /// `all`) against a list of `length` items. `random` draws a fraction in
    /// `[0, 1)` from `random`.
    pub fn resolve_index(
        index: &Value,
        length: usize,
        accept_all: bool,
        random: impl FnOnce() -> f64,
    ) -> ListIndex {
        if let Value::String(text) = index {
            match text.as_str() {
                "all" => {
                    return if accept_all {
                        ListIndex::All
                    } else {
                        ListIndex::Invalid
                    }
                }
                "last" => {
                    return if length > 0 {
                        ListIndex::At(length - 1)
                    } else {
                        ListIndex::Invalid
                    }
                }
                "random" | "any" => {
                    return if length > 0 {
                        ListIndex::At(((random() * length as f64).floor() as usize).min(length - 1))
                    } else {
                        ListIndex::Invalid
                    }
                }
                _ => {}
            }
        }
        let index = index.to_number().floor();
        if index < 1. || index > length as f64 {
            ListIndex::Invalid
        } else {
            ListIndex::At(index as usize - 1)
        }
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let single_letters = self
            .items
            .iter()
            .all(|item| matches!(item, Value::String(s) if s.chars().count() == 1));
        let separator = if single_letters { "" } else { " " };
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, "{separator}")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}
