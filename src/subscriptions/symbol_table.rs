use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Symbol to display-name mapping. Keys are stored uppercase and keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<(String, String)>,
    /// Key to position in `entries`.
    index: HashMap<String, usize>,
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a name. A replaced key keeps its original position.
    pub fn insert(&mut self, symbol: &str, name: impl Into<String>) -> Option<String> {
        let key = normalize_symbol(symbol);
        let name = name.into();
        match self.index.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, name)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, name));
                None
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.index
            .get(&normalize_symbol(symbol))
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(symbol, _)| symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = SymbolTable::new();
        for (symbol, name) in iter {
            table.insert(symbol.as_ref(), name);
        }
        table
    }
}

impl<'de> Deserialize<'de> for SymbolTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = SymbolTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of stock symbols to display names")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<SymbolTable, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = SymbolTable::new();
                while let Some((symbol, name)) = map.next_entry::<String, String>()? {
                    table.insert(&symbol, name);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}
