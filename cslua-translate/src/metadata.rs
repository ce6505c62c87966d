//! In-memory [`MetadataProvider`] backed by two name tables.
//!
//! The engine consults the provider wherever a type or method name crosses
//! into the output: generic type arguments, static method callees, object
//! creation. `MetadataMap::with_defaults` seeds the predefined C# value
//! and reference type keywords with their `System.*` spellings; callers can
//! deserialize a table from any serde format and merge their own entries
//! on top.
//!
//! [`MetadataProvider`]: crate::MetadataProvider

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{MetadataProvider, Symbol};

/// Predefined C# type keywords and their qualified spellings.
const PREDEFINED_TYPES: &[(&str, &str)] = &[
    ("bool", "System.Boolean"),
    ("byte", "System.Byte"),
    ("sbyte", "System.SByte"),
    ("short", "System.Int16"),
    ("ushort", "System.UInt16"),
    ("int", "System.Int32"),
    ("uint", "System.UInt32"),
    ("long", "System.Int64"),
    ("ulong", "System.UInt64"),
    ("float", "System.Single"),
    ("double", "System.Double"),
    ("char", "System.Char"),
    ("string", "System.String"),
    ("object", "System.Object"),
];

/// Map-backed metadata provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataMap {
    types: FxHashMap<String, String>,
    methods: FxHashMap<String, String>,
}

impl MetadataMap {
    /// Empty map: every name keeps its source spelling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map seeded with the predefined type keywords.
    pub fn with_defaults() -> Self {
        let mut map = Self::new();
        for (keyword, qualified) in PREDEFINED_TYPES {
            map.types.insert((*keyword).to_string(), (*qualified).to_string());
        }
        map
    }

    /// Override the output spelling of a type name.
    pub fn map_type(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.types.insert(from.into(), to.into());
    }

    /// Override the output spelling of a method, keyed by its qualified
    /// name (`Ns.Type.Method`).
    pub fn map_method(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.methods.insert(from.into(), to.into());
    }
}

impl MetadataProvider for MetadataMap {
    fn type_map_name(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }

    fn method_map_name(&self, symbol: &Symbol) -> Option<&str> {
        self.methods.get(&symbol.qualified_name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymbolKind;

    #[test]
    fn defaults_cover_predefined_keywords() {
        let map = MetadataMap::with_defaults();
        assert_eq!(map.type_map_name("int"), Some("System.Int32"));
        assert_eq!(map.type_map_name("string"), Some("System.String"));
        assert_eq!(map.type_map_name("Widget"), None);
    }

    #[test]
    fn method_lookup_uses_qualified_name() {
        let mut map = MetadataMap::new();
        map.map_method("System.Console.WriteLine", "print");

        let mut sym = Symbol::new(SymbolKind::Method, "WriteLine");
        sym.qualified_name = "System.Console.WriteLine".to_string();
        assert_eq!(map.method_map_name(&sym), Some("print"));
    }
}
