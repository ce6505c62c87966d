//! Symbol and type data behind the [`SemanticModel`] queries.
//!
//! A [`Symbol`] is the identity of a declared entity, flattened to exactly
//! the attributes the transformation consults: kinds, names, modifier
//! flags, constant values, parameter shapes. Resolution itself lives in the
//! model implementation, not here.
//!
//! [`SemanticModel`]: crate::SemanticModel

use cslua_repr::LuaLiteral;
use serde::{Deserialize, Serialize};

/// What a symbol declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Local,
    Parameter,
    TypeParameter,
    Label,
    NamedType,
    Field,
    Method,
    Property,
    Event,
}

/// Declared accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accessibility {
    Public,
    Internal,
    Protected,
    Private,
}

impl Accessibility {
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

/// One declared parameter of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    /// Has a default value.
    pub is_optional: bool,
    /// Declared `ref` or `out`.
    pub is_ref_or_out: bool,
}

/// Shallow type classification for expressions and declared members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Display name, qualified where known.
    pub name: String,
    pub is_value_type: bool,
    pub is_bool: bool,
    pub is_string: bool,
    /// The type has a visible definition (so `<Name>.default()` exists).
    pub has_definition: bool,
}

impl TypeRef {
    /// Reference type with the given name.
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_value_type: false,
            is_bool: false,
            is_string: false,
            has_definition: false,
        }
    }

    /// Value type with the given name.
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_value_type: true,
            is_bool: false,
            is_string: false,
            has_definition: false,
        }
    }

    /// Can an expression of this type evaluate to `nil` or `false`?
    ///
    /// Decides between the `(cond and t) or f` ternary shortcut and the
    /// if/else expansion.
    pub fn may_be_falsey(&self) -> bool {
        !self.is_value_type || self.is_bool
    }
}

/// Identity of a declared entity, as seen by the transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Simple name.
    pub name: String,
    /// Fully qualified name (`Ns.Type.Member`); equals `name` for locals.
    pub qualified_name: String,
    /// Qualified name of the containing type, for members.
    pub containing_type: Option<String>,
    /// Whether the containing type is sealed (cached to avoid a second
    /// lookup in the name-shaping paths).
    pub containing_type_sealed: bool,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_readonly: bool,
    /// Compile-time constant value of a const field, when present.
    pub constant_value: Option<LuaLiteral>,
    /// virtual / abstract / override and not sealed.
    pub is_overridable: bool,
    /// Named types: sealed (structs and enums always are).
    pub is_sealed: bool,
    /// Named types: struct or enum.
    pub is_value_type: bool,
    pub is_extension_method: bool,
    /// Extension methods: qualified name of the declaring static class.
    pub reduced_container: Option<String>,
    /// Methods: declared return type is `void`.
    pub returns_void: bool,
    /// Methods: declared parameters in order.
    pub parameters: Vec<ParameterInfo>,
    /// Methods and named types: generic type parameter names in order.
    pub type_parameters: Vec<String>,
    /// Properties: every accessor is bodiless.
    pub is_auto_property: bool,
    /// Events: declared as an event field (no add/remove bodies).
    pub is_event_field: bool,
    /// Members: implements a member of an interface the type lists.
    pub implements_interface: bool,
    /// Declared type of a field/property/local/parameter, or the return
    /// type of a method.
    pub member_type: Option<TypeRef>,
}

impl Symbol {
    /// New symbol with every flag at its default.
    pub fn new(kind: SymbolKind, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind,
            qualified_name: name.clone(),
            name,
            containing_type: None,
            containing_type_sealed: false,
            accessibility: Accessibility::Private,
            is_static: false,
            is_readonly: false,
            constant_value: None,
            is_overridable: false,
            is_sealed: false,
            is_value_type: false,
            is_extension_method: false,
            reduced_container: None,
            returns_void: false,
            parameters: Vec::new(),
            type_parameters: Vec::new(),
            is_auto_property: false,
            is_event_field: false,
            implements_interface: false,
            member_type: None,
        }
    }

    /// Const field with a known value.
    pub fn has_constant_value(&self) -> bool {
        self.constant_value.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsey_classification() {
        assert!(TypeRef::reference("System.String").may_be_falsey());
        assert!(!TypeRef::value("System.Int32").may_be_falsey());

        let mut b = TypeRef::value("System.Boolean");
        b.is_bool = true;
        assert!(b.may_be_falsey());
    }

    #[test]
    fn qualified_defaults_to_simple() {
        let s = Symbol::new(SymbolKind::Local, "x");
        assert_eq!(s.qualified_name, "x");
        assert!(!s.has_constant_value());
    }
}
