//! Declaration containers.
//!
//! Unlike statements, declarations are collectors: member visits attach
//! methods, fields, properties and events to the enclosing type while the
//! walk is inside it, and the finished declaration owns everything in input
//! member order.

use serde::{Deserialize, Serialize};

use crate::expr::{LuaExpr, LuaFunction};
use crate::stmt::LuaStmt;

/// Root of one translated source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaCompilationUnit {
    /// Source file path the unit was produced from.
    pub file_path: String,
    /// Type declarations in textual order.
    pub types: Vec<LuaTypeDecl>,
    /// Loose top-level statements (top-level programs).
    pub statements: Vec<LuaStmt>,
}

impl LuaCompilationUnit {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            types: Vec::new(),
            statements: Vec::new(),
        }
    }
}

/// Any declaration that can appear where a type is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaTypeDecl {
    Namespace(LuaNamespaceDecl),
    Class(LuaClassDecl),
    Enum(LuaEnumDecl),
}

/// Namespace: a dotted name plus the types declared inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaNamespaceDecl {
    pub name: String,
    pub types: Vec<LuaTypeDecl>,
}

/// Discriminates the runtime constructor a type declaration binds to
/// (`System.class` / `System.struct` / `System.interface`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
}

/// Class, struct, or interface declaration under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaClassDecl {
    pub kind: TypeKind,
    pub name: String,
    /// Generic type parameters, in declaration order. They become runtime
    /// arguments of the type constructor.
    pub type_params: Vec<String>,
    /// Base type and interface names, in base-list order.
    pub base_names: Vec<String>,
    pub methods: Vec<LuaMethodMember>,
    pub fields: Vec<LuaFieldMember>,
    pub properties: Vec<LuaAccessorMember>,
    pub events: Vec<LuaAccessorMember>,
    /// Names of readonly statics assigned from inside the static
    /// constructor; the emitter publishes these on the type table after it
    /// runs.
    pub static_readonly_assignments: Vec<String>,
    /// Nested type declarations.
    pub nested: Vec<LuaTypeDecl>,
}

impl LuaClassDecl {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            type_params: Vec::new(),
            base_names: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            static_readonly_assignments: Vec::new(),
            nested: Vec::new(),
        }
    }

    pub fn add_method(&mut self, name: impl Into<String>, function: LuaFunction, is_private: bool) {
        self.methods.push(LuaMethodMember {
            name: name.into(),
            function,
            is_private,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        value: Option<LuaExpr>,
        is_immutable: bool,
        is_static: bool,
        is_private: bool,
        is_readonly: bool,
    ) {
        self.fields.push(LuaFieldMember {
            name: name.into(),
            value,
            is_immutable,
            is_static,
            is_private,
            is_readonly,
        });
    }

    pub fn add_property(&mut self, member: LuaAccessorMember) {
        self.properties.push(member);
    }

    pub fn add_event(&mut self, member: LuaAccessorMember) {
        self.events.push(member);
    }

    /// Record a readonly static assigned from the static constructor.
    pub fn record_static_readonly_assignment(&mut self, name: &str) {
        if !self.static_readonly_assignments.iter().any(|n| n == name) {
            self.static_readonly_assignments.push(name.to_string());
        }
    }
}

/// Named method member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaMethodMember {
    pub name: String,
    pub function: LuaFunction,
    pub is_private: bool,
}

/// Field member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaFieldMember {
    pub name: String,
    /// Initializer; `None` emits nil.
    pub value: Option<LuaExpr>,
    /// Readonly/const with a syntactic-literal initializer: the emitter may
    /// place the value inline on the type table.
    pub is_immutable: bool,
    pub is_static: bool,
    pub is_private: bool,
    pub is_readonly: bool,
}

/// Property or event member.
///
/// Accessor-backed members carry one record per accessor function
/// (`is_get_or_add` discriminates get/add from set/remove); auto members
/// carry the initializer value instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaAccessorMember {
    pub name: String,
    pub function: Option<LuaFunction>,
    pub value: Option<LuaExpr>,
    pub is_get_or_add: bool,
    pub is_auto: bool,
    pub is_static: bool,
    pub is_private: bool,
}

impl LuaAccessorMember {
    /// Accessor-function record.
    pub fn accessor(
        name: impl Into<String>,
        function: LuaFunction,
        is_get_or_add: bool,
        is_static: bool,
        is_private: bool,
    ) -> Self {
        Self {
            name: name.into(),
            function: Some(function),
            value: None,
            is_get_or_add,
            is_auto: false,
            is_static,
            is_private,
        }
    }

    /// Auto member backed by a runtime-managed slot with an initializer.
    pub fn auto(
        name: impl Into<String>,
        value: Option<LuaExpr>,
        is_static: bool,
        is_private: bool,
    ) -> Self {
        Self {
            name: name.into(),
            function: None,
            value,
            is_get_or_add: true,
            is_auto: true,
            is_static,
            is_private,
        }
    }
}

/// Enum declaration: ordered name/value pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaEnumDecl {
    pub name: String,
    pub members: Vec<LuaEnumMember>,
}

impl LuaEnumDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn add_member(&mut self, name: impl Into<String>, value: LuaExpr) {
        self.members.push(LuaEnumMember {
            name: name.into(),
            value,
        });
    }
}

/// One enum member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaEnumMember {
    pub name: String,
    pub value: LuaExpr,
}
