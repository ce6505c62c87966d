//! Lua output AST for the cslua translator.
//!
//! This crate defines the node families the transformation engine emits:
//!
//! - [`expr`] - expressions, including the mutable property adapter
//! - [`stmt`] - statements, blocks, and the switch adapter
//! - [`decl`] - compilation units, namespaces, and type declarations
//!
//! Nodes are plain owned data (`String` names, `Vec` children) so a
//! pretty-printer or any other consumer can walk them without carrying an
//! interner around. Everything derives `serde` so trees can be snapshotted
//! or shipped across a process boundary.
//!
//! The AST is deliberately Lua-shaped rather than C#-shaped: constructs the
//! target language lacks (properties, switch, `goto case`) appear only as
//! the adapter nodes the lowering produces for them.

pub mod decl;
pub mod expr;
pub mod stmt;

pub use decl::{
    LuaAccessorMember, LuaClassDecl, LuaCompilationUnit, LuaEnumDecl, LuaEnumMember,
    LuaFieldMember, LuaMethodMember, LuaNamespaceDecl, LuaTypeDecl, TypeKind,
};
pub use expr::{
    map_operator_token, LuaAssignment, LuaExpr, LuaFunction, LuaInvocation, LuaLiteral,
    LuaMemberAccess, PropertyAdapter,
};
pub use stmt::{LuaBlock, LuaElse, LuaIf, LuaStmt, SwitchAdapter};
