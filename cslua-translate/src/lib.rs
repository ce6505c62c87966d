//! Translation layer for converting C# syntax trees to the Lua AST.
//!
//! This crate provides the syntax-directed transformation engine that walks
//! a parsed C# compilation unit (via tree-sitter) and produces the
//! `cslua-repr` output tree.
//!
//! # Architecture
//!
//! - [`SemanticModel`] - collaborator interface for symbol and type queries
//! - [`MetadataProvider`] - collaborator interface for name remapping
//! - [`TranslateError`] - error types for translation failures
//! - [`csharp`] - the C# lowering module (context stacks, expression,
//!   statement and declaration visitors, plus a single-file reference
//!   binder)
//!
//! # Example
//!
//! ```ignore
//! use cslua_translate::csharp::CsTranslator;
//!
//! let source = b"class C { static int Add(int x, int y) { return x + y; } }";
//! let mut translator = CsTranslator::new(source, "c.cs");
//! let unit = translator.translate()?;
//! // unit.types contains the lowered class declaration
//! ```

pub mod csharp;
pub mod metadata;
pub mod symbols;

pub use metadata::MetadataMap;
pub use symbols::{Accessibility, ParameterInfo, Symbol, SymbolKind, TypeRef};

use thiserror::Error;
use tree_sitter::Node;

/// Error raised while lowering a compilation unit. All engine errors are
/// fatal for the unit being translated; there is no local recovery.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} at {line}:{column}: {message}")]
pub struct TranslateError {
    pub kind: TranslateErrorKind,
    pub message: String,
    /// 1-indexed source line.
    pub line: usize,
    pub column: usize,
}

/// Kinds of translation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateErrorKind {
    /// Syntax construct the engine does not lower.
    UnsupportedSyntax,
    /// A required child node is absent.
    MissingNode,
    /// The semantic model returned no symbol or type where one is required.
    MissingSymbol,
    /// The fixed temporary pool of the enclosing function ran out.
    PoolExhausted,
    /// An internal lowering assertion failed (e.g. a second getter).
    InvariantBreach,
    /// The input could not be parsed at all.
    ParseError,
}

/// Result type for translation operations.
pub type TranslateResult<T> = Result<T, TranslateError>;

/// Per-node symbol and type resolution.
///
/// The engine never resolves names itself; it asks this collaborator and
/// treats an absent answer in a position that requires one as a hard error.
/// Implementations may be shared by several translator instances; all
/// methods take `&self`.
pub trait SemanticModel {
    /// Symbol referenced by a use-site node (identifier, member name).
    fn symbol_of(&self, node: Node<'_>) -> Option<&Symbol>;

    /// Symbol declared by a declaration or declarator node.
    fn declared_symbol(&self, node: Node<'_>) -> Option<&Symbol>;

    /// Type of an expression node, when the model can compute one.
    fn type_of(&self, node: Node<'_>) -> Option<&TypeRef>;
}

/// External name remapping for types and methods (e.g. `int` →
/// `System.Int32`). Keyed by the source spelling for types and by the
/// resolved symbol for methods.
pub trait MetadataProvider {
    /// Output spelling for a type name, if overridden.
    fn type_map_name(&self, name: &str) -> Option<&str>;

    /// Output spelling for a method, if overridden.
    fn method_map_name(&self, symbol: &Symbol) -> Option<&str>;
}

/// Helper to create translation errors anchored at a node.
pub fn translate_error(
    kind: TranslateErrorKind,
    message: impl Into<String>,
    node: Node<'_>,
) -> TranslateError {
    TranslateError {
        kind,
        message: message.into(),
        line: node.start_position().row + 1,
        column: node.start_position().column,
    }
}

/// Helper to create "unsupported" errors.
pub fn unsupported(what: &str, node: Node<'_>) -> TranslateError {
    translate_error(
        TranslateErrorKind::UnsupportedSyntax,
        format!("unsupported: {}", what),
        node,
    )
}

/// Helper to create "missing node" errors.
pub fn missing_node(what: &str, node: Node<'_>) -> TranslateError {
    translate_error(
        TranslateErrorKind::MissingNode,
        format!("missing required node: {}", what),
        node,
    )
}

/// Helper for failed semantic queries.
pub fn missing_symbol(what: &str, node: Node<'_>) -> TranslateError {
    translate_error(
        TranslateErrorKind::MissingSymbol,
        format!("semantic model returned nothing for: {}", what),
        node,
    )
}

/// Helper for internal lowering assertions.
pub fn invariant_breach(what: &str, node: Node<'_>) -> TranslateError {
    translate_error(TranslateErrorKind::InvariantBreach, what.to_string(), node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_location() {
        let err = TranslateError {
            kind: TranslateErrorKind::PoolExhausted,
            message: "temporary pool of size 16 exhausted".to_string(),
            line: 12,
            column: 4,
        };
        let text = err.to_string();
        assert!(text.contains("12:4"));
        assert!(text.contains("PoolExhausted"));
    }
}
