//! Lua expression nodes.
//!
//! A closed sum type over everything the lowering can produce in value
//! position. Two variants exist purely for the transformation protocol and
//! are rewritten before the tree is final:
//!
//! - [`LuaExpr::Property`] - a [`PropertyAdapter`] whose accessor direction
//!   and argument list are completed by the assignment / member-access
//!   visitors
//! - [`LuaExpr::InternalMethod`] - a marker for a non-overridable instance
//!   method referenced bare; the invocation visitor turns it into a plain
//!   call with `this` prepended

mod literal;
mod operators;

pub use literal::LuaLiteral;
pub use operators::map_operator_token;

use serde::{Deserialize, Serialize};

use crate::stmt::LuaBlock;

/// Lua expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaExpr {
    /// Identifier, possibly dotted: `x`, `System.Int32`
    Name(String),
    /// Literal token: `42`, `"s"`, `nil`
    Literal(LuaLiteral),
    /// Binary operation with a textual operator token: `a ~= b`, `s .. t`
    Binary {
        op: String,
        lhs: Box<LuaExpr>,
        rhs: Box<LuaExpr>,
    },
    /// Prefix unary operation: `not x`, `-x`
    Unary { op: String, operand: Box<LuaExpr> },
    /// Parenthesized expression: `(a and b)`
    Paren(Box<LuaExpr>),
    /// Member access: `t.f` or the colon-call form `t:f`
    Member(LuaMemberAccess),
    /// Call: `f(a, b)`
    Invocation(LuaInvocation),
    /// Assignment, possibly multi-target: `a, b = f()`
    Assignment(LuaAssignment),
    /// Several assignments emitted on one line, execution order
    /// left-to-right. Produced by chained-assignment unrolling.
    LineMultiple(Vec<LuaExpr>),
    /// Property or event accessor adapter, completed by later visits.
    Property(PropertyAdapter),
    /// Bare reference to a non-overridable instance method of the
    /// enclosing type; the invocation visitor supplies `this`.
    InternalMethod(String),
    /// Anonymous function: `function(a, b) ... end`
    Function(LuaFunction),
}

impl LuaExpr {
    /// Identifier expression.
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// `nil`
    pub fn nil() -> Self {
        Self::Literal(LuaLiteral::Nil)
    }

    /// Numeric literal from raw token text.
    pub fn number(raw: impl Into<String>) -> Self {
        Self::Literal(LuaLiteral::Number(raw.into()))
    }

    /// Binary node with the operator token already mapped.
    pub fn binary(op: impl Into<String>, lhs: LuaExpr, rhs: LuaExpr) -> Self {
        Self::Binary {
            op: op.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `target.name` (or `target:name` when `colon`).
    pub fn member(target: LuaExpr, name: impl Into<String>, colon: bool) -> Self {
        Self::Member(LuaMemberAccess {
            target: Box::new(target),
            name: name.into(),
            colon,
        })
    }

    /// `callee(args...)`
    pub fn invocation(callee: LuaExpr, args: Vec<LuaExpr>) -> Self {
        Self::Invocation(LuaInvocation {
            callee: Box::new(callee),
            args,
        })
    }

    /// Single-target, single-value assignment.
    pub fn assign(target: LuaExpr, value: LuaExpr) -> Self {
        Self::Assignment(LuaAssignment {
            targets: vec![target],
            values: vec![value],
        })
    }
}

/// `target.name` / `target:name`.
///
/// `colon` marks method-style access: the emitter prints `:` and the callee
/// receives the receiver as its implicit first argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaMemberAccess {
    pub target: Box<LuaExpr>,
    pub name: String,
    pub colon: bool,
}

/// Call payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaInvocation {
    pub callee: Box<LuaExpr>,
    pub args: Vec<LuaExpr>,
}

/// Assignment payload. `targets` and `values` line up positionally; a
/// ref/out call produces one value (the invocation) against many targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaAssignment {
    pub targets: Vec<LuaExpr>,
    pub values: Vec<LuaExpr>,
}

/// Anonymous function literal. Named functions are carried as type members
/// with the name stored on the member record, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaFunction {
    pub params: Vec<String>,
    pub body: LuaBlock,
}

impl LuaFunction {
    pub fn new(params: Vec<String>, body: LuaBlock) -> Self {
        Self { params, body }
    }
}

/// Accessor adapter for a property, event, or indexer use-site.
///
/// Created in "get" position by the identifier / member-access visitors.
/// When the adapter turns out to be the left side of an assignment, the
/// assignment visitor flips `is_get` and appends the assigned value as the
/// final argument. The adapter is a small builder with owned state; it is
/// never shared across tree positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAdapter {
    /// Property or event simple name; empty for an indexer.
    pub name: String,
    /// Accessor direction: get/add when true, set/remove when false.
    pub is_get: bool,
    /// Receiver expression; `None` until the member-access visitor (or the
    /// identifier visitor, for bare uses) supplies one.
    pub receiver: Option<Box<LuaExpr>>,
    /// Instance accessor call style (`recv:getName(...)`).
    pub colon: bool,
    /// Accessor arguments: indexer subscripts, then the set value.
    pub args: Vec<LuaExpr>,
}

impl PropertyAdapter {
    /// Fresh adapter in get position with no receiver yet.
    pub fn getter(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_get: true,
            receiver: None,
            colon: false,
            args: Vec::new(),
        }
    }

    /// Attach (or replace) the receiver, keeping accessor state.
    pub fn with_receiver(mut self, receiver: LuaExpr, colon: bool) -> Self {
        self.receiver = Some(Box::new(receiver));
        self.colon = colon;
        self
    }

    /// Flip to set position and append the assigned value.
    pub fn complete_set(&mut self, value: LuaExpr) {
        self.is_get = false;
        self.args.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_set_completion() {
        let mut adapter = PropertyAdapter::getter("Count");
        assert!(adapter.is_get);
        assert!(adapter.args.is_empty());

        adapter.complete_set(LuaExpr::number("1"));
        assert!(!adapter.is_get);
        assert_eq!(adapter.args, vec![LuaExpr::number("1")]);
    }

    #[test]
    fn adapter_receiver_attachment() {
        let adapter = PropertyAdapter::getter("Length").with_receiver(LuaExpr::name("s"), true);
        assert_eq!(adapter.receiver, Some(Box::new(LuaExpr::name("s"))));
        assert!(adapter.colon);
    }

    #[test]
    fn helper_constructors() {
        let e = LuaExpr::assign(LuaExpr::name("x"), LuaExpr::number("1"));
        let LuaExpr::Assignment(a) = e else {
            panic!("expected assignment");
        };
        assert_eq!(a.targets.len(), 1);
        assert_eq!(a.values.len(), 1);
    }
}
