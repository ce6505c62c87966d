//! C# to Lua translation.
//!
//! This module lowers C# source (parsed via tree-sitter-c-sharp) into the
//! cslua-repr output AST.
//!
//! # C# to Lua mapping
//!
//! ## Declarations
//! - class/struct/interface → type declaration collecting methods, fields,
//!   properties and events; generic type parameters become runtime
//!   constructor arguments
//! - non-static method → `function (this, params...)`
//! - accessor → `function (this[, value])`
//! - iterator method → `return System.Yield(inner, elementType, params...)`
//!
//! ## Statements
//! - `do { } while (c)` → `repeat ... until not (c)`
//! - `for (init; c; inc)` → nested block with init, `while c or true`
//!   ending in the incrementors
//! - `switch` → subject temporary plus per-section `if`s; `goto case L` →
//!   `goto label_L` with the label at the target section's head
//! - `continue` → `goto continue` with a trailing `::continue::` label
//!
//! ## Expressions
//! - `x++` / `++x` → `x = x + 1`, with a pre-value temporary in value
//!   position
//! - ref/out call → `t, outs... = f(args)` multi-assignment
//! - `c ? t : f` → `(c and t) or f`, or an if/else over a temporary when
//!   `t` can be nil or false
//! - `!=`, `!`, `&&`, `||`, `??` → `~=`, `not`, `and`, `or`, `or`

pub mod binder;
mod context;
mod decls;
mod exprs;
mod stmts;

pub use binder::SourceModel;
pub use context::{CsContext, FunctionContext, TypeFrame, TEMP_POOL};

use cslua_repr::LuaCompilationUnit;
use tracing::debug;

use crate::metadata::MetadataMap;
use crate::{MetadataProvider, SemanticModel, TranslateError, TranslateErrorKind, TranslateResult};

/// C# to Lua translator for one compilation unit.
///
/// One instance per source file; translation is synchronous, single
/// threaded and non-reentrant.
pub struct CsTranslator<'src> {
    source: &'src [u8],
    file_path: String,
}

impl<'src> CsTranslator<'src> {
    /// Create a new translator for the given source.
    pub fn new(source: &'src [u8], file_path: impl Into<String>) -> Self {
        Self {
            source,
            file_path: file_path.into(),
        }
    }

    /// Parse the C# source into a tree.
    fn parse(&self) -> TranslateResult<tree_sitter::Tree> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .map_err(|e| TranslateError {
                kind: TranslateErrorKind::ParseError,
                message: format!("failed to set C# language: {e}"),
                line: 0,
                column: 0,
            })?;

        parser.parse(self.source, None).ok_or_else(|| TranslateError {
            kind: TranslateErrorKind::ParseError,
            message: "failed to parse C# source".to_string(),
            line: 0,
            column: 0,
        })
    }

    /// Parse, bind with the built-in [`SourceModel`], and translate.
    pub fn translate(&mut self) -> TranslateResult<LuaCompilationUnit> {
        let tree = self.parse()?;
        let model = SourceModel::bind(&tree, self.source);
        let metadata = MetadataMap::with_defaults();
        self.translate_tree(&tree, &model, &metadata)
    }

    /// Translate an already parsed tree against caller-supplied
    /// collaborators.
    pub fn translate_tree(
        &self,
        tree: &tree_sitter::Tree,
        model: &dyn SemanticModel,
        metadata: &dyn MetadataProvider,
    ) -> TranslateResult<LuaCompilationUnit> {
        debug!(file = %self.file_path, "translating compilation unit");
        let mut ctx = CsContext::new(self.source, &self.file_path, model, metadata);
        let unit = decls::translate_compilation_unit(&mut ctx, tree.root_node())?;
        debug!(
            file = %self.file_path,
            types = unit.types.len(),
            statements = unit.statements.len(),
            "translation complete"
        );
        Ok(unit)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use cslua_repr::decl::{LuaClassDecl, LuaMethodMember, LuaTypeDecl};
    use cslua_repr::stmt::{LuaBlock, LuaStmt};

    /// Translate a source snippet with the built-in collaborators.
    pub fn translate(source: &str) -> LuaCompilationUnit {
        let mut translator = CsTranslator::new(source.as_bytes(), "test.cs");
        translator.translate().expect("translation should succeed")
    }

    pub fn translate_err(source: &str) -> TranslateError {
        let mut translator = CsTranslator::new(source.as_bytes(), "test.cs");
        translator
            .translate()
            .expect_err("translation should fail")
    }

    pub fn first_class(unit: &LuaCompilationUnit) -> &LuaClassDecl {
        unit.types
            .iter()
            .find_map(|t| match t {
                LuaTypeDecl::Class(c) => Some(c),
                _ => None,
            })
            .expect("unit should declare a class")
    }

    pub fn method<'u>(class: &'u LuaClassDecl, name: &str) -> &'u LuaMethodMember {
        class
            .methods
            .iter()
            .find(|m| m.name == name)
            .unwrap_or_else(|| panic!("method {name} should exist"))
    }

    /// Body statements with layout nodes (blank lines, comments) removed.
    pub fn code_statements(block: &LuaBlock) -> Vec<&LuaStmt> {
        block
            .statements
            .iter()
            .filter(|s| {
                !matches!(
                    s,
                    LuaStmt::BlankLines(_) | LuaStmt::ShortComment(_) | LuaStmt::LongComment(_)
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use cslua_repr::expr::{LuaExpr, LuaLiteral};
    use cslua_repr::stmt::LuaStmt;

    #[test]
    fn statement_level_increment_needs_no_temp() {
        let unit = translate("class C { void M() { int x = 1; x++; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        assert_eq!(body.len(), 2);
        assert!(matches!(body[0], LuaStmt::Local { names, values }
            if names == &["x"] && values.len() == 1));
        let LuaStmt::Expression(LuaExpr::Assignment(assign)) = body[1] else {
            panic!("expected increment assignment, got {:?}", body[1]);
        };
        assert_eq!(assign.targets, vec![LuaExpr::name("x")]);
        assert_eq!(
            assign.values,
            vec![LuaExpr::binary("+", LuaExpr::name("x"), LuaExpr::number("1"))]
        );
    }

    #[test]
    fn value_level_postfix_increment_takes_pre_value_temp() {
        let unit = translate("class C { void M() { int x = 1; int y = x++; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        // local x = 1; local t1 = x; x = x + 1; local y = t1
        assert_eq!(body.len(), 4);
        assert!(matches!(body[1], LuaStmt::Local { names, values }
            if names == &["t1"] && values == &[LuaExpr::name("x")]));
        assert!(matches!(body[2], LuaStmt::Expression(LuaExpr::Assignment(_))));
        assert!(matches!(body[3], LuaStmt::Local { names, values }
            if names == &["y"] && values == &[LuaExpr::name("t1")]));
    }

    #[test]
    fn out_argument_call_becomes_multi_assignment() {
        let unit = translate("class C { void M(string s) { int v = 0; int.TryParse(s, out v); } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        // local v = 0; local t1; t1, v = System.Int32.TryParse(s)
        assert_eq!(body.len(), 3);
        assert!(matches!(body[1], LuaStmt::Local { names, values }
            if names == &["t1"] && values.is_empty()));
        let LuaStmt::Expression(LuaExpr::Assignment(assign)) = body[2] else {
            panic!("expected multi-assignment, got {:?}", body[2]);
        };
        assert_eq!(assign.targets, vec![LuaExpr::name("t1"), LuaExpr::name("v")]);
        assert_eq!(assign.values.len(), 1);
        let LuaExpr::Invocation(inv) = &assign.values[0] else {
            panic!("expected invocation value");
        };
        // The out argument is not passed.
        assert_eq!(inv.args, vec![LuaExpr::name("s")]);
    }

    #[test]
    fn chained_assignment_unrolls_right_to_left() {
        let unit = translate("class C { void M() { int a = 0; int b = 0; int c = 0; a = b = c = 0; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        let LuaStmt::Expression(LuaExpr::LineMultiple(links)) = body[3] else {
            panic!("expected line-multiple, got {:?}", body[3]);
        };
        // Execution order: c = 0, b = c, a = b.
        assert_eq!(links.len(), 3);
        let targets: Vec<_> = links
            .iter()
            .map(|l| match l {
                LuaExpr::Assignment(a) => a.targets[0].clone(),
                other => panic!("expected assignment link, got {other:?}"),
            })
            .collect();
        assert_eq!(
            targets,
            vec![LuaExpr::name("c"), LuaExpr::name("b"), LuaExpr::name("a")]
        );
        let LuaExpr::Assignment(first) = &links[0] else {
            unreachable!()
        };
        assert_eq!(first.values, vec![LuaExpr::number("0")]);
        let LuaExpr::Assignment(second) = &links[1] else {
            unreachable!()
        };
        assert_eq!(second.values, vec![LuaExpr::name("c")]);
    }

    #[test]
    fn switch_with_goto_case_synthesizes_labels() {
        let unit = translate(
            "class C { void M(int x) { switch (x) { case 1: goto case 2; case 2: break; default: break; } } }",
        );
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        let LuaStmt::Switch(adapter) = body[0] else {
            panic!("expected switch adapter, got {:?}", body[0]);
        };
        assert_eq!(adapter.subject, "t1");
        assert!(adapter.case_labels.contains(&"label_2".to_string()));
        assert!(adapter.case_labels.contains(&"label_default".to_string()));

        // Subject temporary first.
        assert!(matches!(&adapter.block.statements[0], LuaStmt::Local { names, values }
            if names == &["t1"] && values == &[LuaExpr::name("x")]));

        // case 1: goto label_2
        let LuaStmt::If(case1) = &adapter.block.statements[1] else {
            panic!("expected case 1 if");
        };
        assert!(matches!(
            case1.body.statements.first(),
            Some(LuaStmt::GotoCase { label }) if label == "label_2"
        ));

        // case 2 opens with its synthetic label.
        let LuaStmt::If(case2) = &adapter.block.statements[2] else {
            panic!("expected case 2 if");
        };
        assert!(matches!(
            case2.body.statements.first(),
            Some(LuaStmt::Label(label)) if label == "label_2"
        ));
        assert!(matches!(case2.body.statements.get(1), Some(LuaStmt::Break)));

        // Default block opens with label_default.
        let LuaStmt::Do(default_block) = &adapter.block.statements[3] else {
            panic!("expected default block");
        };
        assert!(matches!(
            default_block.statements.first(),
            Some(LuaStmt::Label(label)) if label == "label_default"
        ));
    }

    #[test]
    fn iterator_method_wraps_body_in_yield() {
        let unit = translate(
            "class C { System.Collections.Generic.IEnumerable<int> F(int n) { yield return n; } }",
        );
        let class = first_class(&unit);
        let function = &method(class, "F").function;

        assert_eq!(function.params, vec!["this", "n"]);
        assert_eq!(function.body.statements.len(), 1);
        let LuaStmt::Return(values) = &function.body.statements[0] else {
            panic!("expected return of the yield wrapper");
        };
        let LuaExpr::Invocation(inv) = &values[0] else {
            panic!("expected System.Yield invocation");
        };
        assert_eq!(*inv.callee, LuaExpr::name("System.Yield"));
        assert_eq!(inv.args.len(), 3);
        let LuaExpr::Function(inner) = &inv.args[0] else {
            panic!("expected inner function");
        };
        assert_eq!(inner.params, vec!["this", "n"]);
        assert!(matches!(
            inner.body.statements.first(),
            Some(LuaStmt::Expression(LuaExpr::Invocation(call)))
                if *call.callee == LuaExpr::name("System.YieldReturn")
        ));
        assert_eq!(inv.args[1], LuaExpr::name("Int32"));
        assert_eq!(inv.args[2], LuaExpr::name("n"));
    }

    #[test]
    fn this_parameter_tracks_staticness() {
        let unit = translate("class C { void A() {} static void B() {} }");
        let class = first_class(&unit);
        assert_eq!(method(class, "A").function.params, vec!["this"]);
        assert!(method(class, "B").function.params.is_empty());
    }

    #[test]
    fn const_reference_inlines_literal() {
        let unit = translate("class C { const int Max = 10; int M() { return Max; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        let LuaStmt::Return(values) = body[0] else {
            panic!("expected return");
        };
        assert_eq!(
            values[0],
            LuaExpr::Literal(LuaLiteral::Number("10".to_string()))
        );
    }

    #[test]
    fn namespace_collects_types() {
        let unit = translate("namespace A.B { class C {} enum E { X } }");
        assert_eq!(unit.file_path, "test.cs");
        let cslua_repr::decl::LuaTypeDecl::Namespace(ns) = &unit.types[0] else {
            panic!("expected namespace");
        };
        assert_eq!(ns.name, "A.B");
        assert_eq!(ns.types.len(), 2);
    }

    #[test]
    fn unsupported_member_is_a_hard_error() {
        let err = translate_err("class C { delegate void D(); }");
        assert_eq!(err.kind, crate::TranslateErrorKind::UnsupportedSyntax);
    }
}
