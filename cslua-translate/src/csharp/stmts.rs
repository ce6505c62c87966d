//! C# statement lowering.
//!
//! Blocks merge their statements with the comment trivia and blank-line
//! structure of the source, keyed by source line, so the output block reads
//! in the input's order. Control flow without a Lua analog (switch,
//! `goto case`, do/while, `continue`) lowers through the shapes the output
//! runtime expects: subject temporaries, synthetic labels, repeat/until,
//! `::continue::`.

use cslua_repr::expr::{LuaExpr, LuaLiteral};
use cslua_repr::stmt::{LuaBlock, LuaElse, LuaIf, LuaStmt, SwitchAdapter};
use tracing::trace;
use tree_sitter::Node;

use super::context::CsContext;
use super::exprs::{find_child_by_kind, translate_expr};
use crate::{missing_node, unsupported, TranslateResult};

/// Translate a C# statement node to a Lua statement.
pub fn translate_stmt(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    match node.kind() {
        "block" => Ok(LuaStmt::Do(translate_block(ctx, node)?)),
        "expression_statement" => {
            let expr = node
                .named_child(0)
                .ok_or_else(|| missing_node("expression", node))?;
            Ok(LuaStmt::Expression(translate_expr(ctx, expr)?))
        }
        "local_declaration_statement" => translate_local_declaration(ctx, node),
        "return_statement" => {
            let values = match node.named_child(0) {
                Some(expr) => vec![translate_expr(ctx, expr)?],
                None => Vec::new(),
            };
            Ok(LuaStmt::Return(values))
        }
        "break_statement" => Ok(LuaStmt::Break),
        "continue_statement" => {
            ctx.mark_continue();
            Ok(LuaStmt::Goto("continue".to_string()))
        }
        "if_statement" => Ok(LuaStmt::If(build_if(ctx, node)?)),
        "while_statement" => translate_while(ctx, node),
        "do_statement" => translate_do(ctx, node),
        "for_statement" => translate_for(ctx, node),
        "foreach_statement" => translate_foreach(ctx, node),
        "switch_statement" => translate_switch(ctx, node),
        "goto_statement" => translate_goto(ctx, node),
        "labeled_statement" => translate_labeled(ctx, node),
        "yield_statement" => translate_yield_stmt(ctx, node),
        "throw_statement" => {
            let args = match node.named_child(0) {
                Some(expr) => vec![translate_expr(ctx, expr)?],
                None => Vec::new(),
            };
            Ok(LuaStmt::Expression(LuaExpr::invocation(
                LuaExpr::name("Throw"),
                args,
            )))
        }
        "try_statement" => translate_try(ctx, node),
        "using_statement" => translate_using(ctx, node),
        _ => Err(unsupported(&format!("statement kind: {}", node.kind()), node)),
    }
}

// --- blocks ----------------------------------------------------------------

enum BlockItem<'t> {
    Statement(Node<'t>),
    Comment(Node<'t>),
}

/// Lower a block, interleaving comments and blank lines in source order.
pub fn translate_block(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaBlock> {
    ctx.push_block();

    let mut items = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "comment" | "empty_statement" => {}
            _ => items.push(BlockItem::Statement(child)),
        }
    }
    let mut comments = Vec::new();
    collect_comments(node, node, &mut comments);
    items.extend(comments.into_iter().map(BlockItem::Comment));

    // Stable source order: line first, column breaks same-line ties.
    items.sort_by_key(|item| {
        let n = match item {
            BlockItem::Statement(n) | BlockItem::Comment(n) => n,
        };
        (n.start_position().row, n.start_position().column)
    });

    let mut prev_end_row = node.start_position().row;
    for item in items {
        let n = match &item {
            BlockItem::Statement(n) | BlockItem::Comment(n) => *n,
        };
        let start_row = n.start_position().row;
        if start_row > prev_end_row + 1 {
            ctx.emit(LuaStmt::BlankLines((start_row - prev_end_row - 1) as u32));
        }
        match item {
            BlockItem::Statement(stmt_node) => {
                let lowered = translate_stmt(ctx, stmt_node)?;
                ctx.emit(lowered);
            }
            BlockItem::Comment(comment) => {
                ctx.emit(convert_comment(ctx.node_text(comment)));
            }
        }
        prev_end_row = n.end_position().row;
    }

    Ok(ctx.pop_block())
}

/// Comments descending from `block`, excluding those owned by a nested
/// block (the nested block's own visit collects them).
fn collect_comments<'t>(block: Node<'t>, node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "comment" {
            out.push(child);
        } else if child.kind() == "block" && child.id() != block.id() {
            continue;
        } else {
            collect_comments(block, child, out);
        }
    }
}

fn convert_comment(text: &str) -> LuaStmt {
    if let Some(rest) = text.strip_prefix("//") {
        LuaStmt::ShortComment(rest.trim_start().to_string())
    } else {
        let inner = text
            .strip_prefix("/*")
            .and_then(|t| t.strip_suffix("*/"))
            .unwrap_or(text);
        LuaStmt::LongComment(inner.to_string())
    }
}

/// Lower a statement into its own block: splice when it already is a
/// block, otherwise push a fresh block around the single statement.
pub(super) fn write_statement_or_block(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
) -> TranslateResult<LuaBlock> {
    if node.kind() == "block" {
        return translate_block(ctx, node);
    }
    ctx.push_block();
    if node.kind() != "empty_statement" {
        let lowered = translate_stmt(ctx, node)?;
        ctx.emit(lowered);
    }
    Ok(ctx.pop_block())
}

// --- declarations ----------------------------------------------------------

fn translate_local_declaration(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let declaration = find_child_by_kind(node, "variable_declaration")
        .ok_or_else(|| missing_node("variable declaration", node))?;

    let mut declarators = Vec::new();
    let mut cursor = declaration.walk();
    for child in declaration.named_children(&mut cursor) {
        if child.kind() == "variable_declarator" {
            declarators.push(child);
        }
    }
    if declarators.is_empty() {
        return Err(missing_node("variable declarator", declaration));
    }

    fn initializer_of(declarator: Node<'_>) -> Option<Node<'_>> {
        find_child_by_kind(declarator, "equals_value_clause").and_then(|eq| eq.named_child(0))
    }

    // `int a, b, c;` collapses to one multi-name nil declaration.
    if declarators.len() > 1 && declarators.iter().all(|d| initializer_of(*d).is_none()) {
        let names = declarators
            .iter()
            .map(|d| declarator_name(ctx, *d))
            .collect::<TranslateResult<Vec<_>>>()?;
        return Ok(LuaStmt::Local {
            names,
            values: Vec::new(),
        });
    }

    let mut lowered = Vec::new();
    for declarator in declarators {
        let name = declarator_name(ctx, declarator)?;
        let values = match initializer_of(declarator) {
            Some(init) => vec![translate_expr(ctx, init)?],
            None => Vec::new(),
        };
        lowered.push(LuaStmt::Local {
            names: vec![name],
            values,
        });
    }
    let last = lowered.pop().expect("at least one declarator");
    for stmt in lowered {
        ctx.emit(stmt);
    }
    Ok(last)
}

fn declarator_name(ctx: &CsContext<'_>, declarator: Node<'_>) -> TranslateResult<String> {
    declarator
        .child_by_field_name("name")
        .or_else(|| find_child_by_kind(declarator, "identifier"))
        .map(|n| ctx.node_text(n).to_string())
        .ok_or_else(|| missing_node("declarator name", declarator))
}

// --- control flow -----------------------------------------------------------

fn build_if(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaIf> {
    let condition = node
        .child_by_field_name("condition")
        .ok_or_else(|| missing_node("if condition", node))?;
    let consequence = node
        .child_by_field_name("consequence")
        .ok_or_else(|| missing_node("if consequence", node))?;

    let cond = translate_expr(ctx, condition)?;
    let body = write_statement_or_block(ctx, consequence)?;

    let else_branch = match node.child_by_field_name("alternative") {
        Some(alternative) if alternative.kind() == "if_statement" => {
            Some(LuaElse::ElseIf(Box::new(build_if(ctx, alternative)?)))
        }
        Some(alternative) => Some(LuaElse::Block(write_statement_or_block(ctx, alternative)?)),
        None => None,
    };

    Ok(LuaIf {
        cond,
        body,
        else_branch,
    })
}

fn translate_while(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let condition = node
        .child_by_field_name("condition")
        .ok_or_else(|| missing_node("while condition", node))?;
    let body_node = node
        .child_by_field_name("body")
        .ok_or_else(|| missing_node("while body", node))?;

    let cond = translate_expr(ctx, condition)?;
    ctx.enter_loop();
    let mut body = write_statement_or_block(ctx, body_node)?;
    if ctx.exit_loop() {
        body.push(LuaStmt::Label("continue".to_string()));
    }
    Ok(LuaStmt::While { cond, body })
}

/// do/while becomes repeat/until with the condition negated.
fn translate_do(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let body_node = node
        .child_by_field_name("body")
        .ok_or_else(|| missing_node("do body", node))?;
    let condition = node
        .child_by_field_name("condition")
        .ok_or_else(|| missing_node("do condition", node))?;

    ctx.enter_loop();
    let mut body = write_statement_or_block(ctx, body_node)?;
    if ctx.exit_loop() {
        body.push(LuaStmt::Label("continue".to_string()));
    }
    let cond = translate_expr(ctx, condition)?;
    let until = LuaExpr::Unary {
        op: "not".to_string(),
        operand: Box::new(LuaExpr::Paren(Box::new(cond))),
    };
    Ok(LuaStmt::RepeatUntil { body, until })
}

fn translate_foreach(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let left = node
        .child_by_field_name("left")
        .ok_or_else(|| missing_node("foreach variable", node))?;
    if left.kind() != "identifier" {
        return Err(unsupported("foreach deconstruction", left));
    }
    let right = node
        .child_by_field_name("right")
        .ok_or_else(|| missing_node("foreach source", node))?;
    let body_node = node
        .child_by_field_name("body")
        .ok_or_else(|| missing_node("foreach body", node))?;

    let source = translate_expr(ctx, right)?;
    ctx.enter_loop();
    let mut body = write_statement_or_block(ctx, body_node)?;
    if ctx.exit_loop() {
        body.push(LuaStmt::Label("continue".to_string()));
    }
    Ok(LuaStmt::ForIn {
        names: vec![ctx.node_text(left).to_string()],
        exprs: vec![source],
        body,
    })
}

/// A C-style for lowers into a nested block: declaration/initializers,
/// then a while over the condition (or `true`) whose body ends with the
/// incrementors.
fn translate_for(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let body_node = node
        .child_by_field_name("body")
        .ok_or_else(|| missing_node("for body", node))?;

    ctx.push_block();

    if let Some(initializer) = node.child_by_field_name("initializer") {
        if initializer.kind() == "variable_declaration" {
            // Route through the shared local lowering.
            let mut cursor = initializer.walk();
            let mut declarators = Vec::new();
            for child in initializer.named_children(&mut cursor) {
                if child.kind() == "variable_declarator" {
                    declarators.push(child);
                }
            }
            for declarator in declarators {
                let name = declarator_name(ctx, declarator)?;
                let values = match find_child_by_kind(declarator, "equals_value_clause")
                    .and_then(|eq| eq.named_child(0))
                {
                    Some(init) => vec![translate_expr(ctx, init)?],
                    None => Vec::new(),
                };
                ctx.emit(LuaStmt::Local {
                    names: vec![name],
                    values,
                });
            }
        } else {
            let lowered = translate_expr(ctx, initializer)?;
            ctx.emit(LuaStmt::Expression(lowered));
        }
    }

    let cond = match node.child_by_field_name("condition") {
        Some(condition) => translate_expr(ctx, condition)?,
        None => LuaExpr::Literal(LuaLiteral::Bool(true)),
    };

    ctx.enter_loop();
    let mut body = write_statement_or_block(ctx, body_node)?;
    let has_continue = ctx.exit_loop();
    if has_continue {
        body.push(LuaStmt::Label("continue".to_string()));
    }

    // Incrementors run at the end of every iteration, after the continue
    // label so `continue` still advances the loop.
    ctx.reenter_block(body);
    let mut cursor = node.walk();
    for child in node.children_by_field_name("update", &mut cursor) {
        let lowered = translate_expr(ctx, child)?;
        ctx.emit(LuaStmt::Expression(lowered));
    }
    let body = ctx.pop_block();

    ctx.emit(LuaStmt::While { cond, body });
    Ok(LuaStmt::Do(ctx.pop_block()))
}

// --- switch -----------------------------------------------------------------

fn translate_switch(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let subject_node = node
        .child_by_field_name("value")
        .ok_or_else(|| missing_node("switch subject", node))?;
    let body = node
        .child_by_field_name("body")
        .or_else(|| find_child_by_kind(node, "switch_body"))
        .ok_or_else(|| missing_node("switch body", node))?;

    let subject = translate_expr(ctx, subject_node)?;
    let temp = ctx.fresh_temp(node)?;
    let mut adapter = SwitchAdapter::new(&temp);
    adapter.block.push(LuaStmt::Local {
        names: vec![temp.clone()],
        values: vec![subject],
    });
    ctx.push_switch(adapter);

    // goto case may jump backward; register every targeted label before
    // any section is lowered so the target section emits it.
    prescan_goto_cases(ctx, body);

    let mut cursor = body.walk();
    let sections: Vec<Node<'_>> = body
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "switch_section")
        .collect();
    for section in sections {
        translate_switch_section(ctx, section, &temp)?;
    }

    let adapter = ctx.pop_switch();
    trace!(labels = adapter.case_labels.len(), "switch lowered");
    Ok(LuaStmt::Switch(adapter))
}

/// Acquire the synthetic labels of every `goto case` / `goto default`
/// inside the switch body, skipping nested switches (they own their own
/// labels).
fn prescan_goto_cases(ctx: &mut CsContext<'_>, node: Node<'_>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "switch_statement" => continue,
            "goto_statement" => {
                if let Some(suffix) = goto_case_suffix(ctx, child) {
                    ctx.cur_switch_mut().acquire_case_label(&suffix);
                }
            }
            _ => prescan_goto_cases(ctx, child),
        }
    }
}

/// The synthetic-label suffix a `goto case`/`goto default` targets, or
/// `None` for a plain goto.
fn goto_case_suffix(ctx: &CsContext<'_>, node: Node<'_>) -> Option<String> {
    let mut cursor = node.walk();
    let mut saw_case = false;
    for child in node.children(&mut cursor) {
        match ctx.node_text(child) {
            "case" => saw_case = true,
            "default" if !child.is_named() => return Some("default".to_string()),
            _ => {}
        }
    }
    if saw_case {
        node.named_child(0)
            .map(|value| case_label_suffix(ctx.node_text(value)))
    } else {
        None
    }
}

/// Sanitized label suffix for a case value.
fn case_label_suffix(text: &str) -> String {
    let suffix = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>();
    suffix
}

fn translate_switch_section(
    ctx: &mut CsContext<'_>,
    section: Node<'_>,
    subject: &str,
) -> TranslateResult<()> {
    let mut case_values = Vec::new();
    let mut is_default = false;
    let mut statements = Vec::new();
    let mut cursor = section.walk();
    for child in section.named_children(&mut cursor) {
        match child.kind() {
            "case_switch_label" => {
                let value = child
                    .named_child(0)
                    .ok_or_else(|| missing_node("case value", child))?;
                case_values.push(value);
            }
            "default_switch_label" => is_default = true,
            "comment" => {}
            _ => statements.push(child),
        }
    }

    if is_default {
        ctx.push_block();
        let label = ctx.cur_switch_mut().acquire_case_label("default");
        ctx.emit(LuaStmt::Label(label));
        for stmt_node in statements {
            let lowered = translate_stmt(ctx, stmt_node)?;
            ctx.emit(lowered);
        }
        let block = ctx.pop_block();
        ctx.cur_switch_mut().block.push(LuaStmt::Do(block));
        return Ok(());
    }

    // Combine the labels into one `subject == v1 or subject == v2 ...`.
    let mut cond: Option<LuaExpr> = None;
    for value in &case_values {
        let lowered = translate_expr(ctx, *value)?;
        let eq = LuaExpr::binary("==", LuaExpr::name(subject), lowered);
        cond = Some(match cond {
            Some(prev) => LuaExpr::binary("or", prev, eq),
            None => eq,
        });
    }
    let cond = cond.ok_or_else(|| missing_node("case label", section))?;

    ctx.push_block();
    for value in &case_values {
        let suffix = case_label_suffix(ctx.node_text(*value));
        if ctx.cur_switch_mut().has_case_label(&suffix) {
            let label = ctx.cur_switch_mut().acquire_case_label(&suffix);
            ctx.emit(LuaStmt::Label(label));
        }
    }
    for stmt_node in statements {
        let lowered = translate_stmt(ctx, stmt_node)?;
        ctx.emit(lowered);
    }
    let body = ctx.pop_block();
    ctx.cur_switch_mut().block.push(LuaStmt::If(LuaIf {
        cond,
        body,
        else_branch: None,
    }));
    Ok(())
}

// --- jumps ------------------------------------------------------------------

fn translate_goto(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    if let Some(suffix) = goto_case_suffix(ctx, node) {
        let label = ctx.cur_switch_mut().acquire_case_label(&suffix);
        return Ok(LuaStmt::GotoCase { label });
    }
    let target = node
        .named_child(0)
        .ok_or_else(|| missing_node("goto target", node))?;
    Ok(LuaStmt::Goto(ctx.node_text(target).to_string()))
}

fn translate_labeled(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let name = node
        .named_child(0)
        .ok_or_else(|| missing_node("label name", node))?;
    let stmt = node
        .named_child(1)
        .ok_or_else(|| missing_node("labeled statement body", node))?;
    let lowered = translate_stmt(ctx, stmt)?;
    Ok(LuaStmt::Labeled {
        name: ctx.node_text(name).to_string(),
        body: Box::new(lowered),
    })
}

// --- yield / try / using ----------------------------------------------------

fn translate_yield_stmt(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    ctx.cur_function_mut().has_yield = true;
    match node.named_child(0) {
        Some(expr) => {
            let value = translate_expr(ctx, expr)?;
            Ok(LuaStmt::Expression(LuaExpr::invocation(
                LuaExpr::name("System.YieldReturn"),
                vec![value],
            )))
        }
        // yield break
        None => Ok(LuaStmt::Return(Vec::new())),
    }
}

/// try/catch/finally → `System.Try(tryFn, catchFn, finallyFn)`.
fn translate_try(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let body = node
        .child_by_field_name("body")
        .or_else(|| find_child_by_kind(node, "block"))
        .ok_or_else(|| missing_node("try body", node))?;
    let try_block = translate_block(ctx, body)?;
    let mut args = vec![LuaExpr::Function(cslua_repr::LuaFunction::new(
        Vec::new(),
        try_block,
    ))];

    let mut catches = Vec::new();
    let mut finally = None;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "catch_clause" => catches.push(child),
            "finally_clause" => finally = Some(child),
            _ => {}
        }
    }
    if catches.len() > 1 {
        return Err(unsupported("multiple catch clauses", catches[1]));
    }

    if let Some(catch) = catches.first() {
        let param = find_child_by_kind(*catch, "catch_declaration")
            .and_then(|d| d.child_by_field_name("name"))
            .map(|n| ctx.node_text(n).to_string())
            .unwrap_or_else(|| "_".to_string());
        let catch_body = find_child_by_kind(*catch, "block")
            .ok_or_else(|| missing_node("catch body", *catch))?;
        let block = translate_block(ctx, catch_body)?;
        args.push(LuaExpr::Function(cslua_repr::LuaFunction::new(
            vec![param],
            block,
        )));
    } else if finally.is_some() {
        args.push(LuaExpr::nil());
    }

    if let Some(finally) = finally {
        let finally_body = find_child_by_kind(finally, "block")
            .ok_or_else(|| missing_node("finally body", finally))?;
        let block = translate_block(ctx, finally_body)?;
        args.push(LuaExpr::Function(cslua_repr::LuaFunction::new(
            Vec::new(),
            block,
        )));
    }

    Ok(LuaStmt::Expression(LuaExpr::invocation(
        LuaExpr::name("System.Try"),
        args,
    )))
}

/// `using (var r = ...) body` keeps the declaration scoped to a nested
/// block; disposal is the runtime's concern.
fn translate_using(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaStmt> {
    let body = node
        .child_by_field_name("body")
        .ok_or_else(|| missing_node("using body", node))?;

    ctx.push_block();
    if let Some(declaration) = find_child_by_kind(node, "variable_declaration") {
        let mut cursor = declaration.walk();
        for child in declaration.named_children(&mut cursor) {
            if child.kind() != "variable_declarator" {
                continue;
            }
            let name = declarator_name(ctx, child)?;
            let values = match find_child_by_kind(child, "equals_value_clause")
                .and_then(|eq| eq.named_child(0))
            {
                Some(init) => vec![translate_expr(ctx, init)?],
                None => Vec::new(),
            };
            ctx.emit(LuaStmt::Local {
                names: vec![name],
                values,
            });
        }
    }
    if body.kind() == "block" {
        let inner = translate_block(ctx, body)?;
        for stmt in inner.statements {
            ctx.emit(stmt);
        }
    } else {
        let lowered = translate_stmt(ctx, body)?;
        ctx.emit(lowered);
    }
    Ok(LuaStmt::Do(ctx.pop_block()))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use cslua_repr::expr::{LuaExpr, LuaLiteral};
    use cslua_repr::stmt::{LuaElse, LuaStmt};

    fn method_body(source: &str) -> cslua_repr::stmt::LuaBlock {
        let unit = translate(source);
        let class = first_class(&unit);
        method(class, "M").function.body.clone()
    }

    #[test]
    fn comments_and_blank_lines_interleave_in_source_order() {
        let body = method_body(
            "class C {\n  void M() {\n    int a = 1;\n    // note\n\n    /* multi */\n    int b = 2;\n  }\n}",
        );
        let statements = &body.statements;
        assert!(matches!(statements[0], LuaStmt::Local { ref names, .. } if names == &["a"]));
        assert!(matches!(statements[1], LuaStmt::ShortComment(ref text) if text == "note"));
        assert!(matches!(statements[2], LuaStmt::BlankLines(1)));
        assert!(matches!(statements[3], LuaStmt::LongComment(ref text) if text == " multi "));
        assert!(matches!(statements[4], LuaStmt::Local { ref names, .. } if names == &["b"]));
    }

    #[test]
    fn do_while_negates_the_guard() {
        let body = method_body("class C { void M() { do { } while (true); } }");
        let LuaStmt::RepeatUntil { until, .. } = &body.statements[0] else {
            panic!("expected repeat/until, got {:?}", body.statements[0]);
        };
        let LuaExpr::Unary { op, operand } = until else {
            panic!("expected negation");
        };
        assert_eq!(op, "not");
        assert_eq!(
            **operand,
            LuaExpr::Paren(Box::new(LuaExpr::Literal(LuaLiteral::Bool(true))))
        );
    }

    #[test]
    fn continue_lowers_to_goto_with_trailing_label() {
        let body = method_body("class C { void M() { while (true) { continue; } } }");
        let LuaStmt::While { body: loop_body, .. } = &body.statements[0] else {
            panic!("expected while, got {:?}", body.statements[0]);
        };
        assert!(matches!(
            loop_body.statements.first(),
            Some(LuaStmt::Goto(target)) if target == "continue"
        ));
        assert!(matches!(
            loop_body.statements.last(),
            Some(LuaStmt::Label(label)) if label == "continue"
        ));
    }

    #[test]
    fn loops_without_continue_get_no_label() {
        let body = method_body("class C { void M() { while (true) { break; } } }");
        let LuaStmt::While { body: loop_body, .. } = &body.statements[0] else {
            panic!("expected while");
        };
        assert!(!loop_body
            .statements
            .iter()
            .any(|s| matches!(s, LuaStmt::Label(_))));
    }

    #[test]
    fn for_lowers_to_block_with_while() {
        let body = method_body("class C { void M() { for (int i = 0; i < 3; i++) { } } }");
        let LuaStmt::Do(outer) = &body.statements[0] else {
            panic!("expected nested block, got {:?}", body.statements[0]);
        };
        assert!(matches!(outer.statements[0], LuaStmt::Local { ref names, .. } if names == &["i"]));
        let LuaStmt::While { cond, body: loop_body } = &outer.statements[1] else {
            panic!("expected while");
        };
        assert!(matches!(cond, LuaExpr::Binary { op, .. } if op == "<"));
        // The incrementor closes every iteration.
        assert!(matches!(
            loop_body.statements.last(),
            Some(LuaStmt::Expression(LuaExpr::Assignment(_)))
        ));
    }

    #[test]
    fn for_without_condition_loops_on_true() {
        let body = method_body("class C { void M() { for (;;) { break; } } }");
        let LuaStmt::Do(outer) = &body.statements[0] else {
            panic!("expected nested block");
        };
        let LuaStmt::While { cond, .. } = &outer.statements[0] else {
            panic!("expected while");
        };
        assert_eq!(*cond, LuaExpr::Literal(LuaLiteral::Bool(true)));
    }

    #[test]
    fn foreach_maps_to_for_in() {
        let body = method_body("class C { void M(int[] xs) { foreach (int x in xs) { } } }");
        let LuaStmt::ForIn { names, exprs, .. } = &body.statements[0] else {
            panic!("expected for-in, got {:?}", body.statements[0]);
        };
        assert_eq!(names, &["x"]);
        assert_eq!(exprs, &[LuaExpr::name("xs")]);
    }

    #[test]
    fn else_if_chains_stay_chained() {
        let body = method_body(
            "class C { void M(int x) { if (x == 1) { } else if (x == 2) { } else { } } }",
        );
        let LuaStmt::If(branch) = &body.statements[0] else {
            panic!("expected if");
        };
        let Some(LuaElse::ElseIf(elseif)) = &branch.else_branch else {
            panic!("expected elseif chain, got {:?}", branch.else_branch);
        };
        assert!(matches!(elseif.else_branch, Some(LuaElse::Block(_))));
    }

    #[test]
    fn goto_and_labels_pass_through() {
        let body = method_body("class C { void M() { goto done; done: return; } }");
        assert!(matches!(&body.statements[0], LuaStmt::Goto(target) if target == "done"));
        let LuaStmt::Labeled { name, body: inner } = &body.statements[1] else {
            panic!("expected labeled statement, got {:?}", body.statements[1]);
        };
        assert_eq!(name, "done");
        assert!(matches!(**inner, LuaStmt::Return(_)));
    }

    #[test]
    fn lexical_blocks_are_preserved() {
        let body = method_body("class C { void M() { { int x = 0; } } }");
        assert!(matches!(body.statements[0], LuaStmt::Do(_)));
    }

    #[test]
    fn throw_becomes_a_throw_call() {
        let body = method_body("class C { void M() { throw new System.Exception(); } }");
        let LuaStmt::Expression(LuaExpr::Invocation(inv)) = &body.statements[0] else {
            panic!("expected invocation, got {:?}", body.statements[0]);
        };
        assert_eq!(*inv.callee, LuaExpr::name("Throw"));
        assert_eq!(inv.args.len(), 1);
    }

    #[test]
    fn try_catch_finally_lowers_to_system_try() {
        let body = method_body(
            "class C { void M() { try { } catch (System.Exception e) { } finally { } } }",
        );
        let LuaStmt::Expression(LuaExpr::Invocation(inv)) = &body.statements[0] else {
            panic!("expected System.Try call, got {:?}", body.statements[0]);
        };
        assert_eq!(*inv.callee, LuaExpr::name("System.Try"));
        assert_eq!(inv.args.len(), 3);
        let LuaExpr::Function(catch) = &inv.args[1] else {
            panic!("expected catch function");
        };
        assert_eq!(catch.params, vec!["e"]);
    }

    #[test]
    fn multi_declarator_locals_collapse_without_initializers() {
        let body = method_body("class C { void M() { int a, b, c; } }");
        assert!(matches!(&body.statements[0], LuaStmt::Local { names, values }
            if names == &["a", "b", "c"] && values.is_empty()));
    }

    #[test]
    fn initialized_declarators_stay_separate() {
        let body = method_body("class C { void M() { int a = 1, b = 2; } }");
        assert!(matches!(&body.statements[0], LuaStmt::Local { names, .. } if names == &["a"]));
        assert!(matches!(&body.statements[1], LuaStmt::Local { names, .. } if names == &["b"]));
    }
}
