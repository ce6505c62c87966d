//! C# expression lowering.
//!
//! Maps C# expressions to Lua expressions. Several lowerings are
//! statement-expressions: increments, ref/out invocations and the falsey
//! ternary return an expression *and* append preparatory statements to the
//! innermost block (`CsContext::emit`). Tests cover both the statement and
//! the value context of each.

use cslua_repr::expr::{LuaExpr, LuaLiteral, PropertyAdapter};
use cslua_repr::map_operator_token;
use cslua_repr::stmt::LuaStmt;
use tracing::trace;
use tree_sitter::Node;

use super::context::CsContext;
use crate::{missing_node, missing_symbol, unsupported, Symbol, SymbolKind, TranslateResult};

/// Translate a C# expression node to a Lua expression.
pub fn translate_expr(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    match node.kind() {
        // Literals
        "integer_literal" | "real_literal" => {
            Ok(LuaExpr::Literal(LuaLiteral::Number(ctx.node_text(node).to_string())))
        }
        "string_literal" | "verbatim_string_literal" | "raw_string_literal" => {
            Ok(LuaExpr::Literal(LuaLiteral::Str(ctx.node_text(node).to_string())))
        }
        "character_literal" => Ok(LuaExpr::Literal(LuaLiteral::Char(parse_character_literal(
            ctx.node_text(node),
        )))),
        "boolean_literal" => Ok(LuaExpr::Literal(LuaLiteral::Bool(ctx.node_text(node) == "true"))),
        "null_literal" => Ok(LuaExpr::nil()),
        "this_expression" => Ok(LuaExpr::name("this")),
        "base_expression" => Ok(base_type_name(ctx)),

        // Names
        "identifier" => translate_identifier(ctx, node),
        "qualified_name" => translate_qualified_name(ctx, node),
        "generic_name" => {
            let ident = find_child_by_kind(node, "identifier")
                .ok_or_else(|| missing_node("generic name identifier", node))?;
            translate_identifier(ctx, ident)
        }
        "predefined_type" => {
            let text = ctx.node_text(node);
            let mapped = ctx.type_map_name(text).unwrap_or(text);
            Ok(LuaExpr::name(mapped))
        }

        // Composition
        "parenthesized_expression" => {
            let inner = node
                .named_child(0)
                .ok_or_else(|| missing_node("inner expression", node))?;
            Ok(LuaExpr::Paren(Box::new(translate_expr(ctx, inner)?)))
        }
        "binary_expression" => translate_binary(ctx, node),
        "prefix_unary_expression" => translate_prefix_unary(ctx, node),
        "postfix_unary_expression" => translate_postfix_unary(ctx, node),
        "conditional_expression" => translate_conditional(ctx, node),
        "assignment_expression" => translate_assignment(ctx, node),
        "member_access_expression" => translate_member_access(ctx, node),
        "invocation_expression" => translate_invocation(ctx, node),
        "object_creation_expression" => translate_object_creation(ctx, node),
        "element_access_expression" => translate_element_access(ctx, node),
        "interpolated_string_expression" => translate_interpolated_string(ctx, node),
        "lambda_expression" => translate_lambda(ctx, node),
        "cast_expression" => {
            // Casts are erased; the runtime object model is untyped.
            let value = node
                .child_by_field_name("value")
                .or_else(|| node.named_child(node.named_child_count().saturating_sub(1)))
                .ok_or_else(|| missing_node("cast operand", node))?;
            translate_expr(ctx, value)
        }

        _ => Err(unsupported(&format!("expression kind: {}", node.kind()), node)),
    }
}

/// Find the first child of the given kind.
pub(super) fn find_child_by_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// True unless `node` is the `.name` half of a member access, i.e. true
/// when the identifier stands alone or is the receiver side.
pub(super) fn is_internal_node(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return true;
    };
    match parent.kind() {
        "member_access_expression" | "qualified_name" => {
            parent.child_by_field_name("name").map(|n| n.id()) != Some(node.id())
        }
        _ => true,
    }
}

/// True when the node's value is discarded: it is the expression of an
/// expression statement, or a for-loop initializer/incrementor.
pub(super) fn is_statement_context(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "expression_statement" => true,
        "for_statement" => {
            parent.child_by_field_name("condition").map(|c| c.id()) != Some(node.id())
        }
        _ => false,
    }
}

/// True when `node` is the left side of a simple `=` assignment.
fn is_simple_assignment_target(ctx: &CsContext<'_>, node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    parent.kind() == "assignment_expression"
        && parent.child_by_field_name("left").map(|l| l.id()) == Some(node.id())
        && assignment_operator(ctx, parent).as_deref() == Some("=")
}

/// The assignment operator token of an `assignment_expression`.
fn assignment_operator(ctx: &CsContext<'_>, node: Node<'_>) -> Option<String> {
    if let Some(op) = node.child_by_field_name("operator") {
        return Some(ctx.node_text(op).to_string());
    }
    let left_id = node.child_by_field_name("left").map(|l| l.id());
    let right_id = node.child_by_field_name("right").map(|r| r.id());
    let mut cursor = node.walk();
    let op = node
        .children(&mut cursor)
        .find(|c| Some(c.id()) != left_id && Some(c.id()) != right_id)
        .map(|c| ctx.node_text(c).to_string());
    op
}

/// Qualified name of the current type's base, for `base.` receivers.
fn base_type_name(ctx: &CsContext<'_>) -> LuaExpr {
    let name = ctx
        .cur_type()
        .base_names
        .first()
        .cloned()
        .unwrap_or_else(|| "System.Object".to_string());
    LuaExpr::name(name)
}

fn parse_character_literal(raw: &str) -> char {
    let inner = raw.trim_matches('\'');
    if let Some(escaped) = inner.strip_prefix('\\') {
        match escaped.chars().next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some(c) => c,
            None => '\\',
        }
    } else {
        inner.chars().next().unwrap_or('\0')
    }
}

// --- identifier resolution ----------------------------------------------

/// Lower an identifier use-site by symbol kind.
pub(super) fn translate_identifier(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
) -> TranslateResult<LuaExpr> {
    let Some(symbol) = ctx.symbol_of(node) else {
        // A member of a type the model cannot see keeps its spelling; a
        // standalone identifier without a symbol is a collaborator failure.
        if !is_internal_node(node) {
            return Ok(LuaExpr::name(ctx.node_text(node)));
        }
        return Err(missing_symbol(ctx.node_text(node), node));
    };

    match symbol.kind {
        SymbolKind::Local | SymbolKind::Parameter | SymbolKind::TypeParameter | SymbolKind::Label => {
            Ok(LuaExpr::name(&symbol.name))
        }
        SymbolKind::NamedType => Ok(LuaExpr::name(&symbol.qualified_name)),
        SymbolKind::Field => translate_field_identifier(ctx, node, symbol),
        SymbolKind::Method => Ok(method_name_expression(ctx, node, symbol)),
        SymbolKind::Property | SymbolKind::Event => {
            translate_field_or_event_identifier(ctx, node, symbol)
        }
    }
}

fn translate_field_identifier(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
    symbol: &Symbol,
) -> TranslateResult<LuaExpr> {
    if symbol.is_static && symbol.has_constant_value() {
        return Ok(visit_const_identifier(symbol));
    }
    if symbol.is_static {
        return Ok(build_static_field_name(ctx, node, symbol));
    }
    if is_internal_node(node) {
        Ok(LuaExpr::member(LuaExpr::name("this"), &symbol.name, false))
    } else {
        Ok(LuaExpr::name(&symbol.name))
    }
}

/// Inline the literal of a constant-valued field. No member access is
/// produced for const references.
fn visit_const_identifier(symbol: &Symbol) -> LuaExpr {
    let value = symbol
        .constant_value
        .clone()
        .expect("const symbol without value");
    LuaExpr::Literal(value)
}

/// Shape the reference to a static field.
fn build_static_field_name(ctx: &mut CsContext<'_>, node: Node<'_>, symbol: &Symbol) -> LuaExpr {
    if symbol.accessibility.is_private() {
        return LuaExpr::name(&symbol.name);
    }
    if symbol.is_readonly {
        // A readonly static assigned inside the static constructor is
        // published on the type table afterwards; record the name.
        if is_simple_assignment_target(ctx, node) {
            ctx.cur_type_mut().record_static_readonly_assignment(&symbol.name);
        }
        return LuaExpr::name(&symbol.name);
    }
    if ctx.in_static_ctor() {
        return LuaExpr::member(LuaExpr::name("this"), &symbol.name, false);
    }
    if is_internal_node(node) {
        LuaExpr::name(&symbol.qualified_name)
    } else {
        LuaExpr::name(&symbol.name)
    }
}

/// Shape the reference to a method by usage position.
fn method_name_expression(ctx: &mut CsContext<'_>, node: Node<'_>, symbol: &Symbol) -> LuaExpr {
    if symbol.is_static {
        let mapped = ctx
            .method_map_name(symbol)
            .map(str::to_string)
            .unwrap_or_else(|| symbol.qualified_name.clone());
        return LuaExpr::name(mapped);
    }
    if is_internal_node(node) {
        if !symbol.is_overridable || symbol.containing_type_sealed {
            LuaExpr::InternalMethod(symbol.name.clone())
        } else {
            // Late binding: go through this so overrides dispatch.
            LuaExpr::member(LuaExpr::name("this"), &symbol.name, true)
        }
    } else {
        LuaExpr::name(&symbol.name)
    }
}

/// Shape a property or event reference: field-like symbols follow the
/// field rules, accessor-backed symbols become a [`PropertyAdapter`].
fn translate_field_or_event_identifier(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
    symbol: &Symbol,
) -> TranslateResult<LuaExpr> {
    let field_like = match symbol.kind {
        SymbolKind::Property => {
            symbol.is_auto_property && !symbol.is_overridable && !symbol.implements_interface
        }
        SymbolKind::Event => {
            symbol.is_event_field && !symbol.is_overridable && !symbol.implements_interface
        }
        _ => false,
    };
    if field_like {
        if symbol.is_static {
            return Ok(build_static_field_name(ctx, node, symbol));
        }
        if is_internal_node(node) {
            return Ok(LuaExpr::member(LuaExpr::name("this"), &symbol.name, false));
        }
        return Ok(LuaExpr::name(&symbol.name));
    }

    let mut adapter = PropertyAdapter::getter(&symbol.name);
    if is_internal_node(node) {
        if symbol.is_static {
            let receiver = symbol
                .containing_type
                .clone()
                .unwrap_or_else(|| symbol.qualified_name.clone());
            adapter = adapter.with_receiver(LuaExpr::name(receiver), false);
        } else if symbol.is_overridable && !symbol.containing_type_sealed {
            adapter = adapter.with_receiver(LuaExpr::name("this"), true);
        } else {
            adapter.args.push(LuaExpr::name("this"));
        }
    }
    // Member-access position: leave the adapter bare; the member-access
    // visitor supplies the receiver.
    Ok(LuaExpr::Property(adapter))
}

fn translate_qualified_name(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    if let Some(symbol) = ctx.symbol_of(node) {
        return Ok(LuaExpr::name(&symbol.qualified_name));
    }
    Ok(LuaExpr::name(ctx.node_text(node)))
}

// --- member access -------------------------------------------------------

fn translate_member_access(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let expression = node
        .child_by_field_name("expression")
        .ok_or_else(|| missing_node("member access receiver", node))?;
    let name_node = node
        .child_by_field_name("name")
        .ok_or_else(|| missing_node("member access name", node))?;
    let name_ident = if name_node.kind() == "generic_name" {
        find_child_by_kind(name_node, "identifier").unwrap_or(name_node)
    } else {
        name_node
    };

    let receiver = translate_expr(ctx, expression)?;
    // base.M dispatches statically: plain dot access, this passed
    // explicitly by the invocation visitor.
    let through_base = expression.kind() == "base_expression";

    let Some(symbol) = ctx.symbol_of(name_ident) else {
        return Ok(LuaExpr::member(receiver, ctx.node_text(name_ident), false));
    };

    match symbol.kind {
        SymbolKind::Property | SymbolKind::Event => {
            let lowered = translate_identifier(ctx, name_ident)?;
            match lowered {
                LuaExpr::Property(adapter) => {
                    let colon = !symbol.is_static;
                    Ok(LuaExpr::Property(adapter.with_receiver(receiver, colon)))
                }
                // Field-like property: an ordinary member access.
                _ => Ok(LuaExpr::member(receiver, &symbol.name, false)),
            }
        }
        SymbolKind::Field if symbol.has_constant_value() => Ok(visit_const_identifier(symbol)),
        SymbolKind::Method if symbol.is_static => {
            if let Some(mapped) = ctx.method_map_name(symbol) {
                return Ok(LuaExpr::name(mapped));
            }
            Ok(LuaExpr::member(receiver, &symbol.name, false))
        }
        _ => {
            let colon = symbol.kind == SymbolKind::Method && !symbol.is_static && !through_base;
            Ok(LuaExpr::member(receiver, &symbol.name, colon))
        }
    }
}

// --- assignment ----------------------------------------------------------

/// Complete an assignment whose left side has already been lowered: a
/// property adapter absorbs the value, everything else becomes a plain
/// assignment node.
fn make_assignment(target: LuaExpr, value: LuaExpr) -> LuaExpr {
    match target {
        LuaExpr::Property(mut adapter) => {
            adapter.complete_set(value);
            LuaExpr::Property(adapter)
        }
        other => LuaExpr::assign(other, value),
    }
}

fn translate_assignment(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let left = node
        .child_by_field_name("left")
        .ok_or_else(|| missing_node("assignment target", node))?;
    let right = node
        .child_by_field_name("right")
        .ok_or_else(|| missing_node("assignment value", node))?;
    let operator =
        assignment_operator(ctx, node).ok_or_else(|| missing_node("assignment operator", node))?;

    if operator != "=" {
        return translate_compound_assignment(ctx, node, left, right, &operator);
    }

    if right.kind() == "assignment_expression"
        && assignment_operator(ctx, right).as_deref() == Some("=")
    {
        return translate_chained_assignment(ctx, node, left, right);
    }

    let target = translate_expr(ctx, left)?;
    let value = translate_expr(ctx, right)?;
    Ok(make_assignment(target, value))
}

/// `x op= e` → `x = x op e`, through the ordinary assignment path so
/// property adapters keep working on the left side.
fn translate_compound_assignment(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
    left: Node<'_>,
    right: Node<'_>,
    operator: &str,
) -> TranslateResult<LuaExpr> {
    let base_op = operator
        .strip_suffix('=')
        .ok_or_else(|| unsupported(&format!("assignment operator {operator}"), node))?;
    let target = translate_expr(ctx, left)?;
    let current = translate_expr(ctx, left)?;
    let rhs = translate_expr(ctx, right)?;
    let op = binary_output_token(ctx, base_op, left, right);
    Ok(make_assignment(target, LuaExpr::binary(op, current, rhs)))
}

/// Unfold `a = b = c = e` into one assignment per link. Each link's value
/// is the next link's target (the eventual value propagates right to
/// left); the reversed list executes innermost-first and reads back into
/// source order right-to-left.
fn translate_chained_assignment(
    ctx: &mut CsContext<'_>,
    _node: Node<'_>,
    first_left: Node<'_>,
    first_right: Node<'_>,
) -> TranslateResult<LuaExpr> {
    let mut targets = vec![first_left];
    let mut cursor = first_right;
    while cursor.kind() == "assignment_expression"
        && assignment_operator(ctx, cursor).as_deref() == Some("=")
    {
        let left = cursor
            .child_by_field_name("left")
            .ok_or_else(|| missing_node("assignment target", cursor))?;
        targets.push(left);
        cursor = cursor
            .child_by_field_name("right")
            .ok_or_else(|| missing_node("assignment value", cursor))?;
    }
    let eventual = translate_expr(ctx, cursor)?;

    let mut links = Vec::with_capacity(targets.len());
    for (i, target_node) in targets.iter().enumerate() {
        let target = translate_expr(ctx, *target_node)?;
        let value = if i + 1 < targets.len() {
            translate_expr(ctx, targets[i + 1])?
        } else {
            eventual.clone()
        };
        links.push(make_assignment(target, value));
    }
    links.reverse();
    Ok(LuaExpr::LineMultiple(links))
}

// --- invocation ----------------------------------------------------------

fn translate_invocation(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let callee_node = node
        .child_by_field_name("function")
        .ok_or_else(|| missing_node("callee", node))?;
    let argument_list = node
        .child_by_field_name("arguments")
        .ok_or_else(|| missing_node("argument list", node))?;

    let name_ident = callee_name_identifier(callee_node);
    let symbol = name_ident.and_then(|n| ctx.symbol_of(n));

    // Lower arguments, noting ref/out positions. `out` arguments leave the
    // call's argument list entirely; `ref` arguments stay and are also
    // assigned back.
    let mut args = Vec::new();
    let mut ref_out_targets = Vec::new();
    let mut cursor = argument_list.walk();
    for argument in argument_list.children(&mut cursor) {
        if argument.kind() != "argument" {
            continue;
        }
        let modifier = argument
            .child(0)
            .map(|c| ctx.node_text(c))
            .filter(|t| *t == "ref" || *t == "out");
        let expr_node = argument
            .named_child(argument.named_child_count().saturating_sub(1))
            .ok_or_else(|| missing_node("argument expression", argument))?;
        let lowered = translate_expr(ctx, expr_node)?;
        match modifier {
            Some("out") => ref_out_targets.push(lowered),
            Some(_) => {
                ref_out_targets.push(lowered.clone());
                args.push(lowered);
            }
            None => args.push(lowered),
        }
    }

    // Reduced extension-method calls become free-function calls with the
    // receiver first. A call spelled through the declaring class is an
    // ordinary static call.
    let callee = if let (Some(sym), "member_access_expression") =
        (symbol, callee_node.kind())
    {
        let receiver_is_type = callee_node
            .child_by_field_name("expression")
            .and_then(|e| ctx.symbol_of(e))
            .is_some_and(|s| s.kind == SymbolKind::NamedType);
        if sym.is_extension_method && !receiver_is_type {
            let receiver_node = callee_node
                .child_by_field_name("expression")
                .ok_or_else(|| missing_node("extension receiver", callee_node))?;
            let receiver = translate_expr(ctx, receiver_node)?;
            args.insert(0, receiver);
            let container = sym
                .reduced_container
                .clone()
                .unwrap_or_else(|| sym.qualified_name.clone());
            LuaExpr::name(format!("{}.{}", container, sym.name))
        } else {
            translate_expr(ctx, callee_node)?
        }
    } else {
        translate_expr(ctx, callee_node)?
    };

    // An internal-method marker is a plain call with explicit this; so is
    // a base call.
    let callee = match callee {
        LuaExpr::InternalMethod(name) => {
            args.insert(0, LuaExpr::name("this"));
            LuaExpr::name(name)
        }
        other => {
            let through_base = callee_node.kind() == "member_access_expression"
                && callee_node
                    .child_by_field_name("expression")
                    .is_some_and(|e| e.kind() == "base_expression");
            if through_base {
                args.insert(0, LuaExpr::name("this"));
            }
            other
        }
    };

    // Generic calls: pad optional slots with nil so positions line up,
    // then append the mapped type arguments as runtime arguments.
    let type_arguments = callee_type_arguments(ctx, callee_node);
    if !type_arguments.is_empty() {
        if let Some(sym) = symbol {
            while args.len() < sym.parameters.len() {
                args.push(LuaExpr::nil());
            }
        }
        for type_arg in &type_arguments {
            let mapped = ctx.type_map_name(type_arg).unwrap_or(type_arg.as_str());
            args.push(LuaExpr::name(mapped));
        }
    }

    let invocation = LuaExpr::invocation(callee, args);

    if ref_out_targets.is_empty() {
        return Ok(invocation);
    }
    translate_ref_out_invocation(ctx, node, symbol, invocation, ref_out_targets)
}

/// Rewrite a call with ref/out arguments as a multi-assignment.
fn translate_ref_out_invocation(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
    symbol: Option<&Symbol>,
    invocation: LuaExpr,
    ref_out_targets: Vec<LuaExpr>,
) -> TranslateResult<LuaExpr> {
    let returns_void = symbol.map(|s| s.returns_void).unwrap_or(false);
    trace!(targets = ref_out_targets.len(), returns_void, "ref/out call rewrite");

    if is_statement_context(node) {
        let mut targets = Vec::new();
        if !returns_void {
            let temp = ctx.fresh_temp(node)?;
            ctx.emit(LuaStmt::Local {
                names: vec![temp.clone()],
                values: Vec::new(),
            });
            targets.push(LuaExpr::name(temp));
        }
        targets.extend(ref_out_targets);
        return Ok(LuaExpr::Assignment(cslua_repr::LuaAssignment {
            targets,
            values: vec![invocation],
        }));
    }

    // Value context: land the multi-assignment ahead of the use and stand
    // the return temporary in for the call.
    let temp = ctx.fresh_temp(node)?;
    ctx.emit(LuaStmt::Local {
        names: vec![temp.clone()],
        values: Vec::new(),
    });
    let mut targets = vec![LuaExpr::name(temp.clone())];
    targets.extend(ref_out_targets);
    ctx.emit(LuaStmt::Expression(LuaExpr::Assignment(
        cslua_repr::LuaAssignment {
            targets,
            values: vec![invocation],
        },
    )));
    Ok(LuaExpr::name(temp))
}

/// The identifier naming the invoked member, for symbol lookup.
fn callee_name_identifier(callee: Node<'_>) -> Option<Node<'_>> {
    match callee.kind() {
        "identifier" => Some(callee),
        "generic_name" => find_child_by_kind(callee, "identifier"),
        "member_access_expression" => {
            let name = callee.child_by_field_name("name")?;
            if name.kind() == "generic_name" {
                find_child_by_kind(name, "identifier")
            } else {
                Some(name)
            }
        }
        _ => None,
    }
}

/// Explicit type arguments of the callee, as source text.
fn callee_type_arguments(ctx: &CsContext<'_>, callee: Node<'_>) -> Vec<String> {
    let generic = match callee.kind() {
        "generic_name" => Some(callee),
        "member_access_expression" => callee
            .child_by_field_name("name")
            .filter(|n| n.kind() == "generic_name"),
        _ => None,
    };
    let Some(generic) = generic else {
        return Vec::new();
    };
    let Some(list) = find_child_by_kind(generic, "type_argument_list") else {
        return Vec::new();
    };
    let mut cursor = list.walk();
    let names = list
        .named_children(&mut cursor)
        .map(|t| ctx.node_text(t).to_string())
        .collect();
    names
}

// --- object creation / element access ------------------------------------

fn translate_object_creation(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let type_node = node
        .child_by_field_name("type")
        .ok_or_else(|| missing_node("created type", node))?;
    if find_child_by_kind(node, "initializer_expression").is_some() {
        return Err(unsupported("object initializer list", node));
    }

    let name_node = if type_node.kind() == "generic_name" {
        find_child_by_kind(type_node, "identifier").unwrap_or(type_node)
    } else {
        type_node
    };
    let type_name = if let Some(symbol) = ctx.symbol_of(name_node) {
        symbol.qualified_name.clone()
    } else {
        let text = ctx.node_text(name_node);
        ctx.type_map_name(text).unwrap_or(text).to_string()
    };

    let mut args = Vec::new();
    if let Some(argument_list) = node.child_by_field_name("arguments") {
        let mut cursor = argument_list.walk();
        for argument in argument_list.children(&mut cursor) {
            if argument.kind() != "argument" {
                continue;
            }
            let expr_node = argument
                .named_child(argument.named_child_count().saturating_sub(1))
                .ok_or_else(|| missing_node("argument expression", argument))?;
            args.push(translate_expr(ctx, expr_node)?);
        }
    }
    Ok(LuaExpr::invocation(LuaExpr::name(type_name), args))
}

/// `a[i]` is the indexer accessor pair: a get adapter the assignment
/// visitor can flip to set.
fn translate_element_access(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let expression = node
        .child_by_field_name("expression")
        .ok_or_else(|| missing_node("indexed expression", node))?;
    let subscripts = node
        .child_by_field_name("subscript")
        .or_else(|| find_child_by_kind(node, "bracketed_argument_list"))
        .ok_or_else(|| missing_node("subscript", node))?;

    let receiver = translate_expr(ctx, expression)?;
    let mut adapter = PropertyAdapter::getter("").with_receiver(receiver, true);
    let mut cursor = subscripts.walk();
    for argument in subscripts.children(&mut cursor) {
        if argument.kind() != "argument" {
            continue;
        }
        let expr_node = argument
            .named_child(argument.named_child_count().saturating_sub(1))
            .ok_or_else(|| missing_node("subscript expression", argument))?;
        adapter.args.push(translate_expr(ctx, expr_node)?);
    }
    Ok(LuaExpr::Property(adapter))
}

// --- unary ----------------------------------------------------------------

fn translate_prefix_unary(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let operator = node
        .child(0)
        .map(|c| ctx.node_text(c).to_string())
        .ok_or_else(|| missing_node("unary operator", node))?;
    let operand = node
        .named_child(0)
        .ok_or_else(|| missing_node("unary operand", node))?;

    match operator.as_str() {
        "++" | "--" => translate_increment(ctx, node, operand, &operator, true),
        _ => {
            let lowered = translate_expr(ctx, operand)?;
            Ok(LuaExpr::Unary {
                op: map_operator_token(&operator).to_string(),
                operand: Box::new(lowered),
            })
        }
    }
}

fn translate_postfix_unary(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let operand = node
        .named_child(0)
        .ok_or_else(|| missing_node("unary operand", node))?;
    let operator = {
        let mut cursor = node.walk();
        let mut op = None;
        for child in node.children(&mut cursor) {
            if !child.is_named() {
                op = Some(ctx.node_text(child).to_string());
            }
        }
        op
    }
    .ok_or_else(|| missing_node("unary operator", node))?;

    match operator.as_str() {
        "++" | "--" => translate_increment(ctx, node, operand, &operator, false),
        _ => Err(unsupported(&format!("postfix operator {operator}"), node)),
    }
}

/// `++x` / `x++` → `x = x + 1` (resp. `- 1`), as the whole statement when
/// the value is discarded, otherwise as a preceding statement with the
/// pre- or post-value standing in.
fn translate_increment(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
    operand: Node<'_>,
    operator: &str,
    is_prefix: bool,
) -> TranslateResult<LuaExpr> {
    let op = if operator == "++" { "+" } else { "-" };
    let target = translate_expr(ctx, operand)?;
    let current = translate_expr(ctx, operand)?;
    let one = LuaExpr::number("1");
    let assignment = make_assignment(target, LuaExpr::binary(op, current, one));

    if is_statement_context(node) {
        return Ok(assignment);
    }

    if is_prefix {
        ctx.emit(LuaStmt::Expression(assignment));
        translate_expr(ctx, operand)
    } else {
        let temp = ctx.fresh_temp(node)?;
        let before = translate_expr(ctx, operand)?;
        ctx.emit(LuaStmt::Local {
            names: vec![temp.clone()],
            values: vec![before],
        });
        ctx.emit(LuaStmt::Expression(assignment));
        Ok(LuaExpr::name(temp))
    }
}

// --- conditional -----------------------------------------------------------

/// Ternary lowering. A when-true branch whose type can be `nil` or `false`
/// breaks the `(cond and t) or f` shortcut, so it expands to an if/else
/// over a minted temporary.
fn translate_conditional(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let condition = node
        .child_by_field_name("condition")
        .ok_or_else(|| missing_node("ternary condition", node))?;
    let consequence = node
        .child_by_field_name("consequence")
        .ok_or_else(|| missing_node("ternary consequence", node))?;
    let alternative = node
        .child_by_field_name("alternative")
        .ok_or_else(|| missing_node("ternary alternative", node))?;

    let may_be_falsey = ctx
        .type_of(consequence)
        .map(|t| t.may_be_falsey())
        .unwrap_or(true);

    if !may_be_falsey {
        let cond = translate_expr(ctx, condition)?;
        let when_true = translate_expr(ctx, consequence)?;
        let when_false = translate_expr(ctx, alternative)?;
        return Ok(LuaExpr::binary(
            "or",
            LuaExpr::Paren(Box::new(LuaExpr::binary("and", cond, when_true))),
            when_false,
        ));
    }

    let temp = ctx.fresh_temp(node)?;
    ctx.emit(LuaStmt::Local {
        names: vec![temp.clone()],
        values: Vec::new(),
    });
    let cond = translate_expr(ctx, condition)?;

    ctx.push_block();
    let when_true = translate_expr(ctx, consequence)?;
    ctx.emit(LuaStmt::Expression(LuaExpr::assign(
        LuaExpr::name(&temp),
        when_true,
    )));
    let then_block = ctx.pop_block();

    ctx.push_block();
    let when_false = translate_expr(ctx, alternative)?;
    ctx.emit(LuaStmt::Expression(LuaExpr::assign(
        LuaExpr::name(&temp),
        when_false,
    )));
    let else_block = ctx.pop_block();

    ctx.emit(LuaStmt::If(cslua_repr::LuaIf {
        cond,
        body: then_block,
        else_branch: Some(cslua_repr::LuaElse::Block(else_block)),
    }));
    Ok(LuaExpr::name(temp))
}

// --- binary -----------------------------------------------------------------

/// Output token for a binary operator, including the string-concat rewrite.
fn binary_output_token(
    ctx: &CsContext<'_>,
    operator: &str,
    left: Node<'_>,
    right: Node<'_>,
) -> String {
    if operator == "+" {
        let stringy = |n: Node<'_>| ctx.type_of(n).map(|t| t.is_string).unwrap_or(false);
        if stringy(left) || stringy(right) {
            return "..".to_string();
        }
    }
    map_operator_token(operator).to_string()
}

fn translate_binary(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let left = node
        .child_by_field_name("left")
        .ok_or_else(|| missing_node("binary left operand", node))?;
    let right = node
        .child_by_field_name("right")
        .ok_or_else(|| missing_node("binary right operand", node))?;
    let operator = node
        .child_by_field_name("operator")
        .map(|o| ctx.node_text(o).to_string())
        .ok_or_else(|| missing_node("binary operator", node))?;

    if operator == "is" || operator == "as" {
        return Err(unsupported(&format!("operator {operator}"), node));
    }

    let op = binary_output_token(ctx, &operator, left, right);
    let lhs = translate_expr(ctx, left)?;
    let rhs = translate_expr(ctx, right)?;
    Ok(LuaExpr::binary(op, lhs, rhs))
}

// --- strings & lambdas ------------------------------------------------------

/// `$"a{x}b"` folds into a `..` chain.
fn translate_interpolated_string(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
) -> TranslateResult<LuaExpr> {
    let mut parts = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "interpolated_string_text" => {
                let text = ctx.node_text(child);
                parts.push(LuaExpr::Literal(LuaLiteral::Str(format!("\"{text}\""))));
            }
            "interpolation" => {
                let inner = child
                    .named_child(0)
                    .ok_or_else(|| missing_node("interpolation expression", child))?;
                parts.push(LuaExpr::Paren(Box::new(translate_expr(ctx, inner)?)));
            }
            _ => {}
        }
    }
    let mut iter = parts.into_iter();
    let first = iter
        .next()
        .unwrap_or_else(|| LuaExpr::Literal(LuaLiteral::Str("\"\"".to_string())));
    Ok(iter.fold(first, |acc, part| LuaExpr::binary("..", acc, part)))
}

fn translate_lambda(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaExpr> {
    let mut params = Vec::new();
    if let Some(parameters) = node.child_by_field_name("parameters") {
        match parameters.kind() {
            "identifier" => params.push(ctx.node_text(parameters).to_string()),
            _ => {
                let mut cursor = parameters.walk();
                for parameter in parameters.children(&mut cursor) {
                    if parameter.kind() == "parameter" {
                        if let Some(name) = parameter.child_by_field_name("name") {
                            params.push(ctx.node_text(name).to_string());
                        }
                    }
                }
            }
        }
    }

    let body = node
        .child_by_field_name("body")
        .ok_or_else(|| missing_node("lambda body", node))?;

    ctx.push_function(super::context::FunctionContext::new());
    let block = if body.kind() == "block" {
        super::stmts::translate_block(ctx, body)?
    } else {
        ctx.push_block();
        let value = translate_expr(ctx, body)?;
        ctx.emit(LuaStmt::Return(vec![value]));
        ctx.pop_block()
    };
    ctx.pop_function();

    Ok(LuaExpr::Function(cslua_repr::LuaFunction::new(params, block)))
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::TranslateErrorKind;
    use cslua_repr::expr::{LuaExpr, LuaLiteral};
    use cslua_repr::stmt::LuaStmt;

    fn return_value(source: &str) -> LuaExpr {
        let unit = translate(source);
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);
        let LuaStmt::Return(values) = body.last().unwrap() else {
            panic!("expected trailing return");
        };
        values[0].clone()
    }

    #[test]
    fn logical_operators_are_remapped() {
        let value =
            return_value("class C { bool M(bool a, bool b, int x, int y) { return a && b || x != y; } }");
        let LuaExpr::Binary { op, lhs, rhs } = value else {
            panic!("expected binary");
        };
        assert_eq!(op, "or");
        assert!(matches!(*lhs, LuaExpr::Binary { ref op, .. } if op == "and"));
        assert!(matches!(*rhs, LuaExpr::Binary { ref op, .. } if op == "~="));
    }

    #[test]
    fn null_coalescing_becomes_or() {
        let value = return_value("class C { object M(object a, object b) { return a ?? b; } }");
        assert!(matches!(value, LuaExpr::Binary { ref op, .. } if op == "or"));
    }

    #[test]
    fn string_plus_becomes_concat() {
        let value = return_value("class C { string M(string a) { return a + \"b\"; } }");
        assert!(matches!(value, LuaExpr::Binary { ref op, .. } if op == ".."));
    }

    #[test]
    fn value_type_ternary_uses_and_or_shortcut() {
        let value = return_value("class C { int M(bool c, int a, int b) { return c ? a : b; } }");
        let LuaExpr::Binary { op, lhs, .. } = value else {
            panic!("expected or-chain");
        };
        assert_eq!(op, "or");
        let LuaExpr::Paren(inner) = *lhs else {
            panic!("expected parenthesized and");
        };
        assert!(matches!(*inner, LuaExpr::Binary { ref op, .. } if op == "and"));
    }

    #[test]
    fn falsey_ternary_expands_to_if_else() {
        let unit =
            translate("class C { void M(bool c, bool t, bool f) { bool r = c ? t : f; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        // local t1; if c then t1 = t else t1 = f end; local r = t1
        assert!(matches!(body[0], LuaStmt::Local { names, values }
            if names == &["t1"] && values.is_empty()));
        let LuaStmt::If(branch) = body[1] else {
            panic!("expected if expansion, got {:?}", body[1]);
        };
        assert!(matches!(
            branch.body.statements.first(),
            Some(LuaStmt::Expression(LuaExpr::Assignment(_)))
        ));
        assert!(branch.else_branch.is_some());
        assert!(matches!(body[2], LuaStmt::Local { names, values }
            if names == &["r"] && values == &[LuaExpr::name("t1")]));
    }

    #[test]
    fn prefix_increment_in_value_position_emits_then_reads() {
        let unit = translate("class C { void M(int x) { int y = ++x; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        assert!(matches!(body[0], LuaStmt::Expression(LuaExpr::Assignment(_))));
        assert!(matches!(body[1], LuaStmt::Local { names, values }
            if names == &["y"] && values == &[LuaExpr::name("x")]));
    }

    #[test]
    fn compound_assignment_expands() {
        let unit = translate("class C { void M(int x) { x += 2; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        let LuaStmt::Expression(LuaExpr::Assignment(assign)) = body[0] else {
            panic!("expected assignment, got {:?}", body[0]);
        };
        assert_eq!(
            assign.values,
            vec![LuaExpr::binary("+", LuaExpr::name("x"), LuaExpr::number("2"))]
        );
    }

    #[test]
    fn accessor_property_assignment_completes_the_adapter() {
        let unit = translate(
            "class C { int v; int P { get { return v; } set { v = value; } } void M() { P = 1; } }",
        );
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        let LuaStmt::Expression(LuaExpr::Property(adapter)) = body[0] else {
            panic!("expected property adapter, got {:?}", body[0]);
        };
        assert!(!adapter.is_get);
        assert_eq!(adapter.name, "P");
        // Bare non-overridable use: this first, then the assigned value.
        assert_eq!(
            adapter.args,
            vec![LuaExpr::name("this"), LuaExpr::number("1")]
        );
    }

    #[test]
    fn element_access_write_flips_the_indexer_adapter() {
        let unit = translate("class C { void M(int[] a) { a[0] = 1; } }");
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        let LuaStmt::Expression(LuaExpr::Property(adapter)) = body[0] else {
            panic!("expected indexer adapter, got {:?}", body[0]);
        };
        assert!(!adapter.is_get);
        assert_eq!(adapter.name, "");
        assert_eq!(adapter.receiver, Some(Box::new(LuaExpr::name("a"))));
        assert_eq!(adapter.args, vec![LuaExpr::number("0"), LuaExpr::number("1")]);
    }

    #[test]
    fn extension_method_call_rewrites_to_free_function() {
        let unit = translate(
            "static class E { public static int Twice(this int x) { return x + x; } }\n\
             class C { int M(int v) { return v.Twice(); } }",
        );
        let class = first_class(&unit);
        let value = {
            let body = code_statements(&method(class, "M").function.body);
            let LuaStmt::Return(values) = body[0] else {
                panic!("expected return");
            };
            values[0].clone()
        };
        let LuaExpr::Invocation(inv) = value else {
            panic!("expected invocation");
        };
        assert_eq!(*inv.callee, LuaExpr::name("E.Twice"));
        assert_eq!(inv.args, vec![LuaExpr::name("v")]);
    }

    #[test]
    fn generic_call_pads_optionals_and_appends_type_arguments() {
        let unit = translate(
            "class C { static void F<T>(int a, int b = 0) { } void M() { F<int>(1); } }",
        );
        let class = first_class(&unit);
        let body = code_statements(&method(class, "M").function.body);

        let LuaStmt::Expression(LuaExpr::Invocation(inv)) = body[0] else {
            panic!("expected invocation, got {:?}", body[0]);
        };
        assert_eq!(*inv.callee, LuaExpr::name("C.F"));
        assert_eq!(
            inv.args,
            vec![
                LuaExpr::number("1"),
                LuaExpr::nil(),
                LuaExpr::name("System.Int32"),
            ]
        );
    }

    #[test]
    fn interpolated_string_folds_into_concat() {
        let value = return_value("class C { string M(int x) { return $\"v={x}!\"; } }");
        assert!(matches!(value, LuaExpr::Binary { ref op, .. } if op == ".."));
    }

    #[test]
    fn character_literal_is_preserved() {
        let value = return_value("class C { char M() { return 'a'; } }");
        assert_eq!(value, LuaExpr::Literal(LuaLiteral::Char('a')));
    }

    #[test]
    fn null_literal_is_nil() {
        let value = return_value("class C { object M() { return null; } }");
        assert_eq!(value, LuaExpr::nil());
    }

    #[test]
    fn temp_pool_exhaustion_is_reported() {
        // Each falsey ternary consumes one temporary; the 17th overflows
        // the 16-slot pool.
        let mut body = String::new();
        for i in 0..17 {
            body.push_str(&format!("string r{i} = c ? a : b;\n"));
        }
        let source = format!("class C {{ void M(bool c, string a, string b) {{ {body} }} }}");
        let err = translate_err(&source);
        assert_eq!(err.kind, TranslateErrorKind::PoolExhausted);
        assert!(err.message.contains("16"));
    }
}
