//! C# declaration lowering.
//!
//! Declarations are collectors rather than linear emitters: the type
//! visitors push a frame, member visits attach themselves to the current
//! frame (`CsContext::cur_type_mut`), and the frame pops into the finished
//! declaration. Method bodies route through the statement lowering; a body
//! that used `yield` is rewritten into the generator wrapper afterwards.

use cslua_repr::decl::{
    LuaAccessorMember, LuaClassDecl, LuaCompilationUnit, LuaEnumDecl, LuaNamespaceDecl,
    LuaTypeDecl, TypeKind,
};
use cslua_repr::expr::{LuaExpr, LuaFunction, LuaLiteral};
use cslua_repr::stmt::{LuaBlock, LuaStmt};
use tracing::trace;
use tree_sitter::Node;

use super::context::{CsContext, FunctionContext, TypeFrame};
use super::exprs::{find_child_by_kind, translate_expr};
use super::stmts::{translate_block, translate_stmt};
use crate::{invariant_breach, missing_node, unsupported, TranslateResult};

const ACCESSIBILITY_MODIFIERS: &[&str] = &["public", "internal", "protected", "private"];

/// Lower a whole compilation unit.
pub fn translate_compilation_unit(
    ctx: &mut CsContext<'_>,
    root: Node<'_>,
) -> TranslateResult<LuaCompilationUnit> {
    debug_assert_eq!(root.kind(), "compilation_unit");
    let mut unit = LuaCompilationUnit::new(ctx.file_path());

    // Loose top-level statements form an implicit function with its own
    // temporary pool.
    ctx.push_function(FunctionContext::new());
    ctx.push_block();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "using_directive" | "comment" => {}
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                unit.types
                    .push(LuaTypeDecl::Namespace(translate_namespace(ctx, child)?));
            }
            "class_declaration" | "struct_declaration" | "interface_declaration" => {
                unit.types
                    .push(LuaTypeDecl::Class(translate_type_decl(ctx, child)?));
            }
            "enum_declaration" => {
                unit.types.push(LuaTypeDecl::Enum(translate_enum(ctx, child)?));
            }
            "global_statement" => {
                let stmt = child
                    .named_child(0)
                    .ok_or_else(|| missing_node("global statement", child))?;
                let lowered = translate_stmt(ctx, stmt)?;
                ctx.emit(lowered);
            }
            other => return Err(unsupported(&format!("top-level member: {other}"), child)),
        }
    }

    unit.statements = ctx.pop_block().statements;
    ctx.pop_function();
    Ok(unit)
}

fn translate_namespace(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaNamespaceDecl> {
    let name = node
        .child_by_field_name("name")
        .map(|n| ctx.node_text(n).to_string())
        .ok_or_else(|| missing_node("namespace name", node))?;

    let mut types = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "class_declaration" | "struct_declaration" | "interface_declaration" => {
                types.push(LuaTypeDecl::Class(translate_type_decl(ctx, child)?));
            }
            "enum_declaration" => types.push(LuaTypeDecl::Enum(translate_enum(ctx, child)?)),
            "namespace_declaration" => {
                types.push(LuaTypeDecl::Namespace(translate_namespace(ctx, child)?));
            }
            "declaration_list" => {
                let mut body_cursor = child.walk();
                for member in child.named_children(&mut body_cursor) {
                    match member.kind() {
                        "class_declaration" | "struct_declaration" | "interface_declaration" => {
                            types.push(LuaTypeDecl::Class(translate_type_decl(ctx, member)?));
                        }
                        "enum_declaration" => {
                            types.push(LuaTypeDecl::Enum(translate_enum(ctx, member)?));
                        }
                        "namespace_declaration" => {
                            types.push(LuaTypeDecl::Namespace(translate_namespace(ctx, member)?));
                        }
                        "using_directive" | "comment" => {}
                        other => {
                            return Err(unsupported(
                                &format!("namespace member: {other}"),
                                member,
                            ))
                        }
                    }
                }
            }
            "using_directive" | "comment" | "identifier" | "qualified_name" => {}
            other => return Err(unsupported(&format!("namespace member: {other}"), child)),
        }
    }
    Ok(LuaNamespaceDecl { name, types })
}

// --- types ------------------------------------------------------------------

fn translate_type_decl(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaClassDecl> {
    let kind = match node.kind() {
        "struct_declaration" => TypeKind::Struct,
        "interface_declaration" => TypeKind::Interface,
        _ => TypeKind::Class,
    };
    let name = node
        .child_by_field_name("name")
        .map(|n| ctx.node_text(n).to_string())
        .ok_or_else(|| missing_node("type name", node))?;

    ctx.push_type(TypeFrame::Class(LuaClassDecl::new(kind, name)));

    if let Some(type_params) = find_child_by_kind(node, "type_parameter_list") {
        let mut cursor = type_params.walk();
        for parameter in type_params.named_children(&mut cursor) {
            if parameter.kind() == "type_parameter" {
                let text = ctx.node_text(parameter).to_string();
                ctx.cur_type_mut().type_params.push(text);
            }
        }
    }

    if let Some(base_list) = find_child_by_kind(node, "base_list") {
        let mut cursor = base_list.walk();
        for base in base_list.named_children(&mut cursor) {
            let name = match ctx.symbol_of(base) {
                Some(symbol) => symbol.qualified_name.clone(),
                None => ctx.node_text(base).to_string(),
            };
            ctx.cur_type_mut().base_names.push(name);
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                // Nested types attach as nested declarations; all other
                // members attach themselves to the current frame.
                "class_declaration" | "struct_declaration" | "interface_declaration" => {
                    let nested = translate_type_decl(ctx, member)?;
                    ctx.cur_type_mut().nested.push(LuaTypeDecl::Class(nested));
                }
                "enum_declaration" => {
                    let nested = translate_enum(ctx, member)?;
                    ctx.cur_type_mut().nested.push(LuaTypeDecl::Enum(nested));
                }
                "method_declaration" => translate_method(ctx, member)?,
                "constructor_declaration" => translate_constructor(ctx, member)?,
                "field_declaration" => translate_field(ctx, member)?,
                "property_declaration" => translate_property(ctx, member)?,
                "event_field_declaration" => translate_event_field(ctx, member)?,
                "event_declaration" => translate_event_declaration(ctx, member)?,
                "comment" => {}
                other => return Err(unsupported(&format!("type member: {other}"), member)),
            }
        }
    }

    match ctx.pop_type() {
        TypeFrame::Class(decl) => Ok(decl),
        TypeFrame::Enum(_) => unreachable!("class frame replaced by enum"),
    }
}

fn translate_enum(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<LuaEnumDecl> {
    let name = node
        .child_by_field_name("name")
        .map(|n| ctx.node_text(n).to_string())
        .ok_or_else(|| missing_node("enum name", node))?;

    ctx.push_type(TypeFrame::Enum(LuaEnumDecl::new(name)));

    let mut next_ordinal: i64 = 0;
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            if member.kind() != "enum_member_declaration" {
                continue;
            }
            let member_name = member
                .child_by_field_name("name")
                .or_else(|| find_child_by_kind(member, "identifier"))
                .map(|n| ctx.node_text(n).to_string())
                .ok_or_else(|| missing_node("enum member name", member))?;
            let value = match member
                .child_by_field_name("value")
                .or_else(|| find_child_by_kind(member, "equals_value_clause").and_then(|e| e.named_child(0)))
            {
                Some(value_node) => {
                    if let Ok(explicit) = ctx.node_text(value_node).parse::<i64>() {
                        next_ordinal = explicit + 1;
                    }
                    translate_expr(ctx, value_node)?
                }
                None => {
                    let ordinal = next_ordinal;
                    next_ordinal += 1;
                    LuaExpr::number(ordinal.to_string())
                }
            };
            ctx.cur_enum_mut().add_member(member_name, value);
        }
    }

    match ctx.pop_type() {
        TypeFrame::Enum(decl) => Ok(decl),
        TypeFrame::Class(_) => unreachable!("enum frame replaced by class"),
    }
}

// --- modifiers --------------------------------------------------------------

fn modifier_texts<'a>(ctx: &CsContext<'a>, node: Node<'_>) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "modifier" {
            out.push(ctx.node_text(child));
        }
    }
    out
}

fn is_private(modifiers: &[&str]) -> bool {
    modifiers.contains(&"private")
        || !modifiers.iter().any(|m| ACCESSIBILITY_MODIFIERS.contains(m))
}

fn is_overridable(modifiers: &[&str]) -> bool {
    (modifiers.contains(&"virtual")
        || modifiers.contains(&"abstract")
        || modifiers.contains(&"override"))
        && !modifiers.contains(&"sealed")
}

// --- methods ----------------------------------------------------------------

fn translate_method(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<()> {
    let modifiers = modifier_texts(ctx, node);
    let is_static = modifiers.contains(&"static");
    let name = node
        .child_by_field_name("name")
        .map(|n| ctx.node_text(n).to_string())
        .ok_or_else(|| missing_node("method name", node))?;

    let function = lower_function(ctx, node, is_static, FunctionContext::new())?;
    let Some(function) = function else {
        // Bodiless (interface or abstract) methods produce no output.
        return Ok(());
    };
    ctx.cur_type_mut().add_method(name, function, is_private(&modifiers));
    Ok(())
}

fn translate_constructor(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<()> {
    let modifiers = modifier_texts(ctx, node);
    let is_static = modifiers.contains(&"static");
    let (name, function_ctx) = if is_static {
        ("staticCtor", FunctionContext::static_ctor())
    } else {
        ("ctor", FunctionContext::new())
    };

    // Both kinds take `this`: the instance for ctor, the type table for
    // staticCtor.
    let function = lower_function(ctx, node, false, function_ctx)?;
    let Some(function) = function else {
        return Ok(());
    };
    ctx.cur_type_mut().add_method(name, function, is_private(&modifiers));
    Ok(())
}

/// Lower a function-shaped declaration: `this` first unless static, then
/// the declared parameters, then any generic type parameters as trailing
/// runtime arguments. Returns `None` for bodiless declarations.
fn lower_function(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
    is_static: bool,
    function_ctx: FunctionContext,
) -> TranslateResult<Option<LuaFunction>> {
    let mut params = Vec::new();
    if !is_static {
        params.push("this".to_string());
    }
    if let Some(parameter_list) = node.child_by_field_name("parameters") {
        let mut cursor = parameter_list.walk();
        for parameter in parameter_list.named_children(&mut cursor) {
            if parameter.kind() != "parameter" {
                continue;
            }
            let name = parameter
                .child_by_field_name("name")
                .map(|n| ctx.node_text(n).to_string())
                .ok_or_else(|| missing_node("parameter name", parameter))?;
            params.push(name);
        }
    }
    if let Some(type_params) = find_child_by_kind(node, "type_parameter_list") {
        let mut cursor = type_params.walk();
        for parameter in type_params.named_children(&mut cursor) {
            if parameter.kind() == "type_parameter" {
                params.push(ctx.node_text(parameter).to_string());
            }
        }
    }

    ctx.push_function(function_ctx);

    let body = node.child_by_field_name("body");
    let arrow = find_child_by_kind(node, "arrow_expression_clause");
    let block = match (body, arrow) {
        (Some(body), _) if body.kind() == "block" => translate_block(ctx, body)?,
        (_, Some(arrow)) => {
            let expr = arrow
                .named_child(0)
                .ok_or_else(|| missing_node("expression body", arrow))?;
            ctx.push_block();
            let value = translate_expr(ctx, expr)?;
            ctx.emit(LuaStmt::Return(vec![value]));
            ctx.pop_block()
        }
        _ => {
            ctx.pop_function();
            return Ok(None);
        }
    };

    let block = if ctx.cur_function().has_yield {
        wrap_yield(ctx, node, &params, block)?
    } else {
        block
    };
    ctx.pop_function();

    Ok(Some(LuaFunction::new(params, block)))
}

/// Rewrite a generator body: the original body becomes an inner function
/// handed to `System.Yield(inner, elementType, params...)`, and the outer
/// body reduces to returning that call.
fn wrap_yield(
    ctx: &mut CsContext<'_>,
    node: Node<'_>,
    params: &[String],
    body: LuaBlock,
) -> TranslateResult<LuaBlock> {
    debug_assert!(ctx.cur_function().has_yield, "yield wrap without yield");

    let element = yield_element_type(ctx, node);
    trace!(element = %element, "yield rewrite");

    let inner = LuaFunction::new(params.to_vec(), body);
    let mut args = vec![LuaExpr::Function(inner), LuaExpr::name(element)];
    for param in params.iter().filter(|p| p.as_str() != "this") {
        args.push(LuaExpr::name(param));
    }

    let mut wrapped = LuaBlock::new();
    wrapped.push(LuaStmt::Return(vec![LuaExpr::invocation(
        LuaExpr::name("System.Yield"),
        args,
    )]));
    Ok(wrapped)
}

/// Element type of a generator: the generic argument of the declared
/// return type when it is a generic name, otherwise the `Object` sentinel.
fn yield_element_type(ctx: &CsContext<'_>, node: Node<'_>) -> String {
    let return_type = node
        .child_by_field_name("returns")
        .or_else(|| node.child_by_field_name("type"));
    let Some(mut return_type) = return_type else {
        return "Object".to_string();
    };
    // Qualified generic returns (System...IEnumerable<T>) carry the
    // generic part in their name half.
    if return_type.kind() == "qualified_name" {
        if let Some(name) = return_type.child_by_field_name("name") {
            return_type = name;
        }
    }
    if return_type.kind() != "generic_name" {
        return "Object".to_string();
    }
    let argument = find_child_by_kind(return_type, "type_argument_list")
        .and_then(|list| list.named_child(0));
    let Some(argument) = argument else {
        return "Object".to_string();
    };
    let text = ctx.node_text(argument);
    let mapped = ctx.type_map_name(text).unwrap_or(text);
    mapped.rsplit('.').next().unwrap_or(mapped).to_string()
}

// --- fields -----------------------------------------------------------------

fn translate_field(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<()> {
    let modifiers = modifier_texts(ctx, node);
    let is_const = modifiers.contains(&"const");
    let is_static = modifiers.contains(&"static") || is_const;
    let is_readonly = modifiers.contains(&"readonly") || is_const;
    let private = is_private(&modifiers);

    let declaration = find_child_by_kind(node, "variable_declaration")
        .ok_or_else(|| missing_node("field declaration", node))?;
    let type_node = declaration
        .child_by_field_name("type")
        .ok_or_else(|| missing_node("field type", declaration))?;

    let mut cursor = declaration.walk();
    for declarator in declaration.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let name = declarator
            .child_by_field_name("name")
            .or_else(|| find_child_by_kind(declarator, "identifier"))
            .map(|n| ctx.node_text(n).to_string())
            .ok_or_else(|| missing_node("field name", declarator))?;
        let initializer =
            find_child_by_kind(declarator, "equals_value_clause").and_then(|eq| eq.named_child(0));
        let (value, is_literal) = field_value_expression(ctx, type_node, initializer)?;
        ctx.cur_type_mut().add_field(
            name,
            value,
            is_readonly && is_literal,
            is_static,
            private,
            is_readonly,
        );
    }
    Ok(())
}

/// Initializer expression for a field-like member.
///
/// An explicit initializer is lowered (noting whether it is syntactically a
/// literal); otherwise value types get their predefined default (`0`,
/// `0.0`, `false`) or a `<TypeName>.default()` call; reference types stay
/// nil.
fn field_value_expression(
    ctx: &mut CsContext<'_>,
    type_node: Node<'_>,
    initializer: Option<Node<'_>>,
) -> TranslateResult<(Option<LuaExpr>, bool)> {
    if let Some(init) = initializer {
        let is_literal = matches!(
            init.kind(),
            "integer_literal"
                | "real_literal"
                | "string_literal"
                | "verbatim_string_literal"
                | "character_literal"
                | "boolean_literal"
                | "null_literal"
        );
        let value = translate_expr(ctx, init)?;
        return Ok((Some(value), is_literal));
    }

    if type_node.kind() == "predefined_type" {
        let default = match ctx.node_text(type_node) {
            "int" | "uint" | "long" | "ulong" | "short" | "ushort" | "byte" | "sbyte" => {
                Some(LuaExpr::number("0"))
            }
            "float" | "double" | "decimal" => Some(LuaExpr::number("0.0")),
            "bool" => Some(LuaExpr::Literal(LuaLiteral::Bool(false))),
            "char" => Some(LuaExpr::Literal(LuaLiteral::Char('\0'))),
            _ => None,
        };
        return Ok((default, false));
    }

    if let Some(symbol) = ctx.symbol_of(type_node) {
        if symbol.is_value_type {
            let default = LuaExpr::invocation(
                LuaExpr::member(LuaExpr::name(&symbol.qualified_name), "default", false),
                Vec::new(),
            );
            return Ok((Some(default), false));
        }
    }
    Ok((None, false))
}

// --- properties -------------------------------------------------------------

fn accessor_keyword<'t>(ctx: &CsContext<'_>, accessor: Node<'t>) -> Option<String> {
    let mut cursor = accessor.walk();
    let keyword = accessor
        .children(&mut cursor)
        .map(|c| ctx.node_text(c).to_string())
        .find(|t| matches!(t.as_str(), "get" | "set" | "init" | "add" | "remove"));
    keyword
}

fn accessor_body<'t>(accessor: Node<'t>) -> Option<Node<'t>> {
    find_child_by_kind(accessor, "block")
        .or_else(|| find_child_by_kind(accessor, "arrow_expression_clause"))
}

fn lower_accessor_function(
    ctx: &mut CsContext<'_>,
    body: Node<'_>,
    is_static: bool,
    takes_value: bool,
) -> TranslateResult<LuaFunction> {
    let mut params = Vec::new();
    if !is_static {
        params.push("this".to_string());
    }
    if takes_value {
        params.push("value".to_string());
    }

    ctx.push_function(FunctionContext::new());
    let block = if body.kind() == "block" {
        translate_block(ctx, body)?
    } else {
        let expr = body
            .named_child(0)
            .ok_or_else(|| missing_node("accessor expression", body))?;
        ctx.push_block();
        let value = translate_expr(ctx, expr)?;
        ctx.emit(LuaStmt::Return(vec![value]));
        ctx.pop_block()
    };
    ctx.pop_function();

    Ok(LuaFunction::new(params, block))
}

fn translate_property(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<()> {
    let modifiers = modifier_texts(ctx, node);
    let is_static = modifiers.contains(&"static");
    let private = is_private(&modifiers);
    let name = node
        .child_by_field_name("name")
        .map(|n| ctx.node_text(n).to_string())
        .ok_or_else(|| missing_node("property name", node))?;
    let type_node = node
        .child_by_field_name("type")
        .ok_or_else(|| missing_node("property type", node))?;

    let overridable = match ctx.declared_symbol(node) {
        Some(symbol) => symbol.is_overridable || symbol.implements_interface,
        None => is_overridable(&modifiers),
    };

    let accessor_list = node
        .child_by_field_name("accessors")
        .or_else(|| find_child_by_kind(node, "accessor_list"));

    // Expression-bodied: a synthesized getter.
    let Some(accessor_list) = accessor_list else {
        if let Some(arrow) = find_child_by_kind(node, "arrow_expression_clause") {
            let function = lower_accessor_function(ctx, arrow, is_static, false)?;
            ctx.cur_type_mut().add_property(LuaAccessorMember::accessor(
                name, function, true, is_static, private,
            ));
            return Ok(());
        }
        return Err(missing_node("property accessors", node));
    };
    let mut accessors = Vec::new();
    let mut cursor = accessor_list.walk();
    for accessor in accessor_list.named_children(&mut cursor) {
        if accessor.kind() == "accessor_declaration" {
            accessors.push(accessor);
        }
    }

    let has_bodies = accessors.iter().any(|a| accessor_body(*a).is_some());
    if has_bodies {
        let mut getters = 0usize;
        let mut setters = 0usize;
        for accessor in accessors {
            let Some(body) = accessor_body(accessor) else {
                continue;
            };
            let keyword = accessor_keyword(ctx, accessor)
                .ok_or_else(|| missing_node("accessor keyword", accessor))?;
            let is_get = keyword == "get";
            if is_get {
                getters += 1;
                if getters > 1 {
                    return Err(invariant_breach("property declares a second getter", accessor));
                }
            } else {
                setters += 1;
                if setters > 1 {
                    return Err(invariant_breach("property declares a second setter", accessor));
                }
            }
            let function = lower_accessor_function(ctx, body, is_static, !is_get)?;
            ctx.cur_type_mut().add_property(LuaAccessorMember::accessor(
                name.clone(),
                function,
                is_get,
                is_static,
                private,
            ));
        }
        if getters != 1 {
            return Err(invariant_breach("property declares no getter", node));
        }
        return Ok(());
    }

    // Auto property: nothing on interfaces; a plain field unless the
    // member must stay dispatchable (overridable / interface
    // implementation).
    if ctx.in_interface() {
        return Ok(());
    }

    let initializer = find_child_by_kind(node, "equals_value_clause").and_then(|eq| eq.named_child(0));
    let get_only = accessors.len() == 1;

    if is_static || !overridable {
        let (value, is_literal) = field_value_expression(ctx, type_node, initializer)?;
        ctx.cur_type_mut().add_field(
            name,
            value,
            get_only && is_literal,
            is_static,
            private,
            get_only,
        );
        return Ok(());
    }

    let value = match initializer {
        Some(init) => Some(translate_expr(ctx, init)?),
        None => None,
    };
    ctx.cur_type_mut()
        .add_property(LuaAccessorMember::auto(name, value, is_static, private));
    Ok(())
}

// --- events -----------------------------------------------------------------

fn translate_event_field(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<()> {
    let modifiers = modifier_texts(ctx, node);
    let is_static = modifiers.contains(&"static");
    let private = is_private(&modifiers);

    let declaration = find_child_by_kind(node, "variable_declaration")
        .ok_or_else(|| missing_node("event declaration", node))?;

    let mut cursor = declaration.walk();
    for declarator in declaration.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let name = declarator
            .child_by_field_name("name")
            .or_else(|| find_child_by_kind(declarator, "identifier"))
            .map(|n| ctx.node_text(n).to_string())
            .ok_or_else(|| missing_node("event name", declarator))?;
        let initializer =
            find_child_by_kind(declarator, "equals_value_clause").and_then(|eq| eq.named_child(0));
        let value = match initializer {
            Some(init) => Some(translate_expr(ctx, init)?),
            None => None,
        };

        let overridable = match ctx.declared_symbol(declarator) {
            Some(symbol) => symbol.is_overridable || symbol.implements_interface,
            None => is_overridable(&modifiers),
        };
        if overridable {
            ctx.cur_type_mut()
                .add_event(LuaAccessorMember::auto(name, value, is_static, private));
        } else {
            ctx.cur_type_mut()
                .add_field(name, value, false, is_static, private, false);
        }
    }
    Ok(())
}

fn translate_event_declaration(ctx: &mut CsContext<'_>, node: Node<'_>) -> TranslateResult<()> {
    let modifiers = modifier_texts(ctx, node);
    let is_static = modifiers.contains(&"static");
    let private = is_private(&modifiers);
    let name = node
        .child_by_field_name("name")
        .map(|n| ctx.node_text(n).to_string())
        .ok_or_else(|| missing_node("event name", node))?;

    let accessor_list = node
        .child_by_field_name("accessors")
        .or_else(|| find_child_by_kind(node, "accessor_list"))
        .ok_or_else(|| missing_node("event accessors", node))?;

    let mut cursor = accessor_list.walk();
    for accessor in accessor_list.named_children(&mut cursor) {
        if accessor.kind() != "accessor_declaration" {
            continue;
        }
        let Some(body) = accessor_body(accessor) else {
            continue;
        };
        let keyword = accessor_keyword(ctx, accessor)
            .ok_or_else(|| missing_node("accessor keyword", accessor))?;
        let is_add = keyword == "add";
        // add and remove both take the handler as `value`.
        let function = lower_accessor_function(ctx, body, is_static, true)?;
        ctx.cur_type_mut().add_event(LuaAccessorMember::accessor(
            name.clone(),
            function,
            is_add,
            is_static,
            private,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::TranslateErrorKind;
    use cslua_repr::decl::LuaTypeDecl;
    use cslua_repr::expr::{LuaExpr, LuaLiteral};
    use cslua_repr::stmt::LuaStmt;

    #[test]
    fn auto_property_backs_as_field_with_default() {
        let unit = translate("class C { public int X { get; set; } }");
        let class = first_class(&unit);
        assert!(class.properties.is_empty());
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].name, "X");
        assert_eq!(class.fields[0].value, Some(LuaExpr::number("0")));
        assert!(!class.fields[0].is_private);
    }

    #[test]
    fn virtual_auto_property_registers_as_property() {
        let unit = translate("class C { public virtual int X { get; set; } }");
        let class = first_class(&unit);
        assert!(class.fields.is_empty());
        assert_eq!(class.properties.len(), 1);
        assert!(class.properties[0].is_auto);
    }

    #[test]
    fn accessor_property_takes_this_and_value() {
        let unit = translate(
            "class C { int v; public int P { get { return v; } set { v = value; } } }",
        );
        let class = first_class(&unit);
        assert_eq!(class.properties.len(), 2);

        let getter = class.properties.iter().find(|p| p.is_get_or_add).unwrap();
        let setter = class.properties.iter().find(|p| !p.is_get_or_add).unwrap();
        assert_eq!(getter.function.as_ref().unwrap().params, vec!["this"]);
        assert_eq!(
            setter.function.as_ref().unwrap().params,
            vec!["this", "value"]
        );
    }

    #[test]
    fn expression_bodied_property_synthesizes_a_getter() {
        let unit = translate("class C { int v; public int P => v; }");
        let class = first_class(&unit);
        assert_eq!(class.properties.len(), 1);
        let getter = &class.properties[0];
        assert!(getter.is_get_or_add);
        let function = getter.function.as_ref().unwrap();
        assert_eq!(function.params, vec!["this"]);
        assert!(matches!(function.body.statements[0], LuaStmt::Return(_)));
    }

    #[test]
    fn duplicate_getter_is_an_invariant_breach() {
        let err = translate_err("class C { int P { get { return 1; } get { return 2; } } }");
        assert_eq!(err.kind, TranslateErrorKind::InvariantBreach);
    }

    #[test]
    fn interface_auto_property_emits_nothing() {
        let unit = translate("interface I { int X { get; set; } }");
        let class = first_class(&unit);
        assert!(class.fields.is_empty());
        assert!(class.properties.is_empty());
    }

    #[test]
    fn field_defaults_follow_the_declared_type() {
        let unit = translate(
            "class C { int i; double d; bool b; string s; }",
        );
        let class = first_class(&unit);
        assert_eq!(class.fields[0].value, Some(LuaExpr::number("0")));
        assert_eq!(class.fields[1].value, Some(LuaExpr::number("0.0")));
        assert_eq!(
            class.fields[2].value,
            Some(LuaExpr::Literal(LuaLiteral::Bool(false)))
        );
        assert_eq!(class.fields[3].value, None);
    }

    #[test]
    fn struct_typed_field_defaults_to_default_call() {
        let unit = translate("struct S { } class C { S s; }");
        let class = unit
            .types
            .iter()
            .find_map(|t| match t {
                LuaTypeDecl::Class(c) if c.name == "C" => Some(c),
                _ => None,
            })
            .unwrap();
        let Some(LuaExpr::Invocation(inv)) = &class.fields[0].value else {
            panic!("expected default() call, got {:?}", class.fields[0].value);
        };
        let LuaExpr::Member(member) = &*inv.callee else {
            panic!("expected member callee");
        };
        assert_eq!(member.name, "default");
    }

    #[test]
    fn readonly_literal_field_is_immutable() {
        let unit = translate("class C { readonly int a = 1; readonly int b = Compute(); static int Compute() { return 2; } }");
        let class = first_class(&unit);
        assert!(class.fields[0].is_immutable);
        assert!(!class.fields[1].is_immutable);
    }

    #[test]
    fn static_ctor_records_readonly_static_assignments() {
        let unit = translate(
            "class C { public static readonly C Instance; static C() { Instance = new C(); } }",
        );
        let class = first_class(&unit);
        assert_eq!(class.static_readonly_assignments, vec!["Instance"]);
        let ctor = method(class, "staticCtor");
        assert_eq!(ctor.function.params, vec!["this"]);
    }

    #[test]
    fn instance_ctor_registers_as_ctor() {
        let unit = translate("class C { public C(int x) { } }");
        let class = first_class(&unit);
        let ctor = method(class, "ctor");
        assert_eq!(ctor.function.params, vec!["this", "x"]);
        assert!(!ctor.is_private);
    }

    #[test]
    fn generic_method_appends_type_parameters() {
        let unit = translate("class C { T Id<T>(T v) { return v; } }");
        let class = first_class(&unit);
        assert_eq!(method(class, "Id").function.params, vec!["this", "v", "T"]);
    }

    #[test]
    fn enum_members_take_ordinals_between_explicit_values() {
        let unit = translate("enum E { A, B = 5, C }");
        let LuaTypeDecl::Enum(decl) = &unit.types[0] else {
            panic!("expected enum");
        };
        assert_eq!(decl.members[0].value, LuaExpr::number("0"));
        assert_eq!(decl.members[1].value, LuaExpr::number("5"));
        assert_eq!(decl.members[2].value, LuaExpr::number("6"));
    }

    #[test]
    fn plain_event_field_routes_through_fields() {
        let unit = translate("class C { public event System.Action E; }");
        let class = first_class(&unit);
        assert!(class.events.is_empty());
        assert_eq!(class.fields.len(), 1);
        assert_eq!(class.fields[0].name, "E");
    }

    #[test]
    fn virtual_event_field_registers_as_event() {
        let unit = translate("class C { public virtual event System.Action E; }");
        let class = first_class(&unit);
        assert!(class.fields.is_empty());
        assert_eq!(class.events.len(), 1);
        assert!(class.events[0].is_auto);
    }

    #[test]
    fn event_accessors_take_this_and_value() {
        let unit = translate(
            "class C { System.Action h; public event System.Action E { add { h = value; } remove { h = null; } } }",
        );
        let class = first_class(&unit);
        assert_eq!(class.events.len(), 2);
        let adder = class.events.iter().find(|e| e.is_get_or_add).unwrap();
        let remover = class.events.iter().find(|e| !e.is_get_or_add).unwrap();
        assert_eq!(adder.function.as_ref().unwrap().params, vec!["this", "value"]);
        assert_eq!(
            remover.function.as_ref().unwrap().params,
            vec!["this", "value"]
        );
    }

    #[test]
    fn nested_types_attach_to_their_container() {
        let unit = translate("class A { class B { } enum E { X } }");
        let class = first_class(&unit);
        assert_eq!(class.nested.len(), 2);
    }

    #[test]
    fn type_parameters_and_bases_are_recorded() {
        let unit = translate("interface I { } class C<T> : I { }");
        let class = unit
            .types
            .iter()
            .find_map(|t| match t {
                LuaTypeDecl::Class(c) if c.name == "C" => Some(c),
                _ => None,
            })
            .unwrap();
        assert_eq!(class.type_params, vec!["T"]);
        assert_eq!(class.base_names, vec!["I"]);
    }

    #[test]
    fn private_methods_are_flagged() {
        let unit = translate("class C { void A() { } public void B() { } }");
        let class = first_class(&unit);
        assert!(method(class, "A").is_private);
        assert!(!method(class, "B").is_private);
    }
}
