//! Single-file reference binder.
//!
//! [`SourceModel`] is a deliberately syntax-driven [`SemanticModel`]: good
//! enough for self-contained compilation units and the test suite, and a
//! working example of the collaborator contract. It runs two passes over
//! the tree:
//!
//! 1. a declaration pass collecting type and member symbols (plus the
//!    predefined `System.*` value and reference types), then
//! 2. a binding pass resolving identifier use-sites against a lexical
//!    scope stack, falling back to members of the enclosing type chain and
//!    then to type names.
//!
//! Member accesses through receivers the model cannot type bind no symbol;
//! the engine spells those names through unchanged.

use cslua_repr::expr::LuaLiteral;
use rustc_hash::FxHashMap;
use tree_sitter::{Node, Tree};

use crate::{Accessibility, ParameterInfo, SemanticModel, Symbol, SymbolKind, TypeRef};

const PREDEFINED: &[(&str, &str, bool)] = &[
    // keyword, qualified name, is_value_type
    ("bool", "System.Boolean", true),
    ("byte", "System.Byte", true),
    ("sbyte", "System.SByte", true),
    ("short", "System.Int16", true),
    ("ushort", "System.UInt16", true),
    ("int", "System.Int32", true),
    ("uint", "System.UInt32", true),
    ("long", "System.Int64", true),
    ("ulong", "System.UInt64", true),
    ("float", "System.Single", true),
    ("double", "System.Double", true),
    ("decimal", "System.Decimal", true),
    ("char", "System.Char", true),
    ("string", "System.String", false),
    ("object", "System.Object", false),
];

/// Syntax-driven semantic model over one parsed compilation unit.
pub struct SourceModel {
    symbols: Vec<Symbol>,
    use_sites: FxHashMap<usize, usize>,
    declarations: FxHashMap<usize, usize>,
    expr_types: FxHashMap<usize, TypeRef>,
}

impl SourceModel {
    /// Bind a parsed tree.
    pub fn bind(tree: &Tree, source: &[u8]) -> Self {
        let mut binder = Binder::new(source);
        binder.seed_predefined();
        let mut path = Vec::new();
        binder.collect(tree.root_node(), &mut path);
        binder.mark_interface_implementations();
        binder.resolve(tree.root_node());
        SourceModel {
            symbols: binder.symbols,
            use_sites: binder.use_sites,
            declarations: binder.declarations,
            expr_types: binder.expr_types,
        }
    }
}

impl SemanticModel for SourceModel {
    fn symbol_of(&self, node: Node<'_>) -> Option<&Symbol> {
        self.use_sites
            .get(&node.id())
            .or_else(|| self.declarations.get(&node.id()))
            .map(|&idx| &self.symbols[idx])
    }

    fn declared_symbol(&self, node: Node<'_>) -> Option<&Symbol> {
        self.declarations.get(&node.id()).map(|&idx| &self.symbols[idx])
    }

    fn type_of(&self, node: Node<'_>) -> Option<&TypeRef> {
        self.expr_types.get(&node.id())
    }
}

struct Binder<'s> {
    source: &'s [u8],
    symbols: Vec<Symbol>,
    use_sites: FxHashMap<usize, usize>,
    declarations: FxHashMap<usize, usize>,
    /// Simple and qualified type names to their NamedType symbol.
    types: FxHashMap<String, usize>,
    /// Type qualified name to its member symbols, in declaration order.
    members: FxHashMap<String, Vec<usize>>,
    /// Type qualified name to its base-list qualified names.
    base_names: FxHashMap<String, Vec<String>>,
    /// Extension method name to symbol (first declaration wins).
    extension_methods: FxHashMap<String, usize>,
    expr_types: FxHashMap<usize, TypeRef>,
    scopes: Vec<FxHashMap<String, usize>>,
    type_stack: Vec<usize>,
}

impl<'s> Binder<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            symbols: Vec::new(),
            use_sites: FxHashMap::default(),
            declarations: FxHashMap::default(),
            types: FxHashMap::default(),
            members: FxHashMap::default(),
            base_names: FxHashMap::default(),
            extension_methods: FxHashMap::default(),
            expr_types: FxHashMap::default(),
            scopes: Vec::new(),
            type_stack: Vec::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        std::str::from_utf8(&self.source[node.byte_range()]).unwrap_or("")
    }

    fn add_symbol(&mut self, symbol: Symbol) -> usize {
        self.symbols.push(symbol);
        self.symbols.len() - 1
    }

    fn seed_predefined(&mut self) {
        for (keyword, qualified, is_value) in PREDEFINED {
            let mut symbol = Symbol::new(SymbolKind::NamedType, *keyword);
            symbol.qualified_name = (*qualified).to_string();
            symbol.is_value_type = *is_value;
            symbol.is_sealed = true;
            symbol.accessibility = Accessibility::Public;
            let idx = self.add_symbol(symbol);
            self.types.insert((*keyword).to_string(), idx);
            self.types.insert((*qualified).to_string(), idx);
            let simple = qualified.rsplit('.').next().unwrap_or(qualified);
            self.types.insert(simple.to_string(), idx);
        }
    }

    // --- pass 1: declarations -------------------------------------------

    fn collect(&mut self, node: Node<'_>, path: &mut Vec<String>) {
        match node.kind() {
            "compilation_unit" | "declaration_list" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect(child, path);
                }
            }
            "namespace_declaration" | "file_scoped_namespace_declaration" => {
                let depth = match node.child_by_field_name("name") {
                    Some(name) => {
                        let segments: Vec<String> =
                            self.text(name).split('.').map(str::to_string).collect();
                        let depth = segments.len();
                        path.extend(segments);
                        depth
                    }
                    None => 0,
                };
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect(child, path);
                }
                path.truncate(path.len() - depth);
            }
            "class_declaration" | "struct_declaration" | "interface_declaration" => {
                self.collect_type(node, path);
            }
            "enum_declaration" => {
                self.collect_enum(node, path);
            }
            _ => {}
        }
    }

    fn qualify(path: &[String], name: &str) -> String {
        if path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", path.join("."), name)
        }
    }

    fn collect_type(&mut self, node: Node<'_>, path: &mut Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let qualified = Self::qualify(path, &name);

        let modifiers = self.modifier_texts(node);
        let is_struct = node.kind() == "struct_declaration";
        let mut symbol = Symbol::new(SymbolKind::NamedType, &name);
        symbol.qualified_name = qualified.clone();
        symbol.is_value_type = is_struct;
        symbol.is_sealed = is_struct || modifiers.contains(&"sealed");
        symbol.accessibility = accessibility_of(&modifiers);
        symbol.is_static = modifiers.contains(&"static");
        if let Some(list) = find_kind(node, "type_parameter_list") {
            let mut cursor = list.walk();
            for parameter in list.named_children(&mut cursor) {
                if parameter.kind() == "type_parameter" {
                    symbol.type_parameters.push(self.text(parameter).to_string());
                }
            }
        }
        let type_idx = self.add_symbol(symbol);
        self.types.insert(name.clone(), type_idx);
        self.types.insert(qualified.clone(), type_idx);
        self.declarations.insert(node.id(), type_idx);
        self.declarations.insert(name_node.id(), type_idx);
        self.members.entry(qualified.clone()).or_default();

        if let Some(base_list) = find_kind(node, "base_list") {
            let mut bases = Vec::new();
            let mut cursor = base_list.walk();
            for base in base_list.named_children(&mut cursor) {
                bases.push(self.text(base).to_string());
            }
            self.base_names.insert(qualified.clone(), bases);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let is_interface = node.kind() == "interface_declaration";
            let type_sealed = is_struct || modifiers.contains(&"sealed");
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                match member.kind() {
                    "class_declaration" | "struct_declaration" | "interface_declaration"
                    | "enum_declaration" => {
                        path.push(name.clone());
                        self.collect(member, path);
                        path.pop();
                    }
                    "method_declaration" => {
                        self.collect_method(member, &qualified, type_sealed, is_interface);
                    }
                    "field_declaration" => self.collect_field(member, &qualified, type_sealed),
                    "property_declaration" => {
                        self.collect_property(member, &qualified, type_sealed, is_interface);
                    }
                    "event_field_declaration" => {
                        self.collect_event_field(member, &qualified, type_sealed);
                    }
                    "event_declaration" => {
                        self.collect_event_declaration(member, &qualified, type_sealed);
                    }
                    _ => {}
                }
            }
        }
    }

    fn collect_enum(&mut self, node: Node<'_>, path: &mut Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let qualified = Self::qualify(path, &name);

        let mut symbol = Symbol::new(SymbolKind::NamedType, &name);
        symbol.qualified_name = qualified.clone();
        symbol.is_value_type = true;
        symbol.is_sealed = true;
        let type_idx = self.add_symbol(symbol);
        self.types.insert(name.clone(), type_idx);
        self.types.insert(qualified.clone(), type_idx);
        self.declarations.insert(node.id(), type_idx);
        self.members.entry(qualified.clone()).or_default();

        let enum_ref = TypeRef {
            name: qualified.clone(),
            is_value_type: true,
            is_bool: false,
            is_string: false,
            has_definition: true,
        };
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.named_children(&mut cursor) {
                if member.kind() != "enum_member_declaration" {
                    continue;
                }
                let Some(member_name) = member
                    .child_by_field_name("name")
                    .or_else(|| find_kind(member, "identifier"))
                else {
                    continue;
                };
                let mut field = Symbol::new(SymbolKind::Field, self.text(member_name));
                field.qualified_name = format!("{}.{}", qualified, self.text(member_name));
                field.containing_type = Some(qualified.clone());
                field.containing_type_sealed = true;
                field.is_static = true;
                field.is_readonly = true;
                field.accessibility = Accessibility::Public;
                field.member_type = Some(enum_ref.clone());
                let idx = self.add_symbol(field);
                self.members.entry(qualified.clone()).or_default().push(idx);
                self.declarations.insert(member.id(), idx);
                self.declarations.insert(member_name.id(), idx);
            }
        }
    }

    fn collect_method(
        &mut self,
        node: Node<'_>,
        type_qualified: &str,
        type_sealed: bool,
        is_interface: bool,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let modifiers = self.modifier_texts(node);

        let mut symbol = Symbol::new(SymbolKind::Method, &name);
        symbol.qualified_name = format!("{type_qualified}.{name}");
        symbol.containing_type = Some(type_qualified.to_string());
        symbol.containing_type_sealed = type_sealed;
        symbol.accessibility = accessibility_of(&modifiers);
        symbol.is_static = modifiers.contains(&"static");
        symbol.is_overridable = is_interface
            || ((modifiers.contains(&"virtual")
                || modifiers.contains(&"abstract")
                || modifiers.contains(&"override"))
                && !modifiers.contains(&"sealed"));

        let return_type = node
            .child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"));
        if let Some(return_type) = return_type {
            symbol.returns_void = self.text(return_type) == "void";
            symbol.member_type = self.type_ref_of(return_type);
        }

        if let Some(parameter_list) = node.child_by_field_name("parameters") {
            let mut first = true;
            let mut cursor = parameter_list.walk();
            for parameter in parameter_list.named_children(&mut cursor) {
                if parameter.kind() != "parameter" {
                    continue;
                }
                let param_name = parameter
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                let mods = self.parameter_modifiers(parameter);
                if first && mods.contains(&"this") && symbol.is_static {
                    symbol.is_extension_method = true;
                    symbol.reduced_container = Some(type_qualified.to_string());
                }
                symbol.parameters.push(ParameterInfo {
                    name: param_name,
                    is_optional: find_kind(parameter, "equals_value_clause").is_some(),
                    is_ref_or_out: mods.contains(&"ref") || mods.contains(&"out"),
                });
                first = false;
            }
        }
        if let Some(list) = find_kind(node, "type_parameter_list") {
            let mut cursor = list.walk();
            for parameter in list.named_children(&mut cursor) {
                if parameter.kind() == "type_parameter" {
                    symbol.type_parameters.push(self.text(parameter).to_string());
                }
            }
        }

        let idx = self.add_symbol(symbol);
        self.members
            .entry(type_qualified.to_string())
            .or_default()
            .push(idx);
        self.declarations.insert(node.id(), idx);
        self.declarations.insert(name_node.id(), idx);
        if self.symbols[idx].is_extension_method {
            self.extension_methods.entry(name).or_insert(idx);
        }
    }

    fn collect_field(&mut self, node: Node<'_>, type_qualified: &str, type_sealed: bool) {
        let modifiers = self.modifier_texts(node);
        let Some(declaration) = find_kind(node, "variable_declaration") else {
            return;
        };
        let member_type = declaration
            .child_by_field_name("type")
            .and_then(|t| self.type_ref_of(t));
        let is_const = modifiers.contains(&"const");

        let mut cursor = declaration.walk();
        for declarator in declaration.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator
                .child_by_field_name("name")
                .or_else(|| find_kind(declarator, "identifier"))
            else {
                continue;
            };
            let name = self.text(name_node).to_string();
            let mut symbol = Symbol::new(SymbolKind::Field, &name);
            symbol.qualified_name = format!("{type_qualified}.{name}");
            symbol.containing_type = Some(type_qualified.to_string());
            symbol.containing_type_sealed = type_sealed;
            symbol.accessibility = accessibility_of(&modifiers);
            symbol.is_static = modifiers.contains(&"static") || is_const;
            symbol.is_readonly = modifiers.contains(&"readonly") || is_const;
            symbol.member_type = member_type.clone();
            if is_const {
                symbol.constant_value = find_kind(declarator, "equals_value_clause")
                    .and_then(|eq| eq.named_child(0))
                    .and_then(|init| self.literal_of(init));
            }
            let idx = self.add_symbol(symbol);
            self.members
                .entry(type_qualified.to_string())
                .or_default()
                .push(idx);
            self.declarations.insert(declarator.id(), idx);
            self.declarations.insert(name_node.id(), idx);
        }
    }

    fn collect_property(
        &mut self,
        node: Node<'_>,
        type_qualified: &str,
        type_sealed: bool,
        is_interface: bool,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let modifiers = self.modifier_texts(node);

        let mut symbol = Symbol::new(SymbolKind::Property, &name);
        symbol.qualified_name = format!("{type_qualified}.{name}");
        symbol.containing_type = Some(type_qualified.to_string());
        symbol.containing_type_sealed = type_sealed;
        symbol.accessibility = accessibility_of(&modifiers);
        symbol.is_static = modifiers.contains(&"static");
        symbol.is_overridable = is_interface
            || ((modifiers.contains(&"virtual")
                || modifiers.contains(&"abstract")
                || modifiers.contains(&"override"))
                && !modifiers.contains(&"sealed"));
        symbol.member_type = node.child_by_field_name("type").and_then(|t| self.type_ref_of(t));

        let accessors = node
            .child_by_field_name("accessors")
            .or_else(|| find_kind(node, "accessor_list"));
        symbol.is_auto_property = match accessors {
            Some(list) => {
                let mut cursor = list.walk();
                let result = list
                    .named_children(&mut cursor)
                    .filter(|a| a.kind() == "accessor_declaration")
                    .all(|a| {
                        find_kind(a, "block").is_none()
                            && find_kind(a, "arrow_expression_clause").is_none()
                    });
                result
            }
            None => false,
        };

        let idx = self.add_symbol(symbol);
        self.members
            .entry(type_qualified.to_string())
            .or_default()
            .push(idx);
        self.declarations.insert(node.id(), idx);
        self.declarations.insert(name_node.id(), idx);
    }

    fn collect_event_field(&mut self, node: Node<'_>, type_qualified: &str, type_sealed: bool) {
        let modifiers = self.modifier_texts(node);
        let Some(declaration) = find_kind(node, "variable_declaration") else {
            return;
        };
        let member_type = declaration
            .child_by_field_name("type")
            .and_then(|t| self.type_ref_of(t));

        let mut cursor = declaration.walk();
        for declarator in declaration.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator
                .child_by_field_name("name")
                .or_else(|| find_kind(declarator, "identifier"))
            else {
                continue;
            };
            let name = self.text(name_node).to_string();
            let mut symbol = Symbol::new(SymbolKind::Event, &name);
            symbol.qualified_name = format!("{type_qualified}.{name}");
            symbol.containing_type = Some(type_qualified.to_string());
            symbol.containing_type_sealed = type_sealed;
            symbol.accessibility = accessibility_of(&modifiers);
            symbol.is_static = modifiers.contains(&"static");
            symbol.is_event_field = true;
            symbol.is_overridable = (modifiers.contains(&"virtual")
                || modifiers.contains(&"abstract")
                || modifiers.contains(&"override"))
                && !modifiers.contains(&"sealed");
            symbol.member_type = member_type.clone();
            let idx = self.add_symbol(symbol);
            self.members
                .entry(type_qualified.to_string())
                .or_default()
                .push(idx);
            self.declarations.insert(declarator.id(), idx);
            self.declarations.insert(name_node.id(), idx);
        }
    }

    fn collect_event_declaration(&mut self, node: Node<'_>, type_qualified: &str, type_sealed: bool) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let modifiers = self.modifier_texts(node);
        let mut symbol = Symbol::new(SymbolKind::Event, &name);
        symbol.qualified_name = format!("{type_qualified}.{name}");
        symbol.containing_type = Some(type_qualified.to_string());
        symbol.containing_type_sealed = type_sealed;
        symbol.accessibility = accessibility_of(&modifiers);
        symbol.is_static = modifiers.contains(&"static");
        symbol.is_event_field = false;
        let idx = self.add_symbol(symbol);
        self.members
            .entry(type_qualified.to_string())
            .or_default()
            .push(idx);
        self.declarations.insert(node.id(), idx);
        self.declarations.insert(name_node.id(), idx);
    }

    /// Mark members that implement a member of an interface their type
    /// lists.
    fn mark_interface_implementations(&mut self) {
        let mut updates = Vec::new();
        for (type_name, bases) in &self.base_names {
            for base in bases {
                let Some(&base_idx) = self.types.get(base.as_str()) else {
                    continue;
                };
                let base_qualified = self.symbols[base_idx].qualified_name.clone();
                let Some(base_members) = self.members.get(&base_qualified) else {
                    continue;
                };
                let interface_member_names: Vec<String> = base_members
                    .iter()
                    .map(|&idx| self.symbols[idx].name.clone())
                    .collect();
                if let Some(own) = self.members.get(type_name) {
                    for &member_idx in own {
                        if interface_member_names.contains(&self.symbols[member_idx].name) {
                            updates.push(member_idx);
                        }
                    }
                }
            }
        }
        for idx in updates {
            self.symbols[idx].implements_interface = true;
        }
    }

    // --- pass 2: use sites ----------------------------------------------

    fn resolve(&mut self, node: Node<'_>) {
        match node.kind() {
            "class_declaration" | "struct_declaration" | "interface_declaration" => {
                let idx = self.declarations.get(&node.id()).copied();
                if let Some(idx) = idx {
                    self.type_stack.push(idx);
                }
                self.scopes.push(FxHashMap::default());
                self.bind_type_parameters(node);
                if let Some(body) = node.child_by_field_name("body") {
                    self.resolve_children(body);
                }
                self.scopes.pop();
                if idx.is_some() {
                    self.type_stack.pop();
                }
            }
            "method_declaration" | "constructor_declaration" | "local_function_statement" => {
                self.scopes.push(FxHashMap::default());
                self.bind_type_parameters(node);
                self.bind_parameters(node);
                if let Some(body) = node
                    .child_by_field_name("body")
                    .or_else(|| find_kind(node, "arrow_expression_clause"))
                {
                    self.bind_labels(body);
                    self.resolve(body);
                }
                self.scopes.pop();
            }
            "accessor_declaration" => {
                self.scopes.push(FxHashMap::default());
                let keyword = {
                    let mut cursor = node.walk();
                    let result = node
                        .children(&mut cursor)
                        .map(|c| self.text(c).to_string())
                        .find(|t| matches!(t.as_str(), "get" | "set" | "init" | "add" | "remove"));
                    result
                };
                if matches!(keyword.as_deref(), Some("set" | "init" | "add" | "remove")) {
                    let member_type = node
                        .parent() // accessor_list
                        .and_then(|l| l.parent())
                        .and_then(|p| p.child_by_field_name("type"))
                        .and_then(|t| self.type_ref_of(t));
                    let mut value = Symbol::new(SymbolKind::Parameter, "value");
                    value.member_type = member_type;
                    let idx = self.add_symbol(value);
                    self.insert_scope("value", idx);
                }
                self.resolve_children(node);
                self.scopes.pop();
            }
            "lambda_expression" | "anonymous_method_expression" => {
                self.scopes.push(FxHashMap::default());
                self.bind_parameters(node);
                if let Some(body) = node.child_by_field_name("body") {
                    self.resolve(body);
                }
                self.scopes.pop();
            }
            "block" | "for_statement" | "using_statement" | "switch_section" => {
                self.scopes.push(FxHashMap::default());
                self.resolve_children(node);
                self.scopes.pop();
            }
            "foreach_statement" => {
                self.scopes.push(FxHashMap::default());
                if let Some(right) = node.child_by_field_name("right") {
                    self.resolve(right);
                }
                if let Some(left) = node.child_by_field_name("left") {
                    if left.kind() == "identifier" {
                        let mut local = Symbol::new(SymbolKind::Local, self.text(left));
                        local.member_type = node
                            .child_by_field_name("type")
                            .and_then(|t| self.type_ref_of(t));
                        let idx = self.add_symbol(local);
                        self.insert_scope(self.symbols[idx].name.clone(), idx);
                        self.declarations.insert(left.id(), idx);
                    }
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.resolve(body);
                }
                self.scopes.pop();
            }
            "catch_clause" => {
                self.scopes.push(FxHashMap::default());
                if let Some(declaration) = find_kind(node, "catch_declaration") {
                    if let Some(name_node) = declaration.child_by_field_name("name") {
                        let mut param = Symbol::new(SymbolKind::Parameter, self.text(name_node));
                        param.member_type = declaration
                            .child_by_field_name("type")
                            .and_then(|t| self.type_ref_of(t));
                        let idx = self.add_symbol(param);
                        self.insert_scope(self.symbols[idx].name.clone(), idx);
                        self.declarations.insert(name_node.id(), idx);
                    }
                }
                self.resolve_children(node);
                self.scopes.pop();
            }
            "variable_declarator" => {
                // Bind the initializer before the name comes into scope.
                if let Some(init) = find_kind(node, "equals_value_clause") {
                    self.resolve_children(init);
                }
                let declared_type = node
                    .parent()
                    .and_then(|d| d.child_by_field_name("type"))
                    .and_then(|t| self.type_ref_of(t))
                    .or_else(|| {
                        find_kind(node, "equals_value_clause")
                            .and_then(|eq| eq.named_child(0))
                            .and_then(|init| self.expr_types.get(&init.id()).cloned())
                    });
                if let Some(name_node) = node
                    .child_by_field_name("name")
                    .or_else(|| find_kind(node, "identifier"))
                {
                    // Field declarators were already registered in pass 1.
                    if !self.declarations.contains_key(&node.id()) {
                        let mut local = Symbol::new(SymbolKind::Local, self.text(name_node));
                        local.member_type = declared_type;
                        let idx = self.add_symbol(local);
                        self.insert_scope(self.symbols[idx].name.clone(), idx);
                        self.declarations.insert(node.id(), idx);
                        self.declarations.insert(name_node.id(), idx);
                    }
                }
            }
            "member_access_expression" => self.resolve_member_access(node),
            "qualified_name" => {
                let text = self.text(node).to_string();
                if let Some(&idx) = self.types.get(&text) {
                    self.use_sites.insert(node.id(), idx);
                }
            }
            "identifier" => self.bind_identifier(node),
            "predefined_type" => {
                let text = self.text(node).to_string();
                if let Some(&idx) = self.types.get(&text) {
                    self.use_sites.insert(node.id(), idx);
                }
            }
            "this_expression" => {
                if let Some(&type_idx) = self.type_stack.last() {
                    let symbol = &self.symbols[type_idx];
                    self.expr_types.insert(
                        node.id(),
                        TypeRef {
                            name: symbol.qualified_name.clone(),
                            is_value_type: symbol.is_value_type,
                            is_bool: false,
                            is_string: false,
                            has_definition: true,
                        },
                    );
                }
            }
            "integer_literal" => {
                self.expr_types.insert(node.id(), predefined_ref("int"));
            }
            "real_literal" => {
                self.expr_types.insert(node.id(), predefined_ref("double"));
            }
            "boolean_literal" => {
                self.expr_types.insert(node.id(), predefined_ref("bool"));
            }
            "string_literal" | "verbatim_string_literal" | "interpolated_string_expression" => {
                self.expr_types.insert(node.id(), predefined_ref("string"));
                self.resolve_children(node);
            }
            "character_literal" => {
                self.expr_types.insert(node.id(), predefined_ref("char"));
            }
            _ => self.resolve_children(node),
        }

        self.propagate_expr_type(node);
    }

    fn resolve_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.resolve(child);
        }
    }

    /// Derive an expression node's type from its parts after they are
    /// bound.
    fn propagate_expr_type(&mut self, node: Node<'_>) {
        let derived = match node.kind() {
            "parenthesized_expression" => node
                .named_child(0)
                .and_then(|inner| self.expr_types.get(&inner.id()).cloned()),
            "conditional_expression" => node
                .child_by_field_name("consequence")
                .and_then(|c| self.expr_types.get(&c.id()).cloned()),
            "assignment_expression" => node
                .child_by_field_name("left")
                .and_then(|l| self.expr_types.get(&l.id()).cloned()),
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or("");
                if matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||") {
                    Some(predefined_ref("bool"))
                } else {
                    node.child_by_field_name("left")
                        .and_then(|l| self.expr_types.get(&l.id()).cloned())
                        .or_else(|| {
                            node.child_by_field_name("right")
                                .and_then(|r| self.expr_types.get(&r.id()).cloned())
                        })
                }
            }
            "invocation_expression" => node
                .child_by_field_name("function")
                .and_then(|f| invoked_name_node(f))
                .and_then(|n| self.use_sites.get(&n.id()))
                .and_then(|&idx| self.symbols[idx].member_type.clone()),
            "object_creation_expression" => node
                .child_by_field_name("type")
                .and_then(|t| self.type_ref_of(t)),
            "cast_expression" => node
                .child_by_field_name("type")
                .and_then(|t| self.type_ref_of(t)),
            _ => None,
        };
        if let Some(type_ref) = derived {
            self.expr_types.insert(node.id(), type_ref);
        }
    }

    fn bind_identifier(&mut self, node: Node<'_>) {
        // Declaration names were mapped in pass 1 / by the declarator arm.
        if self.declarations.contains_key(&node.id()) {
            return;
        }
        let name = self.text(node).to_string();
        if let Some(idx) = self.lookup(&name) {
            self.use_sites.insert(node.id(), idx);
            if let Some(member_type) = self.symbols[idx].member_type.clone() {
                self.expr_types.insert(node.id(), member_type);
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        for scope in self.scopes.iter().rev() {
            if let Some(&idx) = scope.get(name) {
                return Some(idx);
            }
        }
        for &type_idx in self.type_stack.iter().rev() {
            let qualified = self.symbols[type_idx].qualified_name.clone();
            if let Some(idx) = self.lookup_member(&qualified, name) {
                return Some(idx);
            }
        }
        self.types.get(name).copied()
    }

    /// Member lookup through the type's declared base chain.
    fn lookup_member(&self, type_qualified: &str, name: &str) -> Option<usize> {
        if let Some(members) = self.members.get(type_qualified) {
            if let Some(&idx) = members
                .iter()
                .find(|&&idx| self.symbols[idx].name == name)
            {
                return Some(idx);
            }
        }
        if let Some(bases) = self.base_names.get(type_qualified) {
            for base in bases {
                if let Some(&base_idx) = self.types.get(base.as_str()) {
                    let base_qualified = self.symbols[base_idx].qualified_name.clone();
                    if let Some(idx) = self.lookup_member(&base_qualified, name) {
                        return Some(idx);
                    }
                }
            }
        }
        None
    }

    fn resolve_member_access(&mut self, node: Node<'_>) {
        let Some(expression) = node.child_by_field_name("expression") else {
            return;
        };
        self.resolve(expression);

        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name_ident = if name_node.kind() == "generic_name" {
            find_kind(name_node, "identifier").unwrap_or(name_node)
        } else {
            name_node
        };
        let name = self.text(name_ident).to_string();

        // Receiver as a type (static access), then receiver's value type.
        let receiver_type = self
            .use_sites
            .get(&expression.id())
            .map(|&idx| &self.symbols[idx])
            .filter(|s| s.kind == SymbolKind::NamedType)
            .map(|s| s.qualified_name.clone())
            .or_else(|| {
                self.expr_types
                    .get(&expression.id())
                    .map(|t| t.name.clone())
            });

        let member = receiver_type
            .as_deref()
            .and_then(|t| self.lookup_member(t, &name))
            .or_else(|| self.extension_methods.get(&name).copied());

        if let Some(idx) = member {
            self.use_sites.insert(name_ident.id(), idx);
            if let Some(member_type) = self.symbols[idx].member_type.clone() {
                self.expr_types.insert(node.id(), member_type);
            }
        }
    }

    fn bind_type_parameters(&mut self, node: Node<'_>) {
        if let Some(list) = find_kind(node, "type_parameter_list") {
            let mut cursor = list.walk();
            for parameter in list.named_children(&mut cursor) {
                if parameter.kind() == "type_parameter" {
                    let idx =
                        self.add_symbol(Symbol::new(SymbolKind::TypeParameter, self.text(parameter)));
                    self.insert_scope(self.symbols[idx].name.clone(), idx);
                }
            }
        }
    }

    fn bind_parameters(&mut self, node: Node<'_>) {
        let Some(parameters) = node.child_by_field_name("parameters") else {
            return;
        };
        if parameters.kind() == "identifier" {
            let idx = self.add_symbol(Symbol::new(SymbolKind::Parameter, self.text(parameters)));
            self.insert_scope(self.symbols[idx].name.clone(), idx);
            return;
        }
        let mut cursor = parameters.walk();
        for parameter in parameters.named_children(&mut cursor) {
            if parameter.kind() != "parameter" {
                continue;
            }
            let Some(name_node) = parameter.child_by_field_name("name") else {
                continue;
            };
            let mut symbol = Symbol::new(SymbolKind::Parameter, self.text(name_node));
            symbol.member_type = parameter
                .child_by_field_name("type")
                .and_then(|t| self.type_ref_of(t));
            let idx = self.add_symbol(symbol);
            self.insert_scope(self.symbols[idx].name.clone(), idx);
            self.declarations.insert(parameter.id(), idx);
            self.declarations.insert(name_node.id(), idx);
        }
    }

    /// Register the labels of a function body up front so backward gotos
    /// resolve. Nested functions own their own labels.
    fn bind_labels(&mut self, body: Node<'_>) {
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            if matches!(
                node.kind(),
                "lambda_expression" | "anonymous_method_expression" | "local_function_statement"
            ) {
                continue;
            }
            if node.kind() == "labeled_statement" {
                if let Some(name_node) = node.named_child(0) {
                    let idx =
                        self.add_symbol(Symbol::new(SymbolKind::Label, self.text(name_node)));
                    self.insert_scope(self.symbols[idx].name.clone(), idx);
                    self.declarations.insert(name_node.id(), idx);
                }
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                stack.push(child);
            }
        }
    }

    fn insert_scope(&mut self, name: impl Into<String>, idx: usize) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), idx);
        }
    }

    // --- shared helpers --------------------------------------------------

    fn modifier_texts(&self, node: Node<'_>) -> Vec<&'s str> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "modifier" {
                out.push(self.text(child));
            }
        }
        out
    }

    fn parameter_modifiers(&self, parameter: Node<'_>) -> Vec<&'s str> {
        let mut out = Vec::new();
        let mut cursor = parameter.walk();
        for child in parameter.children(&mut cursor) {
            if !child.is_named() || child.kind() == "modifier" {
                out.push(self.text(child));
            }
        }
        out
    }

    fn type_ref_of(&self, node: Node<'_>) -> Option<TypeRef> {
        match node.kind() {
            "predefined_type" => {
                let text = self.text(node);
                if text == "void" {
                    None
                } else {
                    Some(predefined_ref(text))
                }
            }
            "identifier" | "qualified_name" => {
                let text = self.text(node);
                if text == "var" {
                    return None;
                }
                if let Some(&idx) = self.types.get(text) {
                    let symbol = &self.symbols[idx];
                    return Some(TypeRef {
                        name: symbol.qualified_name.clone(),
                        is_value_type: symbol.is_value_type,
                        is_bool: symbol.qualified_name == "System.Boolean",
                        is_string: symbol.qualified_name == "System.String",
                        has_definition: true,
                    });
                }
                Some(TypeRef::reference(text))
            }
            "generic_name" | "array_type" | "nullable_type" => {
                Some(TypeRef::reference(self.text(node)))
            }
            _ => None,
        }
    }

    fn literal_of(&self, node: Node<'_>) -> Option<LuaLiteral> {
        match node.kind() {
            "integer_literal" | "real_literal" => {
                Some(LuaLiteral::Number(self.text(node).to_string()))
            }
            "string_literal" | "verbatim_string_literal" => {
                Some(LuaLiteral::Str(self.text(node).to_string()))
            }
            "boolean_literal" => Some(LuaLiteral::Bool(self.text(node) == "true")),
            "null_literal" => Some(LuaLiteral::Nil),
            "character_literal" => {
                let inner = self.text(node).trim_matches('\'').chars().next()?;
                Some(LuaLiteral::Char(inner))
            }
            "prefix_unary_expression" => {
                let operand = node.named_child(0)?;
                if self.text(node).starts_with('-') && operand.kind() == "integer_literal" {
                    Some(LuaLiteral::Number(format!("-{}", self.text(operand))))
                } else if self.text(node).starts_with('-') && operand.kind() == "real_literal" {
                    Some(LuaLiteral::Number(format!("-{}", self.text(operand))))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

fn accessibility_of(modifiers: &[&str]) -> Accessibility {
    if modifiers.contains(&"public") {
        Accessibility::Public
    } else if modifiers.contains(&"protected") {
        Accessibility::Protected
    } else if modifiers.contains(&"internal") {
        Accessibility::Internal
    } else {
        Accessibility::Private
    }
}

fn predefined_ref(keyword: &str) -> TypeRef {
    let (qualified, is_value) = PREDEFINED
        .iter()
        .find(|(k, _, _)| *k == keyword)
        .map(|(_, q, v)| (*q, *v))
        .unwrap_or(("System.Object", false));
    TypeRef {
        name: qualified.to_string(),
        is_value_type: is_value,
        is_bool: keyword == "bool",
        is_string: keyword == "string",
        has_definition: false,
    }
}

fn find_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// The identifier a call's return type hangs off.
fn invoked_name_node(callee: Node<'_>) -> Option<Node<'_>> {
    match callee.kind() {
        "identifier" => Some(callee),
        "generic_name" => find_kind(callee, "identifier"),
        "member_access_expression" => {
            let name = callee.child_by_field_name("name")?;
            if name.kind() == "generic_name" {
                find_kind(name, "identifier")
            } else {
                Some(name)
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .unwrap();
        parser.parse(source, None).unwrap()
    }

    fn find_identifier<'t>(node: Node<'t>, source: &str, name: &str) -> Option<Node<'t>> {
        if node.kind() == "identifier" && &source[node.byte_range()] == name {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        for child in children {
            if let Some(found) = find_identifier(child, source, name) {
                return Some(found);
            }
        }
        None
    }

    #[test]
    fn binds_locals_and_parameters() {
        let source = "class C { void M(int p) { int x = p; } }";
        let tree = parse(source);
        let model = SourceModel::bind(&tree, source.as_bytes());

        let p_use = {
            // The use of p is inside the initializer, after its declaration.
            let body = find_identifier(tree.root_node(), source, "x").unwrap();
            let declarator = body.parent().unwrap();
            let init = declarator.named_child(1).unwrap();
            init.named_child(0).unwrap_or(init)
        };
        let symbol = model.symbol_of(p_use);
        assert!(symbol.is_some(), "p should bind");
        assert_eq!(symbol.unwrap().kind, SymbolKind::Parameter);
    }

    #[test]
    fn const_fields_carry_their_value() {
        let source = "class C { const int Max = 10; }";
        let tree = parse(source);
        let model = SourceModel::bind(&tree, source.as_bytes());

        let name = find_identifier(tree.root_node(), source, "Max").unwrap();
        let symbol = model.declared_symbol(name).expect("Max declared");
        assert_eq!(symbol.kind, SymbolKind::Field);
        assert!(symbol.is_static);
        assert_eq!(
            symbol.constant_value,
            Some(LuaLiteral::Number("10".to_string()))
        );
    }

    #[test]
    fn predefined_types_resolve_qualified() {
        let source = "class C { void M() { int.Parse(\"1\"); } }";
        let tree = parse(source);
        let model = SourceModel::bind(&tree, source.as_bytes());

        let root = tree.root_node();
        fn find_kind_rec<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
            if node.kind() == kind {
                return Some(node);
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
            for child in children {
                if let Some(found) = find_kind_rec(child, kind) {
                    return Some(found);
                }
            }
            None
        }
        let member = find_kind_rec(root, "member_access_expression").unwrap();
        let receiver = member.child_by_field_name("expression").unwrap();
        let symbol = model.symbol_of(receiver).expect("int resolves");
        assert_eq!(symbol.qualified_name, "System.Int32");
        assert!(symbol.is_value_type);
    }

    #[test]
    fn extension_methods_are_classified() {
        let source = "static class Ext { public static int Twice(this int x) { return x + x; } }";
        let tree = parse(source);
        let model = SourceModel::bind(&tree, source.as_bytes());

        let name = find_identifier(tree.root_node(), source, "Twice").unwrap();
        let symbol = model.declared_symbol(name).expect("Twice declared");
        assert!(symbol.is_extension_method);
        assert_eq!(symbol.reduced_container.as_deref(), Some("Ext"));
    }

    #[test]
    fn virtual_members_are_overridable() {
        let source = "class C { public virtual int P { get; set; } public int Q { get; set; } }";
        let tree = parse(source);
        let model = SourceModel::bind(&tree, source.as_bytes());

        let p = find_identifier(tree.root_node(), source, "P").unwrap();
        let q = find_identifier(tree.root_node(), source, "Q").unwrap();
        assert!(model.declared_symbol(p).unwrap().is_overridable);
        assert!(!model.declared_symbol(q).unwrap().is_overridable);
        assert!(model.declared_symbol(p).unwrap().is_auto_property);
    }
}
