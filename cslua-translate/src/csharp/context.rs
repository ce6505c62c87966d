//! Translation context for C# to Lua conversion.
//!
//! Owns the four scoped stacks the walk maintains (enclosing type,
//! function, switch, and statement block) plus the temporary-identifier
//! pool of the current function. Every push is matched by a pop on the
//! corresponding visit's exit; querying the top of an empty stack is a
//! programmer error and panics.

use cslua_repr::decl::{LuaClassDecl, LuaEnumDecl};
use cslua_repr::stmt::{LuaBlock, LuaStmt, SwitchAdapter};
use tree_sitter::Node;

use crate::{translate_error, MetadataProvider, SemanticModel, Symbol, TranslateErrorKind, TranslateResult, TypeRef};

/// Fixed ordered pool of temporary identifiers, per function.
pub const TEMP_POOL: &[&str] = &[
    "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9", "t10", "t11", "t12", "t13", "t14",
    "t15", "t16",
];

/// State of the function currently being lowered.
#[derive(Debug, Default)]
pub struct FunctionContext {
    /// Next free slot in [`TEMP_POOL`].
    pub temp_index: usize,
    /// Set by yield-statement lowering; triggers the generator rewrite.
    pub has_yield: bool,
    /// The function is a static constructor (static field writes go
    /// through `this`, the type table).
    pub is_static_ctor: bool,
    /// One frame per enclosing loop; tracks whether the loop body needs a
    /// trailing `::continue::` label.
    loops: Vec<bool>,
}

impl FunctionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn static_ctor() -> Self {
        Self {
            is_static_ctor: true,
            ..Self::default()
        }
    }
}

/// A type declaration under construction.
///
/// Class-like declarations collect members; enums only collect name/value
/// pairs, but share the push/pop discipline.
#[derive(Debug)]
pub enum TypeFrame {
    Class(LuaClassDecl),
    Enum(LuaEnumDecl),
}

/// Context for one compilation unit's translation.
///
/// Single-threaded and non-reentrant; the semantic model and metadata
/// provider are read-only collaborators and may be shared across
/// translator instances.
pub struct CsContext<'a> {
    source: &'a [u8],
    file_path: &'a str,
    model: &'a dyn SemanticModel,
    metadata: &'a dyn MetadataProvider,
    types: Vec<TypeFrame>,
    functions: Vec<FunctionContext>,
    switches: Vec<SwitchAdapter>,
    blocks: Vec<LuaBlock>,
}

impl<'a> CsContext<'a> {
    pub fn new(
        source: &'a [u8],
        file_path: &'a str,
        model: &'a dyn SemanticModel,
        metadata: &'a dyn MetadataProvider,
    ) -> Self {
        Self {
            source,
            file_path,
            model,
            metadata,
            types: Vec::new(),
            functions: Vec::new(),
            switches: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn file_path(&self) -> &str {
        self.file_path
    }

    /// Source text of a node.
    pub fn node_text(&self, node: Node<'_>) -> &'a str {
        std::str::from_utf8(&self.source[node.byte_range()]).unwrap_or("")
    }

    // --- collaborator queries -------------------------------------------

    pub fn symbol_of(&self, node: Node<'_>) -> Option<&'a Symbol> {
        let model = self.model;
        model.symbol_of(node)
    }

    pub fn declared_symbol(&self, node: Node<'_>) -> Option<&'a Symbol> {
        let model = self.model;
        model.declared_symbol(node)
    }

    pub fn type_of(&self, node: Node<'_>) -> Option<&'a TypeRef> {
        let model = self.model;
        model.type_of(node)
    }

    pub fn type_map_name(&self, name: &str) -> Option<&'a str> {
        let metadata = self.metadata;
        metadata.type_map_name(name)
    }

    pub fn method_map_name(&self, symbol: &Symbol) -> Option<&'a str> {
        let metadata = self.metadata;
        metadata.method_map_name(symbol)
    }

    // --- type stack -----------------------------------------------------

    pub fn push_type(&mut self, frame: TypeFrame) {
        self.types.push(frame);
    }

    pub fn pop_type(&mut self) -> TypeFrame {
        self.types.pop().expect("type stack underflow")
    }

    /// Innermost class-like declaration under construction.
    pub fn cur_type_mut(&mut self) -> &mut LuaClassDecl {
        match self.types.last_mut().expect("no enclosing type") {
            TypeFrame::Class(decl) => decl,
            TypeFrame::Enum(_) => panic!("enclosing type is an enum"),
        }
    }

    pub fn cur_type(&self) -> &LuaClassDecl {
        match self.types.last().expect("no enclosing type") {
            TypeFrame::Class(decl) => decl,
            TypeFrame::Enum(_) => panic!("enclosing type is an enum"),
        }
    }

    pub fn cur_enum_mut(&mut self) -> &mut LuaEnumDecl {
        match self.types.last_mut().expect("no enclosing type") {
            TypeFrame::Enum(decl) => decl,
            TypeFrame::Class(_) => panic!("enclosing type is not an enum"),
        }
    }

    pub fn in_interface(&self) -> bool {
        matches!(
            self.types.last(),
            Some(TypeFrame::Class(decl)) if decl.kind == cslua_repr::decl::TypeKind::Interface
        )
    }

    // --- function stack -------------------------------------------------

    pub fn push_function(&mut self, function: FunctionContext) {
        self.functions.push(function);
    }

    pub fn pop_function(&mut self) -> FunctionContext {
        self.functions.pop().expect("function stack underflow")
    }

    pub fn cur_function(&self) -> &FunctionContext {
        self.functions.last().expect("no enclosing function")
    }

    pub fn cur_function_mut(&mut self) -> &mut FunctionContext {
        self.functions.last_mut().expect("no enclosing function")
    }

    pub fn in_static_ctor(&self) -> bool {
        self.functions.last().is_some_and(|f| f.is_static_ctor)
    }

    /// Mint the next temporary of the current function.
    ///
    /// Fails with a diagnostic naming the source location and the pool size
    /// when the fixed pool is exhausted.
    pub fn fresh_temp(&mut self, node: Node<'_>) -> TranslateResult<String> {
        let function = self.functions.last_mut().expect("no enclosing function");
        if function.temp_index >= TEMP_POOL.len() {
            return Err(translate_error(
                TranslateErrorKind::PoolExhausted,
                format!("temporary pool of size {} exhausted", TEMP_POOL.len()),
                node,
            ));
        }
        let name = TEMP_POOL[function.temp_index];
        function.temp_index += 1;
        Ok(name.to_string())
    }

    // --- loop tracking (continue lowering) ------------------------------

    pub fn enter_loop(&mut self) {
        self.cur_function_mut().loops.push(false);
    }

    /// Leave the innermost loop; true when its body used `continue`.
    pub fn exit_loop(&mut self) -> bool {
        self.cur_function_mut()
            .loops
            .pop()
            .expect("loop stack underflow")
    }

    pub fn mark_continue(&mut self) {
        if let Some(top) = self.cur_function_mut().loops.last_mut() {
            *top = true;
        }
    }

    // --- switch stack ---------------------------------------------------

    pub fn push_switch(&mut self, adapter: SwitchAdapter) {
        self.switches.push(adapter);
    }

    pub fn pop_switch(&mut self) -> SwitchAdapter {
        self.switches.pop().expect("switch stack underflow")
    }

    pub fn cur_switch_mut(&mut self) -> &mut SwitchAdapter {
        self.switches.last_mut().expect("no enclosing switch")
    }

    // --- block stack ----------------------------------------------------

    pub fn push_block(&mut self) {
        self.blocks.push(LuaBlock::new());
    }

    pub fn pop_block(&mut self) -> LuaBlock {
        self.blocks.pop().expect("block stack underflow")
    }

    /// Re-enter an already built block (for-loop incrementor splicing).
    pub fn reenter_block(&mut self, block: LuaBlock) {
        self.blocks.push(block);
    }

    pub fn cur_block_mut(&mut self) -> &mut LuaBlock {
        self.blocks.last_mut().expect("no enclosing block")
    }

    /// Append a statement to the innermost block. This is the only
    /// non-local emission path; expression visitors use it for minted
    /// temporaries, expanded increments and ref/out rewrites.
    pub fn emit(&mut self, stmt: LuaStmt) {
        self.cur_block_mut().push(stmt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csharp::binder::SourceModel;
    use crate::metadata::MetadataMap;
    use cslua_repr::decl::TypeKind;

    fn with_context<R>(source: &str, f: impl FnOnce(&mut CsContext<'_>, Node<'_>) -> R) -> R {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        let model = SourceModel::bind(&tree, source.as_bytes());
        let metadata = MetadataMap::with_defaults();
        let mut ctx = CsContext::new(source.as_bytes(), "test.cs", &model, &metadata);
        f(&mut ctx, tree.root_node())
    }

    #[test]
    fn temp_pool_is_exhaustible() {
        with_context("class C {}", |ctx, root| {
            ctx.push_function(FunctionContext::new());
            for expected in TEMP_POOL {
                assert_eq!(ctx.fresh_temp(root).unwrap(), *expected);
            }
            let err = ctx.fresh_temp(root).unwrap_err();
            assert_eq!(err.kind, TranslateErrorKind::PoolExhausted);
            assert!(err.message.contains("16"));
        });
    }

    #[test]
    fn temp_indices_reset_per_function() {
        with_context("class C {}", |ctx, root| {
            ctx.push_function(FunctionContext::new());
            assert_eq!(ctx.fresh_temp(root).unwrap(), "t1");
            ctx.push_function(FunctionContext::new());
            assert_eq!(ctx.fresh_temp(root).unwrap(), "t1");
            ctx.pop_function();
            assert_eq!(ctx.fresh_temp(root).unwrap(), "t2");
        });
    }

    #[test]
    fn stacks_track_innermost() {
        with_context("class C {}", |ctx, _| {
            ctx.push_type(TypeFrame::Class(LuaClassDecl::new(TypeKind::Class, "A")));
            ctx.push_type(TypeFrame::Class(LuaClassDecl::new(TypeKind::Class, "B")));
            assert_eq!(ctx.cur_type().name, "B");
            ctx.pop_type();
            assert_eq!(ctx.cur_type().name, "A");
        });
    }

    #[test]
    fn loop_frames_record_continue() {
        with_context("class C {}", |ctx, _| {
            ctx.push_function(FunctionContext::new());
            ctx.enter_loop();
            ctx.enter_loop();
            ctx.mark_continue();
            assert!(ctx.exit_loop());
            assert!(!ctx.exit_loop());
        });
    }
}
