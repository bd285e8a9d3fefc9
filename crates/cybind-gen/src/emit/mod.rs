//! Text emitters for the three binding artifacts.
//!
//! Each header set renders into one `.pxd` (Cython declarations), one `.pyx`
//! (ctypes structures and call trampolines) and one `.pyi` (type stubs). The
//! emitters share [`MemberSelection`] so a member present in one output is
//! present in all of them.

mod pxd;
mod pyi;
mod pyx;

pub use pxd::PxdEmitter;
pub use pyi::PyiEmitter;
pub use pyx::PyxEmitter;

use crate::decl::{Callable, Declaration, EnumDecl, FunctionDecl, StructDecl};
use crate::error::Result;
use crate::flags::{MethodPolicy, WrapFlags};
use crate::registry::{HostType, KnownTypes, TypeRegistry};
use crate::typewrap::TypeWrap;
use cybind_clang::ClangAst;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use std::borrow::Cow;
use tracing::{debug, warn};

/// Indented line writer.
#[derive(Debug, Default)]
pub struct CodeWriter {
    output: String,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writeln(&mut self, s: &str) {
        if !s.is_empty() {
            for _ in 0..self.indent {
                self.output.push_str("    ");
            }
        }
        self.output.push_str(s);
        self.output.push('\n');
    }

    pub fn blank(&mut self) {
        self.output.push('\n');
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        self.output
    }
}

/// The declarations of one header and how to bind them.
#[derive(Debug)]
pub struct HeaderBindings<'a> {
    pub ast: &'a ClangAst,
    /// Header as named in `cdef extern from`
    pub header: String,
    /// Prepended to the Python name of every free function
    pub prefix: String,
    /// Type spellings that disqualify a method or function
    pub excludes: Vec<SmolStr>,
    pub functions: MethodPolicy,
    pub wraps: FxHashMap<SmolStr, WrapFlags>,
    pub declarations: Vec<Declaration<'a>>,
}

impl<'a> HeaderBindings<'a> {
    pub fn new(ast: &'a ClangAst, header: impl Into<String>) -> Self {
        Self {
            ast,
            header: header.into(),
            prefix: String::new(),
            excludes: Vec::new(),
            functions: MethodPolicy::None,
            wraps: FxHashMap::default(),
            declarations: Vec::new(),
        }
    }

    pub fn flags_for(&self, name: &str) -> Cow<'_, WrapFlags> {
        match self.wraps.get(name) {
            Some(flags) => Cow::Borrowed(flags),
            None => Cow::Owned(WrapFlags::new(name)),
        }
    }

    /// Free functions pass the header's function policy and the excluded
    /// type check.
    pub fn binds_function(&self, function: &FunctionDecl<'_>) -> bool {
        self.functions.allows(function.name()) && !function.callable().uses_excluded(&self.excludes)
    }

    /// Whether `decl` produces any output. Structs and enums always do.
    pub fn selects(&self, decl: &Declaration<'_>) -> bool {
        match decl {
            Declaration::Function(f) => self.binds_function(f),
            Declaration::Struct(_) | Declaration::Enum(_) => true,
        }
    }
}

/// Everything rendered into one set of artifacts.
#[derive(Debug)]
pub struct BindingSet<'a> {
    /// Module the pyx trampolines call into
    pub native_module: String,
    pub known: KnownTypes,
    pub headers: Vec<HeaderBindings<'a>>,
}

/// Rendered file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub pxd: String,
    pub pyx: String,
    pub pyi: String,
}

/// What one emitter sees while rendering a declaration.
pub struct EmitContext<'a, 'h> {
    pub ast: &'a ClangAst,
    pub registry: &'h TypeRegistry,
    pub known: &'h KnownTypes,
    pub header: &'h HeaderBindings<'a>,
    pub native_module: &'h str,
    /// Enclosing namespace of the declaration, `::` separated
    pub namespace: String,
}

/// Members of one struct selected for emission.
#[derive(Debug)]
pub struct MemberSelection<'a> {
    /// Empty unless the fields flag is set
    pub fields: Vec<TypeWrap<'a>>,
    pub methods: Vec<Callable<'a>>,
    pub custom_methods: Vec<String>,
}

impl<'a> MemberSelection<'a> {
    pub fn new(decl: &StructDecl<'a>, flags: &WrapFlags, excludes: &[SmolStr]) -> Self {
        Self {
            fields: if flags.fields { decl.fields() } else { Vec::new() },
            methods: decl.methods(excludes, &flags.methods),
            custom_methods: flags.custom_methods.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.methods.is_empty() && self.custom_methods.is_empty()
    }
}

/// A renderer for one artifact kind.
pub trait Emitter {
    /// Imports at the top of the file.
    fn prologue(&mut self, set: &BindingSet<'_>);

    /// Called before the first emitted declaration and whenever the header or
    /// the namespace changes.
    fn begin_block(&mut self, _cx: &EmitContext<'_, '_>) {}

    fn emit_struct(&mut self, cx: &EmitContext<'_, '_>, decl: &StructDecl<'_>) -> Result<()>;

    fn emit_function(&mut self, cx: &EmitContext<'_, '_>, decl: &FunctionDecl<'_>) -> Result<()>;

    fn emit_enum(&mut self, cx: &EmitContext<'_, '_>, decl: &EnumDecl<'_>) -> Result<()>;

    fn finish(self) -> String;
}

/// Route one declaration to the emitter method for its kind.
pub fn emit_declaration<E: Emitter>(
    emitter: &mut E,
    cx: &EmitContext<'_, '_>,
    decl: &Declaration<'_>,
) -> Result<()> {
    match decl {
        Declaration::Struct(s) => emitter.emit_struct(cx, s),
        Declaration::Function(f) => emitter.emit_function(cx, f),
        Declaration::Enum(e) => emitter.emit_enum(cx, e),
    }
}

/// Render a binding set with one emitter.
pub fn render<E: Emitter>(mut emitter: E, set: &BindingSet<'_>) -> Result<String> {
    let registry = TypeRegistry::new();
    emitter.prologue(set);
    for header in &set.headers {
        let mut block: Option<String> = None;
        for decl in &header.declarations {
            // Unselected declarations must not open an empty extern block.
            if !header.selects(decl) {
                debug!(name = decl.name(), "declaration not selected");
                continue;
            }
            let cx = EmitContext {
                ast: header.ast,
                registry: &registry,
                known: &set.known,
                header,
                native_module: &set.native_module,
                namespace: decl.namespace(header.ast),
            };
            if block.as_deref() != Some(cx.namespace.as_str()) {
                emitter.begin_block(&cx);
                block = Some(cx.namespace.clone());
            }
            emit_declaration(&mut emitter, &cx, decl)?;
        }
    }
    Ok(emitter.finish())
}

/// Render all three artifacts. Nothing is returned unless every emitter
/// succeeds.
pub fn emit(set: &BindingSet<'_>) -> Result<Artifacts> {
    Ok(Artifacts {
        pxd: render(PxdEmitter::new(), set)?,
        pyx: render(PyxEmitter::new(), set)?,
        pyi: render(PyiEmitter::new(), set)?,
    })
}

/// Host type lookup that reports each unresolved spelling once.
#[derive(Debug, Default)]
pub struct HostTypes {
    warned: FxHashSet<String>,
}

impl HostTypes {
    pub fn resolve(&mut self, cx: &EmitContext<'_, '_>, tw: &TypeWrap<'_>) -> Result<HostType> {
        let host = tw.host_type(cx.registry, cx.known)?;
        if let Some(spelling) = host.unresolved() {
            if self.warned.insert(spelling.to_string()) {
                warn!(spelling, "unresolved type, emitting verbatim");
            }
        }
        Ok(host)
    }
}

/// ctypes base class of the Python class generated for a struct.
pub fn ctypes_base(decl: &StructDecl<'_>) -> &'static str {
    if decl.is_union() {
        "ctypes.Union"
    } else {
        "ctypes.Structure"
    }
}

/// Python name of a parameter. Unnamed parameters get positional names.
pub fn param_name(tw: &TypeWrap<'_>, index: usize) -> String {
    if tw.raw_name().is_empty() {
        format!("arg{}", index)
    } else {
        tw.name().into_owned()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_code_writer_indents() {
        let mut w = CodeWriter::new();
        w.writeln("class A:");
        w.indent();
        w.writeln("pass");
        w.writeln("");
        w.dedent();
        w.writeln("x = 1");
        assert_eq!(w.finish(), "class A:\n    pass\n\nx = 1\n");
    }

    #[test]
    fn test_empty_struct_gets_placeholder_everywhere() {
        let ast = sample_ast();
        let artifacts = emit(&bindings(&ast)).unwrap();
        assert!(artifacts.pxd.contains("    struct Empty:\n        pass\n"));
        assert!(artifacts.pyx.contains("class Empty(ctypes.Structure):\n    pass\n"));
        assert!(artifacts.pyi.contains("class Empty(ctypes.Structure):\n    pass\n"));
    }

    #[test]
    fn test_excluded_method_absent_everywhere() {
        let ast = sample_ast();
        let artifacts = emit(&bindings(&ast)).unwrap();
        for text in [&artifacts.pxd, &artifacts.pyx, &artifacts.pyi] {
            assert!(text.contains("Draw"), "{text}");
            assert!(!text.contains("Append"), "{text}");
        }
    }

    #[test]
    fn test_unselected_functions_open_no_block() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        record(&mut ast, cybind_clang::CursorKind::StructDecl, "ImVec2");
        let ns = ast.push(root, cybind_clang::ClangNode::new(cybind_clang::CursorKind::Namespace, "ImGui"));
        let new_frame = ast.push(
            ns,
            cybind_clang::ClangNode::new(cybind_clang::CursorKind::FunctionDecl, "NewFrame")
                .with_result_type(cybind_clang::ClangType::void()),
        );

        let mut header = HeaderBindings::new(&ast, "imgui.h");
        for id in [ast.children(root).next().unwrap(), new_frame] {
            header.declarations.push(Declaration::from_cursor(&ast, id).unwrap());
        }
        let set = BindingSet {
            native_module: "_impl".into(),
            known: KnownTypes::new(),
            headers: vec![header],
        };
        let pxd = render(PxdEmitter::new(), &set).unwrap();
        assert!(pxd.contains("cdef extern from \"imgui.h\":\n    struct ImVec2:\n"), "{pxd}");
        assert!(!pxd.contains("namespace \"ImGui\""), "{pxd}");
        assert!(!pxd.trim_end().ends_with(':'), "{pxd}");
    }

    #[test]
    fn test_builtin_typedef_parameter_is_emitted_verbatim() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let text_v = ast.push(
            root,
            cybind_clang::ClangNode::new(cybind_clang::CursorKind::FunctionDecl, "TextV")
                .with_result_type(cybind_clang::ClangType::void()),
        );
        let args = ast.push(
            text_v,
            cybind_clang::ClangNode::new(cybind_clang::CursorKind::ParmDecl, "args")
                .with_type(cybind_clang::ClangType::typedef("va_list")),
        );
        ast.push(
            args,
            cybind_clang::ClangNode::new(cybind_clang::CursorKind::TypeRef, "va_list"),
        );

        let mut header = HeaderBindings::new(&ast, "imgui.h");
        header.functions = MethodPolicy::All;
        header.declarations.push(Declaration::from_cursor(&ast, text_v).unwrap());
        let set = BindingSet {
            native_module: "_impl".into(),
            known: KnownTypes::new(),
            headers: vec![header],
        };

        let artifacts = emit(&set).unwrap();
        assert!(artifacts.pxd.contains("void TextV(va_list args)"), "{}", artifacts.pxd);
        assert!(artifacts.pyx.contains("def TextV(args):"), "{}", artifacts.pyx);
        assert!(
            artifacts.pyi.contains("def TextV(args: va_list) -> None: ..."),
            "{}",
            artifacts.pyi
        );
    }

    #[test]
    fn test_param_names() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let f = ast.push(
            root,
            cybind_clang::ClangNode::new(cybind_clang::CursorKind::FunctionDecl, "f"),
        );
        ast.push(
            f,
            cybind_clang::ClangNode::new(cybind_clang::CursorKind::ParmDecl, "")
                .with_type(cybind_clang::ClangType::int("int")),
        );
        ast.push(
            f,
            cybind_clang::ClangNode::new(cybind_clang::CursorKind::ParmDecl, "in")
                .with_type(cybind_clang::ClangType::int("int")),
        );
        let params = TypeWrap::function_params(&ast, f);
        assert_eq!(param_name(&params[0], 0), "arg0");
        assert_eq!(param_name(&params[1], 1), "_in");
    }
}
