//! Cython declaration file.

use super::{BindingSet, CodeWriter, EmitContext, Emitter, MemberSelection};
use crate::decl::{Callable, EnumDecl, FunctionDecl, Member, StructDecl};
use crate::error::Result;
use crate::typewrap::{escape_identifier, TypeWrap};

pub struct PxdEmitter {
    out: CodeWriter,
}

impl PxdEmitter {
    pub fn new() -> Self {
        Self {
            out: CodeWriter::new(),
        }
    }

    fn struct_line(decl: &StructDecl<'_>, selection: &MemberSelection<'_>) -> String {
        let name = decl.name();
        if decl.is_template() {
            format!("cppclass {}[T]", name)
        } else if !decl.constructors().is_empty()
            || !selection.methods.is_empty()
            || decl.definition_has_constructors()
        {
            format!("cppclass {}", name)
        } else {
            format!("struct {}", name)
        }
    }

    fn field(&mut self, field: &TypeWrap<'_>) {
        let mut line = field.c_type_with_name();
        line.push_str(&cname(field.raw_name()));
        self.out.writeln(&line);
    }

    fn constructor(&mut self, record: &str, ctor: &Callable<'_>) {
        self.out.writeln(&format!("{}({})", record, params(ctor)));
    }

    fn method(&mut self, method: &Callable<'_>) {
        if method.is_static() {
            self.out.writeln("@staticmethod");
        }
        let mut line = format!(
            "{} {}{}({})",
            method.result().c_type(),
            escape_identifier(method.name()),
            cname(method.name()),
            params(method)
        );
        if method.is_const() {
            line.push_str(" const");
        }
        self.out.writeln(&line);
    }
}

impl Default for PxdEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// ` "name"` when the Python identifier differs from the C symbol.
fn cname(raw: &str) -> String {
    if escape_identifier(raw) != raw {
        format!(" \"{}\"", raw)
    } else {
        String::new()
    }
}

fn params(callable: &Callable<'_>) -> String {
    let mut rendered: Vec<String> = callable
        .params()
        .iter()
        .map(|p| {
            let decl = if p.raw_name().is_empty() { p.c_type() } else { p.c_type_with_name() };
            match p.default_value() {
                Some(_) => format!("{}=*", decl),
                None => decl,
            }
        })
        .collect();
    if callable.is_variadic() {
        rendered.push("...".to_string());
    }
    rendered.join(", ")
}

impl Emitter for PxdEmitter {
    fn prologue(&mut self, _set: &BindingSet<'_>) {
        self.out.writeln("from libcpp cimport bool");
        self.out.writeln("from libcpp.string cimport string");
        self.out.blank();
    }

    fn begin_block(&mut self, cx: &EmitContext<'_, '_>) {
        self.out.dedent();
        if cx.namespace.is_empty() {
            self.out.writeln(&format!("cdef extern from \"{}\":", cx.header.header));
        } else {
            self.out.writeln(&format!(
                "cdef extern from \"{}\" namespace \"{}\":",
                cx.header.header, cx.namespace
            ));
        }
        self.out.indent();
    }

    fn emit_struct(&mut self, cx: &EmitContext<'_, '_>, decl: &StructDecl<'_>) -> Result<()> {
        let flags = cx.header.flags_for(decl.name());
        let selection = MemberSelection::new(decl, &flags, &cx.header.excludes);
        let line = Self::struct_line(decl, &selection);

        if decl.is_forward_declaration() {
            self.out.writeln(&line);
            self.out.blank();
            return Ok(());
        }

        let members = decl.members(&cx.header.excludes, &flags.methods);
        if members.is_empty() {
            if decl.is_template() {
                self.out.writeln(&line);
            } else {
                self.out.writeln(&format!("{}:", line));
                self.out.indent();
                self.out.writeln("pass");
                self.out.dedent();
            }
            self.out.blank();
            return Ok(());
        }

        self.out.writeln(&format!("{}:", line));
        self.out.indent();
        for member in &members {
            match member {
                Member::Field(field) => self.field(field),
                Member::Constructor(ctor) => self.constructor(decl.name(), ctor),
                Member::Method(method) => self.method(method),
            }
        }
        self.out.dedent();
        self.out.blank();
        Ok(())
    }

    fn emit_function(&mut self, _cx: &EmitContext<'_, '_>, decl: &FunctionDecl<'_>) -> Result<()> {
        let callable = decl.callable();
        self.out.writeln(&format!(
            "{} {}{}({})",
            decl.result().c_type(),
            escape_identifier(decl.name()),
            cname(decl.name()),
            params(&callable)
        ));
        Ok(())
    }

    fn emit_enum(&mut self, _cx: &EmitContext<'_, '_>, decl: &EnumDecl<'_>) -> Result<()> {
        self.out.writeln(&format!("ctypedef enum {}:", decl.name()));
        self.out.indent();
        let constants = decl.constants();
        if constants.is_empty() {
            self.out.writeln("pass");
        }
        for constant in &constants {
            self.out.writeln(&constant.name);
        }
        self.out.dedent();
        self.out.blank();
        Ok(())
    }

    fn finish(self) -> String {
        self.out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::super::{render, BindingSet, HeaderBindings};
    use super::*;
    use crate::decl::Declaration;
    use crate::flags::MethodPolicy;
    use crate::registry::KnownTypes;
    use cybind_clang::{ClangAst, ClangNode, ClangType, CursorKind, TypeKind};

    fn render_one(ast: &ClangAst, configure: impl FnOnce(&mut HeaderBindings<'_>)) -> String {
        let mut header = HeaderBindings::new(ast, "box.h");
        for id in ast.children(ast.root()) {
            header.declarations.push(Declaration::from_cursor(ast, id).unwrap());
        }
        configure(&mut header);
        let set = BindingSet {
            native_module: "_impl".into(),
            known: KnownTypes::new(),
            headers: vec![header],
        };
        render(PxdEmitter::new(), &set).unwrap()
    }

    #[test]
    fn test_member_less_class_template() {
        let mut ast = ClangAst::new();
        record(&mut ast, CursorKind::ClassTemplate, "Box");
        let text = render_one(&ast, |_| {});
        assert!(text.contains("cdef extern from \"box.h\":\n    cppclass Box[T]\n\n"), "{text}");
        assert!(!text.contains("Box[T]:"));
    }

    #[test]
    fn test_struct_with_fields_and_methods() {
        let mut ast = ClangAst::new();
        let v = record(&mut ast, CursorKind::StructDecl, "ImVec4");
        field(&mut ast, v, "x", ClangType::float("float"));
        field(&mut ast, v, "in", ClangType::float("float"));
        ast.push(v, ClangNode::new(CursorKind::Constructor, "ImVec4"));
        let m = method(&mut ast, v, "Scale", ClangType::void(), &[]);
        let p = ast.push(
            m,
            ClangNode::new(CursorKind::ParmDecl, "s")
                .with_type(ClangType::float("float"))
                .with_tokens(&["float", "s", "=", "1.0f"]),
        );
        ast.push(p, ClangNode::new(CursorKind::FloatingLiteral, ""));

        let text = render_one(&ast, |h| {
            h.wraps.insert(
                "ImVec4".into(),
                crate::flags::WrapFlags::new("ImVec4").with_methods(MethodPolicy::All),
            );
        });
        assert!(text.contains("    cppclass ImVec4:\n"), "{text}");
        assert!(text.contains("        float x\n"));
        assert!(text.contains("        float _in \"in\"\n"));
        assert!(text.contains("        ImVec4()\n"));
        assert!(text.contains("        void Scale(float s=*)\n"));
    }

    #[test]
    fn test_forward_declaration_is_opaque() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        ast.push(root, ClangNode::new(CursorKind::StructDecl, "ImGuiContext"));
        let text = render_one(&ast, |_| {});
        assert!(text.contains("    struct ImGuiContext\n"), "{text}");
        assert!(!text.contains("ImGuiContext:"));
    }

    #[test]
    fn test_namespace_blocks_and_functions() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        ast.push(
            root,
            ClangNode::new(CursorKind::FunctionDecl, "CreateContext")
                .with_result_type(ClangType::record("ImGuiContext").ptr()),
        );
        let ns = ast.push(root, ClangNode::new(CursorKind::Namespace, "ImGui"));
        let printf = ast.push(
            ns,
            ClangNode::new(CursorKind::FunctionDecl, "Text").with_result_type(ClangType::void()),
        );
        ast.push(
            printf,
            ClangNode::new(CursorKind::ParmDecl, "fmt").with_type(ClangType::int("char").constant().ptr()),
        );

        let mut header = HeaderBindings::new(&ast, "imgui.h");
        header.functions = MethodPolicy::All;
        let top = ast.children(root).next().unwrap();
        header.declarations.push(Declaration::from_cursor(&ast, top).unwrap());
        header.declarations.push(Declaration::from_cursor(&ast, printf).unwrap());

        let set = BindingSet {
            native_module: "_impl".into(),
            known: KnownTypes::new(),
            headers: vec![header],
        };
        let text = render(PxdEmitter::new(), &set).unwrap();
        assert!(text.contains("cdef extern from \"imgui.h\":\n    ImGuiContext * CreateContext()\n"), "{text}");
        assert!(text.contains("cdef extern from \"imgui.h\" namespace \"ImGui\":\n    void Text(const char * fmt)\n"));
    }

    #[test]
    fn test_enum_and_variadic() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let e = ast.push(root, ClangNode::new(CursorKind::EnumDecl, "ImGuiDir"));
        ast.push(e, ClangNode::new(CursorKind::EnumConstantDecl, "ImGuiDir_Left").with_enum_value(0));
        let mut f = ClangNode::new(CursorKind::FunctionDecl, "TextV")
            .with_result_type(ClangType::new(TypeKind::Void, "void"));
        f.is_variadic = true;
        ast.push(root, f);

        let text = render_one(&ast, |h| h.functions = MethodPolicy::All);
        assert!(text.contains("    ctypedef enum ImGuiDir:\n        ImGuiDir_Left\n"), "{text}");
        assert!(text.contains("    void TextV(...)\n"));
    }
}
