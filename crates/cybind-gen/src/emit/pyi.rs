//! Type stubs for the binding module.

use super::{ctypes_base, param_name, BindingSet, CodeWriter, EmitContext, Emitter, HostTypes, MemberSelection};
use crate::decl::{Callable, EnumDecl, FunctionDecl, StructDecl};
use crate::error::Result;
use crate::typewrap::escape_identifier;

pub struct PyiEmitter {
    out: CodeWriter,
    types: HostTypes,
}

impl PyiEmitter {
    pub fn new() -> Self {
        Self {
            out: CodeWriter::new(),
            types: HostTypes::default(),
        }
    }

    fn signature(
        &mut self,
        cx: &EmitContext<'_, '_>,
        def: &str,
        callable: &Callable<'_>,
        receiver: bool,
    ) -> Result<()> {
        let mut params = Vec::new();
        if receiver {
            params.push("self".to_string());
        }
        for (i, param) in callable.params().iter().enumerate() {
            let annotation = self.types.resolve(cx, param)?.py_annotation();
            let mut rendered = format!("{}: {}", param_name(param, i), annotation);
            if let Some(value) = param.default_value() {
                rendered.push_str(" = ");
                rendered.push_str(&value);
            }
            params.push(rendered);
        }

        let result = callable.result();
        let returns = if result.is_void() {
            "None".to_string()
        } else {
            self.types.resolve(cx, &result)?.py_annotation()
        };
        self.out
            .writeln(&format!("def {}({}) -> {}: ...", def, params.join(", "), returns));
        Ok(())
    }
}

impl Default for PyiEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for PyiEmitter {
    fn prologue(&mut self, _set: &BindingSet<'_>) {
        self.out.writeln("import ctypes");
        self.out.writeln("from enum import IntEnum");
        self.out.blank();
        self.out.blank();
    }

    fn emit_struct(&mut self, cx: &EmitContext<'_, '_>, decl: &StructDecl<'_>) -> Result<()> {
        self.out.writeln(&format!("class {}({}):", decl.name(), ctypes_base(decl)));
        self.out.indent();

        if decl.is_forward_declaration() || decl.is_template() {
            self.out.writeln("pass");
            self.out.dedent();
            self.out.blank();
            return Ok(());
        }

        let flags = cx.header.flags_for(decl.name());
        let selection = MemberSelection::new(decl, &flags, &cx.header.excludes);

        if !selection.fields.is_empty() {
            for field in &selection.fields {
                let annotation = self.types.resolve(cx, field)?.py_annotation();
                self.out.writeln(&format!("{}: {}", field.name(), annotation));
            }
            self.out.blank();
        }

        for method in &selection.methods {
            let def = escape_identifier(method.name());
            if method.is_static() {
                self.out.writeln("@staticmethod");
            }
            self.signature(cx, &def, method, !method.is_static())?;
        }

        for code in &selection.custom_methods {
            if let Some(first) = code.lines().next() {
                self.out.writeln(&format!("{} ...", first));
            }
        }

        if selection.is_empty() {
            self.out.writeln("pass");
        }
        self.out.dedent();
        self.out.blank();
        Ok(())
    }

    fn emit_function(&mut self, cx: &EmitContext<'_, '_>, decl: &FunctionDecl<'_>) -> Result<()> {
        if decl.is_variadic() {
            return Ok(());
        }
        let name = format!("{}{}", cx.header.prefix, decl.name());
        self.signature(cx, &escape_identifier(&name), &decl.callable(), false)
    }

    fn emit_enum(&mut self, _cx: &EmitContext<'_, '_>, decl: &EnumDecl<'_>) -> Result<()> {
        self.out.writeln(&format!("class {}(IntEnum):", decl.name()));
        self.out.indent();
        let constants = decl.constants();
        if constants.is_empty() {
            self.out.writeln("pass");
        }
        for constant in &constants {
            self.out.writeln(&format!("{} = {}", escape_identifier(&constant.name), constant.value));
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
    use super::super::{render, HeaderBindings};
    use super::*;
    use crate::decl::Declaration;
    use crate::flags::{MethodPolicy, WrapFlags};
    use crate::registry::KnownTypes;
    use cybind_clang::{ClangAst, ClangNode, ClangType, CursorKind, TypeKind};

    #[test]
    fn test_fields_and_methods() {
        let ast = sample_ast();
        let text = render(PyiEmitter::new(), &bindings(&ast)).unwrap();
        assert!(text.contains("class ImVec2(ctypes.Structure):\n    x: float\n    y: float\n\n"), "{text}");
        assert!(text.contains("    def Draw(self, label: bytes) -> bool: ..."), "{text}");
    }

    #[test]
    fn test_custom_methods_keep_first_line() {
        let mut ast = ClangAst::new();
        record(&mut ast, CursorKind::StructDecl, "ImVec2");
        let mut header = HeaderBindings::new(&ast, "imgui.h");
        header.wraps.insert(
            "ImVec2".into(),
            WrapFlags::new("ImVec2").with_custom_method("def __iter__(self):\n    yield self.x\n"),
        );
        header
            .declarations
            .push(Declaration::from_cursor(&ast, ast.children(ast.root()).next().unwrap()).unwrap());
        let set = BindingSet {
            native_module: "_impl".into(),
            known: KnownTypes::new(),
            headers: vec![header],
        };
        let text = render(PyiEmitter::new(), &set).unwrap();
        assert!(text.contains("class ImVec2(ctypes.Structure):\n    def __iter__(self): ...\n\n"), "{text}");
        assert!(!text.contains("yield"));
    }

    #[test]
    fn test_function_stub_with_struct_and_unresolved_types() {
        let mut ast = ClangAst::new();
        let v = record(&mut ast, CursorKind::StructDecl, "ImVec2");
        field(&mut ast, v, "x", ClangType::float("float"));
        let root = ast.root();
        let f = ast.push(
            root,
            ClangNode::new(CursorKind::FunctionDecl, "GetItemRectSize")
                .with_result_type(ClangType::record("ImVec2")),
        );
        ast.push(
            f,
            ClangNode::new(CursorKind::ParmDecl, "")
                .with_type(ClangType::new(TypeKind::Unexposed, "std::vector<int>")),
        );

        let mut header = HeaderBindings::new(&ast, "imgui.h");
        header.functions = MethodPolicy::Only(["GetItemRectSize".into()].into_iter().collect());
        for id in ast.children(root) {
            header.declarations.push(Declaration::from_cursor(&ast, id).unwrap());
        }
        let mut known = KnownTypes::new();
        known.add_struct("ImVec2");
        let set = BindingSet {
            native_module: "_impl".into(),
            known,
            headers: vec![header],
        };
        let text = render(PyiEmitter::new(), &set).unwrap();
        assert!(
            text.contains("def GetItemRectSize(arg0: std::vector<int>) -> ImVec2: ..."),
            "{text}"
        );
    }
}
