//! ctypes binding module.
//!
//! Structs become `ctypes.Structure` subclasses (unions `ctypes.Union`) so
//! Python code can share memory with the native side. Methods and free
//! functions are thin trampolines into the native extension module.

use super::{ctypes_base, param_name, BindingSet, CodeWriter, EmitContext, Emitter, HostTypes, MemberSelection};
use crate::decl::{Callable, EnumDecl, FunctionDecl, StructDecl};
use crate::error::Result;
use crate::typewrap::escape_identifier;
use tracing::debug;

pub struct PyxEmitter {
    out: CodeWriter,
    types: HostTypes,
}

impl PyxEmitter {
    pub fn new() -> Self {
        Self {
            out: CodeWriter::new(),
            types: HostTypes::default(),
        }
    }

    /// `(signature, call arguments)` for a trampoline.
    fn arguments(callable: &Callable<'_>) -> (Vec<String>, Vec<String>) {
        let mut signature = Vec::new();
        let mut call = Vec::new();
        for (i, param) in callable.params().iter().enumerate() {
            let name = param_name(param, i);
            match param.default_value() {
                Some(value) => signature.push(format!("{}={}", name, value)),
                None => signature.push(name.clone()),
            }
            call.push(name);
        }
        (signature, call)
    }

    fn trampoline(&mut self, def: &str, callable: &Callable<'_>, target: &str, receiver: Option<&str>) {
        let (mut signature, mut call) = Self::arguments(callable);
        if let Some(receiver) = receiver {
            signature.insert(0, "self".to_string());
            call.insert(0, receiver.to_string());
        }
        self.out.writeln(&format!("def {}({}):", def, signature.join(", ")));
        self.out.indent();
        let invoke = format!("{}({})", target, call.join(", "));
        if callable.result().is_void() {
            self.out.writeln(&invoke);
        } else {
            self.out.writeln(&format!("return {}", invoke));
        }
        self.out.dedent();
        self.out.blank();
    }

    fn opaque(&mut self, decl: &StructDecl<'_>) {
        self.out.writeln(&format!("class {}({}):", decl.name(), ctypes_base(decl)));
        self.out.indent();
        self.out.writeln("pass");
        self.out.dedent();
        self.out.blank();
    }
}

impl Default for PyxEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for PyxEmitter {
    fn prologue(&mut self, set: &BindingSet<'_>) {
        self.out.writeln("import ctypes");
        self.out.writeln("from enum import IntEnum");
        self.out.writeln(&format!("from . import {} as _impl", set.native_module));
        self.out.blank();
        self.out.blank();
    }

    fn emit_struct(&mut self, cx: &EmitContext<'_, '_>, decl: &StructDecl<'_>) -> Result<()> {
        if decl.is_forward_declaration() || decl.is_template() {
            self.opaque(decl);
            return Ok(());
        }

        let flags = cx.header.flags_for(decl.name());
        let selection = MemberSelection::new(decl, &flags, &cx.header.excludes);
        self.out.writeln(&format!("class {}({}):", decl.name(), ctypes_base(decl)));
        self.out.indent();

        if !selection.fields.is_empty() {
            self.out.writeln("_fields_=[");
            self.out.indent();
            for field in &selection.fields {
                let host = self.types.resolve(cx, field)?;
                self.out.writeln(&format!("(\"{}\", {}),", field.name(), host.ctypes_type()));
            }
            self.out.dedent();
            self.out.writeln("]");
            self.out.blank();
        }

        for method in &selection.methods {
            let target = format!("_impl.{}_{}", decl.name(), method.name());
            if method.is_static() {
                self.out.writeln("@staticmethod");
                self.trampoline(&escape_identifier(method.name()), method, &target, None);
            } else {
                self.trampoline(
                    &escape_identifier(method.name()),
                    method,
                    &target,
                    Some("ctypes.addressof(self)"),
                );
            }
        }

        for code in &selection.custom_methods {
            for line in code.lines() {
                self.out.writeln(line);
            }
            self.out.blank();
        }

        if selection.is_empty() {
            self.out.writeln("pass");
            self.out.blank();
        }
        self.out.dedent();
        Ok(())
    }

    fn emit_function(&mut self, cx: &EmitContext<'_, '_>, decl: &FunctionDecl<'_>) -> Result<()> {
        if decl.is_variadic() {
            debug!(function = decl.name(), "variadic function has no trampoline");
            return Ok(());
        }
        let name = format!("{}{}", cx.header.prefix, decl.name());
        let target = format!("_impl.{}", name);
        self.trampoline(&escape_identifier(&name), &decl.callable(), &target, None);
        Ok(())
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
