//! Declared entities as views over the AST snapshot.
//!
//! A header may declare the same struct several times (forward declarations
//! followed by the definition). All cursors are kept in parse order and the
//! last one is used for emission.

use crate::error::{GenError, Result};
use crate::flags::MethodPolicy;
use crate::typewrap::TypeWrap;
use cybind_clang::{ClangAst, CursorKind, NodeId};
use smol_str::SmolStr;
use tracing::debug;

/// Every cursor that declares one entity, in parse order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeclarations {
    cursors: Vec<NodeId>,
}

impl Redeclarations {
    pub fn new(first: NodeId) -> Self {
        Self {
            cursors: vec![first],
        }
    }

    pub fn push(&mut self, cursor: NodeId) {
        self.cursors.push(cursor);
    }

    /// The authoritative cursor.
    pub fn cursor(&self) -> NodeId {
        // never empty: constructed with one cursor and only grows
        self.cursors[self.cursors.len() - 1]
    }

    pub fn cursors(&self) -> &[NodeId] {
        &self.cursors
    }
}

/// A function, method or constructor cursor.
#[derive(Debug, Clone, Copy)]
pub struct Callable<'a> {
    ast: &'a ClangAst,
    cursor: NodeId,
}

impl<'a> Callable<'a> {
    pub fn new(ast: &'a ClangAst, cursor: NodeId) -> Self {
        Self { ast, cursor }
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn name(&self) -> &'a str {
        &self.ast[self.cursor].spelling
    }

    pub fn params(&self) -> Vec<TypeWrap<'a>> {
        TypeWrap::function_params(self.ast, self.cursor)
    }

    pub fn result(&self) -> TypeWrap<'a> {
        TypeWrap::from_function_result(self.ast, self.cursor)
    }

    pub fn is_static(&self) -> bool {
        self.ast[self.cursor].is_static
    }

    pub fn is_const(&self) -> bool {
        self.ast[self.cursor].is_const_method
    }

    pub fn is_variadic(&self) -> bool {
        self.ast[self.cursor].is_variadic
    }

    /// Whether a parameter or the result is spelled as an excluded type.
    pub fn uses_excluded(&self, excludes: &[SmolStr]) -> bool {
        let excluded = |spelling: &str| excludes.iter().any(|e| e == spelling);
        self.params().iter().any(|p| excluded(&p.ty().spelling))
            || excluded(&self.result().ty().spelling)
    }
}

/// One member of a struct, in declaration order.
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    Field(TypeWrap<'a>),
    Constructor(Callable<'a>),
    Method(Callable<'a>),
}

/// struct, class, union or class template.
#[derive(Debug, Clone)]
pub struct StructDecl<'a> {
    ast: &'a ClangAst,
    cursors: Redeclarations,
}

impl<'a> StructDecl<'a> {
    pub fn new(ast: &'a ClangAst, cursors: Redeclarations) -> Self {
        Self { ast, cursors }
    }

    pub fn cursor(&self) -> NodeId {
        self.cursors.cursor()
    }

    pub fn name(&self) -> &'a str {
        &self.ast[self.cursor()].spelling
    }

    pub fn is_union(&self) -> bool {
        self.ast[self.cursor()].kind == CursorKind::UnionDecl
    }

    pub fn is_template(&self) -> bool {
        self.ast[self.cursor()].kind == CursorKind::ClassTemplate
    }

    /// No definition in the translation unit, or the definition is some other
    /// cursor than the authoritative one.
    pub fn is_forward_declaration(&self) -> bool {
        match self.ast[self.cursor()].definition {
            None => true,
            Some(definition) => definition != self.cursor(),
        }
    }

    pub fn fields(&self) -> Vec<TypeWrap<'a>> {
        TypeWrap::struct_fields(self.ast, self.cursor())
    }

    pub fn constructors(&self) -> Vec<Callable<'a>> {
        self.ast
            .children_of_kind(self.cursor(), &CursorKind::Constructor)
            .map(|c| Callable::new(self.ast, c))
            .collect()
    }

    /// First constructor taking no parameters.
    pub fn default_constructor(&self) -> Option<Callable<'a>> {
        self.constructors().into_iter().find(|c| c.params().is_empty())
    }

    /// The definition declares at least one constructor, even when this
    /// cursor is only a forward declaration.
    pub fn definition_has_constructors(&self) -> bool {
        self.ast[self.cursor()].definition.is_some_and(|definition| {
            self.ast
                .children_of_kind(definition, &CursorKind::Constructor)
                .next()
                .is_some()
        })
    }

    /// Methods selected by `policy`, skipping any whose signature mentions an
    /// excluded type.
    pub fn methods(&self, excludes: &[SmolStr], policy: &MethodPolicy) -> Vec<Callable<'a>> {
        self.ast
            .children(self.cursor())
            .filter(|child| self.method_selected(*child, excludes, policy))
            .map(|child| Callable::new(self.ast, child))
            .collect()
    }

    fn method_selected(&self, child: NodeId, excludes: &[SmolStr], policy: &MethodPolicy) -> bool {
        let node = &self.ast[child];
        if node.kind != CursorKind::CxxMethod {
            return false;
        }
        let method = Callable::new(self.ast, child);
        let excluded = |spelling: &str| excludes.iter().any(|e| e == spelling);
        if method.params().iter().any(|p| excluded(&p.ty().spelling)) {
            debug!(record = self.name(), method = %node.spelling, "parameter type excluded");
            return false;
        }
        if !policy.allows(&node.spelling) {
            return false;
        }
        if excluded(&method.result().ty().spelling) {
            debug!(record = self.name(), method = %node.spelling, "result type excluded");
            return false;
        }
        true
    }

    /// Fields, constructors and the selected methods in declaration order.
    pub fn members(&self, excludes: &[SmolStr], policy: &MethodPolicy) -> Vec<Member<'a>> {
        self.ast
            .children(self.cursor())
            .filter_map(|child| match self.ast[child].kind {
                CursorKind::FieldDecl => Some(Member::Field(TypeWrap::from_struct_field(self.ast, child))),
                CursorKind::Constructor => Some(Member::Constructor(Callable::new(self.ast, child))),
                CursorKind::CxxMethod if self.method_selected(child, excludes, policy) => {
                    Some(Member::Method(Callable::new(self.ast, child)))
                }
                _ => None,
            })
            .collect()
    }
}

/// A free function.
#[derive(Debug, Clone)]
pub struct FunctionDecl<'a> {
    ast: &'a ClangAst,
    cursors: Redeclarations,
}

impl<'a> FunctionDecl<'a> {
    pub fn new(ast: &'a ClangAst, cursors: Redeclarations) -> Self {
        Self { ast, cursors }
    }

    pub fn callable(&self) -> Callable<'a> {
        Callable::new(self.ast, self.cursors.cursor())
    }

    pub fn name(&self) -> &'a str {
        self.callable().name()
    }

    pub fn params(&self) -> Vec<TypeWrap<'a>> {
        self.callable().params()
    }

    pub fn result(&self) -> TypeWrap<'a> {
        self.callable().result()
    }

    pub fn is_variadic(&self) -> bool {
        self.callable().is_variadic()
    }
}

/// One enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub name: SmolStr,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct EnumDecl<'a> {
    ast: &'a ClangAst,
    cursors: Redeclarations,
}

impl<'a> EnumDecl<'a> {
    pub fn new(ast: &'a ClangAst, cursors: Redeclarations) -> Self {
        Self { ast, cursors }
    }

    pub fn name(&self) -> &'a str {
        &self.ast[self.cursors.cursor()].spelling
    }

    pub fn constants(&self) -> Vec<EnumConstant> {
        self.ast
            .children_of_kind(self.cursors.cursor(), &CursorKind::EnumConstantDecl)
            .map(|c| EnumConstant {
                name: self.ast[c].spelling.clone(),
                value: self.ast[c].enum_value.unwrap_or_default(),
            })
            .collect()
    }
}

/// An entity the emitters know how to render.
#[derive(Debug, Clone)]
pub enum Declaration<'a> {
    Struct(StructDecl<'a>),
    Function(FunctionDecl<'a>),
    Enum(EnumDecl<'a>),
}

impl<'a> Declaration<'a> {
    pub fn from_cursor(ast: &'a ClangAst, cursor: NodeId) -> Result<Self> {
        let cursors = Redeclarations::new(cursor);
        let node = &ast[cursor];
        match node.kind {
            ref kind if kind.is_record() => Ok(Declaration::Struct(StructDecl::new(ast, cursors))),
            CursorKind::FunctionDecl => Ok(Declaration::Function(FunctionDecl::new(ast, cursors))),
            CursorKind::EnumDecl => Ok(Declaration::Enum(EnumDecl::new(ast, cursors))),
            ref other => Err(GenError::UnsupportedEntity {
                kind: format!("{:?}", other),
                name: node.spelling.clone(),
            }),
        }
    }

    /// Record a later declaration of the same entity.
    pub fn redeclare(&mut self, cursor: NodeId) {
        self.redeclarations_mut().push(cursor);
    }

    fn redeclarations_mut(&mut self) -> &mut Redeclarations {
        match self {
            Declaration::Struct(s) => &mut s.cursors,
            Declaration::Function(f) => &mut f.cursors,
            Declaration::Enum(e) => &mut e.cursors,
        }
    }

    pub fn redeclarations(&self) -> &Redeclarations {
        match self {
            Declaration::Struct(s) => &s.cursors,
            Declaration::Function(f) => &f.cursors,
            Declaration::Enum(e) => &e.cursors,
        }
    }

    pub fn cursor(&self) -> NodeId {
        self.redeclarations().cursor()
    }

    pub fn name(&self) -> &'a str {
        match self {
            Declaration::Struct(s) => s.name(),
            Declaration::Function(f) => f.name(),
            Declaration::Enum(e) => e.name(),
        }
    }

    /// Enclosing namespaces joined with `::`, empty at global scope.
    pub fn namespace(&self, ast: &ClangAst) -> String {
        namespace_of(ast, self.cursor())
    }
}

/// Enclosing C++ namespaces of `cursor`, outermost first, joined with `::`.
pub fn namespace_of(ast: &ClangAst, cursor: NodeId) -> String {
    let mut names = Vec::new();
    let mut current = ast[cursor].parent;
    while let Some(parent) = current {
        if ast[parent].kind == CursorKind::Namespace {
            names.push(ast[parent].spelling.as_str());
        }
        current = ast[parent].parent;
    }
    names.reverse();
    names.join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cybind_clang::{ClangNode, ClangType};

    fn method(ast: &mut ClangAst, record: NodeId, name: &str, param: Option<ClangType>, result: ClangType) -> NodeId {
        let m = ast.push(
            record,
            ClangNode::new(CursorKind::CxxMethod, name).with_result_type(result),
        );
        if let Some(ty) = param {
            ast.push(m, ClangNode::new(CursorKind::ParmDecl, "arg").with_type(ty));
        }
        m
    }

    fn sample_struct(ast: &mut ClangAst) -> NodeId {
        let root = ast.root();
        let s = ast.push(root, ClangNode::new(CursorKind::StructDecl, "ImDrawList").in_main_file());
        ast.link_definition(s, s);
        ast.push(
            s,
            ClangNode::new(CursorKind::FieldDecl, "Flags").with_type(ClangType::int("int")),
        );
        ast.push(s, ClangNode::new(CursorKind::Constructor, "ImDrawList"));
        let c = ast.push(s, ClangNode::new(CursorKind::Constructor, "ImDrawList"));
        ast.push(c, ClangNode::new(CursorKind::ParmDecl, "shared").with_type(ClangType::int("int")));
        method(ast, s, "AddLine", Some(ClangType::float("float")), ClangType::void());
        method(ast, s, "AddText", Some(ClangType::typedef("va_list")), ClangType::void());
        method(ast, s, "GetBuf", None, ClangType::typedef("ImGuiTextBuffer"));
        s
    }

    #[test]
    fn test_method_policy_and_excludes() {
        let mut ast = ClangAst::new();
        let s = sample_struct(&mut ast);
        let decl = StructDecl::new(&ast, Redeclarations::new(s));
        let excludes = [SmolStr::new("va_list"), SmolStr::new("ImGuiTextBuffer")];

        let all: Vec<_> = decl
            .methods(&excludes, &MethodPolicy::All)
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(all, vec!["AddLine"]);

        assert!(decl.methods(&excludes, &MethodPolicy::None).is_empty());

        let only = MethodPolicy::Only(["GetBuf".into()].into_iter().collect());
        assert!(decl.methods(&excludes, &only).is_empty());
        assert_eq!(decl.methods(&[], &only).len(), 1);
    }

    #[test]
    fn test_constructors() {
        let mut ast = ClangAst::new();
        let s = sample_struct(&mut ast);
        let decl = StructDecl::new(&ast, Redeclarations::new(s));
        assert_eq!(decl.constructors().len(), 2);
        let default = decl.default_constructor().unwrap();
        assert!(default.params().is_empty());
        assert!(decl.definition_has_constructors());
    }

    #[test]
    fn test_members_in_declaration_order() {
        let mut ast = ClangAst::new();
        let s = sample_struct(&mut ast);
        let decl = StructDecl::new(&ast, Redeclarations::new(s));
        let kinds: Vec<&str> = decl
            .members(&[], &MethodPolicy::All)
            .iter()
            .map(|m| match m {
                Member::Field(_) => "field",
                Member::Constructor(_) => "ctor",
                Member::Method(_) => "method",
            })
            .collect();
        assert_eq!(kinds, vec!["field", "ctor", "ctor", "method", "method", "method"]);
    }

    #[test]
    fn test_forward_declaration() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let fwd = ast.push(root, ClangNode::new(CursorKind::StructDecl, "ImFont"));
        let def = ast.push(root, ClangNode::new(CursorKind::StructDecl, "ImFont").in_main_file());
        ast.link_definition(fwd, def);
        ast.link_definition(def, def);
        let only_fwd = ast.push(root, ClangNode::new(CursorKind::StructDecl, "ImGuiContext"));

        let mut decl = Declaration::from_cursor(&ast, fwd).unwrap();
        match &decl {
            Declaration::Struct(s) => assert!(s.is_forward_declaration()),
            other => panic!("expected struct, got {:?}", other),
        }
        decl.redeclare(def);
        match &decl {
            Declaration::Struct(s) => assert!(!s.is_forward_declaration()),
            other => panic!("expected struct, got {:?}", other),
        }
        assert_eq!(decl.redeclarations().cursors(), &[fwd, def]);

        let Declaration::Struct(s) = Declaration::from_cursor(&ast, only_fwd).unwrap() else {
            panic!("expected struct");
        };
        assert!(s.is_forward_declaration());
    }

    #[test]
    fn test_unsupported_entity() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let var = ast.push(root, ClangNode::new(CursorKind::VarDecl, "GImGui"));
        let err = Declaration::from_cursor(&ast, var).unwrap_err();
        assert!(matches!(err, GenError::UnsupportedEntity { ref name, .. } if name == "GImGui"));
    }

    #[test]
    fn test_enum_constants_and_namespace() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let ns = ast.push(root, ClangNode::new(CursorKind::Namespace, "ImGuizmo"));
        let e = ast.push(ns, ClangNode::new(CursorKind::EnumDecl, "OPERATION"));
        ast.push(e, ClangNode::new(CursorKind::EnumConstantDecl, "TRANSLATE_X").with_enum_value(1));
        ast.push(e, ClangNode::new(CursorKind::EnumConstantDecl, "TRANSLATE_Y").with_enum_value(2));

        let decl = Declaration::from_cursor(&ast, e).unwrap();
        assert_eq!(decl.namespace(&ast), "ImGuizmo");
        let Declaration::Enum(e) = decl else { panic!("expected enum") };
        assert_eq!(
            e.constants(),
            vec![
                EnumConstant { name: "TRANSLATE_X".into(), value: 1 },
                EnumConstant { name: "TRANSLATE_Y".into(), value: 2 },
            ]
        );
    }
}
