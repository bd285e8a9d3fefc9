//! Owned snapshot of the Clang AST.
//!
//! libclang cursors are only valid while their translation unit lives, and
//! they link to each other in every direction (parent, definition, referenced
//! declaration). The snapshot copies what the generator needs into an arena
//! and replaces those links with [`NodeId`] indices, so the rest of the
//! pipeline works on plain data that is dropped after one generation pass.

use crate::types::ClangType;
use smol_str::SmolStr;
use std::ops::Index;

/// Index of a node inside a [`ClangAst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A parsed translation unit.
#[derive(Debug)]
pub struct ClangAst {
    nodes: Vec<ClangNode>,
    /// Path of the file that was parsed
    pub main_file: Option<String>,
}

/// Source location for diagnostics and main-file filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    /// Whether the cursor lives in the parsed file rather than an include
    pub in_main_file: bool,
}

/// Cursor kinds the generator looks at. Everything else is kept as
/// [`CursorKind::Other`] with clang's own kind spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorKind {
    TranslationUnit,
    Namespace,
    /// `extern "C" { ... }`
    LinkageSpec,
    StructDecl,
    ClassDecl,
    UnionDecl,
    ClassTemplate,
    EnumDecl,
    EnumConstantDecl,
    FunctionDecl,
    FunctionTemplate,
    CxxMethod,
    Constructor,
    Destructor,
    FieldDecl,
    ParmDecl,
    VarDecl,
    TypedefDecl,
    TypeAliasDecl,
    TemplateTypeParameter,
    TypeRef,
    TemplateRef,
    NamespaceRef,
    /// Implicit casts and other expressions clang does not expose
    UnexposedExpr,
    IntegerLiteral,
    FloatingLiteral,
    BoolLiteral,
    StringLiteral,
    UnaryOperator,
    BinaryOperator,
    CallExpr,
    DeclRefExpr,
    Other(SmolStr),
}

impl CursorKind {
    /// struct, class, union or class template.
    pub fn is_record(&self) -> bool {
        matches!(
            self,
            CursorKind::StructDecl
                | CursorKind::ClassDecl
                | CursorKind::UnionDecl
                | CursorKind::ClassTemplate
        )
    }
}

/// One cursor of the snapshot.
#[derive(Debug, Clone)]
pub struct ClangNode {
    pub kind: CursorKind,
    /// Cursor spelling (declared name for declarations)
    pub spelling: SmolStr,
    /// `clang_getCursorType`
    pub ty: ClangType,
    /// Result type for functions, methods and constructors
    pub result_type: Option<ClangType>,
    /// Aliased type for typedef declarations
    pub underlying_typedef_type: Option<ClangType>,
    /// Raw token spellings of the cursor extent (fields and parameters only)
    pub tokens: Vec<SmolStr>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Authoritative definition (`clang_getCursorDefinition`) for records and enums
    pub definition: Option<NodeId>,
    /// Referenced declaration (`clang_getCursorReferenced`) for type references
    pub referenced: Option<NodeId>,
    pub is_static: bool,
    pub is_const_method: bool,
    pub is_variadic: bool,
    /// Value of an enum constant
    pub enum_value: Option<i64>,
    pub location: SourceLocation,
}

impl ClangNode {
    pub fn new(kind: CursorKind, spelling: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            ty: ClangType::invalid(),
            result_type: None,
            underlying_typedef_type: None,
            tokens: Vec::new(),
            children: Vec::new(),
            parent: None,
            definition: None,
            referenced: None,
            is_static: false,
            is_const_method: false,
            is_variadic: false,
            enum_value: None,
            location: SourceLocation::default(),
        }
    }

    pub fn with_type(mut self, ty: ClangType) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_result_type(mut self, ty: ClangType) -> Self {
        self.result_type = Some(ty);
        self
    }

    pub fn with_underlying_type(mut self, ty: ClangType) -> Self {
        self.underlying_typedef_type = Some(ty);
        self
    }

    pub fn with_tokens(mut self, tokens: &[&str]) -> Self {
        self.tokens = tokens.iter().map(|t| SmolStr::new(t)).collect();
        self
    }

    pub fn with_enum_value(mut self, value: i64) -> Self {
        self.enum_value = Some(value);
        self
    }

    /// Place this cursor in the parsed file rather than an include.
    pub fn in_main_file(mut self) -> Self {
        self.location.in_main_file = true;
        self
    }
}

impl ClangAst {
    /// Create an AST holding only the translation unit root.
    pub fn new() -> Self {
        Self {
            nodes: vec![ClangNode::new(CursorKind::TranslationUnit, "")],
            main_file: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> &ClangNode {
        &self.nodes[id.index()]
    }

    /// Append `node` as the last child of `parent`.
    pub fn push(&mut self, parent: NodeId, mut node: ClangNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Record `definition` as the authoritative definition of `id`.
    pub fn link_definition(&mut self, id: NodeId, definition: NodeId) {
        self.nodes[id.index()].definition = Some(definition);
    }

    /// Record the declaration a reference cursor points at.
    pub fn link_reference(&mut self, id: NodeId, referenced: NodeId) {
        self.nodes[id.index()].referenced = Some(referenced);
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.iter().copied()
    }

    /// Children of `id` whose kind is `kind`, in declaration order.
    pub fn children_of_kind<'a>(
        &'a self,
        id: NodeId,
        kind: &'a CursorKind,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id).filter(move |child| self.node(*child).kind == *kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ClangNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Render the subtree below `id` as an indented outline.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, id, 0);
        out
    }

    fn dump_into(&self, out: &mut String, id: NodeId, depth: usize) {
        let node = self.node(id);
        out.push_str(&format!("{:indent$}{:?} '{}'", "", node.kind, node.spelling, indent = depth * 2));
        if !node.ty.spelling.is_empty() {
            out.push_str(&format!(" : {}", node.ty.spelling));
        }
        if node.location.line > 0 {
            out.push_str(&format!(" @{}", node.location.line));
        }
        out.push('\n');
        for child in self.children(id) {
            self.dump_into(out, child, depth + 1);
        }
    }
}

impl Default for ClangAst {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<NodeId> for ClangAst {
    type Output = ClangNode;

    fn index(&self, id: NodeId) -> &ClangNode {
        self.node(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_links_parent_and_children() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let s = ast.push(root, ClangNode::new(CursorKind::StructDecl, "Foo"));
        let f = ast.push(s, ClangNode::new(CursorKind::FieldDecl, "x"));

        assert_eq!(ast[f].parent, Some(s));
        assert_eq!(ast.children(root).collect::<Vec<_>>(), vec![s]);
        assert_eq!(
            ast.children_of_kind(s, &CursorKind::FieldDecl).count(),
            1
        );
    }

    #[test]
    fn test_dump_outline() {
        let mut ast = ClangAst::new();
        let root = ast.root();
        let s = ast.push(root, ClangNode::new(CursorKind::StructDecl, "Foo"));
        ast.push(
            s,
            ClangNode::new(CursorKind::FieldDecl, "x").with_type(ClangType::int("int")),
        );

        let text = ast.dump(root);
        assert!(text.contains("StructDecl 'Foo'"));
        assert!(text.contains("    FieldDecl 'x' : int"));
    }
}
