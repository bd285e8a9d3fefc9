//! One type-use site (field, parameter or function result) and everything
//! derived from it.

use crate::error::{GenError, Result};
use crate::literal;
use crate::registry::{HostType, KnownTypes, TypeRegistry};
use cybind_clang::{ClangAst, ClangType, CursorKind, NodeId, TypeKind};
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Python keywords plus builtins that collide with common C member names.
const PYTHON_RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break",
    "class", "continue", "def", "del", "elif", "else", "except", "finally",
    "for", "from", "global", "id", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with",
    "yield",
];

/// Prefix a leading underscore to names Python cannot bind.
pub fn escape_identifier(name: &str) -> Cow<'_, str> {
    if PYTHON_RESERVED.contains(&name) {
        Cow::Owned(format!("_{}", name))
    } else {
        Cow::Borrowed(name)
    }
}

/// Rewrite C++ template arguments into Cython's bracket syntax:
/// `ImVector<ImDrawCmd>` becomes `ImVector[ImDrawCmd]`.
pub fn template_filter(spelling: &str) -> String {
    spelling
        .chars()
        .map(|c| match c {
            '<' => '[',
            '>' => ']',
            c => c,
        })
        .collect()
}

fn invalid_type() -> &'static ClangType {
    static INVALID: OnceLock<ClangType> = OnceLock::new();
    INVALID.get_or_init(ClangType::invalid)
}

/// A type paired with the cursor that introduced it.
#[derive(Debug, Clone, Copy)]
pub struct TypeWrap<'a> {
    ast: &'a ClangAst,
    ty: &'a ClangType,
    cursor: NodeId,
}

impl<'a> TypeWrap<'a> {
    pub fn new(ast: &'a ClangAst, ty: &'a ClangType, cursor: NodeId) -> Self {
        Self { ast, ty, cursor }
    }

    pub fn from_function_result(ast: &'a ClangAst, cursor: NodeId) -> Self {
        let ty = ast[cursor].result_type.as_ref().unwrap_or_else(|| invalid_type());
        Self::new(ast, ty, cursor)
    }

    pub fn from_function_param(ast: &'a ClangAst, cursor: NodeId) -> Self {
        Self::new(ast, &ast[cursor].ty, cursor)
    }

    pub fn from_struct_field(ast: &'a ClangAst, cursor: NodeId) -> Self {
        Self::new(ast, &ast[cursor].ty, cursor)
    }

    /// Parameters of a function, method or constructor in order.
    pub fn function_params(ast: &'a ClangAst, cursor: NodeId) -> Vec<Self> {
        ast.children_of_kind(cursor, &CursorKind::ParmDecl)
            .map(|param| Self::from_function_param(ast, param))
            .collect()
    }

    /// Fields of a record in declaration order.
    pub fn struct_fields(ast: &'a ClangAst, cursor: NodeId) -> Vec<Self> {
        ast.children_of_kind(cursor, &CursorKind::FieldDecl)
            .map(|field| Self::from_struct_field(ast, field))
            .collect()
    }

    fn with_type(&self, ty: &'a ClangType) -> Self {
        Self::new(self.ast, ty, self.cursor)
    }

    pub fn ty(&self) -> &'a ClangType {
        self.ty
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    /// Declared name as written.
    pub fn raw_name(&self) -> &'a str {
        &self.ast[self.cursor].spelling
    }

    /// Declared name, escaped for Python.
    pub fn name(&self) -> Cow<'a, str> {
        escape_identifier(self.raw_name())
    }

    pub fn is_void(&self) -> bool {
        self.ty.kind == TypeKind::Void
    }

    /// Const itself, or a pointer/reference to const.
    pub fn is_const(&self) -> bool {
        if self.ty.is_const {
            return true;
        }
        match self.ty.kind {
            TypeKind::Pointer | TypeKind::LValueReference => {
                self.ty.pointee().is_some_and(|pointee| pointee.is_const)
            }
            _ => false,
        }
    }

    /// Spelling for a Cython declaration. Arrays decay to pointers.
    pub fn c_type(&self) -> String {
        c_type_of(self.ty)
    }

    /// `c_type` with the declared name attached, as a pxd field or parameter.
    pub fn c_type_with_name(&self) -> String {
        let name = self.name();
        if self.ty.kind == TypeKind::ConstantArray {
            let mut dims = String::new();
            let mut ty = self.ty;
            while let (TypeKind::ConstantArray, Some(element), Some(len)) =
                (ty.kind, ty.element(), ty.array_size)
            {
                dims.push_str(&format!("[{}]", len));
                ty = element;
            }
            return format!("{} {}{}", c_type_of(ty), name, dims);
        }

        let c_type = self.c_type();
        match c_type.split_once("(*)") {
            Some((head, tail)) => format!("{}(*{}){}", head, name, tail),
            None => format!("{} {}", c_type, name),
        }
    }

    /// One step along a typedef chain, or `None` when this type is not an
    /// alias, is `size_t` (kept opaque) or names a typedef outside the
    /// snapshot.
    pub fn typedef_underlying(&self) -> Result<Option<TypeWrap<'a>>> {
        if self.ty.spelling == "size_t" || self.ty.kind != TypeKind::Typedef {
            return Ok(None);
        }

        let node = &self.ast[self.cursor];
        let type_ref = self
            .ast
            .children_of_kind(self.cursor, &CursorKind::TypeRef)
            .next()
            .ok_or_else(|| GenError::MissingTypeRef {
                cursor: node.spelling.clone(),
                spelling: self.ty.spelling.clone(),
            })?;

        // Builtin typedefs such as `__builtin_va_list` never reach the snapshot.
        let Some((target, underlying)) = self.ast[type_ref].referenced.and_then(|target| {
            self.ast[target]
                .underlying_typedef_type
                .as_ref()
                .map(|underlying| (target, underlying))
        }) else {
            warn!(
                cursor = %node.spelling,
                spelling = %self.ast[type_ref].spelling,
                "typedef target not in translation unit, keeping spelling"
            );
            return Ok(None);
        };

        Ok(Some(TypeWrap::new(self.ast, underlying, target)))
    }

    /// Spelling with typedefs resolved through pointers and arrays.
    ///
    /// `ImVec2 *` stays as is, `ImU32 [4]` becomes `unsigned int [4]`.
    /// Function pointer aliases keep the spelling of the use site.
    pub fn underlying_spelling(&self) -> Result<String> {
        match self.ty.kind {
            TypeKind::ConstantArray => {
                if let (Some(element), Some(len)) = (self.ty.element(), self.ty.array_size) {
                    let inner = self.with_type(element).underlying_spelling()?;
                    return Ok(format!("{} [{}]", inner, len));
                }
            }
            TypeKind::Pointer => {
                if let Some(pointee) = self.ty.pointee() {
                    let inner = self.with_type(pointee).underlying_spelling()?;
                    return Ok(if inner.ends_with('*') {
                        format!("{}*", inner)
                    } else {
                        format!("{} *", inner)
                    });
                }
            }
            _ => {}
        }

        let mut current = *self;
        while let Some(next) = current.typedef_underlying()? {
            current = next;
        }
        let value = &current.ty.spelling;
        if value.contains("(*)") {
            return Ok(self.ast[self.cursor].ty.spelling.to_string());
        }
        Ok(value.to_string())
    }

    /// Default argument or member initializer translated to Python.
    pub fn default_value(&self) -> Option<String> {
        let node = &self.ast[self.cursor];
        let mut has_initializer = false;
        for child in self.ast.children(self.cursor) {
            match &self.ast[child].kind {
                CursorKind::UnexposedExpr
                | CursorKind::IntegerLiteral
                | CursorKind::FloatingLiteral
                | CursorKind::BoolLiteral
                | CursorKind::UnaryOperator
                | CursorKind::CallExpr => has_initializer = true,
                CursorKind::TypeRef | CursorKind::TemplateRef | CursorKind::NamespaceRef => {}
                other => debug!(cursor = %node.spelling, kind = ?other, "ignored initializer child"),
            }
        }
        if !has_initializer {
            return None;
        }

        let equal = node.tokens.iter().position(|t| t == "=")?;
        let tokens = trim_trailing(&node.tokens[equal + 1..]);
        if tokens.is_empty() {
            return None;
        }
        Some(literal::translate_tokens(tokens.iter().map(|t| t.as_str())))
    }

    pub fn host_type(&self, registry: &TypeRegistry, known: &KnownTypes) -> Result<HostType> {
        Ok(registry.classify(&self.underlying_spelling()?, known))
    }
}

fn c_type_of(ty: &ClangType) -> String {
    if ty.spelling == "std::string" {
        return "string".to_string();
    }
    match (ty.kind, ty.element()) {
        (TypeKind::ConstantArray | TypeKind::IncompleteArray, Some(element)) => {
            let inner = c_type_of(element);
            if inner.ends_with('*') {
                format!("{}*", inner)
            } else {
                format!("{} *", inner)
            }
        }
        _ => template_filter(&ty.spelling).replace("[]", "*"),
    }
}

/// A parameter's extent can run into the next `,` or the closing `)`.
fn trim_trailing<T: AsRef<str>>(mut tokens: &[T]) -> &[T] {
    while let Some((last, rest)) = tokens.split_last() {
        let last = last.as_ref();
        let unbalanced_paren = last == ")" && {
            let opens = rest.iter().filter(|t| t.as_ref() == "(").count();
            let closes = rest.iter().filter(|t| t.as_ref() == ")").count();
            closes >= opens
        };
        if last == "," || last == ";" || unbalanced_paren {
            tokens = rest;
        } else {
            break;
        }
    }
    tokens
}
