//! Header parsing using libclang.

use crate::ast::{ClangAst, ClangNode, CursorKind, NodeId, SourceLocation};
use crate::types::{ClangType, TypeKind};
use miette::{miette, Result};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_uint};
use std::path::Path;
use std::ptr;

/// Parser that uses libclang to parse C/C++ headers.
pub struct ClangParser {
    index: clang_sys::CXIndex,
    args: Vec<String>,
}

impl ClangParser {
    /// Create a new Clang parser, loading libclang if this thread has not yet.
    pub fn new() -> Result<Self> {
        if !clang_sys::is_loaded() {
            clang_sys::load().map_err(|e| miette!("Failed to load libclang: {}", e))?;
        }
        unsafe {
            let index = clang_sys::clang_createIndex(0, 0);
            if index.is_null() {
                return Err(miette!("Failed to create clang index"));
            }
            Ok(Self {
                index,
                args: vec!["-x".into(), "c++".into(), "-std=c++17".into()],
            })
        }
    }

    /// Append extra compiler arguments (`-I`, `-D`, `-std=...`).
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Parse a header file into an AST snapshot.
    pub fn parse_file(&self, path: &Path) -> Result<ClangAst> {
        let path_str = path.to_string_lossy();
        let c_path = CString::new(path_str.as_ref())
            .map_err(|_| miette!("Invalid path: {}", path_str))?;
        self.parse(&c_path, None)
    }

    /// Parse header source held in memory.
    pub fn parse_string(&self, source: &str, filename: &str) -> Result<ClangAst> {
        let c_filename =
            CString::new(filename).map_err(|_| miette!("Invalid file name: {}", filename))?;
        let c_source =
            CString::new(source).map_err(|_| miette!("Source contains a NUL byte"))?;

        let unsaved_file = clang_sys::CXUnsavedFile {
            Filename: c_filename.as_ptr(),
            Contents: c_source.as_ptr(),
            Length: source.len() as _,
        };
        self.parse(&c_filename, Some(unsaved_file))
    }

    fn parse(
        &self,
        c_path: &CStr,
        unsaved: Option<clang_sys::CXUnsavedFile>,
    ) -> Result<ClangAst> {
        let path_str = c_path.to_string_lossy().into_owned();
        let args = self
            .args
            .iter()
            .map(|a| CString::new(a.as_str()).map_err(|_| miette!("Invalid argument: {}", a)))
            .collect::<Result<Vec<_>>>()?;
        let c_args: Vec<*const c_char> = args.iter().map(|s| s.as_ptr()).collect();

        let mut unsaved_files: Vec<clang_sys::CXUnsavedFile> = unsaved.into_iter().collect();

        unsafe {
            let tu = clang_sys::clang_parseTranslationUnit(
                self.index,
                c_path.as_ptr(),
                c_args.as_ptr(),
                c_args.len() as i32,
                if unsaved_files.is_empty() {
                    ptr::null_mut()
                } else {
                    unsaved_files.as_mut_ptr()
                },
                unsaved_files.len() as c_uint,
                clang_sys::CXTranslationUnit_SkipFunctionBodies,
            );

            if tu.is_null() {
                return Err(miette!("Failed to parse file: {}", path_str));
            }

            if let Err(e) = check_diagnostics(tu) {
                clang_sys::clang_disposeTranslationUnit(tu);
                return Err(e);
            }

            let mut converter = Converter::new(tu);
            let root = converter.ast.root();
            let cursor = clang_sys::clang_getTranslationUnitCursor(tu);
            converter.remember(cursor, root);
            for child in child_cursors(cursor) {
                converter.convert(child, root);
            }
            let mut ast = converter.finish();
            ast.main_file = Some(path_str);

            clang_sys::clang_disposeTranslationUnit(tu);

            tracing::debug!(
                "snapshot of {} holds {} nodes",
                ast.main_file.as_deref().unwrap_or_default(),
                ast.len()
            );
            Ok(ast)
        }
    }
}

impl Drop for ClangParser {
    fn drop(&mut self) {
        unsafe {
            clang_sys::clang_disposeIndex(self.index);
        }
    }
}

/// Fail on error diagnostics, log the rest.
unsafe fn check_diagnostics(tu: clang_sys::CXTranslationUnit) -> Result<()> {
    let num_diagnostics = clang_sys::clang_getNumDiagnostics(tu);
    for i in 0..num_diagnostics {
        let diag = clang_sys::clang_getDiagnostic(tu, i);
        let severity = clang_sys::clang_getDiagnosticSeverity(diag);
        let msg = cx_string_to_string(clang_sys::clang_formatDiagnostic(
            diag,
            clang_sys::clang_defaultDiagnosticDisplayOptions(),
        ));
        clang_sys::clang_disposeDiagnostic(diag);

        if severity >= clang_sys::CXDiagnostic_Error {
            return Err(miette!("Clang error: {}", msg));
        }
        if severity == clang_sys::CXDiagnostic_Warning {
            tracing::warn!("{}", msg);
        }
    }
    Ok(())
}

/// Walks the cursor tree and fills the arena.
struct Converter {
    tu: clang_sys::CXTranslationUnit,
    ast: ClangAst,
    /// Cursors already converted, bucketed by `clang_hashCursor`
    seen: FxHashMap<c_uint, Vec<(clang_sys::CXCursor, NodeId)>>,
    pending_definitions: Vec<(NodeId, clang_sys::CXCursor)>,
    pending_references: Vec<(NodeId, clang_sys::CXCursor)>,
}

impl Converter {
    fn new(tu: clang_sys::CXTranslationUnit) -> Self {
        Self {
            tu,
            ast: ClangAst::new(),
            seen: FxHashMap::default(),
            pending_definitions: Vec::new(),
            pending_references: Vec::new(),
        }
    }

    unsafe fn convert(&mut self, cursor: clang_sys::CXCursor, parent: NodeId) {
        let kind = clang_sys::clang_getCursorKind(cursor);
        // Bodies carry nothing the bindings need.
        if kind == clang_sys::CXCursor_CompoundStmt {
            return;
        }

        let node = self.snapshot(cursor, kind);
        let id = self.ast.push(parent, node);
        self.remember(cursor, id);

        match kind {
            clang_sys::CXCursor_StructDecl
            | clang_sys::CXCursor_ClassDecl
            | clang_sys::CXCursor_UnionDecl
            | clang_sys::CXCursor_ClassTemplate
            | clang_sys::CXCursor_EnumDecl => {
                let definition = clang_sys::clang_getCursorDefinition(cursor);
                if clang_sys::clang_Cursor_isNull(definition) == 0 {
                    self.pending_definitions.push((id, definition));
                }
            }
            clang_sys::CXCursor_TypeRef => {
                let referenced = clang_sys::clang_getCursorReferenced(cursor);
                if clang_sys::clang_Cursor_isNull(referenced) == 0 {
                    self.pending_references.push((id, referenced));
                }
            }
            _ => {}
        }

        for child in child_cursors(cursor) {
            self.convert(child, id);
        }
    }

    fn remember(&mut self, cursor: clang_sys::CXCursor, id: NodeId) {
        let hash = unsafe { clang_sys::clang_hashCursor(cursor) };
        self.seen.entry(hash).or_default().push((cursor, id));
    }

    fn lookup(&self, cursor: clang_sys::CXCursor) -> Option<NodeId> {
        let hash = unsafe { clang_sys::clang_hashCursor(cursor) };
        self.seen.get(&hash)?.iter().find_map(|(seen, id)| {
            let equal = unsafe { clang_sys::clang_equalCursors(*seen, cursor) } != 0;
            equal.then_some(*id)
        })
    }

    /// Resolve cross links now that every cursor has a node.
    fn finish(mut self) -> ClangAst {
        let definitions = std::mem::take(&mut self.pending_definitions);
        for (id, cursor) in definitions {
            if let Some(definition) = self.lookup(cursor) {
                self.ast.link_definition(id, definition);
            }
        }
        let references = std::mem::take(&mut self.pending_references);
        for (id, cursor) in references {
            if let Some(referenced) = self.lookup(cursor) {
                self.ast.link_reference(id, referenced);
            }
        }
        self.ast
    }

    unsafe fn snapshot(
        &self,
        cursor: clang_sys::CXCursor,
        kind: clang_sys::CXCursorKind,
    ) -> ClangNode {
        let mut node = ClangNode::new(convert_cursor_kind(kind), cursor_spelling(cursor));
        node.ty = convert_type(clang_sys::clang_getCursorType(cursor));
        node.location = get_location(cursor);

        match kind {
            clang_sys::CXCursor_FunctionDecl
            | clang_sys::CXCursor_FunctionTemplate
            | clang_sys::CXCursor_CXXMethod
            | clang_sys::CXCursor_Constructor
            | clang_sys::CXCursor_Destructor => {
                node.result_type = Some(convert_type(clang_sys::clang_getCursorResultType(cursor)));
                node.is_variadic = clang_sys::clang_Cursor_isVariadic(cursor) != 0;
                if kind == clang_sys::CXCursor_CXXMethod {
                    node.is_static = clang_sys::clang_CXXMethod_isStatic(cursor) != 0;
                    node.is_const_method = clang_sys::clang_CXXMethod_isConst(cursor) != 0;
                }
            }
            clang_sys::CXCursor_TypedefDecl | clang_sys::CXCursor_TypeAliasDecl => {
                node.underlying_typedef_type = Some(convert_type(
                    clang_sys::clang_getTypedefDeclUnderlyingType(cursor),
                ));
            }
            clang_sys::CXCursor_FieldDecl | clang_sys::CXCursor_ParmDecl => {
                // Only default values in the parsed header are ever rendered.
                if node.location.in_main_file {
                    node.tokens = self.tokens(cursor);
                }
            }
            clang_sys::CXCursor_EnumConstantDecl => {
                node.enum_value = Some(clang_sys::clang_getEnumConstantDeclValue(cursor));
            }
            _ => {}
        }
        node
    }

    unsafe fn tokens(&self, cursor: clang_sys::CXCursor) -> Vec<SmolStr> {
        let extent = clang_sys::clang_getCursorExtent(cursor);
        let mut tokens: *mut clang_sys::CXToken = ptr::null_mut();
        let mut count: c_uint = 0;
        clang_sys::clang_tokenize(self.tu, extent, &mut tokens, &mut count);
        if tokens.is_null() {
            return Vec::new();
        }

        let spellings = (0..count as usize)
            .map(|i| {
                let spelling = clang_sys::clang_getTokenSpelling(self.tu, *tokens.add(i));
                SmolStr::new(cx_string_to_string(spelling))
            })
            .collect();
        clang_sys::clang_disposeTokens(self.tu, tokens, count);
        spellings
    }
}

/// Collect the direct children of a cursor.
fn child_cursors(cursor: clang_sys::CXCursor) -> Vec<clang_sys::CXCursor> {
    extern "C" fn visitor(
        child: clang_sys::CXCursor,
        _parent: clang_sys::CXCursor,
        data: clang_sys::CXClientData,
    ) -> clang_sys::CXChildVisitResult {
        unsafe {
            if clang_sys::clang_Cursor_isNull(child) != 0 {
                return clang_sys::CXChildVisit_Continue;
            }
            let children = &mut *(data as *mut Vec<clang_sys::CXCursor>);
            children.push(child);
        }
        clang_sys::CXChildVisit_Continue
    }

    let mut children: Vec<clang_sys::CXCursor> = Vec::new();
    unsafe {
        clang_sys::clang_visitChildren(
            cursor,
            visitor,
            &mut children as *mut Vec<clang_sys::CXCursor> as clang_sys::CXClientData,
        );
    }
    children
}

fn convert_cursor_kind(kind: clang_sys::CXCursorKind) -> CursorKind {
    match kind {
        clang_sys::CXCursor_TranslationUnit => CursorKind::TranslationUnit,
        clang_sys::CXCursor_Namespace => CursorKind::Namespace,
        clang_sys::CXCursor_LinkageSpec => CursorKind::LinkageSpec,
        clang_sys::CXCursor_StructDecl => CursorKind::StructDecl,
        clang_sys::CXCursor_ClassDecl => CursorKind::ClassDecl,
        clang_sys::CXCursor_UnionDecl => CursorKind::UnionDecl,
        clang_sys::CXCursor_ClassTemplate => CursorKind::ClassTemplate,
        clang_sys::CXCursor_EnumDecl => CursorKind::EnumDecl,
        clang_sys::CXCursor_EnumConstantDecl => CursorKind::EnumConstantDecl,
        clang_sys::CXCursor_FunctionDecl => CursorKind::FunctionDecl,
        clang_sys::CXCursor_FunctionTemplate => CursorKind::FunctionTemplate,
        clang_sys::CXCursor_CXXMethod => CursorKind::CxxMethod,
        clang_sys::CXCursor_Constructor => CursorKind::Constructor,
        clang_sys::CXCursor_Destructor => CursorKind::Destructor,
        clang_sys::CXCursor_FieldDecl => CursorKind::FieldDecl,
        clang_sys::CXCursor_ParmDecl => CursorKind::ParmDecl,
        clang_sys::CXCursor_VarDecl => CursorKind::VarDecl,
        clang_sys::CXCursor_TypedefDecl => CursorKind::TypedefDecl,
        clang_sys::CXCursor_TypeAliasDecl => CursorKind::TypeAliasDecl,
        clang_sys::CXCursor_TemplateTypeParameter => CursorKind::TemplateTypeParameter,
        clang_sys::CXCursor_TypeRef => CursorKind::TypeRef,
        clang_sys::CXCursor_TemplateRef => CursorKind::TemplateRef,
        clang_sys::CXCursor_NamespaceRef => CursorKind::NamespaceRef,
        clang_sys::CXCursor_UnexposedExpr => CursorKind::UnexposedExpr,
        clang_sys::CXCursor_IntegerLiteral => CursorKind::IntegerLiteral,
        clang_sys::CXCursor_FloatingLiteral => CursorKind::FloatingLiteral,
        clang_sys::CXCursor_CXXBoolLiteralExpr => CursorKind::BoolLiteral,
        clang_sys::CXCursor_StringLiteral => CursorKind::StringLiteral,
        clang_sys::CXCursor_UnaryOperator => CursorKind::UnaryOperator,
        clang_sys::CXCursor_BinaryOperator => CursorKind::BinaryOperator,
        clang_sys::CXCursor_CallExpr => CursorKind::CallExpr,
        clang_sys::CXCursor_DeclRefExpr => CursorKind::DeclRefExpr,
        _ => unsafe {
            let spelling = clang_sys::clang_getCursorKindSpelling(kind);
            CursorKind::Other(cx_string_to_string(spelling).into())
        },
    }
}

/// Convert a Clang type to our snapshot.
fn convert_type(ty: clang_sys::CXType) -> ClangType {
    unsafe {
        let spelling = cx_string_to_string(clang_sys::clang_getTypeSpelling(ty));
        let is_const = clang_sys::clang_isConstQualifiedType(ty) != 0;

        let mut converted = match ty.kind {
            clang_sys::CXType_Elaborated => {
                // `struct Foo` / `ns::Foo` / typedef names written in C++
                let mut named = convert_type(clang_sys::clang_Type_getNamedType(ty));
                named.spelling = SmolStr::new(&spelling);
                named
            }
            clang_sys::CXType_Pointer
            | clang_sys::CXType_LValueReference
            | clang_sys::CXType_RValueReference => {
                let kind = match ty.kind {
                    clang_sys::CXType_Pointer => TypeKind::Pointer,
                    clang_sys::CXType_LValueReference => TypeKind::LValueReference,
                    _ => TypeKind::RValueReference,
                };
                let pointee = convert_type(clang_sys::clang_getPointeeType(ty));
                ClangType {
                    pointee: Some(Box::new(pointee)),
                    ..ClangType::new(kind, spelling.as_str())
                }
            }
            clang_sys::CXType_ConstantArray | clang_sys::CXType_IncompleteArray => {
                let element = convert_type(clang_sys::clang_getArrayElementType(ty));
                let (kind, array_size) = if ty.kind == clang_sys::CXType_ConstantArray {
                    let size = clang_sys::clang_getArraySize(ty);
                    (TypeKind::ConstantArray, u64::try_from(size).ok())
                } else {
                    (TypeKind::IncompleteArray, None)
                };
                ClangType {
                    element: Some(Box::new(element)),
                    array_size,
                    ..ClangType::new(kind, spelling.as_str())
                }
            }
            kind => ClangType::new(convert_type_kind(kind), spelling.as_str()),
        };
        converted.is_const = is_const;
        converted
    }
}

fn convert_type_kind(kind: clang_sys::CXTypeKind) -> TypeKind {
    match kind {
        clang_sys::CXType_Invalid => TypeKind::Invalid,
        clang_sys::CXType_Void => TypeKind::Void,
        clang_sys::CXType_Bool => TypeKind::Bool,
        clang_sys::CXType_Char_U
        | clang_sys::CXType_UChar
        | clang_sys::CXType_Char16
        | clang_sys::CXType_Char32
        | clang_sys::CXType_UShort
        | clang_sys::CXType_UInt
        | clang_sys::CXType_ULong
        | clang_sys::CXType_ULongLong
        | clang_sys::CXType_Char_S
        | clang_sys::CXType_SChar
        | clang_sys::CXType_WChar
        | clang_sys::CXType_Short
        | clang_sys::CXType_Int
        | clang_sys::CXType_Long
        | clang_sys::CXType_LongLong => TypeKind::Int,
        clang_sys::CXType_Float | clang_sys::CXType_Double | clang_sys::CXType_LongDouble => {
            TypeKind::Float
        }
        clang_sys::CXType_Typedef => TypeKind::Typedef,
        clang_sys::CXType_Record => TypeKind::Record,
        clang_sys::CXType_Enum => TypeKind::Enum,
        clang_sys::CXType_FunctionProto | clang_sys::CXType_FunctionNoProto => TypeKind::Function,
        clang_sys::CXType_Unexposed => TypeKind::Unexposed,
        _ => TypeKind::Other,
    }
}

/// Get source location from cursor.
fn get_location(cursor: clang_sys::CXCursor) -> SourceLocation {
    unsafe {
        let loc = clang_sys::clang_getCursorLocation(cursor);
        let mut file: clang_sys::CXFile = ptr::null_mut();
        let mut line: u32 = 0;
        let mut column: u32 = 0;

        clang_sys::clang_getSpellingLocation(
            loc,
            &mut file,
            &mut line,
            &mut column,
            ptr::null_mut(),
        );

        let file_name = if !file.is_null() {
            Some(cx_string_to_string(clang_sys::clang_getFileName(file)))
        } else {
            None
        };

        SourceLocation {
            file: file_name,
            line,
            column,
            in_main_file: clang_sys::clang_Location_isFromMainFile(loc) != 0,
        }
    }
}

/// Convert a CXString to a Rust String.
fn cx_string_to_string(cx_string: clang_sys::CXString) -> String {
    unsafe {
        let c_str = clang_sys::clang_getCString(cx_string);
        let result = if c_str.is_null() {
            String::new()
        } else {
            CStr::from_ptr(c_str).to_string_lossy().into_owned()
        };
        clang_sys::clang_disposeString(cx_string);
        result
    }
}

/// Get the spelling of a cursor.
fn cursor_spelling(cursor: clang_sys::CXCursor) -> String {
    unsafe { cx_string_to_string(clang_sys::clang_getCursorSpelling(cursor)) }
}
