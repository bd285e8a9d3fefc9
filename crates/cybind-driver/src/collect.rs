//! Entity collection from a header snapshot.

use cybind_clang::{ClangAst, CursorKind, NodeId};
use cybind_gen::decl::namespace_of;
use cybind_gen::{Declaration, KnownTypes};
use indexmap::IndexMap;
use miette::Result;
use smol_str::SmolStr;
use tracing::debug;

/// Declarations of the parsed file, one per `(namespace, name)` in first
/// appearance order. Later cursors of the same entity become redeclarations.
pub fn collect_declarations(ast: &ClangAst) -> Result<Vec<Declaration<'_>>> {
    let mut entities: IndexMap<(String, SmolStr), Declaration<'_>> = IndexMap::new();
    walk(ast, ast.root(), &mut entities)?;
    Ok(entities.into_values().collect())
}

fn walk<'a>(
    ast: &'a ClangAst,
    parent: NodeId,
    entities: &mut IndexMap<(String, SmolStr), Declaration<'a>>,
) -> Result<()> {
    for child in ast.children(parent) {
        let node = &ast[child];
        match node.kind {
            CursorKind::Namespace | CursorKind::LinkageSpec => walk(ast, child, entities)?,
            ref kind if is_entity(kind) => {
                if !node.location.in_main_file {
                    continue;
                }
                if is_anonymous(&node.spelling) {
                    debug!(kind = ?node.kind, "skipping anonymous entity");
                    continue;
                }
                let key = (namespace_of(ast, child), node.spelling.clone());
                match entities.get_mut(&key) {
                    Some(existing) => existing.redeclare(child),
                    None => {
                        entities.insert(key, Declaration::from_cursor(ast, child)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_entity(kind: &CursorKind) -> bool {
    kind.is_record() || matches!(kind, CursorKind::FunctionDecl | CursorKind::EnumDecl)
}

fn is_anonymous(spelling: &str) -> bool {
    spelling.is_empty() || spelling.contains("(anonymous") || spelling.contains("(unnamed")
}

/// Record struct and enum names so the emitters can tell them from
/// unresolved spellings.
pub fn register_types(known: &mut KnownTypes, declarations: &[Declaration<'_>]) {
    for decl in declarations {
        match decl {
            Declaration::Struct(s) => known.add_struct(s.name()),
            Declaration::Enum(e) => known.add_enum(e.name()),
            Declaration::Function(_) => {}
        }
    }
}
