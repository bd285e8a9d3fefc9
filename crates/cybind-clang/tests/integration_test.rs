//! Integration tests for the libclang snapshot.

use cybind_clang::{ClangAst, ClangParser, CursorKind, NodeId, TypeKind};

/// Every test here needs libclang; run with `cargo test -- --ignored`.
fn parse(source: &str) -> ClangAst {
    ClangParser::new()
        .expect("libclang must be installed to run ignored tests")
        .parse_string(source, "test.h")
        .expect("Failed to parse")
}

fn find(ast: &ClangAst, kind: CursorKind, name: &str) -> NodeId {
    ast.iter()
        .find(|(_, node)| node.kind == kind && node.spelling == name)
        .map(|(id, _)| id)
        .unwrap_or_else(|| panic!("Expected {kind:?} {name}"))
}

/// Methods carry their result type and qualifiers.
#[test]
#[ignore] // Requires libclang
fn test_method_snapshot() {
    let ast = parse(
        r#"
        struct Counter {
            int value;
            Counter();
            int Get() const;
            static Counter Make(int start);
        };
        "#,
    );

    let get = find(&ast, CursorKind::CxxMethod, "Get");
    assert!(ast[get].is_const_method);
    assert!(!ast[get].is_static);
    assert_eq!(ast[get].result_type.as_ref().unwrap().spelling, "int");

    let make = find(&ast, CursorKind::CxxMethod, "Make");
    assert!(ast[make].is_static);
    assert_eq!(
        ast.children_of_kind(make, &CursorKind::ParmDecl).count(),
        1
    );

    let ctor = find(&ast, CursorKind::Constructor, "Counter");
    assert_eq!(ast[ctor].parent, Some(find(&ast, CursorKind::StructDecl, "Counter")));
}

/// Array and pointer fields keep their structure.
#[test]
#[ignore] // Requires libclang
fn test_field_type_shapes() {
    let ast = parse(
        r#"
        struct Mesh {
            float matrix[4][4];
            const char* name;
        };
        "#,
    );

    let matrix = &ast[find(&ast, CursorKind::FieldDecl, "matrix")].ty;
    assert_eq!(matrix.kind, TypeKind::ConstantArray);
    assert_eq!(matrix.array_size, Some(4));
    let inner = matrix.element().unwrap();
    assert_eq!(inner.kind, TypeKind::ConstantArray);
    assert_eq!(inner.element().unwrap().spelling, "float");

    let name = &ast[find(&ast, CursorKind::FieldDecl, "name")].ty;
    assert_eq!(name.kind, TypeKind::Pointer);
    assert!(name.pointee().unwrap().is_const);
}

/// Enum constants carry their values.
#[test]
#[ignore] // Requires libclang
fn test_enum_values() {
    let ast = parse("enum Dir { Dir_Left = 0, Dir_Right = 4, Dir_Up };");

    let up = find(&ast, CursorKind::EnumConstantDecl, "Dir_Up");
    assert_eq!(ast[up].enum_value, Some(5));
}

/// Namespaced functions are nested below their namespace.
#[test]
#[ignore] // Requires libclang
fn test_namespace_nesting() {
    let ast = parse("namespace ui { void Begin(const char* name, bool* open = nullptr); }");

    let ns = find(&ast, CursorKind::Namespace, "ui");
    let begin = find(&ast, CursorKind::FunctionDecl, "Begin");
    assert_eq!(ast[begin].parent, Some(ns));
    assert_eq!(ast[begin].result_type.as_ref().unwrap().kind, TypeKind::Void);
}

/// Class templates are kept as their own cursor kind.
#[test]
#[ignore] // Requires libclang
fn test_class_template() {
    let ast = parse("template <typename T> struct Box { T value; };");

    let tmpl = find(&ast, CursorKind::ClassTemplate, "Box");
    assert_eq!(ast[tmpl].definition, Some(tmpl));
}
