//! libclang front-end for the cybind binding generator.
//!
//! This crate provides:
//! - Header parsing via libclang
//! - An owned, arena-indexed snapshot of the cursor tree
//!
//! # Architecture
//!
//! ```text
//! header.h → libclang → CXCursor tree → ClangAst (NodeId arena)
//! ```
//!
//! The snapshot is the only thing the generator ever sees; cursors and the
//! translation unit are disposed before [`ClangParser::parse_file`] returns.

mod ast;
mod parse;
mod types;

pub use ast::{ClangAst, ClangNode, CursorKind, NodeId, SourceLocation};
pub use parse::ClangParser;
pub use types::{ClangType, TypeKind};
