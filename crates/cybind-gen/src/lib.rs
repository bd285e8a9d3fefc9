//! Type model and emitters for cybind.
//!
//! This crate turns a [`cybind_clang::ClangAst`] into Python binding text:
//! - [`registry`]: primitive catalog and native → Python type classification
//! - [`typewrap`]: per use-site type facts (spelling, typedef resolution, defaults)
//! - [`decl`]: structs, functions and enums over one or more cursors
//! - [`emit`]: the `.pxd`, `.pyx` and `.pyi` renderers
//!
//! # Example
//!
//! ```ignore
//! let set = BindingSet { native_module: "_impl".into(), known, headers };
//! let artifacts = cybind_gen::emit(&set)?;
//! std::fs::write("impl.pyi", artifacts.pyi)?;
//! ```

pub mod decl;
pub mod emit;
mod error;
pub mod flags;
pub mod literal;
pub mod registry;
pub mod typewrap;

pub use decl::{Callable, Declaration, EnumConstant, EnumDecl, FunctionDecl, Member, StructDecl};
pub use emit::{emit, Artifacts, BindingSet, HeaderBindings};
pub use error::{GenError, Result};
pub use flags::{MethodPolicy, WrapFlags};
pub use registry::{HostType, KnownTypes, TypeDescriptor, TypeRegistry};
pub use typewrap::TypeWrap;
