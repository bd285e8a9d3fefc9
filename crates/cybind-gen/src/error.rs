//! Error types for cybind-gen.

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Result type for generation.
pub type Result<T> = std::result::Result<T, GenError>;

/// Errors that abort generation of a header set.
#[derive(Error, Diagnostic, Debug)]
pub enum GenError {
    /// A typedef use site has no `TypeRef` child to follow.
    #[error("`{cursor}` uses typedef `{spelling}` but has no type reference to resolve it")]
    #[diagnostic(
        code(cybind::missing_type_ref),
        help("the header may rely on a macro-generated typedef; exclude the type or the member")
    )]
    MissingTypeRef { cursor: SmolStr, spelling: SmolStr },

    /// The dispatcher was handed a cursor it has no emitter for.
    #[error("cannot emit {kind} `{name}`")]
    #[diagnostic(code(cybind::unsupported_entity))]
    UnsupportedEntity { kind: String, name: SmolStr },
}
