use std::{io, path::PathBuf};

use daogen::SchemaError;
use thiserror::Error;

/// Failure of a generation call. Nothing is left half-written when one is returned.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An existing output file could not be read, so it could not be restored on failure.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A field's type signature does not parse as a Rust type.
    #[error("field `{field}` has type `{ty}` which is not a valid Rust type")]
    InvalidType { field: String, ty: String },

    /// A declared name cannot be used as a Rust identifier.
    #[error("`{name}` is not a valid Rust identifier")]
    InvalidName { name: String },

    /// A field accessor would shadow one of the DAO's query entry points.
    #[error("field `{field}` collides with the generated `{field}` query method")]
    ReservedName { field: String },

    #[error("generated code did not parse: {0}")]
    Render(#[from] syn::Error),

    #[error("invalid generator config{}: {message}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Config { path: Option<PathBuf>, message: String },
}
