use std::borrow::Cow;

use thiserror::Error;

/// Error returned by a [`Collection`](crate::store::Collection) and passed through
/// the query builder unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A single-result lookup matched no document.
    #[error("no document matched the filter")]
    NotFound,

    /// A stored document could not be decoded into the requested record type.
    #[error("failed to decode document: {0}")]
    Decode(#[source] serde_json::Error),

    /// A record could not be encoded into a document.
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    /// The caller's context was cancelled before the operation was issued.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's context deadline passed before the operation finished.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// An insert supplied an `_id` that is already present.
    #[error("duplicate document id {id}")]
    DuplicateId { id: String },

    /// None of the field names given to an upsert belong to the entity.
    #[error("upsert on `{entity}` names no known field: {names:?}")]
    UnknownUniqueFields { entity: &'static str, names: Vec<String> },

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

/// Error raised while building an [`EntitySchema`](crate::schema::EntitySchema).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The introspected item is not a struct with named fields.
    #[error("input is not a struct: {name}")]
    NotAStruct { name: String },

    /// Two leaf fields resolve to the same serialization key.
    #[error("duplicate serialization key `{key}` on fields `{first}` and `{second}` of `{entity}`")]
    DuplicateKey {
        entity: String,
        key: String,
        first: String,
        second: String,
    },

    /// An embedded sub-schema could not be resolved from source.
    #[error("embedded struct `{name}` not found")]
    MissingEmbedded { name: String },
}
