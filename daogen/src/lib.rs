//! daogen runtime.
//!
//! Entity schemas, typed field descriptors and the query builder that generated
//! data-access objects use to reach a document store.

extern crate self as daogen;

pub mod case;
pub mod context;
pub mod default;
pub mod errors;
pub mod field;
pub mod query;
pub mod schema;
pub mod store;

pub use context::{CancelToken, Context};
pub use daogen_macros::{Entity, IsDefault};
pub use default::IsDefault;
pub use errors::*;
pub use field::{Field, Operator, QueryCondition};
pub use query::{Query, Unbound};
pub use schema::{Entity, EntitySchema, FieldMetadata, SchemaNode};
pub use store::{Collection, Cursor, Document, MemoryCollection, RedisCollection};

// Re-exported so generated code and derive output resolve them through this crate.
pub use serde;
pub use serde_json;
