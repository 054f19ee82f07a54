//! Boundary between the query builder and a document store.

pub mod document;
pub mod memory;
pub mod redis_store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{context::Context, errors::StoreError};

pub use document::{apply_update, ensure_id, matches, seed_from_filter};
pub use memory::{MemoryCollection, MemoryCursor};
pub use redis_store::{RedisCollection, RedisCursor};

/// A stored document: an ordered JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Key of the document identifier.
pub const ID_KEY: &str = "_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document when the filter matches nothing.
    pub upsert: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertOneResult {
    pub inserted_id: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<Value>,
}

/// Server-side result set returned by [`Collection::find`].
///
/// Implementations release the underlying resource when dropped, so a cursor is
/// released exactly once whichever way the caller leaves its scope.
#[allow(async_fn_in_trait)]
pub trait Cursor {
    async fn next(&mut self, ctx: &Context) -> Result<Option<Document>, StoreError>;
}

/// Handle to one collection of an external document store.
///
/// Filters use `{key: {"$eq": v}}`, `{key: {"$in": [..]}}` and `{"$and": [..]}`;
/// updates use `{"$set": {..}}`.
#[allow(async_fn_in_trait)]
pub trait Collection {
    type Cursor: Cursor;

    async fn find_one(&self, ctx: &Context, filter: &Document) -> Result<Option<Document>, StoreError>;

    async fn find(&self, ctx: &Context, filter: &Document) -> Result<Self::Cursor, StoreError>;

    async fn update_one(
        &self,
        ctx: &Context,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult, StoreError>;

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<InsertOneResult, StoreError>;

    async fn insert_many(&self, ctx: &Context, documents: Vec<Document>) -> Result<InsertManyResult, StoreError>;
}

impl<C: Collection + ?Sized> Collection for &C {
    type Cursor = C::Cursor;

    async fn find_one(&self, ctx: &Context, filter: &Document) -> Result<Option<Document>, StoreError> {
        (**self).find_one(ctx, filter).await
    }

    async fn find(&self, ctx: &Context, filter: &Document) -> Result<Self::Cursor, StoreError> {
        (**self).find(ctx, filter).await
    }

    async fn update_one(
        &self,
        ctx: &Context,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult, StoreError> {
        (**self).update_one(ctx, filter, update, options).await
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<InsertOneResult, StoreError> {
        (**self).insert_one(ctx, document).await
    }

    async fn insert_many(&self, ctx: &Context, documents: Vec<Document>) -> Result<InsertManyResult, StoreError> {
        (**self).insert_many(ctx, documents).await
    }
}

impl<C: Collection + ?Sized> Collection for Arc<C> {
    type Cursor = C::Cursor;

    async fn find_one(&self, ctx: &Context, filter: &Document) -> Result<Option<Document>, StoreError> {
        (**self).find_one(ctx, filter).await
    }

    async fn find(&self, ctx: &Context, filter: &Document) -> Result<Self::Cursor, StoreError> {
        (**self).find(ctx, filter).await
    }

    async fn update_one(
        &self,
        ctx: &Context,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult, StoreError> {
        (**self).update_one(ctx, filter, update, options).await
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<InsertOneResult, StoreError> {
        (**self).insert_one(ctx, document).await
    }

    async fn insert_many(&self, ctx: &Context, documents: Vec<Document>) -> Result<InsertManyResult, StoreError> {
        (**self).insert_many(ctx, documents).await
    }
}
