//! Redis-backed collection.
//!
//! Each collection is one Redis hash at `{prefix}:{collection}` mapping document
//! ids to JSON text. Filters are evaluated client-side while walking the hash
//! with `HSCAN`. Updates are written back with a compare-and-set script so a
//! document changed between the scan and the write is re-read, not overwritten.

use std::{collections::VecDeque, sync::LazyLock};

use log::{debug, warn};
use redis::{Script, aio::ConnectionManager, cmd};
use serde_json::Value;
use uuid::Uuid;

use super::{
    Collection, Cursor, Document, ID_KEY, InsertManyResult, InsertOneResult, UpdateOptions, UpdateResult,
    document::{apply_update, ensure_id, id_string, matches, seed_from_filter},
};
use crate::{context::Context, errors::StoreError};

const DEFAULT_SCAN_COUNT: usize = 256;

/// Scan-and-write rounds `update_one` makes before giving up on a contended document.
const MAX_ATTEMPTS: usize = 16;

pub const COMPARE_AND_SET_SCRIPT_BODY: &str = include_str!("../../lua/compare_and_set.lua");

pub static COMPARE_AND_SET_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(COMPARE_AND_SET_SCRIPT_BODY));

/// Id given to a document created by an upsert on `filter` in the hash at `key`.
///
/// Concurrent upserts on the same filter derive the same id, so `HSETNX` lets
/// exactly one of them create the document.
pub fn upsert_id(key: &str, filter: &Document) -> Value {
    let name = format!("{key}\n{}", Value::Object(filter.clone()));
    Value::String(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string())
}

#[derive(Clone)]
pub struct RedisCollection {
    conn: ConnectionManager,
    key: String,
    scan_count: usize,
}

impl RedisCollection {
    pub fn new(conn: ConnectionManager, prefix: &str, collection: &str) -> Self {
        Self {
            conn,
            key: format!("{prefix}:{collection}"),
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Connects to `url` and opens `collection` under `prefix`.
    pub async fn connect(url: &str, prefix: &str, collection: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, prefix, collection))
    }

    /// Number of hash entries requested per `HSCAN` round trip.
    pub fn scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn cursor(&self, filter: &Document) -> RedisCursor {
        RedisCursor {
            conn: self.conn.clone(),
            key: self.key.clone(),
            filter: filter.clone(),
            scan_count: self.scan_count,
            position: 0,
            started: false,
            buffer: VecDeque::new(),
        }
    }

    /// Replaces the document stored under `field` only if it still reads `expected`.
    async fn compare_and_set(
        &self,
        ctx: &Context,
        field: &str,
        expected: &str,
        document: &Document,
    ) -> Result<bool, StoreError> {
        let json = serde_json::to_string(document).map_err(StoreError::Encode)?;
        let mut conn = self.conn.clone();
        let written: i64 = ctx
            .run(async {
                COMPARE_AND_SET_SCRIPT
                    .key(&self.key)
                    .arg(field)
                    .arg(expected)
                    .arg(json)
                    .invoke_async(&mut conn)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;
        Ok(written == 1)
    }

    async fn set_if_absent(&self, ctx: &Context, mut document: Document) -> Result<serde_json::Value, StoreError> {
        let id = ensure_id(&mut document);
        let field = id_string(&id);
        let json = serde_json::to_string(&document).map_err(StoreError::Encode)?;
        let mut conn = self.conn.clone();
        let created: i64 = ctx
            .run(async {
                cmd("HSETNX")
                    .arg(&self.key)
                    .arg(&field)
                    .arg(json)
                    .query_async(&mut conn)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;
        if created == 0 {
            return Err(StoreError::DuplicateId { id: field });
        }
        Ok(id)
    }
}

impl Collection for RedisCollection {
    type Cursor = RedisCursor;

    async fn find_one(&self, ctx: &Context, filter: &Document) -> Result<Option<Document>, StoreError> {
        let mut cursor = self.cursor(filter);
        cursor.next(ctx).await
    }

    async fn find(&self, ctx: &Context, filter: &Document) -> Result<RedisCursor, StoreError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        debug!("{}: opened scan cursor", self.key);
        Ok(self.cursor(filter))
    }

    async fn update_one(
        &self,
        ctx: &Context,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult, StoreError> {
        let provided_id = seed_from_filter(filter).contains_key(ID_KEY);
        let mut collisions = 0;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut cursor = self.cursor(filter);
            if let Some(entry) = cursor.next_entry(ctx).await? {
                let mut document = entry.document;
                let changed = apply_update(&mut document, update)?;
                if changed && !self.compare_and_set(ctx, &entry.field, &entry.raw, &document).await? {
                    debug!("{}: document {} changed during update, attempt {attempt}", self.key, entry.field);
                    continue;
                }
                return Ok(UpdateResult {
                    matched_count: 1,
                    modified_count: u64::from(changed),
                    upserted_id: None,
                });
            }

            if !options.upsert {
                return Ok(UpdateResult::default());
            }

            let mut document = seed_from_filter(filter);
            apply_update(&mut document, update)?;
            if !provided_id && collisions < 2 {
                document.insert(ID_KEY.to_string(), upsert_id(&self.key, filter));
            }
            match self.set_if_absent(ctx, document).await {
                Ok(id) => {
                    return Ok(UpdateResult {
                        matched_count: 0,
                        modified_count: 0,
                        upserted_id: Some(id),
                    });
                }
                // The first collision is usually a concurrent upsert of the same
                // document, which the next scan will match.
                Err(StoreError::DuplicateId { id }) if collisions == 0 || !provided_id => {
                    collisions += 1;
                    if collisions == 2 && !provided_id {
                        warn!("{}: derived upsert id {id} belongs to a non-matching document", self.key);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(StoreError::Other {
            message: format!("{}: update still conflicting after {MAX_ATTEMPTS} attempts", self.key).into(),
        })
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<InsertOneResult, StoreError> {
        let inserted_id = self.set_if_absent(ctx, document).await?;
        Ok(InsertOneResult { inserted_id })
    }

    async fn insert_many(&self, ctx: &Context, documents: Vec<Document>) -> Result<InsertManyResult, StoreError> {
        let mut inserted_ids = Vec::with_capacity(documents.len());
        for document in documents {
            inserted_ids.push(self.set_if_absent(ctx, document).await?);
        }
        Ok(InsertManyResult { inserted_ids })
    }
}

/// A matching hash entry as read by the scan.
struct Entry {
    field: String,
    raw: String,
    document: Document,
}

/// `HSCAN` walk over a collection hash yielding documents that match a filter.
pub struct RedisCursor {
    conn: ConnectionManager,
    key: String,
    filter: Document,
    scan_count: usize,
    position: u64,
    started: bool,
    buffer: VecDeque<Entry>,
}

impl RedisCursor {
    fn exhausted(&self) -> bool {
        self.started && self.position == 0
    }

    async fn fetch(&mut self, ctx: &Context) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let (next, entries): (u64, Vec<String>) = ctx
            .run(async {
                cmd("HSCAN")
                    .arg(&self.key)
                    .arg(self.position)
                    .arg("COUNT")
                    .arg(self.scan_count)
                    .query_async(&mut conn)
                    .await
                    .map_err(StoreError::from)
            })
            .await?;
        self.started = true;
        self.position = next;

        // HSCAN replies with alternating field and value entries.
        let mut entries = entries.into_iter();
        while let (Some(field), Some(raw)) = (entries.next(), entries.next()) {
            let document: Document = serde_json::from_str(&raw).map_err(StoreError::Decode)?;
            if matches(&document, &self.filter)? {
                self.buffer.push_back(Entry { field, raw, document });
            }
        }
        Ok(())
    }

    async fn next_entry(&mut self, ctx: &Context) -> Result<Option<Entry>, StoreError> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Ok(Some(entry));
            }
            if self.exhausted() {
                return Ok(None);
            }
            self.fetch(ctx).await?;
        }
    }
}

impl Cursor for RedisCursor {
    async fn next(&mut self, ctx: &Context) -> Result<Option<Document>, StoreError> {
        Ok(self.next_entry(ctx).await?.map(|entry| entry.document))
    }
}

impl Drop for RedisCursor {
    fn drop(&mut self) {
        debug!("{}: released scan cursor at position {}", self.key, self.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn upsert_id_is_stable_per_collection_and_filter() {
        let filter = doc(json!({"sku": {"$eq": "a"}}));
        let id = upsert_id("p:widgets", &filter);
        assert_eq!(id, upsert_id("p:widgets", &filter));
        assert_ne!(id, upsert_id("p:widgets", &doc(json!({"sku": {"$eq": "b"}}))));
        assert_ne!(id, upsert_id("p:gadgets", &filter));
    }
}
