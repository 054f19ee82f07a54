//! In-process collection.
//!
//! Interprets filters and updates with [`super::document`] and keeps counters
//! for issued writes and open cursors so callers can observe what a query did.

use std::{
    borrow::Cow,
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use log::debug;

use super::{
    Collection, Cursor, Document, ID_KEY, InsertManyResult, InsertOneResult, UpdateOptions, UpdateResult,
    document::{apply_update, ensure_id, id_string, matches, seed_from_filter},
};
use crate::{context::Context, errors::StoreError};

#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    docs: Mutex<Vec<Document>>,
    open_cursors: Arc<AtomicUsize>,
    writes: AtomicUsize,
    fail_next: Mutex<Option<String>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the stored documents in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.docs().clone()
    }

    pub fn len(&self) -> usize {
        self.docs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs().is_empty()
    }

    /// Number of write commands that reached the collection.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of cursors handed out and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Makes the next operation fail with [`StoreError::Other`].
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    fn docs(&self) -> MutexGuard<'_, Vec<Document>> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, ctx: &Context) -> Result<(), StoreError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        match self.fail_next.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(message) => Err(StoreError::Other {
                message: Cow::Owned(message),
            }),
            None => Ok(()),
        }
    }

    fn insert_locked(docs: &mut Vec<Document>, mut document: Document) -> Result<serde_json::Value, StoreError> {
        let id = ensure_id(&mut document);
        if docs.iter().any(|existing| existing.get(ID_KEY) == Some(&id)) {
            return Err(StoreError::DuplicateId { id: id_string(&id) });
        }
        docs.push(document);
        Ok(id)
    }
}

impl Collection for MemoryCollection {
    type Cursor = MemoryCursor;

    async fn find_one(&self, ctx: &Context, filter: &Document) -> Result<Option<Document>, StoreError> {
        self.begin(ctx)?;
        for doc in self.docs().iter() {
            if matches(doc, filter)? {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    async fn find(&self, ctx: &Context, filter: &Document) -> Result<MemoryCursor, StoreError> {
        self.begin(ctx)?;
        let mut pending = VecDeque::new();
        for doc in self.docs().iter() {
            if matches(doc, filter)? {
                pending.push_back(doc.clone());
            }
        }
        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        debug!("{}: opened cursor over {} documents", self.name, pending.len());
        Ok(MemoryCursor {
            pending,
            open_cursors: Arc::clone(&self.open_cursors),
        })
    }

    async fn update_one(
        &self,
        ctx: &Context,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult, StoreError> {
        self.begin(ctx)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs();

        let mut target = None;
        for (index, doc) in docs.iter().enumerate() {
            if matches(doc, filter)? {
                target = Some(index);
                break;
            }
        }

        if let Some(index) = target {
            let changed = apply_update(&mut docs[index], update)?;
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
        let id = Self::insert_locked(&mut docs, document)?;
        Ok(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        })
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<InsertOneResult, StoreError> {
        self.begin(ctx)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let inserted_id = Self::insert_locked(&mut self.docs(), document)?;
        Ok(InsertOneResult { inserted_id })
    }

    async fn insert_many(&self, ctx: &Context, documents: Vec<Document>) -> Result<InsertManyResult, StoreError> {
        self.begin(ctx)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs();
        let mut inserted_ids = Vec::with_capacity(documents.len());
        for document in documents {
            inserted_ids.push(Self::insert_locked(&mut docs, document)?);
        }
        Ok(InsertManyResult { inserted_ids })
    }
}

/// Cursor over a snapshot of matching documents.
#[derive(Debug)]
pub struct MemoryCursor {
    pending: VecDeque<Document>,
    open_cursors: Arc<AtomicUsize>,
}

impl Cursor for MemoryCursor {
    async fn next(&mut self, ctx: &Context) -> Result<Option<Document>, StoreError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        Ok(self.pending.pop_front())
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}
