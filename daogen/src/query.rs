//! Fluent query builder bound to a [`Collection`].

use std::{collections::HashSet, fmt, marker::PhantomData};

use log::{debug, warn};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    context::Context,
    errors::StoreError,
    field::{Operator, QueryCondition},
    schema::Entity,
    store::{Collection, Cursor, Document, InsertManyResult, InsertOneResult, UpdateOptions, UpdateResult},
};

const AND: &str = "$and";
const SET: &str = "$set";

/// Collection slot of a [`Query`] that has not been bound yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unbound;

/// Accumulates conditions for records of type `T` and executes them against `C`.
///
/// Every fluent call consumes the builder and returns it, so a query has a
/// single owner and is never shared between concurrent callers. Terminal
/// operations are only available once a collection is bound.
pub struct Query<T, C = Unbound> {
    collection: C,
    ctx: Context,
    conditions: Vec<QueryCondition>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Query<T> {
    pub const fn new() -> Self {
        Self {
            collection: Unbound,
            ctx: Context::background(),
            conditions: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C: Clone> Clone for Query<T, C> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            ctx: self.ctx.clone(),
            conditions: self.conditions.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, C> fmt::Debug for Query<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("ctx", &self.ctx)
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

impl<T, C> Query<T, C> {
    /// Binds the collection the query runs against.
    pub fn collection<D: Collection>(self, collection: D) -> Query<T, D> {
        Query {
            collection,
            ctx: self.ctx,
            conditions: self.conditions,
            _marker: PhantomData,
        }
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Adds a condition. All conditions must hold for a document to match.
    pub fn filter(mut self, condition: QueryCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn filters<I>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = QueryCondition>,
    {
        self.conditions.extend(conditions);
        self
    }

    pub fn conditions(&self) -> &[QueryCondition] {
        &self.conditions
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn filter_document(&self) -> Document {
        filter_document(&self.conditions)
    }

    /// The filter document, or the first condition whose operand failed to encode.
    fn checked_filter(&self) -> Result<Document, StoreError> {
        if let Some(err) = self.conditions.iter().find_map(QueryCondition::encode_error) {
            return Err(err);
        }
        Ok(self.filter_document())
    }
}

impl<T, C> Query<T, C>
where
    T: DeserializeOwned,
    C: Collection,
{
    /// First matching record, or [`StoreError::NotFound`].
    pub async fn first(self) -> Result<T, StoreError> {
        let filter = self.checked_filter()?;
        debug!("first {filter:?}");
        let document = self
            .collection
            .find_one(&self.ctx, &filter)
            .await?
            .ok_or(StoreError::NotFound)?;
        decode(document)
    }

    /// Every matching record in store order.
    pub async fn find(self) -> Result<Vec<T>, StoreError> {
        let filter = self.checked_filter()?;
        debug!("find {filter:?}");
        // The cursor is released when it goes out of scope, on every return path.
        let mut cursor = self.collection.find(&self.ctx, &filter).await?;
        let mut results = Vec::new();
        while let Some(document) = cursor.next(&self.ctx).await? {
            results.push(decode(document)?);
        }
        Ok(results)
    }
}

impl<T, C> Query<T, C>
where
    T: Entity,
    C: Collection,
{
    /// Sets every non-default member of `patch` on the first matching document.
    ///
    /// Returns `Ok(None)` without touching the store when every member of
    /// `patch` is at its default value.
    pub async fn update_one(self, patch: &T) -> Result<Option<UpdateResult>, StoreError> {
        let Some(update) = set_document(patch)? else {
            debug!("update_one on {} skipped: no non-default members", T::NAME);
            return Ok(None);
        };
        let filter = self.checked_filter()?;
        debug!("update_one {filter:?} {update:?}");
        let result = self
            .collection
            .update_one(&self.ctx, &filter, &update, UpdateOptions::default())
            .await?;
        Ok(Some(result))
    }

    /// Updates or inserts `document`, matching on the named fields only.
    ///
    /// `unique_fields` are declared field names; their current values in
    /// `document` form the filter and any accumulated conditions are ignored.
    /// Unknown names are skipped; when none resolve the call fails with
    /// [`StoreError::UnknownUniqueFields`] rather than matching every document.
    /// Returns `Ok(None)` without a write when every member is at its default.
    pub async fn upsert_one(self, document: &T, unique_fields: &[&str]) -> Result<Option<UpdateResult>, StoreError> {
        let mut conditions = Vec::with_capacity(unique_fields.len());
        for name in unique_fields {
            match document.field_entry(name) {
                Some(entry) => {
                    let (key, value) = entry.map_err(StoreError::Encode)?;
                    conditions.push(QueryCondition::new(key, Operator::Eq, value));
                }
                None => warn!("upsert_one on {} ignores unknown field `{name}`", T::NAME),
            }
        }
        if conditions.is_empty() {
            return Err(StoreError::UnknownUniqueFields {
                entity: T::NAME,
                names: unique_fields.iter().map(|name| name.to_string()).collect(),
            });
        }

        let Some(update) = set_document(document)? else {
            debug!("upsert_one on {} skipped: no non-default members", T::NAME);
            return Ok(None);
        };
        let filter = filter_document(&conditions);
        debug!("upsert_one {filter:?} {update:?}");
        let result = self
            .collection
            .update_one(&self.ctx, &filter, &update, UpdateOptions { upsert: true })
            .await?;
        Ok(Some(result))
    }
}

impl<T, C> Query<T, C>
where
    T: Serialize,
    C: Collection,
{
    pub async fn insert_one(self, document: &T) -> Result<InsertOneResult, StoreError> {
        let document = to_document(document)?;
        self.collection.insert_one(&self.ctx, document).await
    }

    pub async fn insert_many(self, documents: &[T]) -> Result<InsertManyResult, StoreError> {
        let documents = documents.iter().map(to_document).collect::<Result<Vec<_>, _>>()?;
        self.collection.insert_many(&self.ctx, documents).await
    }
}

/// Renders conditions as one filter document.
///
/// Conditions are merged under their key as `{key: {op: value, ..}}`. When two
/// conditions share both key and operator a map cannot hold both, so the filter
/// becomes `{"$and": [{key: {op: value}}, ..]}` instead.
pub fn filter_document(conditions: &[QueryCondition]) -> Document {
    let mut seen = HashSet::new();
    let distinct = conditions.iter().all(|c| seen.insert((c.key.as_str(), c.op)));

    if !distinct {
        let clauses = conditions
            .iter()
            .map(|c| Value::Object(filter_document(std::slice::from_ref(c))))
            .collect();
        let mut filter = Document::new();
        filter.insert(AND.to_string(), Value::Array(clauses));
        return filter;
    }

    let mut filter = Document::new();
    for condition in conditions {
        let entry = filter
            .entry(condition.key.clone())
            .or_insert_with(|| Value::Object(Document::new()));
        if let Value::Object(operators) = entry {
            operators.insert(condition.op.as_str().to_string(), condition.value.clone());
        }
    }
    filter
}

/// `{"$set": {..}}` of the non-default members of `record`, or `None` if there are none.
pub fn set_document<T: Entity>(record: &T) -> Result<Option<Document>, StoreError> {
    let fields = record.set_fields().map_err(StoreError::Encode)?;
    if fields.is_empty() {
        return Ok(None);
    }
    let mut update = Document::new();
    update.insert(SET.to_string(), Value::Object(fields));
    Ok(Some(update))
}

fn to_document<T: Serialize>(record: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(record).map_err(StoreError::Encode)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::Other {
            message: format!("record serialized to {other} instead of a document").into(),
        }),
    }
}

fn decode<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document)).map_err(StoreError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use serde_json::json;

    const NAME: Field<String> = Field::new("Name", "name");
    const AGE: Field<i64> = Field::new("Age", "age");

    #[test]
    fn single_condition_renders_operator_object() {
        let filter = filter_document(&[NAME.eq("Ann".into())]);
        assert_eq!(Value::Object(filter), json!({"name": {"$eq": "Ann"}}));
    }

    #[test]
    fn distinct_keys_render_side_by_side() {
        let filter = filter_document(&[NAME.eq("Ann".into()), AGE.is_in([1, 2])]);
        assert_eq!(
            Value::Object(filter),
            json!({"name": {"$eq": "Ann"}, "age": {"$in": [1, 2]}})
        );
    }

    #[test]
    fn same_key_different_operators_merge() {
        let filter = filter_document(&[AGE.eq(3), AGE.is_in([3, 4])]);
        assert_eq!(Value::Object(filter), json!({"age": {"$eq": 3, "$in": [3, 4]}}));
    }

    #[test]
    fn repeated_key_and_operator_falls_back_to_and() {
        let filter = filter_document(&[AGE.eq(3), AGE.eq(4)]);
        assert_eq!(
            Value::Object(filter),
            json!({"$and": [{"age": {"$eq": 3}}, {"age": {"$eq": 4}}]})
        );
    }

    #[test]
    fn no_conditions_match_everything() {
        assert!(filter_document(&[]).is_empty());
    }

    #[test]
    fn fluent_calls_keep_condition_order() {
        let query: Query<()> = Query::new().filter(AGE.eq(1)).filters([NAME.eq("a".into()), AGE.eq(2)]);
        let keys: Vec<_> = query.conditions().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["age", "name", "age"]);
    }
}
