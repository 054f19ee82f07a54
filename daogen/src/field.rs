//! Typed field handles and the query conditions they build.

use std::{fmt, marker::PhantomData};

use serde::{Serialize, ser::Error as _};
use serde_json::Value;

use crate::errors::StoreError;

/// Comparison applied by a [`QueryCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    /// Field equals the value.
    #[serde(rename = "$eq")]
    Eq,
    /// Field equals one of the values. An empty list matches nothing.
    #[serde(rename = "$in")]
    In,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::In => "$in",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{key: {op: value}}` predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryCondition {
    pub key: String,
    pub op: Operator,
    pub value: Value,
    /// Set when the operand could not be encoded; the query fails before it
    /// reaches the store.
    #[serde(skip)]
    encode_error: Option<String>,
}

impl QueryCondition {
    pub fn new(key: impl Into<String>, op: Operator, value: Value) -> Self {
        Self {
            key: key.into(),
            op,
            value,
            encode_error: None,
        }
    }

    /// Builds a condition from any serializable operand.
    pub fn encode<V: Serialize + ?Sized>(key: impl Into<String>, op: Operator, operand: &V) -> Self {
        match serde_json::to_value(operand) {
            Ok(value) => Self::new(key, op, value),
            Err(err) => Self {
                encode_error: Some(err.to_string()),
                ..Self::new(key, op, Value::Null)
            },
        }
    }

    /// The encoding failure carried by this condition, if any.
    pub fn encode_error(&self) -> Option<StoreError> {
        self.encode_error
            .as_ref()
            .map(|message| StoreError::Encode(serde_json::Error::custom(format!("`{}`: {message}", self.key))))
    }
}

/// Handle binding a declared field to its serialization key.
///
/// Generated DAO accessors return these so application code never spells a
/// storage key as a string literal.
pub struct Field<T> {
    name: &'static str,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    pub const fn new(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            key,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &'static str {
        self.key
    }
}

impl<T: Serialize> Field<T> {
    pub fn eq(&self, value: T) -> QueryCondition {
        QueryCondition::encode(self.key, Operator::Eq, &value)
    }

    pub fn is_in<I>(&self, values: I) -> QueryCondition
    where
        I: IntoIterator<Item = T>,
    {
        let values: Vec<T> = values.into_iter().collect();
        QueryCondition::encode(self.key, Operator::In, &values)
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eq_builds_condition_on_key() {
        let name: Field<String> = Field::new("Name", "name");
        let condition = name.eq("Ann".to_string());
        assert_eq!(condition.key, "name");
        assert_eq!(condition.op, Operator::Eq);
        assert_eq!(condition.value, json!("Ann"));
    }

    #[test]
    fn is_in_collects_values() {
        let age: Field<i64> = Field::new("Age", "age");
        let condition = age.is_in([30, 40]);
        assert_eq!(condition.op, Operator::In);
        assert_eq!(condition.value, json!([30, 40]));
    }

    #[test]
    fn empty_is_in_keeps_empty_list() {
        let age: Field<i64> = Field::new("Age", "age");
        let condition = age.is_in(Vec::new());
        assert_eq!(condition.key, "age");
        assert_eq!(condition.value, json!([]));
    }

    #[derive(Serialize)]
    struct Address {
        city: String,
        zip: u32,
    }

    #[test]
    fn record_fields_encode_as_objects() {
        let address: Field<Address> = Field::new("Address", "address");
        let condition = address.eq(Address {
            city: "Oslo".into(),
            zip: 150,
        });
        assert_eq!(condition.value, json!({"city": "Oslo", "zip": 150}));
        assert!(condition.encode_error().is_none());
    }

    #[test]
    fn char_and_wide_integer_fields_have_conditions() {
        let grade: Field<char> = Field::new("grade", "grade");
        let total: Field<u128> = Field::new("total", "total");
        assert_eq!(grade.is_in(['a', 'b']).value, json!(["a", "b"]));
        assert_eq!(total.eq(7).value, json!(7));
    }

    #[test]
    fn unencodable_operand_is_kept_as_error() {
        use std::collections::HashMap;

        let lookup: Field<HashMap<Vec<u8>, i64>> = Field::new("lookup", "lookup");
        let condition = lookup.eq(HashMap::from([(vec![1u8], 1)]));
        assert_eq!(condition.value, Value::Null);
        assert!(matches!(condition.encode_error(), Some(StoreError::Encode(_))));
    }

    #[test]
    fn optional_fields_accept_none() {
        let nickname: Field<Option<String>> = Field::new("nickname", "nickname");
        assert_eq!(nickname.eq(None).value, Value::Null);
    }
}
