// Code generated by daogen-build. DO NOT EDIT.

use crate::model::user::User;
use daogen::{Collection, Context, Field, Query, QueryCondition};

#[allow(non_camel_case_types)]
#[derive(Debug, Default)]
pub struct user {
    query: Query<User>,
}

#[allow(non_upper_case_globals)]
pub const User: user = user { query: Query::new() };

#[allow(non_snake_case)]
impl user {
    pub fn collection<C: Collection>(self, collection: C) -> Query<User, C> {
        self.query.collection(collection)
    }

    pub fn with_context(self, ctx: Context) -> Query<User> {
        self.query.with_context(ctx)
    }

    pub fn filter(self, condition: QueryCondition) -> Query<User> {
        self.query.filter(condition)
    }

    pub fn into_query(self) -> Query<User> {
        self.query
    }

    pub fn ID(&self) -> Field<i64> {
        Field::new("ID", "id")
    }

    pub fn Name(&self) -> Field<String> {
        Field::new("Name", "name")
    }
}
