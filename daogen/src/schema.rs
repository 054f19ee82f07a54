//! Entity schema description and flattening.
//!
//! `#[derive(Entity)]` emits a list of [`SchemaNode`]s for a struct: one node per
//! declared field, with `#[daogen(embed)]` fields carrying the embedded struct's
//! own nodes. [`flatten`] turns that tree into the ordered leaf list the code
//! emitter consumes.

use std::collections::HashMap;

use serde_json::Value;

use crate::{case::lower_camel_case, default::IsDefault, errors::SchemaError, store::Document};

/// Separator between the key and the options of a field tag (`"name,omitempty"`).
pub const TAG_SEPARATOR: char = ',';

/// One leaf field of a persisted entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    /// Declared field name.
    pub name: String,
    /// Key used when persisting and querying.
    pub key: String,
    /// Rust type signature of the field.
    pub ty: String,
}

/// A declared field or an embedded sub-schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Field {
        name: String,
        tag: Option<String>,
        ty: String,
    },
    Embedded {
        name: String,
        nodes: Vec<SchemaNode>,
    },
}

impl SchemaNode {
    pub fn field(name: impl Into<String>, tag: Option<&str>, ty: impl Into<String>) -> Self {
        Self::Field {
            name: name.into(),
            tag: tag.map(str::to_string),
            ty: ty.into(),
        }
    }

    pub fn embedded(name: impl Into<String>, nodes: Vec<SchemaNode>) -> Self {
        Self::Embedded {
            name: name.into(),
            nodes,
        }
    }
}

/// Trait implemented by `#[derive(Entity)]`.
///
/// It exposes the compile-time schema of a record together with the per-member
/// access the query builder needs for sparse updates and upserts.
pub trait Entity: IsDefault {
    /// Declared type name.
    const NAME: &'static str;

    fn schema_nodes() -> Vec<SchemaNode>;

    /// Inserts every member that is not at its default value, keyed by its
    /// serialization key. Embedded members contribute their own fields.
    fn write_set_fields(&self, doc: &mut Document) -> Result<(), serde_json::Error>;

    /// Looks up a leaf member by declared name, returning its serialization key
    /// and current value.
    fn field_entry(&self, name: &str) -> Option<Result<(String, Value), serde_json::Error>>;

    /// Sparse document of the members that differ from their default.
    fn set_fields(&self) -> Result<Document, serde_json::Error> {
        let mut doc = Document::new();
        self.write_set_fields(&mut doc)?;
        Ok(doc)
    }
}

/// Resolves the serialization key for a field.
///
/// A tag that is present, non-empty and does not end with [`TAG_SEPARATOR`]
/// supplies the key (the text before the first separator). Anything else falls
/// back to the lower camel case of the field name, so `"name,"` never yields an
/// empty key.
pub fn resolve_key(tag: Option<&str>, field_name: &str) -> String {
    match tag {
        Some(tag) if !tag.is_empty() && !tag.ends_with(TAG_SEPARATOR) => {
            tag.split(TAG_SEPARATOR).next().unwrap_or(tag).to_string()
        }
        _ => lower_camel_case(field_name),
    }
}

/// Normalizes a stringified type to the way it is written by hand.
///
/// Whitespace is kept only between two identifier-like characters, and commas
/// are followed by a single space: `Option < Vec < u8 > >` -> `Option<Vec<u8>>`,
/// `HashMap<String,i64>` -> `HashMap<String, i64>`.
pub fn type_signature(raw: &str) -> String {
    fn word(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '\''
    }

    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && out.chars().next_back().is_some_and(word) && word(ch) {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
        if ch == ',' {
            out.push(' ');
        }
    }
    out.trim_end().to_string()
}

/// Depth-first flattening with embedded fields spliced in place.
pub fn flatten(nodes: &[SchemaNode]) -> Vec<FieldMetadata> {
    let mut fields = Vec::new();
    flatten_into(nodes, &mut fields);
    fields
}

fn flatten_into(nodes: &[SchemaNode], fields: &mut Vec<FieldMetadata>) {
    for node in nodes {
        match node {
            SchemaNode::Field { name, tag, ty } => fields.push(FieldMetadata {
                name: name.clone(),
                key: resolve_key(tag.as_deref(), name),
                ty: ty.clone(),
            }),
            SchemaNode::Embedded { nodes, .. } => flatten_into(nodes, fields),
        }
    }
}

/// Entity name plus its flattened, ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: String,
    pub fields: Vec<FieldMetadata>,
}

impl EntitySchema {
    /// Builds a schema, rejecting duplicate serialization keys.
    pub fn new(name: impl Into<String>, fields: Vec<FieldMetadata>) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for field in &fields {
            if let Some(first) = seen.insert(&field.key, &field.name) {
                return Err(SchemaError::DuplicateKey {
                    entity: name.clone(),
                    key: field.key.clone(),
                    first: first.to_string(),
                    second: field.name.clone(),
                });
            }
        }
        Ok(Self { name, fields })
    }

    pub fn from_nodes(name: impl Into<String>, nodes: &[SchemaNode]) -> Result<Self, SchemaError> {
        Self::new(name, flatten(nodes))
    }

    pub fn of<T: Entity>() -> Result<Self, SchemaError> {
        Self::from_nodes(T::NAME, &T::schema_nodes())
    }

    /// Introspects the type of a sample value.
    pub fn introspect<T: Entity>(_sample: &T) -> Result<Self, SchemaError> {
        Self::of::<T>()
    }

    pub fn field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.key.as_str())
    }
}
