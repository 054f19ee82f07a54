//! Source scanner that reads an entity schema straight from Rust source.
//!
//! Mirrors what `#[derive(Entity)]` records at compile time, so a generated
//! Model file can be checked without compiling it.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result, bail};
use daogen::{EntitySchema, SchemaError, SchemaNode, schema::type_signature};
use quote::quote;
use syn::{Attribute, Fields, Item, ItemStruct, LitStr, Type, ext::IdentExt};

/// Scan `src` for the struct named `struct_name` and build its schema.
///
/// Structs referenced through `#[daogen(embed)]` must live in the same source.
pub fn scan_source(src: &str, struct_name: &str) -> Result<EntitySchema> {
    let syntax = syn::parse_file(src).context("Failed to parse source")?;

    let mut structs = HashMap::new();
    let mut others = Vec::new();
    for item in &syntax.items {
        match item {
            Item::Struct(item) => {
                structs.insert(item.ident.unraw().to_string(), item);
            }
            Item::Enum(item) => others.push(item.ident.unraw().to_string()),
            Item::Union(item) => others.push(item.ident.unraw().to_string()),
            _ => {}
        }
    }

    let Some(item) = structs.get(struct_name) else {
        if others.iter().any(|name| name == struct_name) {
            return Err(SchemaError::NotAStruct {
                name: struct_name.to_string(),
            }
            .into());
        }
        bail!("no struct named `{struct_name}` in source");
    };

    let mut stack = vec![struct_name.to_string()];
    let nodes = struct_nodes(item, &structs, &mut stack)?;
    Ok(EntitySchema::from_nodes(struct_name, &nodes)?)
}

/// Scan a single Rust file for the struct named `struct_name`.
pub fn scan_file(path: impl AsRef<Path>, struct_name: &str) -> Result<EntitySchema> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    scan_source(&content, struct_name).with_context(|| format!("Failed to scan {}", path.display()))
}

fn struct_nodes(item: &ItemStruct, structs: &HashMap<String, &ItemStruct>, stack: &mut Vec<String>) -> Result<Vec<SchemaNode>> {
    let fields = match &item.fields {
        Fields::Named(named) => &named.named,
        Fields::Unit => return Ok(Vec::new()),
        Fields::Unnamed(_) => {
            return Err(SchemaError::NotAStruct {
                name: item.ident.unraw().to_string(),
            }
            .into());
        }
    };

    let mut nodes = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = &field.ident else { continue };
        let name = ident.unraw().to_string();
        let attrs = field_attrs(&field.attrs).with_context(|| format!("Invalid daogen attribute on `{name}`"))?;

        if attrs.embed {
            let target = type_name(&field.ty).with_context(|| format!("Embedded field `{name}` has no struct type"))?;
            let embedded = structs
                .get(&target)
                .ok_or_else(|| SchemaError::MissingEmbedded { name: target.clone() })?;
            if stack.contains(&target) {
                bail!("embedding cycle through `{target}`");
            }
            stack.push(target);
            let inner = struct_nodes(embedded, structs, stack)?;
            stack.pop();
            nodes.push(SchemaNode::embedded(name, inner));
        } else {
            let ty = &field.ty;
            let signature = type_signature(&quote!(#ty).to_string());
            nodes.push(SchemaNode::field(name, attrs.tag.as_deref(), signature));
        }
    }
    Ok(nodes)
}

#[derive(Default)]
struct FieldAttrs {
    tag: Option<String>,
    embed: bool,
}

fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs {
        if !attr.path().is_ident("daogen") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value: LitStr = meta.value()?.parse()?;
                parsed.tag = Some(value.value());
            } else if meta.path.is_ident("embed") {
                parsed.embed = true;
            } else {
                return Err(meta.error("expected `tag` or `embed`"));
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

/// Last path segment of a plain path type (`audit::Audit` -> `Audit`).
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last().map(|seg| seg.ident.unraw().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
        struct Audit {
            #[daogen(tag = "created")]
            created_at: i64,
            #[daogen(embed)]
            owner: Owner,
        }

        struct Owner {
            owner_id: String,
        }

        pub struct Account {
            #[daogen(tag = "id")]
            ID: i64,
            #[daogen(embed)]
            audit: Audit,
            #[daogen(tag = "name,")]
            Name: String,
            r#type: Option<Vec<u8>>,
        }

        enum Kind { A, B }
        struct Pair(i64, i64);
        struct Loop { #[daogen(embed)] inner: Loop }
        struct Dangling { #[daogen(embed)] other: Missing }
    "#;

    #[test]
    fn embedded_structs_are_flattened_in_order() {
        let schema = scan_source(SOURCE, "Account").unwrap();
        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        let keys: Vec<_> = schema.keys().collect();
        assert_eq!(names, ["ID", "created_at", "owner_id", "Name", "type"]);
        assert_eq!(keys, ["id", "created", "ownerId", "name", "type"]);
        assert_eq!(schema.field("type").unwrap().ty, "Option<Vec<u8>>");
    }

    #[test]
    fn non_struct_items_are_schema_errors() {
        for name in ["Kind", "Pair"] {
            let err = scan_source(SOURCE, name).unwrap_err();
            assert_eq!(
                err.downcast_ref::<SchemaError>(),
                Some(&SchemaError::NotAStruct { name: name.into() })
            );
        }
    }

    #[test]
    fn missing_embedded_struct_is_reported() {
        let err = scan_source(SOURCE, "Dangling").unwrap_err();
        assert_eq!(
            err.downcast_ref::<SchemaError>(),
            Some(&SchemaError::MissingEmbedded { name: "Missing".into() })
        );
    }

    #[test]
    fn embedding_cycles_are_rejected() {
        let err = scan_source(SOURCE, "Loop").unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn unknown_struct_is_an_error() {
        assert!(scan_source(SOURCE, "Nope").is_err());
    }
}
