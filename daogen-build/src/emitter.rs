//! Renders the Model and DAO source for an entity schema.
//!
//! Rendering is pure: the same schema and config always produce the same text,
//! and nothing touches the filesystem here.

use daogen::{
    EntitySchema, FieldMetadata,
    case::{lower_camel_case, upper_camel_case},
};
use log::debug;
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::{Path, Type};

use crate::{config::GeneratorConfig, error::GenerateError};

/// Banner placed at the top of every generated file.
pub const HEADER: &str = "// Code generated by daogen-build. DO NOT EDIT.\n\n";

/// Query entry points generated on every DAO; accessors may not reuse them.
pub const RESERVED_NAMES: &[&str] = &["collection", "with_context", "filter", "into_query"];

/// Both artifacts for one entity, fully rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// File stem shared by both files (`lower_camel_case` of the entity name).
    pub file_stem: String,
    pub dao: String,
    pub model: String,
}

pub fn render(schema: &EntitySchema, config: &GeneratorConfig) -> Result<Rendered, GenerateError> {
    let rendered = Rendered {
        file_stem: lower_camel_case(&schema.name),
        dao: render_dao(schema, config)?,
        model: render_model(schema)?,
    };
    debug!(
        "rendered {} ({} fields) as {}.rs",
        schema.name,
        schema.fields.len(),
        rendered.file_stem
    );
    Ok(rendered)
}

pub fn render_model(schema: &EntitySchema) -> Result<String, GenerateError> {
    let model_ident = ident(&upper_camel_case(&schema.name))?;
    let members = schema
        .fields
        .iter()
        .map(|field| {
            let name = ident(&field.name)?;
            let ty = parse_type(field)?;
            let key = &field.key;
            Ok(quote! {
                #[serde(rename = #key)]
                #[daogen(tag = #key)]
                pub #name: #ty,
            })
        })
        .collect::<Result<Vec<TokenStream>, GenerateError>>()?;

    let allow_case = if schema.fields.iter().any(|field| field.name.chars().any(char::is_uppercase)) {
        quote! { #[allow(non_snake_case)] }
    } else {
        quote! {}
    };

    let output = quote! {
        use daogen::Entity;
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Entity)]
        #[serde(default)]
        #allow_case
        pub struct #model_ident {
            #(#members)*
        }
    };

    unparse(output)
}

pub fn render_dao(schema: &EntitySchema, config: &GeneratorConfig) -> Result<String, GenerateError> {
    let file_stem = lower_camel_case(&schema.name);
    let receiver = ident(&file_stem)?;
    let model_ident = ident(&upper_camel_case(&schema.name))?;
    let model_module: Path = syn::parse_str(&config.model_module)?;
    let model_file = ident(&file_stem)?;

    let accessors = schema
        .fields
        .iter()
        .map(|field| {
            if RESERVED_NAMES.contains(&field.name.as_str()) {
                return Err(GenerateError::ReservedName {
                    field: field.name.clone(),
                });
            }
            let method = ident(&field.name)?;
            let ty = parse_type(field)?;
            let name = &field.name;
            let key = &field.key;
            Ok(quote! {
                pub fn #method(&self) -> Field<#ty> {
                    Field::new(#name, #key)
                }
            })
        })
        .collect::<Result<Vec<TokenStream>, GenerateError>>()?;

    let output = quote! {
        use #model_module::#model_file::#model_ident;
        use daogen::{Collection, Context, Field, Query, QueryCondition};

        #[allow(non_camel_case_types)]
        #[derive(Debug, Default)]
        pub struct #receiver {
            query: Query<#model_ident>,
        }

        #[allow(non_upper_case_globals)]
        pub const #model_ident: #receiver = #receiver { query: Query::new() };

        #[allow(non_snake_case)]
        impl #receiver {
            pub fn collection<C: Collection>(self, collection: C) -> Query<#model_ident, C> {
                self.query.collection(collection)
            }

            pub fn with_context(self, ctx: Context) -> Query<#model_ident> {
                self.query.with_context(ctx)
            }

            pub fn filter(self, condition: QueryCondition) -> Query<#model_ident> {
                self.query.filter(condition)
            }

            pub fn into_query(self) -> Query<#model_ident> {
                self.query
            }

            #(#accessors)*
        }
    };

    unparse(output)
}

/// Identifier for a declared name, falling back to a raw identifier for keywords.
fn ident(name: &str) -> Result<Ident, GenerateError> {
    syn::parse_str::<Ident>(name)
        .or_else(|_| syn::parse_str::<Ident>(&format!("r#{name}")))
        .map_err(|_| GenerateError::InvalidName { name: name.to_string() })
}

fn parse_type(field: &FieldMetadata) -> Result<Type, GenerateError> {
    syn::parse_str(&field.ty).map_err(|_| GenerateError::InvalidType {
        field: field.name.clone(),
        ty: field.ty.clone(),
    })
}

fn unparse(tokens: TokenStream) -> Result<String, GenerateError> {
    let file: syn::File = syn::parse2(tokens)?;
    Ok(format!("{HEADER}{}", prettyplease::unparse(&file)))
}
