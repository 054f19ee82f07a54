use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Generics, Ident, Result, ext::IdentExt};

use super::ParsedField;

pub(crate) struct ParsedEntity {
    ident: Ident,
    name: String,
    generics: Generics,
    fields: Vec<ParsedField>,
}

impl ParsedEntity {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named
                    .named
                    .iter()
                    .map(ParsedField::from_field)
                    .collect::<Result<Vec<_>>>()?,
                Fields::Unit => Vec::new(),
                Fields::Unnamed(_) => return Err(Error::new(input.ident.span(), "input is not a struct with named fields")),
            },
            _ => return Err(Error::new(input.ident.span(), "input is not a struct")),
        };

        Ok(Self {
            ident: input.ident.clone(),
            name: input.ident.unraw().to_string(),
            generics: input.generics.clone(),
            fields,
        })
    }

    pub(crate) fn emit_is_default(&self) -> TokenStream2 {
        let ident = &self.ident;
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
        let checks = self.fields.iter().map(ParsedField::is_default_tokens);

        quote! {
            impl #impl_generics ::daogen::IsDefault for #ident #ty_generics #where_clause {
                fn is_default(&self) -> bool {
                    true #(&& #checks)*
                }
            }
        }
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let ident = &self.ident;
        let name = &self.name;
        let (impl_generics, ty_generics, where_clause) = self.generics.split_for_impl();
        let nodes = self.fields.iter().map(ParsedField::schema_node_tokens);
        let set_fields = self.fields.iter().map(ParsedField::set_field_tokens);
        let entries = self.fields.iter().map(ParsedField::field_entry_tokens);
        let is_default = self.emit_is_default();

        quote! {
            #is_default

            impl #impl_generics ::daogen::schema::Entity for #ident #ty_generics #where_clause {
                const NAME: &'static str = #name;

                fn schema_nodes() -> ::std::vec::Vec<::daogen::schema::SchemaNode> {
                    ::std::vec![#(#nodes),*]
                }

                #[allow(unused_variables)]
                fn write_set_fields(
                    &self,
                    doc: &mut ::daogen::store::Document,
                ) -> ::std::result::Result<(), ::daogen::serde_json::Error> {
                    #(#set_fields)*
                    ::std::result::Result::Ok(())
                }

                #[allow(unused_variables)]
                fn field_entry(
                    &self,
                    name: &str,
                ) -> ::std::option::Option<
                    ::std::result::Result<
                        (::std::string::String, ::daogen::serde_json::Value),
                        ::daogen::serde_json::Error,
                    >,
                > {
                    #(#entries)*
                    ::std::option::Option::None
                }
            }
        }
    }
}
