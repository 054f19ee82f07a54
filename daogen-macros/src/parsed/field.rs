use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Error, Field, Ident, LitStr, Result, Type, ext::IdentExt, spanned::Spanned};

pub(crate) struct ParsedField {
    ident: Ident,
    /// Declared name without any `r#` prefix.
    name: String,
    tag: Option<String>,
    embed: bool,
    ty: Type,
}

impl ParsedField {
    pub(crate) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "Entity requires named fields"))?;
        let name = ident.unraw().to_string();
        let mut tag = None;
        let mut embed = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("daogen") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("tag") {
                    if tag.is_some() {
                        return Err(meta.error("duplicate `tag`"));
                    }
                    let value: LitStr = meta.value()?.parse()?;
                    tag = Some(value.value());
                } else if meta.path.is_ident("embed") {
                    embed = true;
                } else {
                    return Err(meta.error("unknown daogen field attribute, expected `tag` or `embed`"));
                }
                Ok(())
            })?;
        }

        if embed && tag.is_some() {
            return Err(Error::new(
                ident.span(),
                "#[daogen(embed)] fields contribute their own fields and cannot carry a tag",
            ));
        }

        Ok(Self {
            ident,
            name,
            tag,
            embed,
            ty: field.ty.clone(),
        })
    }

    pub(crate) fn is_default_tokens(&self) -> TokenStream2 {
        let ident = &self.ident;
        quote! { ::daogen::IsDefault::is_default(&self.#ident) }
    }

    pub(crate) fn schema_node_tokens(&self) -> TokenStream2 {
        let name = &self.name;
        let ty = &self.ty;
        if self.embed {
            quote! {
                ::daogen::schema::SchemaNode::embedded(
                    #name,
                    <#ty as ::daogen::schema::Entity>::schema_nodes(),
                )
            }
        } else {
            let tag = self.tag_tokens();
            quote! {
                ::daogen::schema::SchemaNode::field(
                    #name,
                    #tag,
                    ::daogen::schema::type_signature(stringify!(#ty)),
                )
            }
        }
    }

    pub(crate) fn set_field_tokens(&self) -> TokenStream2 {
        let ident = &self.ident;
        let ty = &self.ty;
        if self.embed {
            return quote! {
                <#ty as ::daogen::schema::Entity>::write_set_fields(&self.#ident, doc)?;
            };
        }
        let key = self.key_tokens();
        quote! {
            if !::daogen::IsDefault::is_default(&self.#ident) {
                doc.insert(#key, ::daogen::serde_json::to_value(&self.#ident)?);
            }
        }
    }

    pub(crate) fn field_entry_tokens(&self) -> TokenStream2 {
        let ident = &self.ident;
        let ty = &self.ty;
        if self.embed {
            return quote! {
                if let ::std::option::Option::Some(entry) =
                    <#ty as ::daogen::schema::Entity>::field_entry(&self.#ident, name)
                {
                    return ::std::option::Option::Some(entry);
                }
            };
        }
        let name = &self.name;
        let key = self.key_tokens();
        quote! {
            if name == #name {
                return ::std::option::Option::Some(
                    ::daogen::serde_json::to_value(&self.#ident).map(|value| (#key, value)),
                );
            }
        }
    }

    fn tag_tokens(&self) -> TokenStream2 {
        match &self.tag {
            Some(tag) => quote! { ::std::option::Option::Some(#tag) },
            None => quote! { ::std::option::Option::None },
        }
    }

    fn key_tokens(&self) -> TokenStream2 {
        let name = &self.name;
        let tag = self.tag_tokens();
        quote! { ::daogen::schema::resolve_key(#tag, #name) }
    }
}
