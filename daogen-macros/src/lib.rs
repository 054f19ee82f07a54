use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod parsed;

use parsed::ParsedEntity;

/// Derives `daogen::Entity` (and `daogen::IsDefault`) for a struct with named fields.
///
/// Field attributes:
/// - `#[daogen(tag = "key,options")]` sets the serialization key. A tag ending in
///   `,` is ignored and the key is derived from the field name.
/// - `#[daogen(embed)]` splices the fields of another `Entity` in place.
#[proc_macro_derive(Entity, attributes(daogen))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedEntity::from_input(&input) {
        Ok(parsed) => parsed.emit().into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `daogen::IsDefault`: a record is default when every member is.
#[proc_macro_derive(IsDefault, attributes(daogen))]
pub fn derive_is_default(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match ParsedEntity::from_input(&input) {
        Ok(parsed) => parsed.emit_is_default().into(),
        Err(err) => err.to_compile_error().into(),
    }
}
