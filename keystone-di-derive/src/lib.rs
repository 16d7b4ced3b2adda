use crate::provider::expand_provider_metadata;
use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, Error};

mod attributes;
mod provider;

#[proc_macro_derive(ProviderMetadata, attributes(provider))]
pub fn generate_provider_metadata(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_provider_metadata(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}
