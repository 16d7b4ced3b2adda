use crate::attributes::ProviderAttributes;
use convert_case::{Case, Casing};
use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{Attribute, DeriveInput, Error, Expr, ExprArray, ExprLit, Lit, LitStr, Result};

const PROVIDER: &str = "provider";

fn extract_provider_attributes(attributes: &[Attribute]) -> Result<Option<ProviderAttributes>> {
    let mut provider_attributes = attributes
        .iter()
        .filter(|attribute| attribute.path().is_ident(PROVIDER));

    let attributes = provider_attributes
        .next()
        .map(ProviderAttributes::try_from)
        .transpose()?;

    if let Some(duplicate) = provider_attributes.next() {
        return Err(Error::new(
            duplicate.span(),
            "Only a single #[provider] attribute is allowed!",
        ));
    }

    Ok(attributes)
}

fn string_literals(array: &ExprArray) -> Result<Vec<LitStr>> {
    array
        .elems
        .iter()
        .map(|elem| {
            if let Expr::Lit(ExprLit {
                lit: Lit::Str(string),
                ..
            }) = elem
            {
                Ok(string.clone())
            } else {
                Err(Error::new(elem.span(), "Expected a string literal!"))
            }
        })
        .try_collect()
}

fn generate_name(name: Option<LitStr>, ident: &Ident) -> LitStr {
    name.unwrap_or_else(|| LitStr::new(&ident.to_string().to_case(Case::Snake), ident.span()))
}

fn generate_list_function(function: &Ident, values: Option<&ExprArray>) -> Result<TokenStream> {
    Ok(match values {
        Some(values) => {
            let values = string_literals(values)?;
            quote! {
                fn #function(&self) -> Vec<&'static str> {
                    vec![#(#values),*]
                }
            }
        }
        None => quote!(),
    })
}

pub fn expand_provider_metadata(input: &DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;
    let attributes = extract_provider_attributes(&input.attrs)?;
    let (name, requires, providers, is_core) = match attributes {
        Some(ProviderAttributes {
            name,
            requires,
            providers,
            is_core,
        }) => (name, requires, providers, is_core),
        None => (None, None, None, false),
    };

    let name = generate_name(name, ident);
    let requires = generate_list_function(&Ident::new("requires", ident.span()), requires.as_ref())?;
    let providers =
        generate_list_function(&Ident::new("providers", ident.span()), providers.as_ref())?;

    let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();

    let core_registration = if is_core {
        if !input.generics.params.is_empty() {
            return Err(Error::new(
                input.generics.span(),
                "Core providers cannot be generic!",
            ));
        }

        quote! {
            const _: () = {
                fn create() -> keystone_di::provider::ProviderPtr {
                    std::sync::Arc::new(<#ident as std::default::Default>::default())
                }

                keystone_di::provider::internal::submit! {
                    keystone_di::provider::internal::CoreProviderRegisterer {
                        name: #name,
                        create,
                    }
                };
            };
        }
    } else {
        quote!()
    };

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics keystone_di::provider::ProviderMetadata for #ident #type_generics #where_clause {
            fn name(&self) -> &'static str {
                #name
            }

            #requires

            #providers
        }

        #core_registration
    })
}
