//! # Fieldwork Macros
//!
//! Procedural macros for `fieldwork-core`.
//!
//! ## `#[validator]`
//!
//! Turns a plain check function into a constructor of a named
//! `fieldwork_core::Validator`:
//!
//! ```ignore
//! use fieldwork_core::{InvalidValue, Value};
//!
//! #[validator(message = "'{name}' must be even")]
//! fn even(value: &Value) -> Result<(), InvalidValue> {
//!     match value {
//!         Value::Int(n) if n % 2 == 0 => Ok(()),
//!         _ => Err(InvalidValue::custom("odd")),
//!     }
//! }
//!
//! let field = IntegerField::new().validator(even()).build()?;
//! ```
//!
//! A function taking `(value, field, instance)` becomes a context validator
//! (`Validator::with_context`).

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, ItemFn, LitStr};

/// Wrap a check function into a `Validator` constructor
///
/// Accepted attribute arguments:
///
/// - `message = "..."`: failure message template
/// - `name = "..."`: validator name (defaults to the function name)
///
/// # Usage
///
/// ```ignore
/// #[validator]
/// fn not_admin(value: &Value) -> Result<(), InvalidValue> { ... }
///
/// #[validator(message = "{name} must differ from the start date")]
/// fn after_start(value: &Value, field: Option<&Field>, instance: Option<&DataClass>)
///     -> Result<(), InvalidValue> { ... }
/// ```
#[proc_macro_attribute]
pub fn validator(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut message: Option<LitStr> = None;
    let mut name: Option<LitStr> = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("message") {
            message = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("expected `message = \"...\"` or `name = \"...\"`"))
        }
    });
    parse_macro_input!(attr with parser);

    let function = parse_macro_input!(item as ItemFn);
    expand(function, name, message)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(
    mut function: ItemFn,
    name: Option<LitStr>,
    message: Option<LitStr>,
) -> syn::Result<proc_macro2::TokenStream> {
    let constructor = match function.sig.inputs.len() {
        1 => quote!(::fieldwork_core::Validator::new),
        3 => quote!(::fieldwork_core::Validator::with_context),
        _ => {
            return Err(syn::Error::new_spanned(
                &function.sig.inputs,
                "a validator takes `(value)` or `(value, field, instance)`",
            ))
        }
    };
    if !function.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &function.sig.generics,
            "validators cannot be generic",
        ));
    }

    let vis = function.vis.clone();
    let attrs = std::mem::take(&mut function.attrs);
    let outer = function.sig.ident.clone();
    let inner = format_ident!("__{}_check", outer);
    function.sig.ident = inner.clone();
    function.vis = syn::Visibility::Inherited;

    let name = name.map_or_else(|| outer.to_string(), |lit| lit.value());
    let message = message.map(|lit| quote!(.message(#lit)));

    Ok(quote! {
        #(#attrs)*
        #[must_use]
        #vis fn #outer() -> ::fieldwork_core::Validator {
            #function
            #constructor(#name, #inner) #message
        }
    })
}
