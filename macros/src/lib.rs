//! Procedural macros for on-device testing of cardputer-wifi-setup.
//!
//! Provides `#[tap_test]`, which registers a function with the TAP runner in
//! `cardputer_wifi_setup::testing` so the same test body can run on the host
//! and on the Cardputer through the `device-tests` binary.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Expr, ExprLit, ItemFn, Lit, Meta, ReturnType};

/// Register a function as a TAP test.
///
/// Tests either return `()` (a panic is a failure) or a `Result` whose `Err`
/// is a failure.
///
/// # Attributes
///
/// - `#[tap_test]`
/// - `#[tap_test(should_panic)]`
/// - `#[tap_test(should_panic = "expected message")]`
///
/// # Example
///
/// ```ignore
/// use cardputer_wifi_setup_macros::tap_test;
///
/// #[tap_test]
/// fn tag_matches_known_value() {
///     assert_eq!(cardputer_wifi_setup::integrity_tag(""), 5381);
/// }
/// ```
#[proc_macro_attribute]
pub fn tap_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);

    let fn_name = &input_fn.sig.ident;
    let fn_name_str = fn_name.to_string();
    let fn_block = &input_fn.block;
    let fn_vis = &input_fn.vis;
    let fn_attrs = &input_fn.attrs;
    let fn_output = &input_fn.sig.output;
    let returns_result = matches!(fn_output, ReturnType::Type(_, _));

    let expectation = match parse_expectation(attr) {
        Ok(expectation) => expectation,
        Err(err) => return err.to_compile_error().into(),
    };

    let register_call = match expectation {
        Expectation::Pass if returns_result => quote! {
            runner.run(#fn_name_str, #fn_name);
        },
        Expectation::Pass => quote! {
            runner.run_assert(#fn_name_str, #fn_name);
        },
        Expectation::Panic(None) => quote! {
            runner.run_should_panic(#fn_name_str, #fn_name, None);
        },
        Expectation::Panic(Some(msg)) => quote! {
            runner.run_should_panic(#fn_name_str, #fn_name, Some(#msg));
        },
    };

    let expanded = quote! {
        #(#fn_attrs)*
        #fn_vis fn #fn_name() #fn_output #fn_block

        ::inventory::submit! {
            ::cardputer_wifi_setup::testing::TapTestEntry::new(
                #fn_name_str,
                |runner: &mut ::cardputer_wifi_setup::testing::TestRunner| {
                    #register_call
                }
            )
        }
    };

    TokenStream::from(expanded)
}

enum Expectation {
    Pass,
    Panic(Option<String>),
}

fn parse_expectation(attr: TokenStream) -> syn::Result<Expectation> {
    if attr.is_empty() {
        return Ok(Expectation::Pass);
    }

    let meta: Meta = syn::parse(attr)?;
    if !meta.path().is_ident("should_panic") {
        return Err(syn::Error::new_spanned(
            meta.path(),
            "tap_test: unknown attribute, expected `should_panic` or `should_panic = \"message\"`",
        ));
    }

    match meta {
        Meta::Path(_) => Ok(Expectation::Panic(None)),
        Meta::NameValue(nv) => match nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => Ok(Expectation::Panic(Some(s.value()))),
            other => Err(syn::Error::new_spanned(
                other,
                "tap_test: should_panic expects a string literal",
            )),
        },
        Meta::List(list) => Err(syn::Error::new_spanned(
            list,
            "tap_test: use `should_panic` or `should_panic = \"message\"`",
        )),
    }
}
