use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::{Expr, ExprLit, ItemFn, Lit, Meta, MetaNameValue};

/// Declare a fixed-interval routine that [`PoolBuilder::register_all`] starts automatically.
///
/// The function must be a plain synchronous `fn()` with no arguments. Each
/// step calls it once and then waits `every`.
///
/// # Examples
///
/// ```rust,ignore
/// use routine_pool::routine;
///
/// #[routine(every = "100ms")]
/// fn heartbeat() {
///     println!("beat");
/// }
///
/// #[routine(every = "${jobs.flush.interval:2s}", workers = "0..=1", initial_delay = 500)]
/// fn flush() {
///     println!("flushing");
/// }
/// ```
///
/// # Parameters
///
/// - `every`: interval between calls; shorthand ("500ms", "2s", "1m") or milliseconds
/// - `workers`: `"all"` (default), `"N"`, `"A..=B"` or `"A-B"`
/// - `initial_delay`: wait before the first call (default 0)
/// - `enabled`: enable/disable the routine (boolean or config placeholder)
///
/// [`PoolBuilder::register_all`]: https://docs.rs/routine-pool
#[proc_macro_attribute]
pub fn routine(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = syn::parse_macro_input!(input as ItemFn);
    let attr_args = syn::parse_macro_input!(args with Punctuated::<Meta, syn::Token![,]>::parse_terminated);

    match expand_routine(&attr_args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand_routine(
    attr_args: &Punctuated<Meta, syn::Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let sig = &input_fn.sig;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(sig.fn_token, "#[routine] functions must not be async"));
    }
    if !sig.inputs.is_empty() {
        return Err(syn::Error::new_spanned(&sig.inputs, "#[routine] functions take no arguments"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(&sig.generics, "#[routine] functions cannot be generic"));
    }

    let fn_name = &sig.ident;
    let args = parse_routine_args(attr_args)?;
    let every = args.every.ok_or_else(|| {
        syn::Error::new_spanned(fn_name, "#[routine] requires `every = ...`")
    })?;
    let initial_delay = args.initial_delay.unwrap_or_else(|| "0".to_string());
    let workers = args.workers.unwrap_or_else(|| "all".to_string());
    let enabled = args.enabled.unwrap_or_else(|| "true".to_string());

    let register_fn_name = syn::Ident::new(&format!("__register_routine_{}", fn_name), fn_name.span());

    Ok(quote! {
        #input_fn

        #[::routine_pool::routine_pool_runtime::linkme::distributed_slice(::routine_pool::routine_pool_runtime::ROUTINES)]
        #[linkme(crate = ::routine_pool::routine_pool_runtime::linkme)]
        fn #register_fn_name() -> ::routine_pool::routine_pool_runtime::RoutineEntry {
            ::routine_pool::routine_pool_runtime::RoutineEntry {
                name: stringify!(#fn_name),
                every: #every,
                initial_delay: #initial_delay,
                workers: #workers,
                enabled: #enabled,
                handler: #fn_name,
            }
        }
    })
}

#[derive(Default)]
struct RoutineArgs {
    every: Option<String>,
    initial_delay: Option<String>,
    workers: Option<String>,
    enabled: Option<String>,
}

fn parse_routine_args(attr_args: &Punctuated<Meta, syn::Token![,]>) -> syn::Result<RoutineArgs> {
    let mut args = RoutineArgs::default();

    for arg in attr_args {
        let Meta::NameValue(MetaNameValue { path, value, .. }) = arg else {
            return Err(syn::Error::new_spanned(arg, "expected `name = value`"));
        };
        let name = path.get_ident().map(|i| i.to_string()).unwrap_or_default();

        match name.as_str() {
            "every" => args.every = Some(int_or_str(value, "every")?),
            "initial_delay" => args.initial_delay = Some(int_or_str(value, "initial_delay")?),
            "workers" => args.workers = Some(int_or_str(value, "workers")?),
            "enabled" => {
                args.enabled = Some(match value {
                    Expr::Lit(ExprLit { lit: Lit::Bool(b), .. }) => b.value.to_string(),
                    Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => s.value(),
                    _ => return Err(syn::Error::new_spanned(value, "enabled must be bool or string")),
                });
            }
            _ => return Err(syn::Error::new_spanned(path, format!("unknown #[routine] parameter `{name}`"))),
        }
    }

    Ok(args)
}

fn int_or_str(value: &Expr, what: &str) -> syn::Result<String> {
    match value {
        Expr::Lit(ExprLit { lit: Lit::Int(i), .. }) => Ok(i.base10_digits().to_string()),
        Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => Ok(s.value()),
        _ => Err(syn::Error::new_spanned(value, format!("{what} must be int or string"))),
    }
}
