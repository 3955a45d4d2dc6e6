use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type, TypePath,
};

/// Transform an asynchronous test into a synchronous one, inject dependencies,
/// and ensure that the test database is dropped regardless of how the test terminates.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// [`mongodb::Database`], and [`crate::model::mongodb::Coll<T>`].
///
/// `#[backend_test(admin)]` additionally signs up the example admin, leaving
/// the client holding a valid auth cookie.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let injected = match check_sig(&item_fn.sig) {
        Ok(injected) => injected,
        Err(err) => return err.into_compile_error().into(),
    };

    let maybe_login = match parse_macro_input!(args as Option<Ident>) {
        None => TokenStream2::new(),
        Some(arg) if arg == "admin" => quote! {
            // Scoped so the response's borrow of the client ends here.
            {
                let response = rocket_client
                    .post(uri!(crate::api::auth::signup))
                    .header(rocket::http::ContentType::JSON)
                    .body(rocket::serde::json::json!(crate::model::api::admin::SignupRequest::example()).to_string())
                    .dispatch()
                    .await;
                assert_eq!(response.status(), rocket::http::Status::Ok, "example admin sign-up failed");
            }
        },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `admin`")
                .into_compile_error()
                .into()
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let fut_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = fut_name.clone();

    let call_args = injected.iter().map(Injected::call_arg);
    let collections = injected.iter().filter_map(Injected::collection_binding);

    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                log4rs_test_utils::test_logging::init_logging_once_for(["feedback_backend"], None, None);

                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_db(db_client.clone(), &db_name).await,
                )
                .await
                .unwrap();
                let db = db_client.database(&db_name);

                #maybe_login

                (rocket_client, db)
            }

            /// The test itself.
            #item_fn

            /// Test cleanup.
            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            let (rocket_client, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                #(#collections)*

                runtime.block_on(#fut_name(#(#call_args),*));
            });

            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::resume_unwind(cause);
            }
        }
    }
    .into()
}

/// A test parameter the macro knows how to supply.
enum Injected {
    Client,
    Database,
    Collection { ident: Ident, ty: Ident },
}

impl Injected {
    /// The expression passed for this parameter.
    fn call_arg(&self) -> TokenStream2 {
        match self {
            Self::Client => quote! { rocket_client },
            Self::Database => quote! { db },
            Self::Collection { ident, .. } => quote! { #ident },
        }
    }

    /// The `let` binding that creates a collection handle, if this is one.
    fn collection_binding(&self) -> Option<TokenStream2> {
        match self {
            Self::Collection { ident, ty } => Some(quote! {
                let #ident = crate::model::mongodb::Coll::<#ty>::from_db(&db);
            }),
            _ => None,
        }
    }
}

/// Ensure the wrapped test is async and work out what to inject for each parameter.
fn check_sig(sig: &Signature) -> Result<Vec<Injected>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected = Vec::with_capacity(sig.inputs.len());
    for input in &sig.inputs {
        let parsed = match input {
            FnArg::Typed(pat_type) => match (&*pat_type.pat, &*pat_type.ty) {
                (Pat::Ident(pat_ident), Type::Path(type_path)) => {
                    classify(&pat_ident.ident, type_path)
                }
                _ => None,
            },
            FnArg::Receiver(_) => None,
        };
        let parsed = parsed.ok_or_else(|| {
            syn::Error::new(
                input.span(),
                "Expected one of `client_ident: Client`, `db_ident: Database` or `collection_ident: Coll<T>`",
            )
        })?;

        let duplicate = injected.iter().any(|existing| {
            matches!(
                (existing, &parsed),
                (Injected::Client, Injected::Client) | (Injected::Database, Injected::Database)
            )
        });
        if duplicate {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot accept more than one `Client` or `Database`",
            ));
        }
        injected.push(parsed);
    }

    Ok(injected)
}

/// Work out which dependency a parameter of the given type wants.
fn classify(ident: &Ident, type_path: &TypePath) -> Option<Injected> {
    if let Some(type_ident) = type_path.path.get_ident() {
        return if type_ident == "Client" {
            Some(Injected::Client)
        } else if type_ident == "Database" {
            Some(Injected::Database)
        } else {
            None
        };
    }

    // The last path segment names the type itself.
    let last = type_path.path.segments.last()?;
    if last.ident != "Coll" {
        return None;
    }
    match &last.arguments {
        PathArguments::AngleBracketed(generics) => match generics.args.first() {
            Some(GenericArgument::Type(Type::Path(inner))) => {
                inner.path.get_ident().map(|ty| Injected::Collection {
                    ident: ident.clone(),
                    ty: ty.clone(),
                })
            }
            _ => None,
        },
        _ => None,
    }
}
