use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{LitStr, parse_macro_input};

use glob::glob;
use std::collections::hash_map::DefaultHasher;
use std::env;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

pub fn template_assets_impl(input: TokenStream) -> TokenStream {
    let pattern = parse_macro_input!(input as LitStr);
    let pattern_str = pattern.value();

    // CARGO_MANIFEST_DIR is set by Cargo at compile time, so the pattern
    // is resolved against the crate root rather than the cwd.
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is not set by the build");
    let root = PathBuf::from(&manifest_dir);

    let full_pattern = root.join(&pattern_str);
    let full_pattern_str = full_pattern.to_string_lossy();

    let files: Vec<PathBuf> = match glob(&full_pattern_str) {
        Ok(paths) => paths
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            return syn::Error::new(pattern.span(), format!("invalid glob pattern: {}", e))
                .to_compile_error()
                .into();
        }
    };

    // Each asset is a (name, source) pair; include_str! pins the content
    // at compile time so no filesystem access happens at runtime.
    let assets: Vec<_> = files
        .iter()
        .map(|path| {
            let name = path
                .strip_prefix(&root)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<String>>()
                .join("/");
            let full = path.to_string_lossy().into_owned();
            quote! {
                (#name, include_str!(#full))
            }
        })
        .collect();

    // Hash the pattern into the registration function's name so several
    // invocations in one scope do not collide.
    let mut hasher = DefaultHasher::new();
    pattern_str.hash(&mut hasher);
    let hash = hasher.finish();
    let fn_name = format_ident!("__utpl_register_templates_{}", hash);

    let output = quote! {
        #[utpl::ctor::ctor]
        fn #fn_name() {
            let assets = vec![
                #(#assets),*
            ];
            let _ = utpl::loader::load_assets(assets);
        }
    };

    output.into()
}
