use proc_macro::TokenStream;

mod assets;

/// Embed template files matching a glob pattern into the binary and
/// register them with the template store at startup.
///
/// The pattern is resolved against `CARGO_MANIFEST_DIR`; each matched file
/// is stored under its manifest-relative path with forward slashes, e.g.
/// `template_assets!["templates/**/*.html"]` registers
/// `templates/partials/nav.html`.
#[proc_macro]
pub fn template_assets(input: TokenStream) -> TokenStream {
    assets::template_assets_impl(input)
}
