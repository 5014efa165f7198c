use serde::Serialize;
use utpl::{Engine, template_assets};

// Registered at startup, before any test runs.
template_assets!["tests/assets/**/*.html"];

#[test]
fn test_assets_registered_at_startup() {
    let found = utpl::loader::find_template("tests/assets/banner.html");
    assert!(
        found.is_some(),
        "embedded assets were not registered at startup"
    );
    assert!(found.unwrap().contains("<header>"));
}

#[test]
fn test_render_embedded_asset() {
    #[derive(Serialize)]
    struct Ctx {
        product: String,
    }
    let out = Engine::new()
        .render(
            "tests/assets/banner.html",
            &Ctx {
                product: "utpl".to_string(),
            },
        )
        .unwrap();
    assert_eq!(out, "<header>utpl</header>");
}
