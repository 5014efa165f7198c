pub mod ast;
pub(crate) mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod escape;
pub mod expr;
pub mod inject;
pub mod loader;
pub(crate) mod render;
pub(crate) mod scanner;
pub mod value;

#[doc(hidden)]
pub use ctor;
pub use utpl_macros::template_assets;

pub use ast::Template;
pub use engine::{Engine, EngineOptions, remove_template};
pub use error::TplError;
pub use value::{Value, to_value};
