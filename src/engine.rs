use crate::ast::Template;
use crate::cache;
use crate::context::Context;
use crate::error::TplError;
use crate::escape::{Escaper, HtmlEscaper};
use crate::inject::{MarkupInjector, NullInjector};
use crate::loader::{self, DefaultLoader, LoadError, PartialLoader};
use crate::render::Renderer;
use crate::value::{Value, to_value};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const DEFAULT_PARTIAL_DEPTH: usize = 64;

/// Engine configuration.
pub struct EngineOptions<'a> {
    /// Template sources embedded in the binary, registered before first use.
    pub assets: Option<Vec<(&'a str, &'a str)>>,
    /// Directory the default loader reads `.html` templates from.
    pub templates_path: Option<&'a str>,
    /// Bound on `render` nesting, guarding against partial cycles.
    pub max_partial_depth: usize,
}

impl<'a> EngineOptions<'a> {
    pub fn new() -> Self {
        EngineOptions {
            assets: None,
            templates_path: None,
            max_partial_depth: DEFAULT_PARTIAL_DEPTH,
        }
    }

    pub fn assets(mut self, assets: Vec<(&'a str, &'a str)>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn templates_path(mut self, templates_path: &'a str) -> Self {
        self.templates_path = Some(templates_path);
        self
    }

    pub fn max_partial_depth(mut self, max_partial_depth: usize) -> Self {
        self.max_partial_depth = max_partial_depth;
        self
    }
}

impl Default for EngineOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Template engine front-end: holds the collaborator services and renders
/// templates against caller-supplied contexts. Stateless across renders,
/// safe to share between threads.
pub struct Engine {
    pub(crate) loader: Arc<dyn PartialLoader>,
    pub(crate) escaper: Arc<dyn Escaper>,
    pub(crate) injector: Arc<dyn MarkupInjector>,
    pub(crate) max_partial_depth: usize,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            loader: Arc::new(DefaultLoader::new()),
            escaper: Arc::new(HtmlEscaper),
            injector: Arc::new(NullInjector),
            max_partial_depth: DEFAULT_PARTIAL_DEPTH,
        }
    }

    pub fn with_options(options: EngineOptions) -> Result<Self, TplError> {
        if let Some(assets) = options.assets {
            loader::load_assets(assets)?;
        }
        let loader: Arc<dyn PartialLoader> = match options.templates_path {
            Some(path) => {
                let loaded = loader::load_from_path(Path::new(path))?;
                debug!("templates_path={}, templates loaded={}", path, loaded);
                Arc::new(DefaultLoader::with_root(path))
            }
            None => Arc::new(DefaultLoader::new()),
        };
        Ok(Self {
            loader,
            escaper: Arc::new(HtmlEscaper),
            injector: Arc::new(NullInjector),
            max_partial_depth: options.max_partial_depth,
        })
    }

    pub fn loader(mut self, loader: Arc<dyn PartialLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn escaper(mut self, escaper: Arc<dyn Escaper>) -> Self {
        self.escaper = escaper;
        self
    }

    pub fn injector(mut self, injector: Arc<dyn MarkupInjector>) -> Self {
        self.injector = injector;
        self
    }

    /// Parse (through the name-keyed cache) and render in one call.
    pub fn render_template<T: Serialize>(
        &self,
        name: &str,
        content: &str,
        param: &T,
    ) -> Result<String, TplError> {
        let template = cache::get_template(name, content)?;
        let root = to_value(param)?;
        self.render_parsed(&template, &root)
    }

    /// Render a template known to the loader (stored, embedded, or on disk
    /// under the configured templates path).
    pub fn render<T: Serialize>(&self, name: &str, param: &T) -> Result<String, TplError> {
        let template = self.loader.load(name).map_err(|e| match e {
            LoadError::NotFound => TplError::Load {
                path: name.to_string(),
                message: "template not found".to_string(),
            },
            LoadError::Parse(source) => *source,
            LoadError::Io(message) => TplError::Load {
                path: name.to_string(),
                message,
            },
        })?;
        let root = to_value(param)?;
        self.render_parsed(&template, &root)
    }

    /// One-shot render of an inline template, bypassing the cache.
    pub fn render_str<T: Serialize>(&self, content: &str, param: &T) -> Result<String, TplError> {
        let template = Template::parse(content)?;
        let root = to_value(param)?;
        self.render_parsed(&template, &root)
    }

    /// Render a pre-parsed template against a prepared root value.
    pub fn render_parsed(&self, template: &Template, root: &Value) -> Result<String, TplError> {
        let start = Instant::now();
        let mut ctx = Context::new(root);
        let mut out = String::new();
        let result = Renderer::new(self).render(template, &mut ctx, &mut out);
        let elapsed_ms = start.elapsed().as_millis();
        match result {
            // Atomic rendering: the buffer is returned whole or not at all.
            Ok(()) => {
                debug!("render: elapsed_ms={}, bytes={}", elapsed_ms, out.len());
                Ok(out)
            }
            Err(e) => {
                debug!("render failed: elapsed_ms={}, error={}", elapsed_ms, e);
                Err(e)
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop a template from the parse cache.
pub fn remove_template(name: &str) {
    cache::TEMPLATE_CACHE.remove(name);
}
