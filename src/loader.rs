use crate::ast::Template;
use crate::cache;
use crate::error::TplError;
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Failure modes of a [`PartialLoader`]. The renderer wraps these with the
/// offset of the referencing `render` call.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("template not found")]
    NotFound,
    #[error("template failed to parse: {0}")]
    Parse(#[source] Box<TplError>),
    #[error("{0}")]
    Io(String),
}

/// Collaborator consulted by the `render` global function. Returns a
/// pre-parsed template; hosts may cache however they like.
pub trait PartialLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Arc<Template>, LoadError>;
}

/// Process-wide store of template sources, keyed by relative path.
/// Populated from the filesystem (`load_from_path`) and/or from assets
/// embedded at compile time (`template_assets!` + `load_assets`).
static TEMPLATE_STORE: OnceLock<DashMap<String, String>> = OnceLock::new();

fn store() -> &'static DashMap<String, String> {
    TEMPLATE_STORE.get_or_init(DashMap::new)
}

/// Register embedded template sources. Called by the registration function
/// the `template_assets!` macro generates at startup.
pub fn load_assets(assets: Vec<(&str, &str)>) -> Result<(), TplError> {
    for (name, content) in assets {
        debug!("registering embedded template: name={}", name);
        store().insert(name.to_string(), content.to_string());
    }
    Ok(())
}

/// Recursively read every `.html` file under `dir` into the template
/// store, keyed by its path relative to `dir` (forward slashes).
pub fn load_from_path(dir: &Path) -> Result<usize, TplError> {
    let mut loaded = 0;
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || !path.extension().map_or(false, |ext| ext == "html") {
            continue;
        }

        let name = relative_name(dir, path);
        let content = fs::read_to_string(path).map_err(|e| TplError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!("loaded template: name={}, bytes={}", name, content.len());
        store().insert(name, content);
        loaded += 1;
    }
    Ok(loaded)
}

/// Source text for a stored template, if present.
pub fn find_template(name: &str) -> Option<String> {
    store().get(name).map(|entry| entry.clone())
}

fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

/// Default loader: serves from the template store, falling back to a
/// configured directory for names not yet stored. Parsed ASTs are shared
/// through the template cache.
pub struct DefaultLoader {
    root: Option<PathBuf>,
}

impl DefaultLoader {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl Default for DefaultLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialLoader for DefaultLoader {
    fn load(&self, path: &str) -> Result<Arc<Template>, LoadError> {
        let content = match find_template(path) {
            Some(content) => content,
            None => {
                let root = self.root.as_ref().ok_or(LoadError::NotFound)?;
                let file = root.join(path);
                let content = fs::read_to_string(&file).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        LoadError::NotFound
                    } else {
                        LoadError::Io(e.to_string())
                    }
                })?;
                store().insert(path.to_string(), content.clone());
                content
            }
        };

        cache::get_template(path, &content).map_err(|e| LoadError::Parse(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assets_are_found_by_loader() {
        load_assets(vec![("loader_test/asset.html", "asset <%= x %>")]).unwrap();
        assert_eq!(
            find_template("loader_test/asset.html").as_deref(),
            Some("asset <%= x %>")
        );

        let loader = DefaultLoader::new();
        let template = loader.load("loader_test/asset.html").unwrap();
        assert_eq!(template.nodes().len(), 2);
    }

    #[test]
    fn test_missing_template_is_not_found() {
        let loader = DefaultLoader::new();
        assert!(matches!(
            loader.load("loader_test/no_such.html"),
            Err(LoadError::NotFound)
        ));
    }

    #[test]
    fn test_broken_template_reports_parse_error() {
        load_assets(vec![("loader_test/broken.html", "<% if x %>never closed")]).unwrap();
        let loader = DefaultLoader::new();
        assert!(matches!(
            loader.load("loader_test/broken.html"),
            Err(LoadError::Parse(_))
        ));
    }
}
