use crate::ast::Template;
use crate::error::TplError;
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

#[derive(Clone)]
pub(crate) struct CachedTemplate {
    pub ast: Arc<Template>,
    pub content_hash: u64,
}

/// Parsed-template cache, keyed by template name. The content hash lets a
/// changed source re-parse under the same name.
pub(crate) static TEMPLATE_CACHE: LazyLock<DashMap<String, CachedTemplate>> =
    LazyLock::new(DashMap::new);

pub(crate) fn get_template(name: &str, content: &str) -> Result<Arc<Template>, TplError> {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let new_hash = hasher.finish();

    if let Some(cached) = TEMPLATE_CACHE.get(name) {
        if cached.content_hash == new_hash {
            return Ok(cached.ast.clone());
        }
    }

    let ast = Arc::new(Template::parse(content)?);
    TEMPLATE_CACHE.insert(
        name.to_string(),
        CachedTemplate {
            ast: ast.clone(),
            content_hash: new_hash,
        },
    );
    Ok(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_reuses_ast_for_same_content() {
        let a = get_template("cache_test_same", "hello <%= x %>").unwrap();
        let b = get_template("cache_test_same", "hello <%= x %>").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_cache_reparses_on_content_change() {
        let a = get_template("cache_test_change", "first").unwrap();
        let b = get_template("cache_test_change", "second").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_parse_error_is_not_cached() {
        assert!(get_template("cache_test_err", "<% if x %>").is_err());
        assert!(get_template("cache_test_err", "ok").is_ok());
    }
}
