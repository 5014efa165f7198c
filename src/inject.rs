/// Opaque markup producers backing the `rwf_head()` and
/// `rwf_turbo_stream(endpoint)` global functions. The engine never
/// inspects what they return; hosts supply their own implementation.
pub trait MarkupInjector: Send + Sync {
    fn head(&self) -> String;
    fn turbo_stream(&self, endpoint: &str) -> String;
}

/// Default injector producing no markup.
pub struct NullInjector;

impl MarkupInjector for NullInjector {
    fn head(&self) -> String {
        String::new()
    }

    fn turbo_stream(&self, _endpoint: &str) -> String {
        String::new()
    }
}
