use crate::value::Value;

/// Variable bindings visible during one render invocation: a root hash
/// supplied by the caller plus a stack of loop-local bindings. Locals are
/// scanned innermost-first so inner bindings shadow outer ones without
/// mutating them.
pub struct Context<'a> {
    root: &'a Value,
    locals: Vec<(String, Value)>,
}

impl<'a> Context<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            locals: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: Value) {
        self.locals.push((name.to_string(), value));
    }

    pub fn pop(&mut self) {
        self.locals.pop();
    }

    /// `None` when the name is bound nowhere; the renderer turns that into
    /// `UndefinedVariable` rather than substituting a default.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some((_, v)) = self.locals.iter().rev().find(|(k, _)| k == name) {
            return Some(v);
        }

        if let Value::Hash(map) = self.root {
            return map.get(name);
        }

        None
    }
}
