use crate::ast::{Node, Template};
use crate::context::Context;
use crate::engine::Engine;
use crate::error::TplError;
use crate::expr::Expr;
use crate::loader::LoadError;
use crate::value::Value;

/// Walks a template's node tree against a context, appending to the output
/// buffer. Evaluation is strictly left-to-right, depth-first; the only
/// state carried across nodes is the scope stack and the partial-nesting
/// depth.
pub(crate) struct Renderer<'a> {
    engine: &'a Engine,
    depth: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine, depth: 0 }
    }

    pub fn render(
        &mut self,
        template: &Template,
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), TplError> {
        self.render_nodes(template.nodes(), ctx, out)
    }

    fn render_nodes(
        &mut self,
        nodes: &[Node],
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), TplError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output(expr) => {
                    let text = self.eval(expr, ctx)?.to_text()?;
                    out.push_str(&self.engine.escaper.escape(&text));
                }
                Node::RawOutput(expr) => {
                    let text = self.eval(expr, ctx)?.to_text()?;
                    out.push_str(&text);
                }
                Node::Statement(expr) => {
                    self.eval(expr, ctx)?;
                }
                Node::If {
                    cond,
                    then_body,
                    else_body,
                } => match self.eval(cond, ctx)? {
                    // Branch bodies share the enclosing scope.
                    Value::Bool(true) => self.render_nodes(then_body, ctx, out)?,
                    Value::Bool(false) => self.render_nodes(else_body, ctx, out)?,
                    other => {
                        return Err(TplError::TypeMismatch(format!(
                            "if condition must be Bool, got {}",
                            other.variant_name()
                        )));
                    }
                },
                Node::For {
                    bindings,
                    iterable,
                    body,
                } => {
                    let items = match self.eval(iterable, ctx)? {
                        Value::List(items) => items,
                        other => {
                            return Err(TplError::TypeMismatch(format!(
                                "for loop iterable must be List, got {}",
                                other.variant_name()
                            )));
                        }
                    };
                    for item in items {
                        let pushed = push_bindings(bindings, item, ctx)?;
                        let result = self.render_nodes(body, ctx, out);
                        for _ in 0..pushed {
                            ctx.pop();
                        }
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr, ctx: &mut Context) -> Result<Value, TplError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => ctx
                .lookup(name)
                .cloned()
                .ok_or_else(|| TplError::UndefinedVariable(name.clone())),
            Expr::ListLiteral(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, ctx)?);
                }
                Ok(Value::List(values))
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(receiver, ctx)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg, ctx)?);
                }
                receiver.invoke(method, &arg_values)
            }
            Expr::TupleIndex { receiver, index } => match self.eval(receiver, ctx)? {
                Value::Tuple(items) => {
                    let len = items.len();
                    items
                        .into_iter()
                        .nth(*index)
                        .ok_or(TplError::IndexOutOfRange { index: *index, len })
                }
                other => Err(TplError::TypeMismatch(format!(
                    "cannot index {} with .{}",
                    other.variant_name(),
                    index
                ))),
            },
            Expr::Eq(left, right) => {
                Ok(Value::Bool(self.eval(left, ctx)? == self.eval(right, ctx)?))
            }
            Expr::Ne(left, right) => {
                Ok(Value::Bool(self.eval(left, ctx)? != self.eval(right, ctx)?))
            }
            Expr::Call {
                function,
                args,
                offset,
            } => self.call_global(function, args, *offset, ctx),
        }
    }

    // Global functions resolve to the injected collaborators, never to
    // ambient state.
    fn call_global(
        &mut self,
        function: &str,
        args: &[Expr],
        offset: usize,
        ctx: &mut Context,
    ) -> Result<Value, TplError> {
        match function {
            "render" => {
                let path = match self.global_arg(function, args, 1, ctx)?.pop() {
                    Some(Value::Str(path)) => path,
                    Some(other) => {
                        return Err(TplError::TypeMismatch(format!(
                            "render path must be Str, got {}",
                            other.variant_name()
                        )));
                    }
                    None => unreachable!("arity checked"),
                };
                if self.depth >= self.engine.max_partial_depth {
                    return Err(TplError::RecursionLimit {
                        path,
                        limit: self.engine.max_partial_depth,
                    });
                }
                let template = self.engine.loader.load(&path).map_err(|e| match e {
                    LoadError::NotFound => TplError::PartialNotFound {
                        path: path.clone(),
                        offset,
                    },
                    LoadError::Parse(source) => TplError::PartialParse {
                        path: path.clone(),
                        offset,
                        source,
                    },
                    LoadError::Io(message) => TplError::Load {
                        path: path.clone(),
                        message,
                    },
                })?;

                // The partial sees the caller's bindings; anything it pushes
                // is popped before control returns.
                self.depth += 1;
                let mut partial_out = String::new();
                let result = self.render_nodes(template.nodes(), ctx, &mut partial_out);
                self.depth -= 1;
                result?;
                Ok(Value::Str(partial_out))
            }
            "rwf_head" => {
                self.global_arg(function, args, 0, ctx)?;
                Ok(Value::Str(self.engine.injector.head()))
            }
            "rwf_turbo_stream" => {
                let endpoint = match self.global_arg(function, args, 1, ctx)?.pop() {
                    Some(Value::Str(endpoint)) => endpoint,
                    Some(other) => {
                        return Err(TplError::TypeMismatch(format!(
                            "rwf_turbo_stream endpoint must be Str, got {}",
                            other.variant_name()
                        )));
                    }
                    None => unreachable!("arity checked"),
                };
                Ok(Value::Str(self.engine.injector.turbo_stream(&endpoint)))
            }
            other => Err(TplError::UnknownGlobalFunction(other.to_string())),
        }
    }

    fn global_arg(
        &mut self,
        function: &str,
        args: &[Expr],
        expected: usize,
        ctx: &mut Context,
    ) -> Result<Vec<Value>, TplError> {
        if args.len() != expected {
            return Err(TplError::ArityMismatch {
                method: function.to_string(),
                expected,
                got: args.len(),
            });
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, ctx)?);
        }
        Ok(values)
    }
}

// Bind one loop element. A single name takes the element itself; several
// comma-separated names destructure a Tuple element positionally.
fn push_bindings(
    bindings: &[String],
    item: Value,
    ctx: &mut Context,
) -> Result<usize, TplError> {
    if bindings.len() == 1 {
        ctx.push(&bindings[0], item);
        return Ok(1);
    }

    match item {
        Value::Tuple(items) if items.len() == bindings.len() => {
            for (name, value) in bindings.iter().zip(items) {
                ctx.push(name, value);
            }
            Ok(bindings.len())
        }
        Value::Tuple(items) => Err(TplError::TypeMismatch(format!(
            "cannot destructure tuple of length {} into {} bindings",
            items.len(),
            bindings.len()
        ))),
        other => Err(TplError::TypeMismatch(format!(
            "cannot destructure {} into {} bindings",
            other.variant_name(),
            bindings.len()
        ))),
    }
}
