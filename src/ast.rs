use crate::error::TplError;
use crate::expr::{self, Expr, TagStmt};
use crate::scanner::{self, Segment, SegmentKind};
use std::iter::Peekable;

/// One node of a parsed template.
#[derive(Debug, Clone)]
pub enum Node {
    Text(String),
    /// `<%= %>`: escaped output.
    Output(Expr),
    /// `<%- %>`: unescaped output.
    RawOutput(Expr),
    If {
        cond: Expr,
        then_body: Vec<Node>,
        /// `elsif` chains nest as a single `If` node in here.
        else_body: Vec<Node>,
    },
    For {
        bindings: Vec<String>,
        iterable: Expr,
        body: Vec<Node>,
    },
    /// `<% expr %>`: evaluated, result discarded.
    Statement(Expr),
}

/// A parsed template: an owned, immutable node tree built once and shared
/// read-only across any number of renders.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TplError> {
        let segments = scanner::scan(source)?;
        let mut iter = segments.into_iter().peekable();
        let (nodes, terminator) = parse_body(&mut iter)?;
        if let Some((term, offset)) = terminator {
            return Err(TplError::UnbalancedBlock {
                construct: term.name().to_string(),
                offset,
            });
        }
        Ok(Template { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

// A block body stops at `end`, `else` or `elsif`; the caller decides
// whether that terminator is legal where it appeared.
enum Terminator {
    End,
    Else,
    Elsif(Expr),
}

impl Terminator {
    fn name(&self) -> &'static str {
        match self {
            Terminator::End => "end",
            Terminator::Else => "else",
            Terminator::Elsif(_) => "elsif",
        }
    }
}

type Segments = Peekable<std::vec::IntoIter<Segment>>;

fn parse_body(iter: &mut Segments) -> Result<(Vec<Node>, Option<(Terminator, usize)>), TplError> {
    let mut nodes = Vec::new();

    while let Some(segment) = iter.next() {
        match segment.kind {
            SegmentKind::Text => nodes.push(Node::Text(segment.content)),
            SegmentKind::Output => nodes.push(Node::Output(expr::parse_expression(
                &segment.content,
                segment.content_offset,
            )?)),
            SegmentKind::RawOutput => nodes.push(Node::RawOutput(expr::parse_expression(
                &segment.content,
                segment.content_offset,
            )?)),
            // `<%% path %>` is sugar for a raw-output render() call.
            SegmentKind::Partial => {
                let path = expr::parse_expression(&segment.content, segment.content_offset)?;
                nodes.push(Node::RawOutput(Expr::Call {
                    function: "render".to_string(),
                    args: vec![path],
                    offset: segment.offset,
                }));
            }
            SegmentKind::Code => {
                match expr::parse_statement(&segment.content, segment.content_offset)? {
                    TagStmt::If(cond) => nodes.push(parse_if(iter, cond, segment.offset)?),
                    TagStmt::For { bindings, iterable } => {
                        let (body, terminator) = parse_body(iter)?;
                        match terminator {
                            Some((Terminator::End, _)) => nodes.push(Node::For {
                                bindings,
                                iterable,
                                body,
                            }),
                            Some((term, offset)) => {
                                return Err(TplError::UnbalancedBlock {
                                    construct: term.name().to_string(),
                                    offset,
                                });
                            }
                            None => {
                                return Err(TplError::UnbalancedBlock {
                                    construct: "for".to_string(),
                                    offset: segment.offset,
                                });
                            }
                        }
                    }
                    TagStmt::End => {
                        return Ok((nodes, Some((Terminator::End, segment.offset))));
                    }
                    TagStmt::Else => {
                        return Ok((nodes, Some((Terminator::Else, segment.offset))));
                    }
                    TagStmt::Elsif(cond) => {
                        return Ok((nodes, Some((Terminator::Elsif(cond), segment.offset))));
                    }
                    TagStmt::Expr(e) => nodes.push(Node::Statement(e)),
                }
            }
        }
    }

    Ok((nodes, None))
}

// An if-block runs to its matching `end`; `elsif` branches become a nested
// `If` inside `else_body`, so one `end` closes the whole chain.
fn parse_if(iter: &mut Segments, cond: Expr, offset: usize) -> Result<Node, TplError> {
    let (then_body, terminator) = parse_body(iter)?;
    let else_body = match terminator {
        Some((Terminator::End, _)) => Vec::new(),
        Some((Terminator::Else, else_offset)) => {
            let (body, terminator) = parse_body(iter)?;
            match terminator {
                Some((Terminator::End, _)) => body,
                Some((term, offset)) => {
                    return Err(TplError::UnbalancedBlock {
                        construct: term.name().to_string(),
                        offset,
                    });
                }
                None => {
                    return Err(TplError::UnbalancedBlock {
                        construct: "else".to_string(),
                        offset: else_offset,
                    });
                }
            }
        }
        Some((Terminator::Elsif(next_cond), elsif_offset)) => {
            vec![parse_if(iter, next_cond, elsif_offset)?]
        }
        None => {
            return Err(TplError::UnbalancedBlock {
                construct: "if".to_string(),
                offset,
            });
        }
    };

    Ok(Node::If {
        cond,
        then_body,
        else_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_parse_basic_program() {
        let template =
            Template::parse("<html><% if a == 4 %>world is great<% else %>not so much<% end %></html>")
                .unwrap();
        assert_eq!(template.nodes().len(), 3);
        let Node::If {
            then_body,
            else_body,
            ..
        } = &template.nodes()[1]
        else {
            panic!("expected if node");
        };
        assert_eq!(then_body.len(), 1);
        assert_eq!(else_body.len(), 1);
    }

    #[test]
    fn test_parse_nested_blocks() {
        let template = Template::parse(
            "<% for item in items %><% if item == 1 %>one<% end %><% end %>",
        )
        .unwrap();
        let Node::For { bindings, body, .. } = &template.nodes()[0] else {
            panic!("expected for node");
        };
        assert_eq!(bindings, &["item"]);
        assert!(matches!(body[0], Node::If { .. }));
    }

    #[test]
    fn test_parse_elsif_chain_nests_in_else() {
        let template =
            Template::parse("<% if a %>1<% elsif b %>2<% else %>3<% end %>").unwrap();
        let Node::If { else_body, .. } = &template.nodes()[0] else {
            panic!("expected if node");
        };
        let Node::If {
            else_body: inner_else,
            ..
        } = &else_body[0]
        else {
            panic!("expected nested if for elsif");
        };
        assert_eq!(inner_else.len(), 1);
    }

    #[test]
    fn test_partial_shorthand_rewrites_to_render() {
        let template = Template::parse("<%% \"nav.html\" %>").unwrap();
        let Node::RawOutput(Expr::Call { function, args, .. }) = &template.nodes()[0] else {
            panic!("expected raw render call");
        };
        assert_eq!(function, "render");
        assert_eq!(args[0], Expr::Literal(Value::Str("nav.html".into())));
    }

    #[test]
    fn test_unclosed_if_reports_opener() {
        let err = Template::parse("text <% if a %> body").unwrap_err();
        match err {
            TplError::UnbalancedBlock { construct, offset } => {
                assert_eq!(construct, "if");
                assert_eq!(offset, 5);
            }
            other => panic!("expected UnbalancedBlock, got {other:?}"),
        }
    }

    #[test]
    fn test_stray_end_rejected() {
        let err = Template::parse("a<% end %>b").unwrap_err();
        match err {
            TplError::UnbalancedBlock { construct, .. } => assert_eq!(construct, "end"),
            other => panic!("expected UnbalancedBlock, got {other:?}"),
        }
    }

    #[test]
    fn test_else_inside_for_rejected() {
        let err = Template::parse("<% for x in xs %><% else %><% end %>").unwrap_err();
        assert!(matches!(err, TplError::UnbalancedBlock { .. }));
    }
}
