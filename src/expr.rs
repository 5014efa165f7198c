use crate::error::TplError;
use crate::value::Value;

/// Parsed expression tree for the contents of a single tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    ListLiteral(Vec<Expr>),
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// Positional tuple access; the index is a parse-time literal.
    TupleIndex { receiver: Box<Expr>, index: usize },
    /// Global function call (`render`, `rwf_head`, ...). Carries its source
    /// offset so collaborator failures can name the referencing call site.
    Call {
        function: String,
        args: Vec<Expr>,
        offset: usize,
    },
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

/// Statement form of a `<% %>` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagStmt {
    If(Expr),
    Elsif(Expr),
    Else,
    End,
    For { bindings: Vec<String>, iterable: Expr },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Integer(i64),
    Float(f64),
    Str(String),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
    EqEq,
    NotEq,
    Minus,
    KwIf,
    KwElsif,
    KwElse,
    KwEnd,
    KwFor,
    KwIn,
    KwTrue,
    KwFalse,
}

/// Parse tag content as a bare expression (output tags).
pub fn parse_expression(content: &str, base: usize) -> Result<Expr, TplError> {
    let mut parser = Parser::new(tokenize(content, base)?, base + content.len());
    let expr = parser.equality()?;
    parser.expect_eof()?;
    Ok(expr)
}

/// Parse tag content as a statement (code tags): a control-flow header or
/// a bare expression whose result is discarded.
pub fn parse_statement(content: &str, base: usize) -> Result<TagStmt, TplError> {
    let tokens = tokenize(content, base)?;
    let mut parser = Parser::new(tokens, base + content.len());

    let stmt = match parser.peek() {
        Some(Token::KwIf) => {
            parser.bump();
            TagStmt::If(parser.equality()?)
        }
        Some(Token::KwElsif) => {
            parser.bump();
            TagStmt::Elsif(parser.equality()?)
        }
        Some(Token::KwElse) => {
            parser.bump();
            TagStmt::Else
        }
        Some(Token::KwEnd) => {
            parser.bump();
            TagStmt::End
        }
        Some(Token::KwFor) => {
            parser.bump();
            let mut bindings = vec![parser.expect_ident("for binding")?];
            while parser.eat(&Token::Comma) {
                bindings.push(parser.expect_ident("for binding")?);
            }
            if !parser.eat(&Token::KwIn) {
                return Err(parser.syntax_here("expected `in` in for header"));
            }
            TagStmt::For {
                bindings,
                iterable: parser.equality()?,
            }
        }
        _ => TagStmt::Expr(parser.equality()?),
    };
    parser.expect_eof()?;
    Ok(stmt)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

// Tokens carry their absolute byte offset in the template source; `base` is
// the offset where the tag content begins.
fn tokenize(content: &str, base: usize) -> Result<Vec<(Token, usize)>, TplError> {
    let bytes = content.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        let offset = base + pos;
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                pos += 1;
            }
            b'"' => {
                // No escape processing: the literal runs to the next quote.
                let start = pos + 1;
                let end = content[start..]
                    .find('"')
                    .map(|i| start + i)
                    .ok_or_else(|| TplError::Syntax {
                        offset,
                        message: "unterminated string literal".to_string(),
                    })?;
                tokens.push((Token::Str(content[start..end].to_string()), offset));
                pos = end + 1;
            }
            b'0'..=b'9' => {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                // A dot only extends the number when a digit follows, so
                // `5.abs` lexes as `5` `.` `abs`.
                let is_float = pos + 1 < bytes.len()
                    && bytes[pos] == b'.'
                    && bytes[pos + 1].is_ascii_digit();
                if is_float {
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                let text = &content[start..pos];
                let token = if is_float {
                    Token::Float(text.parse().map_err(|_| TplError::Syntax {
                        offset,
                        message: format!("malformed float literal `{text}`"),
                    })?)
                } else {
                    Token::Integer(text.parse().map_err(|_| TplError::Syntax {
                        offset,
                        message: format!("malformed integer literal `{text}`"),
                    })?)
                };
                tokens.push((token, offset));
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let token = match &content[start..pos] {
                    "if" => Token::KwIf,
                    "elsif" => Token::KwElsif,
                    "else" => Token::KwElse,
                    "end" => Token::KwEnd,
                    "for" => Token::KwFor,
                    "in" => Token::KwIn,
                    "true" => Token::KwTrue,
                    "false" => Token::KwFalse,
                    ident => Token::Ident(ident.to_string()),
                };
                tokens.push((token, offset));
            }
            b'=' if bytes.get(pos + 1) == Some(&b'=') => {
                tokens.push((Token::EqEq, offset));
                pos += 2;
            }
            b'!' if bytes.get(pos + 1) == Some(&b'=') => {
                tokens.push((Token::NotEq, offset));
                pos += 2;
            }
            b'[' => {
                tokens.push((Token::LBracket, offset));
                pos += 1;
            }
            b']' => {
                tokens.push((Token::RBracket, offset));
                pos += 1;
            }
            b'(' => {
                tokens.push((Token::LParen, offset));
                pos += 1;
            }
            b')' => {
                tokens.push((Token::RParen, offset));
                pos += 1;
            }
            b',' => {
                tokens.push((Token::Comma, offset));
                pos += 1;
            }
            b'.' => {
                tokens.push((Token::Dot, offset));
                pos += 1;
            }
            b'-' => {
                tokens.push((Token::Minus, offset));
                pos += 1;
            }
            _ => {
                let ch = content[pos..].chars().next().unwrap_or('?');
                return Err(TplError::Syntax {
                    offset,
                    message: format!("unexpected character `{ch}`"),
                });
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end_offset: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>, end_offset: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end_offset,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn current_offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, o)| *o)
            .unwrap_or(self.end_offset)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn syntax_here(&self, message: &str) -> TplError {
        TplError::Syntax {
            offset: self.current_offset(),
            message: message.to_string(),
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), TplError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.syntax_here(&format!("expected {what}")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, TplError> {
        match self.peek() {
            Some(Token::Ident(_)) => match self.bump() {
                Some(Token::Ident(name)) => Ok(name),
                _ => unreachable!("peeked an identifier"),
            },
            _ => Err(self.syntax_here(&format!("expected identifier for {what}"))),
        }
    }

    fn expect_eof(&mut self) -> Result<(), TplError> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.syntax_here("unexpected trailing tokens"))
        }
    }

    // equality := postfix (("==" | "!=") postfix)?
    fn equality(&mut self) -> Result<Expr, TplError> {
        let left = self.postfix()?;
        match self.peek() {
            Some(Token::EqEq) => {
                self.bump();
                let right = self.postfix()?;
                Ok(Expr::Eq(Box::new(left), Box::new(right)))
            }
            Some(Token::NotEq) => {
                self.bump();
                let right = self.postfix()?;
                Ok(Expr::Ne(Box::new(left), Box::new(right)))
            }
            _ => Ok(left),
        }
    }

    // postfix := primary ("." (ident args? | integer))*
    fn postfix(&mut self) -> Result<Expr, TplError> {
        let mut expr = self.primary()?;
        while self.eat(&Token::Dot) {
            match self.bump() {
                Some(Token::Ident(method)) => {
                    let args = if self.peek() == Some(&Token::LParen) {
                        self.call_args()?
                    } else {
                        Vec::new()
                    };
                    expr = Expr::MethodCall {
                        receiver: Box::new(expr),
                        method,
                        args,
                    };
                }
                Some(Token::Integer(index)) => {
                    expr = Expr::TupleIndex {
                        receiver: Box::new(expr),
                        index: index as usize,
                    };
                }
                _ => return Err(self.syntax_here("expected method name or index after `.`")),
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, TplError> {
        let offset = self.current_offset();
        match self.bump() {
            // Unary minus binds tighter than the method dot, so `-5.abs`
            // is `(-5).abs`.
            Some(Token::Minus) => match self.bump() {
                Some(Token::Integer(n)) => Ok(Expr::Literal(Value::Integer(-n))),
                Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(-f))),
                _ => Err(self.syntax_here("expected numeric literal after `-`")),
            },
            Some(Token::Integer(n)) => Ok(Expr::Literal(Value::Integer(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::KwTrue) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::KwFalse) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.equality()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RBracket, "`]` to close list literal")?;
                        break;
                    }
                }
                Ok(Expr::ListLiteral(items))
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    let args = self.call_args()?;
                    Ok(Expr::Call {
                        function: name,
                        args,
                        offset,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            _ => Err(TplError::Syntax {
                offset,
                message: "expected expression".to_string(),
            }),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, TplError> {
        self.expect(&Token::LParen, "`(`")?;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.equality()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "`)` to close argument list")?;
            break;
        }
        Ok(args)
    }
}
