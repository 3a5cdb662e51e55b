use super::ast::{ExprNode, LiteralValue, PropertyKey};
use crate::error::ExpressionError;

/// Hard ceiling on grammar recursion. Nesting beyond this depth fails safe
/// with [`ExpressionError::TooComplex`] instead of exhausting the stack.
pub const MAX_EXPRESSION_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Text(String),
    Number(f64),
    At,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Question,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '@' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::At,
                    offset,
                });
            }
            '(' | ')' | '[' | ']' | ',' | '.' | '?' => {
                chars.next();
                let kind = match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    _ => TokenKind::Question,
                };
                tokens.push(Token { kind, offset });
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == c {
                        closed = true;
                        break;
                    }
                    text.push(inner);
                }
                if !closed {
                    return Err(ExpressionError::UnterminatedString { offset });
                }
                tokens.push(Token {
                    kind: TokenKind::Text(text),
                    offset,
                });
            }
            '-' | '0'..='9' => {
                let mut digits = String::new();
                digits.push(c);
                chars.next();
                let mut seen_dot = false;
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || (d == '.' && !seen_dot) {
                        seen_dot |= d == '.';
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = digits.parse::<f64>().map_err(|_| ExpressionError::Syntax {
                    offset,
                    message: format!("invalid number '{}'", digits),
                })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    offset,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(ident),
                    offset,
                });
            }
            other => {
                return Err(ExpressionError::Syntax {
                    offset,
                    message: format!("unexpected character '{}'", other),
                });
            }
        }
    }

    Ok(tokens)
}

/// Parses one expression, with or without the leading `@` marker.
pub fn parse_expression(raw: &str) -> Result<ExprNode, ExpressionError> {
    let tokens = tokenize(raw)?;
    let mut parser = Parser { tokens, cursor: 0 };
    if matches!(parser.peek(), Some(TokenKind::At)) {
        parser.cursor += 1;
    }
    let node = parser.expression(0)?;
    match parser.tokens.get(parser.cursor) {
        None => Ok(node),
        Some(token) => Err(ExpressionError::Syntax {
            offset: token.offset,
            message: "trailing input after expression".to_string(),
        }),
    }
}

/// Parses an interpolated template string such as `Re: @{variables('subject')}`.
///
/// Literal runs and embedded `@{...}` expressions become the parts of a
/// concatenation node; a template that is one embedded expression with no
/// surrounding text collapses to that expression. `@@` escapes a literal `@`.
pub fn parse_template(raw: &str) -> Result<ExprNode, ExpressionError> {
    let mut parts: Vec<ExprNode> = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != '@' {
            literal.push(c);
            continue;
        }
        match chars.peek() {
            Some(&(_, '@')) => {
                chars.next();
                literal.push('@');
            }
            Some(&(inner_start, '{')) => {
                chars.next();
                let rest = &raw[inner_start + 1..];
                let end = interpolation_end(rest).ok_or(ExpressionError::Syntax {
                    offset,
                    message: "unterminated interpolation".to_string(),
                })?;
                if !literal.is_empty() {
                    parts.push(ExprNode::Literal(LiteralValue::Text(std::mem::take(
                        &mut literal,
                    ))));
                }
                parts.push(parse_expression(&rest[..end])?);
                // Skip what the sub-parse consumed, plus the closing brace.
                let resume = inner_start + 1 + end + 1;
                while chars.peek().is_some_and(|&(i, _)| i < resume) {
                    chars.next();
                }
            }
            _ => literal.push('@'),
        }
    }

    if !literal.is_empty() {
        parts.push(ExprNode::Literal(LiteralValue::Text(literal)));
    }
    match parts.len() {
        0 => Ok(ExprNode::Literal(LiteralValue::Text(String::new()))),
        1 => Ok(parts.into_iter().next().unwrap_or(ExprNode::Concat(vec![]))),
        _ => Ok(ExprNode::Concat(parts)),
    }
}

/// Byte offset of the `}` closing an interpolation, ignoring braces inside
/// quoted strings.
fn interpolation_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '}') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.cursor).map(|t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .or_else(|| self.tokens.last())
            .map(|t| t.offset)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ExpressionError> {
        let offset = self.offset();
        match self.advance() {
            Some(token) if token.kind == kind => Ok(()),
            _ => Err(ExpressionError::Syntax {
                offset,
                message: format!("expected {}", what),
            }),
        }
    }

    fn expression(&mut self, depth: usize) -> Result<ExprNode, ExpressionError> {
        if depth >= MAX_EXPRESSION_DEPTH {
            return Err(ExpressionError::TooComplex {
                limit: MAX_EXPRESSION_DEPTH,
            });
        }

        let offset = self.offset();
        let mut node = match self.advance().map(|t| t.kind) {
            Some(TokenKind::Ident(name)) => {
                if matches!(self.peek(), Some(TokenKind::LParen)) {
                    let args = self.arguments(depth)?;
                    ExprNode::Call { name, args }
                } else {
                    match name.as_str() {
                        "true" => ExprNode::Literal(LiteralValue::Bool(true)),
                        "false" => ExprNode::Literal(LiteralValue::Bool(false)),
                        "null" => ExprNode::Literal(LiteralValue::Null),
                        _ => ExprNode::Identifier(name),
                    }
                }
            }
            Some(TokenKind::Text(text)) => ExprNode::Literal(LiteralValue::Text(text)),
            Some(TokenKind::Number(value)) => ExprNode::Literal(LiteralValue::Number(value)),
            Some(TokenKind::LParen) => {
                let inner = self.expression(depth + 1)?;
                self.expect(TokenKind::RParen, "')'")?;
                inner
            }
            _ => {
                return Err(ExpressionError::Syntax {
                    offset,
                    message: "expected an expression".to_string(),
                });
            }
        };

        loop {
            match self.peek() {
                Some(TokenKind::Dot) => {
                    self.cursor += 1;
                    let offset = self.offset();
                    match self.advance().map(|t| t.kind) {
                        Some(TokenKind::Ident(name)) => {
                            node = node.index(PropertyKey::Name(name));
                        }
                        _ => {
                            return Err(ExpressionError::Syntax {
                                offset,
                                message: "expected a property name after '.'".to_string(),
                            });
                        }
                    }
                }
                Some(TokenKind::Question) => {
                    self.cursor += 1;
                    self.expect(TokenKind::LBracket, "'[' after '?'")?;
                    let key = self.selector()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    node = node.index(key);
                }
                Some(TokenKind::LBracket) => {
                    self.cursor += 1;
                    let key = self.selector()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    node = node.index(key);
                }
                _ => break,
            }
        }

        Ok(node)
    }

    fn selector(&mut self) -> Result<PropertyKey, ExpressionError> {
        let offset = self.offset();
        match self.advance().map(|t| t.kind) {
            Some(TokenKind::Text(text)) => Ok(PropertyKey::Name(text)),
            Some(TokenKind::Ident(name)) => Ok(PropertyKey::Name(name)),
            Some(TokenKind::Number(value)) if value.fract() == 0.0 => {
                Ok(PropertyKey::Index(value as i64))
            }
            _ => Err(ExpressionError::Syntax {
                offset,
                message: "expected a selector".to_string(),
            }),
        }
    }

    fn arguments(&mut self, depth: usize) -> Result<Vec<ExprNode>, ExpressionError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if matches!(self.peek(), Some(TokenKind::RParen)) {
            self.cursor += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression(depth + 1)?);
            match self.peek() {
                Some(TokenKind::Comma) => {
                    self.cursor += 1;
                }
                Some(TokenKind::RParen) => {
                    self.cursor += 1;
                    break;
                }
                _ => {
                    return Err(ExpressionError::Syntax {
                        offset: self.offset(),
                        message: "expected ',' or ')' in argument list".to_string(),
                    });
                }
            }
        }
        Ok(args)
    }
}
