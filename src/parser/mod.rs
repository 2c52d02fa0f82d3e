//! Recursive descent parser for process formulas
//! Converts tokens into an AST

use crate::ast::*;
use crate::lexer::{self, Token};
use std::ops::Range;
use thiserror::Error;

/// Deepest nesting of parentheses, calls, ternaries and unary chains
pub const MAX_DEPTH: usize = 64;

/// Most binary operators one formula may chain. Chains build left-deep
/// trees, so this bounds tree height together with `MAX_DEPTH`.
pub const MAX_OPERATORS: usize = 256;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("formula is empty")]
    Empty,

    #[error("invalid character in formula")]
    InvalidCharacter { span: Range<usize> },

    #[error("unexpected token: expected {expected}, got '{got}'")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Range<usize>,
    },

    #[error("unexpected end of formula: expected {expected}")]
    UnexpectedEnd { expected: String, span: Range<usize> },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, span: Range<usize> },

    #[error("{function} takes {expected}, got {got}")]
    WrongArity {
        function: &'static str,
        expected: String,
        got: usize,
        span: Range<usize>,
    },

    #[error("member access '{name}' is not allowed")]
    MemberAccess { name: String, span: Range<usize> },

    #[error("formula nested deeper than {} levels", MAX_DEPTH)]
    TooDeep { span: Range<usize> },

    #[error("formula has more than {} operators", MAX_OPERATORS)]
    TooLong { span: Range<usize> },
}

impl ParseError {
    /// Byte range in the formula text the error points at
    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::Empty => 0..0,
            ParseError::InvalidCharacter { span }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEnd { span, .. }
            | ParseError::UnknownFunction { span, .. }
            | ParseError::WrongArity { span, .. }
            | ParseError::MemberAccess { span, .. }
            | ParseError::TooDeep { span }
            | ParseError::TooLong { span } => span.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Lex and parse a complete formula
pub fn parse_formula(source: &str) -> Result<Expr> {
    let tokens = lexer::lex(source).map_err(|span| ParseError::InvalidCharacter { span })?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser::new(tokens, source.len());
    parser.parse()
}

pub struct Parser {
    tokens: Vec<(Token, logos::Span)>,
    position: usize,
    depth: usize,
    operators: usize,
    end: usize,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, logos::Span)>, source_len: usize) -> Self {
        Self {
            tokens,
            position: 0,
            depth: 0,
            operators: 0,
            end: source_len,
        }
    }

    /// Parse one expression spanning every token
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expression()?;
        match self.tokens.get(self.position) {
            None => Ok(expr),
            Some((token, span)) => Err(ParseError::UnexpectedToken {
                expected: "end of formula".to_string(),
                got: token.to_string(),
                span: span.clone(),
            }),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr> {
        self.nested(|p| p.parse_conditional())
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let condition = self.parse_or()?;
        if self.peek() != Some(&Token::Question) {
            return Ok(condition);
        }
        self.advance();
        let then = self.parse_expression()?;
        self.consume(Token::Colon)?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.operator()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.operator()?;
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.operator()?;
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.operator()?;
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.operator()?;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.operator()?;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.nested(|p| p.parse_unary())?;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    // Power binds tighter than unary minus: -2^2 == -(2^2)
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if self.peek() != Some(&Token::Power) {
            return Ok(base);
        }
        self.advance();
        // Right associative; the exponent may carry its own sign
        let exponent = self.nested(|p| p.parse_unary())?;
        Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)))
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let (token, span) = match self.tokens.get(self.position) {
            Some((token, span)) => (token.clone(), span.clone()),
            None => return Err(self.end_error("number, name or '('")),
        };

        match token {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                self.advance();
                if name == MATH_NAMESPACE {
                    return self.parse_math_member(span);
                }
                if self.peek() == Some(&Token::LParen) {
                    let function = match Function::from_name(&name) {
                        Some(function) => function,
                        None => return Err(ParseError::UnknownFunction { name, span }),
                    };
                    return self.parse_call(function, span);
                }
                if self.peek() == Some(&Token::Dot) {
                    return Err(ParseError::MemberAccess {
                        name,
                        span: self.member_span(span),
                    });
                }
                if PI_NAMES.contains(&name.as_str()) {
                    return Ok(Expr::Number(std::f64::consts::PI));
                }
                Ok(Expr::Variable(name))
            }
            other => Err(ParseError::UnexpectedToken {
                expected: "number, name or '('".to_string(),
                got: other.to_string(),
                span,
            }),
        }
    }

    /// `Math.<function>(...)` or `Math.PI`
    fn parse_math_member(&mut self, namespace_span: logos::Span) -> Result<Expr> {
        self.consume(Token::Dot)?;
        let (member, member_span) = match self.tokens.get(self.position) {
            Some((Token::Ident(member), span)) => (member.clone(), span.clone()),
            Some((other, span)) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "function name after 'Math.'".to_string(),
                    got: other.to_string(),
                    span: span.clone(),
                })
            }
            None => return Err(self.end_error("function name after 'Math.'")),
        };
        self.advance();

        let full_span = namespace_span.start..member_span.end;
        if member == "PI" {
            return Ok(Expr::Number(std::f64::consts::PI));
        }
        match Function::from_name(&member) {
            Some(function) if self.peek() == Some(&Token::LParen) => {
                self.parse_call(function, full_span)
            }
            Some(_) => Err(ParseError::UnexpectedToken {
                expected: "'('".to_string(),
                got: self
                    .peek()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "end of formula".to_string()),
                span: self.current_span(),
            }),
            None => Err(ParseError::MemberAccess {
                name: format!("{}.{}", MATH_NAMESPACE, member),
                span: full_span,
            }),
        }
    }

    fn parse_call(&mut self, function: Function, name_span: logos::Span) -> Result<Expr> {
        self.consume(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.peek() == Some(&Token::Comma) {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        let close = self.current_span();
        self.consume(Token::RParen)?;

        let arity = function.arity();
        if !arity.accepts(args.len()) {
            return Err(ParseError::WrongArity {
                function: function.name(),
                expected: arity.to_string(),
                got: args.len(),
                span: name_span.start..close.end,
            });
        }
        Ok(Expr::Call(function, args))
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep {
                span: self.current_span(),
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Consume a binary operator, charging it against the formula's budget
    fn operator(&mut self) -> Result<()> {
        if self.operators >= MAX_OPERATORS {
            return Err(ParseError::TooLong {
                span: self.current_span(),
            });
        }
        self.operators += 1;
        self.advance();
        Ok(())
    }

    // Helper methods

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        match self.tokens.get(self.position) {
            Some((token, _)) if *token == expected => {
                self.advance();
                Ok(())
            }
            Some((token, span)) => Err(ParseError::UnexpectedToken {
                expected: format!("'{}'", expected),
                got: token.to_string(),
                span: span.clone(),
            }),
            None => Err(self.end_error(&format!("'{}'", expected))),
        }
    }

    fn current_span(&self) -> Range<usize> {
        self.tokens
            .get(self.position)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.end..self.end)
    }

    fn member_span(&self, start: logos::Span) -> Range<usize> {
        match self.tokens.get(self.position + 1) {
            Some((_, member)) => start.start..member.end,
            None => start.start..self.end,
        }
    }

    fn end_error(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedEnd {
            expected: expected.to_string(),
            span: self.end..self.end,
        }
    }
}
