use std::mem;

use thiserror::Error;

use crate::{
    ast::{ArithmeticOp, Ast, Comparator, Token, UnaryOp},
    lexer::{LexError, Lexer, Spanned},
    value::Value,
};

/// Binding power of the right-hand side of `[*]`, `.*`, `[]` and slices.
const STAR_BP: u8 = 20;

/// Tokens below this binding power end a projection.
const PROJECTION_STOP: u8 = 10;

/// Right binding power of prefix `-` and `+`: tighter than arithmetic,
/// looser than `.` and `[`.
const UNARY_BP: u8 = 35;

/// Error raised for text that does not form a valid expression.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    /// Character offset of the offending token
    pub position: usize,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            position: e.position,
        }
    }
}

/// Parse `input` into an AST.
pub fn parse(input: &str) -> Result<Ast, ParseError> {
    Parser::new(Lexer::new(input))?.parse()
}

/// Pratt parser over the token stream of one expression.
pub struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    max_depth: Option<usize>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Result<Self, ParseError> {
        Ok(Parser {
            tokens: lexer.tokenize()?,
            index: 0,
            max_depth: None,
        })
    }

    /// Reject expressions whose tree is deeper than `depth`.
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Ast, ParseError> {
        let ast = self.expression(0)?;
        if !self.check(&Token::Eof) {
            return Err(self.unexpected());
        }
        if let Some(max) = self.max_depth {
            let depth = ast.depth();
            if depth > max {
                return Err(ParseError {
                    message: format!(
                        "Expression nesting depth {} exceeds the maximum of {}",
                        depth, max
                    ),
                    position: 0,
                });
            }
        }
        Ok(ast)
    }

    fn current(&self) -> &Token {
        self.lookahead(0)
    }

    fn lookahead(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.index + offset)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .or(self.tokens.last())
            .map(|t| t.position)
            .unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() {
            self.index += 1;
        }
    }

    /// Take the current token and move past it.
    fn next(&mut self) -> Token {
        let token = match self.tokens.get_mut(self.index) {
            Some(spanned) => mem::replace(&mut spanned.token, Token::Eof),
            None => Token::Eof,
        };
        self.advance();
        token
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(self.current()) == mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.error(format!(
                "Expected {}, got {}",
                expected.describe(),
                self.current().describe()
            )));
        }
        self.advance();
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.position(),
        }
    }

    fn unexpected(&self) -> ParseError {
        self.error(format!("Unexpected {}", self.current().describe()))
    }

    fn expression(&mut self, rbp: u8) -> Result<Ast, ParseError> {
        let position = self.position();
        let token = self.next();
        let mut left = self.nud(token, position)?;
        while rbp < self.current().binding_power() {
            let position = self.position();
            let token = self.next();
            left = self.led(token, left, position)?;
        }
        Ok(left)
    }

    /// Prefix position.
    fn nud(&mut self, token: Token, position: usize) -> Result<Ast, ParseError> {
        match token {
            Token::Literal(json) => Ok(Ast::Literal(Value::from(json))),
            Token::RawString(s) => Ok(Ast::Literal(Value::String(s))),
            Token::Number(n) => Ok(Ast::Literal(Value::from(n))),
            Token::Float(n) => Ok(Ast::Literal(Value::Number(n))),
            Token::Identifier(name) => {
                if name == "let" && matches!(self.current(), Token::Variable(_)) {
                    self.parse_let()
                } else {
                    Ok(Ast::Field(name))
                }
            }
            Token::QuotedIdentifier(name) => {
                if self.check(&Token::LParen) {
                    return Err(self.error("Quoted identifiers cannot be used as function names"));
                }
                Ok(Ast::Field(name))
            }
            Token::Variable(name) => Ok(Ast::VariableRef(name)),
            Token::Root => Ok(Ast::Root),
            Token::Current => Ok(Ast::Identity),
            Token::Star => {
                let rhs = if self.check(&Token::RBracket) {
                    Ast::Identity
                } else {
                    self.projection_rhs(STAR_BP)?
                };
                Ok(Ast::ValueProjection {
                    lhs: Box::new(Ast::Identity),
                    rhs: Box::new(rhs),
                })
            }
            Token::Filter => self.parse_filter(Ast::Identity),
            Token::LBrace => self.parse_multi_select_hash(),
            Token::Flatten => {
                let lhs = Ast::Flatten(Box::new(Ast::Identity));
                let rhs = self.projection_rhs(Token::Flatten.binding_power())?;
                Ok(Ast::Projection {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            Token::LBracket => match self.current() {
                Token::Number(_) | Token::Colon => {
                    let rhs = self.parse_index_expression()?;
                    self.project_if_slice(Ast::Identity, rhs)
                }
                Token::Star if matches!(self.lookahead(1), Token::RBracket) => {
                    self.advance();
                    self.advance();
                    let rhs = self.projection_rhs(STAR_BP)?;
                    Ok(Ast::Projection {
                        lhs: Box::new(Ast::Identity),
                        rhs: Box::new(rhs),
                    })
                }
                _ => self.parse_multi_select_list(),
            },
            Token::Expref => {
                let expr = self.expression(Token::Expref.binding_power())?;
                Ok(Ast::ExpressionRef(Box::new(expr)))
            }
            Token::Not => {
                let expr = self.expression(Token::Not.binding_power())?;
                Ok(Ast::Not(Box::new(expr)))
            }
            Token::Minus => self.parse_unary(UnaryOp::Minus),
            Token::Plus => self.parse_unary(UnaryOp::Plus),
            Token::LParen => {
                let expr = self.expression(0)?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Eof => Err(ParseError {
                message: "Unexpected end of expression".to_string(),
                position,
            }),
            other => Err(ParseError {
                message: format!("Unexpected {}", other.describe()),
                position,
            }),
        }
    }

    /// Infix position.
    fn led(&mut self, token: Token, left: Ast, position: usize) -> Result<Ast, ParseError> {
        let bp = token.binding_power();
        match token {
            Token::Dot => {
                let rhs = self.dot_rhs(bp)?;
                Ok(Ast::Subexpression {
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::Pipe => {
                let rhs = self.expression(bp)?;
                Ok(Ast::Pipe {
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::Or => {
                let rhs = self.expression(bp)?;
                Ok(Ast::Or {
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::And => {
                let rhs = self.expression(bp)?;
                Ok(Ast::And {
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::LParen => self.parse_function_call(left, position),
            Token::Filter => self.parse_filter(left),
            Token::Flatten => {
                let lhs = Ast::Flatten(Box::new(left));
                let rhs = self.projection_rhs(bp)?;
                Ok(Ast::Projection {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                })
            }
            Token::EqEq | Token::NotEq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq => {
                let op = match token {
                    Token::EqEq => Comparator::Equal,
                    Token::NotEq => Comparator::NotEqual,
                    Token::Lt => Comparator::LessThan,
                    Token::LtEq => Comparator::LessEqual,
                    Token::Gt => Comparator::GreaterThan,
                    _ => Comparator::GreaterEqual,
                };
                let rhs = self.expression(bp)?;
                Ok(Ast::Comparator {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::Plus
            | Token::Minus
            | Token::Star
            | Token::Slash
            | Token::DoubleSlash
            | Token::Percent => {
                let op = match token {
                    Token::Plus => ArithmeticOp::Add,
                    Token::Minus => ArithmeticOp::Subtract,
                    Token::Star => ArithmeticOp::Multiply,
                    Token::Slash => ArithmeticOp::Divide,
                    Token::DoubleSlash => ArithmeticOp::IntegerDivide,
                    _ => ArithmeticOp::Modulo,
                };
                let rhs = self.expression(bp)?;
                Ok(Ast::Arithmetic {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::LBracket => match self.current() {
                Token::Number(_) | Token::Colon => {
                    let rhs = self.parse_index_expression()?;
                    self.project_if_slice(left, rhs)
                }
                _ => {
                    self.expect(Token::Star)?;
                    self.expect(Token::RBracket)?;
                    let rhs = self.projection_rhs(STAR_BP)?;
                    Ok(Ast::Projection {
                        lhs: Box::new(left),
                        rhs: Box::new(rhs),
                    })
                }
            },
            other => Err(ParseError {
                message: format!("Unexpected {}", other.describe()),
                position,
            }),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp) -> Result<Ast, ParseError> {
        let operand = self.expression(UNARY_BP)?;
        Ok(Ast::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// `[n]` or a slice; the opening bracket is already consumed.
    fn parse_index_expression(&mut self) -> Result<Ast, ParseError> {
        if matches!(self.lookahead(0), Token::Colon) || matches!(self.lookahead(1), Token::Colon) {
            return self.parse_slice_expression();
        }
        let index = match self.next() {
            Token::Number(n) => n,
            other => {
                return Err(self.error(format!("Expected an index, got {}", other.describe())));
            }
        };
        self.expect(Token::RBracket)?;
        Ok(Ast::Index(index))
    }

    fn parse_slice_expression(&mut self) -> Result<Ast, ParseError> {
        let mut parts: [Option<i64>; 3] = [None; 3];
        let mut index = 0;
        while !self.check(&Token::RBracket) && index < 3 {
            match self.current() {
                Token::Colon => {
                    index += 1;
                    self.advance();
                }
                Token::Number(n) if parts[index].is_none() => {
                    parts[index] = Some(*n);
                    self.advance();
                }
                _ => return Err(self.unexpected()),
            }
        }
        self.expect(Token::RBracket)?;

        if parts[2] == Some(0) {
            return Err(self.error("Slice step cannot be 0"));
        }
        Ok(Ast::Slice {
            start: parts[0],
            stop: parts[1],
            step: parts[2],
        })
    }

    fn project_if_slice(&mut self, left: Ast, right: Ast) -> Result<Ast, ParseError> {
        let is_slice = matches!(right, Ast::Slice { .. });
        let index_expr = Ast::IndexExpression {
            lhs: Box::new(left),
            rhs: Box::new(right),
        };
        if !is_slice {
            return Ok(index_expr);
        }
        let rhs = self.projection_rhs(STAR_BP)?;
        Ok(Ast::Projection {
            lhs: Box::new(index_expr),
            rhs: Box::new(rhs),
        })
    }

    /// `[? predicate ]`; the filter opener is already consumed.
    fn parse_filter(&mut self, left: Ast) -> Result<Ast, ParseError> {
        let predicate = self.expression(0)?;
        self.expect(Token::RBracket)?;
        let rhs = if self.check(&Token::Flatten) {
            Ast::Identity
        } else {
            self.projection_rhs(Token::Filter.binding_power())?
        };
        Ok(Ast::FilterProjection {
            lhs: Box::new(left),
            rhs: Box::new(rhs),
            predicate: Box::new(predicate),
        })
    }

    fn dot_rhs(&mut self, bp: u8) -> Result<Ast, ParseError> {
        match self.current() {
            Token::Identifier(_) | Token::QuotedIdentifier(_) | Token::Star => self.expression(bp),
            Token::LBracket => {
                self.advance();
                self.parse_multi_select_list()
            }
            Token::LBrace => {
                self.advance();
                self.parse_multi_select_hash()
            }
            _ => Err(self.error(format!(
                "Expected identifier, '*', '[' or '{{' after '.', got {}",
                self.current().describe()
            ))),
        }
    }

    fn projection_rhs(&mut self, bp: u8) -> Result<Ast, ParseError> {
        if self.current().binding_power() < PROJECTION_STOP {
            return Ok(Ast::Identity);
        }
        if self.check(&Token::LBracket) || self.check(&Token::Filter) {
            self.expression(bp)
        } else if self.check(&Token::Dot) {
            self.advance();
            self.dot_rhs(bp)
        } else {
            Err(self.unexpected())
        }
    }

    /// `[a, b]`; the opening bracket is already consumed.
    fn parse_multi_select_list(&mut self) -> Result<Ast, ParseError> {
        let mut items = Vec::new();
        loop {
            items.push(self.expression(0)?);
            if self.check(&Token::RBracket) {
                break;
            }
            self.expect(Token::Comma)?;
        }
        self.expect(Token::RBracket)?;
        Ok(Ast::MultiSelectList(items))
    }

    /// `{k: v, ...}`; the opening brace is already consumed.
    fn parse_multi_select_hash(&mut self) -> Result<Ast, ParseError> {
        let mut entries = Vec::new();
        loop {
            let key = match self.next() {
                Token::Identifier(name) | Token::QuotedIdentifier(name) => name,
                other => {
                    return Err(self.error(format!(
                        "Expected a key name, got {}",
                        other.describe()
                    )));
                }
            };
            self.expect(Token::Colon)?;
            let value = self.expression(0)?;
            entries.push(Ast::KeyValuePair {
                key,
                value: Box::new(value),
            });
            if self.check(&Token::RBrace) {
                break;
            }
            self.expect(Token::Comma)?;
        }
        self.expect(Token::RBrace)?;
        Ok(Ast::MultiSelectHash(entries))
    }

    fn parse_function_call(&mut self, left: Ast, position: usize) -> Result<Ast, ParseError> {
        let name = match left {
            Ast::Field(name) => name,
            other => {
                return Err(ParseError {
                    message: format!("Cannot call a {} node as a function", other.kind()),
                    position,
                });
            }
        };

        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.expression(0)?);
            if self.check(&Token::Comma) {
                self.advance();
            } else if !self.check(&Token::RParen) {
                return Err(self.unexpected());
            }
        }
        self.expect(Token::RParen)?;
        Ok(Ast::FunctionCall { name, args })
    }

    /// `let $a = x, $b = y in body`; the `let` keyword is already consumed.
    fn parse_let(&mut self) -> Result<Ast, ParseError> {
        let mut bindings = Vec::new();
        loop {
            let name = match self.next() {
                Token::Variable(name) => name,
                other => {
                    return Err(self.error(format!(
                        "Expected a variable, got {}",
                        other.describe()
                    )));
                }
            };
            self.expect(Token::Assign)?;
            let value = self.expression(0)?;
            bindings.push(Ast::KeyValuePair {
                key: name,
                value: Box::new(value),
            });
            if self.check(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        if !matches!(self.current(), Token::Identifier(word) if word == "in") {
            return Err(self.error(format!(
                "Expected 'in', got {}",
                self.current().describe()
            )));
        }
        self.advance();

        let body = self.expression(0)?;
        Ok(Ast::LetExpression {
            bindings: Box::new(Ast::LetBindings(bindings)),
            body: Box::new(body),
        })
    }
}
