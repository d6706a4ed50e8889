use thiserror::Error;

use crate::ast::Token;

/// Error raised for text that cannot be split into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct LexError {
    pub message: String,
    /// Character offset into the expression
    pub position: usize,
}

/// A token and the character offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Whether the previous token can end an operand. Decides if `-1` is a
    /// negative number or a subtraction.
    after_operand: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            after_operand: false,
        }
    }

    /// Current character offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Lex the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let position = self.position;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(Spanned { token, position });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>, position: usize) -> LexError {
        LexError {
            message: message.into(),
            position,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Read up to the unescaped closing `delimiter`, returning the raw text
    /// between the delimiters with escapes left in place.
    fn read_delimited(&mut self, delimiter: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening delimiter

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == delimiter => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    result.push(ch);
                    self.advance();
                    if let Some(escaped) = self.current_char() {
                        result.push(escaped);
                        self.advance();
                    }
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(self.error(format!("Unterminated {} delimiter", delimiter), start))
    }

    fn read_quoted_identifier(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let raw = self.read_delimited('"')?;
        serde_json::from_str::<String>(&format!("\"{}\"", raw))
            .map(Token::QuotedIdentifier)
            .map_err(|e| self.error(format!("Invalid quoted identifier: {}", e), start))
    }

    fn read_raw_string(&mut self) -> Result<Token, LexError> {
        let raw = self.read_delimited('\'')?;
        Ok(Token::RawString(raw.replace("\\'", "'")))
    }

    fn read_json_literal(&mut self) -> Result<Token, LexError> {
        let raw = self.read_delimited('`')?.replace("\\`", "`");
        match serde_json::from_str(raw.trim()) {
            Ok(json) => Ok(Token::Literal(json)),
            // Legacy form: `foo` is the string "foo"
            Err(_) => Ok(Token::Literal(serde_json::Value::String(
                raw.trim().to_string(),
            ))),
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
        }

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| self.error(format!("Invalid number '{}'", number), start))
        } else {
            number
                .parse::<i64>()
                .map(Token::Number)
                .map_err(|_| self.error(format!("Invalid integer '{}'", number), start))
        }
    }

    /// Consume `second` if it follows, choosing between a two-character and
    /// a one-character token.
    fn either(&mut self, second: char, double: Token, single: Token) -> Token {
        self.advance();
        if self.current_char() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let token = self.scan()?;
        self.after_operand = matches!(
            token,
            Token::Identifier(_)
                | Token::QuotedIdentifier(_)
                | Token::RawString(_)
                | Token::Literal(_)
                | Token::Number(_)
                | Token::Float(_)
                | Token::Variable(_)
                | Token::Root
                | Token::Current
                | Token::RBracket
                | Token::RBrace
                | Token::RParen
                | Token::Flatten
        );
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.position;

        let token = match self.current_char() {
            None => Token::Eof,
            Some('$') => {
                self.advance();
                if self
                    .current_char()
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                {
                    Token::Variable(self.read_identifier())
                } else {
                    Token::Root
                }
            }
            Some('@') => {
                self.advance();
                Token::Current
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some(':') => {
                self.advance();
                Token::Colon
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('{') => {
                self.advance();
                Token::LBrace
            }
            Some('}') => {
                self.advance();
                Token::RBrace
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some('[') => match self.peek_char(1) {
                Some('?') => {
                    self.advance();
                    self.advance();
                    Token::Filter
                }
                Some(']') => {
                    self.advance();
                    self.advance();
                    Token::Flatten
                }
                _ => {
                    self.advance();
                    Token::LBracket
                }
            },
            Some('/') => self.either('/', Token::DoubleSlash, Token::Slash),
            Some('|') => self.either('|', Token::Or, Token::Pipe),
            Some('&') => self.either('&', Token::And, Token::Expref),
            Some('!') => self.either('=', Token::NotEq, Token::Not),
            Some('=') => self.either('=', Token::EqEq, Token::Assign),
            Some('<') => self.either('=', Token::LtEq, Token::Lt),
            Some('>') => self.either('=', Token::GtEq, Token::Gt),
            Some('-') => {
                if !self.after_operand && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number()?
                } else {
                    self.advance();
                    Token::Minus
                }
            }
            Some('"') => self.read_quoted_identifier()?,
            Some('\'') => self.read_raw_string()?,
            Some('`') => self.read_json_literal()?,
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                Token::Identifier(self.read_identifier())
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => return Err(self.error(format!("Unexpected character '{}'", ch), start)),
        };

        Ok(token)
    }
}

#[test]
fn test_negative_number_after_operand_is_subtraction() {
    let tokens = |s: &str| -> Vec<Token> {
        Lexer::new(s)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    };
    assert_eq!(tokens("[-1]")[1], Token::Number(-1));
    assert_eq!(
        tokens("a-1"),
        vec![
            Token::Identifier("a".to_string()),
            Token::Minus,
            Token::Number(1),
            Token::Eof
        ]
    );
}
