use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Unquoted field name or function name
    ///
    /// # Examples
    /// ```text
    /// metadata
    /// to_upper
    /// _internal
    /// ```
    Identifier(String),

    /// Double-quoted field name, allowing characters an identifier cannot hold
    ///
    /// # Examples
    /// ```text
    /// "app.kubernetes.io/name"
    /// "with space"
    /// ```
    QuotedIdentifier(String),

    /// Single-quoted raw string literal
    ///
    /// # Examples
    /// ```text
    /// 'hello'
    /// '12.*'
    /// ```
    RawString(String),

    /// Backtick-delimited JSON literal, already decoded
    ///
    /// # Examples
    /// ```text
    /// `12`
    /// `{"a": [1, 2]}`
    /// `"12Ki"`
    /// ```
    Literal(Json),

    /// Integer, used for indices and slice bounds (and bare numeric literals)
    ///
    /// # Examples
    /// ```text
    /// 0
    /// -1
    /// ```
    Number(i64),

    /// Floating point number written without backticks
    Float(f64),

    /// Variable reference (`$name`)
    Variable(String),

    // References
    /// Root document (`$`)
    Root,

    /// Current node (`@`)
    Current,

    /// Expression reference prefix (`&`)
    Expref,

    // Delimiters
    Dot,
    Comma,
    Colon,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    /// Filter opener (`[?`)
    Filter,
    /// Flatten (`[]`)
    Flatten,
    /// Let binding assignment (`=`)
    Assign,

    // Logical
    /// Pipe (`|`)
    Pipe,
    /// Logical OR (`||`)
    Or,
    /// Logical AND (`&&`)
    And,
    /// Logical NOT (`!`)
    Not,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Arithmetic
    Plus,
    Minus,
    /// Wildcard or multiplication, depending on position
    Star,
    Slash,
    DoubleSlash,
    Percent,

    /// End of input
    Eof,
}

impl Token {
    /// Left binding power used by the Pratt parser.
    pub fn binding_power(&self) -> u8 {
        match self {
            Token::Pipe => 1,
            Token::Or => 2,
            Token::And => 3,
            Token::EqEq | Token::NotEq | Token::Lt | Token::LtEq | Token::Gt | Token::GtEq => 5,
            Token::Plus | Token::Minus => 6,
            Token::Star | Token::Slash | Token::DoubleSlash | Token::Percent => 7,
            Token::Flatten => 9,
            Token::Filter => 21,
            Token::Dot => 40,
            Token::Not => 45,
            Token::LBrace => 50,
            Token::LBracket => 55,
            Token::LParen => 60,
            _ => 0,
        }
    }

    /// Short description used in parse errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier '{}'", name),
            Token::QuotedIdentifier(name) => format!("quoted identifier \"{}\"", name),
            Token::RawString(s) => format!("raw string '{}'", s),
            Token::Literal(json) => format!("literal `{}`", json),
            Token::Number(n) => format!("number {}", n),
            Token::Float(n) => format!("number {}", n),
            Token::Variable(name) => format!("variable ${}", name),
            Token::Eof => "end of expression".to_string(),
            other => format!("{:?}", other),
        }
    }
}
