/// Lexical token of a JSON query or mapping source.
///
/// Tokens are purely lexical: the lexer does not check that braces balance or
/// that commas separate members. That is the job of
/// [`JsonStream`](crate::stream::JsonStream).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Number with a fraction or exponent
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// -1.0
    /// 2e10
    /// ```
    Float(f64),

    /// Integer that fits in an `i64`
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -10
    /// ```
    Integer(i64),

    /// String literal enclosed in double quotes, escapes already decoded
    ///
    /// # Examples
    /// ```text
    /// "comments"
    /// "café"
    /// ```
    String(String),

    /// `true` or `false`
    Boolean(bool),

    /// `null`
    Null,

    // Delimiters
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:`
    Colon,
    /// `,`
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Short human-readable description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Float(n) => format!("number {}", n),
            Token::Integer(n) => format!("number {}", n),
            Token::String(s) => format!("string {:?}", s),
            Token::Boolean(b) => b.to_string(),
            Token::Null => "null".to_string(),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
