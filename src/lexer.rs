use std::fmt;

use crate::ast::Token;

/// Location in the source text (both fields 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors produced while splitting the source into tokens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedChar { ch: char, position: Position },

    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },

    #[error("invalid escape sequence '\\{ch}' at {position}")]
    InvalidEscape { ch: char, position: Position },

    #[error("invalid unicode escape at {position}")]
    InvalidUnicode { position: Position },

    #[error("invalid number '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },

    #[error("unknown literal '{word}' at {position}")]
    UnknownLiteral { word: String, position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedChar { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::InvalidEscape { position, .. }
            | LexError::InvalidUnicode { position }
            | LexError::InvalidNumber { position, .. }
            | LexError::UnknownLiteral { position, .. } => *position,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if matches!(ch, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
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

    fn read_hex4(&mut self) -> Result<u32, LexError> {
        let start = self.here();
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .current_char()
                .and_then(|c| c.to_digit(16))
                .ok_or(LexError::InvalidUnicode { position: start })?;
            code = code * 16 + digit;
            self.advance();
        }
        Ok(code)
    }

    /// Decodes the code point after `\u`, joining surrogate pairs.
    fn read_unicode_escape(&mut self, position: Position) -> Result<char, LexError> {
        let high = self.read_hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            if self.current_char() != Some('\\') || self.peek_char(1) != Some('u') {
                return Err(LexError::InvalidUnicode { position });
            }
            self.advance();
            self.advance();
            let low = self.read_hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(LexError::InvalidUnicode { position });
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(code).ok_or(LexError::InvalidUnicode { position });
        }
        char::from_u32(high).ok_or(LexError::InvalidUnicode { position })
    }

    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.here();
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.here();
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('b') => result.push('\u{0008}'),
                        Some('f') => result.push('\u{000C}'),
                        Some('"') => result.push('"'),
                        Some('\\') => result.push('\\'),
                        Some('/') => result.push('/'),
                        Some('u') => {
                            self.advance();
                            result.push(self.read_unicode_escape(escape_at)?);
                            continue;
                        }
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                ch,
                                position: escape_at,
                            });
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.here();
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
            } else if ch == 'e' || ch == 'E' {
                is_float = true;
                number.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char() {
                    number.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        let invalid = || LexError::InvalidNumber {
            text: number.clone(),
            position: start,
        };

        if is_float {
            number.parse::<f64>().map(Token::Float).map_err(|_| invalid())
        } else {
            match number.parse::<i64>() {
                Ok(n) => Ok(Token::Integer(n)),
                // Out of i64 range, keep it as a float like most JSON readers do
                Err(_) => number.parse::<f64>().map(Token::Float).map_err(|_| invalid()),
            }
        }
    }

    /// Returns the next token together with the position it starts at.
    pub fn next_token(&mut self) -> Result<(Token, Position), LexError> {
        self.skip_whitespace();
        let position = self.here();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('{') => {
                self.advance();
                Token::LBrace
            }
            Some('}') => {
                self.advance();
                Token::RBrace
            }
            Some('[') => {
                self.advance();
                Token::LBracket
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some(':') => {
                self.advance();
                Token::Colon
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('"') => Token::String(self.read_string()?),
            Some(ch) if ch.is_ascii_digit() || ch == '-' => self.read_number()?,
            Some(ch) if ch.is_ascii_alphabetic() => {
                let word = self.read_word();
                match word.as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => return Err(LexError::UnknownLiteral { word, position }),
                }
            }
            Some(ch) => return Err(LexError::UnexpectedChar { ch, position }),
        };

        Ok((token, position))
    }
}

#[test]
fn test_literals() {
    let mut lexer = Lexer::new("true false null");
    assert_eq!(lexer.next_token().unwrap().0, Token::Boolean(true));
    assert_eq!(lexer.next_token().unwrap().0, Token::Boolean(false));
    assert_eq!(lexer.next_token().unwrap().0, Token::Null);
    assert_eq!(lexer.next_token().unwrap().0, Token::Eof);
}

#[test]
fn test_positions_track_lines() {
    let mut lexer = Lexer::new("{\n  \"path\"");
    assert_eq!(lexer.next_token().unwrap(), (Token::LBrace, Position::new(1, 1)));
    assert_eq!(
        lexer.next_token().unwrap(),
        (Token::String("path".to_string()), Position::new(2, 3))
    );
}
