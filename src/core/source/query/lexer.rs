//! Query lexer
//!
//! Tokenizes path expressions. Keywords (`and`, `or`, `not`,
//! `text`) are plain names here; the parser gives them meaning by
//! position.

/// Query token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Slash,        // /
    DoubleSlash,  // //
    Dot,          // .
    DoubleDot,    // ..
    At,           // @
    Pipe,         // |
    Star,         // *
    Colon,        // :
    Eq,           // =
    NotEq,        // !=
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Number(usize),
    Literal(String),
    Name(String),
    Eof,
}

/// Query lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    /// Tokenize the whole input, ending with `Token::Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = |lexer: &mut Self, token: Token| -> Result<Token, String> {
            lexer.advance(1);
            Ok(token)
        };

        match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Ok(Token::DoubleSlash)
                } else {
                    Ok(Token::Slash)
                }
            }
            '.' => {
                self.advance(1);
                if self.peek() == Some('.') {
                    self.advance(1);
                    Ok(Token::DoubleDot)
                } else {
                    Ok(Token::Dot)
                }
            }
            '@' => single(self, Token::At),
            '|' => single(self, Token::Pipe),
            '*' => single(self, Token::Star),
            ':' => single(self, Token::Colon),
            '=' => single(self, Token::Eq),
            '(' => single(self, Token::LeftParen),
            ')' => single(self, Token::RightParen),
            '[' => single(self, Token::LeftBracket),
            ']' => single(self, Token::RightBracket),
            '!' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Ok(Token::NotEq)
                } else {
                    Err(format!("expected '=' after '!' at offset {}", self.pos))
                }
            }
            '\'' | '"' => self.read_literal(c),
            c if c.is_ascii_digit() => self.read_number(),
            c if is_name_start(c) => Ok(self.read_name()),
            other => Err(format!(
                "unexpected character '{other}' at offset {}",
                self.pos
            )),
        }
    }

    fn read_literal(&mut self, quote: char) -> Result<Token, String> {
        let start = self.pos;
        self.advance(1);
        match self.remaining().find(quote) {
            Some(end) => {
                let value = self.remaining()[..end].to_string();
                self.advance(end + 1);
                Ok(Token::Literal(value))
            }
            None => Err(format!("unterminated string literal at offset {start}")),
        }
    }

    fn read_number(&mut self) -> Result<Token, String> {
        let digits: String = self
            .remaining()
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        self.advance(digits.len());
        digits
            .parse()
            .map(Token::Number)
            .map_err(|e| format!("invalid number '{digits}': {e}"))
    }

    fn read_name(&mut self) -> Token {
        let name: String = self
            .remaining()
            .chars()
            .take_while(|&c| is_name_char(c))
            .collect();
        self.advance(name.len());
        Token::Name(name)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
