//! Query parser
//!
//! Recursive descent parser producing location paths. Namespace
//! prefixes are resolved against the table passed in, so a compiled
//! query only ever holds URIs.

use super::lexer::{Lexer, Token};
use crate::core::source::NamespaceTable;

/// Axis of a location step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Attribute,
    Parent,
    SelfNode,
    Text,
}

/// Name test of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTest {
    /// `*`
    Any,
    /// `prefix:*`
    AnyIn(String),
    /// `name` or `prefix:name`
    Name {
        namespace: Option<String>,
        local: String,
    },
}

/// One location step
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    /// Step was introduced by `//`
    pub descendant: bool,
    pub test: NameTest,
    pub predicates: Vec<Predicate>,
}

/// A location path; a query is a union of these
#[derive(Debug, Clone)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

/// Predicate inside `[...]`
#[derive(Debug, Clone)]
pub enum Predicate {
    /// 1-based position within the step's result for one context node
    Position(usize),
    Condition(Condition),
}

/// Boolean condition of a predicate
#[derive(Debug, Clone)]
pub enum Condition {
    Or(Box<Condition>, Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Exists(LocationPath),
    Compare {
        path: LocationPath,
        value: String,
        negated: bool,
    },
}

/// Parse a full query (a `|` union of location paths)
pub fn parse(input: &str, namespaces: &NamespaceTable) -> Result<Vec<LocationPath>, String> {
    if input.trim().is_empty() {
        return Err("query is empty".to_string());
    }
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        namespaces,
    };

    let mut paths = vec![parser.parse_path()?];
    while parser.peek() == &Token::Pipe {
        parser.advance();
        paths.push(parser.parse_path()?);
    }
    match parser.peek() {
        Token::Eof => Ok(paths),
        other => Err(format!("unexpected trailing token {other:?}")),
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    namespaces: &'a NamespaceTable,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        let found = self.advance();
        if found == expected {
            Ok(())
        } else {
            Err(format!("expected {expected:?}, found {found:?}"))
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Token::Dot | Token::DoubleDot | Token::At | Token::Star | Token::Name(_)
        )
    }

    fn parse_path(&mut self) -> Result<LocationPath, String> {
        match self.peek() {
            Token::Slash => {
                self.advance();
                let steps = if self.starts_step() {
                    self.parse_steps(false)?
                } else {
                    Vec::new()
                };
                Ok(LocationPath {
                    absolute: true,
                    steps,
                })
            }
            Token::DoubleSlash => {
                self.advance();
                Ok(LocationPath {
                    absolute: true,
                    steps: self.parse_steps(true)?,
                })
            }
            _ => Ok(LocationPath {
                absolute: false,
                steps: self.parse_steps(false)?,
            }),
        }
    }

    fn parse_steps(&mut self, first_descendant: bool) -> Result<Vec<Step>, String> {
        let mut steps = vec![self.parse_step(first_descendant)?];
        loop {
            match self.peek() {
                Token::Slash => {
                    self.advance();
                    steps.push(self.parse_step(false)?);
                }
                Token::DoubleSlash => {
                    self.advance();
                    steps.push(self.parse_step(true)?);
                }
                _ => break,
            }
        }

        let last = steps.len() - 1;
        if steps[..last]
            .iter()
            .any(|s| matches!(s.axis, Axis::Attribute | Axis::Text))
        {
            return Err("attribute and text() steps must be the last step".to_string());
        }
        Ok(steps)
    }

    fn parse_step(&mut self, descendant: bool) -> Result<Step, String> {
        let simple = |axis, test| Step {
            axis,
            descendant,
            test,
            predicates: Vec::new(),
        };

        match self.peek().clone() {
            Token::Dot => {
                self.advance();
                Ok(simple(Axis::SelfNode, NameTest::Any))
            }
            Token::DoubleDot => {
                self.advance();
                Ok(simple(Axis::Parent, NameTest::Any))
            }
            Token::At => {
                self.advance();
                let test = self.parse_name_test()?;
                Ok(simple(Axis::Attribute, test))
            }
            Token::Name(name) if name == "text" && self.peek_at(1) == &Token::LeftParen => {
                self.advance();
                self.advance();
                self.expect(Token::RightParen)?;
                Ok(simple(Axis::Text, NameTest::Any))
            }
            Token::Name(_) | Token::Star => {
                let test = self.parse_name_test()?;
                let mut step = simple(Axis::Child, test);
                while self.peek() == &Token::LeftBracket {
                    self.advance();
                    step.predicates.push(self.parse_predicate()?);
                    self.expect(Token::RightBracket)?;
                }
                Ok(step)
            }
            other => Err(format!("expected a location step, found {other:?}")),
        }
    }

    fn parse_name_test(&mut self) -> Result<NameTest, String> {
        match self.advance() {
            Token::Star => Ok(NameTest::Any),
            Token::Name(first) => {
                if self.peek() != &Token::Colon {
                    return Ok(NameTest::Name {
                        namespace: None,
                        local: first,
                    });
                }
                self.advance();
                let namespace = self.resolve(&first)?;
                match self.advance() {
                    Token::Star => Ok(NameTest::AnyIn(namespace)),
                    Token::Name(local) => Ok(NameTest::Name {
                        namespace: Some(namespace),
                        local,
                    }),
                    other => Err(format!("expected local name after '{first}:', found {other:?}")),
                }
            }
            other => Err(format!("expected a name test, found {other:?}")),
        }
    }

    fn resolve(&self, prefix: &str) -> Result<String, String> {
        self.namespaces
            .uri(prefix)
            .map(str::to_string)
            .ok_or_else(|| format!("unknown namespace prefix '{prefix}'"))
    }

    fn parse_predicate(&mut self) -> Result<Predicate, String> {
        let position = match (self.peek(), self.peek_at(1)) {
            (Token::Number(n), Token::RightBracket) => Some(*n),
            _ => None,
        };
        if let Some(n) = position {
            self.advance();
            if n == 0 {
                return Err("positions start at 1".to_string());
            }
            return Ok(Predicate::Position(n));
        }
        Ok(Predicate::Condition(self.parse_or()?))
    }

    fn parse_or(&mut self) -> Result<Condition, String> {
        let mut left = self.parse_and()?;
        while self.peek() == &Token::Name("or".to_string()) {
            self.advance();
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, String> {
        let mut left = self.parse_primary()?;
        while self.peek() == &Token::Name("and".to_string()) {
            self.advance();
            let right = self.parse_primary()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Condition, String> {
        if self.peek() == &Token::Name("not".to_string()) && self.peek_at(1) == &Token::LeftParen {
            self.advance();
            self.advance();
            let inner = self.parse_or()?;
            self.expect(Token::RightParen)?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        if self.peek() == &Token::LeftParen {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(Token::RightParen)?;
            return Ok(inner);
        }

        let path = self.parse_path()?;
        let negated = match self.peek() {
            Token::Eq => false,
            Token::NotEq => true,
            _ => return Ok(Condition::Exists(path)),
        };
        self.advance();
        let value = match self.advance() {
            Token::Literal(s) => s,
            Token::Number(n) => n.to_string(),
            other => return Err(format!("expected a literal to compare with, found {other:?}")),
        };
        Ok(Condition::Compare {
            path,
            value,
            negated,
        })
    }
}
