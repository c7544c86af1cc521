//! Lexer, parser and evaluator for the expression subset the builders emit.
//!
//! Conditions are conjunctions of `name op :placeholder` comparisons; update
//! expressions are a single `SET` clause of `name = :placeholder` actions.
//! Keywords are matched case-insensitively.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use dynaquery_core::ComparisonOperator;
use dynaquery_model::{AttributeValue, Item};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while parsing or evaluating an expression.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// The expression string was empty.
    #[error("Invalid expression: The expression can not be empty")]
    Empty,
    /// An unexpected token was encountered.
    #[error("Unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: &'static str,
        /// What was found.
        found: String,
    },
    /// A placeholder has no entry in the value map.
    #[error("An expression attribute value used in expression is not defined; attribute value: {name}")]
    UnresolvedValue {
        /// The placeholder, including its leading colon.
        name: String,
    },
    /// The same attribute is assigned twice in one update.
    #[error("Two document paths overlap with each other: [{name}]")]
    OverlappingPaths {
        /// The attribute assigned more than once.
        name: String,
    },
    /// A number attribute could not be parsed.
    #[error("Type mismatch: '{0}' is not a valid number")]
    InvalidNumber(String),
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// One `name op :placeholder` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Attribute name.
    pub name: String,
    /// Comparison operator.
    pub op: ComparisonOperator,
    /// Placeholder, including its leading colon.
    pub placeholder: String,
}

/// One `name = :placeholder` update action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetAction {
    /// Attribute name.
    pub name: String,
    /// Placeholder, including its leading colon.
    pub placeholder: String,
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Identifier(String),
    Placeholder(String),
    Compare(ComparisonOperator),
    Comma,
    And,
    Set,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::Placeholder(s) => write!(f, "{s}"),
            Self::Compare(op) => write!(f, "'{op}'"),
            Self::Comma => write!(f, "','"),
            Self::And => write!(f, "AND"),
            Self::Set => write!(f, "SET"),
            Self::Eof => write!(f, "EOF"),
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ExpressionError> {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }

        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            ':' => {
                self.chars.next();
                let name = self.read_ident_chars();
                if name.is_empty() {
                    return Err(ExpressionError::UnexpectedToken {
                        expected: "value name after ':'",
                        found: "empty".to_owned(),
                    });
                }
                Ok(Token::Placeholder(format!(":{name}")))
            }
            '=' => {
                self.chars.next();
                Ok(Token::Compare(ComparisonOperator::Equal))
            }
            '<' => {
                self.chars.next();
                Ok(Token::Compare(self.or_equal(
                    ComparisonOperator::LessThan,
                    ComparisonOperator::LessOrEqual,
                )))
            }
            '>' => {
                self.chars.next();
                Ok(Token::Compare(self.or_equal(
                    ComparisonOperator::GreaterThan,
                    ComparisonOperator::GreaterOrEqual,
                )))
            }
            ',' => {
                self.chars.next();
                Ok(Token::Comma)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let ident = self.read_ident_chars();
                Ok(match ident.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "set" => Token::Set,
                    _ => Token::Identifier(ident),
                })
            }
            _ => Err(ExpressionError::UnexpectedToken {
                expected: "valid token",
                found: format!("'{ch}'"),
            }),
        }
    }

    fn or_equal(&mut self, strict: ComparisonOperator, inclusive: ComparisonOperator) -> ComparisonOperator {
        if self.chars.peek() == Some(&'=') {
            self.chars.next();
            inclusive
        } else {
            strict
        }
    }

    fn read_ident_chars(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, ExpressionError> {
        if input.trim().is_empty() {
            return Err(ExpressionError::Empty);
        }
        Ok(Self {
            tokens: Lexer::new(input).tokenize()?,
            pos: 0,
        })
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn identifier(&mut self) -> Result<String, ExpressionError> {
        match self.advance() {
            Token::Identifier(name) => Ok(name),
            other => Err(unexpected("attribute name", &other)),
        }
    }

    fn placeholder(&mut self) -> Result<String, ExpressionError> {
        match self.advance() {
            Token::Placeholder(name) => Ok(name),
            other => Err(unexpected("expression attribute value", &other)),
        }
    }

    fn comparison(&mut self) -> Result<ComparisonOperator, ExpressionError> {
        match self.advance() {
            Token::Compare(op) => Ok(op),
            other => Err(unexpected("comparison operator", &other)),
        }
    }
}

fn unexpected(expected: &'static str, found: &Token) -> ExpressionError {
    ExpressionError::UnexpectedToken {
        expected,
        found: found.to_string(),
    }
}

/// Parse a key-condition or filter expression.
///
/// # Errors
///
/// Returns [`ExpressionError`] for empty input or anything outside the
/// `name op :value [AND ...]` grammar.
pub fn parse_condition(input: &str) -> Result<Vec<Condition>, ExpressionError> {
    let mut parser = Parser::new(input)?;
    let mut conditions = Vec::new();
    loop {
        let name = parser.identifier()?;
        let op = parser.comparison()?;
        let placeholder = parser.placeholder()?;
        conditions.push(Condition {
            name,
            op,
            placeholder,
        });
        match parser.advance() {
            Token::And => {}
            Token::Eof => return Ok(conditions),
            other => return Err(unexpected("AND or end of expression", &other)),
        }
    }
}

/// Parse a `SET a = :a, b = :b` update expression.
///
/// # Errors
///
/// Returns [`ExpressionError`] for malformed input or when one attribute is
/// assigned twice.
pub fn parse_update(input: &str) -> Result<Vec<SetAction>, ExpressionError> {
    let mut parser = Parser::new(input)?;
    match parser.advance() {
        Token::Set => {}
        other => return Err(unexpected("SET", &other)),
    }

    let mut seen = HashSet::new();
    let mut actions = Vec::new();
    loop {
        let name = parser.identifier()?;
        match parser.comparison()? {
            ComparisonOperator::Equal => {}
            op => {
                return Err(unexpected("'='", &Token::Compare(op)));
            }
        }
        let placeholder = parser.placeholder()?;
        if !seen.insert(name.clone()) {
            return Err(ExpressionError::OverlappingPaths { name });
        }
        actions.push(SetAction { name, placeholder });
        match parser.advance() {
            Token::Comma => {}
            Token::Eof => return Ok(actions),
            other => return Err(unexpected("',' or end of expression", &other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Look up a placeholder in the value map.
///
/// # Errors
///
/// Returns [`ExpressionError::UnresolvedValue`] when it is missing.
pub fn resolve<'a>(
    values: &'a HashMap<String, AttributeValue>,
    placeholder: &str,
) -> Result<&'a AttributeValue, ExpressionError> {
    values
        .get(placeholder)
        .ok_or_else(|| ExpressionError::UnresolvedValue {
            name: placeholder.to_owned(),
        })
}

/// Whether `item` satisfies every condition. A missing attribute fails its
/// condition.
pub fn matches(
    conditions: &[Condition],
    item: &Item,
    values: &HashMap<String, AttributeValue>,
) -> Result<bool, ExpressionError> {
    for condition in conditions {
        let expected = resolve(values, &condition.placeholder)?;
        let Some(actual) = item.get(&condition.name) else {
            return Ok(false);
        };
        if !compare_values(actual, expected, condition.op)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Compare two attribute values. Values of different types never match.
/// Numbers compare by value, so `1` equals `1.0` but `1e-20` does not equal
/// `2e-20`.
pub fn compare_values(
    left: &AttributeValue,
    right: &AttributeValue,
    op: ComparisonOperator,
) -> Result<bool, ExpressionError> {
    match (left, right) {
        (AttributeValue::S(a), AttributeValue::S(b)) => Ok(compare_ord(a.as_bytes(), b.as_bytes(), op)),
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            Ok(compare_f64(parse_number(a)?, parse_number(b)?, op))
        }
        (AttributeValue::B(a), AttributeValue::B(b)) => Ok(compare_ord(a.as_ref(), b.as_ref(), op)),
        (AttributeValue::Ss(a), AttributeValue::Ss(b))
        | (AttributeValue::Ns(a), AttributeValue::Ns(b)) => {
            Ok(op == ComparisonOperator::Equal && same_members(a, b))
        }
        (AttributeValue::Bs(a), AttributeValue::Bs(b)) => {
            Ok(op == ComparisonOperator::Equal && same_members(a, b))
        }
        // Remaining same-typed values (BOOL, NULL, L, M) only support `=`.
        _ if left.type_descriptor() == right.type_descriptor() => {
            Ok(op == ComparisonOperator::Equal && left == right)
        }
        _ => Ok(false),
    }
}

/// Sets compare equal regardless of member order.
fn same_members<T: Ord>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&T> = a.iter().collect();
    let mut b: Vec<&T> = b.iter().collect();
    a.sort();
    b.sort();
    a == b
}

fn compare_ord<T: Ord + ?Sized>(a: &T, b: &T, op: ComparisonOperator) -> bool {
    match op {
        ComparisonOperator::Equal => a == b,
        ComparisonOperator::LessThan => a < b,
        ComparisonOperator::LessOrEqual => a <= b,
        ComparisonOperator::GreaterThan => a > b,
        ComparisonOperator::GreaterOrEqual => a >= b,
    }
}

fn compare_f64(a: f64, b: f64, op: ComparisonOperator) -> bool {
    let Some(ordering) = a.partial_cmp(&b) else {
        return false;
    };
    match op {
        ComparisonOperator::Equal => ordering.is_eq(),
        ComparisonOperator::LessThan => ordering.is_lt(),
        ComparisonOperator::LessOrEqual => ordering.is_le(),
        ComparisonOperator::GreaterThan => ordering.is_gt(),
        ComparisonOperator::GreaterOrEqual => ordering.is_ge(),
    }
}

fn parse_number(s: &str) -> Result<f64, ExpressionError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| ExpressionError::InvalidNumber(s.to_owned()))
}
