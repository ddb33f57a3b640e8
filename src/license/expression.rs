//! SPDX license expression parsing and flattening.
//!
//! [`parse`] turns a string such as `(MPL-2.0 AND MIT)` into a [`LicenseExpr`]
//! tree; [`LicenseExpr::flatten`] walks the tree left to right and returns the
//! plain license identifiers it mentions.

use std::fmt;

use crate::error::{Error, Result};

/// Boolean operator joining two sub-expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
        }
    }
}

/// A parsed SPDX license expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseExpr {
    /// A single license, e.g. `GPL-2.0+ WITH Classpath-exception-2.0`.
    License {
        id: String,
        /// Set by a trailing `+`.
        or_later: bool,
        exception: Option<String>,
    },
    Conjunction {
        op: Operator,
        left: Box<LicenseExpr>,
        right: Box<LicenseExpr>,
    },
}

impl LicenseExpr {
    /// Collect every license identifier in the tree, left to right.
    ///
    /// `AND` and `OR` are treated the same: the package is associated with
    /// all licenses it mentions. Duplicates are kept. `+` and `WITH` clauses
    /// are dropped; only the bare identifier is returned.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            LicenseExpr::License { id, .. } => out.push(id.clone()),
            LicenseExpr::Conjunction { left, right, .. } => {
                left.flatten_into(out);
                right.flatten_into(out);
            }
        }
    }
}

impl fmt::Display for LicenseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseExpr::License {
                id,
                or_later,
                exception,
            } => {
                write!(f, "{}", id)?;
                if *or_later {
                    write!(f, "+")?;
                }
                if let Some(exception) = exception {
                    write!(f, " WITH {}", exception)?;
                }
                Ok(())
            }
            LicenseExpr::Conjunction { op, left, right } => {
                write!(f, "({} {} {})", left, op, right)
            }
        }
    }
}

/// Deepest parenthesis nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 64;

/// Most license references accepted in one expression.
pub const MAX_OPERANDS: usize = 256;

/// Lexical units of an expression. `+` and `WITH` are resolved while lexing.
#[derive(Debug, PartialEq, Clone)]
enum Token {
    License { id: String, or_later: bool },
    /// `WITH <exception>`.
    Exception(String),
    And,
    Or,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::License { id, or_later } => {
                write!(f, "'{}{}'", id, if *or_later { "+" } else { "" })
            }
            Token::Exception(exc) => write!(f, "WITH {}", exc),
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Open => write!(f, "'('"),
            Token::Close => write!(f, "')'"),
        }
    }
}

/// Split on whitespace, with every `(` and `)` a word of its own.
fn words(source: &str) -> impl Iterator<Item = &str> + '_ {
    source.split_whitespace().flat_map(|chunk| {
        let mut parts = Vec::new();
        let mut start = 0;
        for (i, c) in chunk.char_indices() {
            if c == '(' || c == ')' {
                if start < i {
                    parts.push(&chunk[start..i]);
                }
                parts.push(&chunk[i..i + 1]);
                start = i + 1;
            }
        }
        if start < chunk.len() {
            parts.push(&chunk[start..]);
        }
        parts
    })
}

fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut words = words(source);
    while let Some(word) = words.next() {
        let token = match word {
            "(" => Token::Open,
            ")" => Token::Close,
            "AND" => Token::And,
            "OR" => Token::Or,
            "WITH" => match words.next() {
                Some(exc) if is_idstring(exc) => Token::Exception(exc.to_string()),
                Some(other) => {
                    return Err(Error::malformed(
                        source,
                        format!("expected exception id after WITH, found '{}'", other),
                    ))
                }
                None => return Err(Error::malformed(source, "expected exception id after WITH")),
            },
            _ => {
                let (id, or_later) = match word.strip_suffix('+') {
                    Some(base) => (base, true),
                    None => (word, false),
                };
                if !is_license_id(id) {
                    return Err(Error::malformed(source, format!("invalid license id '{}'", word)));
                }
                Token::License {
                    id: id.to_string(),
                    or_later,
                }
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

fn is_idstring(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// `idstring`, `LicenseRef-idstring` or `DocumentRef-idstring:LicenseRef-idstring`.
fn is_license_id(s: &str) -> bool {
    match s.split_once(':') {
        Some((doc, lic)) => {
            doc.strip_prefix("DocumentRef-").is_some_and(is_idstring)
                && lic.strip_prefix("LicenseRef-").is_some_and(is_idstring)
        }
        None => is_idstring(s),
    }
}

/// Recursive descent parser.
///
/// Grammar (AND binds tighter than OR):
/// ```text
/// expr     := or_expr
/// or_expr  := and_expr ( "OR" and_expr )*
/// and_expr := atom ( "AND" atom )*
/// atom     := "(" expr ")" | license [ exception ]
/// ```
///
/// Nesting is capped at [`MAX_DEPTH`] and the operand count at
/// [`MAX_OPERANDS`]; the tree is walked recursively afterwards.
struct ExprParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operands: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::malformed(self.source, reason)
    }

    fn parse_or(&mut self) -> Result<LicenseExpr> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.consume();
            let right = self.parse_and()?;
            left = LicenseExpr::Conjunction {
                op: Operator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<LicenseExpr> {
        let mut left = self.parse_atom()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.consume();
            let right = self.parse_atom()?;
            left = LicenseExpr::Conjunction {
                op: Operator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_atom(&mut self) -> Result<LicenseExpr> {
        match self.consume() {
            Some(Token::Open) => {
                if self.depth == MAX_DEPTH {
                    return Err(self.error(format!("parentheses nested deeper than {}", MAX_DEPTH)));
                }
                self.depth += 1;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.consume() {
                    Some(Token::Close) => Ok(inner),
                    Some(other) => Err(self.error(format!("expected ')', found {}", other))),
                    None => Err(self.error("unclosed '('")),
                }
            }
            Some(Token::License { id, or_later }) => {
                self.operands += 1;
                if self.operands > MAX_OPERANDS {
                    return Err(self.error(format!("more than {} license references", MAX_OPERANDS)));
                }
                let exception = match self.peek() {
                    Some(Token::Exception(exc)) => {
                        let exc = exc.clone();
                        self.pos += 1;
                        Some(exc)
                    }
                    _ => None,
                };
                Ok(LicenseExpr::License {
                    id,
                    or_later,
                    exception,
                })
            }
            Some(other) => Err(self.error(format!("expected license id, found {}", other))),
            None => Err(self.error("expected license id, found end of input")),
        }
    }
}

/// Parse an SPDX license expression.
pub fn parse(expr: &str) -> Result<LicenseExpr> {
    let tokens = lex(expr)?;
    if tokens.is_empty() {
        return Err(Error::malformed(expr, "empty expression"));
    }
    let mut parser = ExprParser {
        source: expr,
        tokens,
        pos: 0,
        depth: 0,
        operands: 0,
    };
    let tree = parser.parse_or()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error(format!("unexpected {} after expression", extra)));
    }
    Ok(tree)
}

/// Parse and flatten in one step.
pub fn license_ids(expr: &str) -> Result<Vec<String>> {
    Ok(parse(expr)?.flatten())
}
