//! # Service Filters
//!
//! LDAP-style filter expressions evaluated against endpoint properties.
//!
//! | Form | Matches when |
//! |------|--------------|
//! | `(key=value)` | the property equals `value` |
//! | `(key=pre*suf)` | the property matches the wildcard pattern |
//! | `(key=*)` | the property is present |
//! | `(key~=value)` | equal ignoring case and whitespace |
//! | `(key>=value)` / `(key<=value)` | ordered comparison, dotted numbers compare numerically |
//! | `(&(..)(..))` / `(\|(..)(..))` / `(!(..))` | conjunction, disjunction, negation |
//!
//! Attribute names are case-insensitive. `\` escapes `(`, `)`, `*` and `\`
//! inside values.

use crate::domain::RemoteServiceError;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equal { key: String, value: String },
    /// Value split at its wildcards.
    Substring { key: String, parts: Vec<String> },
    Approx { key: String, value: String },
    GreaterEq { key: String, value: String },
    LessEq { key: String, value: String },
}

impl Filter {
    /// Evaluate against `properties`.
    #[must_use]
    pub fn matches(&self, properties: &BTreeMap<String, String>) -> bool {
        let lookup = |key: &str| {
            properties
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        };
        match self {
            Self::And(filters) => filters.iter().all(|f| f.matches(properties)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(properties)),
            Self::Not(filter) => !filter.matches(properties),
            Self::Present(key) => lookup(key).is_some(),
            Self::Equal { key, value } => lookup(key) == Some(value.as_str()),
            Self::Substring { key, parts } => lookup(key).is_some_and(|v| substring_match(v, parts)),
            Self::Approx { key, value } => {
                lookup(key).is_some_and(|v| normalize(v) == normalize(value))
            }
            Self::GreaterEq { key, value } => {
                lookup(key).is_some_and(|v| compare_values(v, value) != Ordering::Less)
            }
            Self::LessEq { key, value } => {
                lookup(key).is_some_and(|v| compare_values(v, value) != Ordering::Greater)
            }
        }
    }
}

impl FromStr for Filter {
    type Err = RemoteServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(s).parse()
    }
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring_match(value: &str, parts: &[String]) -> bool {
    let (Some(first), Some(last)) = (parts.first(), parts.last()) else {
        return false;
    };
    if !value.starts_with(first.as_str()) {
        return false;
    }
    let mut rest = &value[first.len()..];
    if parts.len() == 1 {
        return rest.is_empty();
    }
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle.as_str()) {
            Some(at) => rest = &rest[at + middle.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last.as_str())
}

fn compare_values(left: &str, right: &str) -> Ordering {
    let mut l = left.split('.');
    let mut r = right.split('.');
    loop {
        match (l.next(), r.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(a), Some(b)) => {
                let order = match (a.parse::<u64>(), b.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => a.cmp(b),
                };
                if order != Ordering::Equal {
                    return order;
                }
            }
        }
    }
}

enum Operator {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> RemoteServiceError {
        RemoteServiceError::InvalidFilter {
            filter: self.input.to_string(),
            reason: format!("{reason} at position {}", self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), RemoteServiceError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{c}'")))
        }
    }

    fn parse(mut self) -> Result<Filter, RemoteServiceError> {
        let filter = self.filter()?;
        self.skip_whitespace();
        if self.pos != self.chars.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(filter)
    }

    fn filter(&mut self) -> Result<Filter, RemoteServiceError> {
        self.skip_whitespace();
        self.expect('(')?;
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.operands()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.operands()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end")),
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn operands(&mut self) -> Result<Vec<Filter>, RemoteServiceError> {
        let mut operands = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            operands.push(self.filter()?);
        }
        if operands.is_empty() {
            return Err(self.error("empty operand list"));
        }
        Ok(operands)
    }

    fn item(&mut self) -> Result<Filter, RemoteServiceError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let key = self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .trim()
            .to_string();
        if key.is_empty() {
            return Err(self.error("missing attribute"));
        }

        let operator = match (self.peek(), self.chars.get(self.pos + 1).copied()) {
            (Some('='), _) => Operator::Equal,
            (Some('~'), Some('=')) => Operator::Approx,
            (Some('>'), Some('=')) => Operator::GreaterEq,
            (Some('<'), Some('=')) => Operator::LessEq,
            _ => return Err(self.error("expected an operator")),
        };
        self.pos += if matches!(operator, Operator::Equal) { 1 } else { 2 };

        let (parts, wildcard) = self.value()?;
        Ok(match operator {
            Operator::Equal if wildcard && parts.iter().all(String::is_empty) => Filter::Present(key),
            Operator::Equal if wildcard => Filter::Substring { key, parts },
            Operator::Equal => Filter::Equal {
                key,
                value: parts.concat(),
            },
            Operator::Approx => Filter::Approx {
                key,
                value: parts.concat(),
            },
            Operator::GreaterEq => Filter::GreaterEq {
                key,
                value: parts.concat(),
            },
            Operator::LessEq => Filter::LessEq {
                key,
                value: parts.concat(),
            },
        })
    }

    /// Value up to the closing parenthesis, split at unescaped `*`.
    fn value(&mut self) -> Result<(Vec<String>, bool), RemoteServiceError> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut wildcard = false;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('*') => {
                    wildcard = true;
                    parts.push(std::mem::take(&mut current));
                    self.pos += 1;
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    current.push(escaped);
                    self.pos += 1;
                }
                Some(c) => {
                    current.push(c);
                    self.pos += 1;
                }
            }
        }
        parts.push(current);
        Ok((parts, wildcard))
    }
}
