//! Binding expressions.
//!
//! A `data-bind` attribute is a comma-separated list of `name: expression`
//! pairs. Expressions are deliberately small: dotted paths into the view
//! model, string/number/boolean/null literals and object literals.
//!
//! ```text
//! text: user.name, template: { name: 'greeter', data: $data }
//! ```

use indexmap::IndexMap;

use crate::error::{BridgeError, Result};

use super::value::VmValue;

/// Parsed bindings of one element, in source order.
pub type Bindings = IndexMap<String, Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `a.b.c`, resolved against the binding context. `$data` is the
    /// context itself.
    Path(Vec<String>),
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Object(IndexMap<String, Expr>),
}

impl Expr {
    /// Evaluate against `context`.
    ///
    /// Observables met along a path are read (and so tracked); the value at
    /// the end of the path is returned as is, observable or not. Missing
    /// properties evaluate to null.
    pub fn evaluate(&self, context: &VmValue) -> VmValue {
        match self {
            Expr::Path(segments) => resolve_path(segments, context),
            Expr::String(s) => VmValue::String(s.clone()),
            Expr::Number(n) => VmValue::Number(*n),
            Expr::Bool(b) => VmValue::Bool(*b),
            Expr::Null => VmValue::Null,
            Expr::Object(entries) => VmValue::Object(
                entries
                    .iter()
                    .map(|(key, expr)| (key.clone(), expr.evaluate(context)))
                    .collect(),
            ),
        }
    }
}

fn resolve_path(segments: &[String], context: &VmValue) -> VmValue {
    let mut current = context.resolve();
    for (index, segment) in segments.iter().enumerate() {
        if index == 0 && segment == "$data" {
            continue;
        }
        let next = current.resolve().get(segment).cloned().unwrap_or_default();
        current = next;
    }
    current
}

/// Parse the text of a `data-bind` attribute.
pub fn parse_bindings(text: &str) -> Result<Bindings> {
    let mut parser = Parser { src: text, pos: 0 };
    let mut bindings = Bindings::new();

    parser.skip_ws();
    while !parser.at_end() {
        let (name, expr) = parser.entry()?;
        bindings.insert(name, expr);
        parser.skip_ws();
        if parser.eat(',') {
            parser.skip_ws();
        } else if !parser.at_end() {
            return Err(parser.error("expected ',' between bindings"));
        }
    }
    Ok(bindings)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, reason: &str) -> BridgeError {
        BridgeError::BindingSyntax {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }

    /// `key: expr`
    fn entry(&mut self) -> Result<(String, Expr)> {
        let key = match self.peek() {
            Some('"' | '\'') => self.string()?,
            Some(c) if is_ident_start(c) => self.ident(),
            _ => return Err(self.error("expected a binding name")),
        };
        self.skip_ws();
        if !self.eat(':') {
            return Err(self.error("expected ':' after name"));
        }
        self.skip_ws();
        let expr = self.expr()?;
        Ok((key, expr))
    }

    fn expr(&mut self) -> Result<Expr> {
        match self.peek() {
            Some('"' | '\'') => Ok(Expr::String(self.string()?)),
            Some('{') => self.object(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => Ok(self.path()),
            Some(_) => Err(self.error("unexpected character in expression")),
            None => Err(self.error("expected an expression")),
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn path(&mut self) -> Expr {
        let first = self.ident();
        match first.as_str() {
            "true" => return Expr::Bool(true),
            "false" => return Expr::Bool(false),
            "null" | "undefined" => return Expr::Null,
            _ => {}
        }
        let mut segments = vec![first];
        while self.peek() == Some('.') {
            let rest = &self.src[self.pos + 1..];
            if !rest.chars().next().is_some_and(is_ident_start) {
                break;
            }
            self.bump();
            segments.push(self.ident());
        }
        Expr::Path(segments)
    }

    fn number(&mut self) -> Result<Expr> {
        let start = self.pos;
        self.eat('-');
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.bump();
        }
        self.src[start..self.pos]
            .parse::<f64>()
            .map(Expr::Number)
            .map_err(|_| BridgeError::BindingSyntax {
                offset: start,
                reason: "invalid number".to_string(),
            })
    }

    fn string(&mut self) -> Result<String> {
        let start = self.pos;
        let quote = self.bump().ok_or_else(|| self.error("expected a string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(BridgeError::BindingSyntax {
            offset: start,
            reason: "unterminated string".to_string(),
        })
    }

    fn object(&mut self) -> Result<Expr> {
        self.eat('{');
        let mut entries = IndexMap::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                return Ok(Expr::Object(entries));
            }
            let (key, expr) = self.entry()?;
            entries.insert(key, expr);
            self.skip_ws();
            if self.eat('}') {
                return Ok(Expr::Object(entries));
            }
            if !self.eat(',') {
                return Err(self.error("expected ',' or '}' in object"));
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
