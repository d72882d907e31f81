//! Literal notation used by tester plan files.
//!
//! A plan file holds a single nested value:
//!
//! ```text
//! [
//!     ["sequential", "omp_mutex"],   # executables
//!     [8192, 65536],
//!     ["g"],
//!     { "Chunk size = " : [128, 512, 2048] },
//!     { "Number of threads" : range(2, 49, 2) },
//!     "Speedup",
//!     [3, 8]
//! ]
//! ```
//!
//! Supported values are lists, single- or double-quoted strings, integers,
//! floats, mappings and the lazy `range(start, stop, step)` form. `#` starts a
//! comment that runs to the end of the line and trailing commas are accepted.

use std::fmt;

use crate::error::{MalformedPlanError, Result};

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    List(Vec<Literal>),
    /// Mapping entries in authored order.
    Map(Vec<(Literal, Literal)>),
    Str(String),
    Int(i64),
    Float(f64),
    /// `range(start, stop, step)`; `stop` is exclusive.
    Range { start: i64, stop: i64, step: i64 },
}

impl Literal {
    /// Short name of the value kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Literal::List(_) => "list",
            Literal::Map(_) => "mapping",
            Literal::Str(_) => "string",
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Range { .. } => "range",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Render with one top-level element per line, the way plan files are authored.
    pub fn to_pretty_string(&self) -> String {
        match self {
            Literal::List(items) if items.iter().any(is_compound) => {
                let mut out = String::from("[\n");
                for (i, item) in items.iter().enumerate() {
                    out.push('\t');
                    out.push_str(&item.to_string());
                    if i + 1 < items.len() {
                        out.push(',');
                    }
                    out.push('\n');
                }
                out.push_str("]\n");
                out
            }
            other => format!("{other}\n"),
        }
    }
}

fn is_compound(lit: &Literal) -> bool {
    matches!(lit, Literal::List(_) | Literal::Map(_))
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Literal::Map(entries) => {
                f.write_str("{ ")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} : {v}")?;
                }
                f.write_str(" }")
            }
            Literal::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Literal::Int(v) => write!(f, "{v}"),
            // Debug keeps a decimal point or exponent so the value re-parses as a float.
            Literal::Float(v) => write!(f, "{v:?}"),
            Literal::Range { start, stop, step } => {
                if *step == 1 {
                    write!(f, "range({start}, {stop})")
                } else {
                    write!(f, "range({start}, {stop}, {step})")
                }
            }
        }
    }
}

/// Parse a complete document holding exactly one literal value.
pub fn parse(src: &str) -> Result<Literal> {
    let mut parser = Parser::new(src);
    parser.skip_trivia();
    if parser.peek().is_none() {
        return Err(parser.error("empty document"));
    }
    let value = parser.value()?;
    parser.skip_trivia();
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(parser.error(format!("unexpected '{c}' after value"))),
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> MalformedPlanError {
        MalformedPlanError::syntax(self.line, self.column, message)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<()> {
        self.skip_trivia();
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(format!("expected '{want}', found end of input"))),
        }
    }

    fn value(&mut self) -> Result<Literal> {
        self.skip_trivia();
        match self.peek() {
            Some('[') => self.list(),
            Some('{') => self.map(),
            Some(q @ ('"' | '\'')) => self.string(q).map(Literal::Str),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.call(),
            Some(c) => Err(self.error(format!("unexpected '{c}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    /// Comma-separated items up to `close`; a trailing comma is allowed.
    fn separated<T>(
        &mut self,
        close: char,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(out);
            }
            out.push(item(self)?);
            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {}
                Some(c) => return Err(self.error(format!("expected ',' or '{close}', found '{c}'"))),
                None => return Err(self.error(format!("unclosed '{close}'"))),
            }
        }
    }

    fn list(&mut self) -> Result<Literal> {
        self.expect('[')?;
        self.separated(']', Self::value).map(Literal::List)
    }

    fn map(&mut self) -> Result<Literal> {
        self.expect('{')?;
        let entries = self.separated('}', |p| {
            let key = p.value()?;
            p.expect(':')?;
            let value = p.value()?;
            Ok((key, value))
        })?;
        Ok(Literal::Map(entries))
    }

    fn string(&mut self, quote: char) -> Result<String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some(c @ ('\\' | '"' | '\'')) => out.push(c),
                    Some(c) => return Err(self.error(format!("unknown escape '\\{c}'"))),
                    None => return Err(self.error("unterminated string")),
                },
                Some('\n') | None => return Err(self.error("unterminated string")),
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self) -> Result<Literal> {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        let mut is_float = false;
        if let Some(sign @ ('-' | '+')) = self.peek() {
            text.push(sign);
            self.bump();
        }
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    self.bump();
                    if let Some(sign @ ('-' | '+')) = self.peek() {
                        text.push(sign);
                    } else {
                        continue;
                    }
                }
                _ => break,
            }
            self.bump();
        }
        let bad = || MalformedPlanError::syntax(line, column, format!("invalid number '{text}'"));
        if is_float {
            text.parse::<f64>().map(Literal::Float).map_err(|_| bad())
        } else {
            text.parse::<i64>().map(Literal::Int).map_err(|_| bad())
        }
    }

    fn call(&mut self) -> Result<Literal> {
        let (line, column) = (self.line, self.column);
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if name != "range" {
            return Err(MalformedPlanError::syntax(
                line,
                column,
                format!("unknown identifier '{name}'"),
            ));
        }
        self.expect('(')?;
        let args = self.separated(')', |p| {
            p.skip_trivia();
            let (line, column) = (p.line, p.column);
            match p.value()? {
                Literal::Int(v) => Ok(v),
                other => Err(MalformedPlanError::syntax(
                    line,
                    column,
                    format!("range arguments must be integers, found {}", other.kind()),
                )),
            }
        })?;
        let (start, stop, step) = match args.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => {
                return Err(MalformedPlanError::syntax(
                    line,
                    column,
                    format!("range takes 1 to 3 arguments, found {}", args.len()),
                ))
            }
        };
        if step == 0 {
            return Err(MalformedPlanError::ZeroStep);
        }
        Ok(Literal::Range { start, stop, step })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_with_comments() {
        let src = r#"
            # header comment
            [
                ["a", 'b'],   # trailing comment
                [1, -2, 3.5,],
                { "k" : range(2, 49, 2) },
            ]
        "#;
        let lit = parse(src).unwrap();
        assert_eq!(
            lit,
            Literal::List(vec![
                Literal::List(vec![Literal::Str("a".into()), Literal::Str("b".into())]),
                Literal::List(vec![Literal::Int(1), Literal::Int(-2), Literal::Float(3.5)]),
                Literal::Map(vec![(
                    Literal::Str("k".into()),
                    Literal::Range {
                        start: 2,
                        stop: 49,
                        step: 2
                    }
                )]),
            ])
        );
    }

    #[test]
    fn test_range_defaults() {
        assert_eq!(
            parse("range(5)").unwrap(),
            Literal::Range {
                start: 0,
                stop: 5,
                step: 1
            }
        );
        assert_eq!(
            parse("range(1, 4)").unwrap(),
            Literal::Range {
                start: 1,
                stop: 4,
                step: 1
            }
        );
    }

    #[test]
    fn test_range_zero_step_rejected() {
        assert!(matches!(
            parse("range(1, 4, 0)"),
            Err(MalformedPlanError::ZeroStep)
        ));
    }

    #[test]
    fn test_syntax_error_location() {
        let err = parse("[\n  1,\n  2 3\n]").unwrap_err();
        match err {
            MalformedPlanError::Syntax { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_identifier() {
        let err = parse("[True]").unwrap_err();
        assert!(err.to_string().contains("unknown identifier 'True'"));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            parse("[\"abc]"),
            Err(MalformedPlanError::Syntax { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(parse("[1] [2]").is_err());
        assert!(parse("   # only a comment\n").is_err());
    }

    #[test]
    fn test_display_reparses() {
        let src = r#"[["x \"y\""], { "Chunk size = " : [128, 512] }, range(2, 49, 2), range(0, 3), 2.0, 1e-3]"#;
        let lit = parse(src).unwrap();
        let again = parse(&lit.to_string()).unwrap();
        assert_eq!(lit, again);
        assert_eq!(parse(&lit.to_pretty_string()).unwrap(), lit);
    }

    #[test]
    fn test_underscore_digits() {
        assert_eq!(parse("65_536").unwrap(), Literal::Int(65536));
    }
}
