//! N-Triples subset codec.
//!
//! This is the text form the HTTP backend reads and writes. It covers exactly
//! what the engine persists: named subjects and predicates, named or typed
//! literal objects. Blank nodes are rejected; the engine never emits them.

use super::{Graph, GraphError, Literal, Term, Triple};
use crate::vocab;

/// Serialize a graph as N-Triples text, one statement per line.
///
/// Output order follows the graph's deterministic triple order, so two graphs
/// with equal triple sets serialize to byte-identical text.
pub fn serialize(graph: &Graph) -> String {
    let mut out = String::new();
    for triple in graph.triples() {
        out.push_str(&statement(triple));
        out.push('\n');
    }
    out
}

/// Render a single triple as one N-Triples statement (without newline).
pub fn statement(triple: &Triple) -> String {
    format!(
        "<{}> <{}> {} .",
        triple.subject,
        triple.predicate,
        term(&triple.object)
    )
}

fn term(term: &Term) -> String {
    match term {
        Term::NamedNode(iri) => format!("<{iri}>"),
        Term::Literal(Literal { value, datatype }) => {
            if datatype == vocab::XSD_STRING {
                format!("\"{}\"", escape(value))
            } else {
                format!("\"{}\"^^<{}>", escape(value), datatype)
            }
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse N-Triples text into a graph.
///
/// Empty lines and `#` comments are skipped. Statements that use blank nodes
/// or unsupported escapes fail with a [`GraphError::Parse`] naming the line.
pub fn parse(text: &str) -> Result<Graph, GraphError> {
    let mut graph = Graph::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        graph.insert(parse_statement(trimmed, line)?);
    }
    Ok(graph)
}

fn parse_statement(input: &str, line: usize) -> Result<Triple, GraphError> {
    let mut cursor = Cursor { input, line };
    let subject = cursor.iri()?;
    cursor.whitespace();
    let predicate = cursor.iri()?;
    cursor.whitespace();
    let object = cursor.term()?;
    cursor.whitespace();
    cursor.dot()?;
    Ok(Triple::new(subject, predicate, object))
}

struct Cursor<'a> {
    input: &'a str,
    line: usize,
}

impl Cursor<'_> {
    fn error(&self, reason: impl Into<String>) -> GraphError {
        GraphError::parse(self.line, reason)
    }

    fn whitespace(&mut self) {
        self.input = self.input.trim_start();
    }

    fn iri(&mut self) -> Result<String, GraphError> {
        let rest = self
            .input
            .strip_prefix('<')
            .ok_or_else(|| self.error("expected IRI"))?;
        let end = rest
            .find('>')
            .ok_or_else(|| self.error("unterminated IRI"))?;
        let iri = rest[..end].to_string();
        self.input = &rest[end + 1..];
        Ok(iri)
    }

    fn term(&mut self) -> Result<Term, GraphError> {
        if self.input.starts_with('<') {
            return Ok(Term::NamedNode(self.iri()?));
        }
        if self.input.starts_with("_:") {
            return Err(self.error("blank nodes are not supported"));
        }
        if !self.input.starts_with('"') {
            return Err(self.error("expected IRI or literal object"));
        }
        let value = self.quoted()?;
        if let Some(rest) = self.input.strip_prefix("^^") {
            self.input = rest;
            let datatype = self.iri()?;
            return Ok(Term::typed(value, datatype));
        }
        if let Some(rest) = self.input.strip_prefix('@') {
            // Language tags are tolerated but not preserved.
            let end = rest
                .find(|c: char| c.is_whitespace())
                .unwrap_or(rest.len());
            self.input = &rest[end..];
        }
        Ok(Term::literal(value))
    }

    fn quoted(&mut self) -> Result<String, GraphError> {
        let mut chars = self.input.char_indices();
        chars.next(); // opening quote
        let mut value = String::new();
        while let Some((index, c)) = chars.next() {
            match c {
                '"' => {
                    self.input = &self.input[index + 1..];
                    return Ok(value);
                }
                '\\' => match chars.next() {
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, other)) => {
                        return Err(self.error(format!("unsupported escape: \\{other}")));
                    }
                    None => return Err(self.error("unterminated escape")),
                },
                _ => value.push(c),
            }
        }
        Err(self.error("unterminated literal"))
    }

    fn dot(&mut self) -> Result<(), GraphError> {
        match self.input.strip_prefix('.') {
            Some(rest) if rest.trim().is_empty() => Ok(()),
            _ => Err(self.error("expected terminating '.'")),
        }
    }
}
