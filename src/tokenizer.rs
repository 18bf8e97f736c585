//! First-token lexer for plugin source files.
//!
//! Plugin modules are Python sources. Only the very first lexical token
//! matters here, so this lexer follows Python's tokenizer rules just far
//! enough to classify that token: comments, blank lines and unexpected
//! indentation are tokens of their own, which means a docstring has to be the
//! first thing in the file.

use std::fmt;

use crate::errors::StructuralError;

/// String prefixes accepted in front of a quote (compared case-insensitively).
const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// Kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// String literal, including any prefix and the quotes.
    String,
    /// `#` comment up to the end of the line.
    Comment,
    /// Line break on a line with no other token.
    Newline,
    /// Leading whitespace before the first statement.
    Indent,
    /// Identifier or keyword.
    Name,
    /// Numeric literal.
    Number,
    /// Operator or delimiter.
    Op,
    /// Character that cannot start any token.
    Error,
}

impl TokenKind {
    /// Human-readable token kind, used in diagnostics.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::String => "string literal",
            TokenKind::Comment => "comment",
            TokenKind::Newline => "blank line",
            TokenKind::Indent => "indentation",
            TokenKind::Name => "name",
            TokenKind::Number => "number",
            TokenKind::Op => "operator",
            TokenKind::Error => "invalid character",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A lexical token with its source text and 1-based starting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    fn new(kind: TokenKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            line: 1,
        }
    }
}

/// Lex the first token of `source`.
///
/// Returns `Ok(None)` when the source holds nothing but spaces.
///
/// # Errors
///
/// Returns [`StructuralError::UnterminatedString`] if the first token is a
/// string literal that never closes.
pub fn first_token(source: &str) -> Result<Option<Token>, StructuralError> {
    let trimmed = source.trim_start_matches([' ', '\t', '\x0c']);
    let indent = &source[..source.len() - trimmed.len()];

    let Some(c) = trimmed.chars().next() else {
        return Ok(None);
    };

    match c {
        '#' => {
            let end = trimmed.find(['\r', '\n']).unwrap_or(trimmed.len());
            return Ok(Some(Token::new(TokenKind::Comment, &trimmed[..end])));
        }
        '\n' => return Ok(Some(Token::new(TokenKind::Newline, "\n"))),
        '\r' => {
            let text = if trimmed.starts_with("\r\n") { "\r\n" } else { "\r" };
            return Ok(Some(Token::new(TokenKind::Newline, text)));
        }
        _ => {}
    }

    if !indent.is_empty() {
        return Ok(Some(Token::new(TokenKind::Indent, indent)));
    }

    lex_token(trimmed).map(Some)
}

/// Lex the leading docstring of `source`.
///
/// # Errors
///
/// Fails with a [`StructuralError`] when there is no token, when the first
/// token is not a string literal, or when that literal is unterminated.
pub fn leading_docstring(source: &str) -> Result<Token, StructuralError> {
    let token = first_token(source)?.ok_or(StructuralError::NoToken)?;
    if token.kind != TokenKind::String {
        return Err(StructuralError::NotStringLiteral {
            kind: token.kind.describe(),
            line: token.line,
        });
    }
    Ok(token)
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Lex a token starting at the beginning of `input` (not whitespace).
fn lex_token(input: &str) -> Result<Token, StructuralError> {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return Ok(Token::new(TokenKind::Error, ""));
    };

    if first == '"' || first == '\'' {
        return lex_string(input, 0);
    }

    if is_name_start(first) {
        let end = input
            .char_indices()
            .find(|&(_, c)| !is_name_continue(c))
            .map_or(input.len(), |(i, _)| i);
        let word = &input[..end];
        let next = input[end..].chars().next();
        let is_prefix = STRING_PREFIXES
            .iter()
            .any(|p| p.eq_ignore_ascii_case(word));
        if is_prefix && matches!(next, Some('"' | '\'')) {
            return lex_string(input, end);
        }
        return Ok(Token::new(TokenKind::Name, word));
    }

    let starts_number = first.is_ascii_digit()
        || (first == '.' && chars.next().is_some_and(|c| c.is_ascii_digit()));
    if starts_number {
        let end = input
            .char_indices()
            .find(|&(_, c)| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .map_or(input.len(), |(i, _)| i);
        return Ok(Token::new(TokenKind::Number, &input[..end]));
    }

    let kind = if first.is_ascii_punctuation() {
        TokenKind::Op
    } else {
        TokenKind::Error
    };
    Ok(Token::new(kind, &input[..first.len_utf8()]))
}

/// Lex a string literal whose opening quote sits at byte `quote_at`.
fn lex_string(input: &str, quote_at: usize) -> Result<Token, StructuralError> {
    let rest = &input[quote_at..];
    let quote = if rest.starts_with("\"\"\"") {
        "\"\"\""
    } else if rest.starts_with("'''") {
        "'''"
    } else {
        &rest[..1]
    };
    let triple = quote.len() == 3;

    let body_start = quote_at + quote.len();
    let mut chars = input[body_start..].char_indices();
    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '\n' | '\r' if !triple => break,
            _ if input[body_start + offset..].starts_with(quote) => {
                let end = body_start + offset + quote.len();
                return Ok(Token::new(TokenKind::String, &input[..end]));
            }
            _ => {}
        }
    }

    Err(StructuralError::UnterminatedString { line: 1 })
}
