use super::error::{CompileError, ErrorKind, Position};
use super::filter::SpatialOp;
use super::geometry::GeometryType;
use super::tokens::*;
use crate::config::{Dialect, QuoteStyle};

/// Tokenizes the whole input, stopping at the first lexical error.
///
/// The returned sequence always ends with a [`TokenKind::End`] token placed
/// just past the last character.
pub fn extract_tokens(src: &str, dialect: &Dialect) -> Result<Vec<Token>, CompileError> {
    let tokens = Lexer::new(src, dialect).collect::<Result<Vec<_>, _>>()?;
    log::debug!("extracted {} tokens from {} bytes", tokens.len(), src.len());

    Ok(tokens)
}

/// Lazy token stream over CQL text.
///
/// Yields tokens until the end token or the first error, then stops.
pub struct Lexer<'a> {
    src: &'a str,
    dialect: &'a Dialect,
    offset: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, dialect: &'a Dialect) -> Lexer<'a> {
        Lexer {
            src,
            dialect,
            offset: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.offset..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();

        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(c)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            return true;
        }

        false
    }

    fn bump_while(&mut self, accept: impl Fn(char) -> bool) {
        while self.peek().map_or(false, &accept) {
            self.bump();
        }
    }

    fn cur_pos(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn next_token(&mut self) -> Result<Token, CompileError> {
        self.bump_while(char::is_whitespace);

        let start = self.cur_pos();
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(token(TKind::End, "", start)),
        };

        let op = |op| TKind::Operator(op);
        let punct = |p| TKind::Punct(p);

        let kind = match c {
            '(' => punct(Punct::LParen),
            ')' => punct(Punct::RParen),
            ',' => punct(Punct::Comma),
            '.' if self.peek().map_or(false, |c| c.is_ascii_digit()) => self.number(start)?,
            '.' => punct(Punct::Dot),

            '=' => op(Op::Equal),
            '<' if self.bump_if('=') => op(Op::LesserOrEqual),
            '<' if self.bump_if('>') => op(Op::NotEqual),
            '<' => op(Op::Lesser),
            '>' if self.bump_if('=') => op(Op::GreaterOrEqual),
            '>' => op(Op::Greater),
            '!' if self.bump_if('=') => op(Op::NotEqual),
            '+' => op(Op::Plus),
            '-' => op(Op::Minus),
            '*' => op(Op::Star),
            '/' => op(Op::Slash),

            '\'' => TKind::Str(self.quoted('\'', start, "string literal")?),
            '"' => match self.dialect.double_quotes {
                QuoteStyle::Identifier => TKind::QuotedIdentifier(
                    self.quoted('"', start, "quoted identifier")?
                ),
                QuoteStyle::String => TKind::Str(self.quoted('"', start, "string literal")?),
            },

            c if c.is_ascii_digit() => self.number(start)?,
            c if c.is_alphabetic() || c == '_' => {
                self.bump_while(is_word_char);
                guess_word(&self.src[start.offset..self.offset], self.dialect)
            },

            c if c.is_control() => return Err(lex_error(
                format!("unrecognized character U+{:04X}", c as u32),
                start,
            )),
            c => return Err(lex_error(
                format!("unrecognized character `{}`", c),
                start,
            )),
        };

        Ok(token(kind, &self.src[start.offset..self.offset], start))
    }

    /// Reads the rest of a number whose first character is already consumed.
    fn number(&mut self, start: Position) -> Result<TokenKind, CompileError> {
        self.bump_while(|c| c.is_ascii_digit());

        let mut float = self.src[start.offset..].starts_with('.');
        if !float && self.peek() == Some('.') && self.peek_nth(1).map_or(false, |c| c.is_ascii_digit()) {
            self.bump();
            float = true;
        }
        self.bump_while(|c| c.is_ascii_digit());

        if let Some('e') | Some('E') = self.peek() {
            let exponent = match (self.peek_nth(1), self.peek_nth(2)) {
                (Some(d), _) if d.is_ascii_digit() => true,
                (Some('+'), Some(d)) | (Some('-'), Some(d)) if d.is_ascii_digit() => true,
                _ => false,
            };

            if exponent {
                self.bump();
                if let Some('+') | Some('-') = self.peek() {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
                float = true;
            }
        }

        if self.peek().map_or(false, is_word_char) {
            self.bump_while(is_word_char);
            let text = &self.src[start.offset..self.offset];
            return Err(lex_error(format!("malformed number `{}`", text), start));
        }

        let text = &self.src[start.offset..self.offset];
        if float && !text.parse::<f64>().map_or(false, f64::is_finite) {
            return Err(lex_error(format!("number `{}` is out of range", text), start));
        }

        Ok(TKind::Number(text.to_string()))
    }

    /// Reads a quoted run whose opening quote is already consumed. A doubled
    /// quote stands for the quote itself.
    fn quoted(&mut self, quote: char, start: Position, what: &str) -> Result<String, CompileError> {
        let mut value = String::new();

        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if !self.bump_if(quote) {
                        return Ok(value);
                    }
                    value.push(quote);
                },
                Some(c) => value.push(c),
                None => return Err(lex_error(format!("unterminated {}", what), start)),
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.next_token();
        match &result {
            Ok(token) => {
                log::trace!("{:?}", token);
                self.finished = token.is_end();
            },
            Err(_) => self.finished = true,
        }

        Some(result)
    }
}

fn token(kind: TokenKind, text: &str, pos: Position) -> Token {
    Token::new(kind, text, pos.line, pos.column, pos.offset)
}

fn lex_error(message: String, position: Position) -> CompileError {
    CompileError::report(ErrorKind::Lexical, message, Some(position))
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == ':'
}

/// Classifies a word as keyword or identifier.
pub fn guess_word(word: &str, dialect: &Dialect) -> TokenKind {
    if let Some(kw) = Keyword::from_word(word) {
        return TKind::Keyword(kw);
    }

    if let Some(op) = SpatialOp::from_name(word) {
        if dialect.spatial_enabled(op) {
            return TKind::Keyword(Kw::Spatial(op));
        }
    }

    if let Some(kind) = GeometryType::from_name(word) {
        return TKind::Keyword(Kw::Geometry(kind));
    }

    TKind::Identifier(word.to_string())
}
