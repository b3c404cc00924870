use super::error::Position;
use super::filter::SpatialOp;
use super::geometry::GeometryType;

use serde::{Deserialize, Serialize};

use std::fmt;

pub use Keyword as Kw;
pub use Operator as Op;
pub use Punctuation as Punct;
pub use TokenKind as TKind;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Token {
    kind: TokenKind,
    text: String,
    line: usize,
    column: usize,
    offset: usize,
}

/// Stand-in for a token stream that ends without an explicit `End`.
pub static END: Token = Token {
    kind: TokenKind::End,
    text: String::new(),
    line: 0,
    column: 0,
    offset: 0,
};

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize, offset: usize) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            column,
            offset,
        }
    }

    pub fn get_kind(&self) -> &TokenKind {
        &self.kind
    }

    /// Source text of the token, quotes included.
    pub fn get_text(&self) -> &str {
        &self.text
    }

    pub fn get_pos(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Source position of the token, `None` for synthesized tokens.
    pub fn position(&self) -> Option<Position> {
        if self.line == 0 {
            return None;
        }

        Some(Position {
            line: self.line,
            column: self.column,
            offset: self.offset,
        })
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Operator(Operator),
    Punct(Punctuation),
    Identifier(String),
    QuotedIdentifier(String),
    Number(String),
    Str(String),
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Keyword {
    And,
    Or,
    Not,
    Like,
    ILike,
    Between,
    In,
    Is,
    Null,
    True,
    False,
    Include,
    Exclude,
    Empty,
    Spatial(SpatialOp),
    Geometry(GeometryType),
}

impl Keyword {
    pub fn name(&self) -> &'static str {
        match self {
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Like => "LIKE",
            Keyword::ILike => "ILIKE",
            Keyword::Between => "BETWEEN",
            Keyword::In => "IN",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Include => "INCLUDE",
            Keyword::Exclude => "EXCLUDE",
            Keyword::Empty => "EMPTY",
            Keyword::Spatial(op) => op.name(),
            Keyword::Geometry(kind) => kind.name(),
        }
    }

    /// Matches the fixed keyword set, ignoring case. Spatial and geometry
    /// names depend on the dialect and are resolved by the lexer.
    pub fn from_word(word: &str) -> Option<Keyword> {
        let kw = match word.to_ascii_uppercase().as_str() {
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "LIKE" => Keyword::Like,
            "ILIKE" => Keyword::ILike,
            "BETWEEN" => Keyword::Between,
            "IN" => Keyword::In,
            "IS" => Keyword::Is,
            "NULL" => Keyword::Null,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "INCLUDE" => Keyword::Include,
            "EXCLUDE" => Keyword::Exclude,
            "EMPTY" => Keyword::Empty,
            _ => return None,
        };

        Some(kw)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Operator {
    Equal,
    NotEqual,
    Lesser,
    LesserOrEqual,
    Greater,
    GreaterOrEqual,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::Lesser => "<",
            Operator::LesserOrEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Punctuation {
    LParen,
    RParen,
    Comma,
    Dot,
}

impl Punctuation {
    pub fn symbol(&self) -> &'static str {
        match self {
            Punctuation::LParen => "(",
            Punctuation::RParen => ")",
            Punctuation::Comma => ",",
            Punctuation::Dot => ".",
        }
    }
}

// Used verbatim inside error messages, so user text that could contain
// braces (strings, quoted identifiers) is never echoed.
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TKind::Keyword(kw) => write!(f, "keyword `{}`", kw.name()),
            TKind::Operator(op) => write!(f, "token `{}`", op.symbol()),
            TKind::Punct(p) => write!(f, "token `{}`", p.symbol()),
            TKind::Identifier(id) => write!(f, "identifier `{}`", id),
            TKind::QuotedIdentifier(_) => write!(f, "quoted identifier"),
            TKind::Number(num) => write!(f, "number `{}`", num),
            TKind::Str(_) => write!(f, "string literal"),
            TKind::End => write!(f, "end of input"),
        }
    }
}
