//! Compiler for CQL, the Common Query Language of geospatial feature
//! services.
//!
//! Text is lexed into tokens, parsed into an immutable [`Filter`] or
//! [`Expression`] tree, and can be written back to CQL text:
//!
//! ```
//! let filter = cqlc::parse_filter("NAME = 'abc' AND POP > 1000").unwrap();
//! assert_eq!(cqlc::write(&filter), "NAME = 'abc' AND POP > 1000");
//! ```

pub mod config;
pub mod lang;
pub mod process;
pub mod request;

pub use config::{ConfigError, Dialect};
pub use lang::filter::{Expression, Filter, Literal};
pub use lang::{CompileError, Compiler, ErrorKind, Node, Position};

/// Parses a filter with the default dialect.
pub fn parse_filter(text: &str) -> Result<Filter, CompileError> {
    Compiler::default().parse_filter(text)
}

/// Parses a value expression with the default dialect.
pub fn parse_expression(text: &str) -> Result<Expression, CompileError> {
    Compiler::default().parse_expression(text)
}

/// Writes a filter or expression as CQL text with the default dialect.
pub fn write<'a>(node: impl Into<Node<'a>>) -> String {
    lang::writer::write(node)
}
