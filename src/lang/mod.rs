pub mod error;
pub mod filter;
pub mod geometry;
pub mod lexer;
pub mod parser;
pub mod tokens;
mod validation;
pub mod writer;

pub use error::{validate_message, CompileError, ErrorKind, InvalidMessage, Position};
pub use lexer::{extract_tokens, Lexer};
pub use parser::{build_expression, build_filter};
pub use writer::{Node, Writer};

use crate::config::{default_dialect, Dialect};
use filter::{Expression, Filter};
use tokens::Token;

/// Compiles CQL text under one dialect.
///
/// Holds no state besides the dialect reference, so one compiler can serve
/// any number of threads.
#[derive(Clone, Copy, Debug)]
pub struct Compiler<'d> {
    dialect: &'d Dialect,
}

impl Default for Compiler<'static> {
    fn default() -> Self {
        Compiler::new(default_dialect())
    }
}

impl<'d> Compiler<'d> {
    pub fn new(dialect: &'d Dialect) -> Compiler<'d> {
        Compiler { dialect }
    }

    pub fn dialect(&self) -> &'d Dialect {
        self.dialect
    }

    pub fn tokenize(&self, src: &str) -> Result<Vec<Token>, CompileError> {
        extract_tokens(src, self.dialect)
    }

    pub fn parse_filter(&self, src: &str) -> Result<Filter, CompileError> {
        log::debug!("parsing filter ({} bytes)", src.len());

        let tokens = self.tokenize(src)?;
        let filter = build_filter(tokens.iter(), self.dialect);
        if let Err(err) = &filter {
            log::debug!("filter rejected: {}", err);
        }

        filter
    }

    pub fn parse_expression(&self, src: &str) -> Result<Expression, CompileError> {
        log::debug!("parsing expression ({} bytes)", src.len());

        let tokens = self.tokenize(src)?;
        let expression = build_expression(tokens.iter(), self.dialect);
        if let Err(err) = &expression {
            log::debug!("expression rejected: {}", err);
        }

        expression
    }

    pub fn write<'a>(&self, node: impl Into<Node<'a>>) -> String {
        Writer::new(self.dialect).write(node)
    }
}
