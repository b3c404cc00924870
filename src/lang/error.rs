//! The single error type produced while compiling CQL text.
//!
//! A [`CompileError`] always carries a message that passes
//! [`validate_message`]. Construction through [`CompileError::new`] is
//! fallible, so a malformed message is rejected where it is built instead
//! of reaching the user.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use std::{error::Error, fmt, sync::Arc};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    // `{}`, `{0}`, `{name}`, printf-style and template markers
    Regex::new(r"\{[^{}\s]*\}|%[sdifx]|\$\{").unwrap()
});

const INTERNAL_MESSAGE: &str = "internal compiler error while reporting a diagnostic";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ErrorKind {
    /// Bad character, unterminated literal, malformed number.
    Lexical,
    /// Unexpected token, missing operand, unbalanced parentheses, trailing input.
    Syntax,
    /// Wrong arity, invalid literal or geometry, nesting limit.
    Semantic,
    /// A diagnostic could not be reported with a valid message.
    Internal,
}

/// Rejection of a message by [`validate_message`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("rejected diagnostic message {message:?} ({reason})")]
pub struct InvalidMessage {
    pub message: String,
    pub reason: &'static str,
}

/// Checks that `message` is fit for direct display.
pub fn validate_message(message: &str) -> Result<(), InvalidMessage> {
    let reject = |reason| Err(InvalidMessage {
        message: message.to_string(),
        reason,
    });

    if message.trim().is_empty() {
        return reject("message is empty");
    }

    if message.trim() != message {
        return reject("message has surrounding whitespace");
    }

    if message.chars().any(char::is_control) {
        return reject("message contains control characters");
    }

    if PLACEHOLDER.is_match(message) {
        return reject("message contains an unresolved placeholder");
    }

    if message.ends_with(|c: char| matches!(c, ',' | ':' | ';' | '-')) {
        return reject("message ends with stray punctuation");
    }

    Ok(())
}

#[derive(Clone, Debug)]
pub struct CompileError {
    kind: ErrorKind,
    message: String,
    position: Option<Position>,
    cause: Option<Arc<dyn Error + Send + Sync>>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Result<CompileError, InvalidMessage> {
        let message = message.into();
        validate_message(&message)?;

        Ok(CompileError {
            kind,
            message,
            position: None,
            cause: None,
        })
    }

    /// Builds an error from a message produced by the compiler itself.
    ///
    /// A rejected message is a compiler defect; it is surfaced as an
    /// [`ErrorKind::Internal`] error carrying the rejection as its cause so
    /// the caller still receives exactly one well-formed error.
    pub(crate) fn report(kind: ErrorKind, message: String, position: Option<Position>) -> CompileError {
        let error = match CompileError::new(kind, message) {
            Ok(error) => error,
            Err(invalid) => {
                log::error!("{}", invalid);

                CompileError {
                    kind: ErrorKind::Internal,
                    message: INTERNAL_MESSAGE.to_string(),
                    position: None,
                    cause: Some(Arc::new(invalid)),
                }
            },
        };

        CompileError { position, ..error }
    }

    pub fn at(mut self, position: Position) -> CompileError {
        self.position = Some(position);
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> CompileError
    where
        E: Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

// The cause is diagnostic detail and does not take part in equality.
impl PartialEq for CompileError {
    fn eq(&self, other: &CompileError) -> bool {
        self.kind == other.kind
            && self.message == other.message
            && self.position == other.position
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{} at {}", self.message, position),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for CompileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_message() {
        assert!(validate_message("unexpected token `)`").is_ok());
        assert!(validate_message("unrecognized character `{`").is_ok());
    }

    #[test]
    fn rejects_malformed_messages() {
        let cases = [
            ("", "message is empty"),
            ("   ", "message is empty"),
            (" padded", "message has surrounding whitespace"),
            ("two\nlines", "message contains control characters"),
            ("expected {} here", "message contains an unresolved placeholder"),
            ("expected {0}", "message contains an unresolved placeholder"),
            ("found %s", "message contains an unresolved placeholder"),
            ("value ${name}", "message contains an unresolved placeholder"),
            ("expected one of:", "message ends with stray punctuation"),
            ("dangling,", "message ends with stray punctuation"),
        ];

        for (message, reason) in cases.iter() {
            let err = CompileError::new(ErrorKind::Syntax, *message).unwrap_err();
            assert_eq!(err.reason, *reason, "message {:?}", message);
        }
    }

    #[test]
    fn internal_message_is_valid() {
        assert!(validate_message(INTERNAL_MESSAGE).is_ok());
    }

    #[test]
    fn report_degrades_to_internal_error() {
        let pos = Position { line: 1, column: 3, offset: 2 };
        let err = CompileError::report(ErrorKind::Syntax, "expected {}".to_string(), Some(pos));

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), INTERNAL_MESSAGE);
        assert_eq!(err.position(), Some(pos));
        assert!(err.source().is_some());
    }

    #[test]
    fn display_includes_position() {
        let err = CompileError::new(ErrorKind::Syntax, "unexpected token `)`")
            .unwrap()
            .at(Position { line: 1, column: 14, offset: 13 });

        assert_eq!(err.to_string(), "unexpected token `)` at line 1, column 14");
    }

    #[test]
    fn cause_is_chained() {
        let cause = "99999999999999999999".parse::<i64>().unwrap_err();
        let err = CompileError::new(ErrorKind::Semantic, "integer literal is out of range")
            .unwrap()
            .with_cause(cause.clone());

        assert_eq!(err.source().unwrap().to_string(), cause.to_string());
    }
}
