//! Dialect configuration: the token, operator and function tables the
//! compiler works with.
//!
//! The defaults describe ECQL as commonly implemented. A dialect can be
//! read from TOML:
//!
//! ```toml
//! spatial_predicates = ["INTERSECTS", "BBOX"]
//! strict_functions = true
//! max_depth = 64
//!
//! [functions]
//! strtouppercase = { min = 1, max = 1 }
//!
//! [like]
//! wildcard = "*"
//! single_char = "?"
//! escape = "!"
//! ```

use crate::lang::filter::SpatialOp;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

static DEFAULT: Lazy<Dialect> = Lazy::new(Dialect::default);

/// Shared default dialect.
pub fn default_dialect() -> &'static Dialect {
    &DEFAULT
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read dialect file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse dialect: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid dialect: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub fn exactly(count: usize) -> Arity {
        Arity { min: count, max: Some(count) }
    }

    pub fn between(min: usize, max: usize) -> Arity {
        Arity { min, max: Some(max) }
    }

    pub fn at_least(min: usize) -> Arity {
        Arity { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LikeConfig {
    pub wildcard: char,
    pub single_char: char,
    pub escape: char,
}

impl Default for LikeConfig {
    fn default() -> Self {
        LikeConfig {
            wildcard: '%',
            single_char: '_',
            escape: '\\',
        }
    }
}

impl LikeConfig {
    pub fn is_special(&self, c: char) -> bool {
        c == self.wildcard || c == self.single_char || c == self.escape
    }
}

/// What a double-quoted token denotes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    Identifier,
    String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dialect {
    /// Enabled spatial predicates; the others lex as plain identifiers.
    pub spatial_predicates: Vec<SpatialOp>,
    /// Known functions keyed by lowercase name.
    pub functions: BTreeMap<String, Arity>,
    /// Reject calls to functions missing from `functions`.
    pub strict_functions: bool,
    pub like: LikeConfig,
    pub double_quotes: QuoteStyle,
    /// Nesting limit for parentheses, NOT chains and unary minus.
    pub max_depth: usize,
}

impl Default for Dialect {
    fn default() -> Self {
        let functions = [
            ("abs", Arity::exactly(1)),
            ("area", Arity::exactly(1)),
            ("buffer", Arity::exactly(2)),
            ("ceil", Arity::exactly(1)),
            ("centroid", Arity::exactly(1)),
            ("floor", Arity::exactly(1)),
            ("geomlength", Arity::exactly(1)),
            ("max", Arity::exactly(2)),
            ("min", Arity::exactly(2)),
            ("round", Arity::between(1, 2)),
            ("strconcat", Arity::at_least(2)),
            ("strlength", Arity::exactly(1)),
            ("strsubstring", Arity::exactly(3)),
            ("strtolowercase", Arity::exactly(1)),
            ("strtouppercase", Arity::exactly(1)),
            ("strtrim", Arity::exactly(1)),
        ];

        Dialect {
            spatial_predicates: SpatialOp::ALL.to_vec(),
            functions: functions
                .iter()
                .map(|(name, arity)| (name.to_string(), *arity))
                .collect(),
            strict_functions: false,
            like: LikeConfig::default(),
            double_quotes: QuoteStyle::Identifier,
            max_depth: 128,
        }
    }
}

impl Dialect {
    pub fn from_toml_str(src: &str) -> Result<Dialect, ConfigError> {
        let mut dialect: Dialect = toml::from_str(src)?;

        dialect.functions = dialect
            .functions
            .into_iter()
            .map(|(name, arity)| (name.to_lowercase(), arity))
            .collect();

        dialect.validate()?;
        Ok(dialect)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Dialect, ConfigError> {
        let path = path.as_ref();
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("loading dialect from {}", path.display());
        Dialect::from_toml_str(&src)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let like = &self.like;
        if like.wildcard == like.single_char || like.wildcard == like.escape || like.single_char == like.escape {
            return Err(ConfigError::Invalid(
                "LIKE wildcard, single character and escape must differ".to_string(),
            ));
        }

        if like.is_special('\'') {
            return Err(ConfigError::Invalid(
                "LIKE special characters cannot include the string quote".to_string(),
            ));
        }

        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".to_string()));
        }

        for (name, arity) in self.functions.iter() {
            if arity.max.map_or(false, |max| max < arity.min) {
                return Err(ConfigError::Invalid(format!(
                    "function `{}` has max arity below min arity",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn spatial_enabled(&self, op: SpatialOp) -> bool {
        self.spatial_predicates.contains(&op)
    }

    pub fn function_arity(&self, name: &str) -> Option<Arity> {
        self.functions.get(&name.to_lowercase()).copied()
    }
}
