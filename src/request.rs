//! OGC WFS key-value requests built from compiled filters.
//!
//! Requests are plain data; sending them is left to the caller. Version
//! differences are a matter of parameter naming, handled by one function
//! parameterized by [`WfsVersion`] and the server's [`Capabilities`].

use crate::lang::filter::Filter;
use crate::lang::writer::write;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use std::{fmt, str::FromStr};

// RFC 3986 unreserved characters stay as they are
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("server does not support CQL filters")]
    CqlUnsupported,

    #[error("unsupported output format `{0}`")]
    UnsupportedFormat(String),

    #[error("at least one feature type name is required")]
    MissingTypeName,

    #[error("unknown WFS version `{0}`")]
    UnknownVersion(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum WfsVersion {
    V1_0_0,
    V1_1_0,
    V2_0_0,
}

impl WfsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WfsVersion::V1_0_0 => "1.0.0",
            WfsVersion::V1_1_0 => "1.1.0",
            WfsVersion::V2_0_0 => "2.0.0",
        }
    }

    fn type_names_key(&self) -> &'static str {
        match self {
            WfsVersion::V2_0_0 => "typeNames",
            _ => "typeName",
        }
    }

    fn max_features_key(&self) -> &'static str {
        match self {
            WfsVersion::V2_0_0 => "count",
            _ => "maxFeatures",
        }
    }
}

impl fmt::Display for WfsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WfsVersion {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0.0" => Ok(WfsVersion::V1_0_0),
            "1.1.0" => Ok(WfsVersion::V1_1_0),
            "2.0.0" => Ok(WfsVersion::V2_0_0),
            _ => Err(RequestError::UnknownVersion(s.to_string())),
        }
    }
}

/// What the target server accepts.
#[derive(Clone, Debug, PartialEq)]
pub struct Capabilities {
    pub cql_filter: bool,
    pub output_formats: Vec<String>,
    /// Server side cap on returned features.
    pub max_features: Option<u64>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            cql_filter: true,
            output_formats: vec![
                "application/gml+xml".to_string(),
                "application/json".to_string(),
            ],
            max_features: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GetFeature {
    pub type_names: Vec<String>,
    pub filter: Option<Filter>,
    pub property_names: Vec<String>,
    pub max_features: Option<u64>,
    pub output_format: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    /// Schema of the given types, or of every type when empty.
    DescribeFeatureType { type_names: Vec<String> },
    GetFeature(GetFeature),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::DescribeFeatureType { .. } => "DescribeFeatureType",
            Operation::GetFeature(_) => "GetFeature",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Request {
    pub version: WfsVersion,
    pub operation: &'static str,
    pub params: Vec<(String, String)>,
}

impl Request {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!(
                "{}={}",
                utf8_percent_encode(k, QUERY_ENCODE_SET),
                utf8_percent_encode(v, QUERY_ENCODE_SET)
            ))
            .collect::<Vec<_>>()
            .join("&")
    }
}

pub fn build_request(
    version: WfsVersion,
    capabilities: &Capabilities,
    operation: &Operation,
) -> Result<Request, RequestError> {
    let mut params = vec![
        ("service".to_string(), "WFS".to_string()),
        ("version".to_string(), version.to_string()),
        ("request".to_string(), operation.name().to_string()),
    ];

    match operation {
        Operation::DescribeFeatureType { type_names } => {
            if !type_names.is_empty() {
                params.push((version.type_names_key().to_string(), type_names.join(",")));
            }
        },

        Operation::GetFeature(query) => {
            if query.type_names.is_empty() {
                return Err(RequestError::MissingTypeName);
            }
            params.push((version.type_names_key().to_string(), query.type_names.join(",")));

            if let Some(format) = &query.output_format {
                if !capabilities.output_formats.contains(format) {
                    return Err(RequestError::UnsupportedFormat(format.clone()));
                }
                params.push(("outputFormat".to_string(), format.clone()));
            }

            if !query.property_names.is_empty() {
                params.push(("propertyName".to_string(), query.property_names.join(",")));
            }

            let limit = match (query.max_features, capabilities.max_features) {
                (Some(requested), Some(cap)) => Some(requested.min(cap)),
                (requested, cap) => requested.or(cap),
            };
            if let Some(limit) = limit {
                params.push((version.max_features_key().to_string(), limit.to_string()));
            }

            if let Some(filter) = &query.filter {
                if !capabilities.cql_filter {
                    return Err(RequestError::CqlUnsupported);
                }
                params.push(("CQL_FILTER".to_string(), write(filter)));
            }
        },
    }

    log::debug!("built WFS {} {} request", version, operation.name());

    Ok(Request {
        version,
        operation: operation.name(),
        params,
    })
}
