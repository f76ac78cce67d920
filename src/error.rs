//! Error types

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::schema::Kind;

/// Boxed error returned by user-supplied hooks (secret providers, validators, decoders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The schema itself cannot be walked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("unexpected {kind} value, expecting a struct")]
    NotARecord { kind: Kind },
    #[error("field path {0:?} is produced more than once")]
    DuplicatePath(String),
}

/// A textual value cannot be converted into a field's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("unsupported kind {kind}")]
    Unsupported { kind: Kind },
    #[error("invalid {kind} value {input:?}: {reason}")]
    Invalid {
        kind: Kind,
        input: String,
        reason: String,
    },
}

impl CoercionError {
    pub(crate) fn invalid(kind: Kind, input: &str, reason: impl ToString) -> Self {
        CoercionError::Invalid {
            kind,
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Unknown fields found in one or more configuration files, keyed by file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", render_unknown(.fields))]
pub struct UnknownFieldsError {
    pub fields: BTreeMap<String, Vec<String>>,
}

fn render_unknown(fields: &BTreeMap<String, Vec<String>>) -> String {
    if fields.is_empty() {
        return "unknown fields found in configuration".to_string();
    }

    let parts: Vec<String> = fields
        .iter()
        .map(|(file, paths)| {
            let mut paths = paths.clone();
            paths.sort();
            format!("{file}: {}", paths.join(", "))
        })
        .collect();

    format!(
        "unknown fields found in configuration files: {}",
        parts.join("; ")
    )
}

/// A configuration document could not be decoded into a generic tree.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("document root is not a table")]
    NotATable,
    #[error(transparent)]
    Other(BoxError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("cannot set field {field}: {source}")]
    Coercion {
        field: String,
        source: CoercionError,
    },

    #[error(transparent)]
    UnknownFields(#[from] UnknownFieldsError),

    #[error("failed to read config file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to decode {label}: {source}")]
    Decode { label: String, source: DecodeError },

    #[error("failed to apply {label}: {source}")]
    Apply {
        label: String,
        source: serde_json::Error,
    },

    #[error("failed to snapshot configuration: {0}")]
    Snapshot(#[source] serde_json::Error),

    #[error("format cannot be empty")]
    EmptyFormat,

    #[error("decoder for format {0:?} is already registered")]
    DuplicateDecoder(String),

    #[error("no decoder registered for format {0:?}")]
    NoDecoder(String),

    #[error("tag {tag:?} is already claimed by {owner}")]
    TagClaimed { tag: String, owner: &'static str },

    #[error("flag --{0} is bound to more than one field")]
    DuplicateFlag(String),

    #[error(transparent)]
    Flags(#[from] clap::Error),

    /// `--help` was requested; carries the rendered help text.
    #[error("{0}")]
    Usage(String),

    #[error("secret {name:?} lookup failed: {source}")]
    Secret { name: String, source: BoxError },

    #[error("validation failed: {0}")]
    Validation(#[source] BoxError),
}

impl Error {
    pub(crate) fn coercion(field: &str, source: CoercionError) -> Self {
        Error::Coercion {
            field: field.to_string(),
            source,
        }
    }
}
