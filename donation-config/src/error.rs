// Configuration errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting `{0}`")]
    Missing(String),

    #[error("cannot read {path}: {message}")]
    Source { path: String, message: String },

    #[error("malformed {format} configuration: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    #[error("invalid `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    #[error("setting has the wrong shape: {0}")]
    Decode(String),

    #[error("environment variable {key}: {source}")]
    Env {
        key: String,
        #[source]
        source: std::env::VarError,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
