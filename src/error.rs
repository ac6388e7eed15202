//! Error types for each pipeline concern.
//!
//! Load-bearing stages (aggregation, synthesis, publish) surface these to the
//! orchestrator, which classifies them into an abort reason. Best-effort
//! stages (sitemap, indexing) only log them.

use thiserror::Error;

/// Failure to load or validate the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A single news provider or feed request that produced nothing usable.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("could not parse feed: {0}")]
    Parse(String),
}

/// Outcomes of talking to the content backend that are not a success.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("cannot connect to backend: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend request timed out")]
    Timeout,

    #[error("invalid admin credentials")]
    InvalidCredentials,

    #[error("login succeeded but no token was returned")]
    MissingToken,

    #[error("bearer token rejected")]
    AuthRejected,

    #[error("slug conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("could not decode backend response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Transport(e)
        }
    }
}

/// Reasons the content synthesizer yields no article.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("generative-text API key is not configured")]
    NotConfigured,

    #[error("generative-text request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("generative-text request timed out")]
    Timeout,

    #[error("generative-text HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion contained no message content")]
    EmptyCompletion,

    #[error("model response is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("model response missing required field '{0}'")]
    MissingField(&'static str),

    #[error("title '{0}' yields an empty slug")]
    EmptySlug(String),
}

impl From<reqwest::Error> for SynthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthError::Timeout
        } else {
            SynthError::Transport(e)
        }
    }
}

/// A single index notification that did not go through.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("key file error: {0}")]
    Key(#[from] StoreError),

    #[error("key file not found at {key_location} (HTTP 403)")]
    KeyNotHosted { key_location: String },

    #[error("URL host does not match site host (HTTP 422)")]
    HostMismatch,

    #[error("unexpected HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Local persistence failures (ledger, backups, key file, sitemap).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: impl AsRef<std::path::Path>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_messages() {
        assert_eq!(
            BackendError::InvalidCredentials.to_string(),
            "invalid admin credentials"
        );
        let e = BackendError::UnexpectedStatus {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(e.to_string(), "unexpected HTTP 502: bad gateway");
    }

    #[test]
    fn test_synth_missing_field_message() {
        assert_eq!(
            SynthError::MissingField("excerpt").to_string(),
            "model response missing required field 'excerpt'"
        );
    }
}
