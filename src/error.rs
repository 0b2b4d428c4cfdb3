use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Typed failures surfaced by the core registry/install/update machinery.
///
/// The CLI layer maps every variant to a non-zero exit with a single-line
/// summary. Error chains are never printed in full because lower-level
/// diagnostics can embed credential material.
#[derive(Debug, Error)]
pub enum Error {
    #[error("registry not found at {0:?} (run 'wpm init' or set WPM_BASE_DIR)")]
    NotFound(PathBuf),

    #[error("malformed registry {path:?}: {reason}")]
    MalformedConfig { path: PathBuf, reason: String },

    #[error("no credential for product '{0}' (neither inline nor in the vault)")]
    CredentialMissing(String),

    #[error("provide either an auth token or an SSH key path, not both")]
    MutualExclusion,

    #[error("SSH key path must be absolute: {0:?}")]
    RelativeKeyPath(PathBuf),

    #[error("invalid answer for '{name}': {reason}")]
    Validation { name: String, reason: String },

    #[error("unknown product '{id}' (available: {})", available.join(", "))]
    UnknownProduct { id: String, available: Vec<String> },

    #[error("aborted; product '{0}' left unchanged")]
    Aborted(String),

    #[error("failed to {op} '{id}': {source}")]
    TemplateEngine {
        op: &'static str,
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn validation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::io(
            "interactive prompt failed",
            io::Error::new(io::ErrorKind::Other, err),
        )
    }
}
