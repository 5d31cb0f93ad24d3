//! Error type shared by the context, sources and devices.
//!
//! Internal layers return [`Result`] and bubble failures up with `?`. Only two places
//! swallow errors: [`Context`](crate::context::Context) when a source fails to start
//! (the source is logged and skipped), and the flat C API, which turns every error
//! into a log line plus a `0`/null return.

use crate::device::DeviceId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid options: {0}")]
    Config(#[from] toml::de::Error),

    /// The native subsystem behind a source cannot be used at all.
    #[error("{source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },

    /// A native call failed after the source was up.
    #[error("{backend}: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn unavailable(source_name: &'static str, reason: impl std::fmt::Display) -> Self {
        Error::Unavailable {
            source_name,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn backend(backend: &'static str, message: impl std::fmt::Display) -> Self {
        Error::Backend {
            backend,
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
