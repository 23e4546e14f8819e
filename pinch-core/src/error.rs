//! Error types for pinch-core.
//!
//! Nothing in the per-frame path returns these: degenerate frames are skipped
//! and logged instead. Errors only come out of loading configuration and
//! touch traces, or out of host setup.

use thiserror::Error;

/// Errors raised while loading or wiring the manipulation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading a file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`crate::config::Config`].
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is outside its allowed range.
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A touch trace line could not be parsed.
    #[error("touch trace line {line}: {message}")]
    TraceParse {
        /// 1-based line number.
        line: usize,
        /// Parser diagnostic.
        message: String,
    },

    /// The parent transform of a target cannot be inverted.
    #[error("parent transform is singular")]
    SingularParent,
}

impl Error {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias used across pinch-core.
pub type Result<T> = std::result::Result<T, Error>;
