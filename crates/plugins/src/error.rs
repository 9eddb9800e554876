use std::path::{Path, PathBuf};

use {marketplace_common::FromMessage, thiserror::Error};

/// Why a plugin folder could not be turned into a descriptor.
///
/// Load errors are fatal for that plugin only; the batch carries on.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no plugin manifest at {}", path.display())]
    MissingManifest { path: PathBuf },

    #[error("malformed plugin manifest {}: {reason}", path.display())]
    MalformedManifest { path: PathBuf, reason: String },

    #[error("plugin manifest {} is missing required field `{field}`", path.display())]
    MissingRequiredField { path: PathBuf, field: &'static str },

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    #[must_use]
    pub fn malformed(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::MalformedManifest {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Stable identifier used in reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingManifest { .. } => "MissingManifest",
            Self::MalformedManifest { .. } => "MalformedManifest",
            Self::MissingRequiredField { .. } => "MissingRequiredField",
            Self::Unreadable { .. } => "Unreadable",
        }
    }
}

/// Run-level failures of the manifest aggregator. Nothing is persisted
/// when one of these is returned.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error(
        "duplicate plugin name `{name}` in {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to write manifest {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AggregationError {
    #[must_use]
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateName { .. } => "DuplicateName",
            Self::Write { .. } => "WriteFailed",
            Self::Serialize(_) => "SerializeFailed",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] marketplace_common::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

marketplace_common::impl_context!();
