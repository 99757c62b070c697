use std::path::PathBuf;
use thiserror::Error;

/// 核心库错误类型
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid clean level: {0} (must be conservative, standard, or aggressive)")]
    InvalidCleanLevel(String),

    #[error("invalid domain: {0} (must be system, frontend, backend, mobile, devops, or dataml)")]
    InvalidDomain(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine the home directory")]
    NoHomeDir,

    #[error("invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
