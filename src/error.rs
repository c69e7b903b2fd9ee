use thiserror::Error;

/// Main error type for fiki
#[derive(Error, Debug)]
pub enum FikiError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network failure while fetching the source archive
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The source archive endpoint answered with something other than 200
    #[error("Source returned HTTP {status} for {url}")]
    SourceStatus { url: String, status: u16 },

    /// Gzip or tar stream could not be decoded
    #[error("Archive error: {0}")]
    Archive(String),

    /// Directory walk failed
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two entries in one pass produced the same page key
    #[error("Duplicate page key in one pass: {0}")]
    DuplicatePage(String),

    /// The same child was listed twice under one directory in one pass
    #[error("Duplicate child '{child}' under directory '{parent}'")]
    DuplicateChild { parent: String, child: String },

    /// A refresh was requested while another pass is still running
    #[error("An ingestion pass is already in progress")]
    PassInProgress,

    /// The running pass was abandoned before it could publish
    #[error("Ingestion pass abandoned")]
    PassAbandoned,

    /// File watcher errors
    #[error("Watch error: {0}")]
    Watch(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),
}

impl FikiError {
    /// Source data broke a per-pass uniqueness guarantee.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(self, FikiError::DuplicatePage(_) | FikiError::DuplicateChild { .. })
    }
}

/// Convenient Result type using FikiError
pub type Result<T> = std::result::Result<T, FikiError>;
