use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read or written.
    Io { path: PathBuf, message: String },
    /// JSON / TOML parse or deserialization error.
    Parse { path: Option<PathBuf>, message: String },
    /// Parsed but semantically invalid (duplicate field, bad separator, ...).
    Invalid(String),
    /// File extension is neither `.toml` nor `.json`.
    UnsupportedFormat(PathBuf),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), message: err.to_string() }
    }

    /// Attach the file a parse error came from.
    pub(crate) fn with_path(self, path: &Path) -> Self {
        match self {
            Self::Parse { path: None, message } => {
                Self::Parse { path: Some(path.to_path_buf()), message }
            }
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "IO error: {}: {message}", path.display()),
            Self::Parse { path: Some(path), message } => {
                write!(f, "parse error in {}: {message}", path.display())
            }
            Self::Parse { path: None, message } => write!(f, "parse error: {message}"),
            Self::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
            Self::UnsupportedFormat(path) => {
                write!(f, "unsupported config format: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
