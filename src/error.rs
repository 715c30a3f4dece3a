use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmptError {
    #[error("presets not found on path: {}", .0.display())]
    OutsideProfile(PathBuf),

    #[error("path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("cannot {0} folder to subfolder of itself")]
    SelfSubfolder(&'static str),

    #[error("source and target are not in the same profile")]
    CrossProfile,

    #[error("args cannot reference the same profile")]
    SameProfile,

    #[error("both args must be the root of a profile")]
    ArgsMustBeProfile,

    #[error("cannot move: directory is not empty: {}", .0.display())]
    CannotMoveNonEmptyTarget(PathBuf),

    #[error("{} is not part of a profile", .0.display())]
    NotAProfile(PathBuf),

    #[error("incompatible index version: {}", .0.display())]
    IncompatibleIndex(PathBuf),

    #[error("unknown preset file format: {}", .0.display())]
    UnknownPresetFormat(PathBuf),

    #[error("invalid folder name: {0}")]
    InvalidFolderName(String),

    #[error("folder already exists: {}", .0.display())]
    FolderExists(PathBuf),

    #[error("more than one source would land on {}", .0.display())]
    AmbiguousTarget(PathBuf),

    #[error("move failed while removing empty folders: {}", .0.display())]
    MoveResidue(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Index {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed walking presets: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("invalid preset header pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type AppResult<T> = Result<T, AmptError>;

impl AmptError {
    /// Wraps an I/O failure with a short description of the step that failed.
    pub fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| Self::Io { context, source }
    }

    pub fn index(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let context = context.into();
        move |source| Self::Index { context, source }
    }
}

impl From<rusqlite::Error> for AmptError {
    fn from(source: rusqlite::Error) -> Self {
        Self::Index {
            context: "index query failed".to_string(),
            source,
        }
    }
}
