use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("Unauthorized: no root directory has been selected")]
    NoAuthorizedRoot,

    #[error("Unauthorized: root '{requested}' does not match the selected root '{authorized}'")]
    RootMismatch {
        requested: PathBuf,
        authorized: PathBuf,
    },

    #[error("Unauthorized: '{0}' is outside the selected root")]
    OutsideRoot(PathBuf),

    #[error("Not a directory: '{0}'")]
    NotADirectory(PathBuf),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("YAML Parsing/Serialization Error: {0}")]
    YamlError(#[from] serde_yml::Error),

    #[error("JSON Serialization Error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File Read Error: Path '{path}', Error: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory Read Error: Path '{path}', Error: {source}")]
    DirRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    #[error("TikToken Error: {0}")]
    TikToken(String),
}

impl AppError {
    /// True for rejections caused by the selected root.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AppError::NoAuthorizedRoot | AppError::RootMismatch { .. } | AppError::OutsideRoot(_)
        )
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(PathBuf::from).unwrap_or_default();
        match err.into_io_error() {
            Some(source) => AppError::DirRead { path, source },
            None => AppError::DirRead {
                path,
                source: std::io::Error::other("filesystem loop"),
            },
        }
    }
}
