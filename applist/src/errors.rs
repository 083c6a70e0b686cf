use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("required binary `{0}` not available to context")]
    MissingBin(String),
    #[error("missing required env var: {0}")]
    MissingEnv(String),

    #[error("{0}")]
    IO(io::Error),

    #[error("command failed with status {0}: {1}")]
    CommandError(i32, String),

    #[error("failed to get basedirs")]
    NoBaseDirs,

    #[error("no adb device connected")]
    NoAdbDevice,
    #[error("adb device {0} not found")]
    AdbDeviceNotFound(String),

    #[error("backup destination is not set")]
    NoDestination,

    #[error("destination {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("backup file {0:?} already exists")]
    BackupExists(PathBuf),

    #[error("bad path {0:?}")]
    BadPath(PathBuf),

    #[error("invalid config {0}: {1}")]
    InvalidConfig(String, String),

    #[error("file {0} doesn't exist")]
    MissingFile(String),

    #[error("bad template {0}: {1}")]
    Template(String, String),

    #[error("failed to render icon: {0}")]
    Icon(String),

    #[error("bad package list: {0}")]
    Json(String),

    #[error("generic error: {0}")]
    Generic(String),
}

impl Error {
    pub fn new_generic<S: ToString + ?Sized>(s: &S) -> Self {
        Self::Generic(s.to_string())
    }

    pub fn new_cfg<S: ToString + ?Sized>(path: &Path, s: &S) -> Self {
        Self::InvalidConfig(path.display().to_string(), s.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Error {
    fn from(value: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Generic(value.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::IO(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Self::Icon(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Generic(format!("bad apk: {}", err))
    }
}
