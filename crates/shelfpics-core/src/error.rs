use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Working directory error: {0}")]
    Directory(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Element interaction failed: {0}")]
    Element(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Failed to read catalog: {0}")]
    Catalog(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<calamine::Error> for Error {
    fn from(err: calamine::Error) -> Self {
        Error::Catalog(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
