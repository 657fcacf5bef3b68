pub mod archive;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod download;
pub mod error;
pub mod poll;
pub mod portal;
pub mod workdir;

pub use catalog::CatalogRecord;
pub use config::{DownloadMatch, Settings};
pub use error::{Error, Result};
