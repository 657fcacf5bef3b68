use crate::{Error, Result};
use ini::{Ini, ParseOption, Properties};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// INI section holding every setting
pub const SETTINGS_SECTION: &str = "Settings";

pub const DEFAULT_DOWNLOAD_PAUSE_SECS: u64 = 30;
pub const DEFAULT_AUTH_URL: &str = "https://contebank.com/login";
pub const DEFAULT_DOWNLOAD_URL: &str = "https://contebank.com/downloadAll";

/// How the file produced by a bulk download is told apart from the rest of
/// the working directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMatch {
    /// Diff the directory listing taken before the download against the one after
    #[default]
    Snapshot,
    /// Rename whatever has a long browser-generated file name
    Length,
}

impl FromStr for DownloadMatch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "snapshot" => Ok(DownloadMatch::Snapshot),
            "length" => Ok(DownloadMatch::Length),
            other => Err(Error::Config(format!(
                "DOWNLOAD_MATCH must be 'snapshot' or 'length', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DownloadMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadMatch::Snapshot => write!(f, "snapshot"),
            DownloadMatch::Length => write!(f, "length"),
        }
    }
}

/// Run settings, loaded once at startup and never mutated afterwards
#[derive(Clone)]
pub struct Settings {
    pub login: String,
    pub password: String,
    pub base_dir: PathBuf,
    pub download_pause: Duration,
    pub auth_url: Url,
    pub download_url: Url,
    pub download_match: DownloadMatch,
}

impl Settings {
    /// Load settings from an INI file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading settings from: {}", path.display());

        if !path.is_file() {
            return Err(Error::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let text = std::fs::read_to_string(path)?;
        Self::from_ini_str(&text)
    }

    /// Parse settings from INI text
    pub fn from_ini_str(text: &str) -> Result<Self> {
        let text = text.trim_start_matches('\u{feff}');
        // Values are taken literally: Windows paths and passwords keep their
        // backslashes and quotes
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..Default::default()
        };
        let ini = Ini::load_from_str_opt(text, options)
            .map_err(|e| Error::Config(format!("malformed configuration: {}", e)))?;

        let section = ini.section(Some(SETTINGS_SECTION)).ok_or_else(|| {
            Error::Config(format!("missing [{}] section", SETTINGS_SECTION))
        })?;

        let required = |key: &str, what: &str| -> Result<String> {
            match lookup(section, key).map(str::trim) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(Error::Config(format!("no value for {} ({})", key, what))),
            }
        };

        let login = required("LOGIN", "portal login")?;
        let password = required("PASSWORD", "portal password")?;
        let base_dir = PathBuf::from(required("BASE_DIR", "download directory")?);

        let download_pause = match lookup(section, "DOWNLOAD_PAUSE").map(str::trim) {
            None => DEFAULT_DOWNLOAD_PAUSE_SECS,
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(
                    "DOWNLOAD_PAUSE '{}' is not a whole number of seconds, using {}",
                    raw,
                    DEFAULT_DOWNLOAD_PAUSE_SECS
                );
                DEFAULT_DOWNLOAD_PAUSE_SECS
            }),
        };

        let auth_url = parse_url("AUTH_URL", lookup(section, "AUTH_URL"), DEFAULT_AUTH_URL)?;
        let download_url = parse_url(
            "DOWNLOAD_URL",
            lookup(section, "DOWNLOAD_URL"),
            DEFAULT_DOWNLOAD_URL,
        )?;

        let download_match = match lookup(section, "DOWNLOAD_MATCH") {
            Some(raw) => raw.parse()?,
            None => DownloadMatch::default(),
        };

        Ok(Self {
            login,
            password,
            base_dir,
            download_pause: Duration::from_secs(download_pause),
            auth_url,
            download_url,
            download_match,
        })
    }

    /// Bulk-download URL for a portal model identifier
    pub fn model_download_url(&self, model: &str) -> String {
        format!(
            "{}/{}",
            self.download_url.as_str().trim_end_matches('/'),
            model
        )
    }

    /// Serializable view with the password masked
    pub fn redacted(&self) -> RedactedSettings {
        RedactedSettings {
            login: self.login.clone(),
            password: "********".to_string(),
            base_dir: self.base_dir.display().to_string(),
            download_pause_secs: self.download_pause.as_secs(),
            auth_url: self.auth_url.to_string(),
            download_url: self.download_url.to_string(),
            download_match: self.download_match,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("login", &self.login)
            .field("password", &"********")
            .field("base_dir", &self.base_dir)
            .field("download_pause", &self.download_pause)
            .field("auth_url", &self.auth_url.as_str())
            .field("download_url", &self.download_url.as_str())
            .field("download_match", &self.download_match)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactedSettings {
    pub login: String,
    pub password: String,
    pub base_dir: String,
    pub download_pause_secs: u64,
    pub auth_url: String,
    pub download_url: String,
    pub download_match: DownloadMatch,
}

/// Value of `key` in `section`, ignoring the case of the key name
fn lookup<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section
        .iter()
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(key))
        .map(|(_, value)| value)
}

fn parse_url(key: &str, value: Option<&str>, default: &str) -> Result<Url> {
    let raw = value.map(str::trim).unwrap_or(default);
    Url::parse(raw).map_err(|e| Error::Config(format!("{} '{}' is not a valid URL: {}", key, raw, e)))
}
