//! Connection profiles and debug settings.
//!
//! A profile can come from direct parameters, from a JSON file, or both;
//! values in the file take precedence.
//!
//! ```json
//! {
//!   "arcgis_url": "https://www.arcgis.com",
//!   "username": "cartographer",
//!   "password": "...",
//!   "debug": "basic",
//!   "full_debug_output_folder": "./debug"
//! }
//! ```

use crate::error::{Error, Result};
use crate::render::{to_json, JsonFormat};
use chrono::{Local, NaiveDate};
use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How much diagnostic output a run produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    /// Progress messages only
    #[default]
    None,
    /// Stage summaries
    Basic,
    /// Per-element detail and a dump of the final tree
    Full,
}

impl DebugLevel {
    /// Log level filter matching this debug level.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            DebugLevel::None => LevelFilter::Info,
            DebugLevel::Basic => LevelFilter::Debug,
            DebugLevel::Full => LevelFilter::Trace,
        }
    }

    /// Parse a level name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(DebugLevel::None),
            "basic" => Some(DebugLevel::Basic),
            "full" => Some(DebugLevel::Full),
            _ => None,
        }
    }
}

/// Credentials and settings for one portal.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    /// Portal URL
    pub url: String,
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
    /// Diagnostic output level
    pub debug: DebugLevel,
    /// Folder for full debug dumps
    pub debug_output_folder: Option<PathBuf>,
}

impl ConnectionProfile {
    /// Create a profile from credentials.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: username.into(),
            password: password.into(),
            debug: DebugLevel::None,
            debug_output_folder: None,
        }
    }

    /// Set the debug level.
    pub fn with_debug(mut self, debug: DebugLevel) -> Self {
        self.debug = debug;
        self
    }

    /// Load a profile file; every field must be present.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        ProfileParams::default().resolve(Some(path.as_ref()))
    }

    /// Where a full debug dump of a story would be written, if enabled.
    pub fn debug_dump_path(&self, title: &str, date: NaiveDate) -> Option<PathBuf> {
        if self.debug != DebugLevel::Full {
            return None;
        }
        let folder = self
            .debug_output_folder
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Some(dump_path(&folder, title, date))
    }

    /// Write a story tree as pretty JSON when full debug output is on.
    pub fn write_debug_dump(&self, title: &str, tree: &Value) -> Result<Option<PathBuf>> {
        let Some(path) = self.debug_dump_path(title, Local::now().date_naive()) else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, to_json(tree, JsonFormat::Pretty)?)?;
        info!("Wrote debug dump to {}", path.display());
        Ok(Some(path))
    }
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"********")
            .field("debug", &self.debug)
            .field("debug_output_folder", &self.debug_output_folder)
            .finish()
    }
}

/// Partially known connection parameters, as given on a command line or
/// read from a profile file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileParams {
    /// Portal URL
    #[serde(rename = "arcgis_url", alias = "url")]
    pub url: Option<String>,
    /// Account name
    pub username: Option<String>,
    /// Account password
    pub password: Option<String>,
    /// Debug level name
    pub debug: Option<String>,
    /// Folder for full debug dumps
    #[serde(rename = "full_debug_output_folder", alias = "debug_output_folder")]
    pub debug_output_folder: Option<PathBuf>,
}

impl ProfileParams {
    /// Read parameters from a JSON profile file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read profile {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid profile {}: {}", path.display(), e)))
    }

    /// Fill fields from `other` where it has a value.
    pub fn override_with(mut self, other: ProfileParams) -> Self {
        self.url = other.url.or(self.url);
        self.username = other.username.or(self.username);
        self.password = other.password.or(self.password);
        self.debug = other.debug.or(self.debug);
        self.debug_output_folder = other.debug_output_folder.or(self.debug_output_folder);
        self
    }

    /// Merge with an optional profile file and check completeness.
    pub fn resolve(self, file: Option<&Path>) -> Result<ConnectionProfile> {
        let params = match file {
            Some(path) => self.override_with(ProfileParams::from_file(path)?),
            None => self,
        };

        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());
        let missing: Vec<&str> = [
            ("url", present(&params.url)),
            ("username", present(&params.username)),
            ("password", present(&params.password)),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing connection parameters: {}",
                missing.join(", ")
            )));
        }

        let debug = match params.debug.as_deref() {
            None => DebugLevel::None,
            Some(name) => DebugLevel::parse(name).ok_or_else(|| {
                Error::Config(format!(
                    "unknown debug level '{}' (expected none, basic or full)",
                    name
                ))
            })?,
        };

        Ok(ConnectionProfile {
            url: params.url.unwrap_or_default(),
            username: params.username.unwrap_or_default(),
            password: params.password.unwrap_or_default(),
            debug,
            debug_output_folder: params.debug_output_folder,
        })
    }
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
pub fn safe_title(title: &str) -> String {
    let safe: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() {
        "story".to_string()
    } else {
        safe
    }
}

/// `{folder}/{safe_title}_{YYYYMMDD}.json`, with a numeric suffix when the
/// file already exists.
pub fn dump_path(folder: &Path, title: &str, date: NaiveDate) -> PathBuf {
    let stem = format!("{}_{}", safe_title(title), date.format("%Y%m%d"));
    let mut path = folder.join(format!("{}.json", stem));
    let mut n = 1;
    while path.exists() {
        path = folder.join(format!("{}_{}.json", stem, n));
        n += 1;
    }
    path
}
