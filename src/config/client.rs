use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{LOST_STAGE, Stage};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Viewer's reference timezone as minutes east of UTC. Decides what "today" means.
    pub utc_offset_minutes: i32,
    /// Ordered pipeline, used when the server does not publish its own.
    pub stages: Vec<Stage>,
    pub export: ExportConfig,
    pub sync: SyncConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Simultaneous document transfers.
    pub concurrency: usize,
    pub activity_page_size: usize,
    pub output_dir: PathBuf,
    /// Directory holding `{font_family}-Regular.ttf` and the bold/italic
    /// variants for the printable export. System fonts are used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_dir: Option<PathBuf>,
    pub font_family: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub activity_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            stages: default_stages(),
            export: ExportConfig::default(),
            sync: SyncConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            activity_page_size: 100,
            output_dir: PathBuf::from("."),
            font_dir: None,
            font_family: "LiberationSans".into(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            activity_page_size: 50,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new("new", false),
        Stage::new("contacted", false),
        Stage::new("qualified", false),
        Stage::new("appointment_set", false),
        Stage::new("negotiating", false),
        Stage::new("converted", true),
        Stage::new(LOST_STAGE, true),
    ]
}

impl ClientConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.export.concurrency == 0 {
            return Err(Error::Config("export.concurrency must be at least 1".into()));
        }
        if self.export.activity_page_size == 0 || self.sync.activity_page_size == 0 {
            return Err(Error::Config("activity page sizes must be at least 1".into()));
        }
        if self.export.font_family.trim().is_empty() {
            return Err(Error::Config("export.font_family must not be empty".into()));
        }
        if self.stages.is_empty() {
            return Err(Error::Config("at least one stage must be configured".into()));
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "leadflow").ok_or_else(|| {
        Error::Config("could not determine config directory, is $HOME set?".into())
    })?;
    Ok(dirs.config_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
