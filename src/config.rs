use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.api-ninjas.com/v1/quotes";
pub const DEFAULT_COUNTDOWN_SECS: u32 = 5;

/// Persisted settings. The API key is deliberately not part of this; it only
/// ever comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub category: String,
    pub countdown_secs: u32,
    pub api_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            category: String::new(),
            countdown_secs: DEFAULT_COUNTDOWN_SECS,
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Command line values that take precedence over the stored config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub category: Option<String>,
    pub countdown_secs: Option<u32>,
    pub api_url: Option<String>,
}

impl Config {
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(category) = overrides.category {
            self.category = category;
        }
        if let Some(secs) = overrides.countdown_secs {
            self.countdown_secs = secs;
        }
        if let Some(url) = overrides.api_url {
            self.api_url = url;
        }
        self
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "quote-race") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("quote_race_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "ignoring unreadable config");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
