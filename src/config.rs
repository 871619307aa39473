use crate::error::{Error, Result};
use crate::pagination::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Pause before a "load more" request commits its page
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_TABLE: &str = "policies";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the hosted policy table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_url: Url,
    pub api_key: Option<String>,
    pub table: String,
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            table: DEFAULT_TABLE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where policy records come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    Http(StoreConfig),
    File(PathBuf),
}

/// Pagination and pacing for the browser controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseSettings {
    pub page_size: usize,
    pub settle_delay: Duration,
}

impl Default for BrowseSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: PolicySource,
    pub browse: BrowseSettings,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.browse.page_size == 0 {
            return Err(Error::Config("Page size must be at least 1".to_string()));
        }

        match &self.source {
            PolicySource::File(path) => {
                if !path.is_file() {
                    return Err(Error::Config(format!(
                        "Policy data file does not exist: {}",
                        path.display()
                    )));
                }
            }
            PolicySource::Http(store) => {
                if !matches!(store.base_url.scheme(), "http" | "https") {
                    return Err(Error::Config(format!(
                        "Unsupported URL scheme '{}'",
                        store.base_url.scheme()
                    )));
                }
                if store.table.trim().is_empty() {
                    return Err(Error::Config("Table name must not be empty".to_string()));
                }
            }
        }

        Ok(())
    }
}

/// Shape of `policyfinder.yml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub table: Option<String>,
    pub data: Option<PathBuf>,
    pub page_size: Option<usize>,
    pub settle_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Load and parse a YAML config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

#[derive(Debug, Clone)]
enum PendingSource {
    Url(Url),
    File(PathBuf),
}

/// Builder for creating configurations.
///
/// Setters always overwrite; the `fill_*` methods only supply values that are
/// still unset, so calling them in order flags, env, file gives that precedence.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    source: Option<PendingSource>,
    api_key: Option<String>,
    table: Option<String>,
    timeout_secs: Option<u64>,
    page_size: Option<usize>,
    settle_delay: Option<Duration>,
}

impl ConfigBuilder {
    /// Create a new builder with nothing set
    pub fn new() -> Self {
        Self::default()
    }

    /// Read policies from a hosted table at this base URL
    pub fn url(mut self, url: &str) -> Result<Self> {
        self.source = Some(PendingSource::Url(Url::parse(url)?));
        Ok(self)
    }

    /// Read policies from a JSON file
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(PendingSource::File(path.into()));
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    /// Fill unset values from `POLICYFINDER_*` variables supplied by `lookup`
    pub fn fill_from_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.source.is_none() {
            if let Some(data) = lookup("POLICYFINDER_DATA") {
                self.source = Some(PendingSource::File(PathBuf::from(data)));
            } else if let Some(url) = lookup("POLICYFINDER_URL") {
                self.source = Some(PendingSource::Url(Url::parse(&url)?));
            }
        }
        if self.api_key.is_none() {
            self.api_key = lookup("POLICYFINDER_API_KEY");
        }
        if self.table.is_none() {
            self.table = lookup("POLICYFINDER_TABLE");
        }
        if self.page_size.is_none() {
            if let Some(raw) = lookup("POLICYFINDER_PAGE_SIZE") {
                self.page_size = Some(parse_number("POLICYFINDER_PAGE_SIZE", &raw)?);
            }
        }
        if self.settle_delay.is_none() {
            if let Some(raw) = lookup("POLICYFINDER_SETTLE_MS") {
                self.settle_delay = Some(Duration::from_millis(parse_number(
                    "POLICYFINDER_SETTLE_MS",
                    &raw,
                )?));
            }
        }
        Ok(self)
    }

    /// Fill unset values from the process environment
    pub fn fill_from_env(self) -> Result<Self> {
        self.fill_from_vars(|name| std::env::var(name).ok())
    }

    /// Fill unset values from a parsed config file
    pub fn fill_from_file(mut self, file: ConfigFile) -> Result<Self> {
        if self.source.is_none() {
            if let Some(data) = file.data {
                self.source = Some(PendingSource::File(data));
            } else if let Some(url) = file.url {
                self.source = Some(PendingSource::Url(Url::parse(&url)?));
            }
        }
        self.api_key = self.api_key.or(file.api_key);
        self.table = self.table.or(file.table);
        self.timeout_secs = self.timeout_secs.or(file.timeout_secs);
        self.page_size = self.page_size.or(file.page_size);
        self.settle_delay = self
            .settle_delay
            .or(file.settle_ms.map(Duration::from_millis));
        Ok(self)
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        let source = match self.source {
            Some(PendingSource::File(path)) => PolicySource::File(path),
            Some(PendingSource::Url(base_url)) => PolicySource::Http(StoreConfig {
                base_url,
                api_key: self.api_key,
                table: self.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
                timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            }),
            None => {
                return Err(Error::Config(
                    "No policy source configured. Pass --data or --url, or set POLICYFINDER_DATA / POLICYFINDER_URL".to_string(),
                ))
            }
        };

        let config = Config {
            source,
            browse: BrowseSettings {
                page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
                settle_delay: self.settle_delay.unwrap_or(DEFAULT_SETTLE_DELAY),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", name, raw)))
}
