//! Layered configuration: TOML file, `TRAFFIC_*` environment, command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::github::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, FetchOptions};
use crate::repo::{GITHUB_API, RepositoryRef};

pub const DEFAULT_CONFIG_FILE: &str = "traffic.toml";
pub const DEFAULT_OUTPUT: &str = "traffic.md";
pub const DEFAULT_PREVIEW_COMMAND: &str = "grip";

/// Token fallbacks, lowest priority first.
const TOKEN_ENV_FALLBACKS: [&str; 2] = ["ACCESS_TOKEN", "GITHUB_TOKEN"];

#[derive(Debug)]
pub struct Config {
    pub api_token: SecretString,
    pub owner: String,
    pub repositories: Vec<String>,
    pub output: PathBuf,
    /// Repository names in the order they appear in the report.
    pub display_order: Vec<String>,
    pub preview: bool,
    pub preview_command: String,
    pub api_base: String,
    pub fetch: FetchOptions,
}

/// Values supplied on the command line; `None` leaves lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// Never Debug: holds the plaintext token.
#[derive(Deserialize)]
struct RawConfig {
    api_token: Option<String>,
    owner: Option<String>,
    #[serde(default)]
    repositories: Vec<String>,
    #[serde(default = "default_output")]
    output: PathBuf,
    #[serde(default)]
    display_order: Vec<String>,
    #[serde(default = "default_preview")]
    preview: bool,
    #[serde(default = "default_preview_command")]
    preview_command: String,
    #[serde(default = "default_api_base")]
    api_base: String,
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    user_agent: Option<String>,
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}
fn default_preview() -> bool {
    true
}
fn default_preview_command() -> String {
    DEFAULT_PREVIEW_COMMAND.into()
}
fn default_api_base() -> String {
    GITHUB_API.into()
}
fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    /// Assemble every layer. An explicit `path` must exist; the default file is optional.
    pub fn figment(path: Option<&Path>, overrides: &Overrides) -> Result<Figment> {
        let file = match path {
            Some(p) if !p.exists() => {
                return Err(Error::Config(format!("config file {} not found", p.display())));
            }
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let mut figment = Figment::new();
        for var in TOKEN_ENV_FALLBACKS {
            figment = figment.merge(Env::raw().only(&[var]).map(|_| "api_token".into()));
        }

        Ok(figment
            .merge(Toml::file(file))
            .merge(Env::prefixed("TRAFFIC_"))
            .merge(Serialized::defaults(overrides.clone())))
    }

    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::from_figment(&Self::figment(path, overrides)?)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw: RawConfig = figment.extract()?;

        let api_token = raw
            .api_token
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| {
                Error::Config(
                    "api_token is required (TRAFFIC_API_TOKEN, GITHUB_TOKEN or config file)".into(),
                )
            })?;

        let owner = raw
            .owner
            .filter(|o| !o.is_empty())
            .ok_or_else(|| Error::Config("owner is required".into()))?;

        if raw.repositories.is_empty() {
            return Err(Error::Config("repositories must not be empty".into()));
        }
        if let Some(bad) = raw.repositories.iter().find(|r| r.is_empty() || r.contains('/')) {
            return Err(Error::Config(format!("invalid repository name '{bad}'")));
        }
        if raw.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }

        let display_order = if raw.display_order.is_empty() {
            raw.repositories.clone()
        } else {
            if let Some(unknown) = raw
                .display_order
                .iter()
                .find(|name| !raw.repositories.contains(name))
            {
                return Err(Error::Config(format!(
                    "display_order names '{unknown}', which is not in repositories"
                )));
            }
            raw.display_order
        };

        let mut fetch = FetchOptions {
            concurrency: raw.concurrency,
            timeout: (raw.timeout_secs > 0).then(|| Duration::from_secs(raw.timeout_secs)),
            ..FetchOptions::default()
        };
        if let Some(user_agent) = raw.user_agent {
            fetch.user_agent = user_agent;
        }

        Ok(Self {
            api_token,
            owner,
            repositories: raw.repositories,
            output: raw.output,
            display_order,
            preview: raw.preview,
            preview_command: raw.preview_command,
            api_base: raw.api_base,
            fetch,
        })
    }

    pub fn repositories(&self) -> Vec<RepositoryRef> {
        self.refs(&self.repositories)
    }

    pub fn display_order(&self) -> Vec<RepositoryRef> {
        self.refs(&self.display_order)
    }

    /// Every endpoint to request, three per repository.
    pub fn traffic_urls(&self) -> Vec<String> {
        self.repositories()
            .iter()
            .flat_map(|repo| repo.traffic_urls(&self.api_base))
            .collect()
    }

    fn refs(&self, names: &[String]) -> Vec<RepositoryRef> {
        names
            .iter()
            .map(|name| RepositoryRef::new(self.owner.as_str(), name.as_str()))
            .collect()
    }
}
