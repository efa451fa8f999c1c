//! Repository identifiers and the traffic endpoint URLs derived from them.

use std::fmt;

use reqwest::Url;

use crate::error::{Error, Result};

pub const GITHUB_API: &str = "https://api.github.com";

/// Owner + name pair identifying one remote repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Views,
    Clones,
    Paths,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Views, MetricKind::Paths, MetricKind::Clones];

    /// Path below `.../traffic/` for this metric.
    pub fn suffix(self) -> &'static str {
        match self {
            MetricKind::Views => "views",
            MetricKind::Clones => "clones",
            MetricKind::Paths => "popular/paths",
        }
    }

    /// Recover the metric from the segments following `traffic` in a URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let segments = path_segments(url)?;
        let at = traffic_index(&segments).ok_or_else(|| malformed(url))?;
        let rest: Vec<&str> = segments[at + 1..].iter().map(String::as_str).collect();
        match rest.as_slice() {
            ["views"] => Ok(MetricKind::Views),
            ["clones"] => Ok(MetricKind::Clones),
            ["popular", "paths"] => Ok(MetricKind::Paths),
            _ => Err(malformed(url)),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetricKind::Views => "views",
            MetricKind::Clones => "clones",
            MetricKind::Paths => "paths",
        })
    }
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Endpoint for `kind` under an arbitrary API root (GitHub Enterprise, mock servers).
    pub fn metric_url(&self, api_base: &str, kind: MetricKind) -> String {
        format!(
            "{}/repos/{}/{}/traffic/{}",
            api_base.trim_end_matches('/'),
            self.owner,
            self.name,
            kind.suffix()
        )
    }

    pub fn views_url(&self) -> String {
        self.metric_url(GITHUB_API, MetricKind::Views)
    }

    pub fn clones_url(&self) -> String {
        self.metric_url(GITHUB_API, MetricKind::Clones)
    }

    pub fn paths_url(&self) -> String {
        self.metric_url(GITHUB_API, MetricKind::Paths)
    }

    /// All three metric URLs for this repository, in views/paths/clones order.
    pub fn traffic_urls(&self, api_base: &str) -> Vec<String> {
        MetricKind::ALL
            .iter()
            .map(|&kind| self.metric_url(api_base, kind))
            .collect()
    }

    /// Inverse of the URL builders: the two segments right before `traffic`.
    pub fn from_url(url: &str) -> Result<Self> {
        let segments = path_segments(url)?;
        match traffic_index(&segments) {
            Some(at) if at >= 2 => Ok(Self::new(
                segments[at - 2].as_str(),
                segments[at - 1].as_str(),
            )),
            _ => Err(malformed(url)),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn path_segments(url: &str) -> Result<Vec<String>> {
    let parsed = Url::parse(url).map_err(|_| malformed(url))?;
    let segments = parsed
        .path_segments()
        .ok_or_else(|| malformed(url))?
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    Ok(segments)
}

// Last occurrence, so a repository literally named `traffic` still resolves.
fn traffic_index(segments: &[String]) -> Option<usize> {
    segments.iter().rposition(|s| s == "traffic")
}

fn malformed(url: &str) -> Error {
    Error::MalformedUrl {
        url: url.to_string(),
    }
}
