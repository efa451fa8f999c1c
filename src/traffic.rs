//! Traffic payloads and the fold that turns fetch results into a per-repository report.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::github::FetchResult;
use crate::repo::{MetricKind, RepositoryRef};

/// One day of views or clones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DailyCount {
    #[serde(rename = "timestamp", deserialize_with = "day_from_timestamp")]
    pub date: NaiveDate,
    pub count: u64,
    #[serde(rename = "uniques")]
    pub unique_count: u64,
}

/// Totals plus the daily breakdown, as returned by the views and clones endpoints.
///
/// The daily list is keyed `views` or `clones` depending on the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrafficSeries {
    #[serde(rename = "count")]
    pub total_count: u64,
    #[serde(rename = "uniques")]
    pub unique_count: u64,
    #[serde(default, alias = "views", alias = "clones")]
    pub daily: Vec<DailyCount>,
}

pub type ViewsData = TrafficSeries;
pub type ClonesData = TrafficSeries;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PathEntry {
    pub path: String,
    pub count: u64,
    #[serde(rename = "uniques")]
    pub unique_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficRecord {
    pub views: Option<ViewsData>,
    pub clones: Option<ClonesData>,
    pub paths: Option<Vec<PathEntry>>,
}

impl TrafficRecord {
    pub fn is_empty(&self) -> bool {
        self.views.is_none() && self.clones.is_none() && self.paths.is_none()
    }
}

/// Records keyed by repository. Iteration order is owner/name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficReport {
    records: BTreeMap<RepositoryRef, TrafficRecord>,
}

impl TrafficReport {
    pub fn get(&self, repo: &RepositoryRef) -> Option<&TrafficRecord> {
        self.records.get(repo)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RepositoryRef, &TrafficRecord)> {
        self.records.iter()
    }

    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryRef> {
        self.records.keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Store one decoded payload. Zero totals and empty path lists leave the slot unset.
    fn store(
        &mut self,
        repo: RepositoryRef,
        kind: MetricKind,
        url: &str,
        payload: Value,
    ) -> Result<()> {
        match kind {
            MetricKind::Paths => {
                let paths: Vec<PathEntry> = decode(url, payload)?;
                if paths.is_empty() {
                    debug!(%repo, "no popular paths");
                    return Ok(());
                }
                let record = self.records.entry(repo.clone()).or_default();
                fill(&mut record.paths, paths, &repo, kind);
            }
            MetricKind::Views | MetricKind::Clones => {
                let series: TrafficSeries = decode(url, payload)?;
                if series.total_count == 0 {
                    debug!(%repo, %kind, "zero count, metric omitted");
                    return Ok(());
                }
                let record = self.records.entry(repo.clone()).or_default();
                let slot = if kind == MetricKind::Views {
                    &mut record.views
                } else {
                    &mut record.clones
                };
                fill(slot, series, &repo, kind);
            }
        }
        Ok(())
    }
}

impl FromIterator<(RepositoryRef, TrafficRecord)> for TrafficReport {
    fn from_iter<I: IntoIterator<Item = (RepositoryRef, TrafficRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Fold every fetch result into a report.
///
/// Failed fetches and undecodable payloads are logged and skipped, so the
/// outcome does not depend on the order results arrived in.
pub fn aggregate(results: impl IntoIterator<Item = FetchResult>) -> TrafficReport {
    let mut report = TrafficReport::default();

    for FetchResult { url, payload } in results {
        let (repo, kind) = match RepositoryRef::from_url(&url)
            .and_then(|repo| MetricKind::from_url(&url).map(|kind| (repo, kind)))
        {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "skipping result");
                continue;
            }
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) if e.is_recoverable() => {
                warn!(%repo, %kind, error = %e, "fetch failed, metric omitted");
                continue;
            }
            Err(e) => {
                error!(%repo, %kind, error = %e, "unexpected fetch error, metric omitted");
                continue;
            }
        };

        if let Err(e) = report.store(repo.clone(), kind, &url, payload) {
            warn!(%repo, %kind, error = %e, "unusable payload, metric omitted");
        }
    }

    report
}

fn fill<T>(slot: &mut Option<T>, value: T, repo: &RepositoryRef, kind: MetricKind) {
    if slot.is_some() {
        warn!(%repo, %kind, "duplicate result ignored");
    } else {
        *slot = Some(value);
    }
}

fn decode<T: DeserializeOwned>(url: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| Error::MalformedResponse {
        url: url.to_string(),
        message: e.to_string(),
    })
}

// API timestamps look like `2023-01-01T00:00:00Z`; only the day matters.
fn day_from_timestamp<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let day = raw
        .get(..10)
        .ok_or_else(|| D::Error::custom(format!("timestamp too short: {raw}")))?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(D::Error::custom)
}
