//! Fetch GitHub traffic statistics for a set of repositories and render them as markdown.

pub mod config;
pub mod error;
pub mod github;
pub mod markdown;
pub mod repo;
pub mod report;
pub mod traffic;

use tracing::info;

pub use config::{Config, Overrides};
pub use error::{Error, Result};
pub use github::{FetchOptions, FetchResult, TrafficClient};
pub use markdown::render;
pub use repo::{MetricKind, RepositoryRef};
pub use report::{PreviewOutcome, preview, write_report};
pub use traffic::{TrafficRecord, TrafficReport, aggregate};

/// Request every configured endpoint and fold the answers into a report.
///
/// Individual request failures only leave gaps in the report.
pub async fn collect_report(config: &Config) -> Result<TrafficReport> {
    let client = TrafficClient::new(&config.api_token, &config.fetch)?;
    let results = client.fetch_all(&config.traffic_urls()).await;
    let failed = results.iter().filter(|r| !r.is_ok()).count();

    let report = aggregate(results);
    info!(
        repositories = report.len(),
        failed_requests = failed,
        "traffic collected"
    );
    Ok(report)
}

/// Collect and render in the configured display order.
pub async fn generate(config: &Config) -> Result<String> {
    let report = collect_report(config).await?;
    Ok(render(&report, &config.display_order()))
}
