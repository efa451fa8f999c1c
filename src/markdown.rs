//! Markdown rendering of a [`TrafficReport`].
//!
//! The byte layout (including the missing space before the unique column in
//! daily rows) is what existing `traffic.md` consumers expect.

use std::collections::HashSet;
use std::fmt::Write;

use crate::repo::RepositoryRef;
use crate::traffic::{PathEntry, TrafficRecord, TrafficReport, TrafficSeries};

const LINE_BREAK: &str = "<br/>";
const TABLE_HEADER: &str = "| Day | all | unique |\n| --- | :---: | :---: |\n";

/// Render every repository in `order`, or in report order when `order` is empty.
///
/// A repository listed more than once keeps its first position. Repositories
/// without any populated metric produce no output at all.
pub fn render(report: &TrafficReport, order: &[RepositoryRef]) -> String {
    let mut out = String::new();

    if order.is_empty() {
        for (repo, record) in report.iter() {
            render_repository(&mut out, repo, record);
        }
    } else {
        let mut seen = HashSet::new();
        for repo in order.iter().filter(|repo| seen.insert(*repo)) {
            if let Some(record) = report.get(repo) {
                render_repository(&mut out, repo, record);
            }
        }
    }

    out
}

fn render_repository(out: &mut String, repo: &RepositoryRef, record: &TrafficRecord) {
    if record.is_empty() {
        return;
    }
    let _ = writeln!(out, "# {} {LINE_BREAK}", repo.name);

    if let Some(views) = &record.views {
        out.push_str(&series_block("views", views));
    }
    if let Some(paths) = &record.paths {
        out.push_str(&paths_block(paths));
    }
    if let Some(clones) = &record.clones {
        out.push_str(&series_block("clones", clones));
    }
}

/// Bold label, daily table and totals row, followed by a blank line.
pub fn series_block(label: &str, series: &TrafficSeries) -> String {
    let mut out = format!("**{label}** {LINE_BREAK}\n{TABLE_HEADER}");
    for day in &series.daily {
        let _ = writeln!(
            out,
            "| `{}` | {} |{} |",
            day.date.format("%Y-%m-%d"),
            day.count,
            day.unique_count
        );
    }
    let _ = writeln!(
        out,
        "| `total` | {} | {} |",
        series.total_count, series.unique_count
    );
    out.push('\n');
    out
}

pub fn paths_block(paths: &[PathEntry]) -> String {
    let mut out = format!("**paths** {LINE_BREAK}\n");
    for p in paths {
        let _ = writeln!(
            out,
            "`github.com{}`: all = {}, unique = {}{LINE_BREAK}",
            p.path, p.count, p.unique_count
        );
    }
    out
}
