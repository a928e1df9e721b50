//! Read-only aggregation and rendering of a registry snapshot.
//!
//! Aggregation is a pure function of the snapshot; the HTML view is one
//! rendering of its output and carries no state of its own.
use crate::registry::{RegistrySnapshot, Target};
use crate::status::TargetStatus;
use serde::Serialize;

/// Ordered keyword rules deciding the presentation bucket; first match
/// wins, case-insensitively, against the identifier.
const GROUP_RULES: &[(&str, &str)] = &[
    ("dotnet", ".NET Templates"),
    ("javascript", "JavaScript/TypeScript Templates"),
    ("typescript", "JavaScript/TypeScript Templates"),
    ("python", "Python Templates"),
    ("powershell", "PowerShell Templates"),
    ("java", "Java Templates"),
];

const CATCH_ALL_GROUP: &str = "Sample Applications";

/// Per-status counts plus the derived completion rate.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total: usize,
    pub merged: usize,
    /// Open PRs and issues combined, for display.
    pub open: usize,
    pub pr_open: usize,
    pub pr_draft: usize,
    pub issue_open: usize,
    pub ready_for_pr: usize,
    pub discovered: usize,
    pub pr_closed: usize,
    pub failed: usize,
    pub unknown: usize,
    pub completion_rate: u32,
}

/// One presentation bucket and the targets that fell into it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroup {
    pub name: String,
    pub targets: Vec<Target>,
}

/// Structured aggregation result, independent of any rendering.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub stats: ReportStats,
    pub groups: Vec<ReportGroup>,
}

/// Aggregate a snapshot's targets into stats and fixed named buckets.
pub fn aggregate(targets: &[Target]) -> Report {
    Report {
        stats: calculate_stats(targets),
        groups: group_targets(targets),
    }
}

fn calculate_stats(targets: &[Target]) -> ReportStats {
    let mut stats = ReportStats {
        total: targets.len(),
        merged: 0,
        open: 0,
        pr_open: 0,
        pr_draft: 0,
        issue_open: 0,
        ready_for_pr: 0,
        discovered: 0,
        pr_closed: 0,
        failed: 0,
        unknown: 0,
        completion_rate: 0,
    };
    for target in targets {
        match &target.status {
            TargetStatus::Merged => stats.merged += 1,
            TargetStatus::PrOpen => stats.pr_open += 1,
            TargetStatus::PrDraft => stats.pr_draft += 1,
            TargetStatus::IssueOpen => stats.issue_open += 1,
            TargetStatus::ReadyForPr => stats.ready_for_pr += 1,
            TargetStatus::Discovered => stats.discovered += 1,
            TargetStatus::PrClosed => stats.pr_closed += 1,
            TargetStatus::Failed => stats.failed += 1,
            TargetStatus::Unknown(_) => stats.unknown += 1,
        }
    }
    stats.open = stats.pr_open + stats.issue_open;
    stats.completion_rate = completion_rate(stats.merged, stats.total);
    stats
}

/// Percentage of merged targets, defined as 0 for an empty registry.
fn completion_rate(merged: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((merged as f64 / total as f64) * 100.0).round() as u32
}

fn group_targets(targets: &[Target]) -> Vec<ReportGroup> {
    let mut names: Vec<&str> = Vec::new();
    for &(_, bucket) in GROUP_RULES {
        if !names.contains(&bucket) {
            names.push(bucket);
        }
    }
    names.push(CATCH_ALL_GROUP);

    let mut groups: Vec<ReportGroup> = names
        .iter()
        .map(|name| ReportGroup {
            name: name.to_string(),
            targets: Vec::new(),
        })
        .collect();

    for target in targets {
        let bucket = bucket_for(&target.identifier);
        if let Some(group) = groups.iter_mut().find(|g| g.name == bucket) {
            group.targets.push(target.clone());
        }
    }
    groups
}

fn bucket_for(identifier: &str) -> &'static str {
    let lowered = identifier.to_lowercase();
    for &(keyword, bucket) in GROUP_RULES {
        if lowered.contains(keyword) {
            return bucket;
        }
    }
    CATCH_ALL_GROUP
}

/// CSS class for a status badge; unrecognized statuses share one
/// presentation class without being coerced in the data.
fn badge_class(status: &TargetStatus) -> &'static str {
    match status {
        TargetStatus::Discovered => "discovered",
        TargetStatus::ReadyForPr => "ready-for-pr",
        TargetStatus::PrOpen => "pr-open",
        TargetStatus::PrDraft => "pr-draft",
        TargetStatus::IssueOpen => "issue-open",
        TargetStatus::Merged => "merged",
        TargetStatus::PrClosed => "pr-closed",
        TargetStatus::Failed => "failed",
        TargetStatus::Unknown(_) => "unknown",
    }
}

const REPORT_CSS: &str = "\
body { font-family: sans-serif; margin: 2em auto; max-width: 60em; color: #1c1c28; }\n\
h1 { margin-bottom: 0; }\n\
.timestamp { color: #666; }\n\
.stats-grid { display: flex; gap: 1em; margin: 1em 0; }\n\
.stat-card { border: 1px solid #ddd; border-radius: 6px; padding: 1em 2em; text-align: center; }\n\
.stat-number { font-size: 2em; font-weight: bold; }\n\
.progress-bar { background: #eee; border-radius: 6px; height: 1.2em; overflow: hidden; }\n\
.progress-fill { background: #2da44e; height: 100%; }\n\
table { border-collapse: collapse; width: 100%; margin: 1em 0; }\n\
th, td { border-bottom: 1px solid #ddd; padding: 0.4em 0.6em; text-align: left; }\n\
.badge { border-radius: 1em; padding: 0.1em 0.7em; font-size: 0.85em; color: #fff; background: #6e7781; }\n\
.badge.merged { background: #8250df; }\n\
.badge.pr-open { background: #2da44e; }\n\
.badge.pr-draft { background: #6e7781; }\n\
.badge.issue-open { background: #bf8700; }\n\
.badge.ready-for-pr { background: #0969da; }\n\
.badge.discovered { background: #57606a; }\n\
.badge.pr-closed { background: #cf222e; }\n\
.badge.failed { background: #cf222e; }\n\
.badge.unknown { background: #24292f; }\n";

/// Render the HTML status report for a snapshot and its aggregation.
pub fn render_html(snapshot: &RegistrySnapshot, report: &Report) -> String {
    let mut out = String::new();
    push_line(&mut out, "<!DOCTYPE html>");
    push_line(&mut out, "<html lang=\"en\">");
    push_line(&mut out, "<head>");
    push_line(&mut out, "<meta charset=\"UTF-8\">");
    push_line(&mut out, "<title>Propagation Status Report</title>");
    push_line(&mut out, "<style>");
    out.push_str(REPORT_CSS);
    push_line(&mut out, "</style>");
    push_line(&mut out, "</head>");
    push_line(&mut out, "<body>");
    push_line(&mut out, "<h1>Propagation Status Report</h1>");
    push_line(
        &mut out,
        &format!(
            "<p class=\"timestamp\">Generated: {} | Source: {}</p>",
            escape(&snapshot.generated.to_rfc3339()),
            escape(&snapshot.source_reference)
        ),
    );

    render_stats(&mut out, &report.stats);

    push_line(&mut out, "<h2>Overall Progress</h2>");
    push_line(&mut out, "<div class=\"progress-bar\">");
    push_line(
        &mut out,
        &format!(
            "<div class=\"progress-fill\" style=\"width: {}%\"></div>",
            report.stats.completion_rate
        ),
    );
    push_line(&mut out, "</div>");
    push_line(
        &mut out,
        &format!(
            "<p>{} of {} repositories updated</p>",
            report.stats.merged, report.stats.total
        ),
    );

    for group in report.groups.iter().filter(|g| !g.targets.is_empty()) {
        render_group(&mut out, group);
    }

    push_line(&mut out, "</body>");
    push_line(&mut out, "</html>");
    out
}

fn render_stats(out: &mut String, stats: &ReportStats) {
    push_line(out, "<h2>Summary</h2>");
    push_line(out, "<div class=\"stats-grid\">");
    for (number, label) in [
        (stats.total, "Total Repositories"),
        (stats.open, "Open PRs/Issues"),
        (stats.merged, "Merged"),
        (stats.completion_rate as usize, "% Complete"),
    ] {
        push_line(out, "<div class=\"stat-card\">");
        push_line(out, &format!("<div class=\"stat-number\">{number}</div>"));
        push_line(out, &format!("<div class=\"stat-label\">{label}</div>"));
        push_line(out, "</div>");
    }
    push_line(out, "</div>");
}

fn render_group(out: &mut String, group: &ReportGroup) {
    push_line(out, &format!("<h2>{}</h2>", escape(&group.name)));
    push_line(out, "<table>");
    push_line(
        out,
        "<thead><tr><th>Repository</th><th>Status</th><th>Ref</th><th>Notes</th></tr></thead>",
    );
    push_line(out, "<tbody>");
    for target in &group.targets {
        let link = match (target.review_number, &target.last_change_url) {
            (Some(number), Some(url)) => format!(
                "<a href=\"{}\">#{}</a>",
                escape(url),
                number
            ),
            (Some(number), None) => format!("#{number}"),
            _ => "N/A".to_string(),
        };
        push_line(
            out,
            &format!(
                "<tr><td><a href=\"{}\">{}</a></td><td><span class=\"badge {}\">{}</span></td><td>{}</td><td>{}</td></tr>",
                escape(&target.url),
                escape(&target.identifier),
                badge_class(&target.status),
                escape(target.status.as_str()),
                link,
                escape(&target.notes)
            ),
        );
    }
    push_line(out, "</tbody>");
    push_line(out, "</table>");
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Registry, TargetPatch};
    use chrono::Utc;

    fn targets_with_statuses(pairs: &[(&str, TargetStatus)]) -> Vec<Target> {
        let mut registry = Registry::new("pr-18");
        for (identifier, status) in pairs {
            registry.upsert(
                identifier,
                TargetPatch {
                    status: Some(status.clone()),
                    ..TargetPatch::default()
                },
            );
        }
        registry.all().cloned().collect()
    }

    #[test]
    fn one_merged_of_four_is_twenty_five_percent() {
        let targets = targets_with_statuses(&[
            ("org/a", TargetStatus::Merged),
            ("org/b", TargetStatus::ReadyForPr),
            ("org/c", TargetStatus::PrOpen),
            ("org/d", TargetStatus::IssueOpen),
        ]);
        let report = aggregate(&targets);
        assert_eq!(report.stats.completion_rate, 25);
        assert_eq!(report.stats.open, 2);
    }

    #[test]
    fn empty_registry_has_zero_completion_rate() {
        let report = aggregate(&[]);
        assert_eq!(report.stats.total, 0);
        assert_eq!(report.stats.completion_rate, 0);
    }

    #[test]
    fn stats_count_every_status_including_unknown() {
        let targets = targets_with_statuses(&[
            ("org/a", TargetStatus::Failed),
            ("org/b", TargetStatus::PrDraft),
            ("org/c", TargetStatus::PrClosed),
            ("org/d", TargetStatus::Unknown("on-hold".to_string())),
        ]);
        let stats = aggregate(&targets).stats;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pr_draft, 1);
        assert_eq!(stats.pr_closed, 1);
        assert_eq!(stats.unknown, 1);
    }

    #[test]
    fn first_matching_keyword_rule_decides_the_bucket() {
        assert_eq!(bucket_for("org/functions-dotnet-azd"), ".NET Templates");
        assert_eq!(
            bucket_for("org/Functions-TypeScript-azd"),
            "JavaScript/TypeScript Templates"
        );
        assert_eq!(
            bucket_for("org/functions-javascript-azd"),
            "JavaScript/TypeScript Templates"
        );
        assert_eq!(bucket_for("org/functions-java-azd"), "Java Templates");
        assert_eq!(bucket_for("org/some-sample"), "Sample Applications");
    }

    #[test]
    fn groups_partition_all_targets() {
        let targets = targets_with_statuses(&[
            ("org/app-dotnet", TargetStatus::Merged),
            ("org/app-python", TargetStatus::PrOpen),
            ("org/misc", TargetStatus::Discovered),
        ]);
        let report = aggregate(&targets);
        let placed: usize = report.groups.iter().map(|g| g.targets.len()).sum();
        assert_eq!(placed, 3);
        let python = report
            .groups
            .iter()
            .find(|g| g.name == "Python Templates")
            .unwrap();
        assert_eq!(python.targets.len(), 1);
    }

    #[test]
    fn html_report_carries_badges_and_progress() {
        let targets = targets_with_statuses(&[
            ("org/app-dotnet", TargetStatus::Merged),
            ("org/app-python", TargetStatus::ReadyForPr),
        ]);
        let report = aggregate(&targets);
        let mut registry = Registry::new("pr-18");
        for target in &targets {
            registry.upsert(
                &target.identifier,
                TargetPatch {
                    status: Some(target.status.clone()),
                    ..TargetPatch::default()
                },
            );
        }
        let html = render_html(&registry.to_snapshot(Utc::now()), &report);
        assert!(html.contains("class=\"badge merged\""));
        assert!(html.contains("width: 50%"));
        assert!(html.contains("org/app-python"));
    }
}
