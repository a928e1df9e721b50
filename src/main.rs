use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::fs;
use std::path::Path;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod dedupe;
mod discovery;
mod github;
mod normalize;
mod reconcile;
mod registry;
mod report;
mod status;

use cli::{
    Command, DedupeArgs, DiscoverArgs, ReconcileArgs, ReportArgs, RootArgs, SetArgs, StatusArgs,
};
use discovery::DiscoveryMode;
use github::{GhReviewLookup, DEFAULT_GH_COMMAND};
use registry::{Registry, TargetPatch};
use status::{ChangeKind, TargetStatus};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    match args.command {
        Command::Discover(args) => cmd_discover(args),
        Command::Dedupe(args) => cmd_dedupe(args),
        Command::Reconcile(args) => cmd_reconcile(args),
        Command::Set(args) => cmd_set(args),
        Command::Report(args) => cmd_report(args),
        Command::Status(args) => cmd_status(args),
    }
}

fn cmd_discover(args: DiscoverArgs) -> Result<()> {
    let config = config::load_optional(&args.targets)?;
    let settings = config::Settings::resolve(
        config.as_ref(),
        args.namespace.as_deref(),
        args.source_reference.as_deref(),
        &[],
    );

    let mut identifiers = args.identifiers.clone();
    if let Some(path) = &args.from_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read discovery list {}", path.display()))?;
        identifiers.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }
    if identifiers.is_empty() {
        return Err(anyhow!(
            "no identifiers given; pass them as arguments or via --from-file"
        ));
    }

    // Discovery alone recovers from a missing or unreadable snapshot.
    let mut registry = load_or_init(&args.targets, &settings.source_reference);
    let mode = if args.no_action {
        DiscoveryMode::RecordOnly
    } else {
        DiscoveryMode::QueueForPr
    };
    let outcome = discovery::merge_discoveries(&mut registry, &identifiers, mode, &settings.namespace);
    registry.last_discovery = Some(Utc::now());
    registry.discovery_method = Some("discovery list integration".to_string());
    registry.save(&args.targets)?;

    println!(
        "discovery: {} added, {} preserved, {} skipped (total {})",
        outcome.added.len(),
        outcome.preserved,
        outcome.skipped.len(),
        registry.len()
    );
    for identifier in &outcome.added {
        println!("  new: {identifier}");
    }
    for raw in &outcome.skipped {
        println!("  skipped: {raw}");
    }
    Ok(())
}

fn cmd_dedupe(args: DedupeArgs) -> Result<()> {
    let mut registry = Registry::load(&args.targets)?;
    let outcome = dedupe::dedupe_registry(&mut registry);
    registry.last_cleanup = Some(Utc::now());
    registry.save(&args.targets)?;

    println!(
        "dedupe: {} -> {} records, {} duplicates removed",
        outcome.original_count,
        outcome.final_count,
        outcome.removed.len()
    );
    for (identifier, status) in &outcome.removed {
        println!("  removed: {identifier} ({status})");
    }
    Ok(())
}

fn cmd_reconcile(args: ReconcileArgs) -> Result<()> {
    let config = config::load_optional(&args.targets)?;
    let settings = config::Settings::resolve(config.as_ref(), None, None, &args.marker);

    let mut registry = Registry::load(&args.targets)?;
    let lookup =
        GhReviewLookup::from_command(args.gh.as_deref().unwrap_or(DEFAULT_GH_COMMAND))?;
    let outcome = reconcile::reconcile_targets(&mut registry, &lookup, &settings.title_markers);
    registry.save(&args.targets)?;

    println!(
        "reconcile: {} checked, {} updated, {} without artifact, {} failed lookups",
        outcome.checked,
        outcome.updated.len(),
        outcome.unmatched.len(),
        outcome.failed.len()
    );
    for identifier in &outcome.failed {
        println!("  failed: {identifier}");
    }
    Ok(())
}

fn cmd_set(args: SetArgs) -> Result<()> {
    let config = config::load_optional(&args.targets)?;
    let settings =
        config::Settings::resolve(config.as_ref(), args.namespace.as_deref(), None, &[]);

    let status = match args.status.as_deref() {
        Some(raw) => match TargetStatus::from_raw(raw) {
            TargetStatus::Unknown(_) => {
                return Err(anyhow!(
                    "unknown status {raw:?}; expected one of discovered, ready-for-pr, \
                     pr-open, pr-draft, issue-open, merged, pr-closed, failed"
                ));
            }
            known => Some(known),
        },
        None => None,
    };
    let kind = match args.kind.as_deref() {
        Some("pr") => Some(ChangeKind::Pr),
        Some("issue") => Some(ChangeKind::Issue),
        Some(other) => {
            return Err(anyhow!("unknown artifact kind {other:?}; expected pr or issue"));
        }
        None => None,
    };

    let mut registry = Registry::load(&args.targets)?;
    let identifier = normalize::qualify(&normalize::normalize(&args.identifier), &settings.namespace);
    let Some(existing) = registry.get(&identifier) else {
        return Err(anyhow!(
            "{identifier} is not tracked; run `ptrack discover {identifier}` first"
        ));
    };
    let old_status = existing.status.clone();
    let new_status = status.clone().unwrap_or_else(|| old_status.clone());

    let last_change_url = match (args.number, kind) {
        (Some(number), Some(ChangeKind::Pr)) => {
            Some(format!("{}/pull/{}", normalize::url_for(&identifier), number))
        }
        (Some(number), Some(ChangeKind::Issue)) => {
            Some(format!("{}/issues/{}", normalize::url_for(&identifier), number))
        }
        _ => None,
    };
    registry.upsert(
        &identifier,
        TargetPatch {
            status,
            review_number: args.number,
            last_change_url,
            last_change_kind: kind,
            notes: args.note,
            ..TargetPatch::default()
        },
    );
    registry.save(&args.targets)?;

    println!("set {identifier}: {old_status} -> {new_status}");
    Ok(())
}

fn cmd_report(args: ReportArgs) -> Result<()> {
    let registry = Registry::load(&args.targets)?;
    let snapshot = registry.to_snapshot(Utc::now());
    let report = report::aggregate(&snapshot.targets);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let out = args
        .out
        .unwrap_or_else(|| args.targets.with_file_name("propagation-status-report.html"));
    let html = report::render_html(&snapshot, &report);
    fs::write(&out, html).with_context(|| format!("write report {}", out.display()))?;
    println!("wrote report to {}", out.display());
    println!("processed {} repositories", snapshot.total_repositories);
    Ok(())
}

fn cmd_status(args: StatusArgs) -> Result<()> {
    let registry = Registry::load(&args.targets)?;
    let targets: Vec<registry::Target> = registry.all().cloned().collect();
    let stats = report::aggregate(&targets).stats;

    for target in &targets {
        let reference = match (target.review_number, target.last_change_kind) {
            (Some(number), Some(kind)) => format!("{kind} #{number}"),
            (Some(number), None) => format!("#{number}"),
            _ => "-".to_string(),
        };
        let status = target.status.as_str();
        println!(
            "{:<55} {status:<13} {reference:>10}  {}",
            target.identifier, target.notes
        );
    }
    if !registry.is_empty() {
        println!();
    }
    println!(
        "{} targets: {} merged, {} open, {} ready-for-pr, {} discovered, {} failed ({}% complete)",
        stats.total,
        stats.merged,
        stats.open,
        stats.ready_for_pr,
        stats.discovered,
        stats.failed,
        stats.completion_rate
    );
    Ok(())
}

/// Fresh-registry recovery for discovery; everything else treats a bad
/// snapshot as fatal.
fn load_or_init(path: &Path, source_reference: &str) -> Registry {
    if !path.exists() {
        eprintln!(
            "note: {} not found, starting a fresh registry",
            path.display()
        );
        return Registry::new(source_reference);
    }
    match Registry::load(path) {
        Ok(registry) => registry,
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "snapshot unreadable; reinitializing");
            eprintln!(
                "warning: could not read {}, starting a fresh registry ({err:#})",
                path.display()
            );
            Registry::new(source_reference)
        }
    }
}
