//! CLI argument parsing for the propagation tracker.
//!
//! The CLI is intentionally thin: each subcommand maps onto one registry
//! operation, so the same core logic can be driven from scripts or tests
//! without going through argument parsing.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default registry snapshot file, shared by every subcommand.
pub const DEFAULT_TARGETS_FILE: &str = "propagation.targets.json";

/// Root CLI entrypoint for the propagation tracker.
#[derive(Parser, Debug)]
#[command(
    name = "ptrack",
    version,
    about = "Propagation target registry for fleet-wide change tracking",
    after_help = "Commands:\n  discover <IDENT>...  Merge discovered repositories into the registry\n  dedupe               Collapse duplicate records for the same repository\n  reconcile            Refresh statuses from existing review artifacts\n  set <IDENT>          Record an out-of-band outcome for one repository\n  report               Write the HTML status report (or emit --json)\n  status               Print a per-target summary with stats\n\nExamples:\n  ptrack discover org/repo-a org/repo-b\n  ptrack discover --no-action --from-file repos.txt\n  ptrack dedupe\n  ptrack reconcile --marker \"App Insights\"\n  ptrack set org/repo-a --status issue-open --number 7 --kind issue\n  ptrack set org/repo-b --status failed --note \"fork permission denied\"\n  ptrack report --json\n  ptrack status",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level registry operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    Discover(DiscoverArgs),
    Dedupe(DedupeArgs),
    Reconcile(ReconcileArgs),
    Set(SetArgs),
    Report(ReportArgs),
    Status(StatusArgs),
}

/// Discover command inputs: a raw identifier list to union in.
#[derive(Parser, Debug)]
#[command(about = "Merge discovered repositories into the registry")]
pub struct DiscoverArgs {
    /// Raw repository identifiers (owner/name, bare name, or URL)
    #[arg(value_name = "IDENT")]
    pub identifiers: Vec<String>,

    /// Read additional identifiers from a file, one per line
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,

    /// Record new repositories without queueing them for a PR
    #[arg(long)]
    pub no_action: bool,

    /// Default organization for identifiers without an owner segment
    #[arg(long, value_name = "ORG")]
    pub namespace: Option<String>,

    /// Upstream change reference recorded in the snapshot header
    #[arg(long, value_name = "REF")]
    pub source_reference: Option<String>,

    /// Registry snapshot file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TARGETS_FILE)]
    pub targets: PathBuf,
}

/// Dedupe command inputs.
#[derive(Parser, Debug)]
#[command(about = "Collapse duplicate records for the same repository")]
pub struct DedupeArgs {
    /// Registry snapshot file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TARGETS_FILE)]
    pub targets: PathBuf,
}

/// Reconcile command inputs.
#[derive(Parser, Debug)]
#[command(about = "Refresh target statuses from existing review artifacts")]
pub struct ReconcileArgs {
    /// Command used to reach the review system (e.g. `gh`)
    #[arg(long, value_name = "CMD")]
    pub gh: Option<String>,

    /// Title marker identifying this propagation effort (repeatable)
    #[arg(long, value_name = "TEXT")]
    pub marker: Vec<String>,

    /// Registry snapshot file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TARGETS_FILE)]
    pub targets: PathBuf,
}

/// Set command inputs: one manual record correction.
#[derive(Parser, Debug)]
#[command(about = "Record an out-of-band outcome for one repository")]
pub struct SetArgs {
    /// Repository identifier (owner/name, bare name, or URL)
    #[arg(value_name = "IDENT")]
    pub identifier: String,

    /// New status (e.g. pr-open, issue-open, merged, failed)
    #[arg(long, value_name = "STATUS")]
    pub status: Option<String>,

    /// Pull request or issue number now tracked for this target
    #[arg(long, value_name = "N", requires = "kind")]
    pub number: Option<u64>,

    /// Whether NUMBER refers to a pull request or an issue
    #[arg(long, value_name = "pr|issue")]
    pub kind: Option<String>,

    /// Annotation replacing the target's current note
    #[arg(long, value_name = "TEXT")]
    pub note: Option<String>,

    /// Default organization for identifiers without an owner segment
    #[arg(long, value_name = "ORG")]
    pub namespace: Option<String>,

    /// Registry snapshot file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TARGETS_FILE)]
    pub targets: PathBuf,
}

/// Report command inputs.
#[derive(Parser, Debug)]
#[command(about = "Aggregate the registry into stats, groups, and a report")]
pub struct ReportArgs {
    /// Output path for the HTML report (defaults next to the snapshot)
    #[arg(long, value_name = "PATH", conflicts_with = "json")]
    pub out: Option<PathBuf>,

    /// Emit the structured stats/groups result as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Registry snapshot file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TARGETS_FILE)]
    pub targets: PathBuf,
}

/// Status command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print a per-target summary with stats")]
pub struct StatusArgs {
    /// Registry snapshot file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TARGETS_FILE)]
    pub targets: PathBuf,
}
