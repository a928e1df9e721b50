//! `gh`-backed review lookup.
//!
//! Shells out to the GitHub CLI rather than speaking the API directly, so
//! authentication and pagination stay the CLI's problem. The base command
//! is overridable for tests and wrapper scripts, split with shell-words
//! the same way as any other user-supplied command line.
use crate::reconcile::{ArtifactState, ReviewArtifact, ReviewLookup};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::process::Command;

/// Default command used to reach the review system.
pub const DEFAULT_GH_COMMAND: &str = "gh";

/// Review lookup that runs `gh pr list` per repository.
pub struct GhReviewLookup {
    program: String,
    leading_args: Vec<String>,
}

/// One row of `gh pr list --json number,state,isDraft,title`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRow {
    number: u64,
    state: String,
    #[serde(default)]
    is_draft: bool,
    title: String,
}

impl GhReviewLookup {
    /// Build a lookup from a command string such as `gh` or
    /// `ssh bastion gh`.
    pub fn from_command(command: &str) -> Result<Self> {
        let mut words = shell_words::split(command)
            .with_context(|| format!("parse review command {command:?}"))?;
        if words.is_empty() {
            return Err(anyhow!("review command is empty"));
        }
        let program = words.remove(0);
        Ok(GhReviewLookup {
            program,
            leading_args: words,
        })
    }
}

impl ReviewLookup for GhReviewLookup {
    fn list_review_artifacts(&self, identifier: &str) -> Result<Vec<ReviewArtifact>> {
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args([
                "pr",
                "list",
                "--repo",
                identifier,
                "--state",
                "all",
                "--json",
                "number,state,isDraft,title",
            ])
            .output()
            .with_context(|| format!("run {} pr list for {identifier}", self.program))?;

        if !output.status.success() {
            return Err(anyhow!(
                "gh pr list failed for {identifier}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let rows: Vec<PullRow> = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("decode gh pr list json for {identifier}"))?;
        Ok(rows.into_iter().map(row_to_artifact).collect())
    }
}

fn row_to_artifact(row: PullRow) -> ReviewArtifact {
    let merged = row.state.eq_ignore_ascii_case("MERGED");
    let state = if row.state.eq_ignore_ascii_case("OPEN") {
        ArtifactState::Open
    } else {
        ArtifactState::Closed
    };
    ReviewArtifact {
        number: row.number,
        state,
        draft: row.is_draft,
        merged,
        title: row.title,
    }
}
