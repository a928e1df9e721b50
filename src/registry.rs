//! Persistent registry of propagation targets.
//!
//! The registry is the single shared mutable resource across invocations:
//! whole-snapshot read at startup, whole-snapshot write after a batch, with
//! exclusive ownership assumed in between. The in-memory form is keyed by
//! the raw identifier so the deduplicator can still observe duplicate
//! spellings; snapshot order is the sorted key order.
use crate::normalize::url_for;
use crate::status::{ChangeKind, TargetStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One downstream repository's propagation state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Target {
    pub identifier: String,
    pub url: String,
    pub status: TargetStatus,
    /// Number of the tracked pull request or issue; `last_change_kind`
    /// says which of the two it is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_kind: Option<ChangeKind>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub notes: String,
}

impl Target {
    pub fn has_pr_number(&self) -> bool {
        self.review_number.is_some() && self.last_change_kind == Some(ChangeKind::Pr)
    }

    pub fn has_issue_number(&self) -> bool {
        self.review_number.is_some() && self.last_change_kind == Some(ChangeKind::Issue)
    }
}

/// Fields to merge into a record on upsert; `None` leaves the existing
/// value untouched, so a patch can never clear a field it does not name.
#[derive(Debug, Clone, Default)]
pub struct TargetPatch {
    pub status: Option<TargetStatus>,
    pub review_number: Option<u64>,
    pub last_change_url: Option<String>,
    pub last_change_kind: Option<ChangeKind>,
    pub attempts: Option<u32>,
    pub notes: Option<String>,
}

/// Persisted whole-file snapshot of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegistrySnapshot {
    pub generated: DateTime<Utc>,
    pub source_reference: String,
    pub total_repositories: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_discovery: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cleanup: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_method: Option<String>,
    pub targets: Vec<Target>,
}

/// In-memory registry owned by the invoking command.
#[derive(Debug, Clone)]
pub struct Registry {
    targets: BTreeMap<String, Target>,
    pub source_reference: String,
    pub last_discovery: Option<DateTime<Utc>>,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub discovery_method: Option<String>,
}

impl Registry {
    pub fn new(source_reference: &str) -> Self {
        Registry {
            targets: BTreeMap::new(),
            source_reference: source_reference.to_string(),
            last_discovery: None,
            last_cleanup: None,
            discovery_method: None,
        }
    }

    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let mut targets = BTreeMap::new();
        for target in snapshot.targets {
            targets.insert(target.identifier.clone(), target);
        }
        Registry {
            targets,
            source_reference: snapshot.source_reference,
            last_discovery: snapshot.last_discovery,
            last_cleanup: snapshot.last_cleanup,
            discovery_method: snapshot.discovery_method,
        }
    }

    /// Read a snapshot from disk. Callers decide whether a failure is
    /// fatal; discovery recovers with a fresh registry instead.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read registry snapshot {}", path.display()))?;
        let snapshot: RegistrySnapshot = serde_json::from_str(&content)
            .with_context(|| format!("parse registry snapshot {}", path.display()))?;
        Ok(Registry::from_snapshot(snapshot))
    }

    /// Write the whole snapshot back, pretty-printed, stamping `generated`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.to_snapshot(Utc::now());
        let json = serde_json::to_string_pretty(&snapshot)
            .context("serialize registry snapshot")?;
        fs::write(path, json)
            .with_context(|| format!("write registry snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn to_snapshot(&self, generated: DateTime<Utc>) -> RegistrySnapshot {
        RegistrySnapshot {
            generated,
            source_reference: self.source_reference.clone(),
            total_repositories: self.targets.len(),
            last_discovery: self.last_discovery,
            last_cleanup: self.last_cleanup,
            discovery_method: self.discovery_method.clone(),
            targets: self.targets.values().cloned().collect(),
        }
    }

    /// Create the record if absent, else merge the provided fields into it.
    pub fn upsert(&mut self, identifier: &str, patch: TargetPatch) {
        match self.targets.get_mut(identifier) {
            Some(target) => {
                if let Some(status) = patch.status {
                    target.status = status;
                }
                if let Some(number) = patch.review_number {
                    target.review_number = Some(number);
                }
                if let Some(url) = patch.last_change_url {
                    target.last_change_url = Some(url);
                }
                if let Some(kind) = patch.last_change_kind {
                    target.last_change_kind = Some(kind);
                }
                if let Some(attempts) = patch.attempts {
                    target.attempts = attempts;
                }
                if let Some(notes) = patch.notes {
                    target.notes = notes;
                }
            }
            None => {
                let target = Target {
                    identifier: identifier.to_string(),
                    url: url_for(identifier),
                    status: patch.status.unwrap_or(TargetStatus::Discovered),
                    review_number: patch.review_number,
                    last_change_url: patch.last_change_url,
                    last_change_kind: patch.last_change_kind,
                    attempts: patch.attempts.unwrap_or(0),
                    notes: patch.notes.unwrap_or_default(),
                };
                self.targets.insert(identifier.to_string(), target);
            }
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&Target> {
        self.targets.get(identifier)
    }

    /// Deterministic snapshot order: sorted by identifier.
    pub fn all(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Used only by the deduplicator.
    pub fn remove(&mut self, identifier: &str) -> Option<Target> {
        self.targets.remove(identifier)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch_with_status(status: TargetStatus) -> TargetPatch {
        TargetPatch {
            status: Some(status),
            ..TargetPatch::default()
        }
    }

    #[test]
    fn upsert_creates_with_derived_url_and_defaults() {
        let mut registry = Registry::new("pr-18");
        registry.upsert("org/x", patch_with_status(TargetStatus::ReadyForPr));

        let target = registry.get("org/x").unwrap();
        assert_eq!(target.url, "https://github.com/org/x");
        assert_eq!(target.status, TargetStatus::ReadyForPr);
        assert_eq!(target.attempts, 0);
        assert_eq!(target.review_number, None);
    }

    #[test]
    fn upsert_merge_never_clears_unmentioned_fields() {
        let mut registry = Registry::new("pr-18");
        registry.upsert(
            "org/x",
            TargetPatch {
                status: Some(TargetStatus::PrOpen),
                review_number: Some(5),
                last_change_kind: Some(ChangeKind::Pr),
                notes: Some("PR already exists".to_string()),
                ..TargetPatch::default()
            },
        );
        registry.upsert("org/x", patch_with_status(TargetStatus::Merged));

        let target = registry.get("org/x").unwrap();
        assert_eq!(target.status, TargetStatus::Merged);
        assert_eq!(target.review_number, Some(5));
        assert_eq!(target.last_change_kind, Some(ChangeKind::Pr));
        assert_eq!(target.notes, "PR already exists");
    }

    #[test]
    fn all_iterates_sorted_by_identifier() {
        let mut registry = Registry::new("pr-18");
        for identifier in ["org/zed", "org/alpha", "org/mid"] {
            registry.upsert(identifier, patch_with_status(TargetStatus::Discovered));
        }
        let order: Vec<&str> = registry.all().map(|t| t.identifier.as_str()).collect();
        assert_eq!(order, vec!["org/alpha", "org/mid", "org/zed"]);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut registry = Registry::new("pr-18");
        registry.upsert(
            "org/x",
            TargetPatch {
                status: Some(TargetStatus::IssueOpen),
                review_number: Some(7),
                last_change_kind: Some(ChangeKind::Issue),
                last_change_url: Some("https://github.com/org/x/issues/7".to_string()),
                notes: Some("GitHub issue created for propagation tracking".to_string()),
                ..TargetPatch::default()
            },
        );
        registry.upsert(
            "org/weird",
            patch_with_status(TargetStatus::Unknown("on-hold".to_string())),
        );

        let snapshot = registry.to_snapshot(Utc::now());
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        assert!(json.contains("\"reviewNumber\": 7"));
        assert!(json.contains("\"issue-open\""));
        assert!(json.contains("\"on-hold\""));

        let parsed: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.total_repositories, 2);
        assert_eq!(parsed.targets, snapshot.targets);
    }

    #[test]
    fn load_reports_unparseable_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("propagation.targets.json");
        fs::write(&path, "{ not json").unwrap();
        let err = Registry::load(&path).unwrap_err();
        assert!(err.to_string().contains("parse registry snapshot"));
    }
}
