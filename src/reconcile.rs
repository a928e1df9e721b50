//! Status reconciliation against external review artifacts.
//!
//! One blocking query per eligible target, in snapshot order. A failed
//! query is recorded on that target alone and the batch moves on; a
//! single bad repository must never corrupt or abort the rest.
use crate::normalize::url_for;
use crate::registry::{Registry, TargetPatch};
use crate::status::{ChangeKind, TargetStatus};
use anyhow::Result;
use tracing::{info, warn};

/// Open/closed indicator reported by the review system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    Open,
    Closed,
}

/// Summary of one existing review artifact, as returned by the external
/// review-query collaborator.
#[derive(Debug, Clone)]
pub struct ReviewArtifact {
    pub number: u64,
    pub state: ArtifactState,
    pub draft: bool,
    pub merged: bool,
    pub title: String,
}

/// External review-query collaborator: list existing review artifacts for
/// one repository, or fail for that repository alone.
pub trait ReviewLookup {
    fn list_review_artifacts(&self, identifier: &str) -> Result<Vec<ReviewArtifact>>;
}

/// Summary of one reconciliation batch.
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub checked: usize,
    pub updated: Vec<String>,
    pub unmatched: Vec<String>,
    /// Targets whose lookup failed; reported at end of batch so nobody
    /// mistakes them for resolved.
    pub failed: Vec<String>,
}

/// Scan artifact titles for the propagation markers; the first match in
/// the order the external system returned wins.
///
/// Title matching is a documented heuristic kept behind this one function
/// so a structured query can replace it without touching the state merge.
pub fn match_artifact<'a>(
    artifacts: &'a [ReviewArtifact],
    markers: &[String],
) -> Option<&'a ReviewArtifact> {
    artifacts
        .iter()
        .find(|artifact| markers.iter().any(|marker| artifact.title.contains(marker.as_str())))
}

/// Canonical status for a matched artifact, in flag-priority order.
pub fn derived_status(artifact: &ReviewArtifact) -> TargetStatus {
    if artifact.merged {
        TargetStatus::Merged
    } else if artifact.draft {
        TargetStatus::PrDraft
    } else if artifact.state == ArtifactState::Open {
        TargetStatus::PrOpen
    } else {
        TargetStatus::PrClosed
    }
}

/// Reconcile every eligible target against the review system.
pub fn reconcile_targets(
    registry: &mut Registry,
    lookup: &dyn ReviewLookup,
    markers: &[String],
) -> ReconcileOutcome {
    let eligible: Vec<(String, u32)> = registry
        .all()
        .filter(|target| !target.status.is_terminal() && target.status.awaits_review())
        .map(|target| (target.identifier.clone(), target.attempts))
        .collect();

    let mut outcome = ReconcileOutcome {
        checked: eligible.len(),
        ..ReconcileOutcome::default()
    };

    for (identifier, attempts) in eligible {
        match lookup.list_review_artifacts(&identifier) {
            Ok(artifacts) => match match_artifact(&artifacts, markers) {
                Some(artifact) => {
                    apply_artifact(registry, &identifier, attempts, artifact);
                    outcome.updated.push(identifier);
                }
                None => {
                    registry.upsert(
                        &identifier,
                        TargetPatch {
                            attempts: Some(attempts + 1),
                            notes: Some("no existing artifact found".to_string()),
                            ..TargetPatch::default()
                        },
                    );
                    outcome.unmatched.push(identifier);
                }
            },
            Err(err) => {
                warn!(repo = %identifier, error = %format!("{err:#}"), "review lookup failed");
                registry.upsert(
                    &identifier,
                    TargetPatch {
                        notes: Some(format!("review lookup failed: {err:#}")),
                        ..TargetPatch::default()
                    },
                );
                outcome.failed.push(identifier);
            }
        }
    }

    outcome
}

/// Write every derived field as one record update.
fn apply_artifact(registry: &mut Registry, identifier: &str, attempts: u32, artifact: &ReviewArtifact) {
    // Eligible identifiers come straight from the registry snapshot.
    let Some(existing) = registry.get(identifier) else {
        return;
    };
    let old_status = existing.status.clone();
    let new_status = derived_status(artifact);
    info!(repo = %identifier, from = %old_status, to = %new_status, number = artifact.number, "status reconciled");

    registry.upsert(
        identifier,
        TargetPatch {
            status: Some(new_status.clone()),
            review_number: Some(artifact.number),
            last_change_url: Some(format!("{}/pull/{}", url_for(identifier), artifact.number)),
            last_change_kind: Some(ChangeKind::Pr),
            attempts: Some(attempts + 1),
            notes: Some(format!("Status updated from {old_status} to {new_status}")),
        },
    );
}
