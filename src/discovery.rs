//! Union of newly discovered repositories into the registry.
//!
//! Discovery never touches an existing record: manually curated tracking
//! data must not regress just because a repository was rediscovered.
use crate::normalize::{is_plausible, normalize, qualify};
use crate::registry::{Registry, TargetPatch};
use crate::status::{ChangeKind, TargetStatus};
use tracing::warn;

/// Whether discovered repositories should be queued for a PR or merely
/// recorded. An explicit caller decision, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// New records enter as `ready-for-pr`.
    QueueForPr,
    /// New records enter as `discovered`; no action intended yet.
    RecordOnly,
}

/// Summary of one discovery merge.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub added: Vec<String>,
    pub preserved: usize,
    pub skipped: Vec<String>,
}

/// Merge a raw discovery list into the registry.
///
/// Idempotent and commutative over repeated or duplicated input lists:
/// the same identifier twice in one call, or the same list merged twice,
/// yields the same end state.
pub fn merge_discoveries(
    registry: &mut Registry,
    raw_identifiers: &[String],
    mode: DiscoveryMode,
    namespace: &str,
) -> DiscoveryOutcome {
    let mut outcome = DiscoveryOutcome::default();

    for raw in raw_identifiers {
        let identifier = qualify(&normalize(raw), namespace);
        if !is_plausible(&identifier) {
            warn!(input = %raw, reduced = %identifier, "identifier did not reduce to owner/name; skipping");
            outcome.skipped.push(raw.clone());
            continue;
        }

        if registry.get(&identifier).is_some() {
            outcome.preserved += 1;
            continue;
        }

        let (status, notes) = match mode {
            DiscoveryMode::QueueForPr => (
                TargetStatus::ReadyForPr,
                "Discovered via dynamic discovery - ready for PR creation",
            ),
            DiscoveryMode::RecordOnly => (
                TargetStatus::Discovered,
                "Newly discovered repository - no action taken yet",
            ),
        };
        registry.upsert(
            &identifier,
            TargetPatch {
                status: Some(status),
                attempts: Some(0),
                last_change_kind: Some(ChangeKind::Discovery),
                notes: Some(notes.to_string()),
                ..TargetPatch::default()
            },
        );
        outcome.added.push(identifier);
    }

    outcome
}
