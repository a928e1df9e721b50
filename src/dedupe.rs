//! Duplicate collapse for registries holding several spellings of one repo.
//!
//! Earlier merges left the same repository recorded under a bare name, a
//! full URL, and worse. Each group of records sharing a normalized
//! identifier is folded to a single winner; the winner's identifier and
//! URL are rewritten to the normalized form no matter which raw spelling
//! it originally held.
use crate::normalize::normalize;
use crate::registry::{Registry, Target, TargetPatch};
use crate::status::TargetStatus;
use std::collections::BTreeMap;
use tracing::debug;

/// Summary of one dedupe pass.
#[derive(Debug)]
pub struct DedupeOutcome {
    pub original_count: usize,
    pub removed: Vec<(String, TargetStatus)>,
    pub final_count: usize,
}

/// Collapse duplicate records, keeping the best-status member per group.
///
/// Idempotent: a second pass over the result is a no-op.
pub fn dedupe_registry(registry: &mut Registry) -> DedupeOutcome {
    let original_count = registry.len();

    let mut groups: BTreeMap<String, Vec<Target>> = BTreeMap::new();
    for target in registry.all() {
        groups
            .entry(normalize(&target.identifier))
            .or_default()
            .push(target.clone());
    }

    let mut removed = Vec::new();
    for (normalized, group) in groups {
        if group.len() > 1 {
            debug!(repo = %normalized, count = group.len(), "collapsing duplicates");
        }
        let Some(winner) = select_winner(&group) else {
            continue;
        };
        for member in &group {
            registry.remove(&member.identifier);
            if member.identifier != winner.identifier {
                removed.push((member.identifier.clone(), member.status.clone()));
            }
        }
        registry.upsert(
            &normalized,
            TargetPatch {
                status: Some(winner.status.clone()),
                review_number: winner.review_number,
                last_change_url: winner.last_change_url.clone(),
                last_change_kind: winner.last_change_kind,
                attempts: Some(winner.attempts),
                notes: Some(winner.notes.clone()),
            },
        );
    }

    DedupeOutcome {
        original_count,
        removed,
        final_count: registry.len(),
    }
}

/// Fold a duplicate group to its best member: lower status priority wins,
/// and on a priority tie a record carrying a review number beats one
/// without, checking the pull-request number before the issue number.
fn select_winner(group: &[Target]) -> Option<&Target> {
    group
        .iter()
        .reduce(|best, current| {
            let best_priority = best.status.dedupe_priority();
            let current_priority = current.status.dedupe_priority();
            if current_priority < best_priority {
                return current;
            }
            if current_priority == best_priority
                && current.has_pr_number()
                && !best.has_pr_number()
            {
                return current;
            }
            if current_priority == best_priority
                && current.has_issue_number()
                && !best.has_issue_number()
            {
                return current;
            }
            best
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ChangeKind;

    fn seed(registry: &mut Registry, identifier: &str, status: TargetStatus) {
        registry.upsert(
            identifier,
            TargetPatch {
                status: Some(status),
                ..TargetPatch::default()
            },
        );
    }

    #[test]
    fn higher_priority_status_wins_the_group() {
        let mut registry = Registry::new("pr-18");
        seed(&mut registry, "org/x", TargetStatus::ReadyForPr);
        seed(
            &mut registry,
            "https://github.com/org/x",
            TargetStatus::Merged,
        );

        let outcome = dedupe_registry(&mut registry);

        assert_eq!(outcome.final_count, 1);
        assert_eq!(outcome.removed.len(), 1);
        let survivor = registry.get("org/x").unwrap();
        assert_eq!(survivor.status, TargetStatus::Merged);
        assert_eq!(survivor.url, "https://github.com/org/x");
    }

    #[test]
    fn review_number_breaks_priority_ties() {
        let mut registry = Registry::new("pr-18");
        seed(&mut registry, "org/x", TargetStatus::PrOpen);
        registry.upsert(
            "https://github.com/org/x",
            TargetPatch {
                status: Some(TargetStatus::PrOpen),
                review_number: Some(12),
                last_change_kind: Some(ChangeKind::Pr),
                ..TargetPatch::default()
            },
        );

        dedupe_registry(&mut registry);

        let survivor = registry.get("org/x").unwrap();
        assert_eq!(survivor.review_number, Some(12));
        assert_eq!(survivor.last_change_kind, Some(ChangeKind::Pr));
    }

    #[test]
    fn no_two_records_share_a_normalized_identifier_afterwards() {
        let mut registry = Registry::new("pr-18");
        seed(&mut registry, "org/x", TargetStatus::ReadyForPr);
        seed(
            &mut registry,
            "https://github.com/org/x",
            TargetStatus::Discovered,
        );
        seed(
            &mut registry,
            "org/https://github.com/org/x",
            TargetStatus::IssueOpen,
        );
        seed(&mut registry, "org/y", TargetStatus::ReadyForPr);

        dedupe_registry(&mut registry);

        let mut normalized: Vec<String> =
            registry.all().map(|t| normalize(&t.identifier)).collect();
        normalized.sort();
        normalized.dedup();
        assert_eq!(normalized.len(), registry.len());
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("org/x").unwrap().status,
            TargetStatus::IssueOpen
        );
    }

    #[test]
    fn dedupe_twice_equals_dedupe_once() {
        let mut registry = Registry::new("pr-18");
        seed(&mut registry, "org/x", TargetStatus::ReadyForPr);
        seed(
            &mut registry,
            "https://github.com/org/x",
            TargetStatus::PrOpen,
        );
        seed(&mut registry, "org/y", TargetStatus::Merged);

        dedupe_registry(&mut registry);
        let first: Vec<Target> = registry.all().cloned().collect();

        let outcome = dedupe_registry(&mut registry);
        let second: Vec<Target> = registry.all().cloned().collect();

        assert_eq!(first, second);
        assert!(outcome.removed.is_empty());
    }

    #[test]
    fn single_member_groups_still_get_normalized_spelling() {
        let mut registry = Registry::new("pr-18");
        seed(
            &mut registry,
            "Azure-Samples/https://github.com/Azure-Samples/functions-quickstart-dotnet-azd",
            TargetStatus::Merged,
        );

        let outcome = dedupe_registry(&mut registry);

        assert!(outcome.removed.is_empty());
        let survivor = registry
            .get("Azure-Samples/functions-quickstart-dotnet-azd")
            .unwrap();
        assert_eq!(
            survivor.url,
            "https://github.com/Azure-Samples/functions-quickstart-dotnet-azd"
        );
    }
}
