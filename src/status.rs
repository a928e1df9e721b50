//! Target lifecycle states and change provenance.
//!
//! Statuses form a DAG rather than a strict pipeline: a review outcome can
//! move a target sideways, and `failed` is reachable from any non-terminal
//! state via an external signal. Unrecognized persisted values survive a
//! load/save round-trip verbatim instead of being coerced into a known state.
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Lifecycle state of one propagation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    Discovered,
    ReadyForPr,
    PrOpen,
    PrDraft,
    IssueOpen,
    Merged,
    PrClosed,
    Failed,
    /// Preserved raw value for statuses this build does not know about.
    Unknown(String),
}

/// Statuses outside the winner table rank behind everything else.
const DEDUPE_PRIORITY_FALLBACK: u32 = 999;

impl TargetStatus {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &str {
        match self {
            TargetStatus::Discovered => "discovered",
            TargetStatus::ReadyForPr => "ready-for-pr",
            TargetStatus::PrOpen => "pr-open",
            TargetStatus::PrDraft => "pr-draft",
            TargetStatus::IssueOpen => "issue-open",
            TargetStatus::Merged => "merged",
            TargetStatus::PrClosed => "pr-closed",
            TargetStatus::Failed => "failed",
            TargetStatus::Unknown(raw) => raw,
        }
    }

    /// Parse a persisted status string, preserving unrecognized values.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "discovered" => TargetStatus::Discovered,
            "ready-for-pr" => TargetStatus::ReadyForPr,
            "pr-open" => TargetStatus::PrOpen,
            "pr-draft" => TargetStatus::PrDraft,
            "issue-open" => TargetStatus::IssueOpen,
            "merged" => TargetStatus::Merged,
            "pr-closed" => TargetStatus::PrClosed,
            "failed" => TargetStatus::Failed,
            other => TargetStatus::Unknown(other.to_string()),
        }
    }

    /// Dedupe winner selection rank; lower wins.
    pub fn dedupe_priority(&self) -> u32 {
        match self {
            TargetStatus::Merged => 1,
            TargetStatus::PrOpen => 2,
            TargetStatus::IssueOpen => 3,
            TargetStatus::Discovered => 4,
            TargetStatus::ReadyForPr => 5,
            _ => DEDUPE_PRIORITY_FALLBACK,
        }
    }

    /// Terminal states are never reconciled again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TargetStatus::Merged | TargetStatus::PrClosed)
    }

    /// Non-terminal states that carry or await a review artifact.
    ///
    /// `discovered` is the explicit no-action-yet state and `failed` needs
    /// operator intervention, so neither is polled.
    pub fn awaits_review(&self) -> bool {
        matches!(
            self,
            TargetStatus::ReadyForPr
                | TargetStatus::PrOpen
                | TargetStatus::PrDraft
                | TargetStatus::IssueOpen
        )
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TargetStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TargetStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TargetStatus::from_raw(&raw))
    }
}

/// Kind of external artifact that last changed a target record.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Pr,
    Issue,
    Discovery,
}

impl ChangeKind {
    /// Return the stable string identifier used in JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Pr => "pr",
            ChangeKind::Issue => "issue",
            ChangeKind::Discovery => "discovery",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
