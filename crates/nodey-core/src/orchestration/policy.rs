//! Per-step failure policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::steps::StepKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Repeat the call up to `attempts` more times, then fail fast.
    Retry { attempts: u32 },
    /// Continue with a placeholder result.
    Degrade,
    /// Abandon the attempt and hand control back to the user.
    FailFast,
    /// Treat the failure as a positive outcome.
    FailOpen,
}

impl FailurePolicy {
    /// Extra attempts the dispatcher makes before reporting a failure.
    pub fn retries(&self) -> u32 {
        match self {
            FailurePolicy::Retry { attempts } => *attempts,
            _ => 0,
        }
    }
}

/// How the orchestrator reacts once a failure reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReaction {
    Degrade,
    Abort,
    Accept,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(flatten)]
    entries: HashMap<StepKind, FailurePolicy>,
}

impl PolicyTable {
    pub fn get(&self, kind: StepKind) -> FailurePolicy {
        self.entries
            .get(&kind)
            .copied()
            .unwrap_or_else(|| default_policy(kind))
    }

    pub fn set(&mut self, kind: StepKind, policy: FailurePolicy) {
        self.entries.insert(kind, policy);
    }

    pub fn with(mut self, kind: StepKind, policy: FailurePolicy) -> Self {
        self.set(kind, policy);
        self
    }

    /// Reaction to a failure that survived any retries.
    pub fn reaction(&self, kind: StepKind) -> FailureReaction {
        match self.get(kind) {
            FailurePolicy::Degrade => FailureReaction::Degrade,
            FailurePolicy::FailOpen => FailureReaction::Accept,
            FailurePolicy::FailFast | FailurePolicy::Retry { .. } => FailureReaction::Abort,
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            entries: StepKind::ALL
                .iter()
                .map(|kind| (*kind, default_policy(*kind)))
                .collect(),
        }
    }
}

fn default_policy(kind: StepKind) -> FailurePolicy {
    match kind {
        StepKind::Analyze => FailurePolicy::FailFast,
        StepKind::Research => FailurePolicy::Degrade,
        StepKind::Draft => FailurePolicy::FailFast,
        StepKind::Review => FailurePolicy::FailOpen,
        StepKind::Emit => FailurePolicy::FailFast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = PolicyTable::default();
        assert_eq!(table.get(StepKind::Analyze), FailurePolicy::FailFast);
        assert_eq!(table.get(StepKind::Research), FailurePolicy::Degrade);
        assert_eq!(table.get(StepKind::Draft), FailurePolicy::FailFast);
        assert_eq!(table.get(StepKind::Review), FailurePolicy::FailOpen);
        assert_eq!(table.get(StepKind::Emit), FailurePolicy::FailFast);
    }

    #[test]
    fn test_reactions() {
        let table = PolicyTable::default().with(StepKind::Draft, FailurePolicy::Retry { attempts: 2 });
        assert_eq!(table.reaction(StepKind::Research), FailureReaction::Degrade);
        assert_eq!(table.reaction(StepKind::Review), FailureReaction::Accept);
        assert_eq!(table.reaction(StepKind::Draft), FailureReaction::Abort);
        assert_eq!(table.get(StepKind::Draft).retries(), 2);
        assert_eq!(table.get(StepKind::Analyze).retries(), 0);
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = "review:\n  policy: fail_fast\ndraft:\n  policy: retry\n  attempts: 1\n";
        let table: PolicyTable = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(table.get(StepKind::Review), FailurePolicy::FailFast);
        assert_eq!(table.get(StepKind::Draft), FailurePolicy::Retry { attempts: 1 });
        // Entries missing from the file keep their defaults.
        assert_eq!(table.get(StepKind::Research), FailurePolicy::Degrade);
    }
}
