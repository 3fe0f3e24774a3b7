use crate::repair::repair_error::RepairError;
use crate::repair::rule::RepairRule;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    Converged,
    Failed,
}

/// one detector evaluation in the ordered repair log
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RuleApplication {
    pub rule_id: String,
    pub round: usize,
    pub applied: bool,
    pub reason: String,
}

impl RuleApplication {
    pub fn applied(rule: RepairRule, round: usize, reason: String) -> RuleApplication {
        RuleApplication {
            rule_id: rule.id().to_string(),
            round,
            applied: true,
            reason,
        }
    }

    pub fn skipped(rule: RepairRule, round: usize) -> RuleApplication {
        RuleApplication {
            rule_id: rule.id().to_string(),
            round,
            applied: false,
            reason: String::new(),
        }
    }
}

/// the repair outcome for one archive: which rules fired in which round,
/// the structural normalizations applied, and any advisory condition left
/// unresolved for the operator
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ArchiveReport {
    pub archive: String,
    pub status: RepairStatus,
    pub rounds: usize,
    pub normalizations: Vec<String>,
    pub applications: Vec<RuleApplication>,
    pub advisory: Option<String>,
    pub error: Option<String>,
}

impl ArchiveReport {
    pub fn failed(archive: &Path, error: &RepairError) -> ArchiveReport {
        ArchiveReport {
            archive: archive.display().to_string(),
            status: RepairStatus::Failed,
            rounds: 0,
            normalizations: vec![],
            applications: vec![],
            advisory: None,
            error: Some(format!("{error}")),
        }
    }

    /// number of fixes applied across all rounds
    pub fn fixes_applied(&self) -> usize {
        self.applications.iter().filter(|a| a.applied).count()
    }

    /// rule ids that fired, in application order
    pub fn fired_rules(&self) -> Vec<&str> {
        self.applications
            .iter()
            .filter(|a| a.applied)
            .map(|a| a.rule_id.as_str())
            .collect()
    }
}

impl Display for ArchiveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            RepairStatus::Failed => {
                let error = self.error.as_deref().unwrap_or("unknown error");
                write!(f, "{}: failed ({error})", self.archive)
            }
            RepairStatus::Converged if self.fixes_applied() == 0 => {
                write!(f, "{}: clean", self.archive)
            }
            RepairStatus::Converged => {
                write!(
                    f,
                    "{}: applied [{}] over {} rounds",
                    self.archive,
                    self.fired_rules().join(", "),
                    self.rounds
                )
            }
        }
    }
}
