use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named phases of the post-approval workstream. All three are required
/// before the parent request may complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    AgreementSigned,
    HomeVisit,
    Handover,
}

impl PhaseKind {
    pub const REQUIRED: [PhaseKind; 3] = [PhaseKind::AgreementSigned, PhaseKind::HomeVisit, PhaseKind::Handover];

    pub const fn as_str(self) -> &'static str {
        match self {
            PhaseKind::AgreementSigned => "agreement_signed",
            PhaseKind::HomeVisit => "home_visit",
            PhaseKind::Handover => "handover",
        }
    }
}

/// One phase of an adoption process, independently markable complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPhase {
    pub kind: PhaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ProcessPhase {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A post-completion check-in on the adopted pet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: String,
    pub due_on: DateTime<Utc>,
    pub completed: bool,
    /// 1-5 score recorded at completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wellbeing: Option<u8>,
    /// 1-5 score recorded at completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The post-approval workstream for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionProcess {
    pub started_at: DateTime<Utc>,
    pub phases: Vec<ProcessPhase>,
    pub follow_ups: Vec<FollowUp>,
}

impl AdoptionProcess {
    /// Start a process seeded with every required phase incomplete.
    pub fn start(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            phases: PhaseKind::REQUIRED
                .into_iter()
                .map(|kind| ProcessPhase {
                    kind,
                    completed_at: None,
                    note: None,
                })
                .collect(),
            follow_ups: Vec::new(),
        }
    }

    pub fn phase(&self, kind: PhaseKind) -> Option<&ProcessPhase> {
        self.phases.iter().find(|p| p.kind == kind)
    }

    /// Mark one phase complete. Returns `false` when the phase is unknown.
    /// Completing an already-complete phase refreshes its note and timestamp.
    pub fn complete_phase(&mut self, kind: PhaseKind, at: DateTime<Utc>, note: Option<String>) -> bool {
        match self.phases.iter_mut().find(|p| p.kind == kind) {
            Some(phase) => {
                phase.completed_at = Some(at);
                phase.note = note;
                true
            }
            None => false,
        }
    }

    pub fn all_phases_complete(&self) -> bool {
        self.phases.iter().all(ProcessPhase::is_complete)
    }

    pub fn follow_up_mut(&mut self, follow_up_id: &str) -> Option<&mut FollowUp> {
        self.follow_ups.iter_mut().find(|f| f.id == follow_up_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_seeds_required_phases_incomplete() {
        let process = AdoptionProcess::start(Utc::now());
        assert_eq!(process.phases.len(), PhaseKind::REQUIRED.len());
        assert!(!process.all_phases_complete());
    }

    #[test]
    fn completing_every_phase_completes_process() {
        let mut process = AdoptionProcess::start(Utc::now());
        for kind in PhaseKind::REQUIRED {
            assert!(process.complete_phase(kind, Utc::now(), None));
        }
        assert!(process.all_phases_complete());
    }
}
