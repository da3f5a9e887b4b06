//! Run status: the five-value label the front end shows, and the tagged
//! [`RunState`] that backs it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which stage a run is in, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Nothing running (never started, or the last run failed).
    #[default]
    Idle,
    /// Extraction call in flight.
    RetrievingData,
    /// Synthesis call in flight.
    GeneratingReport,
    /// Simulated save delay.
    SavingReport,
    /// Final report available.
    Done,
}

impl AgentStatus {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            AgentStatus::Idle => "Idle",
            AgentStatus::RetrievingData => "Data Retriever Agent: Processing Document",
            AgentStatus::GeneratingReport => {
                "Medical Facilitator Agent: Analyzing and Generating Report"
            }
            AgentStatus::SavingReport => "Saving Report",
            AgentStatus::Done => "Done",
        }
    }

    /// True while a run is in flight.
    pub fn is_busy(self) -> bool {
        !matches!(self, AgentStatus::Idle | AgentStatus::Done)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tagged state of the most recent run.
///
/// Unlike a bare [`AgentStatus`], this distinguishes "never started" from
/// "just failed".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running(AgentStatus),
    Succeeded,
    Failed(String),
}

impl RunState {
    /// Collapse onto the five-value display status.
    pub fn status(&self) -> AgentStatus {
        match self {
            RunState::Idle | RunState::Failed(_) => AgentStatus::Idle,
            RunState::Running(s) => *s,
            RunState::Succeeded => AgentStatus::Done,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running(_))
    }
}
