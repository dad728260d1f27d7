//! Publish pipeline steps
//!
//! A publish run passes through five steps owned by different systems. The
//! rank orders them for consumers that sort or filter the ledger; it is never
//! used to reject a report. Names outside the vocabulary rank as
//! [`UNRANKED`].

use serde::{Deserialize, Serialize};

/// Rank of any step name outside the known pipeline
pub const UNRANKED: u8 = 0;

/// Known steps of a publish run, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    /// Dashboard generates the release task
    GenerateReleaseTask,
    /// Dashboard distributes the configuration
    DistributeConfiguration,
    /// Configuration processor parses it
    ParseConfiguration,
    /// Configuration processor applies it
    ApplyConfiguration,
    /// Data plane loads it
    LoadConfiguration,
}

impl PublishStep {
    /// All steps, in pipeline order
    pub const ALL: [PublishStep; 5] = [
        PublishStep::GenerateReleaseTask,
        PublishStep::DistributeConfiguration,
        PublishStep::ParseConfiguration,
        PublishStep::ApplyConfiguration,
        PublishStep::LoadConfiguration,
    ];

    /// Wire name of the step
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStep::GenerateReleaseTask => "generate_release_task",
            PublishStep::DistributeConfiguration => "distribute_configuration",
            PublishStep::ParseConfiguration => "parse_configuration",
            PublishStep::ApplyConfiguration => "apply_configuration",
            PublishStep::LoadConfiguration => "load_configuration",
        }
    }

    /// Ordinal position, starting at 1
    pub fn rank(&self) -> u8 {
        match self {
            PublishStep::GenerateReleaseTask => 1,
            PublishStep::DistributeConfiguration => 2,
            PublishStep::ParseConfiguration => 3,
            PublishStep::ApplyConfiguration => 4,
            PublishStep::LoadConfiguration => 5,
        }
    }

    /// Look up a step by wire name. Exact, case-sensitive match.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.as_str() == name)
    }
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank a step name; unknown names rank as [`UNRANKED`]
pub fn step_rank(name: &str) -> u8 {
    PublishStep::from_name(name).map_or(UNRANKED, |step| step.rank())
}
