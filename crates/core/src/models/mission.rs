use serde::{Deserialize, Serialize};

use super::{Credits, MissionId, PlayerId, SystemId};

/// Lifecycle of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    /// Offered to any pilot.
    Available,
    /// Accepted and in progress.
    Active,
    /// Delivered and paid.
    Completed,
    /// Dropped by the assignee.
    Abandoned,
}

/// Job offered by the mission generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    /// Mission id.
    pub id: MissionId,
    /// Short title.
    pub title: String,
    /// Briefing text.
    pub description: String,
    /// Credits paid on completion.
    pub reward: Credits,
    /// Starting system.
    pub origin: SystemId,
    /// Destination system.
    pub destination: SystemId,
    /// Lifecycle status.
    pub status: MissionStatus,
    /// Pilot working the mission.
    #[serde(default)]
    pub assignee: Option<PlayerId>,
}
