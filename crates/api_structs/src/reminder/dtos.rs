use chrono::{DateTime, Utc};
use nudge_domain::{ScheduleDescriptor, ScheduleKind, ScheduleStatus, ID};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDTO {
    pub id: ID,
    pub owner_id: String,
    pub text: String,
    pub kind: ScheduleKind,
    /// When the reminder fires, in words
    pub schedule: String,
    pub timezone: String,
    pub status: ScheduleStatus,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
}

impl ReminderDTO {
    pub fn new(descriptor: ScheduleDescriptor) -> Self {
        Self {
            schedule: descriptor.describe_schedule(),
            id: descriptor.id,
            owner_id: descriptor.owner_id,
            text: descriptor.payload,
            kind: descriptor.kind,
            timezone: descriptor.timezone.name().to_string(),
            status: descriptor.status,
            next_fire_at: descriptor.next_fire_at,
            last_fired_at: descriptor.last_fired_at,
            created: descriptor.created,
        }
    }
}
