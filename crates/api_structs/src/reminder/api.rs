use crate::dtos::ReminderDTO;
use nudge_domain::{ScheduleDescriptor, ID};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub reminder: ReminderDTO,
}

impl ReminderResponse {
    pub fn new(descriptor: ScheduleDescriptor) -> Self {
        Self {
            reminder: ReminderDTO::new(descriptor),
        }
    }
}

/// Either the reminder that was scheduled, or the text handed back because
/// it does not ask for a reminder at a recognizable time
#[derive(Deserialize, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CreateReminderResponse {
    Scheduled { reminder: ReminderDTO },
    NotAReminder { text: String },
}

pub mod create_reminder {
    use super::*;
    use chrono::{DateTime, Utc};

    #[derive(Deserialize)]
    pub struct PathParams {
        pub owner_id: String,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub text: String,
        /// IANA timezone of the owner, the configured default when absent
        #[serde(default)]
        pub timezone: Option<String>,
        /// Last instant a recurring reminder may fire at
        #[serde(default)]
        pub ends_at: Option<DateTime<Utc>>,
    }

    pub type APIResponse = CreateReminderResponse;
}

pub mod handle_utterance {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub owner_id: String,
    }

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RequestBody {
        pub text: String,
        #[serde(default)]
        pub timezone: Option<String>,
    }

    pub type APIResponse = CreateReminderResponse;
}

pub mod get_reminders_by_owner {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub owner_id: String,
    }

    #[derive(Deserialize)]
    pub struct QueryParams {
        /// Include completed and cancelled reminders
        #[serde(default)]
        pub all: Option<bool>,
    }

    #[derive(Deserialize, Serialize)]
    pub struct APIResponse {
        pub reminders: Vec<ReminderDTO>,
    }

    impl APIResponse {
        pub fn new(descriptors: Vec<ScheduleDescriptor>) -> Self {
            Self {
                reminders: descriptors.into_iter().map(ReminderDTO::new).collect(),
            }
        }
    }
}

pub mod get_reminder {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub reminder_id: ID,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod cancel_reminder {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub reminder_id: ID,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod pause_reminder {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub reminder_id: ID,
    }

    pub type APIResponse = ReminderResponse;
}

pub mod resume_reminder {
    use super::*;

    #[derive(Deserialize)]
    pub struct PathParams {
        pub reminder_id: ID,
    }

    pub type APIResponse = ReminderResponse;
}
