use crate::{
    recurrence::{next_after, RecurrenceRule},
    shared::entity::{Entity, ID},
};
use chrono::{prelude::*, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// `Completed` and `Cancelled` descriptors never fire again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl Display for ScheduleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("Unknown schedule status: {0}")]
pub struct InvalidStatusError(String);

impl FromStr for ScheduleStatus {
    type Err = InvalidStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(InvalidStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleKind {
    Once { at: DateTime<Utc> },
    Recurring { rule: RecurrenceRule },
}

#[derive(Error, Debug, PartialEq)]
pub enum TransitionError {
    #[error("The reminder is {0} and can no longer be changed")]
    Finished(ScheduleStatus),
    #[error("The reminder is {0}")]
    InvalidState(ScheduleStatus),
}

#[derive(Error, Debug, PartialEq)]
pub enum EndConditionError {
    #[error("Only recurring reminders can have an end date")]
    NotRecurring,
    #[error("No occurrence is left before the end date")]
    NothingLeft,
}

/// The durable record of one reminder intent, one-time or recurring
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDescriptor {
    pub id: ID,
    /// The user that asked for the reminder and receives it
    pub owner_id: String,
    /// Text delivered when the reminder fires
    pub payload: String,
    pub kind: ScheduleKind,
    /// Zone all civil time of this descriptor is interpreted in
    pub timezone: Tz,
    pub status: ScheduleStatus,
    /// Present exactly when `status` is `Active`
    pub next_fire_at: Option<DateTime<Utc>>,
    /// The due instant of the latest successful delivery
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Set while a dispatcher holds the descriptor for delivery. The claim
    /// lapses at this instant so a crashed dispatcher cannot strand it.
    pub claimed_until: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful update
    pub version: i64,
    pub created: DateTime<Utc>,
}

impl Entity for ScheduleDescriptor {
    fn id(&self) -> &ID {
        &self.id
    }
}

fn first_fire_at(kind: &ScheduleKind, tz: &Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match kind {
        ScheduleKind::Once { at } => Some(*at),
        ScheduleKind::Recurring { rule } => next_after(rule, tz, now),
    }
}

impl ScheduleDescriptor {
    /// Creates an `Active` descriptor. Returns `None` when a recurring
    /// rule has no occurrence left after `now`.
    pub fn new(
        owner_id: String,
        payload: String,
        kind: ScheduleKind,
        timezone: Tz,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let next_fire_at = first_fire_at(&kind, &timezone, now)?;
        Some(Self {
            id: Default::default(),
            owner_id,
            payload,
            kind,
            timezone,
            status: ScheduleStatus::Active,
            next_fire_at: Some(next_fire_at),
            last_fired_at: None,
            claimed_until: None,
            version: 0,
            created: now,
        })
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.kind, ScheduleKind::Recurring { .. })
    }

    pub fn is_claimed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.claimed_until, Some(until) if until > now)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduleStatus::Active
            && matches!(self.next_fire_at, Some(at) if at <= now)
            && !self.is_claimed(now)
    }

    /// Marks the descriptor as being fired by the caller until `now + lease`
    pub fn claim(&mut self, now: DateTime<Utc>, lease: Duration) {
        self.claimed_until = Some(now + lease);
    }

    pub fn release_claim(&mut self) {
        self.claimed_until = None;
    }

    /// Applies a successful delivery of the currently due occurrence.
    ///
    /// A recurring descriptor remembers the due instant as `last_fired_at`
    /// and moves on to the first occurrence after both that instant and
    /// `now`. Occurrences missed while nothing was dispatching are skipped
    /// rather than delivered one by one.
    pub fn record_delivery(&mut self, now: DateTime<Utc>) {
        let due = self.next_fire_at.unwrap_or(now);
        self.claimed_until = None;
        match &self.kind {
            ScheduleKind::Once { .. } => {
                self.last_fired_at = Some(due);
                self.complete();
            }
            ScheduleKind::Recurring { rule } => {
                self.last_fired_at = Some(due);
                match next_after(rule, &self.timezone, due.max(now)) {
                    Some(next) => self.next_fire_at = Some(next),
                    None => self.complete(),
                }
            }
        }
    }

    fn complete(&mut self) {
        self.status = ScheduleStatus::Completed;
        self.next_fire_at = None;
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Finished(self.status));
        }
        self.status = ScheduleStatus::Cancelled;
        self.next_fire_at = None;
        self.claimed_until = None;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TransitionError> {
        match self.status {
            ScheduleStatus::Active => {
                self.status = ScheduleStatus::Paused;
                self.next_fire_at = None;
                self.claimed_until = None;
                Ok(())
            }
            status if status.is_terminal() => Err(TransitionError::Finished(status)),
            status => Err(TransitionError::InvalidState(status)),
        }
    }

    /// Reactivates a paused descriptor. A recurring rule continues with its
    /// first occurrence after `now`, a one-time reminder whose instant passed
    /// while paused fires on the next dispatch.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.status {
            ScheduleStatus::Paused => {
                match first_fire_at(&self.kind, &self.timezone, now) {
                    Some(next) => {
                        self.status = ScheduleStatus::Active;
                        self.next_fire_at = Some(next);
                    }
                    None => self.complete(),
                }
                Ok(())
            }
            status if status.is_terminal() => Err(TransitionError::Finished(status)),
            status => Err(TransitionError::InvalidState(status)),
        }
    }

    /// Sets the end condition of a recurring descriptor. On error `self` is
    /// left untouched.
    pub fn set_end(
        &mut self,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), EndConditionError> {
        let mut rule = match &self.kind {
            ScheduleKind::Recurring { rule } => rule.clone(),
            ScheduleKind::Once { .. } => return Err(EndConditionError::NotRecurring),
        };
        rule.ends_at = Some(ends_at);
        let after = self.last_fired_at.map_or(now, |last| last.max(now));
        match next_after(&rule, &self.timezone, after) {
            Some(next) => {
                self.kind = ScheduleKind::Recurring { rule };
                if self.status == ScheduleStatus::Active {
                    self.next_fire_at = Some(next);
                }
                Ok(())
            }
            None => Err(EndConditionError::NothingLeft),
        }
    }

    /// Human readable description of when this reminder fires
    pub fn describe_schedule(&self) -> String {
        match &self.kind {
            ScheduleKind::Once { at } => format!(
                "once at {}",
                at.with_timezone(&self.timezone).format("%Y-%m-%d %H:%M %Z")
            ),
            ScheduleKind::Recurring { rule } => format!("{} ({})", rule, self.timezone.name()),
        }
    }

    /// The text sent to the owner when the reminder fires
    pub fn notification_text(&self) -> String {
        format!("🔔 Reminder: {}", self.payload)
    }
}
