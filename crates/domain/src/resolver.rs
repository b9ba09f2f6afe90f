use crate::{
    date::{first_of_month_after, localize, valid_date, week_start, MAX_YEAR},
    grammar::{ClockTime, DateSpec, OffsetUnit, ParseCandidate, RecurrencePhrase, TimeExpression},
    recurrence::{Frequency, RecurrenceRule, TimeOfDay},
    schedule_descriptor::{ScheduleDescriptor, ScheduleKind},
};
use chrono::{prelude::*, Duration};
use chrono_tz::Tz;
use thiserror::Error;

/// Time used for a date phrase that names no clock, e.g. "tomorrow"
const DEFAULT_DATE_TIME: TimeOfDay = TimeOfDay { hour: 9, minute: 0 };

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("The reminder has no text. What should I remind you about?")]
    EmptyPayload,
    #[error("The reminder text is too long, keep it under {max} characters")]
    PayloadTooLong { max: usize },
    #[error("I could not work out when to remind you: {0}")]
    AmbiguousTime(String),
    #[error("That time has already passed")]
    PastTime,
}

/// Turns a parse candidate into a schedule descriptor, interpreting every
/// civil time in the owner's timezone relative to `now`.
#[derive(Debug, Clone)]
pub struct Resolver {
    pub max_payload_length: usize,
}

impl Resolver {
    pub fn new(max_payload_length: usize) -> Self {
        Self { max_payload_length }
    }

    pub fn resolve(
        &self,
        candidate: &ParseCandidate,
        owner_id: &str,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<ScheduleDescriptor, ParseError> {
        let payload = self.validate_payload(&candidate.payload)?;

        let kind = match &candidate.expression {
            TimeExpression::RelativeOffset { amount, unit } => {
                ScheduleKind::Once {
                    at: resolve_offset(*amount, *unit, now)?,
                }
            }
            TimeExpression::Absolute { date, time } => ScheduleKind::Once {
                at: resolve_absolute(*date, *time, now, &tz)?,
            },
            TimeExpression::Recurrence(phrase) => ScheduleKind::Recurring {
                rule: resolve_recurrence(phrase, now, &tz)?,
            },
        };

        ScheduleDescriptor::new(owner_id.to_string(), payload, kind, tz, now)
            .ok_or(ParseError::PastTime)
    }

    fn validate_payload(&self, payload: &str) -> Result<String, ParseError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(ParseError::EmptyPayload);
        }
        if payload.chars().count() > self.max_payload_length {
            return Err(ParseError::PayloadTooLong {
                max: self.max_payload_length,
            });
        }
        Ok(payload.to_string())
    }
}

fn resolve_offset(amount: u32, unit: OffsetUnit, now: DateTime<Utc>) -> Result<DateTime<Utc>, ParseError> {
    if amount == 0 {
        return Err(ParseError::AmbiguousTime(
            "the delay has to be at least one unit".into(),
        ));
    }
    let amount = amount as i64;
    let offset = match unit {
        OffsetUnit::Minutes => Duration::minutes(amount),
        OffsetUnit::Hours => Duration::hours(amount),
        OffsetUnit::Days => Duration::days(amount),
        OffsetUnit::Weeks => Duration::weeks(amount),
    };
    now.checked_add_signed(offset)
        .filter(|at| at.year() <= MAX_YEAR)
        .ok_or_else(|| ParseError::AmbiguousTime("the delay is too far in the future".into()))
}

fn time_of_day(clock: ClockTime) -> Result<TimeOfDay, ParseError> {
    clock.to_time_of_day().ok_or_else(|| {
        ParseError::AmbiguousTime(format!(
            "{}:{:02} is not a time of day",
            clock.hour, clock.minute
        ))
    })
}

/// Resolves an absolute phrase to the nearest future instant it describes.
/// Only phrases that name the exact day ("today", a calendar date) can end
/// up in the past, everything else rolls forward.
fn resolve_absolute(
    date: Option<DateSpec>,
    time: Option<ClockTime>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<DateTime<Utc>, ParseError> {
    let time = time.map(time_of_day).transpose()?;
    let today = now.with_timezone(tz).date_naive();
    let at_time = |day: NaiveDate| localize(tz, day, time.unwrap_or(DEFAULT_DATE_TIME).as_naive());
    let explicit = |at: DateTime<Utc>| {
        if at <= now {
            Err(ParseError::PastTime)
        } else {
            Ok(at)
        }
    };

    match date {
        None => {
            let at = at_time(today);
            if at > now {
                Ok(at)
            } else {
                Ok(at_time(today + Duration::days(1)))
            }
        }
        Some(DateSpec::Today) => match time {
            None => Ok(now + Duration::hours(1)),
            Some(_) => explicit(at_time(today)),
        },
        Some(DateSpec::Tomorrow) => Ok(at_time(today + Duration::days(1))),
        Some(DateSpec::NextWeek) => Ok(at_time(week_start(today) + Duration::days(7))),
        Some(DateSpec::NextMonth) => first_of_month_after(today, 1)
            .map(at_time)
            .ok_or_else(|| ParseError::AmbiguousTime("next month is out of range".into())),
        Some(DateSpec::Weekday(weekday)) => {
            let days_ahead = (7 + weekday.num_days_from_monday() as i64
                - today.weekday().num_days_from_monday() as i64)
                % 7;
            let at = at_time(today + Duration::days(days_ahead));
            if at > now {
                Ok(at)
            } else {
                Ok(at_time(today + Duration::days(days_ahead + 7)))
            }
        }
        Some(DateSpec::DayOfMonth(day)) => {
            if !(1..=31).contains(&day) {
                return Err(ParseError::AmbiguousTime(format!(
                    "there is no day {} in a month",
                    day
                )));
            }
            // The nearest month that has this day, e.g. the 31st skips April
            (0..12)
                .filter_map(|months| first_of_month_after(today, months))
                .filter_map(|month| valid_date(month.year(), month.month(), day))
                .map(at_time)
                .find(|at| *at > now)
                .ok_or_else(|| {
                    ParseError::AmbiguousTime(format!("there is no upcoming day {}", day))
                })
        }
        Some(DateSpec::Calendar { year, month, day }) => {
            let date = valid_date(year, month, day).ok_or_else(|| {
                ParseError::AmbiguousTime(format!("{:02}/{:02}/{} is not a date", day, month, year))
            })?;
            explicit(at_time(date))
        }
    }
}

/// Builds the recurrence rule of a phrase. Interval stepping is anchored on
/// the owner's current civil date.
fn resolve_recurrence(
    phrase: &RecurrencePhrase,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<RecurrenceRule, ParseError> {
    let anchor = now.with_timezone(tz).date_naive();
    let (frequency, interval, time) = match phrase {
        RecurrencePhrase::Daily { interval, time } => (Frequency::Daily, *interval, *time),
        RecurrencePhrase::Weekly {
            days,
            interval,
            time,
        } => (
            Frequency::Weekly {
                days_of_week: days.clone(),
            },
            *interval,
            *time,
        ),
        RecurrencePhrase::Monthly {
            day,
            interval,
            time,
        } => (Frequency::Monthly { day_of_month: *day }, *interval, *time),
    };
    let time_of_day = match time {
        Some(clock) => time_of_day(clock)?,
        None => TimeOfDay::MIDNIGHT,
    };
    RecurrenceRule::new(frequency, time_of_day, interval, anchor)
        .map_err(|e| ParseError::AmbiguousTime(e.to_string()))
}
