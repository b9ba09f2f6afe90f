use crate::date::{first_of_month_after, get_month_length, localize, months_between, week_start};
use chrono::{prelude::*, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Civil wall-clock time, interpreted in the timezone of the owning descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { hour: 0, minute: 0 };

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    pub fn as_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour.min(23), self.minute.min(59), 0)
            .unwrap_or_default()
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MonthDay {
    Day(u32),
    Last,
}

impl MonthDay {
    /// The day this rule lands on in the given month. Days that the month
    /// does not have are clamped to its last day.
    pub fn resolve(&self, year: i32, month: u32) -> u32 {
        let month_length = get_month_length(year, month);
        match self {
            Self::Day(day) => (*day).min(month_length),
            Self::Last => month_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly { days_of_week: Vec<Weekday> },
    Monthly { day_of_month: MonthDay },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub time_of_day: TimeOfDay,
    /// Every `interval` days, weeks or months
    pub interval: u32,
    pub ends_at: Option<DateTime<Utc>>,
    /// Civil date the interval stepping is counted from
    pub anchor: NaiveDate,
}

#[derive(Error, Debug, PartialEq)]
pub enum InvalidRuleError {
    #[error("The interval must be a positive number")]
    ZeroInterval,
    #[error("A weekly rule needs at least one weekday")]
    NoWeekdays,
    #[error("There is no day {0} in a month")]
    InvalidMonthDay(u32),
}

impl RecurrenceRule {
    pub fn new(
        frequency: Frequency,
        time_of_day: TimeOfDay,
        interval: u32,
        anchor: NaiveDate,
    ) -> Result<Self, InvalidRuleError> {
        let frequency = match frequency {
            Frequency::Weekly { mut days_of_week } => {
                days_of_week.sort_by_key(|d| d.num_days_from_monday());
                days_of_week.dedup();
                Frequency::Weekly { days_of_week }
            }
            f => f,
        };
        let rule = Self {
            frequency,
            time_of_day,
            interval,
            ends_at: None,
            anchor,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), InvalidRuleError> {
        if self.interval == 0 {
            return Err(InvalidRuleError::ZeroInterval);
        }
        match &self.frequency {
            Frequency::Weekly { days_of_week } if days_of_week.is_empty() => {
                Err(InvalidRuleError::NoWeekdays)
            }
            Frequency::Monthly {
                day_of_month: MonthDay::Day(day),
            } if *day < 1 || *day > 31 => Err(InvalidRuleError::InvalidMonthDay(*day)),
            _ => Ok(()),
        }
    }

    fn step(&self) -> i64 {
        self.interval.max(1) as i64
    }
}

/// Computes the earliest instant strictly after `after` that matches `rule`.
///
/// All calendar reasoning happens in the civil time of `tz`, so the stated
/// time of day is kept across daylight-saving transitions while the absolute
/// instant shifts. Returns `None` once the rule has ended.
pub fn next_after(rule: &RecurrenceRule, tz: &Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(ends_at) = rule.ends_at {
        if ends_at <= after {
            return None;
        }
    }

    let next = match &rule.frequency {
        Frequency::Daily => next_daily(rule, tz, after),
        Frequency::Weekly { days_of_week } => next_weekly(rule, days_of_week, tz, after),
        Frequency::Monthly { day_of_month } => next_monthly(rule, *day_of_month, tz, after),
    }?;

    match rule.ends_at {
        Some(ends_at) if next > ends_at => None,
        _ => Some(next),
    }
}

fn next_daily(rule: &RecurrenceRule, tz: &Tz, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let step = rule.step();
    let local_day = after.with_timezone(tz).date_naive();
    let elapsed = (local_day - rule.anchor).num_days();
    let mut k = if elapsed > 0 { elapsed / step } else { 0 };

    for _ in 0..4 {
        let day = rule.anchor + Duration::days(k * step);
        let candidate = localize(tz, day, rule.time_of_day.as_naive());
        if candidate > after {
            return Some(candidate);
        }
        k += 1;
    }
    None
}

fn next_weekly(
    rule: &RecurrenceRule,
    days_of_week: &[Weekday],
    tz: &Tz,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if days_of_week.is_empty() {
        return None;
    }
    let step = rule.step();
    let anchor_week = week_start(rule.anchor);
    let local_day = after.with_timezone(tz).date_naive();
    let start = local_day.max(anchor_week);

    for offset in 0..=(7 * step + 7) {
        let day = start + Duration::days(offset);
        if !days_of_week.contains(&day.weekday()) {
            continue;
        }
        let weeks_since_anchor = (week_start(day) - anchor_week).num_days() / 7;
        if weeks_since_anchor % step != 0 {
            continue;
        }
        let candidate = localize(tz, day, rule.time_of_day.as_naive());
        if candidate > after {
            return Some(candidate);
        }
    }
    None
}

fn next_monthly(
    rule: &RecurrenceRule,
    day_of_month: MonthDay,
    tz: &Tz,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let step = rule.step();
    let local_day = after.with_timezone(tz).date_naive();
    let elapsed = months_between(rule.anchor, local_day);
    let mut k = if elapsed > 0 { elapsed / step } else { 0 };

    for _ in 0..4 {
        let month = first_of_month_after(rule.anchor, k * step)?;
        let day = day_of_month.resolve(month.year(), month.month());
        let date = NaiveDate::from_ymd_opt(month.year(), month.month(), day)?;
        let candidate = localize(tz, date, rule.time_of_day.as_naive());
        if candidate > after {
            return Some(candidate);
        }
        k += 1;
    }
    None
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

impl Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let every = |unit: &str| match self.interval {
            0 | 1 => format!("every {}", unit),
            2 => format!("every other {}", unit),
            n => format!("every {} {}s", n, unit),
        };
        match &self.frequency {
            Frequency::Daily => write!(f, "{} at {}", every("day"), self.time_of_day)?,
            Frequency::Weekly { days_of_week } => {
                let names = days_of_week
                    .iter()
                    .map(|d| weekday_name(*d))
                    .collect::<Vec<_>>();
                if self.interval <= 1 {
                    write!(f, "every {} at {}", join_names(&names), self.time_of_day)?
                } else {
                    write!(
                        f,
                        "{} on {} at {}",
                        every("week"),
                        join_names(&names),
                        self.time_of_day
                    )?
                }
            }
            Frequency::Monthly { day_of_month } => {
                let day = match day_of_month {
                    MonthDay::Day(d) => format!("the {}", ordinal(*d)),
                    MonthDay::Last => "the last day".to_string(),
                };
                write!(f, "on {} of {} at {}", day, every("month"), self.time_of_day)?
            }
        }
        if let Some(ends_at) = self.ends_at {
            write!(f, " until {}", ends_at.format("%Y-%m-%d %H:%M UTC"))?;
        }
        Ok(())
    }
}
