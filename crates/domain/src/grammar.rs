use crate::{
    intent::is_reminder_request,
    recurrence::{MonthDay, TimeOfDay},
};
use chrono::Weekday;
use regex::{Captures, Regex};
use std::{ops::Range, sync::OnceLock};

const DAY: &str = r"(?:mon(?:day)?|tue(?:s(?:day)?)?|wed(?:nesday)?|thu(?:r(?:s(?:day)?)?)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?)s?";
const DAY_SEPARATOR: &str = r"(?:\s*,\s*(?:and\s+)?|\s+and\s+|\s*&\s*)";
const PART_OF_DAY: &str = r"(?P<part>morning|afternoon|evening|night)";
/// A part of day trailing a recurrence, "every Monday evening", "every day in
/// the morning", "every weekend at night"
const PART_OF_DAY_SUFFIX: &str =
    r"(?:\s+(?:in\s+the\s+|at\s+)?(?P<part>morning|afternoon|evening|night)\b)?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// A clock phrase as written. The values are not validated, "at 25" and
/// "13 pm" are matched so they can be rejected as impossible times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
    pub meridiem: Option<Meridiem>,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            hour,
            minute,
            meridiem: None,
        }
    }

    /// The 24-hour wall-clock time, or `None` if no such time exists
    pub fn to_time_of_day(&self) -> Option<TimeOfDay> {
        let hour = match self.meridiem {
            None => self.hour,
            Some(_) if self.hour == 0 || self.hour > 12 => return None,
            Some(Meridiem::Am) => self.hour % 12,
            Some(Meridiem::Pm) => self.hour % 12 + 12,
        };
        TimeOfDay::new(hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    Today,
    Tomorrow,
    /// Monday of the following week
    NextWeek,
    /// The 1st of the following month
    NextMonth,
    Weekday(Weekday),
    DayOfMonth(u32),
    Calendar { year: i32, month: u32, day: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecurrencePhrase {
    Daily {
        interval: u32,
        time: Option<ClockTime>,
    },
    Weekly {
        days: Vec<Weekday>,
        interval: u32,
        time: Option<ClockTime>,
    },
    Monthly {
        day: MonthDay,
        interval: u32,
        time: Option<ClockTime>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimeExpression {
    RelativeOffset { amount: u32, unit: OffsetUnit },
    Absolute {
        date: Option<DateSpec>,
        time: Option<ClockTime>,
    },
    Recurrence(RecurrencePhrase),
}

/// The structured reading of an utterance that contains a time expression
#[derive(Debug, Clone, PartialEq)]
pub struct ParseCandidate {
    pub expression: TimeExpression,
    /// The part of the utterance the expression was read from
    pub expression_text: String,
    /// What is left once the time expression and request filler are removed
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhraseMatch {
    pub expression: TimeExpression,
    pub spans: Vec<Range<usize>>,
}

pub struct PhrasePattern {
    pub name: &'static str,
    pub matcher: fn(&str) -> Option<PhraseMatch>,
}

/// Phrase patterns ordered by specificity. The first pattern that matches
/// decides how the utterance is read, so a weekday list is always read as a
/// whole before the absolute pattern could pick a single weekday out of it.
pub static PHRASE_PATTERNS: [PhrasePattern; 8] = [
    PhrasePattern {
        name: "relative_offset",
        matcher: match_relative_offset,
    },
    PhrasePattern {
        name: "weekly_interval",
        matcher: match_weekly_interval,
    },
    PhrasePattern {
        name: "weekday_list",
        matcher: match_weekday_list,
    },
    PhrasePattern {
        name: "weekday_group",
        matcher: match_weekday_group,
    },
    PhrasePattern {
        name: "monthly_ordinal",
        matcher: match_monthly_ordinal,
    },
    PhrasePattern {
        name: "monthly_interval",
        matcher: match_monthly_interval,
    },
    PhrasePattern {
        name: "daily_generic",
        matcher: match_daily_generic,
    },
    PhrasePattern {
        name: "absolute",
        matcher: match_absolute,
    },
];

/// Reads the time expression and payload out of an utterance. Returns
/// `None` when the utterance holds no time expression, meaning it is not a
/// reminder request.
pub fn match_utterance(text: &str) -> Option<ParseCandidate> {
    PHRASE_PATTERNS.iter().find_map(|pattern| {
        (pattern.matcher)(text).map(|phrase| into_candidate(text, phrase))
    })
}

fn into_candidate(text: &str, phrase: PhraseMatch) -> ParseCandidate {
    let mut spans = phrase.spans;
    spans.sort_by_key(|span| span.start);

    let expression_text = spans
        .iter()
        .map(|span| text[span.clone()].trim())
        .collect::<Vec<_>>()
        .join(" ");

    let mut remainder = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in &spans {
        if span.start > cursor {
            let before = &text[cursor..span.start];
            // "on" in "pay rent on tomorrow" belongs to the date, in "log on
            // at 9am" the date brings its own preposition
            if introduced_regex().is_match(&text[span.clone()]) {
                remainder.push_str(before);
            } else {
                remainder.push_str(&trailing_connective_regex().replace(before, ""));
            }
        }
        remainder.push(' ');
        cursor = cursor.max(span.end);
    }
    remainder.push_str(&text[cursor..]);

    ParseCandidate {
        expression: phrase.expression,
        expression_text,
        payload: clean_payload(&remainder),
    }
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern should compile"))
}

fn request_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:please\s+)?(?:remind\s+me(?:\s+(?:to|about|that|of))?|(?:set|create|add|schedule|make)\s+(?:me\s+)?(?:a\s+)?reminder(?:\s+(?:to|for|about|that))?)\b",
        )
        .expect("request prefix pattern should compile")
    })
}

fn leading_connective_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:to|about|that|on|at)\b").expect("connective pattern should compile")
    })
}

fn trailing_connective_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:on|at|by)\s*$").expect("connective pattern should compile")
    })
}

/// Time phrases that start with their own preposition
fn introduced_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:at|on|in|by|every|each|this|next|daily|weekly|monthly)\b")
            .expect("introduced phrase pattern should compile")
    })
}

fn clean_payload(text: &str) -> String {
    let mut payload = whitespace_regex().replace_all(text, " ").into_owned();
    loop {
        let before = payload.clone();
        payload = payload
            .trim_matches(|c: char| c.is_whitespace() || ",.;:!?-".contains(c))
            .to_string();
        payload = request_prefix_regex().replace(&payload, "").into_owned();
        payload = leading_connective_regex().replace(&payload, "").into_owned();
        if payload == before {
            return payload;
        }
    }
}

fn parse_count(word: &str) -> Option<u32> {
    match word.trim().to_lowercase().as_str() {
        "a" | "an" | "one" => Some(1),
        "other" | "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        "eleven" => Some(11),
        "twelve" => Some(12),
        digits => digits.parse().ok(),
    }
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    let token = token.to_lowercase();
    match token.get(..3)? {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn part_of_day(part: &str) -> Option<ClockTime> {
    match part.to_lowercase().as_str() {
        "morning" => Some(ClockTime::new(9, 0)),
        "afternoon" => Some(ClockTime::new(15, 0)),
        "evening" => Some(ClockTime::new(18, 0)),
        "night" => Some(ClockTime::new(21, 0)),
        _ => None,
    }
}

fn overlaps(span: &Range<usize>, taken: &[Range<usize>]) -> bool {
    taken
        .iter()
        .any(|other| span.start < other.end && other.start < span.end)
}

fn group_span(caps: &Captures) -> Range<usize> {
    caps.get(0).map(|m| m.range()).unwrap_or(0..0)
}

fn clock_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:\b(?P<at>at)\s+)?\b(?:(?P<named>noon|midnight)\b|(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?(?:\s*(?P<meridiem>[ap]\.m\.|[ap]m\b)|\b))",
        )
        .expect("clock pattern should compile")
    })
}

/// Finds a clock phrase outside of `taken`. A bare number only counts as a
/// clock when it is introduced by "at" or carries minutes or am/pm.
fn find_clock(text: &str, taken: &[Range<usize>]) -> Option<(ClockTime, Range<usize>)> {
    clock_regex().captures_iter(text).find_map(|caps| {
        let span = group_span(&caps);
        if overlaps(&span, taken) {
            return None;
        }
        if let Some(named) = caps.name("named") {
            let clock = match named.as_str().to_lowercase().as_str() {
                "noon" => ClockTime::new(12, 0),
                _ => ClockTime::new(0, 0),
            };
            return Some((clock, span));
        }
        let explicit = caps.name("at").is_some()
            || caps.name("minute").is_some()
            || caps.name("meridiem").is_some();
        if !explicit {
            return None;
        }
        let hour = caps.name("hour")?.as_str().parse().ok()?;
        let minute = match caps.name("minute") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let meridiem = caps.name("meridiem").map(|m| {
            if m.as_str().to_lowercase().starts_with('a') {
                Meridiem::Am
            } else {
                Meridiem::Pm
            }
        });
        Some((
            ClockTime {
                hour,
                minute,
                meridiem,
            },
            span,
        ))
    })
}

fn part_of_day_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&[r"(?i)\b(?:(?:in\s+the|this)\s+)?", PART_OF_DAY, r"\b"].concat())
            .expect("part of day pattern should compile")
    })
}

fn find_part_of_day(text: &str, taken: &[Range<usize>]) -> Option<(ClockTime, Range<usize>)> {
    part_of_day_regex().captures_iter(text).find_map(|caps| {
        let span = group_span(&caps);
        if overlaps(&span, taken) {
            return None;
        }
        Some((part_of_day(caps.name("part")?.as_str())?, span))
    })
}

/// Completes a recurrence phrase with the clock found anywhere else in the
/// utterance, falling back to the part of day named in the phrase itself.
fn recurrence_match(
    text: &str,
    core: Range<usize>,
    part: Option<ClockTime>,
    build: impl FnOnce(Option<ClockTime>) -> RecurrencePhrase,
) -> PhraseMatch {
    let mut spans = vec![core];
    let time = match find_clock(text, &spans) {
        Some((clock, span)) => {
            spans.push(span);
            Some(clock)
        }
        None => part,
    };
    PhraseMatch {
        expression: TimeExpression::Recurrence(build(time)),
        spans,
    }
}

fn relative_offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bin\s+(?:(?P<half>half\s+an\s+hour)|(?P<amount>\d{1,6}|an?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\s+(?P<unit>minutes?|mins?|hours?|hrs?|days?|weeks?))\b",
        )
        .expect("relative offset pattern should compile")
    })
}

pub fn match_relative_offset(text: &str) -> Option<PhraseMatch> {
    let caps = relative_offset_regex().captures(text)?;
    let (amount, unit) = if caps.name("half").is_some() {
        (30, OffsetUnit::Minutes)
    } else {
        let amount = parse_count(caps.name("amount")?.as_str())?;
        let unit = match caps.name("unit")?.as_str().to_lowercase().chars().next()? {
            'm' => OffsetUnit::Minutes,
            'h' => OffsetUnit::Hours,
            'd' => OffsetUnit::Days,
            _ => OffsetUnit::Weeks,
        };
        (amount, unit)
    };
    Some(PhraseMatch {
        expression: TimeExpression::RelativeOffset { amount, unit },
        spans: vec![group_span(&caps)],
    })
}

fn day_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&[r"(?i)\b", DAY, r"\b"].concat()).expect("weekday pattern should compile")
    })
}

fn day_list_pattern() -> String {
    [r"(?P<days>", DAY, r"(?:", DAY_SEPARATOR, DAY, r")*)\b"].concat()
}

fn parse_day_list(list: &str) -> Vec<Weekday> {
    day_regex()
        .find_iter(list)
        .filter_map(|m| parse_weekday(m.as_str()))
        .collect()
}

fn weekly_interval_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            &[
                r"(?i)\b(?:every\s+(?:(?P<n>\d{1,2}|other|two|three|four)\s+)?weeks?|weekly)\s+on\s+",
                &day_list_pattern(),
                PART_OF_DAY_SUFFIX,
            ]
            .concat(),
        )
        .expect("weekly interval pattern should compile")
    })
}

/// "every 2 weeks on Monday", "weekly on Sunday"
pub fn match_weekly_interval(text: &str) -> Option<PhraseMatch> {
    let caps = weekly_interval_regex().captures(text)?;
    let interval = match caps.name("n") {
        Some(n) => parse_count(n.as_str())?,
        None => 1,
    };
    let days = parse_day_list(caps.name("days")?.as_str());
    let part = caps.name("part").and_then(|p| part_of_day(p.as_str()));
    Some(recurrence_match(text, group_span(&caps), part, |time| {
        RecurrencePhrase::Weekly {
            days,
            interval,
            time,
        }
    }))
}

fn weekday_list_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            &[
                r"(?i)\b(?:every|each)\s+(?:(?P<other>other)\s+)?",
                &day_list_pattern(),
                PART_OF_DAY_SUFFIX,
            ]
            .concat(),
        )
        .expect("weekday list pattern should compile")
    })
}

/// "every Monday and Thursday", "every Mon, Wed, Fri", "every other Tuesday"
pub fn match_weekday_list(text: &str) -> Option<PhraseMatch> {
    let caps = weekday_list_regex().captures(text)?;
    let interval = if caps.name("other").is_some() { 2 } else { 1 };
    let days = parse_day_list(caps.name("days")?.as_str());
    let part = caps.name("part").and_then(|p| part_of_day(p.as_str()));
    Some(recurrence_match(text, group_span(&caps), part, |time| {
        RecurrencePhrase::Weekly {
            days,
            interval,
            time,
        }
    }))
}

fn weekday_group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            &[
                r"(?i)\b(?:every|each|on)\s+(?P<group>weekday|weekend)s?\b",
                PART_OF_DAY_SUFFIX,
            ]
            .concat(),
        )
        .expect("weekday group pattern should compile")
    })
}

/// "every weekday", "every weekend"
pub fn match_weekday_group(text: &str) -> Option<PhraseMatch> {
    let caps = weekday_group_regex().captures(text)?;
    let days = if caps.name("group")?.as_str().eq_ignore_ascii_case("weekday") {
        vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
    } else {
        vec![Weekday::Sat, Weekday::Sun]
    };
    let part = caps.name("part").and_then(|p| part_of_day(p.as_str()));
    Some(recurrence_match(text, group_span(&caps), part, |time| {
        RecurrencePhrase::Weekly {
            days,
            interval: 1,
            time,
        }
    }))
}

fn month_day(caps: &Captures) -> Option<MonthDay> {
    if caps.name("last").is_some() {
        return Some(MonthDay::Last);
    }
    caps.name("day")?.as_str().parse().ok().map(MonthDay::Day)
}

fn monthly_ordinal_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:(?:on|every|each)\s+)?(?:the\s+)?(?:(?P<day>\d{1,2})(?:st|nd|rd|th)?|(?P<last>last))(?:\s+day)?\s+of\s+(?:every|each)\s+(?:(?P<n>\d{1,2}|other)\s+)?months?\b",
        )
        .expect("monthly ordinal pattern should compile")
    })
}

/// "on the 1st of every month", "on the last day of every month"
pub fn match_monthly_ordinal(text: &str) -> Option<PhraseMatch> {
    let caps = monthly_ordinal_regex().captures(text)?;
    let day = month_day(&caps)?;
    let interval = match caps.name("n") {
        Some(n) => parse_count(n.as_str())?,
        None => 1,
    };
    Some(recurrence_match(text, group_span(&caps), None, |time| {
        RecurrencePhrase::Monthly {
            day,
            interval,
            time,
        }
    }))
}

fn monthly_interval_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:every\s+(?:(?P<n>\d{1,2}|other)\s+)?months?|monthly)\s+on\s+(?:the\s+)?(?:(?P<day>\d{1,2})(?:st|nd|rd|th)?|(?P<last>last)(?:\s+day)?)\b",
        )
        .expect("monthly interval pattern should compile")
    })
}

/// "every month on the 3rd", "every 2 months on the 10th", "monthly on the 5th"
pub fn match_monthly_interval(text: &str) -> Option<PhraseMatch> {
    let caps = monthly_interval_regex().captures(text)?;
    let day = month_day(&caps)?;
    let interval = match caps.name("n") {
        Some(n) => parse_count(n.as_str())?,
        None => 1,
    };
    Some(recurrence_match(text, group_span(&caps), None, |time| {
        RecurrencePhrase::Monthly {
            day,
            interval,
            time,
        }
    }))
}

fn daily_generic_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            &[
                r"(?i)\b(?:(?:every\s*day|daily|each\s+day|every\s+(?:(?P<other>other)|(?P<n>\d{1,3}|two|three|four|five|six|seven))\s+days?)\b",
                PART_OF_DAY_SUFFIX,
                r"|every\s+(?P<each>morning|afternoon|evening|night)\b)",
            ]
            .concat(),
        )
        .expect("daily pattern should compile")
    })
}

/// "every day", "daily", "every other day", "every 3 days", "every morning",
/// "every day in the evening"
pub fn match_daily_generic(text: &str) -> Option<PhraseMatch> {
    let caps = daily_generic_regex().captures(text)?;
    let interval = if caps.name("other").is_some() {
        2
    } else if let Some(n) = caps.name("n") {
        parse_count(n.as_str())?
    } else {
        1
    };
    let part = caps
        .name("part")
        .or_else(|| caps.name("each"))
        .and_then(|p| part_of_day(p.as_str()));
    Some(recurrence_match(text, group_span(&caps), part, |time| {
        RecurrencePhrase::Daily { interval, time }
    }))
}

fn iso_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:on\s+)?(?P<year>\d{4})-(?P<month>\d{1,2})-(?P<day>\d{1,2})\b")
            .expect("iso date pattern should compile")
    })
}

fn numeric_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:on\s+)?(?P<day>\d{1,2})[./-](?P<month>\d{1,2})[./-](?P<year>\d{4}|\d{2})\b",
        )
        .expect("numeric date pattern should compile")
    })
}

fn relative_day_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?P<word>today|tonight|tomorrow|next\s+week|next\s+month)\b")
            .expect("relative day pattern should compile")
    })
}

fn deadline_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:by|on|until|before)\s+$").expect("deadline pattern should compile")
    })
}

fn weekday_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            &[
                r"(?i)\b(?:(?P<prefix>on|next|this|coming)\s+)?(?P<weekday>",
                DAY,
                r")\b",
            ]
            .concat(),
        )
        .expect("weekday date pattern should compile")
    })
}

fn day_of_month_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\bon\s+the\s+(?P<day>\d{1,2})(?:st|nd|rd|th)?\b",
        )
        .expect("day of month pattern should compile")
    })
}

fn calendar_date(caps: &Captures) -> Option<DateSpec> {
    let mut year: i32 = caps.name("year")?.as_str().parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    Some(DateSpec::Calendar {
        year,
        month: caps.name("month")?.as_str().parse().ok()?,
        day: caps.name("day")?.as_str().parse().ok()?,
    })
}

/// A date phrase with the clock it implies, e.g. "tonight"
struct DateMatch {
    date: DateSpec,
    implied_time: Option<ClockTime>,
    span: Range<usize>,
}

fn find_date(text: &str) -> Option<DateMatch> {
    let plain = |date: DateSpec, caps: &Captures| DateMatch {
        date,
        implied_time: None,
        span: group_span(caps),
    };

    if let Some(caps) = iso_date_regex().captures(text) {
        return Some(plain(calendar_date(&caps)?, &caps));
    }
    if let Some(caps) = numeric_date_regex().captures(text) {
        return Some(plain(calendar_date(&caps)?, &caps));
    }
    if let Some(caps) = relative_day_regex().captures(text) {
        let word = whitespace_regex()
            .replace_all(&caps.name("word")?.as_str().to_lowercase(), " ")
            .into_owned();
        let (date, implied_time) = match word.as_str() {
            "today" => (DateSpec::Today, None),
            "tonight" => (DateSpec::Today, Some(ClockTime::new(21, 0))),
            "tomorrow" => (DateSpec::Tomorrow, None),
            "next week" => (DateSpec::NextWeek, None),
            _ => (DateSpec::NextMonth, None),
        };
        return Some(DateMatch {
            date,
            implied_time,
            span: group_span(&caps),
        });
    }
    // Abbreviated weekdays ("sat", "sun") are ordinary words, so they only
    // count as dates when introduced by "on" or "next"
    let weekday = weekday_date_regex().captures_iter(text).find_map(|caps| {
        let name = caps.name("weekday")?.as_str();
        if caps.name("prefix").is_none() && name.len() <= 4 {
            return None;
        }
        Some(plain(DateSpec::Weekday(parse_weekday(name)?), &caps))
    });
    if weekday.is_some() {
        return weekday;
    }
    let caps = day_of_month_regex().captures(text)?;
    Some(plain(
        DateSpec::DayOfMonth(caps.name("day")?.as_str().parse().ok()?),
        &caps,
    ))
}

fn is_relative_day(date: Option<DateSpec>) -> bool {
    matches!(
        date,
        Some(DateSpec::Today | DateSpec::Tomorrow | DateSpec::NextWeek | DateSpec::NextMonth)
    )
}

/// A date word without a clock only reads as a reminder when the utterance
/// asks for one or the word is a deadline, "pay bills by tomorrow"
fn in_reminder_frame(text: &str, date_span: &Range<usize>) -> bool {
    is_reminder_request(text) || deadline_regex().is_match(&text[..date_span.start])
}

/// "tomorrow at 3 PM", "on the 15th", "at 18:30", "on 01/02/2025"
pub fn match_absolute(text: &str) -> Option<PhraseMatch> {
    let mut spans = Vec::new();
    let mut implied_time = None;
    let date = find_date(text).map(|found| {
        spans.push(found.span);
        implied_time = found.implied_time;
        found.date
    });

    let clock = find_clock(text, &spans).or_else(|| find_part_of_day(text, &spans));
    let time = match clock {
        Some((clock, span)) => {
            spans.push(span);
            Some(clock)
        }
        None => implied_time,
    };

    if date.is_none() && time.is_none() {
        return None;
    }
    // "how are you doing today?" names a day but asks for nothing
    if time.is_none() && is_relative_day(date) {
        let framed = spans
            .first()
            .map_or(false, |span| in_reminder_frame(text, span));
        if !framed {
            return None;
        }
    }
    Some(PhraseMatch {
        expression: TimeExpression::Absolute { date, time },
        spans,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str) -> ParseCandidate {
        match_utterance(text).expect("utterance should match")
    }

    fn pm(hour: u32, minute: u32) -> ClockTime {
        ClockTime {
            hour,
            minute,
            meridiem: Some(Meridiem::Pm),
        }
    }

    #[test]
    fn reads_monthly_rent_reminder() {
        let c = candidate("Remind me to pay rent on the 1st of every month");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Monthly {
                day: MonthDay::Day(1),
                interval: 1,
                time: None,
            })
        );
        assert_eq!(c.payload, "pay rent");
        assert_eq!(c.expression_text, "on the 1st of every month");
    }

    #[test]
    fn reads_relative_offset() {
        let c = candidate("Remind me to check email in 10 minutes");
        assert_eq!(
            c.expression,
            TimeExpression::RelativeOffset {
                amount: 10,
                unit: OffsetUnit::Minutes
            }
        );
        assert_eq!(c.payload, "check email");

        let c = candidate("in an hour remind me to stretch");
        assert_eq!(
            c.expression,
            TimeExpression::RelativeOffset {
                amount: 1,
                unit: OffsetUnit::Hours
            }
        );
        assert_eq!(c.payload, "stretch");

        let c = candidate("take out the bins in half an hour");
        assert_eq!(
            c.expression,
            TimeExpression::RelativeOffset {
                amount: 30,
                unit: OffsetUnit::Minutes
            }
        );
    }

    #[test]
    fn weekday_list_is_read_as_a_whole() {
        let c = candidate("Remind me to water plants every Monday and Thursday at 6 PM");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly {
                days: vec![Weekday::Mon, Weekday::Thu],
                interval: 1,
                time: Some(pm(6, 0)),
            })
        );
        assert_eq!(c.payload, "water plants");

        let c = candidate("gym every Mon, Wed, Fri at 7am");
        match c.expression {
            TimeExpression::Recurrence(RecurrencePhrase::Weekly { days, .. }) => {
                assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri])
            }
            other => panic!("unexpected expression {:?}", other),
        }
        assert_eq!(c.payload, "gym");
    }

    #[test]
    fn clock_before_recurrence_belongs_to_it() {
        let c = candidate("at 18:30 every other Tuesday call grandma");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly {
                days: vec![Weekday::Tue],
                interval: 2,
                time: Some(ClockTime::new(18, 30)),
            })
        );
        assert_eq!(c.payload, "call grandma");
    }

    #[test]
    fn weekly_interval_and_groups() {
        let m = match_weekly_interval("every 2 weeks on Monday review budget").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly {
                days: vec![Weekday::Mon],
                interval: 2,
                time: None,
            })
        );
        let m = match_weekly_interval("weekly on Sunday at 8pm plan the week").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly {
                days: vec![Weekday::Sun],
                interval: 1,
                time: Some(pm(8, 0)),
            })
        );
        let m = match_weekday_group("stand up every weekday at 9:15").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly {
                days: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri
                ],
                interval: 1,
                time: Some(ClockTime::new(9, 15)),
            })
        );
        assert!(match_weekday_group("every weekend morning").is_some());
    }

    #[test]
    fn monthly_phrases() {
        let m = match_monthly_ordinal("on the last day of every month").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Monthly {
                day: MonthDay::Last,
                interval: 1,
                time: None,
            })
        );
        let m = match_monthly_interval("every 2 months on the 10th at noon").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Monthly {
                day: MonthDay::Day(10),
                interval: 2,
                time: Some(ClockTime::new(12, 0)),
            })
        );
        assert!(match_monthly_interval("monthly on the 5th").is_some());
        assert!(match_monthly_ordinal("every 15th of each month").is_some());
    }

    #[test]
    fn daily_phrases() {
        let m = match_daily_generic("every morning").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Daily {
                interval: 1,
                time: Some(ClockTime::new(9, 0)),
            })
        );
        let c = candidate("Remind me to take vitamins every morning at 8 AM");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Daily {
                interval: 1,
                time: Some(ClockTime {
                    hour: 8,
                    minute: 0,
                    meridiem: Some(Meridiem::Am)
                }),
            })
        );
        assert_eq!(c.payload, "take vitamins");
        let m = match_daily_generic("every 3 days").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Daily {
                interval: 3,
                time: None,
            })
        );
        assert!(match_daily_generic("daily").is_some());
        assert!(match_daily_generic("every weekday").is_none());
    }

    #[test]
    fn absolute_phrases() {
        let c = candidate("remind me tomorrow at 3 PM to call the dentist");
        assert_eq!(
            c.expression,
            TimeExpression::Absolute {
                date: Some(DateSpec::Tomorrow),
                time: Some(pm(3, 0)),
            }
        );
        assert_eq!(c.payload, "call the dentist");

        let c = candidate("Remind me about the invoice on the 15th");
        assert_eq!(
            c.expression,
            TimeExpression::Absolute {
                date: Some(DateSpec::DayOfMonth(15)),
                time: None,
            }
        );
        assert_eq!(c.payload, "the invoice");

        let c = candidate("renew passport on 01/02/25");
        assert_eq!(
            c.expression,
            TimeExpression::Absolute {
                date: Some(DateSpec::Calendar {
                    year: 2025,
                    month: 2,
                    day: 1
                }),
                time: None,
            }
        );

        let c = candidate("submit report next Friday evening");
        assert_eq!(
            c.expression,
            TimeExpression::Absolute {
                date: Some(DateSpec::Weekday(Weekday::Fri)),
                time: Some(ClockTime::new(18, 0)),
            }
        );
        assert_eq!(c.payload, "submit report");

        let c = candidate("call mom tonight");
        assert_eq!(
            c.expression,
            TimeExpression::Absolute {
                date: Some(DateSpec::Today),
                time: Some(ClockTime::new(21, 0)),
            }
        );
    }

    #[test]
    fn impossible_clock_values_are_still_matched() {
        let m = match_absolute("at 25 feed the cat").unwrap();
        assert_eq!(
            m.expression,
            TimeExpression::Absolute {
                date: None,
                time: Some(ClockTime::new(25, 0)),
            }
        );
        assert_eq!(ClockTime::new(25, 0).to_time_of_day(), None);
        assert_eq!(pm(13, 0).to_time_of_day(), None);
        assert_eq!(pm(12, 0).to_time_of_day(), TimeOfDay::new(12, 0));
        assert_eq!(
            ClockTime {
                hour: 12,
                minute: 30,
                meridiem: Some(Meridiem::Am)
            }
            .to_time_of_day(),
            TimeOfDay::new(0, 30)
        );
    }

    #[test]
    fn utterances_without_time_do_not_match() {
        assert!(match_utterance("how are you doing today?").is_none());
        assert!(match_utterance("see you tomorrow").is_none());
        assert!(match_utterance("I read the 2nd chapter").is_none());
        assert!(match_utterance("how are you?").is_none());
        assert!(match_utterance("buy 3 apples").is_none());
        assert!(match_utterance("I sat down with a friend").is_none());
        assert!(match_utterance("").is_none());
    }

    #[test]
    fn date_words_need_a_reminder_frame() {
        let c = candidate("Remind me to call mom today");
        assert_eq!(
            c.expression,
            TimeExpression::Absolute {
                date: Some(DateSpec::Today),
                time: None,
            }
        );
        assert_eq!(c.payload, "call mom");

        let c = candidate("pay bills by tomorrow");
        assert_eq!(
            c.expression,
            TimeExpression::Absolute {
                date: Some(DateSpec::Tomorrow),
                time: None,
            }
        );
        assert_eq!(c.payload, "pay bills");

        // A clock makes the date unambiguous
        assert!(match_utterance("dinner tomorrow at 7pm").is_some());
    }

    #[test]
    fn part_of_day_after_recurrence() {
        let c = candidate("Remind me to stretch every day in the evening");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Daily {
                interval: 1,
                time: Some(ClockTime::new(18, 0)),
            })
        );
        assert_eq!(c.payload, "stretch");

        let c = candidate("Remind me to stretch every weekday in the morning");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly {
                days: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri
                ],
                interval: 1,
                time: Some(ClockTime::new(9, 0)),
            })
        );
        assert_eq!(c.payload, "stretch");

        let c = candidate("lock the door every other day at night");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Daily {
                interval: 2,
                time: Some(ClockTime::new(21, 0)),
            })
        );
        assert_eq!(c.payload, "lock the door");

        // An explicit clock wins over the part of day
        let c = candidate("call home every Sunday evening at 7:30pm");
        assert_eq!(
            c.expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly {
                days: vec![Weekday::Sun],
                interval: 1,
                time: Some(pm(7, 30)),
            })
        );
        assert_eq!(c.payload, "call home");
    }

    #[test]
    fn patterns_are_ordered_by_specificity() {
        let names = PHRASE_PATTERNS.iter().map(|p| p.name).collect::<Vec<_>>();
        assert_eq!(names.first(), Some(&"relative_offset"));
        assert_eq!(names.last(), Some(&"absolute"));
        // The absolute pattern alone would pick a single weekday
        assert!(match_absolute("every Monday and Thursday").is_some());
        assert!(matches!(
            candidate("every Monday and Thursday").expression,
            TimeExpression::Recurrence(RecurrencePhrase::Weekly { .. })
        ));
    }

    #[test]
    fn payload_is_cleaned() {
        assert_eq!(clean_payload("  Remind me to   buy milk , "), "buy milk");
        assert_eq!(clean_payload("set a reminder to call Bob."), "call Bob");
        assert_eq!(clean_payload("remind me"), "");
    }

    #[test]
    fn connectives_stay_with_the_text() {
        assert_eq!(candidate("Remind me to log on at 9am tomorrow").payload, "log on");
        assert_eq!(candidate("remind me to sign in at 10:00").payload, "sign in");
        assert_eq!(candidate("Remind me to pay rent on tomorrow").payload, "pay rent");
    }
}
