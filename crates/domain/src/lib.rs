mod date;
mod grammar;
mod intent;
mod recurrence;
mod resolver;
mod schedule_descriptor;
mod shared;

pub use grammar::{
    match_utterance, ClockTime, DateSpec, Meridiem, OffsetUnit, ParseCandidate, PhraseMatch,
    PhrasePattern, RecurrencePhrase, TimeExpression, PHRASE_PATTERNS,
};
pub use intent::is_reminder_request;
pub use recurrence::{
    next_after, weekday_name, Frequency, InvalidRuleError, MonthDay, RecurrenceRule, TimeOfDay,
};
pub use resolver::{ParseError, Resolver};
pub use schedule_descriptor::{
    EndConditionError, InvalidStatusError, ScheduleDescriptor, ScheduleKind, ScheduleStatus, TransitionError,
};
pub use shared::entity::{Entity, InvalidIDError, ID};
