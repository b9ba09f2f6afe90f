use crate::{
    error::NudgeError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use nudge_api_structs::{create_reminder::*, dtos::ReminderDTO, CreateReminderResponse};
use nudge_domain::{match_utterance, EndConditionError, ParseError, Resolver, ScheduleDescriptor};
use nudge_infra::NudgeContext;
use tracing::info;

pub async fn create_reminder_controller(
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let body = body.into_inner();
    let usecase = CreateReminderUseCase {
        owner_id: path.into_inner().owner_id,
        text: body.text,
        timezone: body.timezone,
        ends_at: body.ends_at,
    };

    execute(usecase, &ctx)
        .await
        .map(reminder_outcome_response)
        .map_err(NudgeError::from)
}

/// 201 with the reminder when one was scheduled, 200 with the text otherwise
pub fn reminder_outcome_response(res: UseCaseRes) -> HttpResponse {
    match res {
        UseCaseRes::Scheduled(descriptor) => {
            HttpResponse::Created().json(CreateReminderResponse::Scheduled {
                reminder: ReminderDTO::new(descriptor),
            })
        }
        UseCaseRes::NotAReminder(text) => {
            HttpResponse::Ok().json(CreateReminderResponse::NotAReminder { text })
        }
    }
}

pub fn parse_timezone(timezone: Option<&str>, default: Tz) -> Result<Tz, UseCaseError> {
    match timezone {
        None => Ok(default),
        Some(tzid) => tzid
            .parse()
            .map_err(|_| UseCaseError::InvalidTimezone(tzid.to_string())),
    }
}

#[derive(Debug)]
pub struct CreateReminderUseCase {
    pub owner_id: String,
    pub text: String,
    pub timezone: Option<String>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseRes {
    Scheduled(ScheduleDescriptor),
    /// No time expression was recognized, the text is handed back untouched
    NotAReminder(String),
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidTimezone(String),
    Unresolvable(ParseError),
    EndOnOneTimeReminder,
    Storage,
}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::InvalidTimezone(tzid) => Self::BadClientData(format!(
                "Invalid timezone: {}. It should be a valid IANA TimeZone.",
                tzid
            )),
            UseCaseError::Unresolvable(e) => Self::UnprocessableReminder(e.to_string()),
            UseCaseError::EndOnOneTimeReminder => {
                Self::BadClientData(EndConditionError::NotRecurring.to_string())
            }
            UseCaseError::Storage => Self::InternalError,
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CreateReminderUseCase {
    type Response = UseCaseRes;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateReminder";

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Error> {
        let tz = parse_timezone(self.timezone.as_deref(), ctx.config.default_timezone)?;
        let candidate = match match_utterance(&self.text) {
            Some(candidate) => candidate,
            None => return Ok(UseCaseRes::NotAReminder(self.text.clone())),
        };

        let now = ctx.sys.now();
        let mut descriptor = Resolver::new(ctx.config.max_payload_length)
            .resolve(&candidate, &self.owner_id, now, tz)
            .map_err(UseCaseError::Unresolvable)?;
        if let Some(ends_at) = self.ends_at {
            descriptor.set_end(ends_at, now).map_err(|e| match e {
                EndConditionError::NotRecurring => UseCaseError::EndOnOneTimeReminder,
                EndConditionError::NothingLeft => UseCaseError::Unresolvable(ParseError::PastTime),
            })?;
        }

        ctx.repos
            .schedule_descriptors
            .insert(&descriptor)
            .await
            .map_err(|_| UseCaseError::Storage)?;
        info!(
            reminder_id = %descriptor.id,
            owner_id = %descriptor.owner_id,
            "Scheduled reminder {}",
            descriptor.describe_schedule()
        );

        Ok(UseCaseRes::Scheduled(descriptor))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::test_utils::{setup_at, utc};
    use chrono::{Duration, TimeZone};
    use chrono_tz::America::New_York;
    use nudge_domain::{ScheduleKind, ScheduleStatus};

    fn usecase(text: &str, timezone: Option<&str>) -> CreateReminderUseCase {
        CreateReminderUseCase {
            owner_id: "42".into(),
            text: text.into(),
            timezone: timezone.map(String::from),
            ends_at: None,
        }
    }

    fn scheduled(res: UseCaseRes) -> ScheduleDescriptor {
        match res {
            UseCaseRes::Scheduled(descriptor) => descriptor,
            other => panic!("expected a scheduled reminder, got {:?}", other),
        }
    }

    #[actix_web::test]
    async fn schedules_monthly_rent() {
        let ctx = setup_at(utc(2024, 1, 15, 15, 0));
        let mut usecase = usecase(
            "Remind me to pay rent on the 1st of every month",
            Some("America/New_York"),
        );

        let descriptor = scheduled(usecase.execute(&ctx).await.unwrap());
        assert_eq!(descriptor.payload, "pay rent");
        assert_eq!(descriptor.owner_id, "42");
        assert_eq!(descriptor.timezone, New_York);
        assert_eq!(descriptor.next_fire_at, Some(utc(2024, 2, 1, 5, 0)));

        let stored = ctx
            .repos
            .schedule_descriptors
            .find(&descriptor.id)
            .await
            .unwrap();
        assert_eq!(stored, descriptor);
    }

    #[actix_web::test]
    async fn schedules_relative_offset() {
        let now = utc(2024, 1, 15, 15, 0);
        let ctx = setup_at(now);
        let mut usecase = usecase("Remind me to check email in 10 minutes", None);

        let descriptor = scheduled(usecase.execute(&ctx).await.unwrap());
        assert_eq!(descriptor.payload, "check email");
        assert_eq!(
            descriptor.kind,
            ScheduleKind::Once {
                at: now + Duration::minutes(10)
            }
        );
        assert_eq!(descriptor.status, ScheduleStatus::Active);
    }

    #[actix_web::test]
    async fn hands_back_text_without_time_expression() {
        let ctx = setup_at(utc(2024, 1, 15, 15, 0));
        let mut usecase = usecase("Remind me to buy milk", None);

        let res = usecase.execute(&ctx).await.unwrap();
        assert_eq!(res, UseCaseRes::NotAReminder("Remind me to buy milk".into()));
        assert!(ctx
            .repos
            .schedule_descriptors
            .find_by_owner("42")
            .await
            .is_empty());
    }

    #[actix_web::test]
    async fn rejects_invalid_timezone() {
        let ctx = setup_at(utc(2024, 1, 15, 15, 0));
        let mut usecase = usecase("check email in 10 minutes", Some("Mars/Olympus"));

        let res = usecase.execute(&ctx).await;
        assert_eq!(
            res.unwrap_err(),
            UseCaseError::InvalidTimezone("Mars/Olympus".into())
        );
    }

    #[actix_web::test]
    async fn rejects_unresolvable_reminders() {
        let ctx = setup_at(utc(2024, 1, 15, 22, 0));

        let mut past = usecase("call mom today at 9am", Some("America/New_York"));
        assert_eq!(
            past.execute(&ctx).await.unwrap_err(),
            UseCaseError::Unresolvable(ParseError::PastTime)
        );
        let mut empty = usecase("Remind me in 10 minutes", None);
        assert_eq!(
            empty.execute(&ctx).await.unwrap_err(),
            UseCaseError::Unresolvable(ParseError::EmptyPayload)
        );
    }

    #[actix_web::test]
    async fn applies_end_to_recurring_reminders() {
        let ctx = setup_at(utc(2024, 1, 15, 15, 0));
        let ends_at = New_York
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);

        let mut monthly = CreateReminderUseCase {
            ends_at: Some(ends_at),
            ..usecase(
                "Remind me to pay rent on the 1st of every month",
                Some("America/New_York"),
            )
        };
        let descriptor = scheduled(monthly.execute(&ctx).await.unwrap());
        match &descriptor.kind {
            ScheduleKind::Recurring { rule } => assert_eq!(rule.ends_at, Some(ends_at)),
            other => panic!("unexpected kind {:?}", other),
        }

        let mut too_early = CreateReminderUseCase {
            ends_at: Some(utc(2024, 1, 20, 0, 0)),
            ..monthly
        };
        assert_eq!(
            too_early.execute(&ctx).await.unwrap_err(),
            UseCaseError::Unresolvable(ParseError::PastTime)
        );
    }

    #[actix_web::test]
    async fn rejects_end_on_one_time_reminders() {
        let ctx = setup_at(utc(2024, 1, 15, 15, 0));
        let mut once = CreateReminderUseCase {
            ends_at: Some(utc(2024, 2, 1, 0, 0)),
            ..usecase("Remind me to check email in 10 minutes", None)
        };

        assert_eq!(
            once.execute(&ctx).await.unwrap_err(),
            UseCaseError::EndOnOneTimeReminder
        );
        assert!(ctx
            .repos
            .schedule_descriptors
            .find_by_owner("42")
            .await
            .is_empty());
    }
}
