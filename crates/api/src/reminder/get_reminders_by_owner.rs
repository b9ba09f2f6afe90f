use crate::{
    error::NudgeError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use nudge_api_structs::get_reminders_by_owner::*;
use nudge_domain::ScheduleDescriptor;
use nudge_infra::NudgeContext;

pub async fn get_reminders_by_owner_controller(
    path: web::Path<PathParams>,
    query: web::Query<QueryParams>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let usecase = GetRemindersByOwnerUseCase {
        owner_id: path.into_inner().owner_id,
        include_finished: query.all.unwrap_or(false),
    };

    execute(usecase, &ctx)
        .await
        .map(|reminders| HttpResponse::Ok().json(APIResponse::new(reminders)))
        .map_err(NudgeError::from)
}

/// Lists the reminders of an owner, soonest first. Completed and cancelled
/// reminders are only included on request.
#[derive(Debug)]
pub struct GetRemindersByOwnerUseCase {
    pub owner_id: String,
    pub include_finished: bool,
}

#[derive(Debug)]
pub enum UseCaseError {}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {}
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for GetRemindersByOwnerUseCase {
    type Response = Vec<ScheduleDescriptor>;

    type Error = UseCaseError;

    const NAME: &'static str = "GetRemindersByOwner";

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Error> {
        let mut reminders = ctx
            .repos
            .schedule_descriptors
            .find_by_owner(&self.owner_id)
            .await;
        if !self.include_finished {
            reminders.retain(|reminder| !reminder.status.is_terminal());
        }
        Ok(reminders)
    }
}
