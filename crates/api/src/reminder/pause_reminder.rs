use super::change_reminder::UseCaseError;
use crate::{
    error::NudgeError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use nudge_api_structs::pause_reminder::*;
use nudge_domain::{ScheduleDescriptor, ID};
use nudge_infra::NudgeContext;

pub async fn pause_reminder_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let usecase = PauseReminderUseCase {
        reminder_id: path.reminder_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Ok().json(APIResponse::new(reminder)))
        .map_err(NudgeError::from)
}

#[derive(Debug)]
pub struct PauseReminderUseCase {
    pub reminder_id: ID,
}

#[async_trait::async_trait(?Send)]
impl UseCase for PauseReminderUseCase {
    type Response = ScheduleDescriptor;

    type Error = UseCaseError;

    const NAME: &'static str = "PauseReminder";

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Error> {
        ctx.repos
            .schedule_descriptors
            .modify(&self.reminder_id, &|descriptor: &mut ScheduleDescriptor| {
                descriptor.pause()
            })
            .await
            .map_err(|e| UseCaseError::new(&self.reminder_id, e))
    }
}
