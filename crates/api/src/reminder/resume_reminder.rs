use super::change_reminder::UseCaseError;
use crate::{
    error::NudgeError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use nudge_api_structs::resume_reminder::*;
use nudge_domain::{ScheduleDescriptor, ID};
use nudge_infra::NudgeContext;

pub async fn resume_reminder_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let usecase = ResumeReminderUseCase {
        reminder_id: path.reminder_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Ok().json(APIResponse::new(reminder)))
        .map_err(NudgeError::from)
}

#[derive(Debug)]
pub struct ResumeReminderUseCase {
    pub reminder_id: ID,
}

#[async_trait::async_trait(?Send)]
impl UseCase for ResumeReminderUseCase {
    type Response = ScheduleDescriptor;

    type Error = UseCaseError;

    const NAME: &'static str = "ResumeReminder";

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        ctx.repos
            .schedule_descriptors
            .modify(&self.reminder_id, &move |descriptor: &mut ScheduleDescriptor| {
                descriptor.resume(now)
            })
            .await
            .map_err(|e| UseCaseError::new(&self.reminder_id, e))
    }
}
