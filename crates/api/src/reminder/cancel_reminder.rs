use super::change_reminder::UseCaseError;
use crate::{
    error::NudgeError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use nudge_api_structs::cancel_reminder::*;
use nudge_domain::{ScheduleDescriptor, ID};
use nudge_infra::NudgeContext;
use tracing::info;

pub async fn cancel_reminder_controller(
    path: web::Path<PathParams>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let usecase = CancelReminderUseCase {
        reminder_id: path.reminder_id.clone(),
    };

    execute(usecase, &ctx)
        .await
        .map(|reminder| HttpResponse::Ok().json(APIResponse::new(reminder)))
        .map_err(NudgeError::from)
}

/// Cancels a reminder for good. The record is kept so that it still shows
/// up when listing every reminder of the owner.
#[derive(Debug)]
pub struct CancelReminderUseCase {
    pub reminder_id: ID,
}

#[async_trait::async_trait(?Send)]
impl UseCase for CancelReminderUseCase {
    type Response = ScheduleDescriptor;

    type Error = UseCaseError;

    const NAME: &'static str = "CancelReminder";

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Error> {
        let cancelled = ctx
            .repos
            .schedule_descriptors
            .cancel(&self.reminder_id)
            .await
            .map_err(|e| UseCaseError::new(&self.reminder_id, e))?;
        info!(reminder_id = %cancelled.id, "Cancelled reminder");
        Ok(cancelled)
    }
}
