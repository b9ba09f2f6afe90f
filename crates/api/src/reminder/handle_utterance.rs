use super::create_reminder::{
    reminder_outcome_response, CreateReminderUseCase, UseCaseError, UseCaseRes,
};
use crate::{
    error::NudgeError,
    shared::usecase::{execute, UseCase},
};
use actix_web::{web, HttpResponse};
use nudge_api_structs::handle_utterance::*;
use nudge_domain::is_reminder_request;
use nudge_infra::NudgeContext;
use tracing::debug;

pub async fn handle_utterance_controller(
    path: web::Path<PathParams>,
    body: web::Json<RequestBody>,
    ctx: web::Data<NudgeContext>,
) -> Result<HttpResponse, NudgeError> {
    let body = body.into_inner();
    let usecase = HandleUtteranceUseCase {
        owner_id: path.into_inner().owner_id,
        text: body.text,
        timezone: body.timezone,
    };

    execute(usecase, &ctx)
        .await
        .map(reminder_outcome_response)
        .map_err(NudgeError::from)
}

/// Free chat from a messaging channel. Only text that asks for a reminder
/// reaches the grammar, everything else is handed back for the caller to
/// answer.
#[derive(Debug)]
pub struct HandleUtteranceUseCase {
    pub owner_id: String,
    pub text: String,
    pub timezone: Option<String>,
}

#[async_trait::async_trait(?Send)]
impl UseCase for HandleUtteranceUseCase {
    type Response = UseCaseRes;

    type Error = UseCaseError;

    const NAME: &'static str = "HandleUtterance";

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Error> {
        if !is_reminder_request(&self.text) {
            debug!("Utterance does not ask for a reminder");
            return Ok(UseCaseRes::NotAReminder(self.text.clone()));
        }

        CreateReminderUseCase {
            owner_id: self.owner_id.clone(),
            text: self.text.clone(),
            timezone: self.timezone.clone(),
            ends_at: None,
        }
        .execute(ctx)
        .await
    }
}
