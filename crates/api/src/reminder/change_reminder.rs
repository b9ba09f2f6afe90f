use crate::error::NudgeError;
use nudge_domain::{TransitionError, ID};
use nudge_infra::ModifyError;
use tracing::error;

/// Failure of a user initiated status change of a reminder
#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    Rejected(TransitionError),
    Contended(ID),
    Storage,
}

impl UseCaseError {
    pub fn new(reminder_id: &ID, e: ModifyError) -> Self {
        match e {
            ModifyError::NotFound => Self::NotFound(reminder_id.clone()),
            ModifyError::Rejected(e) => Self::Rejected(e),
            ModifyError::Contended => Self::Contended(reminder_id.clone()),
            ModifyError::Storage(e) => {
                error!("Unable to store reminder {}: {:?}", reminder_id, e);
                Self::Storage
            }
        }
    }
}

impl From<UseCaseError> for NudgeError {
    fn from(e: UseCaseError) -> Self {
        match e {
            UseCaseError::NotFound(reminder_id) => Self::NotFound(format!(
                "The reminder with id: {}, was not found.",
                reminder_id
            )),
            UseCaseError::Rejected(e) => Self::Conflict(e.to_string()),
            UseCaseError::Contended(reminder_id) => Self::Conflict(format!(
                "The reminder with id: {}, is being fired right now. Try again.",
                reminder_id
            )),
            UseCaseError::Storage => Self::InternalError,
        }
    }
}
