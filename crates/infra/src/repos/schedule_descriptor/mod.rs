mod inmemory;
mod postgres;

use chrono::{DateTime, Utc};
pub use inmemory::InMemoryScheduleDescriptorRepo;
use nudge_domain::{ScheduleDescriptor, TransitionError, ID};
pub use postgres::PostgresScheduleDescriptorRepo;
use thiserror::Error;

/// Optimistic retries of a user initiated change before giving up
const MAX_MODIFY_ATTEMPTS: usize = 5;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("The reminder was changed by someone else")]
    VersionConflict,
    #[error("The reminder was not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ModifyError {
    #[error("The reminder was not found")]
    NotFound,
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("The reminder kept changing while it was being updated")]
    Contended,
    #[error(transparent)]
    Storage(anyhow::Error),
}

pub type Change = dyn Fn(&mut ScheduleDescriptor) -> Result<(), TransitionError> + Send + Sync;

#[async_trait::async_trait]
pub trait IScheduleDescriptorRepo: Send + Sync {
    async fn insert(&self, descriptor: &ScheduleDescriptor) -> anyhow::Result<()>;
    async fn find(&self, descriptor_id: &ID) -> Option<ScheduleDescriptor>;
    /// Stores `descriptor` if the stored version is still `expected_version`
    /// and returns it with its version bumped
    async fn update(
        &self,
        descriptor: &ScheduleDescriptor,
        expected_version: i64,
    ) -> Result<ScheduleDescriptor, UpdateError>;
    /// Active descriptors due at or before `before` that nobody is firing,
    /// earliest first with ties broken by id
    async fn find_due(
        &self,
        before: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<ScheduleDescriptor>>;
    /// Every descriptor of the owner, including finished ones, ordered by
    /// their next fire time with finished ones last
    async fn find_by_owner(&self, owner_id: &str) -> Vec<ScheduleDescriptor>;

    /// Applies `change` to the latest stored version of a descriptor,
    /// retrying when it was modified in between
    async fn modify(
        &self,
        descriptor_id: &ID,
        change: &Change,
    ) -> Result<ScheduleDescriptor, ModifyError> {
        for _ in 0..MAX_MODIFY_ATTEMPTS {
            let mut descriptor = self
                .find(descriptor_id)
                .await
                .ok_or(ModifyError::NotFound)?;
            let expected_version = descriptor.version;
            change(&mut descriptor)?;
            match self.update(&descriptor, expected_version).await {
                Ok(stored) => return Ok(stored),
                Err(UpdateError::VersionConflict) => continue,
                Err(UpdateError::NotFound) => return Err(ModifyError::NotFound),
                Err(UpdateError::Storage(e)) => return Err(ModifyError::Storage(e)),
            }
        }
        Err(ModifyError::Contended)
    }

    async fn cancel(&self, descriptor_id: &ID) -> Result<ScheduleDescriptor, ModifyError> {
        self.modify(descriptor_id, &|descriptor: &mut ScheduleDescriptor| {
            descriptor.cancel()
        })
        .await
    }
}
