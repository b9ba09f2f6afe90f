use super::{IScheduleDescriptorRepo, UpdateError};
use crate::repos::shared::inmemory_repo::*;
use chrono::{DateTime, Utc};
use nudge_domain::{ScheduleDescriptor, ID};

pub struct InMemoryScheduleDescriptorRepo {
    descriptors: std::sync::Mutex<Vec<ScheduleDescriptor>>,
}

impl InMemoryScheduleDescriptorRepo {
    pub fn new() -> Self {
        Self {
            descriptors: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IScheduleDescriptorRepo for InMemoryScheduleDescriptorRepo {
    async fn insert(&self, descriptor: &ScheduleDescriptor) -> anyhow::Result<()> {
        insert(descriptor, &self.descriptors);
        Ok(())
    }

    async fn find(&self, descriptor_id: &ID) -> Option<ScheduleDescriptor> {
        find(descriptor_id, &self.descriptors)
    }

    async fn update(
        &self,
        descriptor: &ScheduleDescriptor,
        expected_version: i64,
    ) -> Result<ScheduleDescriptor, UpdateError> {
        update_with(&descriptor.id, &self.descriptors, |stored| {
            if stored.version != expected_version {
                return Err(UpdateError::VersionConflict);
            }
            *stored = ScheduleDescriptor {
                version: expected_version + 1,
                ..descriptor.clone()
            };
            Ok(stored.clone())
        })
        .unwrap_or(Err(UpdateError::NotFound))
    }

    async fn find_due(
        &self,
        before: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<ScheduleDescriptor>> {
        let mut due = find_by(&self.descriptors, |descriptor| descriptor.is_due(before));
        due.sort_by(|a, b| {
            a.next_fire_at
                .cmp(&b.next_fire_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        due.truncate(limit);
        Ok(due)
    }

    async fn find_by_owner(&self, owner_id: &str) -> Vec<ScheduleDescriptor> {
        let mut descriptors = find_by(&self.descriptors, |descriptor| {
            descriptor.owner_id == owner_id
        });
        descriptors.sort_by(|a, b| {
            (a.next_fire_at.is_none(), a.next_fire_at, &a.id).cmp(&(
                b.next_fire_at.is_none(),
                b.next_fire_at,
                &b.id,
            ))
        });
        descriptors
    }
}
