use crate::shared::usecase::UseCase;
use chrono::{DateTime, Duration, Utc};
use futures::{stream, StreamExt};
use nudge_domain::{ScheduleDescriptor, ScheduleStatus, TransitionError};
use nudge_infra::{next_backoff, DeliveryError, ModifyError, NudgeContext, UpdateError};
use tracing::{debug, error, info, warn};

/// One poll of the dispatcher. Every due reminder is claimed, delivered and
/// then either advanced to its next occurrence, completed, released for a
/// later poll or cancelled.
///
/// Claims are version guarded, so when several dispatchers poll the same
/// store a reminder is delivered by at most one of them per occurrence.
#[derive(Debug)]
pub struct DispatchDueRemindersUseCase {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FireOutcome {
    Delivered,
    /// Delivery kept failing transiently, the next poll tries again
    Deferred,
    /// The owner can never be reached
    Cancelled,
    /// Someone else claimed or changed the reminder first
    Skipped,
}

#[derive(Debug, Default, PartialEq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub deferred: usize,
    pub cancelled: usize,
    pub skipped: usize,
}

impl DispatchReport {
    fn add(mut self, outcome: FireOutcome) -> Self {
        match outcome {
            FireOutcome::Delivered => self.delivered += 1,
            FireOutcome::Deferred => self.deferred += 1,
            FireOutcome::Cancelled => self.cancelled += 1,
            FireOutcome::Skipped => self.skipped += 1,
        }
        self
    }
}

#[derive(Debug)]
pub enum UseCaseError {
    Storage,
}

#[async_trait::async_trait(?Send)]
impl UseCase for DispatchDueRemindersUseCase {
    type Response = DispatchReport;

    type Error = UseCaseError;

    const NAME: &'static str = "DispatchDueReminders";

    async fn execute(&mut self, ctx: &NudgeContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.now();
        let due = ctx
            .repos
            .schedule_descriptors
            .find_due(now, ctx.config.dispatch_batch_limit)
            .await
            .map_err(|e| {
                warn!("Unable to look up due reminders: {:?}", e);
                UseCaseError::Storage
            })?;
        if due.is_empty() {
            return Ok(DispatchReport::default());
        }
        debug!("{} due reminder(s)", due.len());

        let report = stream::iter(due)
            .map(|descriptor| fire(ctx, descriptor, now))
            .buffer_unordered(ctx.config.delivery_concurrency)
            .fold(DispatchReport::default(), |report, outcome| async move {
                report.add(outcome)
            })
            .await;
        info!(
            delivered = report.delivered,
            deferred = report.deferred,
            cancelled = report.cancelled,
            skipped = report.skipped,
            "Dispatched due reminders"
        );

        Ok(report)
    }
}

/// Claims, delivers and settles a single due reminder
pub async fn fire(
    ctx: &NudgeContext,
    descriptor: ScheduleDescriptor,
    now: DateTime<Utc>,
) -> FireOutcome {
    let repo = &ctx.repos.schedule_descriptors;

    let mut claim = descriptor.clone();
    claim.claim(now, Duration::seconds(ctx.config.claim_lease_secs));
    let claimed = match repo.update(&claim, descriptor.version).await {
        Ok(claimed) => claimed,
        Err(UpdateError::VersionConflict) | Err(UpdateError::NotFound) => {
            debug!(reminder_id = %descriptor.id, "Reminder was taken by someone else");
            return FireOutcome::Skipped;
        }
        Err(UpdateError::Storage(e)) => {
            error!(reminder_id = %descriptor.id, "Unable to claim reminder: {:?}", e);
            return FireOutcome::Skipped;
        }
    };

    let mut settled = claimed.clone();
    let outcome = match deliver_with_retries(ctx, &claimed).await {
        Ok(()) => {
            info!(reminder_id = %claimed.id, owner_id = %claimed.owner_id, "Delivered reminder");
            settled.record_delivery(ctx.sys.now());
            FireOutcome::Delivered
        }
        Err(DeliveryError::Transient(reason)) => {
            warn!(
                reminder_id = %claimed.id,
                "Giving up delivery for this poll, releasing the claim: {}", reason
            );
            settled.release_claim();
            FireOutcome::Deferred
        }
        Err(DeliveryError::Permanent(reason)) => {
            error!(
                reminder_id = %claimed.id,
                "Cancelling reminder, its owner cannot be reached: {}", reason
            );
            if let Err(e) = settled.cancel() {
                error!(reminder_id = %claimed.id, "Unable to cancel reminder: {:?}", e);
            }
            FireOutcome::Cancelled
        }
    };

    match repo.update(&settled, claimed.version).await {
        Ok(_) => {}
        Err(UpdateError::VersionConflict) if outcome == FireOutcome::Delivered => {
            // Changed by the owner while firing, keep their change but do not
            // fire the same occurrence again
            record_delivery_after_change(ctx, &claimed).await;
        }
        Err(UpdateError::VersionConflict) => {
            debug!(
                reminder_id = %claimed.id,
                "Reminder changed while firing, keeping the change"
            );
        }
        Err(e) => {
            error!(reminder_id = %claimed.id, "Unable to settle reminder: {:?}", e);
        }
    }

    outcome
}

async fn record_delivery_after_change(ctx: &NudgeContext, claimed: &ScheduleDescriptor) {
    let due = claimed.next_fire_at;
    let delivered_at = ctx.sys.now();
    let res = ctx
        .repos
        .schedule_descriptors
        .modify(&claimed.id, &move |descriptor: &mut ScheduleDescriptor| {
            // Cancelled, paused or moved on meanwhile
            if descriptor.status != ScheduleStatus::Active || descriptor.next_fire_at != due {
                return Err(TransitionError::InvalidState(descriptor.status));
            }
            descriptor.record_delivery(delivered_at);
            Ok(())
        })
        .await;
    match res {
        Ok(_) => {}
        Err(ModifyError::Rejected(_)) | Err(ModifyError::NotFound) => {
            debug!(
                reminder_id = %claimed.id,
                "Reminder changed while firing, keeping the change"
            );
        }
        Err(e) => {
            error!(reminder_id = %claimed.id, "Unable to record delivery: {:?}", e);
        }
    }
}

async fn deliver_with_retries(
    ctx: &NudgeContext,
    descriptor: &ScheduleDescriptor,
) -> Result<(), DeliveryError> {
    let text = descriptor.notification_text();
    let timeout = std::time::Duration::from_secs(ctx.config.delivery_timeout_secs);
    let mut backoff_millis = ctx.config.delivery_backoff_millis;
    let mut attempt = 1;

    loop {
        let res = tokio::time::timeout(timeout, ctx.delivery.deliver(&descriptor.owner_id, &text))
            .await
            .unwrap_or_else(|_| {
                Err(DeliveryError::Transient(format!(
                    "Delivery timed out after {:?}",
                    timeout
                )))
            });
        match res {
            Err(DeliveryError::Transient(reason)) if attempt < ctx.config.delivery_max_attempts => {
                warn!(
                    reminder_id = %descriptor.id,
                    attempt,
                    "Delivery failed, retrying in {}ms: {}", backoff_millis, reason
                );
                tokio::time::sleep(std::time::Duration::from_millis(backoff_millis)).await;
                backoff_millis = next_backoff(backoff_millis);
                attempt += 1;
            }
            res => return res,
        }
    }
}
