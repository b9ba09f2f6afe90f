use crate::{reminder::dispatch_due_reminders::DispatchDueRemindersUseCase, shared::usecase::execute};
use nudge_infra::NudgeContext;
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::info;

pub fn get_start_delay(now_ts: usize, secs_before_min: usize) -> usize {
    let secs_to_next_minute = 60 - (now_ts / 1000) % 60;
    if secs_to_next_minute > secs_before_min {
        secs_to_next_minute - secs_before_min
    } else {
        secs_to_next_minute + (60 - secs_before_min)
    }
}

/// Polls for due reminders forever, starting at the next whole minute so
/// reminders set for a clock time go out close to it
pub fn start_dispatch_reminders_job(ctx: NudgeContext) {
    actix_web::rt::spawn(async move {
        let now = ctx.sys.now().timestamp_millis();
        let secs_to_next_run = get_start_delay(now as usize, 0);
        let start = Instant::now() + Duration::from_secs(secs_to_next_run as u64);
        info!(
            "Dispatching due reminders every {} seconds, starting in {} seconds",
            ctx.config.poll_interval_secs, secs_to_next_run
        );

        sleep_until(start).await;
        let mut poll_interval = interval(Duration::from_secs(ctx.config.poll_interval_secs));
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            poll_interval.tick().await;
            actix_web::rt::spawn(dispatch_due_reminders(ctx.clone()));
        }
    });
}

async fn dispatch_due_reminders(ctx: NudgeContext) {
    let _ = execute(DispatchDueRemindersUseCase {}, &ctx).await;
}
