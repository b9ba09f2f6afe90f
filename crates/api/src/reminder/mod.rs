mod cancel_reminder;
mod change_reminder;
mod create_reminder;
pub mod dispatch_due_reminders;
mod get_reminder;
mod get_reminders_by_owner;
mod handle_utterance;
mod pause_reminder;
mod resume_reminder;

use actix_web::web;
use cancel_reminder::cancel_reminder_controller;
use create_reminder::create_reminder_controller;
use get_reminder::get_reminder_controller;
use get_reminders_by_owner::get_reminders_by_owner_controller;
use handle_utterance::handle_utterance_controller;
use pause_reminder::pause_reminder_controller;
use resume_reminder::resume_reminder_controller;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/user/{owner_id}/reminder",
        web::post().to(create_reminder_controller),
    );
    cfg.route(
        "/user/{owner_id}/utterance",
        web::post().to(handle_utterance_controller),
    );
    cfg.route(
        "/user/{owner_id}/reminders",
        web::get().to(get_reminders_by_owner_controller),
    );

    cfg.route(
        "/reminder/{reminder_id}",
        web::get().to(get_reminder_controller),
    );
    cfg.route(
        "/reminder/{reminder_id}",
        web::delete().to(cancel_reminder_controller),
    );
    cfg.route(
        "/reminder/{reminder_id}/pause",
        web::put().to(pause_reminder_controller),
    );
    cfg.route(
        "/reminder/{reminder_id}/resume",
        web::put().to(resume_reminder_controller),
    );
}
