mod helpers;

use chrono::{Duration, Utc};
use helpers::setup::{spawn_app, TestApp};
use nudge_api_structs::{
    dtos::ReminderDTO, get_reminders_by_owner, CreateReminderResponse, ReminderResponse,
};
use nudge_domain::{ScheduleKind, ScheduleStatus};
use reqwest::StatusCode;
use serde_json::json;

async fn create_reminder(app: &TestApp, owner_id: &str, text: &str) -> ReminderDTO {
    let res = app
        .client
        .post(app.url(&format!("/user/{}/reminder", owner_id)))
        .json(&json!({ "text": text, "timezone": "UTC" }))
        .send()
        .await
        .expect("Expected request to be sent");
    assert_eq!(res.status(), StatusCode::CREATED);
    match res.json::<CreateReminderResponse>().await.unwrap() {
        CreateReminderResponse::Scheduled { reminder } => reminder,
        CreateReminderResponse::NotAReminder { text } => {
            panic!("Expected a reminder to be scheduled for: {}", text)
        }
    }
}

async fn put_reminder(app: &TestApp, path: &str) -> reqwest::Response {
    app.client
        .put(app.url(path))
        .send()
        .await
        .expect("Expected request to be sent")
}

#[actix_web::test]
async fn test_status_ok() {
    let app = spawn_app().await;
    let res = app.client.get(app.url("/")).send().await.unwrap();
    assert!(res.status().is_success());
}

#[actix_web::test]
async fn test_create_relative_reminder() {
    let app = spawn_app().await;
    let before = Utc::now();

    let reminder = create_reminder(&app, "42", "Remind me to check email in 10 minutes").await;
    assert_eq!(reminder.owner_id, "42");
    assert_eq!(reminder.text, "check email");
    assert_eq!(reminder.status, ScheduleStatus::Active);
    assert_eq!(reminder.timezone, "UTC");
    let at = match reminder.kind {
        ScheduleKind::Once { at } => at,
        other => panic!("Expected a one-time reminder, got {:?}", other),
    };
    assert!(at >= before + Duration::minutes(10));
    assert!(at <= Utc::now() + Duration::minutes(10));
    assert_eq!(reminder.next_fire_at, Some(at));
}

#[actix_web::test]
async fn test_create_recurring_reminder() {
    let app = spawn_app().await;

    let reminder = create_reminder(
        &app,
        "42",
        "Remind me to water plants every Monday and Thursday at 6 PM",
    )
    .await;
    assert_eq!(reminder.text, "water plants");
    assert!(matches!(reminder.kind, ScheduleKind::Recurring { .. }));
    assert_eq!(reminder.schedule, "every Monday and Thursday at 18:00 (UTC)");
    assert!(reminder.next_fire_at.unwrap() > Utc::now());
}

#[actix_web::test]
async fn test_text_without_time_is_not_a_reminder() {
    let app = spawn_app().await;

    let res = app
        .client
        .post(app.url("/user/42/reminder"))
        .json(&json!({ "text": "buy milk" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    match res.json::<CreateReminderResponse>().await.unwrap() {
        CreateReminderResponse::NotAReminder { text } => assert_eq!(text, "buy milk"),
        CreateReminderResponse::Scheduled { .. } => panic!("Expected no reminder"),
    }
}

#[actix_web::test]
async fn test_rejects_bad_reminders() {
    let app = spawn_app().await;

    let res = app
        .client
        .post(app.url("/user/42/reminder"))
        .json(&json!({ "text": "check email in 10 minutes", "timezone": "Mars/Olympus" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .client
        .post(app.url("/user/42/reminder"))
        .json(&json!({ "text": "renew passport on 2020-05-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .client
        .post(app.url("/user/42/reminder"))
        .json(&json!({ "text": "Remind me in 10 minutes" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn test_utterance_needs_a_request() {
    let app = spawn_app().await;

    let res = app
        .client
        .post(app.url("/user/42/utterance"))
        .json(&json!({ "text": "how was your day today?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(matches!(
        res.json::<CreateReminderResponse>().await.unwrap(),
        CreateReminderResponse::NotAReminder { .. }
    ));

    let res = app
        .client
        .post(app.url("/user/42/utterance"))
        .json(&json!({ "text": "remind me to stretch in 2 hours", "timezone": "Europe/Oslo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    match res.json::<CreateReminderResponse>().await.unwrap() {
        CreateReminderResponse::Scheduled { reminder } => {
            assert_eq!(reminder.text, "stretch");
            assert_eq!(reminder.timezone, "Europe/Oslo");
        }
        CreateReminderResponse::NotAReminder { .. } => panic!("Expected a reminder"),
    }
}

#[actix_web::test]
async fn test_reminder_lifecycle() {
    let app = spawn_app().await;
    let reminder = create_reminder(&app, "7", "stand up every day at 9am").await;
    let path = format!("/reminder/{}", reminder.id);

    let res = app.client.get(app.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let found = res.json::<ReminderResponse>().await.unwrap().reminder;
    assert_eq!(found.id, reminder.id);

    let res = put_reminder(&app, &format!("{}/pause", path)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let paused = res.json::<ReminderResponse>().await.unwrap().reminder;
    assert_eq!(paused.status, ScheduleStatus::Paused);
    assert_eq!(paused.next_fire_at, None);
    let res = put_reminder(&app, &format!("{}/pause", path)).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = put_reminder(&app, &format!("{}/resume", path)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let resumed = res.json::<ReminderResponse>().await.unwrap().reminder;
    assert_eq!(resumed.status, ScheduleStatus::Active);
    assert!(resumed.next_fire_at.is_some());

    let res = app.client.delete(app.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cancelled = res.json::<ReminderResponse>().await.unwrap().reminder;
    assert_eq!(cancelled.status, ScheduleStatus::Cancelled);
    let res = app.client.delete(app.url(&path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let res = put_reminder(&app, &format!("{}/resume", path)).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_unknown_reminder_is_not_found() {
    let app = spawn_app().await;
    let path = "/reminder/00000000-0000-0000-0000-000000000000";

    let res = app.client.get(app.url(path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = app.client.delete(app.url(path)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = put_reminder(&app, &format!("{}/pause", path)).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_list_reminders_by_owner() {
    let app = spawn_app().await;
    let later = create_reminder(&app, "99", "call mom in 3 hours").await;
    let sooner = create_reminder(&app, "99", "check oven in 20 minutes").await;
    let cancelled = create_reminder(&app, "99", "water plants in 1 hour").await;
    create_reminder(&app, "100", "someone else in 5 minutes").await;
    app.client
        .delete(app.url(&format!("/reminder/{}", cancelled.id)))
        .send()
        .await
        .unwrap();

    let res = app
        .client
        .get(app.url("/user/99/reminders"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let reminders = res
        .json::<get_reminders_by_owner::APIResponse>()
        .await
        .unwrap()
        .reminders;
    assert_eq!(
        reminders.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
        vec![sooner.id.clone(), later.id.clone()]
    );

    let res = app
        .client
        .get(app.url("/user/99/reminders?all=true"))
        .send()
        .await
        .unwrap();
    let reminders = res
        .json::<get_reminders_by_owner::APIResponse>()
        .await
        .unwrap()
        .reminders;
    assert_eq!(
        reminders.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
        vec![sooner.id, later.id, cancelled.id]
    );
}
