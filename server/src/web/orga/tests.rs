use super::*;
use crate::data_store::models::SubmissionState;
use crate::data_store::store_mock::{
    StoreMock, StoreMockData, TEST_EVENT_ID, TEST_ORGA_USER_ID, TEST_OTHER_USER_ID,
    TEST_PASSWORD, TEST_SUBMISSION_CODE,
};
use crate::mail::testing::RecordingMailBackend;
use crate::setup::SiteConfig;
use crate::web::AppState;
use actix_web::http::header;
use actix_web::{http, test, App};
use callboard_api_types::{
    CreatedInvitation, Invitation, LoginInfo, OrganizedEvents, RoomList, TalkList,
};
use serde_json::json;
use std::sync::Arc;

const APP_SECRET: &str = "123456";

fn test_state(store: Arc<StoreMock>, mail: RecordingMailBackend) -> AppState {
    AppState {
        store,
        secret: APP_SECRET.to_string(),
        site_config: SiteConfig::default(),
        mail: Arc::new(mail),
    }
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .configure(configure_app)
                .app_data(web::Data::new($state)),
        )
        .await
    };
}

fn session_cookie(user_id: crate::data_store::UserId) -> Cookie<'static> {
    Cookie::new(
        SESSION_COOKIE_NAME,
        SessionToken::new(user_id).as_string(APP_SECRET),
    )
}

#[actix_web::test]
async fn test_anonymous_request_redirects_to_login() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store, RecordingMailBackend::default()));

    let req = test::TestRequest::get().uri("/orga/events").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FOUND);
    let location = res
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.contains("/orga/login?next=%2Forga%2Fevents"));

    // An invalid session cookie counts as anonymous
    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/rooms/")
        .cookie(Cookie::new(SESSION_COOKIE_NAME, "forged.token"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FOUND);
}

#[actix_web::test]
async fn test_login_route_is_public() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store, RecordingMailBackend::default()));

    let req = test::TestRequest::get()
        .uri("/orga/login")
        .insert_header((header::ACCEPT_LANGUAGE, "de-AT,de;q=0.9,en;q=0.5"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_LANGUAGE).unwrap(),
        "de"
    );
    let info: LoginInfo = test::read_body_json(res).await;
    assert!(!info.authenticated);
    assert_eq!(info.locale, "de");
    assert_eq!(info.timezone, "UTC");
}

#[actix_web::test]
async fn test_login() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store, RecordingMailBackend::default()));

    let req = test::TestRequest::post()
        .uri("/orga/login")
        .set_json(json!({"email": "orga@example.com", "password": "wrong"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/orga/login")
        .set_json(json!({"email": "Orga@example.com", "password": TEST_PASSWORD}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let cookie = res
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE_NAME)
        .expect("Session cookie should be set")
        .into_owned();
    let info: LoginInfo = test::read_body_json(res).await;
    assert!(info.authenticated);
    assert_eq!(info.user.unwrap().email, "orga@example.com");

    // The session cookie grants access
    let req = test::TestRequest::get()
        .uri("/orga/events")
        .cookie(cookie)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let events: OrganizedEvents = test::read_body_json(res).await;
    assert_eq!(events.events.len(), 1);
    assert_eq!(events.events[0].slug, "democon");
}

#[actix_web::test]
async fn test_non_organizer_is_refused() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store, RecordingMailBackend::default()));

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/rooms/")
        .cookie(session_cookie(TEST_OTHER_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::FORBIDDEN);

    // Logged-in users may still see their (empty) list of organized events
    let req = test::TestRequest::get()
        .uri("/orga/events")
        .cookie(session_cookie(TEST_OTHER_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let events: OrganizedEvents = test::read_body_json(res).await;
    assert!(events.events.is_empty());
}

#[actix_web::test]
async fn test_superuser_is_organizer_of_every_event() {
    let mut data = StoreMockData::with_test_event();
    data.users
        .iter_mut()
        .find(|u| u.id == TEST_OTHER_USER_ID)
        .unwrap()
        .is_superuser = true;
    let store = Arc::new(StoreMock::with_data(data));
    let app = test_app!(test_state(store, RecordingMailBackend::default()));

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/rooms/")
        .cookie(session_cookie(TEST_OTHER_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
}

#[actix_web::test]
async fn test_unknown_event() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store, RecordingMailBackend::default()));

    let req = test::TestRequest::get()
        .uri("/orga/event/nocon/schedule/api/rooms/")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_list_rooms() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store, RecordingMailBackend::default()));

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/rooms/")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .insert_header((header::ACCEPT_LANGUAGE, "fr, de;q=0.8"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    // French is not offered by the event, so the browser's second choice wins
    assert_eq!(
        res.headers().get(header::CONTENT_LANGUAGE).unwrap(),
        "de"
    );
    let room_list: RoomList = test::read_body_json(res).await;
    assert_eq!(
        room_list.start,
        chrono::NaiveDate::from_ymd_opt(2025, 9, 1)
    );
    assert_eq!(room_list.end, chrono::NaiveDate::from_ymd_opt(2025, 9, 3));
    assert_eq!(room_list.rooms.len(), 1);
    assert_eq!(room_list.rooms[0].capacity, Some(300));
}

#[actix_web::test]
async fn test_accept_submission_sends_mails_and_schedules_talk() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let mail = RecordingMailBackend::default();
    let app = test_app!(test_state(store.clone(), mail.clone()));

    let req = test::TestRequest::post()
        .uri(&format!(
            "/orga/event/democon/submissions/{}/accept",
            TEST_SUBMISSION_CODE
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let submission: callboard_api_types::Submission = test::read_body_json(res).await;
    assert_eq!(
        submission.state,
        callboard_api_types::SubmissionState::Accepted
    );

    let sent = mail.sent_mails();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|m| m.to == "ferris@example.com"));
    assert!(sent.iter().any(|m| m.to == "corro@example.com"));
    assert!(sent
        .iter()
        .all(|m| m.reply_to.as_deref() == Some("orga@democon.example")));
    assert!(sent.iter().all(|m| m.subject.contains("Fearless Concurrency")));
    assert_eq!(*mail.last_force_custom.lock().unwrap(), Some(false));

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/talks/")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let talks: TalkList = test::read_body_json(res).await;
    assert_eq!(talks.results.len(), 1);
    assert_eq!(talks.results[0].code, TEST_SUBMISSION_CODE);
    assert_eq!(talks.results[0].room, None);

    // Accepting again is not a legal transition
    let req = test::TestRequest::post()
        .uri(&format!(
            "/orga/event/democon/submissions/{}/accept",
            TEST_SUBMISSION_CODE
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CONFLICT);
    // ... unless forced
    let req = test::TestRequest::post()
        .uri(&format!(
            "/orga/event/democon/submissions/{}/accept?force=true",
            TEST_SUBMISSION_CODE
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(
        store
            .data
            .lock()
            .unwrap()
            .submission_by_code(TEST_SUBMISSION_CODE)
            .unwrap()
            .state,
        SubmissionState::Accepted
    );

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/activity")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    let log: Vec<callboard_api_types::ActivityLogEntry> = test::read_body_json(res).await;
    assert_eq!(log.len(), 2);
    assert!(log
        .iter()
        .all(|e| e.action_type == "callboard.submission.accept"
            && e.person == Some(TEST_ORGA_USER_ID)));
}

#[actix_web::test]
async fn test_reject_submission_removes_talk() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let mail = RecordingMailBackend::default();
    let app = test_app!(test_state(store.clone(), mail.clone()));

    for action in ["accept", "reject"] {
        let req = test::TestRequest::post()
            .uri(&format!(
                "/orga/event/democon/submissions/{}/{}",
                TEST_SUBMISSION_CODE, action
            ))
            .cookie(session_cookie(TEST_ORGA_USER_ID))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), http::StatusCode::OK);
    }
    assert_eq!(mail.sent_mails().len(), 4);

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/talks/")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    let talks: TalkList = test::read_body_json(res).await;
    assert!(talks.results.is_empty());
}

#[actix_web::test]
async fn test_failed_mail_delivery_keeps_state_change() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let mail = RecordingMailBackend::default();
    mail.failing_recipients
        .lock()
        .unwrap()
        .push("corro@example.com".to_owned());
    let app = test_app!(test_state(store.clone(), mail.clone()));

    let req = test::TestRequest::post()
        .uri(&format!(
            "/orga/event/democon/submissions/{}/accept",
            TEST_SUBMISSION_CODE
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    assert_eq!(mail.sent_mails().len(), 1);

    let data = store.data.lock().unwrap();
    let pending: Vec<_> = data
        .queued_mails
        .iter()
        .filter(|m| m.sent.is_none())
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].to_address, "corro@example.com");
}

#[actix_web::test]
async fn test_broken_mail_settings_keep_committed_decision() {
    let mut data = StoreMockData::with_test_event();
    data.event_settings.insert(
        (TEST_EVENT_ID, "smtp_port".to_owned()),
        "not a port".to_owned(),
    );
    let store = Arc::new(StoreMock::with_data(data));
    let mail = RecordingMailBackend::default();
    let app = test_app!(test_state(store.clone(), mail.clone()));

    let req = test::TestRequest::post()
        .uri(&format!(
            "/orga/event/democon/submissions/{}/accept",
            TEST_SUBMISSION_CODE
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let submission: callboard_api_types::Submission = test::read_body_json(res).await;
    assert_eq!(
        submission.state,
        callboard_api_types::SubmissionState::Accepted
    );

    // Nothing could be sent, so both mails wait for the next delivery
    assert!(mail.sent_mails().is_empty());
    let data = store.data.lock().unwrap();
    assert_eq!(
        data.queued_mails.iter().filter(|m| m.sent.is_none()).count(),
        2
    );
}

#[actix_web::test]
async fn test_update_talk_slot() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store.clone(), RecordingMailBackend::default()));

    let req = test::TestRequest::post()
        .uri(&format!(
            "/orga/event/democon/submissions/{}/accept",
            TEST_SUBMISSION_CODE
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    test::call_service(&app, req).await;
    let (slot_id, room_id) = {
        let data = store.data.lock().unwrap();
        (data.talk_slots[0].id, data.rooms[0].id)
    };

    let req = test::TestRequest::patch()
        .uri(&format!(
            "/orga/event/democon/schedule/api/talks/{}/",
            slot_id
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .set_json(json!({"room": room_id, "start": "2025-09-01T10:00:00Z"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NO_CONTENT);

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/talks/")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    let talks: TalkList = test::read_body_json(res).await;
    assert_eq!(talks.results[0].room, Some(room_id));
    assert!(talks.results[0].start.is_some());
    assert_eq!(talks.results[0].end, None);

    let req = test::TestRequest::patch()
        .uri(&format!(
            "/orga/event/democon/schedule/api/talks/{}/",
            uuid::Uuid::now_v7()
        ))
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .set_json(json!({"room": null}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_settings_hide_smtp_password() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store.clone(), RecordingMailBackend::default()));

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/settings")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let mut settings: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(settings["smtp_port"], 587);
    assert!(settings.get("smtp_password").is_none());

    settings["smtp_use_custom"] = json!(true);
    settings["smtp_host"] = json!("mail.democon.example");
    settings["smtp_password"] = json!("hunter2");
    let req = test::TestRequest::put()
        .uri("/orga/event/democon/settings")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .set_json(&settings)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let updated: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(updated["smtp_host"], "mail.democon.example");
    assert!(updated.get("smtp_password").is_none());

    let data = store.data.lock().unwrap();
    assert_eq!(
        data.event_settings
            .get(&(TEST_EVENT_ID, "smtp_password".to_owned()))
            .map(String::as_str),
        Some("hunter2")
    );
}

#[actix_web::test]
async fn test_invitation_flow() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let mail = RecordingMailBackend::default();
    let app = test_app!(test_state(store, mail.clone()));

    let req = test::TestRequest::post()
        .uri("/orga/event/democon/invitations")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .set_json(json!({"email": "Visitor@example.com"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let created: CreatedInvitation = test::read_body_json(res).await;
    assert_eq!(created.email, "visitor@example.com");
    let sent = mail.sent_mails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "visitor@example.com");
    assert!(sent[0]
        .text
        .contains(&format!("/orga/invitation/{}", created.token)));

    // The invitation can be viewed without login
    let req = test::TestRequest::get()
        .uri(&format!("/orga/invitation/{}", created.token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);
    let invitation: Invitation = test::read_body_json(res).await;
    assert_eq!(invitation.event, "democon");

    // ... but accepting requires a login
    let req = test::TestRequest::post()
        .uri(&format!("/orga/invitation/{}", created.token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri(&format!("/orga/invitation/{}", created.token))
        .cookie(session_cookie(TEST_OTHER_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/schedule/api/rooms/")
        .cookie(session_cookie(TEST_OTHER_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::OK);

    // Invitations can only be used once
    let req = test::TestRequest::get()
        .uri(&format!("/orga/invitation/{}", created.token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_create_submission() {
    let store = Arc::new(StoreMock::with_data(StoreMockData::with_test_event()));
    let app = test_app!(test_state(store.clone(), RecordingMailBackend::default()));

    let req = test::TestRequest::post()
        .uri("/orga/event/democon/submissions")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .set_json(json!({
            "title": "Zero-Cost Abstractions",
            "content_locale": "en",
            "speakers": ["corro@example.com"],
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::CREATED);
    let created: callboard_api_types::CreatedSubmission = test::read_body_json(res).await;
    assert!(crate::submission_code::is_valid_code(&created.code));

    let req = test::TestRequest::post()
        .uri("/orga/event/democon/submissions")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .set_json(json!({
            "title": "Unsafe Rust",
            "content_locale": "en",
            "speakers": ["nobody@example.com"],
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), http::StatusCode::UNPROCESSABLE_ENTITY);

    let req = test::TestRequest::get()
        .uri("/orga/event/democon/submissions")
        .cookie(session_cookie(TEST_ORGA_USER_ID))
        .to_request();
    let res = test::call_service(&app, req).await;
    let submissions: Vec<callboard_api_types::Submission> = test::read_body_json(res).await;
    assert_eq!(submissions.len(), 2);
    assert!(submissions
        .iter()
        .any(|s| s.code == created.code && s.title == "Zero-Cost Abstractions"));
}
