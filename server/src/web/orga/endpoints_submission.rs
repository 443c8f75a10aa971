use crate::data_store::auth_token::AuthToken;
use crate::data_store::models::{Event, SubmissionProposal};
use crate::data_store::{CallboardStoreFacade, StoreError};
use crate::mail::{deliver_pending_mails, MailBackendProvider};
use crate::submission_workflow;
use crate::web::orga::context::OrgaContext;
use crate::web::orga::OrgaError;
use crate::web::AppState;
use actix_web::{get, post, web, HttpResponse, Responder};
use callboard_api_types::{CreatedSubmission, NewSubmission};
use chrono::Utc;
use log::{error, warn};
use serde::Deserialize;

#[get("/submissions")]
async fn list_submissions(
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let submissions = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        let cfp = store.get_cfp(event.id)?;
        let now = Utc::now();
        Ok(store
            .get_submissions(&auth, event.id)?
            .into_iter()
            .map(|submission| submission.into_api(&cfp, now))
            .collect::<Vec<callboard_api_types::Submission>>())
    })
    .await??;
    Ok(web::Json(submissions))
}

/// Hand in a submission on behalf of its speakers, who are identified by their email addresses
#[post("/submissions")]
async fn create_submission(
    body: web::Json<NewSubmission>,
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let data = body.into_inner();
    let code = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        let speaker_ids = data
            .speakers
            .iter()
            .map(|email| {
                store
                    .get_user_by_email(email)
                    .map(|user| user.id)
                    .map_err(|e| match e {
                        StoreError::NotExisting => {
                            OrgaError::InvalidData(format!("No user with email address {}", email))
                        }
                        e => e.into(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(store.create_submission(
            &auth,
            SubmissionProposal {
                event_id: event.id,
                title: data.title,
                submission_type_id: data.submission_type,
                description: data.description,
                abstract_text: data.abstract_,
                notes: data.notes,
                duration: data.duration,
                content_locale: data.content_locale,
                do_not_record: data.do_not_record,
                speaker_ids,
            },
        )?)
    })
    .await??;
    Ok(HttpResponse::Created().json(CreatedSubmission { code }))
}

#[derive(Deserialize)]
struct AcceptQuery {
    #[serde(default)]
    force: bool,
}

#[post("/submissions/{code}/accept")]
async fn accept_submission(
    path: web::Path<(String, String)>,
    query: web::Query<AcceptQuery>,
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let (_event_slug, code) = path.into_inner();
    let force = query.force;
    run_decision(ctx, state, code, move |store, auth, event, code| {
        submission_workflow::accept(store, auth, event, code, force)
    })
    .await
}

#[post("/submissions/{code}/reject")]
async fn reject_submission(
    path: web::Path<(String, String)>,
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let (_event_slug, code) = path.into_inner();
    run_decision(ctx, state, code, submission_workflow::reject).await
}

/// Run a review decision on the submission and deliver the resulting notification mails.
///
/// Returns the updated submission.
async fn run_decision<F>(
    ctx: OrgaContext,
    state: web::Data<AppState>,
    code: String,
    decision: F,
) -> Result<web::Json<callboard_api_types::Submission>, OrgaError>
where
    F: FnOnce(
            &mut dyn CallboardStoreFacade,
            &AuthToken,
            &Event,
            &str,
        ) -> Result<(), submission_workflow::WorkflowError>
        + Send
        + 'static,
{
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let submission = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        decision(store.as_mut(), &auth, &event, &code)?;
        if let Err(e) = send_queued_mails(store.as_mut(), &auth, &event, state.mail.as_ref()) {
            error!("Could not deliver queued mails of {}: {}", event.slug, e);
        }

        let cfp = store.get_cfp(event.id)?;
        let submission = store.get_submission_by_code(&auth, event.id, &code)?;
        Ok(submission.into_api(&cfp, Utc::now()))
    })
    .await??;
    Ok(web::Json(submission))
}

/// Deliver the event's queued mails. Problems with the mail server are logged and reported
/// mails stay queued.
fn send_queued_mails(
    store: &mut dyn CallboardStoreFacade,
    auth: &AuthToken,
    event: &Event,
    mail: &dyn MailBackendProvider,
) -> Result<(), StoreError> {
    let settings = store.get_event_settings(auth, event.id)?;
    let backend = match mail.backend_for(&settings, false) {
        Ok(backend) => backend,
        Err(e) => {
            error!("Could not set up mail backend for {}: {}", event.slug, e);
            return Ok(());
        }
    };
    let report = deliver_pending_mails(
        store,
        auth,
        event.id,
        backend.as_ref(),
        &settings.mail_from,
    )?;
    if report.failed > 0 {
        warn!(
            "{} mails of {} could not be sent and stay queued",
            report.failed, event.slug
        );
    }
    Ok(())
}

#[get("/activity")]
async fn list_activity_log(
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let entries = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        Ok(store
            .get_activity_log(&auth, event.id)?
            .into_iter()
            .map(|entry| entry.into())
            .collect::<Vec<callboard_api_types::ActivityLogEntry>>())
    })
    .await??;
    Ok(web::Json(entries))
}
