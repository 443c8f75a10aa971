use crate::cli::{CliAuthTokenKey, EventIdOrSlug};
use crate::cli_error::CliError;
use crate::data_store::auth_token::AuthToken;
use crate::data_store::models::Event;
use crate::data_store::{get_store_from_env, CallboardStore, CallboardStoreFacade, StoreError};
use crate::mail::{deliver_pending_mails, DeliveryReport, MailBackendProvider};
use crate::setup::get_default_mail_transport_from_env;
use crate::submission_workflow::{self, WorkflowError};
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Accept { force: bool },
    Reject,
}

/// Accept a submission of the event and notify its speakers
pub fn accept_submission(
    event_id_or_slug: EventIdOrSlug,
    code: &str,
    force: bool,
) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let mail = get_default_mail_transport_from_env()?;
    decide_submission(
        data_store.as_mut(),
        &mail,
        &event_id_or_slug,
        code,
        Decision::Accept { force },
    )
}

/// Reject a submission of the event and notify its speakers
pub fn reject_submission(event_id_or_slug: EventIdOrSlug, code: &str) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let mail = get_default_mail_transport_from_env()?;
    decide_submission(
        data_store.as_mut(),
        &mail,
        &event_id_or_slug,
        code,
        Decision::Reject,
    )
}

/// Send the queued mails of the event, e.g. after the mail server has been unavailable
pub fn deliver_mails(event_id_or_slug: EventIdOrSlug) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;
    let mail = get_default_mail_transport_from_env()?;

    let event = event_id_or_slug.load_event(data_store.as_mut())?;
    let auth_key = CliAuthTokenKey::new();
    let auth_token = AuthToken::create_for_cli(event.id, &auth_key);
    let report = deliver_event_mails(data_store.as_mut(), &mail, &auth_token, &event)?;
    println!("Sent {} mails, {} failed.", report.sent, report.failed);
    Ok(())
}

fn decide_submission(
    store: &mut dyn CallboardStoreFacade,
    mail: &dyn MailBackendProvider,
    event_id_or_slug: &EventIdOrSlug,
    code: &str,
    decision: Decision,
) -> Result<(), CliError> {
    let event = event_id_or_slug.load_event(store)?;
    let auth_key = CliAuthTokenKey::new();
    let auth_token = AuthToken::create_for_cli(event.id, &auth_key);

    let result = match decision {
        Decision::Accept { force } => {
            submission_workflow::accept(store, &auth_token, &event, code, force)
        }
        Decision::Reject => submission_workflow::reject(store, &auth_token, &event, code),
    };
    result.map_err(|e| match e {
        WorkflowError::StoreError(StoreError::NotExisting) => {
            CliError::NotFound(format!("No submission with code {} in {}", code, event.slug))
        }
        e => e.into(),
    })?;
    println!(
        "{} submission {}.",
        match decision {
            Decision::Accept { .. } => "Accepted",
            Decision::Reject => "Rejected",
        },
        code
    );

    // The decision is committed at this point. Undelivered notifications stay queued.
    match deliver_event_mails(store, mail, &auth_token, &event) {
        Ok(report) if report.failed > 0 => warn!(
            "{} notification mails could not be sent. Retry with `callboard deliver-mails {}`.",
            report.failed, event.slug
        ),
        Ok(_) => {}
        Err(e) => warn!(
            "Notification mails are queued, but could not be sent: {}. Retry with `callboard \
             deliver-mails {}`.",
            e, event.slug
        ),
    }
    Ok(())
}

fn deliver_event_mails(
    store: &mut dyn CallboardStoreFacade,
    mail: &dyn MailBackendProvider,
    auth_token: &AuthToken,
    event: &Event,
) -> Result<DeliveryReport, CliError> {
    let settings = store.get_event_settings(auth_token, event.id)?;
    let backend = mail.backend_for(&settings, false)?;
    Ok(deliver_pending_mails(
        store,
        auth_token,
        event.id,
        backend.as_ref(),
        &settings.mail_from,
    )?)
}
