//! Review state transitions of submissions
//!
//! [accept] and [reject] are the only operations changing a submission's state. Each of them
//! changes the state, writes an activity log entry, adjusts the submission's talk slot in the
//! event's working schedule and queues a notification mail for every speaker. All of these changes
//! are applied in a single transaction by
//! [CallboardStoreFacade::apply_submission_transition]. Queued mails are delivered separately, see
//! [crate::mail::deliver_pending_mails].

use crate::data_store::auth_token::AuthToken;
use crate::data_store::models::{
    Event, FullSubmission, NewActivityLogEntry, NewQueuedMail, SlotChange, SubmissionState,
    SubmissionTransition,
};
use crate::data_store::{CallboardStoreFacade, MailTemplateId, StoreError};
use crate::mail::templates::{render_template, MailContext};
use log::info;
use std::fmt::{Display, Formatter};

pub const ACTION_ACCEPT: &str = "callboard.submission.accept";
pub const ACTION_REJECT: &str = "callboard.submission.reject";

/// Accept the submission with the given code.
///
/// Only submissions in state "submitted" or "rejected" can be accepted, unless `force` is given.
/// The submission gets a talk slot in the working schedule (if it does not have one yet) and all
/// speakers are notified with the event's acceptance mail template.
pub fn accept(
    store: &mut dyn CallboardStoreFacade,
    auth_token: &AuthToken,
    event: &Event,
    code: &str,
    force: bool,
) -> Result<(), WorkflowError> {
    let submission = store.get_submission_by_code(auth_token, event.id, code)?;
    let current_state = submission.submission.state;
    if !force
        && !matches!(
            current_state,
            SubmissionState::Submitted | SubmissionState::Rejected
        )
    {
        return Err(WorkflowError::IllegalTransition {
            from: current_state,
            to: SubmissionState::Accepted,
        });
    }

    let mails = speaker_mails(
        store,
        auth_token,
        event,
        &submission,
        event.accept_template_id,
    )?;
    apply_transition(
        store,
        auth_token,
        &submission,
        SubmissionState::Accepted,
        ACTION_ACCEPT,
        SlotChange::CreateInWipSchedule,
        mails,
    )?;
    info!(
        "Accepted submission {} '{}' of event {} (was {}{})",
        submission.submission.code,
        submission.submission.title,
        event.slug,
        current_state,
        if force { ", forced" } else { "" }
    );
    Ok(())
}

/// Reject the submission with the given code.
///
/// Any state may be rejected. The submission's talk slot is removed from the working schedule and
/// all speakers are notified.
pub fn reject(
    store: &mut dyn CallboardStoreFacade,
    auth_token: &AuthToken,
    event: &Event,
    code: &str,
) -> Result<(), WorkflowError> {
    let submission = store.get_submission_by_code(auth_token, event.id, code)?;
    let current_state = submission.submission.state;

    // TODO switch to event.reject_template_id once the rejection wording is confirmed by the
    //   organizers; the speakers currently receive the acceptance template.
    let mails = speaker_mails(
        store,
        auth_token,
        event,
        &submission,
        event.accept_template_id,
    )?;
    apply_transition(
        store,
        auth_token,
        &submission,
        SubmissionState::Rejected,
        ACTION_REJECT,
        SlotChange::RemoveFromWipSchedule,
        mails,
    )?;
    info!(
        "Rejected submission {} '{}' of event {} (was {})",
        submission.submission.code, submission.submission.title, event.slug, current_state
    );
    Ok(())
}

fn apply_transition(
    store: &mut dyn CallboardStoreFacade,
    auth_token: &AuthToken,
    submission: &FullSubmission,
    new_state: SubmissionState,
    action_type: &str,
    slot_change: SlotChange,
    mails: Vec<NewQueuedMail>,
) -> Result<(), StoreError> {
    let submission = &submission.submission;
    store.apply_submission_transition(
        auth_token,
        SubmissionTransition {
            event_id: submission.event_id,
            submission_id: submission.id,
            expected_state: submission.state,
            new_state,
            log_entry: NewActivityLogEntry {
                event_id: submission.event_id,
                submission_id: Some(submission.id),
                person_id: auth_token.user_id(),
                action_type: action_type.to_owned(),
                is_orga_action: true,
            },
            slot_change,
            mails,
        },
    )
}

/// Render the mail template for each speaker of the submission, in the speaker's language
fn speaker_mails(
    store: &mut dyn CallboardStoreFacade,
    auth_token: &AuthToken,
    event: &Event,
    submission: &FullSubmission,
    template_id: Option<MailTemplateId>,
) -> Result<Vec<NewQueuedMail>, WorkflowError> {
    let template_id = template_id.ok_or(WorkflowError::MissingMailTemplate)?;
    let template = store.get_mail_template(auth_token, event.id, template_id)?;
    Ok(submission
        .speakers
        .iter()
        .map(|speaker| {
            let context = MailContext::for_submission(event, &submission.submission, speaker);
            let locale = speaker.locale.as_deref().unwrap_or(&event.locale);
            let rendered = render_template(&template, &context, locale);
            NewQueuedMail {
                event_id: event.id,
                to_address: speaker.email.clone(),
                reply_to: event.email.clone(),
                subject: rendered.subject,
                text: rendered.text,
            }
        })
        .collect())
}

#[derive(Debug)]
pub enum WorkflowError {
    /// The submission is not in a state, from which the requested transition is allowed
    IllegalTransition {
        from: SubmissionState,
        to: SubmissionState,
    },
    /// The event has no mail template for the notification. Initializing the event creates the
    /// default templates.
    MissingMailTemplate,
    StoreError(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        Self::StoreError(value)
    }
}

impl Display for WorkflowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::IllegalTransition { from, to } => write!(
                f,
                "Submission must be submitted or rejected, not {} to be {}.",
                from, to
            ),
            WorkflowError::MissingMailTemplate => {
                f.write_str("The event has no mail template for this notification.")
            }
            WorkflowError::StoreError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for WorkflowError {}
