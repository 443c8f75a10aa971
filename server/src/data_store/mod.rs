//! The database interface of the application
//!
//! The primary entry point to this module is the function [get_store_from_env], which returns an
//! object implementing the [CallboardStore] trait. This object can be shared between threads in a
//! global application state and be used to create [CallboardStoreFacade] instances for interaction
//! with the database. These provide a CRUD-like interface, using the data models from the [models]
//! module.
//!
//! The primary implementation of [CallboardStore] ([postgres::PgDataStore]) wraps a PostgreSQL
//! connection pool and its corresponding [CallboardStoreFacade] objects
//! ([postgres::PgDataStoreFacade]) hold a reference to one pooled connection each, using the Diesel
//! query DSL for implementing the database interaction.
//!
//! There is also a mock implementation for unittests ([store_mock::StoreMock]).

use crate::cli_error::CliError;
use crate::data_store::auth_token::Privilege;
use crate::settings::EventSettings;
use crate::setup;
use auth_token::{AuthToken, GlobalAuthToken};
use std::fmt::{Debug, Display, Formatter};

pub mod auth_token;
pub mod models;
mod postgres;
mod schema;

#[cfg(test)]
pub mod store_mock;

/// Get a [CallboardStore] instance, according the "DATABASE_URL" environment variable.
///
/// The DATABASE_URL must be a PosgreSQL connection url, following the schema
/// "postgres://{user}:{password}@{host}/{database}".
pub fn get_store_from_env() -> Result<impl CallboardStore, CliError> {
    Ok(postgres::PgDataStore::new(
        &setup::get_database_url_from_env()?,
    )?)
}

pub type EventId = i32;
pub type UserId = i32;
pub type SubmissionId = uuid::Uuid;
pub type SubmissionTypeId = i32;
pub type RoomId = uuid::Uuid;
pub type ScheduleId = i32;
pub type TalkSlotId = uuid::Uuid;
pub type MailTemplateId = i32;
pub type QueuedMailId = i32;

pub trait CallboardStoreFacade {
    fn get_events(&mut self) -> Result<Vec<models::Event>, StoreError>;
    fn get_event(&mut self, event_id: EventId) -> Result<models::Event, StoreError>;
    /// Resolve an event by its URL slug. This does not require authorization, since the slug is
    /// part of public URLs.
    fn get_event_by_slug(&mut self, slug: &str) -> Result<models::Event, StoreError>;
    /// Create a new event and run [CallboardStoreFacade::initialize_event] for it, within the same
    /// database transaction.
    fn create_event(
        &mut self,
        auth_token: &GlobalAuthToken,
        event: models::NewEvent,
    ) -> Result<EventId, StoreError>;
    /// Create the initial data of an event, in this order: default submission type, call for
    /// papers, working schedule, default mail templates for acceptance, acknowledgement and
    /// rejection.
    ///
    /// Each step is skipped if the respective data exists already, so calling this function
    /// multiple times is safe.
    fn initialize_event(
        &mut self,
        auth_token: &GlobalAuthToken,
        event_id: EventId,
    ) -> Result<(), StoreError>;
    fn get_cfp(&mut self, event_id: EventId) -> Result<models::Cfp, StoreError>;

    fn get_user(&mut self, user_id: UserId) -> Result<models::User, StoreError>;
    fn get_user_by_email(&mut self, email: &str) -> Result<models::User, StoreError>;
    fn create_user(
        &mut self,
        auth_token: &GlobalAuthToken,
        user: models::NewUser,
    ) -> Result<UserId, StoreError>;
    /// Check if the user has organizer permissions for the event. Superusers are organizers of
    /// every event.
    fn is_organizer(&mut self, user: &models::User, event_id: EventId)
        -> Result<bool, StoreError>;
    /// Get the list of events, the user is organizer of (all events for superusers).
    fn get_organized_events(
        &mut self,
        user: &models::User,
    ) -> Result<Vec<models::Event>, StoreError>;
    fn grant_organizer(
        &mut self,
        auth_token: &GlobalAuthToken,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(), StoreError>;
    /// Store a pending organizer invitation for the given email address with the given token.
    fn create_invitation(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        email: &str,
        token: &str,
    ) -> Result<(), StoreError>;
    /// Get a pending (not yet accepted) invitation by its token.
    fn get_invitation(&mut self, token: &str) -> Result<models::EventPermission, StoreError>;
    /// Bind a pending invitation to the given user, making them organizer of the invitation's
    /// event.
    fn accept_invitation(&mut self, token: &str, user_id: UserId) -> Result<EventId, StoreError>;

    /// Get an [AuthToken] for the given (or an anonymous) user and event, representing the user's
    /// access roles.
    fn get_auth_token_for_user(
        &mut self,
        user_id: Option<UserId>,
        event_id: EventId,
    ) -> Result<AuthToken, StoreError>;

    /// Get the effective settings of the event. Values not set for the event are taken from the
    /// global settings and then from the declared defaults.
    fn get_event_settings(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<EventSettings, StoreError>;
    fn update_event_settings(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        settings: &EventSettings,
    ) -> Result<(), StoreError>;

    /// Get the rooms of the event, ordered by their position
    fn get_rooms(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<models::Room>, StoreError>;
    fn create_room(&mut self, auth_token: &AuthToken, room: models::Room)
        -> Result<(), StoreError>;
    /// Get all talk slots of the event's working schedule, with the data of their submissions
    fn get_wip_schedule_talks(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<models::FullTalkSlot>, StoreError>;
    /// Change room and/or time of a talk slot in the working schedule of the event.
    fn update_talk_slot(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        slot_id: TalkSlotId,
        patch: models::TalkSlotPatch,
    ) -> Result<(), StoreError>;

    /// Get all submissions of the event, ordered by creation time
    fn get_submissions(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<models::FullSubmission>, StoreError>;
    fn get_submission_by_code(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        code: &str,
    ) -> Result<models::FullSubmission, StoreError>;
    /// Create a new submission in state "submitted", assigning a random, unused submission code.
    ///
    /// Returns the assigned code.
    fn create_submission(
        &mut self,
        auth_token: &AuthToken,
        proposal: models::SubmissionProposal,
    ) -> Result<String, StoreError>;
    /// Execute a state transition of a submission with all of its side effects (state change,
    /// activity log entry, talk slot change, queued mails) in a single database transaction.
    ///
    /// Fails with [StoreError::ConcurrentEditConflict] if the submission's state is not the
    /// `expected_state` of the transition.
    fn apply_submission_transition(
        &mut self,
        auth_token: &AuthToken,
        transition: models::SubmissionTransition,
    ) -> Result<(), StoreError>;
    fn get_mail_template(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        template_id: MailTemplateId,
    ) -> Result<models::MailTemplate, StoreError>;
    /// Get the activity log of the event, newest entries first
    fn get_activity_log(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<models::ActivityLogEntry>, StoreError>;

    /// Claim all queued, not yet sent mails of the event for delivery, in the order of their
    /// creation.
    ///
    /// The claimed mails are marked as sent in the same statement, so concurrent deliveries never
    /// get the same mail. Mails which could not be delivered must be handed back with
    /// [Self::release_mail].
    fn claim_pending_mails(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<models::QueuedMail>, StoreError>;

    /// Put a claimed mail back into the queue after a failed delivery
    fn release_mail(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        mail_id: QueuedMailId,
    ) -> Result<(), StoreError>;
}

pub trait CallboardStore: Send + Sync {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn CallboardStoreFacade + 'a>, StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    /// Connection the database failed. See string description for details.
    ConnectionError(String),
    /// The query could not be executed because of some error not covered by the other members (see
    /// string description)
    QueryError(diesel::result::Error),
    /// Database transaction could not be commited due to a conflicting concurrent transaction
    TransactionConflict,
    /// The requested entity does not exist
    NotExisting,
    /// The entity could not be created because it already exists
    ConflictEntityExists,
    /// The entity has not been updated because it has been changed concurrently.
    ConcurrentEditConflict,
    /// The client is not authorized for this action. It would need an access role qualifying for
    /// the `required_privilege` on the event `event_id` (or globally if `event_id` is None).
    PermissionDenied {
        required_privilege: Privilege,
        event_id: Option<EventId>,
    },
    /// The provided data is invalid, i.e. it does not match the expected ranges or violates a
    /// SQL constraint. See string description for details.
    InvalidInputData(String),
    /// Some data queried from the database could not be deserialized. See string description for
    /// details.
    InvalidDataInDatabase(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => Self::NotExisting,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => Self::ConflictEntityExists,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::SerializationFailure,
                _,
            ) => Self::TransactionConflict,
            diesel::result::Error::DatabaseError(
                e @ diesel::result::DatabaseErrorKind::ForeignKeyViolation
                | e @ diesel::result::DatabaseErrorKind::CheckViolation,
                _,
            ) => Self::InvalidInputData(format!("{:?}", e)),
            diesel::result::Error::SerializationError(e) => Self::InvalidInputData(e.to_string()),
            diesel::result::Error::DeserializationError(e) => {
                Self::InvalidDataInDatabase(e.to_string())
            }
            _ => Self::QueryError(error),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(error: r2d2::Error) -> Self {
        Self::ConnectionError(error.to_string())
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Error connecting to database: {}", e),
            Self::QueryError(e) => write!(f, "Error while executing database query: {}", e),
            Self::TransactionConflict => f.write_str(
                "Database transaction could not be commited due to a conflicting concurrent \
                 transaction",
            ),
            Self::NotExisting => f.write_str("Database record does not exist."),
            Self::ConflictEntityExists => f.write_str("Database record exists already."),
            Self::ConcurrentEditConflict => f.write_str(
                "Updating the entity has been rejected, because it has been changed concurrently.",
            ),
            Self::PermissionDenied {
                required_privilege,
                event_id: Some(event_id),
            } => {
                write!(
                    f,
                    "Client is not authorized to perform this action. {:?} privilege on event {} \
                     required.",
                    required_privilege, event_id
                )
            }
            Self::PermissionDenied {
                required_privilege,
                event_id: None,
            } => {
                write!(
                    f,
                    "Client is not authorized to perform this action. Global {:?} privilege \
                     required.",
                    required_privilege
                )
            }
            Self::InvalidInputData(e) => {
                write!(f, "Data to be stored in database is not valid: {}", e)
            }
            Self::InvalidDataInDatabase(e) => {
                write!(f, "Data queried from database could not be deserialized: {}", e)
            }
        }
    }
}

impl std::error::Error for StoreError {}

pub struct EnumMemberNotExistingError {
    pub member_value: String,
    pub enum_name: &'static str,
}

impl Display for EnumMemberNotExistingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is not a valid value for {} enum",
            self.member_value, self.enum_name
        )
    }
}
