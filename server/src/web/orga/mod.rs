//! The organizer area of the web application
//!
//! All routes live under `/orga` and are wrapped by the middlewares from the [context] module:
//! These load the logged-in user from the session cookie, resolve the event of event-specific
//! routes, enforce the organizer permission and select language and timezone of the request. The
//! result is available to the endpoints as an [context::OrgaContext].

use crate::auth_session::{SessionToken, SESSION_MAX_AGE};
use crate::data_store::auth_token::Privilege;
use crate::data_store::models::SubmissionState;
use crate::data_store::StoreError;
use crate::submission_workflow::WorkflowError;
use actix_web::cookie::Cookie;
use actix_web::error::JsonPayloadError;
use actix_web::middleware::from_fn;
use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    web, HttpResponse,
};
use serde_json::json;
use std::fmt::Display;

mod context;
mod endpoints_auth;
mod endpoints_invitation;
mod endpoints_schedule;
mod endpoints_settings;
mod endpoints_submission;

#[cfg(test)]
mod tests;

const SESSION_COOKIE_NAME: &str = "callboard-session";

/// Names of the routes which can be accessed without being logged in
const ANONYMOUS_ROUTES: &[&str] = &["login", "invitation.view"];

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    let json_config =
        web::JsonConfig::default().error_handler(|err, _req| OrgaError::InvalidJson(err).into());
    cfg.service(
        web::scope("/orga")
            .app_data(json_config)
            .service(
                web::resource("/login")
                    .name("login")
                    .route(web::get().to(endpoints_auth::login_info))
                    .route(web::post().to(endpoints_auth::login)),
            )
            .service(endpoints_auth::logout)
            .service(endpoints_auth::list_organized_events)
            .service(
                web::resource("/invitation/{code}")
                    .name("invitation.view")
                    .route(web::get().to(endpoints_invitation::show_invitation))
                    .route(web::post().to(endpoints_invitation::accept_invitation)),
            )
            .service(
                web::scope("/event/{event}")
                    .service(endpoints_invitation::create_invitation)
                    .service(endpoints_submission::list_submissions)
                    .service(endpoints_submission::create_submission)
                    .service(endpoints_submission::accept_submission)
                    .service(endpoints_submission::reject_submission)
                    .service(endpoints_submission::list_activity_log)
                    .service(endpoints_settings::get_settings)
                    .service(endpoints_settings::update_settings)
                    .service(endpoints_schedule::list_rooms)
                    .service(endpoints_schedule::list_talks)
                    .service(endpoints_schedule::update_talk)
                    .wrap(from_fn(context::orga_event_middleware)),
            )
            .wrap(from_fn(context::orga_session_middleware)),
    );
}

fn create_session_cookie(session_token: &SessionToken, secret: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE_NAME, session_token.as_string(secret));
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_max_age(actix_web::cookie::time::Duration::seconds(
        SESSION_MAX_AGE.num_seconds(),
    ));
    cookie
}

fn session_removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE_NAME, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

#[derive(Debug)]
pub enum OrgaError {
    NotExisting,
    AlreadyExisting,
    /// The user is logged in, but lacks the permission. Without `required_privilege`, the
    /// organizer permission for the requested event is missing.
    PermissionDenied {
        required_privilege: Option<Privilege>,
    },
    NotAuthenticated,
    LoginFailed,
    InvalidJson(JsonPayloadError),
    InvalidData(String),
    IllegalTransition {
        from: SubmissionState,
        to: SubmissionState,
    },
    MissingMailTemplate,
    TransactionConflict,
    ConcurrentEditConflict,
    InternalError(String),
}

impl Display for OrgaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotExisting => f.write_str("Element does not exist")?,
            Self::AlreadyExisting => f.write_str("Element already exists")?,
            Self::PermissionDenied {
                required_privilege: Some(required_privilege),
            } => {
                write!(
                    f,
                    "You are not allowed to perform this action. It requires the role {}.",
                    required_privilege
                        .qualifying_roles()
                        .iter()
                        .map(|role| role.name().to_owned())
                        .collect::<Vec<String>>()
                        .join(" or ")
                )?;
            }
            Self::PermissionDenied {
                required_privilege: None,
            } => f.write_str("You are not an organizer of this event.")?,
            Self::NotAuthenticated => f.write_str("This action requires logging in.")?,
            Self::LoginFailed => f.write_str("Unknown email address or wrong password.")?,
            Self::InvalidJson(e) => write!(f, "Invalid JSON request data: {}", e)?,
            Self::InvalidData(e) => write!(f, "Invalid request data: {}", e)?,
            Self::IllegalTransition { from, to } => write!(
                f,
                "The submission cannot be changed from state {} to {}.",
                from, to
            )?,
            Self::MissingMailTemplate => f.write_str(
                "The event has no mail template for this notification. \
                 Please initialize the event.",
            )?,
            Self::TransactionConflict => {
                f.write_str("Concurrent database transaction conflict. Please retry request.")?
            }
            Self::ConcurrentEditConflict => f.write_str(
                "Editing entity refused due to a concurrent update of the entity.",
            )?,
            Self::InternalError(s) => write!(f, "Internal error: {}", s)?,
        };
        Ok(())
    }
}

impl ResponseError for OrgaError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotExisting => StatusCode::NOT_FOUND,
            Self::AlreadyExisting => StatusCode::CONFLICT,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::LoginFailed => StatusCode::FORBIDDEN,
            Self::InvalidJson(e) => match e {
                JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                JsonPayloadError::Deserialize(json_error) if json_error.is_data() => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::InvalidData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::IllegalTransition { .. } => StatusCode::CONFLICT,
            Self::MissingMailTemplate => StatusCode::CONFLICT,
            Self::TransactionConflict => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConcurrentEditConflict => StatusCode::CONFLICT,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({
                "httpCode": self.status_code().as_u16(),
                "message": self.to_string()
            }))
    }
}

impl From<StoreError> for OrgaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(error) => {
                Self::InternalError(format!("Could not connect to database: {}", error))
            }
            StoreError::QueryError(diesel_error) => Self::InternalError(format!(
                "Error while executing database query: {}",
                diesel_error
            )),
            StoreError::TransactionConflict => Self::TransactionConflict,
            StoreError::NotExisting => Self::NotExisting,
            StoreError::ConflictEntityExists => Self::AlreadyExisting,
            StoreError::ConcurrentEditConflict => Self::ConcurrentEditConflict,
            StoreError::PermissionDenied {
                required_privilege,
                event_id: _,
            } => Self::PermissionDenied {
                required_privilege: Some(required_privilege),
            },
            StoreError::InvalidInputData(e) => Self::InvalidData(e),
            StoreError::InvalidDataInDatabase(e) => Self::InternalError(format!(
                "Data queried from database could not be deserialized: {}",
                e
            )),
        }
    }
}

impl From<WorkflowError> for OrgaError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::IllegalTransition { from, to } => Self::IllegalTransition { from, to },
            WorkflowError::MissingMailTemplate => Self::MissingMailTemplate,
            WorkflowError::StoreError(e) => e.into(),
        }
    }
}

impl From<actix_web::error::BlockingError> for OrgaError {
    fn from(_e: actix_web::error::BlockingError) -> Self {
        OrgaError::InternalError(
            "Could not get thread from thread pool for synchronous database operation.".to_owned(),
        )
    }
}

impl From<actix_web::error::UrlGenerationError> for OrgaError {
    fn from(e: actix_web::error::UrlGenerationError) -> Self {
        OrgaError::InternalError(format!("Could not generate URL: {}", e))
    }
}
