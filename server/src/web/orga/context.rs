use crate::auth_session::{SessionToken, SESSION_MAX_AGE};
use crate::data_store::models::{Event, User};
use crate::data_store::{StoreError, UserId};
use crate::locale::{select_request_locale, EventLocales, RequestLocale, UserLocales};
use crate::setup::SiteConfig;
use crate::web::orga::{OrgaError, ANONYMOUS_ROUTES, SESSION_COOKIE_NAME};
use crate::web::AppState;
use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, AcceptLanguage, Header, LanguageTag, Preference};
use actix_web::middleware::Next;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use log::debug;
use std::future::{ready, Ready};

/// Per-request state of the organizer area, created by [orga_session_middleware] and completed
/// by [orga_event_middleware] for event-specific routes.
///
/// Endpoints receive it as an extractor.
#[derive(Clone, Debug)]
pub struct OrgaContext {
    pub user: Option<User>,
    /// The event addressed by the `{event}` slug of the route, if it exists
    pub event: Option<Event>,
    /// Is the user organizer of [OrgaContext::event] (or superuser)?
    pub is_orga: bool,
    /// The events, the user is organizer of
    pub orga_events: Vec<Event>,
    pub locale: RequestLocale,
}

impl OrgaContext {
    pub fn user(&self) -> Result<&User, OrgaError> {
        self.user.as_ref().ok_or(OrgaError::NotAuthenticated)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|user| user.id)
    }

    pub fn event(&self) -> Result<&Event, OrgaError> {
        self.event.as_ref().ok_or(OrgaError::NotExisting)
    }
}

impl FromRequest for OrgaContext {
    type Error = OrgaError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<OrgaContext>().cloned().ok_or_else(|| {
            OrgaError::InternalError("Organizer context has not been set up".to_owned())
        }))
    }
}

/// Language and timezone for the request, based on the user's preferences, the browser's
/// `Accept-Language` header and the event.
pub fn request_locale(
    site_config: &SiteConfig,
    user: Option<&User>,
    browser_languages: &[Preference<LanguageTag>],
    event: Option<&Event>,
) -> RequestLocale {
    let event_locales = event.map(|event| event.locales());
    select_request_locale(
        site_config,
        user.map(|user| UserLocales {
            locale: user.locale.as_deref(),
            timezone: user.timezone.as_deref(),
        }),
        browser_languages,
        event.zip(event_locales.as_deref()).map(|(event, locales)| EventLocales {
            locales,
            default_locale: &event.locale,
            timezone: &event.timezone,
        }),
    )
}

/// The languages of the request's `Accept-Language` header, ranked by quality. A missing or
/// malformed header gives an empty list.
pub fn accept_language_header(req: &HttpRequest) -> Vec<Preference<LanguageTag>> {
    AcceptLanguage::parse(req)
        .map(|accept_language| accept_language.ranked())
        .unwrap_or_default()
}

/// Middleware for the whole organizer area.
///
/// Loads the logged-in user from the session cookie, together with the list of events they
/// organize, and selects the request locale. Anonymous requests to routes not listed in
/// [ANONYMOUS_ROUTES] are redirected to the login route. The `Content-Language` header of the
/// response is set to the selected language.
pub async fn orga_session_middleware<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let context = match load_session_context(req.request()).await {
        Ok(context) => context,
        Err(e) => return Ok(req.error_response(e).map_into_right_body()),
    };

    let allow_anonymous = req
        .request()
        .match_name()
        .is_some_and(|name| ANONYMOUS_ROUTES.contains(&name));
    if context.user.is_none() && !allow_anonymous {
        let login_url = match req.request().url_for_static("login") {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("next", req.path());
                url.to_string()
            }
            Err(e) => return Ok(req.error_response(OrgaError::from(e)).map_into_right_body()),
        };
        debug!("Redirecting anonymous request for {} to login", req.path());
        let response = HttpResponse::Found()
            .insert_header((header::LOCATION, login_url))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    }

    req.extensions_mut().insert(context);
    let mut response = next.call(req).await?;

    let language = response
        .request()
        .extensions()
        .get::<OrgaContext>()
        .map(|context| context.locale.language.clone());
    if let Some(value) = language.and_then(|l| header::HeaderValue::from_str(&l).ok()) {
        response
            .headers_mut()
            .insert(header::CONTENT_LANGUAGE, value);
    }
    Ok(response.map_into_left_body())
}

async fn load_session_context(req: &HttpRequest) -> Result<OrgaContext, OrgaError> {
    let state = app_state(req)?;
    let session_token = req.cookie(SESSION_COOKIE_NAME).and_then(|cookie| {
        SessionToken::from_string(cookie.value(), &state.secret, SESSION_MAX_AGE)
            .map_err(|e| debug!("Ignoring session cookie: {}", e))
            .ok()
    });

    let store = state.store.clone();
    let (user, orga_events) = web::block(move || -> Result<_, OrgaError> {
        let Some(session_token) = session_token else {
            return Ok((None, vec![]));
        };
        let mut store = store.get_facade()?;
        let user = match store.get_user(session_token.user_id()) {
            Ok(user) => user,
            // The account has been deleted since login
            Err(StoreError::NotExisting) => return Ok((None, vec![])),
            Err(e) => return Err(e.into()),
        };
        let orga_events = store.get_organized_events(&user)?;
        Ok((Some(user), orga_events))
    })
    .await??;

    let locale = request_locale(
        &state.site_config,
        user.as_ref(),
        &accept_language_header(req),
        None,
    );
    Ok(OrgaContext {
        user,
        event: None,
        is_orga: false,
        orga_events,
        locale,
    })
}

/// Middleware for the event-specific routes below `/orga/event/{event}`.
///
/// Resolves the event from the slug in the route, checks the user's organizer permission for it
/// and selects the request locale again, taking the event into account. Requests of
/// non-organizers are refused with [OrgaError::PermissionDenied]. Unknown events are left for the
/// endpoint to report.
pub async fn orga_event_middleware<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let context = match load_event_context(req.request()).await {
        Ok(context) => context,
        Err(e) => return Ok(req.error_response(e).map_into_right_body()),
    };
    if context.event.is_some() && !context.is_orga {
        return Ok(req
            .error_response(OrgaError::PermissionDenied {
                required_privilege: None,
            })
            .map_into_right_body());
    }
    req.extensions_mut().insert(context);
    Ok(next.call(req).await?.map_into_left_body())
}

async fn load_event_context(req: &HttpRequest) -> Result<OrgaContext, OrgaError> {
    let state = app_state(req)?;
    let mut context = req
        .extensions()
        .get::<OrgaContext>()
        .cloned()
        .ok_or_else(|| {
            OrgaError::InternalError("Organizer context has not been set up".to_owned())
        })?;
    let slug = req.match_info().get("event").unwrap_or_default().to_owned();

    let store = state.store.clone();
    let user = context.user.clone();
    let (event, is_orga) = web::block(move || -> Result<_, OrgaError> {
        let mut store = store.get_facade()?;
        let event = match store.get_event_by_slug(&slug) {
            Ok(event) => event,
            Err(StoreError::NotExisting) => return Ok((None, false)),
            Err(e) => return Err(e.into()),
        };
        let is_orga = match &user {
            Some(user) => store.is_organizer(user, event.id)?,
            None => false,
        };
        Ok((Some(event), is_orga))
    })
    .await??;

    context.locale = request_locale(
        &state.site_config,
        context.user.as_ref(),
        &accept_language_header(req),
        event.as_ref(),
    );
    context.event = event;
    context.is_orga = is_orga;
    Ok(context)
}

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, OrgaError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| OrgaError::InternalError("Application state is missing".to_owned()))
}
