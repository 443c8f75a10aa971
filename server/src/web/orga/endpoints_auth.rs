use crate::auth_session::{verify_password, SessionToken};
use crate::data_store::StoreError;
use crate::web::orga::context::{accept_language_header, request_locale, OrgaContext};
use crate::web::orga::{create_session_cookie, session_removal_cookie, OrgaError};
use crate::web::AppState;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use callboard_api_types::{LoginInfo, OrganizedEvents};
use log::info;
use serde::Deserialize;

pub async fn login_info(ctx: OrgaContext) -> Result<impl Responder, OrgaError> {
    Ok(web::Json(LoginInfo {
        authenticated: ctx.user.is_some(),
        user: ctx.user.map(|user| user.into()),
        locale: ctx.locale.language,
        timezone: ctx.locale.timezone.name().to_owned(),
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse, OrgaError> {
    let store = state.store.clone();
    let user = web::block(move || -> Result<_, OrgaError> {
        let mut store = store.get_facade()?;
        let user = store.get_user_by_email(&body.email).map_err(|e| match e {
            StoreError::NotExisting => OrgaError::LoginFailed,
            e => e.into(),
        })?;
        if !verify_password(&body.password, &user.password_hash) {
            return Err(OrgaError::LoginFailed);
        }
        Ok(user)
    })
    .await??;
    info!("User {} logged in", user.email);

    let session_token = SessionToken::new(user.id);
    let locale = request_locale(
        &state.site_config,
        Some(&user),
        &accept_language_header(&req),
        None,
    );
    Ok(HttpResponse::Ok()
        .cookie(create_session_cookie(&session_token, &state.secret))
        .json(LoginInfo {
            authenticated: true,
            user: Some(user.into()),
            locale: locale.language,
            timezone: locale.timezone.name().to_owned(),
        }))
}

#[post("/logout")]
async fn logout() -> impl Responder {
    HttpResponse::NoContent()
        .cookie(session_removal_cookie())
        .finish()
}

#[get("/events")]
async fn list_organized_events(ctx: OrgaContext) -> Result<impl Responder, OrgaError> {
    Ok(web::Json(OrganizedEvents {
        events: ctx.orga_events.into_iter().map(|e| e.into()).collect(),
    }))
}
