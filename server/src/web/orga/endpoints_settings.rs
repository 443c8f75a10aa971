use crate::web::orga::context::OrgaContext;
use crate::web::orga::OrgaError;
use crate::web::AppState;
use actix_web::{get, put, web, Responder};
use log::info;

#[get("/settings")]
async fn get_settings(
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let settings = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        Ok(store.get_event_settings(&auth, event.id)?)
    })
    .await??;
    Ok(web::Json(callboard_api_types::EventSettings::from(settings)))
}

#[put("/settings")]
async fn update_settings(
    body: web::Json<callboard_api_types::EventSettings>,
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let update = body.into_inner();
    let settings = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        let mut settings = store.get_event_settings(&auth, event.id)?;
        settings.apply_update(update);
        store.update_event_settings(&auth, event.id, &settings)?;
        info!("Updated settings of {}", event.slug);
        Ok(settings)
    })
    .await??;
    Ok(web::Json(callboard_api_types::EventSettings::from(settings)))
}
