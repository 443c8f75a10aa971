//! JSON API of the schedule editor, working on the event's unreleased (work in progress) schedule

use crate::data_store::models::TalkSlotPatch;
use crate::data_store::TalkSlotId;
use crate::web::orga::context::OrgaContext;
use crate::web::orga::OrgaError;
use crate::web::AppState;
use actix_web::{get, patch, web, HttpResponse, Responder};
use callboard_api_types::{RoomList, TalkList, TalkUpdate};

#[get("/schedule/api/rooms/")]
async fn list_rooms(
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let (start, end) = (event.date_from, event.date_to);
    let rooms = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        Ok(store.get_rooms(&auth, event.id)?)
    })
    .await??;
    Ok(web::Json(RoomList {
        start,
        end,
        rooms: rooms.into_iter().map(|room| room.into()).collect(),
    }))
}

#[get("/schedule/api/talks/")]
async fn list_talks(
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let talks = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        Ok(store.get_wip_schedule_talks(&auth, event.id)?)
    })
    .await??;
    Ok(web::Json(TalkList {
        results: talks.into_iter().map(|talk| talk.into()).collect(),
    }))
}

#[patch("/schedule/api/talks/{talk_id}/")]
async fn update_talk(
    path: web::Path<(String, TalkSlotId)>,
    body: web::Json<TalkUpdate>,
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let (_event_slug, slot_id) = path.into_inner();
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let patch = TalkSlotPatch::from(body.into_inner());
    web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        Ok(store.update_talk_slot(&auth, event.id, slot_id, patch)?)
    })
    .await??;
    Ok(HttpResponse::NoContent().finish())
}
