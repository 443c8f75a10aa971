use crate::auth_session::generate_invitation_token;
use crate::mail::OutgoingMail;
use crate::web::orga::context::OrgaContext;
use crate::web::orga::OrgaError;
use crate::web::AppState;
use actix_web::{post, web, HttpRequest, HttpResponse, Responder};
use callboard_api_types::{CreatedInvitation, Invitation};
use log::{error, info};
use serde::Deserialize;

#[derive(Deserialize)]
struct InvitationRequest {
    email: String,
}

/// Invite a new organizer by email. The invited person receives a mail with the link to accept
/// the invitation.
#[post("/invitations")]
async fn create_invitation(
    body: web::Json<InvitationRequest>,
    ctx: OrgaContext,
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<impl Responder, OrgaError> {
    let event = ctx.event()?.clone();
    let user_id = ctx.user_id();
    let email = body.into_inner().email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(OrgaError::InvalidData(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    let token = generate_invitation_token();
    let invitation_url = req.url_for("invitation.view", [&token])?.to_string();
    let language = ctx.locale.language;

    let created_invitation = CreatedInvitation {
        email: email.clone(),
        token: token.clone(),
    };
    web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let auth = store.get_auth_token_for_user(user_id, event.id)?;
        store.create_invitation(&auth, event.id, &email, &token)?;
        info!("Invited {} as organizer of {}", email, event.slug);

        let settings = store.get_event_settings(&auth, event.id)?;
        let event_name = event.name.localize(&language);
        let mail = OutgoingMail {
            from: settings.mail_from.clone(),
            to: email.clone(),
            reply_to: event.email.clone(),
            subject: format!("You have been invited to the organizer team of {}", event_name),
            text: format!(
                "Hi!\n\nYou have been invited to the organizer team of {}. Please follow this link \
                to accept the invitation:\n\n{}\n",
                event_name, invitation_url
            ),
        };
        // A failed invitation mail does not undo the invitation
        if let Err(e) = state
            .mail
            .backend_for(&settings, false)
            .and_then(|backend| backend.send(&mail))
        {
            error!("Could not send invitation mail to {}: {}", email, e);
        }
        Ok(())
    })
    .await??;

    Ok(HttpResponse::Created().json(created_invitation))
}

pub async fn show_invitation(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let token = path.into_inner();
    let invitation = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let permission = store.get_invitation(&token)?;
        let event = store.get_event(permission.event_id)?;
        Ok(Invitation {
            event: event.slug,
            event_name: event.name.into(),
            email: permission.invitation_email.unwrap_or_default(),
        })
    })
    .await??;
    Ok(web::Json(invitation))
}

/// Accept the invitation as the logged-in user
pub async fn accept_invitation(
    path: web::Path<String>,
    ctx: OrgaContext,
    state: web::Data<AppState>,
) -> Result<impl Responder, OrgaError> {
    let token = path.into_inner();
    let user = ctx.user()?.clone();
    let event = web::block(move || -> Result<_, OrgaError> {
        let mut store = state.store.get_facade()?;
        let event_id = store.accept_invitation(&token, user.id)?;
        info!("User {} accepted organizer invitation", user.email);
        Ok(store.get_event(event_id)?)
    })
    .await??;
    Ok(web::Json(callboard_api_types::Event::from(event)))
}
