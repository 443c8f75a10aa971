use super::{
    models, schema, CallboardStore, CallboardStoreFacade, EventId, MailTemplateId, QueuedMailId,
    StoreError, SubmissionId, TalkSlotId, UserId,
};
use crate::data_store::auth_token::{AccessRole, AuthToken, GlobalAuthToken, Privilege};
use crate::mail::templates::DefaultTemplate;
use crate::settings::EventSettings;
use crate::submission_code::generate_unused_code;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use std::collections::HashMap;

#[derive(Clone)]
pub struct PgDataStore {
    pool: diesel::r2d2::Pool<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let connection_manager = diesel::r2d2::ConnectionManager::<PgConnection>::new(database_url);
        Ok(Self {
            pool: diesel::r2d2::Pool::builder()
                .test_on_check_out(true)
                .min_idle(Some(2))
                .build(connection_manager)?,
        })
    }
}

impl CallboardStore for PgDataStore {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn CallboardStoreFacade + 'a>, StoreError> {
        Ok(Box::new(PgDataStoreFacade::with_pooled_connection(
            self.pool.get()?,
        )))
    }
}

pub struct PgDataStoreFacade {
    connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
}

impl PgDataStoreFacade {
    pub fn with_pooled_connection(
        connection: diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<PgConnection>>,
    ) -> Self {
        Self { connection }
    }
}

impl CallboardStoreFacade for PgDataStoreFacade {
    fn get_events(&mut self) -> Result<Vec<models::Event>, StoreError> {
        use schema::events::dsl::*;

        events
            .order_by((date_from.desc(), id.asc()))
            .select(models::Event::as_select())
            .load::<models::Event>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn get_event(&mut self, event_id: EventId) -> Result<models::Event, StoreError> {
        use schema::events::dsl::*;

        events
            .filter(id.eq(event_id))
            .select(models::Event::as_select())
            .first::<models::Event>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn get_event_by_slug(&mut self, event_slug: &str) -> Result<models::Event, StoreError> {
        use schema::events::dsl::*;

        events
            .filter(slug.eq(event_slug))
            .select(models::Event::as_select())
            .first::<models::Event>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn create_event(
        &mut self,
        auth_token: &GlobalAuthToken,
        event: models::NewEvent,
    ) -> Result<EventId, StoreError> {
        use schema::events::dsl::*;
        auth_token.check_privilege(Privilege::CreateEvents)?;
        event.validate().map_err(StoreError::InvalidInputData)?;

        self.connection.transaction(|connection| {
            let event_id = diesel::insert_into(events)
                .values(&event)
                .returning(id)
                .get_result::<EventId>(connection)?;
            build_initial_event_data(event_id, connection)?;
            Ok(event_id)
        })
    }

    fn initialize_event(
        &mut self,
        auth_token: &GlobalAuthToken,
        event_id: EventId,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::CreateEvents)?;

        self.connection
            .transaction(|connection| build_initial_event_data(event_id, connection))
    }

    fn get_cfp(&mut self, the_event_id: EventId) -> Result<models::Cfp, StoreError> {
        use schema::cfps::dsl::*;

        cfps.filter(event_id.eq(the_event_id))
            .select(models::Cfp::as_select())
            .first::<models::Cfp>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn get_user(&mut self, user_id: UserId) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .select(models::User::as_select())
            .first::<models::User>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn get_user_by_email(&mut self, user_email: &str) -> Result<models::User, StoreError> {
        use schema::users::dsl::*;

        users
            .filter(email.eq(user_email.to_lowercase()))
            .select(models::User::as_select())
            .first::<models::User>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn create_user(
        &mut self,
        auth_token: &GlobalAuthToken,
        mut user: models::NewUser,
    ) -> Result<UserId, StoreError> {
        use schema::users::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;
        user.email = user.email.to_lowercase();

        Ok(diesel::insert_into(users)
            .values(&user)
            .returning(id)
            .get_result::<UserId>(&mut self.connection)?)
    }

    fn is_organizer(
        &mut self,
        user: &models::User,
        the_event_id: EventId,
    ) -> Result<bool, StoreError> {
        use schema::event_permissions::dsl::*;

        if user.is_superuser {
            return Ok(true);
        }
        Ok(diesel::select(exists(
            event_permissions
                .filter(event_id.eq(the_event_id))
                .filter(user_id.eq(user.id))
                .filter(is_orga),
        ))
        .get_result::<bool>(&mut self.connection)?)
    }

    fn get_organized_events(
        &mut self,
        user: &models::User,
    ) -> Result<Vec<models::Event>, StoreError> {
        use schema::event_permissions;
        use schema::events;

        if user.is_superuser {
            return self.get_events();
        }
        Ok(events::table
            .filter(exists(
                event_permissions::table
                    .filter(event_permissions::event_id.eq(events::id))
                    .filter(event_permissions::user_id.eq(user.id))
                    .filter(event_permissions::is_orga),
            ))
            .order_by((events::date_from.desc(), events::id.asc()))
            .select(models::Event::as_select())
            .load::<models::Event>(&mut self.connection)?)
    }

    fn grant_organizer(
        &mut self,
        auth_token: &GlobalAuthToken,
        the_event_id: EventId,
        the_user_id: UserId,
    ) -> Result<(), StoreError> {
        use schema::event_permissions::dsl::*;
        auth_token.check_privilege(Privilege::ManageUsers)?;

        self.connection.transaction(|connection| {
            let already_granted = diesel::select(exists(
                event_permissions
                    .filter(event_id.eq(the_event_id))
                    .filter(user_id.eq(the_user_id))
                    .filter(is_orga),
            ))
            .get_result::<bool>(connection)?;
            if already_granted {
                return Ok(());
            }
            diesel::insert_into(event_permissions)
                .values(&models::NewEventPermission {
                    event_id: the_event_id,
                    user_id: Some(the_user_id),
                    is_orga: true,
                    invitation_token: None,
                    invitation_email: None,
                })
                .execute(connection)?;
            Ok(())
        })
    }

    fn create_invitation(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
        email: &str,
        token: &str,
    ) -> Result<(), StoreError> {
        use schema::event_permissions::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::InviteOrganizers)?;

        diesel::insert_into(event_permissions)
            .values(&models::NewEventPermission {
                event_id: the_event_id,
                user_id: None,
                is_orga: true,
                invitation_token: Some(token.to_owned()),
                invitation_email: Some(email.to_lowercase()),
            })
            .execute(&mut self.connection)?;
        Ok(())
    }

    fn get_invitation(&mut self, token: &str) -> Result<models::EventPermission, StoreError> {
        use schema::event_permissions::dsl::*;

        event_permissions
            .filter(invitation_token.eq(token))
            .filter(user_id.is_null())
            .select(models::EventPermission::as_select())
            .first::<models::EventPermission>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn accept_invitation(
        &mut self,
        token: &str,
        the_user_id: UserId,
    ) -> Result<EventId, StoreError> {
        use schema::event_permissions::dsl::*;

        self.connection.transaction(|connection| {
            let invitation = event_permissions
                .filter(invitation_token.eq(token))
                .filter(user_id.is_null())
                .select(models::EventPermission::as_select())
                .for_update()
                .first::<models::EventPermission>(connection)?;
            diesel::update(event_permissions)
                .filter(id.eq(invitation.id))
                .set((user_id.eq(the_user_id), invitation_token.eq(None::<String>)))
                .execute(connection)?;
            Ok(invitation.event_id)
        })
    }

    fn get_auth_token_for_user(
        &mut self,
        the_user_id: Option<UserId>,
        the_event_id: EventId,
    ) -> Result<AuthToken, StoreError> {
        let Some(the_user_id) = the_user_id else {
            return Ok(AuthToken::create_for_user(the_event_id, None, vec![]));
        };
        let user = self.get_user(the_user_id)?;

        let mut roles = vec![AccessRole::Speaker];
        if self.is_organizer(&user, the_event_id)? {
            roles.push(AccessRole::Organizer);
        }
        if user.is_superuser {
            roles.push(AccessRole::Superuser);
        }
        Ok(AuthToken::create_for_user(
            the_event_id,
            Some(the_user_id),
            roles,
        ))
    }

    fn get_event_settings(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
    ) -> Result<EventSettings, StoreError> {
        use schema::event_settings;
        use schema::global_settings;
        auth_token.check_privilege(the_event_id, Privilege::EditSettings)?;

        self.connection.transaction(|connection| {
            let global_values: HashMap<String, String> = global_settings::table
                .select((global_settings::key, global_settings::value))
                .load::<(String, String)>(connection)?
                .into_iter()
                .collect();
            let event_values: HashMap<String, String> = event_settings::table
                .filter(event_settings::event_id.eq(the_event_id))
                .select((event_settings::key, event_settings::value))
                .load::<(String, String)>(connection)?
                .into_iter()
                .collect();
            Ok(EventSettings::from_layers(&global_values, &event_values)?)
        })
    }

    fn update_event_settings(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
        settings: &EventSettings,
    ) -> Result<(), StoreError> {
        use schema::event_settings::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::EditSettings)?;

        self.connection.transaction(|connection| {
            for (the_key, the_value) in settings.to_values() {
                diesel::insert_into(event_settings)
                    .values((
                        event_id.eq(the_event_id),
                        key.eq(the_key),
                        value.eq(&the_value),
                    ))
                    .on_conflict((event_id, key))
                    .do_update()
                    .set(value.eq(&the_value))
                    .execute(connection)?;
            }
            Ok(())
        })
    }

    fn get_rooms(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
    ) -> Result<Vec<models::Room>, StoreError> {
        use schema::rooms::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::ShowSchedule)?;

        Ok(rooms
            .select(models::Room::as_select())
            .filter(event_id.eq(the_event_id))
            .order_by((position.asc(), id.asc()))
            .load::<models::Room>(&mut self.connection)?)
    }

    fn create_room(
        &mut self,
        auth_token: &AuthToken,
        room: models::Room,
    ) -> Result<(), StoreError> {
        use schema::rooms::dsl::*;
        auth_token.check_privilege(room.event_id, Privilege::EditSchedule)?;

        diesel::insert_into(rooms)
            .values(&room)
            .execute(&mut self.connection)?;
        Ok(())
    }

    fn get_wip_schedule_talks(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
    ) -> Result<Vec<models::FullTalkSlot>, StoreError> {
        use schema::{submission_types, submissions, talk_slots};
        auth_token.check_privilege(the_event_id, Privilege::ShowSchedule)?;

        self.connection.transaction(|connection| {
            let schedule_id = get_wip_schedule_id(the_event_id, connection)?;
            let rows = talk_slots::table
                .inner_join(submissions::table.inner_join(submission_types::table))
                .filter(talk_slots::schedule_id.eq(schedule_id))
                .order_by((talk_slots::start.asc(), submissions::title.asc()))
                .select((
                    models::TalkSlot::as_select(),
                    models::Submission::as_select(),
                    models::SubmissionType::as_select(),
                ))
                .load::<(models::TalkSlot, models::Submission, models::SubmissionType)>(
                    connection,
                )?;
            let (slots, submission_rows): (Vec<_>, Vec<_>) = rows
                .into_iter()
                .map(|(slot, submission, submission_type)| (slot, (submission, submission_type)))
                .unzip();
            let full_submissions = complete_submissions(submission_rows, connection)?;
            Ok(slots
                .into_iter()
                .zip(full_submissions)
                .map(|(slot, submission)| models::FullTalkSlot { slot, submission })
                .collect())
        })
    }

    fn update_talk_slot(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
        slot_id: TalkSlotId,
        patch: models::TalkSlotPatch,
    ) -> Result<(), StoreError> {
        use schema::talk_slots::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::EditSchedule)?;

        self.connection.transaction(|connection| {
            let wip_schedule_id = get_wip_schedule_id(the_event_id, connection)?;
            if let Some(Some(new_room_id)) = patch.room_id {
                let room_event_id = schema::rooms::table
                    .filter(schema::rooms::id.eq(new_room_id))
                    .select(schema::rooms::event_id)
                    .first::<EventId>(connection)
                    .optional()?;
                if room_event_id != Some(the_event_id) {
                    return Err(StoreError::InvalidInputData(format!(
                        "Room {} does not belong to the event",
                        new_room_id
                    )));
                }
            }
            // The filter on the working schedule also protects against moving slots of other
            // events.
            let query = talk_slots
                .filter(id.eq(slot_id))
                .filter(schedule_id.eq(wip_schedule_id));
            let count = if patch.is_empty() {
                diesel::select(exists(query)).get_result::<bool>(connection)? as usize
            } else {
                diesel::update(query).set(&patch).execute(connection)?
            };
            if count == 0 {
                return Err(StoreError::NotExisting);
            }
            Ok(())
        })
    }

    fn get_submissions(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
    ) -> Result<Vec<models::FullSubmission>, StoreError> {
        use schema::{submission_types, submissions};
        auth_token.check_privilege(the_event_id, Privilege::ManageSubmissions)?;

        self.connection.transaction(|connection| {
            let rows = submissions::table
                .inner_join(submission_types::table)
                .filter(submissions::event_id.eq(the_event_id))
                .order_by((submissions::created.asc(), submissions::id.asc()))
                .select((
                    models::Submission::as_select(),
                    models::SubmissionType::as_select(),
                ))
                .load::<(models::Submission, models::SubmissionType)>(connection)?;
            complete_submissions(rows, connection)
        })
    }

    fn get_submission_by_code(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
        the_code: &str,
    ) -> Result<models::FullSubmission, StoreError> {
        use schema::{submission_types, submissions};
        auth_token.check_privilege(the_event_id, Privilege::ManageSubmissions)?;

        self.connection.transaction(|connection| {
            let row = submissions::table
                .inner_join(submission_types::table)
                .filter(submissions::event_id.eq(the_event_id))
                .filter(submissions::code.eq(the_code.to_uppercase()))
                .select((
                    models::Submission::as_select(),
                    models::SubmissionType::as_select(),
                ))
                .first::<(models::Submission, models::SubmissionType)>(connection)?;
            complete_submissions(vec![row], connection)?
                .pop()
                .ok_or(StoreError::NotExisting)
        })
    }

    fn create_submission(
        &mut self,
        auth_token: &AuthToken,
        mut proposal: models::SubmissionProposal,
    ) -> Result<String, StoreError> {
        use schema::submissions::dsl::*;
        auth_token.check_privilege(proposal.event_id, Privilege::SubmitProposal)?;
        if !auth_token.has_privilege(proposal.event_id, Privilege::ManageSubmissions) {
            // Speakers may only submit proposals for themselves
            proposal.speaker_ids = auth_token.user_id().into_iter().collect();
        }
        if proposal.speaker_ids.is_empty() {
            return Err(StoreError::InvalidInputData(
                "A submission needs at least one speaker".to_owned(),
            ));
        }

        self.connection.transaction(|connection| {
            let type_id = match proposal.submission_type_id {
                Some(type_id) => schema::submission_types::table
                    .filter(schema::submission_types::id.eq(type_id))
                    .filter(schema::submission_types::event_id.eq(proposal.event_id))
                    .select(schema::submission_types::id)
                    .first::<i32>(connection)
                    .optional()?
                    .ok_or_else(|| {
                        StoreError::InvalidInputData(format!(
                            "Submission type {} does not belong to the event",
                            type_id
                        ))
                    })?,
                None => schema::cfps::table
                    .filter(schema::cfps::event_id.eq(proposal.event_id))
                    .select(schema::cfps::default_type_id)
                    .first::<i32>(connection)?,
            };
            let new_code = generate_unused_code(&mut rand::thread_rng(), |candidate| {
                diesel::select(exists(submissions.filter(code.eq(candidate))))
                    .get_result::<bool>(connection)
            })?;
            let speaker_ids = std::mem::take(&mut proposal.speaker_ids);
            let new_submission = proposal.into_new_submission(new_code.clone(), type_id);
            diesel::insert_into(submissions)
                .values(&new_submission)
                .execute(connection)?;
            diesel::insert_into(schema::submission_speakers::table)
                .values(
                    speaker_ids
                        .into_iter()
                        .map(|speaker_id| models::SubmissionSpeaker {
                            submission_id: new_submission.id,
                            user_id: speaker_id,
                        })
                        .collect::<Vec<_>>(),
                )
                .execute(connection)?;
            Ok(new_code)
        })
    }

    fn apply_submission_transition(
        &mut self,
        auth_token: &AuthToken,
        transition: models::SubmissionTransition,
    ) -> Result<(), StoreError> {
        use schema::submissions::dsl::*;
        auth_token.check_privilege(transition.event_id, Privilege::ManageSubmissions)?;

        self.connection.transaction(|connection| {
            // Locking the row makes concurrent transitions of the same submission wait for this
            // transaction, so that they see the new state afterwards.
            let current_state = submissions
                .filter(id.eq(transition.submission_id))
                .filter(event_id.eq(transition.event_id))
                .select(state)
                .for_update()
                .first::<models::SubmissionState>(connection)?;
            if current_state != transition.expected_state {
                return Err(StoreError::ConcurrentEditConflict);
            }
            diesel::update(submissions)
                .filter(id.eq(transition.submission_id))
                .set(state.eq(transition.new_state))
                .execute(connection)?;

            diesel::insert_into(schema::activity_log::table)
                .values(&transition.log_entry)
                .execute(connection)?;

            apply_slot_change(
                transition.event_id,
                transition.submission_id,
                transition.slot_change,
                connection,
            )?;

            diesel::insert_into(schema::queued_mails::table)
                .values(&transition.mails)
                .execute(connection)?;
            Ok(())
        })
    }

    fn get_mail_template(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
        template_id: MailTemplateId,
    ) -> Result<models::MailTemplate, StoreError> {
        use schema::mail_templates::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::ManageSubmissions)?;

        mail_templates
            .filter(id.eq(template_id))
            .filter(event_id.eq(the_event_id))
            .select(models::MailTemplate::as_select())
            .first::<models::MailTemplate>(&mut self.connection)
            .map_err(|e| e.into())
    }

    fn get_activity_log(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
    ) -> Result<Vec<models::ActivityLogEntry>, StoreError> {
        use schema::activity_log::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::ManageSubmissions)?;

        Ok(activity_log
            .filter(event_id.eq(the_event_id))
            .order_by((created.desc(), id.desc()))
            .select(models::ActivityLogEntry::as_select())
            .load::<models::ActivityLogEntry>(&mut self.connection)?)
    }

    fn claim_pending_mails(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
    ) -> Result<Vec<models::QueuedMail>, StoreError> {
        use schema::queued_mails::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::ManageSubmissions)?;

        // Concurrent claims block on the row locks and re-check `sent IS NULL` afterwards
        let mut claimed = diesel::update(queued_mails)
            .filter(event_id.eq(the_event_id))
            .filter(sent.is_null())
            .set(sent.eq(Some(chrono::Utc::now())))
            .returning(models::QueuedMail::as_returning())
            .get_results::<models::QueuedMail>(&mut self.connection)?;
        claimed.sort_by_key(|mail| (mail.created, mail.id));
        Ok(claimed)
    }

    fn release_mail(
        &mut self,
        auth_token: &AuthToken,
        the_event_id: EventId,
        mail_id: QueuedMailId,
    ) -> Result<(), StoreError> {
        use schema::queued_mails::dsl::*;
        auth_token.check_privilege(the_event_id, Privilege::ManageSubmissions)?;

        let count = diesel::update(queued_mails)
            .filter(id.eq(mail_id))
            .filter(event_id.eq(the_event_id))
            .filter(sent.is_not_null())
            .set(sent.eq(None::<chrono::DateTime<chrono::Utc>>))
            .execute(&mut self.connection)?;
        if count == 0 {
            return Err(StoreError::NotExisting);
        }
        Ok(())
    }
}

/// Create the missing initial data of an event: default submission type and call for papers,
/// working schedule, default mail templates (in this order).
fn build_initial_event_data(
    the_event_id: EventId,
    connection: &mut PgConnection,
) -> Result<(), StoreError> {
    use schema::{cfps, events, mail_templates, schedules, submission_types};

    let event = events::table
        .filter(events::id.eq(the_event_id))
        .select(models::Event::as_select())
        .for_update()
        .first::<models::Event>(connection)?;

    let has_cfp = diesel::select(exists(cfps::table.filter(cfps::event_id.eq(the_event_id))))
        .get_result::<bool>(connection)?;
    if !has_cfp {
        let existing_type_id = submission_types::table
            .filter(submission_types::event_id.eq(the_event_id))
            .order_by(submission_types::id.asc())
            .select(submission_types::id)
            .first::<i32>(connection)
            .optional()?;
        let default_type_id = match existing_type_id {
            Some(type_id) => type_id,
            None => diesel::insert_into(submission_types::table)
                .values(&models::NewSubmissionType {
                    event_id: the_event_id,
                    name: crate::i18n::LocalizedString::from_translations([
                        ("en", "Talk"),
                        ("de", "Vortrag"),
                    ]),
                    default_duration: 30,
                })
                .returning(submission_types::id)
                .get_result::<i32>(connection)?,
        };
        diesel::insert_into(cfps::table)
            .values(&models::Cfp {
                event_id: the_event_id,
                deadline: None,
                default_type_id,
            })
            .execute(connection)?;
    }

    let has_wip_schedule = diesel::select(exists(
        schedules::table
            .filter(schedules::event_id.eq(the_event_id))
            .filter(schedules::version.is_null()),
    ))
    .get_result::<bool>(connection)?;
    if !has_wip_schedule {
        diesel::insert_into(schedules::table)
            .values(&models::NewSchedule {
                event_id: the_event_id,
                version: None,
            })
            .execute(connection)?;
    }

    let mut create_template = |template: DefaultTemplate| {
        diesel::insert_into(mail_templates::table)
            .values(&template.build(the_event_id))
            .returning(mail_templates::id)
            .get_result::<MailTemplateId>(connection)
    };
    let accept_template_id = match event.accept_template_id {
        Some(template_id) => template_id,
        None => create_template(DefaultTemplate::Accept)?,
    };
    let ack_template_id = match event.ack_template_id {
        Some(template_id) => template_id,
        None => create_template(DefaultTemplate::Ack)?,
    };
    let reject_template_id = match event.reject_template_id {
        Some(template_id) => template_id,
        None => create_template(DefaultTemplate::Reject)?,
    };
    diesel::update(events::table)
        .filter(events::id.eq(the_event_id))
        .set((
            events::accept_template_id.eq(accept_template_id),
            events::ack_template_id.eq(ack_template_id),
            events::reject_template_id.eq(reject_template_id),
        ))
        .execute(connection)?;
    Ok(())
}

fn get_wip_schedule_id(
    the_event_id: EventId,
    connection: &mut PgConnection,
) -> Result<i32, StoreError> {
    use schema::schedules::dsl::*;

    schedules
        .filter(event_id.eq(the_event_id))
        .filter(version.is_null())
        .select(id)
        .first::<i32>(connection)
        .map_err(|e| e.into())
}

fn apply_slot_change(
    the_event_id: EventId,
    the_submission_id: SubmissionId,
    slot_change: models::SlotChange,
    connection: &mut PgConnection,
) -> Result<(), StoreError> {
    use schema::talk_slots::dsl::*;

    let wip_schedule_id = get_wip_schedule_id(the_event_id, connection)?;
    let query = talk_slots
        .filter(submission_id.eq(the_submission_id))
        .filter(schedule_id.eq(wip_schedule_id));
    match slot_change {
        models::SlotChange::CreateInWipSchedule => {
            let has_slot = diesel::select(exists(query)).get_result::<bool>(connection)?;
            if !has_slot {
                diesel::insert_into(talk_slots)
                    .values(&models::NewTalkSlot {
                        id: uuid::Uuid::now_v7(),
                        submission_id: the_submission_id,
                        schedule_id: wip_schedule_id,
                    })
                    .execute(connection)?;
            }
        }
        models::SlotChange::RemoveFromWipSchedule => {
            diesel::delete(query).execute(connection)?;
        }
    }
    Ok(())
}

/// Load the speakers of the given submissions and combine them into [models::FullSubmission]s,
/// keeping the order of the submissions.
fn complete_submissions(
    rows: Vec<(models::Submission, models::SubmissionType)>,
    connection: &mut PgConnection,
) -> Result<Vec<models::FullSubmission>, StoreError> {
    use schema::{submission_speakers, users};

    let submission_ids: Vec<SubmissionId> = rows.iter().map(|(s, _)| s.id).collect();
    let mut speakers_by_submission: HashMap<SubmissionId, Vec<models::User>> = HashMap::new();
    for (the_submission_id, speaker) in submission_speakers::table
        .inner_join(users::table)
        .filter(submission_speakers::submission_id.eq_any(submission_ids))
        .order_by((submission_speakers::submission_id, users::name))
        .select((
            submission_speakers::submission_id,
            models::User::as_select(),
        ))
        .load::<(SubmissionId, models::User)>(connection)?
    {
        speakers_by_submission
            .entry(the_submission_id)
            .or_default()
            .push(speaker);
    }

    Ok(rows
        .into_iter()
        .map(|(submission, submission_type)| models::FullSubmission {
            speakers: speakers_by_submission
                .remove(&submission.id)
                .unwrap_or_default(),
            submission,
            submission_type,
        })
        .collect())
}
