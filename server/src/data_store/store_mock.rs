use crate::data_store::auth_token::{AccessRole, AuthToken, GlobalAuthToken, Privilege};
use crate::data_store::models::{
    ActivityLogEntry, Cfp, Event, EventPermission, FullSubmission, FullTalkSlot, MailTemplate,
    QueuedMail, Room, Schedule, Submission, SubmissionSpeaker, SubmissionState, SubmissionType,
    TalkSlot, User,
};
use crate::data_store::{
    models, CallboardStore, CallboardStoreFacade, EventId, MailTemplateId, QueuedMailId,
    StoreError, TalkSlotId, UserId,
};
use crate::i18n::LocalizedString;
use crate::mail::templates::DefaultTemplate;
use crate::settings::EventSettings;
use crate::submission_code::generate_unused_code;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/**
 * A mock [CallboardStore] implementation for testing.
 *
 * The simulated database consists of the [StoreMockData] structure with vectors of entities. These
 * can be directly modified by the tests.
 *
 * Privileges are checked like in the real store, based on the roles derived from the
 * `event_permissions` and the users' superuser flags. The [StoreMockData::next_error] attribute can
 * be set to simulate a database error.
 */
#[derive(Default)]
pub struct StoreMock {
    pub data: Mutex<StoreMockData>,
}

impl StoreMock {
    pub fn with_data(data: StoreMockData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }
}

impl CallboardStore for StoreMock {
    fn get_facade<'a>(&'a self) -> Result<Box<dyn CallboardStoreFacade + 'a>, StoreError> {
        Ok(Box::new(StoreMockFacade { store: self }))
    }
}

#[derive(Default)]
pub struct StoreMockData {
    pub events: Vec<Event>,
    pub users: Vec<User>,
    pub event_permissions: Vec<EventPermission>,
    pub submission_types: Vec<SubmissionType>,
    pub cfps: Vec<Cfp>,
    pub schedules: Vec<Schedule>,
    pub mail_templates: Vec<MailTemplate>,
    pub rooms: Vec<Room>,
    pub submissions: Vec<Submission>,
    pub submission_speakers: Vec<SubmissionSpeaker>,
    pub talk_slots: Vec<TalkSlot>,
    pub activity_log: Vec<ActivityLogEntry>,
    pub queued_mails: Vec<QueuedMail>,
    pub global_settings: HashMap<String, String>,
    pub event_settings: HashMap<(EventId, String), String>,
    /// If not none, the next call to a store facade method will return this error.
    pub next_error: Option<StoreError>,
}

pub const TEST_EVENT_ID: EventId = 1;
pub const TEST_ORGA_USER_ID: UserId = 1;
pub const TEST_SPEAKER_USER_ID: UserId = 2;
pub const TEST_COSPEAKER_USER_ID: UserId = 3;
pub const TEST_OTHER_USER_ID: UserId = 4;
pub const TEST_PASSWORD: &str = "correct horse battery staple";
pub const TEST_SUBMISSION_CODE: &str = "RUST42";

impl StoreMockData {
    /// Fill the mock database with an initialized event "democon" (languages en, de; timezone
    /// Europe/Berlin), one organizer, two speakers, one unrelated user, a room and a submission by
    /// both speakers in state "submitted".
    ///
    /// All users share the password [TEST_PASSWORD].
    pub fn with_test_event() -> Self {
        let mut data = Self::default();
        data.events.push(Event {
            id: TEST_EVENT_ID,
            slug: "democon".to_owned(),
            name: LocalizedString::from_translations([("en", "DemoCon"), ("de", "DemoKon")]),
            is_public: false,
            date_from: NaiveDate::from_ymd_opt(2025, 9, 1),
            date_to: NaiveDate::from_ymd_opt(2025, 9, 3),
            timezone: "Europe/Berlin".to_owned(),
            email: Some("orga@democon.example".to_owned()),
            color: None,
            locale_array: "en,de".to_owned(),
            locale: "en".to_owned(),
            accept_template_id: None,
            ack_template_id: None,
            reject_template_id: None,
        });
        data.build_initial_event_data(TEST_EVENT_ID);

        let password_hash = crate::auth_session::hash_password(TEST_PASSWORD)
            .expect("Test password should be hashable");
        for (id, email, name, locale) in [
            (TEST_ORGA_USER_ID, "orga@example.com", "Olga Orga", None),
            (TEST_SPEAKER_USER_ID, "ferris@example.com", "Ferris", Some("de")),
            (TEST_COSPEAKER_USER_ID, "corro@example.com", "Corro", None),
            (TEST_OTHER_USER_ID, "visitor@example.com", "Vic Visitor", None),
        ] {
            data.users.push(User {
                id,
                email: email.to_owned(),
                name: name.to_owned(),
                nick: None,
                password_hash: password_hash.clone(),
                locale: locale.map(|l: &str| l.to_owned()),
                timezone: None,
                is_superuser: false,
            });
        }
        data.event_permissions.push(EventPermission {
            id: 1,
            event_id: TEST_EVENT_ID,
            user_id: Some(TEST_ORGA_USER_ID),
            is_orga: true,
            invitation_token: None,
            invitation_email: None,
        });
        data.rooms.push(Room {
            id: Uuid::now_v7(),
            event_id: TEST_EVENT_ID,
            name: LocalizedString::plain("Main Hall"),
            description: LocalizedString::plain(""),
            capacity: Some(300),
            position: Some(1),
        });
        let submission_id = Uuid::now_v7();
        data.submissions.push(Submission {
            id: submission_id,
            code: TEST_SUBMISSION_CODE.to_owned(),
            event_id: TEST_EVENT_ID,
            title: "Fearless Concurrency".to_owned(),
            submission_type_id: data.submission_types[0].id,
            state: SubmissionState::Submitted,
            description: None,
            abstract_text: Some("Threads without fear.".to_owned()),
            notes: None,
            duration: None,
            content_locale: "en".to_owned(),
            do_not_record: false,
            created: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        });
        for user_id in [TEST_SPEAKER_USER_ID, TEST_COSPEAKER_USER_ID] {
            data.submission_speakers.push(SubmissionSpeaker {
                submission_id,
                user_id,
            });
        }
        data
    }

    pub fn submission_by_code(&self, code: &str) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.code == code)
    }

    pub fn wip_schedule_id(&self, event_id: EventId) -> Option<i32> {
        self.schedules
            .iter()
            .find(|s| s.event_id == event_id && s.version.is_none())
            .map(|s| s.id)
    }

    fn build_initial_event_data(&mut self, event_id: EventId) {
        if !self.cfps.iter().any(|c| c.event_id == event_id) {
            let type_id = match self
                .submission_types
                .iter()
                .find(|t| t.event_id == event_id)
            {
                Some(t) => t.id,
                None => {
                    let id = next_id(&self.submission_types, |t| t.id);
                    self.submission_types.push(SubmissionType {
                        id,
                        event_id,
                        name: LocalizedString::plain("Talk"),
                        default_duration: 30,
                    });
                    id
                }
            };
            self.cfps.push(Cfp {
                event_id,
                deadline: None,
                default_type_id: type_id,
            });
        }
        if self.wip_schedule_id(event_id).is_none() {
            self.schedules.push(Schedule {
                id: next_id(&self.schedules, |s| s.id),
                event_id,
                version: None,
                published: None,
            });
        }
        let Some(event_index) = self.events.iter().position(|e| e.id == event_id) else {
            return;
        };
        for template in [
            DefaultTemplate::Accept,
            DefaultTemplate::Ack,
            DefaultTemplate::Reject,
        ] {
            let event = &self.events[event_index];
            let existing = match template {
                DefaultTemplate::Accept => event.accept_template_id,
                DefaultTemplate::Ack => event.ack_template_id,
                DefaultTemplate::Reject => event.reject_template_id,
            };
            if existing.is_some() {
                continue;
            }
            let new_template = template.build(event_id);
            let id = next_id(&self.mail_templates, |t| t.id);
            self.mail_templates.push(MailTemplate {
                id,
                event_id,
                subject: new_template.subject,
                text: new_template.text,
            });
            let event = &mut self.events[event_index];
            match template {
                DefaultTemplate::Accept => event.accept_template_id = Some(id),
                DefaultTemplate::Ack => event.ack_template_id = Some(id),
                DefaultTemplate::Reject => event.reject_template_id = Some(id),
            }
        }
    }

    fn is_organizer(&self, user: &User, event_id: EventId) -> bool {
        user.is_superuser
            || self
                .event_permissions
                .iter()
                .any(|p| p.event_id == event_id && p.user_id == Some(user.id) && p.is_orga)
    }

    fn full_submission(&self, submission: &Submission) -> Result<FullSubmission, StoreError> {
        let submission_type = self
            .submission_types
            .iter()
            .find(|t| t.id == submission.submission_type_id)
            .cloned()
            .ok_or(StoreError::NotExisting)?;
        let mut speakers: Vec<User> = self
            .submission_speakers
            .iter()
            .filter(|s| s.submission_id == submission.id)
            .filter_map(|s| self.users.iter().find(|u| u.id == s.user_id))
            .cloned()
            .collect();
        speakers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(FullSubmission {
            submission: submission.clone(),
            submission_type,
            speakers,
        })
    }
}

fn next_id<T>(items: &[T], get_id: impl Fn(&T) -> i32) -> i32 {
    items.iter().map(get_id).max().unwrap_or(0) + 1
}

struct StoreMockFacade<'a> {
    store: &'a StoreMock,
}

impl StoreMockFacade<'_> {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreMockData>, StoreError> {
        let mut data = self.store.data.lock().expect("Error while locking mutex.");
        if let Some(e) = data.next_error.take() {
            return Err(e);
        }
        Ok(data)
    }
}

impl CallboardStoreFacade for StoreMockFacade<'_> {
    fn get_events(&mut self) -> Result<Vec<Event>, StoreError> {
        Ok(self.lock()?.events.clone())
    }

    fn get_event(&mut self, event_id: EventId) -> Result<Event, StoreError> {
        self.lock()?
            .events
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_event_by_slug(&mut self, slug: &str) -> Result<Event, StoreError> {
        self.lock()?
            .events
            .iter()
            .find(|e| e.slug == slug)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn create_event(
        &mut self,
        auth_token: &GlobalAuthToken,
        event: models::NewEvent,
    ) -> Result<EventId, StoreError> {
        auth_token.check_privilege(Privilege::CreateEvents)?;
        event.validate().map_err(StoreError::InvalidInputData)?;
        let mut data = self.lock()?;
        if data.events.iter().any(|e| e.slug == event.slug) {
            return Err(StoreError::ConflictEntityExists);
        }
        let event_id = next_id(&data.events, |e| e.id);
        data.events.push(Event {
            id: event_id,
            slug: event.slug,
            name: event.name,
            is_public: event.is_public,
            date_from: event.date_from,
            date_to: event.date_to,
            timezone: event.timezone,
            email: event.email,
            color: event.color,
            locale_array: event.locale_array,
            locale: event.locale,
            accept_template_id: None,
            ack_template_id: None,
            reject_template_id: None,
        });
        data.build_initial_event_data(event_id);
        Ok(event_id)
    }

    fn initialize_event(
        &mut self,
        auth_token: &GlobalAuthToken,
        event_id: EventId,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::CreateEvents)?;
        let mut data = self.lock()?;
        if !data.events.iter().any(|e| e.id == event_id) {
            return Err(StoreError::NotExisting);
        }
        data.build_initial_event_data(event_id);
        Ok(())
    }

    fn get_cfp(&mut self, event_id: EventId) -> Result<Cfp, StoreError> {
        self.lock()?
            .cfps
            .iter()
            .find(|c| c.event_id == event_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_user(&mut self, user_id: UserId) -> Result<User, StoreError> {
        self.lock()?
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_user_by_email(&mut self, email: &str) -> Result<User, StoreError> {
        let email = email.to_lowercase();
        self.lock()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn create_user(
        &mut self,
        auth_token: &GlobalAuthToken,
        user: models::NewUser,
    ) -> Result<UserId, StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let mut data = self.lock()?;
        let email = user.email.to_lowercase();
        if data.users.iter().any(|u| u.email == email) {
            return Err(StoreError::ConflictEntityExists);
        }
        let id = next_id(&data.users, |u| u.id);
        data.users.push(User {
            id,
            email,
            name: user.name,
            nick: user.nick,
            password_hash: user.password_hash,
            locale: user.locale,
            timezone: user.timezone,
            is_superuser: user.is_superuser,
        });
        Ok(id)
    }

    fn is_organizer(&mut self, user: &User, event_id: EventId) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_organizer(user, event_id))
    }

    fn get_organized_events(&mut self, user: &User) -> Result<Vec<Event>, StoreError> {
        let data = self.lock()?;
        Ok(data
            .events
            .iter()
            .filter(|e| data.is_organizer(user, e.id))
            .cloned()
            .collect())
    }

    fn grant_organizer(
        &mut self,
        auth_token: &GlobalAuthToken,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(Privilege::ManageUsers)?;
        let mut data = self.lock()?;
        let id = next_id(&data.event_permissions, |p| p.id);
        data.event_permissions.push(EventPermission {
            id,
            event_id,
            user_id: Some(user_id),
            is_orga: true,
            invitation_token: None,
            invitation_email: None,
        });
        Ok(())
    }

    fn create_invitation(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        email: &str,
        token: &str,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(event_id, Privilege::InviteOrganizers)?;
        let mut data = self.lock()?;
        let id = next_id(&data.event_permissions, |p| p.id);
        data.event_permissions.push(EventPermission {
            id,
            event_id,
            user_id: None,
            is_orga: true,
            invitation_token: Some(token.to_owned()),
            invitation_email: Some(email.to_lowercase()),
        });
        Ok(())
    }

    fn get_invitation(&mut self, token: &str) -> Result<EventPermission, StoreError> {
        self.lock()?
            .event_permissions
            .iter()
            .find(|p| p.user_id.is_none() && p.invitation_token.as_deref() == Some(token))
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn accept_invitation(&mut self, token: &str, user_id: UserId) -> Result<EventId, StoreError> {
        let mut data = self.lock()?;
        let permission = data
            .event_permissions
            .iter_mut()
            .find(|p| p.user_id.is_none() && p.invitation_token.as_deref() == Some(token))
            .ok_or(StoreError::NotExisting)?;
        permission.user_id = Some(user_id);
        permission.invitation_token = None;
        Ok(permission.event_id)
    }

    fn get_auth_token_for_user(
        &mut self,
        user_id: Option<UserId>,
        event_id: EventId,
    ) -> Result<AuthToken, StoreError> {
        let data = self.lock()?;
        let Some(user_id) = user_id else {
            return Ok(AuthToken::create_for_user(event_id, None, vec![]));
        };
        let user = data
            .users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotExisting)?;
        let mut roles = vec![AccessRole::Speaker];
        if data.is_organizer(user, event_id) {
            roles.push(AccessRole::Organizer);
        }
        if user.is_superuser {
            roles.push(AccessRole::Superuser);
        }
        Ok(AuthToken::create_for_user(event_id, Some(user_id), roles))
    }

    fn get_event_settings(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<EventSettings, StoreError> {
        auth_token.check_privilege(event_id, Privilege::EditSettings)?;
        let data = self.lock()?;
        let event_values: HashMap<String, String> = data
            .event_settings
            .iter()
            .filter(|((e, _), _)| *e == event_id)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect();
        Ok(EventSettings::from_layers(
            &data.global_settings,
            &event_values,
        )?)
    }

    fn update_event_settings(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        settings: &EventSettings,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(event_id, Privilege::EditSettings)?;
        let mut data = self.lock()?;
        for (key, value) in settings.to_values() {
            data.event_settings.insert((event_id, key.to_owned()), value);
        }
        Ok(())
    }

    fn get_rooms(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<Room>, StoreError> {
        auth_token.check_privilege(event_id, Privilege::ShowSchedule)?;
        let mut rooms: Vec<Room> = self
            .lock()?
            .rooms
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.position);
        Ok(rooms)
    }

    fn create_room(&mut self, auth_token: &AuthToken, room: Room) -> Result<(), StoreError> {
        auth_token.check_privilege(room.event_id, Privilege::EditSchedule)?;
        let mut data = self.lock()?;
        if data.rooms.iter().any(|r| r.id == room.id) {
            return Err(StoreError::ConflictEntityExists);
        }
        data.rooms.push(room);
        Ok(())
    }

    fn get_wip_schedule_talks(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<FullTalkSlot>, StoreError> {
        auth_token.check_privilege(event_id, Privilege::ShowSchedule)?;
        let data = self.lock()?;
        let schedule_id = data
            .wip_schedule_id(event_id)
            .ok_or(StoreError::NotExisting)?;
        data.talk_slots
            .iter()
            .filter(|slot| slot.schedule_id == schedule_id)
            .map(|slot| -> Result<FullTalkSlot, StoreError> {
                let submission = data
                    .submissions
                    .iter()
                    .find(|s| s.id == slot.submission_id)
                    .ok_or(StoreError::NotExisting)?;
                Ok(FullTalkSlot {
                    slot: slot.clone(),
                    submission: data.full_submission(submission)?,
                })
            })
            .collect()
    }

    fn update_talk_slot(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        slot_id: TalkSlotId,
        patch: models::TalkSlotPatch,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(event_id, Privilege::EditSchedule)?;
        let mut data = self.lock()?;
        let schedule_id = data
            .wip_schedule_id(event_id)
            .ok_or(StoreError::NotExisting)?;
        if let Some(Some(room_id)) = patch.room_id {
            if !data
                .rooms
                .iter()
                .any(|r| r.id == room_id && r.event_id == event_id)
            {
                return Err(StoreError::InvalidInputData(format!(
                    "Room {} does not belong to the event",
                    room_id
                )));
            }
        }
        let slot = data
            .talk_slots
            .iter_mut()
            .find(|s| s.id == slot_id && s.schedule_id == schedule_id)
            .ok_or(StoreError::NotExisting)?;
        patch.apply_to(slot);
        Ok(())
    }

    fn get_submissions(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<FullSubmission>, StoreError> {
        auth_token.check_privilege(event_id, Privilege::ManageSubmissions)?;
        let data = self.lock()?;
        let mut submissions: Vec<&Submission> = data
            .submissions
            .iter()
            .filter(|s| s.event_id == event_id)
            .collect();
        submissions.sort_by_key(|s| s.created);
        submissions
            .into_iter()
            .map(|s| data.full_submission(s))
            .collect()
    }

    fn get_submission_by_code(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        code: &str,
    ) -> Result<FullSubmission, StoreError> {
        auth_token.check_privilege(event_id, Privilege::ManageSubmissions)?;
        let data = self.lock()?;
        let code = code.to_uppercase();
        let submission = data
            .submissions
            .iter()
            .find(|s| s.event_id == event_id && s.code == code)
            .ok_or(StoreError::NotExisting)?;
        data.full_submission(submission)
    }

    fn create_submission(
        &mut self,
        auth_token: &AuthToken,
        mut proposal: models::SubmissionProposal,
    ) -> Result<String, StoreError> {
        auth_token.check_privilege(proposal.event_id, Privilege::SubmitProposal)?;
        if !auth_token.has_privilege(proposal.event_id, Privilege::ManageSubmissions) {
            proposal.speaker_ids = auth_token.user_id().into_iter().collect();
        }
        if proposal.speaker_ids.is_empty() {
            return Err(StoreError::InvalidInputData(
                "A submission needs at least one speaker".to_owned(),
            ));
        }
        let mut data = self.lock()?;
        let type_id = match proposal.submission_type_id {
            Some(type_id) => {
                if !data
                    .submission_types
                    .iter()
                    .any(|t| t.id == type_id && t.event_id == proposal.event_id)
                {
                    return Err(StoreError::InvalidInputData(format!(
                        "Submission type {} does not belong to the event",
                        type_id
                    )));
                }
                type_id
            }
            None => {
                data.cfps
                    .iter()
                    .find(|c| c.event_id == proposal.event_id)
                    .ok_or(StoreError::NotExisting)?
                    .default_type_id
            }
        };
        let code = generate_unused_code(&mut rand::thread_rng(), |candidate| {
            Ok::<bool, StoreError>(data.submissions.iter().any(|s| s.code == candidate))
        })?;
        let speaker_ids = std::mem::take(&mut proposal.speaker_ids);
        let new_submission = proposal.into_new_submission(code.clone(), type_id);
        for user_id in speaker_ids {
            data.submission_speakers.push(SubmissionSpeaker {
                submission_id: new_submission.id,
                user_id,
            });
        }
        data.submissions.push(Submission {
            id: new_submission.id,
            code: new_submission.code,
            event_id: new_submission.event_id,
            title: new_submission.title,
            submission_type_id: new_submission.submission_type_id,
            state: new_submission.state,
            description: new_submission.description,
            abstract_text: new_submission.abstract_text,
            notes: new_submission.notes,
            duration: new_submission.duration,
            content_locale: new_submission.content_locale,
            do_not_record: new_submission.do_not_record,
            created: Utc::now(),
        });
        Ok(code)
    }

    fn apply_submission_transition(
        &mut self,
        auth_token: &AuthToken,
        transition: models::SubmissionTransition,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(transition.event_id, Privilege::ManageSubmissions)?;
        let mut data = self.lock()?;
        let schedule_id = data
            .wip_schedule_id(transition.event_id)
            .ok_or(StoreError::NotExisting)?;
        let submission = data
            .submissions
            .iter_mut()
            .find(|s| s.id == transition.submission_id && s.event_id == transition.event_id)
            .ok_or(StoreError::NotExisting)?;
        if submission.state != transition.expected_state {
            return Err(StoreError::ConcurrentEditConflict);
        }
        submission.state = transition.new_state;

        let log_id = next_id(&data.activity_log, |l| l.id);
        let entry = transition.log_entry;
        data.activity_log.push(ActivityLogEntry {
            id: log_id,
            event_id: entry.event_id,
            submission_id: entry.submission_id,
            person_id: entry.person_id,
            action_type: entry.action_type,
            is_orga_action: entry.is_orga_action,
            created: Utc::now(),
        });

        let submission_id = transition.submission_id;
        match transition.slot_change {
            models::SlotChange::CreateInWipSchedule => {
                if !data
                    .talk_slots
                    .iter()
                    .any(|s| s.submission_id == submission_id && s.schedule_id == schedule_id)
                {
                    data.talk_slots.push(TalkSlot {
                        id: Uuid::now_v7(),
                        submission_id,
                        schedule_id,
                        room_id: None,
                        start: None,
                        end: None,
                    });
                }
            }
            models::SlotChange::RemoveFromWipSchedule => {
                data.talk_slots.retain(|s| {
                    !(s.submission_id == submission_id && s.schedule_id == schedule_id)
                });
            }
        }

        for mail in transition.mails {
            let id = next_id(&data.queued_mails, |m| m.id);
            data.queued_mails.push(QueuedMail {
                id,
                event_id: mail.event_id,
                to_address: mail.to_address,
                reply_to: mail.reply_to,
                subject: mail.subject,
                text: mail.text,
                created: Utc::now(),
                sent: None,
            });
        }
        Ok(())
    }

    fn get_mail_template(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        template_id: MailTemplateId,
    ) -> Result<MailTemplate, StoreError> {
        auth_token.check_privilege(event_id, Privilege::ManageSubmissions)?;
        self.lock()?
            .mail_templates
            .iter()
            .find(|t| t.id == template_id && t.event_id == event_id)
            .cloned()
            .ok_or(StoreError::NotExisting)
    }

    fn get_activity_log(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<ActivityLogEntry>, StoreError> {
        auth_token.check_privilege(event_id, Privilege::ManageSubmissions)?;
        Ok(self
            .lock()?
            .activity_log
            .iter()
            .rev()
            .filter(|l| l.event_id == event_id)
            .cloned()
            .collect())
    }

    fn claim_pending_mails(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
    ) -> Result<Vec<QueuedMail>, StoreError> {
        auth_token.check_privilege(event_id, Privilege::ManageSubmissions)?;
        let now = Utc::now();
        let mut data = self.lock()?;
        let mut claimed = Vec::new();
        for mail in data
            .queued_mails
            .iter_mut()
            .filter(|m| m.event_id == event_id && m.sent.is_none())
        {
            mail.sent = Some(now);
            claimed.push(mail.clone());
        }
        Ok(claimed)
    }

    fn release_mail(
        &mut self,
        auth_token: &AuthToken,
        event_id: EventId,
        mail_id: QueuedMailId,
    ) -> Result<(), StoreError> {
        auth_token.check_privilege(event_id, Privilege::ManageSubmissions)?;
        let mut data = self.lock()?;
        let mail = data
            .queued_mails
            .iter_mut()
            .find(|m| m.id == mail_id && m.event_id == event_id && m.sent.is_some())
            .ok_or(StoreError::NotExisting)?;
        mail.sent = None;
        Ok(())
    }
}
