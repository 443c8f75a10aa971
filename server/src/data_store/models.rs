use super::{
    EnumMemberNotExistingError, EventId, MailTemplateId, QueuedMailId, RoomId, ScheduleId,
    SubmissionId, SubmissionTypeId, TalkSlotId, UserId,
};
use crate::i18n::LocalizedString;
use chrono::{naive::NaiveDate, DateTime, Utc};
use diesel::backend::Backend;
use diesel::deserialize::FromSql;
use diesel::prelude::*;
use diesel::query_builder::bind_collector::RawBytesBindCollector;
use diesel::serialize::ToSql;
use diesel::{AsExpression, FromSqlRow};
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::events)]
pub struct Event {
    pub id: EventId,
    pub slug: String,
    pub name: LocalizedString,
    pub is_public: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    /// IANA timezone name. Not validated when reading from the database, since an invalid value
    /// is ignored by the request timezone selection.
    pub timezone: String,
    pub email: Option<String>,
    pub color: Option<String>,
    /// Comma-separated list of the language codes the event is available in
    pub locale_array: String,
    /// The event's default language
    pub locale: String,
    pub accept_template_id: Option<MailTemplateId>,
    pub ack_template_id: Option<MailTemplateId>,
    pub reject_template_id: Option<MailTemplateId>,
}

impl Event {
    pub fn locales(&self) -> Vec<String> {
        split_locale_array(&self.locale_array)
    }
}

fn split_locale_array(locale_array: &str) -> Vec<String> {
    locale_array
        .split(',')
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty())
        .collect()
}

impl From<Event> for callboard_api_types::Event {
    fn from(value: Event) -> Self {
        Self {
            locales: value.locales(),
            slug: value.slug,
            name: value.name.into(),
            date_from: value.date_from,
            date_to: value.date_to,
            timezone: value.timezone,
            locale: value.locale,
            color: value.color,
            is_public: value.is_public,
        }
    }
}

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-zA-Z0-9.-]+$").unwrap();
    static ref COLOR_REGEX: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::events)]
pub struct NewEvent {
    pub slug: String,
    pub name: LocalizedString,
    pub is_public: bool,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub timezone: String,
    pub email: Option<String>,
    pub color: Option<String>,
    pub locale_array: String,
    pub locale: String,
}

impl NewEvent {
    /// Check the event data for consistency before it is stored.
    pub fn validate(&self) -> Result<(), String> {
        if !SLUG_REGEX.is_match(&self.slug) {
            return Err("The slug may only contain letters, numbers, dots and dashes.".to_owned());
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(format!("Unknown timezone '{}'", self.timezone));
        }
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if to < from {
                return Err("The event must not end before it begins.".to_owned());
            }
        }
        if let Some(color) = &self.color {
            if !COLOR_REGEX.is_match(color) {
                return Err("The color must be given as hex value like #00ff00.".to_owned());
            }
        }
        if !split_locale_array(&self.locale_array).contains(&self.locale) {
            return Err("The default language must be one of the event's languages.".to_owned());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::users)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub nick: Option<String>,
    pub password_hash: String,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub is_superuser: bool,
}

impl From<User> for callboard_api_types::User {
    fn from(value: User) -> Self {
        Self {
            email: value.email,
            name: value.name,
            nick: value.nick,
            locale: value.locale,
            timezone: value.timezone,
            is_superuser: value.is_superuser,
        }
    }
}

impl From<&User> for callboard_api_types::Speaker {
    fn from(value: &User) -> Self {
        Self {
            name: value.name.clone(),
            nick: value.nick.clone(),
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::users)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub nick: Option<String>,
    pub password_hash: String,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub is_superuser: bool,
}

/// Organizer permission of a user for an event. If `user_id` is None, this is a pending
/// invitation, identified by the `invitation_token`.
#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::event_permissions)]
pub struct EventPermission {
    pub id: i32,
    pub event_id: EventId,
    pub user_id: Option<UserId>,
    pub is_orga: bool,
    pub invitation_token: Option<String>,
    pub invitation_email: Option<String>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::event_permissions)]
pub struct NewEventPermission {
    pub event_id: EventId,
    pub user_id: Option<UserId>,
    pub is_orga: bool,
    pub invitation_token: Option<String>,
    pub invitation_email: Option<String>,
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::submission_types)]
pub struct SubmissionType {
    pub id: SubmissionTypeId,
    pub event_id: EventId,
    pub name: LocalizedString,
    /// Duration in minutes
    pub default_duration: i32,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::submission_types)]
pub struct NewSubmissionType {
    pub event_id: EventId,
    pub name: LocalizedString,
    pub default_duration: i32,
}

/// The call for papers of an event
#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name=super::schema::cfps)]
pub struct Cfp {
    pub event_id: EventId,
    pub deadline: Option<DateTime<Utc>>,
    pub default_type_id: SubmissionTypeId,
}

impl Cfp {
    /// The CFP is open until its deadline. Without deadline, it is open indefinitely.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|deadline| now < deadline).unwrap_or(true)
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::mail_templates)]
pub struct MailTemplate {
    pub id: MailTemplateId,
    pub event_id: EventId,
    pub subject: LocalizedString,
    pub text: LocalizedString,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::mail_templates)]
pub struct NewMailTemplate {
    pub event_id: EventId,
    pub subject: LocalizedString,
    pub text: LocalizedString,
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name=super::schema::rooms)]
pub struct Room {
    pub id: RoomId,
    pub event_id: EventId,
    pub name: LocalizedString,
    pub description: LocalizedString,
    pub capacity: Option<i32>,
    pub position: Option<i32>,
}

impl From<Room> for callboard_api_types::Room {
    fn from(value: Room) -> Self {
        Self {
            id: value.id,
            name: value.name.into(),
            description: value.description.into(),
            capacity: value.capacity,
        }
    }
}

/// A schedule of an event. The schedule without version is the working schedule, which is
/// currently being edited. Each event has exactly one working schedule.
#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::schedules)]
pub struct Schedule {
    pub id: ScheduleId,
    pub event_id: EventId,
    pub version: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::schedules)]
pub struct NewSchedule {
    pub event_id: EventId,
    pub version: Option<String>,
}

/// Review state of a submission
///
/// Stored in the database by its lowercase name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, AsExpression, FromSqlRow)]
#[diesel(sql_type=diesel::sql_types::Text)]
pub enum SubmissionState {
    Submitted,
    Rejected,
    Accepted,
    Confirmed,
    Canceled,
    Withdrawn,
}

impl SubmissionState {
    pub const ALL: [SubmissionState; 6] = [
        SubmissionState::Submitted,
        SubmissionState::Rejected,
        SubmissionState::Accepted,
        SubmissionState::Confirmed,
        SubmissionState::Canceled,
        SubmissionState::Withdrawn,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SubmissionState::Submitted => "submitted",
            SubmissionState::Rejected => "rejected",
            SubmissionState::Accepted => "accepted",
            SubmissionState::Confirmed => "confirmed",
            SubmissionState::Canceled => "canceled",
            SubmissionState::Withdrawn => "withdrawn",
        }
    }

    /// The states, a submission in this state may be moved to.
    pub fn valid_next_states(&self) -> &'static [SubmissionState] {
        use SubmissionState::*;
        match self {
            Submitted => &[Rejected, Withdrawn, Accepted],
            Rejected => &[Accepted, Submitted],
            Accepted => &[Confirmed, Canceled, Rejected, Submitted],
            Confirmed => &[Accepted, Canceled],
            Withdrawn => &[Submitted],
            Canceled => &[],
        }
    }

    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        self.valid_next_states().contains(&next)
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SubmissionState {
    type Err = EnumMemberNotExistingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionState::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| EnumMemberNotExistingError {
                member_value: s.to_owned(),
                enum_name: "SubmissionState",
            })
    }
}

impl<DB> ToSql<diesel::sql_types::Text, DB> for SubmissionState
where
    DB: Backend,
    str: ToSql<diesel::sql_types::Text, DB>,
    for<'c> DB: Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        <str as ToSql<diesel::sql_types::Text, DB>>::to_sql(self.name(), &mut out.reborrow())
    }
}

impl<DB> FromSql<diesel::sql_types::Text, DB> for SubmissionState
where
    DB: Backend,
    String: FromSql<diesel::sql_types::Text, DB>,
{
    fn from_sql(bytes: <DB as Backend>::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let value = String::from_sql(bytes)?;
        Ok(value.parse().map_err(|e: EnumMemberNotExistingError| e.to_string())?)
    }
}

impl From<SubmissionState> for callboard_api_types::SubmissionState {
    fn from(value: SubmissionState) -> Self {
        match value {
            SubmissionState::Submitted => Self::Submitted,
            SubmissionState::Rejected => Self::Rejected,
            SubmissionState::Accepted => Self::Accepted,
            SubmissionState::Confirmed => Self::Confirmed,
            SubmissionState::Canceled => Self::Canceled,
            SubmissionState::Withdrawn => Self::Withdrawn,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::submissions)]
pub struct Submission {
    pub id: SubmissionId,
    pub code: String,
    pub event_id: EventId,
    pub title: String,
    pub submission_type_id: SubmissionTypeId,
    pub state: SubmissionState,
    pub description: Option<String>,
    pub abstract_text: Option<String>,
    pub notes: Option<String>,
    /// Duration in minutes. If not given, the submission type's default duration applies.
    pub duration: Option<i32>,
    pub content_locale: String,
    pub do_not_record: bool,
    pub created: DateTime<Utc>,
}

impl Submission {
    /// Speakers may only edit a submission while it is still in the running and the call for
    /// papers is open.
    pub fn is_editable(&self, cfp: &Cfp, now: DateTime<Utc>) -> bool {
        matches!(
            self.state,
            SubmissionState::Accepted | SubmissionState::Confirmed | SubmissionState::Submitted
        ) && cfp.is_open(now)
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::submissions)]
pub struct NewSubmission {
    pub id: SubmissionId,
    pub code: String,
    pub event_id: EventId,
    pub title: String,
    pub submission_type_id: SubmissionTypeId,
    pub state: SubmissionState,
    pub description: Option<String>,
    pub abstract_text: Option<String>,
    pub notes: Option<String>,
    pub duration: Option<i32>,
    pub content_locale: String,
    pub do_not_record: bool,
}

/// Data for creating a new submission via
/// [crate::data_store::CallboardStoreFacade::create_submission]
#[derive(Clone, Debug)]
pub struct SubmissionProposal {
    pub event_id: EventId,
    pub title: String,
    /// If None, the default submission type of the event's CFP is used
    pub submission_type_id: Option<SubmissionTypeId>,
    pub description: Option<String>,
    pub abstract_text: Option<String>,
    pub notes: Option<String>,
    pub duration: Option<i32>,
    pub content_locale: String,
    pub do_not_record: bool,
    pub speaker_ids: Vec<UserId>,
}

impl SubmissionProposal {
    pub fn into_new_submission(
        self,
        code: String,
        submission_type_id: SubmissionTypeId,
    ) -> NewSubmission {
        NewSubmission {
            id: Uuid::now_v7(),
            code,
            event_id: self.event_id,
            title: self.title,
            submission_type_id,
            state: SubmissionState::Submitted,
            description: self.description,
            abstract_text: self.abstract_text,
            notes: self.notes,
            duration: self.duration,
            content_locale: self.content_locale,
            do_not_record: self.do_not_record,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name=super::schema::submission_speakers)]
pub struct SubmissionSpeaker {
    pub submission_id: SubmissionId,
    pub user_id: UserId,
}

/// A submission together with its type and speakers
#[derive(Clone, Debug)]
pub struct FullSubmission {
    pub submission: Submission,
    pub submission_type: SubmissionType,
    pub speakers: Vec<User>,
}

impl FullSubmission {
    pub fn duration(&self) -> i32 {
        self.submission
            .duration
            .unwrap_or(self.submission_type.default_duration)
    }

    pub fn into_api(self, cfp: &Cfp, now: DateTime<Utc>) -> callboard_api_types::Submission {
        callboard_api_types::Submission {
            editable: self.submission.is_editable(cfp, now),
            next_states: self
                .submission
                .state
                .valid_next_states()
                .iter()
                .map(|s| (*s).into())
                .collect(),
            speakers: self.speakers.iter().map(|s| s.into()).collect(),
            code: self.submission.code,
            title: self.submission.title,
            state: self.submission.state.into(),
            duration: self.submission.duration,
            content_locale: self.submission.content_locale,
            do_not_record: self.submission.do_not_record,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::talk_slots)]
pub struct TalkSlot {
    pub id: TalkSlotId,
    pub submission_id: SubmissionId,
    pub schedule_id: ScheduleId,
    pub room_id: Option<RoomId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::talk_slots)]
pub struct NewTalkSlot {
    pub id: TalkSlotId,
    pub submission_id: SubmissionId,
    pub schedule_id: ScheduleId,
}

/// Partial update of a talk slot. `None` fields are not changed, `Some(None)` clears the field.
#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name=super::schema::talk_slots)]
pub struct TalkSlotPatch {
    pub room_id: Option<Option<RoomId>>,
    pub start: Option<Option<DateTime<Utc>>>,
    pub end: Option<Option<DateTime<Utc>>>,
}

impl TalkSlotPatch {
    pub fn is_empty(&self) -> bool {
        self.room_id.is_none() && self.start.is_none() && self.end.is_none()
    }

    pub fn apply_to(&self, slot: &mut TalkSlot) {
        if let Some(room_id) = self.room_id {
            slot.room_id = room_id;
        }
        if let Some(start) = self.start {
            slot.start = start;
        }
        if let Some(end) = self.end {
            slot.end = end;
        }
    }
}

impl From<callboard_api_types::TalkUpdate> for TalkSlotPatch {
    fn from(value: callboard_api_types::TalkUpdate) -> Self {
        Self {
            room_id: value.room,
            start: value.start,
            end: value.end,
        }
    }
}

/// A talk slot together with its full submission data
#[derive(Clone, Debug)]
pub struct FullTalkSlot {
    pub slot: TalkSlot,
    pub submission: FullSubmission,
}

impl From<FullTalkSlot> for callboard_api_types::Talk {
    fn from(value: FullTalkSlot) -> Self {
        let duration = value.submission.duration();
        let submission = value.submission.submission;
        Self {
            id: value.slot.id,
            code: submission.code,
            title: submission.title,
            speakers: value.submission.speakers.iter().map(|s| s.into()).collect(),
            submission_type: value.submission.submission_type.name.into(),
            state: submission.state.into(),
            description: submission.description,
            abstract_: submission.abstract_text,
            notes: submission.notes,
            duration,
            content_locale: submission.content_locale,
            do_not_record: submission.do_not_record,
            room: value.slot.room_id,
            start: value.slot.start,
            end: value.slot.end,
        }
    }
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::activity_log)]
pub struct ActivityLogEntry {
    pub id: i32,
    pub event_id: EventId,
    pub submission_id: Option<SubmissionId>,
    pub person_id: Option<UserId>,
    pub action_type: String,
    pub is_orga_action: bool,
    pub created: DateTime<Utc>,
}

impl From<ActivityLogEntry> for callboard_api_types::ActivityLogEntry {
    fn from(value: ActivityLogEntry) -> Self {
        Self {
            submission: value.submission_id,
            person: value.person_id,
            action_type: value.action_type,
            is_orga_action: value.is_orga_action,
            timestamp: value.created,
        }
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name=super::schema::activity_log)]
pub struct NewActivityLogEntry {
    pub event_id: EventId,
    pub submission_id: Option<SubmissionId>,
    pub person_id: Option<UserId>,
    pub action_type: String,
    pub is_orga_action: bool,
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name=super::schema::queued_mails)]
pub struct QueuedMail {
    pub id: QueuedMailId,
    pub event_id: EventId,
    pub to_address: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub created: DateTime<Utc>,
    pub sent: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Insertable)]
#[diesel(table_name=super::schema::queued_mails)]
pub struct NewQueuedMail {
    pub event_id: EventId,
    pub to_address: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
}

/// What to do with the submission's talk slot in the working schedule when changing its state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotChange {
    /// Create a slot, unless the submission already has one in the working schedule
    CreateInWipSchedule,
    /// Delete all slots of the submission in the working schedule
    RemoveFromWipSchedule,
}

/// All changes of a submission state transition, to be applied atomically by
/// [crate::data_store::CallboardStoreFacade::apply_submission_transition].
#[derive(Clone, Debug)]
pub struct SubmissionTransition {
    pub event_id: EventId,
    pub submission_id: SubmissionId,
    /// The state the transition has been checked against
    pub expected_state: SubmissionState,
    pub new_state: SubmissionState,
    pub log_entry: NewActivityLogEntry,
    pub slot_change: SlotChange,
    pub mails: Vec<NewQueuedMail>,
}
