use chrono::{naive::NaiveDate, DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A string which may be given in multiple languages.
///
/// Serialized either as a plain JSON string (same text for all languages) or as an object, mapping
/// language codes to the respective text.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum LocalizedString {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl Default for LocalizedString {
    fn default() -> Self {
        LocalizedString::Plain(String::new())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    Submitted,
    Rejected,
    Accepted,
    Confirmed,
    Canceled,
    Withdrawn,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Event {
    pub slug: String,
    pub name: LocalizedString,
    #[serde(rename = "dateFrom")]
    pub date_from: Option<NaiveDate>,
    #[serde(rename = "dateTo")]
    pub date_to: Option<NaiveDate>,
    pub timezone: String,
    pub locale: String,
    pub locales: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct OrganizedEvents {
    pub events: Vec<Event>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Room {
    pub id: Uuid,
    pub name: LocalizedString,
    pub description: LocalizedString,
    pub capacity: Option<i32>,
}

/// Response of the schedule editor's room list endpoint
#[derive(Serialize, Deserialize, Debug)]
pub struct RoomList {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub rooms: Vec<Room>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Speaker {
    pub name: String,
    pub nick: Option<String>,
}

/// A talk slot of the working schedule, together with the data of its submission
#[derive(Serialize, Deserialize, Debug)]
pub struct Talk {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub speakers: Vec<Speaker>,
    pub submission_type: LocalizedString,
    pub state: SubmissionState,
    pub description: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_: Option<String>,
    pub notes: Option<String>,
    /// Duration in minutes
    pub duration: i32,
    pub content_locale: String,
    pub do_not_record: bool,
    pub room: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TalkList {
    pub results: Vec<Talk>,
}

/// Partial update of a talk slot. Fields which are not present are not changed; an explicit `null`
/// removes the room or time of the slot.
#[derive(Deserialize, Default, Debug)]
pub struct TalkUpdate {
    #[serde(default, deserialize_with = "deserialize_present")]
    pub room: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub start: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub end: Option<Option<DateTime<Utc>>>,
}

/// Deserialize a field that is present in the input (possibly as `null`) into `Some(_)`, so that
/// absent fields (`#[serde(default)]` → `None`) can be told apart from `null` values.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Submission {
    pub code: String,
    pub title: String,
    pub state: SubmissionState,
    pub editable: bool,
    #[serde(rename = "nextStates")]
    pub next_states: Vec<SubmissionState>,
    pub speakers: Vec<Speaker>,
    pub duration: Option<i32>,
    pub content_locale: String,
    pub do_not_record: bool,
}

/// A new submission, handed in by an organizer on behalf of the speakers
#[derive(Serialize, Deserialize, Debug)]
pub struct NewSubmission {
    pub title: String,
    /// Id of the submission type. The call for paper's default type is used if not given.
    #[serde(default, rename = "submissionType")]
    pub submission_type: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    pub content_locale: String,
    #[serde(default)]
    pub do_not_record: bool,
    /// Email addresses of the speakers
    pub speakers: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedSubmission {
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ActivityLogEntry {
    pub submission: Option<Uuid>,
    pub person: Option<i32>,
    #[serde(rename = "actionType")]
    pub action_type: String,
    #[serde(rename = "isOrgaAction")]
    pub is_orga_action: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct User {
    pub email: String,
    pub name: String,
    pub nick: Option<String>,
    pub locale: Option<String>,
    pub timezone: Option<String>,
    #[serde(rename = "isSuperuser")]
    pub is_superuser: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginInfo {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Language selected for the request
    pub locale: String,
    /// Timezone selected for the request (IANA name)
    pub timezone: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Invitation {
    pub event: String,
    #[serde(rename = "eventName")]
    pub event_name: LocalizedString,
    pub email: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedInvitation {
    pub email: String,
    pub token: String,
}

/// The per-event settings, as shown to and edited by organizers.
#[derive(Serialize, Deserialize, Debug)]
pub struct EventSettings {
    pub cfp_show_settings: bool,
    pub mail_from: String,
    pub smtp_use_custom: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    /// Never sent to the client. When updating, `None` keeps the stored password.
    #[serde(default, skip_serializing)]
    pub smtp_password: Option<String>,
    pub smtp_use_tls: bool,
    pub smtp_use_ssl: bool,
    pub mail_text_reset: LocalizedString,
}
