use crate::cli::util::{query_user, query_user_and_check, query_user_bool};
use crate::cli::{CliAuthTokenKey, EventIdOrSlug};
use crate::cli_error::CliError;
use crate::data_store::auth_token::{AuthToken, GlobalAuthToken};
use crate::data_store::models::{NewEvent, Room};
use crate::data_store::{get_store_from_env, CallboardStore, CallboardStoreFacade, EventId};
use crate::i18n::LocalizedString;
use crate::settings::SETTINGS_SCHEMA;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn print_event_list() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let events = data_store.get_events()?;

    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::ASCII_BORDERS_ONLY_CONDENSED)
        .set_header(vec![
            "id", "slug", "name", "from", "to", "timezone", "locales",
        ])
        .add_rows(events.into_iter().map(|event| {
            [
                event.id.to_string(),
                event.slug,
                event.name.to_string(),
                event
                    .date_from
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                event.date_to.map(|d| d.to_string()).unwrap_or_default(),
                event.timezone,
                event.locale_array,
            ]
        }));

    println!("{table}");
    Ok(())
}

/// Interactively create a new event, including its initial data (see [initialize_event]).
pub fn create_event() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let slug: String = query_user("Enter URL slug of the event (e.g. democon2025)");
    let name: String = query_user("Enter name of the event");
    let date_from = query_user::<OptionalDate>("First day (YYYY-MM-DD; empty value if unknown)").0;
    let date_to = query_user_and_check::<OptionalDate, _, _>(
        "Last day (YYYY-MM-DD; empty value if unknown)",
        |date_to| match (date_from, date_to.0) {
            (Some(from), Some(to)) if to < from => Err("The event must not end before it begins."),
            _ => Ok(()),
        },
    )
    .0;
    let timezone = query_user_and_check::<String, _, _>(
        "Timezone of the event (e.g. Europe/Berlin)",
        |tz| {
            tz.parse::<chrono_tz::Tz>()
                .map(|_| ())
                .map_err(|_| "Not a known IANA timezone name")
        },
    );
    let locale_array: String = query_user("Languages of the event (comma-separated, e.g. en,de)");
    let locale = query_user_and_check::<String, _, _>("Default language of the event", |l| {
        if locale_array.split(',').any(|candidate| candidate.trim() == l) {
            Ok(())
        } else {
            Err("Must be one of the event's languages")
        }
    });
    let email: String = query_user("Organizer email address (empty value for none)");
    let is_public = query_user_bool("Make the event public?", Some(false));

    let auth_key = CliAuthTokenKey::new();
    let auth_token = GlobalAuthToken::create_for_cli(&auth_key);
    let event_id = data_store.create_event(
        &auth_token,
        NewEvent {
            slug,
            name: LocalizedString::plain(&name),
            is_public,
            date_from,
            date_to,
            timezone,
            email: if email.is_empty() { None } else { Some(email) },
            color: None,
            locale_array,
            locale,
        },
    )?;
    println!("Success. New event id: {}", event_id);
    Ok(())
}

/// Create the initial data of an existing event (call for papers, submission type, working
/// schedule, mail templates), if missing.
pub fn initialize_event(event_id_or_slug: EventIdOrSlug) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let event = event_id_or_slug.load_event(data_store.as_mut())?;
    let auth_key = CliAuthTokenKey::new();
    let auth_token = GlobalAuthToken::create_for_cli(&auth_key);
    data_store.initialize_event(&auth_token, event.id)?;
    println!("Initialized event {}.", event.slug);
    Ok(())
}

pub fn create_room(
    event_id_or_slug: EventIdOrSlug,
    name: String,
    capacity: Option<i32>,
) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let event = event_id_or_slug.load_event(data_store.as_mut())?;
    let auth_key = CliAuthTokenKey::new();
    let auth_token = AuthToken::create_for_cli(event.id, &auth_key);
    let existing_rooms = data_store.get_rooms(&auth_token, event.id)?;
    let room = Room {
        id: uuid::Uuid::now_v7(),
        event_id: event.id,
        name: LocalizedString::plain(&name),
        description: LocalizedString::default(),
        capacity,
        position: Some(existing_rooms.len() as i32),
    };
    let room_id = room.id;
    data_store.create_room(&auth_token, room)?;
    println!("Success. New room id: {}", room_id);
    Ok(())
}

/// Change a single event setting, given in its stored string representation (e.g. `True` for
/// boolean settings)
pub fn set_setting(
    event_id_or_slug: EventIdOrSlug,
    key: &str,
    value: &str,
) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let event = event_id_or_slug.load_event(data_store.as_mut())?;
    apply_setting(data_store.as_mut(), event.id, key, value)?;
    println!("Changed {} of {}.", key, event.slug);
    Ok(())
}

fn apply_setting(
    store: &mut dyn CallboardStoreFacade,
    event_id: EventId,
    key: &str,
    value: &str,
) -> Result<(), CliError> {
    let definition = SETTINGS_SCHEMA
        .iter()
        .find(|d| d.key == key)
        .ok_or_else(|| {
            let known_keys: Vec<&str> = SETTINGS_SCHEMA.iter().map(|d| d.key).collect();
            CliError::InvalidInput(format!(
                "Unknown setting '{}'. Known settings: {}",
                key,
                known_keys.join(", ")
            ))
        })?;
    let auth_key = CliAuthTokenKey::new();
    let auth_token = AuthToken::create_for_cli(event_id, &auth_key);
    let settings = store
        .get_event_settings(&auth_token, event_id)?
        .with_value(definition.key, value)?;
    store.update_event_settings(&auth_token, event_id, &settings)?;
    Ok(())
}

/// A date, entered on the command line, or nothing (empty input)
struct OptionalDate(Option<NaiveDate>);

impl FromStr for OptionalDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self(None));
        }
        Ok(Self(Some(NaiveDate::from_str(s)?)))
    }
}
