use crate::cli_error::CliError;
use crate::data_store::{models, CallboardStoreFacade, EventId, StoreError};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod database_migration;
pub mod manage_events;
pub mod manage_submissions;
pub mod manage_users;
mod util;

pub struct CliAuthTokenKey {
    _private: (),
}

impl CliAuthTokenKey {
    #[allow(clippy::new_without_default)] // We always want to explicitly create these objects
    pub fn new() -> Self {
        Self { _private: () }
    }
}

/// Reference to an event on the command line: Either its numeric id or its slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventIdOrSlug {
    Id(EventId),
    Slug(String),
}

impl FromStr for EventIdOrSlug {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<EventId>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Slug(s.to_owned()),
        })
    }
}

impl Display for EventIdOrSlug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EventIdOrSlug::Id(id) => write!(f, "{}", id),
            EventIdOrSlug::Slug(slug) => f.write_str(slug),
        }
    }
}

impl EventIdOrSlug {
    fn load_event(&self, store: &mut dyn CallboardStoreFacade) -> Result<models::Event, CliError> {
        let result = match self {
            EventIdOrSlug::Id(id) => store.get_event(*id),
            EventIdOrSlug::Slug(slug) => store.get_event_by_slug(slug),
        };
        result.map_err(|e| match e {
            StoreError::NotExisting => CliError::UnknownEvent(self.to_string()),
            e => e.into(),
        })
    }
}
