//! Typed key-value configuration of events
//!
//! Settings are stored as string values per key, either for a single event (`event_settings`
//! table) or globally (`global_settings` table). The effective value of a setting for an event is
//! the event's value, falling back to the global value and finally to the default declared in
//! [SETTINGS_SCHEMA].

use crate::i18n::LocalizedString;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    Bool,
    Int,
    Str,
    /// A [LocalizedString], stored as JSON. Values, which are not valid JSON, are taken as plain
    /// string for all languages.
    LocalizedStr,
}

#[derive(Debug)]
pub struct SettingDefinition {
    pub key: &'static str,
    pub setting_type: SettingType,
    pub default: &'static str,
}

const DEFAULT_MAIL_TEXT_RESET: &str = "Hello {name},

you have requested a new password for your submission account at {event}.

To reset your password, click on the following link:

{url}

If this wasn't you, you can just ignore this email.

All the best,
your {event} team.
";

pub const SETTINGS_SCHEMA: &[SettingDefinition] = &[
    SettingDefinition {
        key: "cfp_show_settings",
        setting_type: SettingType::Bool,
        default: "False",
    },
    SettingDefinition {
        key: "mail_from",
        setting_type: SettingType::Str,
        default: "noreply@example.org",
    },
    SettingDefinition {
        key: "smtp_use_custom",
        setting_type: SettingType::Bool,
        default: "False",
    },
    SettingDefinition {
        key: "smtp_host",
        setting_type: SettingType::Str,
        default: "",
    },
    SettingDefinition {
        key: "smtp_port",
        setting_type: SettingType::Int,
        default: "587",
    },
    SettingDefinition {
        key: "smtp_username",
        setting_type: SettingType::Str,
        default: "",
    },
    SettingDefinition {
        key: "smtp_password",
        setting_type: SettingType::Str,
        default: "",
    },
    SettingDefinition {
        key: "smtp_use_tls",
        setting_type: SettingType::Bool,
        default: "True",
    },
    SettingDefinition {
        key: "smtp_use_ssl",
        setting_type: SettingType::Bool,
        default: "False",
    },
    SettingDefinition {
        key: "mail_text_reset",
        setting_type: SettingType::LocalizedStr,
        default: DEFAULT_MAIL_TEXT_RESET,
    },
];

/// The effective settings of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSettings {
    pub cfp_show_settings: bool,
    pub mail_from: String,
    pub smtp_use_custom: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_use_tls: bool,
    pub smtp_use_ssl: bool,
    pub mail_text_reset: LocalizedString,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self::from_layers(&HashMap::new(), &HashMap::new())
            .expect("Declared setting defaults should be valid")
    }
}

impl EventSettings {
    /// Build the effective settings from the stored global values and the stored event values.
    pub fn from_layers(
        global_values: &HashMap<String, String>,
        event_values: &HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let lookup = SettingsLookup {
            global_values,
            event_values,
        };
        Ok(Self {
            cfp_show_settings: lookup.get_bool("cfp_show_settings")?,
            mail_from: lookup.get_str("mail_from")?,
            smtp_use_custom: lookup.get_bool("smtp_use_custom")?,
            smtp_host: lookup.get_str("smtp_host")?,
            smtp_port: lookup.get_int("smtp_port")?,
            smtp_username: lookup.get_str("smtp_username")?,
            smtp_password: lookup.get_str("smtp_password")?,
            smtp_use_tls: lookup.get_bool("smtp_use_tls")?,
            smtp_use_ssl: lookup.get_bool("smtp_use_ssl")?,
            mail_text_reset: lookup.get_localized_str("mail_text_reset")?,
        })
    }

    /// Serialize the settings to the stored string representation, for each key of the
    /// [SETTINGS_SCHEMA].
    pub fn to_values(&self) -> Vec<(&'static str, String)> {
        vec![
            ("cfp_show_settings", format_bool(self.cfp_show_settings)),
            ("mail_from", self.mail_from.clone()),
            ("smtp_use_custom", format_bool(self.smtp_use_custom)),
            ("smtp_host", self.smtp_host.clone()),
            ("smtp_port", self.smtp_port.to_string()),
            ("smtp_username", self.smtp_username.clone()),
            ("smtp_password", self.smtp_password.clone()),
            ("smtp_use_tls", format_bool(self.smtp_use_tls)),
            ("smtp_use_ssl", format_bool(self.smtp_use_ssl)),
            (
                "mail_text_reset",
                serde_json::to_string(&self.mail_text_reset)
                    .expect("LocalizedString should be serializable as JSON"),
            ),
        ]
    }

    /// Get a copy of the settings with the stored string representation of a single setting
    /// replaced. The new value is validated like a stored value.
    pub fn with_value(&self, key: &'static str, value: &str) -> Result<Self, SettingsError> {
        let mut values: HashMap<String, String> = self
            .to_values()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        values.insert(key.to_owned(), value.to_owned());
        Self::from_layers(&HashMap::new(), &values)
    }

    /// Apply changed settings from the API. The SMTP password is only changed if it is given.
    pub fn apply_update(&mut self, update: callboard_api_types::EventSettings) {
        self.cfp_show_settings = update.cfp_show_settings;
        self.mail_from = update.mail_from;
        self.smtp_use_custom = update.smtp_use_custom;
        self.smtp_host = update.smtp_host;
        self.smtp_port = update.smtp_port;
        self.smtp_username = update.smtp_username;
        if let Some(password) = update.smtp_password {
            self.smtp_password = password;
        }
        self.smtp_use_tls = update.smtp_use_tls;
        self.smtp_use_ssl = update.smtp_use_ssl;
        self.mail_text_reset = update.mail_text_reset.into();
    }
}

impl From<EventSettings> for callboard_api_types::EventSettings {
    fn from(value: EventSettings) -> Self {
        Self {
            cfp_show_settings: value.cfp_show_settings,
            mail_from: value.mail_from,
            smtp_use_custom: value.smtp_use_custom,
            smtp_host: value.smtp_host,
            smtp_port: value.smtp_port,
            smtp_username: value.smtp_username,
            smtp_password: None,
            smtp_use_tls: value.smtp_use_tls,
            smtp_use_ssl: value.smtp_use_ssl,
            mail_text_reset: value.mail_text_reset.into(),
        }
    }
}

struct SettingsLookup<'a> {
    global_values: &'a HashMap<String, String>,
    event_values: &'a HashMap<String, String>,
}

impl<'a> SettingsLookup<'a> {
    fn raw_value(&self, key: &'static str, setting_type: SettingType) -> &'a str {
        let definition = SETTINGS_SCHEMA
            .iter()
            .find(|d| d.key == key)
            .expect("Setting key should be declared in SETTINGS_SCHEMA");
        debug_assert_eq!(definition.setting_type, setting_type);
        self.event_values
            .get(key)
            .or_else(|| self.global_values.get(key))
            .map(|v| v.as_str())
            .unwrap_or(definition.default)
    }

    fn get_bool(&self, key: &'static str) -> Result<bool, SettingsError> {
        let value = self.raw_value(key, SettingType::Bool);
        match value {
            "True" | "true" | "1" => Ok(true),
            "False" | "false" | "0" | "" => Ok(false),
            _ => Err(SettingsError::new(key, value, "not a boolean")),
        }
    }

    fn get_int<T: std::str::FromStr>(&self, key: &'static str) -> Result<T, SettingsError> {
        let value = self.raw_value(key, SettingType::Int);
        value
            .trim()
            .parse()
            .map_err(|_| SettingsError::new(key, value, "not a valid integer"))
    }

    fn get_str(&self, key: &'static str) -> Result<String, SettingsError> {
        Ok(self.raw_value(key, SettingType::Str).to_owned())
    }

    fn get_localized_str(&self, key: &'static str) -> Result<LocalizedString, SettingsError> {
        let value = self.raw_value(key, SettingType::LocalizedStr);
        Ok(serde_json::from_str(value).unwrap_or_else(|_| LocalizedString::plain(value)))
    }
}

fn format_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_owned()
}

#[derive(Debug)]
pub struct SettingsError {
    pub key: &'static str,
    pub value: String,
    pub problem: &'static str,
}

impl SettingsError {
    fn new(key: &'static str, value: &str, problem: &'static str) -> Self {
        Self {
            key,
            value: value.to_owned(),
            problem,
        }
    }
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Invalid value '{}' for setting {}: {}",
            self.value, self.key, self.problem
        )
    }
}

impl From<SettingsError> for crate::data_store::StoreError {
    fn from(value: SettingsError) -> Self {
        Self::InvalidDataInDatabase(value.to_string())
    }
}
