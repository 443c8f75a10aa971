use std::env;
use std::env::VarError;
use std::fmt::{Display, Formatter};

/// Get the database URL from the environment variable.
pub fn get_database_url_from_env() -> Result<String, SetupError> {
    env::var("DATABASE_URL").map_err(|e| SetupError::from_env_error(e, "DATABASE_URL"))
}

/// Get the cryptographic application secret for signing session cookies from the environment
/// variable.
pub fn get_secret_from_env() -> Result<String, SetupError> {
    env::var("SECRET").map_err(|e| SetupError::from_env_error(e, "SECRET"))
}

/// Get the web server TCP listening port from the environment variable
pub fn get_listen_port_from_env() -> Result<u16, SetupError> {
    env::var("LISTEN_PORT")
        .map_err(|e| SetupError::from_env_error(e, "LISTEN_PORT"))
        .and_then(|v| {
            v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                variable_name: "LISTEN_PORT",
                problem: "Not a valid uint16",
            })
        })
}

/// Get the web server TCP listening interface address from the environment variable
pub fn get_listen_address_from_env() -> Result<String, SetupError> {
    env::var("LISTEN_ADDRESS").map_err(|e| SetupError::from_env_error(e, "LISTEN_ADDRESS"))
}

/// Site-wide defaults for the request locale and timezone selection, used when neither the user
/// nor the event provide a value.
#[derive(Clone, Debug)]
pub struct SiteConfig {
    pub default_locale: String,
    pub supported_locales: Vec<String>,
    pub default_timezone: chrono_tz::Tz,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_owned(),
            supported_locales: vec!["en".to_owned(), "de".to_owned()],
            default_timezone: chrono_tz::Tz::UTC,
        }
    }
}

/// Read the [SiteConfig] from the environment variables "DEFAULT_LOCALE", "SUPPORTED_LOCALES"
/// (comma-separated) and "DEFAULT_TIMEZONE". Missing variables fall back to the defaults.
pub fn get_site_config_from_env() -> Result<SiteConfig, SetupError> {
    let defaults = SiteConfig::default();
    let default_locale = optional_env_var("DEFAULT_LOCALE")?.unwrap_or(defaults.default_locale);
    let supported_locales = optional_env_var("SUPPORTED_LOCALES")?
        .map(|v| {
            v.split(',')
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or(defaults.supported_locales);
    if !supported_locales.contains(&default_locale) {
        return Err(SetupError::EnvVariableInvalid {
            variable_name: "DEFAULT_LOCALE",
            problem: "Not contained in SUPPORTED_LOCALES",
        });
    }
    let default_timezone = match optional_env_var("DEFAULT_TIMEZONE")? {
        Some(v) => v.parse().map_err(|_| SetupError::EnvVariableInvalid {
            variable_name: "DEFAULT_TIMEZONE",
            problem: "Not a known IANA timezone name",
        })?,
        None => defaults.default_timezone,
    };
    Ok(SiteConfig {
        default_locale,
        supported_locales,
        default_timezone,
    })
}

/// Which transport to use for outbound mail of events without custom SMTP settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DefaultMailTransport {
    Smtp { host: String, port: u16 },
    /// Only write the mails to the log (for development setups)
    Log,
}

/// Read the default mail transport from "MAIL_BACKEND" ("smtp" or "log"), "SMTP_HOST" and
/// "SMTP_PORT".
pub fn get_default_mail_transport_from_env() -> Result<DefaultMailTransport, SetupError> {
    match optional_env_var("MAIL_BACKEND")?.as_deref() {
        None | Some("smtp") => Ok(DefaultMailTransport::Smtp {
            host: optional_env_var("SMTP_HOST")?.unwrap_or("localhost".to_owned()),
            port: optional_env_var("SMTP_PORT")?
                .map(|v| {
                    v.parse().map_err(|_| SetupError::EnvVariableInvalid {
                        variable_name: "SMTP_PORT",
                        problem: "Not a valid uint16",
                    })
                })
                .transpose()?
                .unwrap_or(25),
        }),
        Some("log") => Ok(DefaultMailTransport::Log),
        Some(_) => Err(SetupError::EnvVariableInvalid {
            variable_name: "MAIL_BACKEND",
            problem: "Must be 'smtp' or 'log'",
        }),
    }
}

fn optional_env_var(variable_name: &'static str) -> Result<Option<String>, SetupError> {
    match env::var(variable_name) {
        Ok(v) => Ok(Some(v)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(SetupError::from_env_error(e, variable_name)),
    }
}

#[derive(Debug)]
pub enum SetupError {
    EnvVariableMissing {
        variable_name: &'static str,
    },
    EnvVariableInvalid {
        variable_name: &'static str,
        problem: &'static str,
    },
}

impl SetupError {
    fn from_env_error(error: VarError, variable_name: &'static str) -> Self {
        match error {
            VarError::NotPresent => Self::EnvVariableMissing { variable_name },
            VarError::NotUnicode(_) => Self::EnvVariableInvalid {
                variable_name,
                problem: "no valid unicode",
            },
        }
    }
}

impl Display for SetupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::EnvVariableMissing { variable_name } => {
                write!(f, "Environment variable {} must be defined", variable_name)
            }
            SetupError::EnvVariableInvalid {
                variable_name,
                problem,
            } => write!(
                f,
                "Value of environment variable {} is invalid: {}",
                variable_name, problem
            ),
        }
    }
}
