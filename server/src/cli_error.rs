use crate::data_store::models::SubmissionState;
use crate::data_store::StoreError;
use crate::mail::MailError;
use crate::settings::SettingsError;
use crate::setup::SetupError;
use crate::submission_workflow::WorkflowError;
use diesel::ConnectionError;

/// Error of a `callboard` command. Each kind of error has its own process exit code.
#[derive(Debug)]
pub enum CliError {
    /// An environment variable is missing or invalid
    SetupError(String),
    CouldNotConnectToDatabase(String),
    /// The database or the data store failed in a way the user cannot fix by changing the command
    UnexpectedStoreError(String),
    BindError(std::io::Error),
    ServerError(std::io::Error),
    DatabaseMigrationError(String),
    /// `serve` refuses to start while database schema migrations are pending
    DatabaseMigrationRequired { missing_migrations: Vec<String> },
    PasswordHashError(String),
    /// No event matches the id or slug given on the command line
    UnknownEvent(String),
    /// The user, submission, … addressed by the command does not exist
    NotFound(String),
    /// A value given on the command line or entered interactively is not acceptable
    InvalidInput(String),
    /// The submission workflow does not allow the requested decision
    DecisionRefused(String),
    /// Mails of an event cannot be sent, because the mail server connection could not be set up
    MailSetupError(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::SetupError(_) => 1,
            CliError::UnknownEvent(_) | CliError::NotFound(_) | CliError::InvalidInput(_) => 1,
            CliError::DecisionRefused(_) => 1,
            CliError::UnexpectedStoreError(_) | CliError::PasswordHashError(_) => 2,
            CliError::BindError(_) | CliError::ServerError(_) => 3,
            CliError::CouldNotConnectToDatabase(_) | CliError::DatabaseMigrationError(_) => 4,
            CliError::DatabaseMigrationRequired { .. } => 5,
            CliError::MailSetupError(_) => 6,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::SetupError(e) => write!(f, "Invalid environment configuration: {}", e),
            CliError::CouldNotConnectToDatabase(e) => {
                write!(f, "Could not connect to database: {}", e)
            }
            CliError::UnexpectedStoreError(e) => write!(f, "Database operation failed: {}", e),
            CliError::BindError(e) => write!(f, "Could not listen on the configured port: {}", e),
            CliError::ServerError(e) => write!(f, "Web server failed: {}", e),
            CliError::DatabaseMigrationError(e) => {
                write!(f, "Could not migrate the database schema: {}", e)
            }
            CliError::DatabaseMigrationRequired { missing_migrations } => write!(
                f,
                "The database schema is outdated. Run `callboard migrate-database` to apply: {}",
                missing_migrations.join(", ")
            ),
            CliError::PasswordHashError(e) => write!(f, "Could not hash password: {}", e),
            CliError::UnknownEvent(event) => write!(f, "No event with id or slug '{}'", event),
            CliError::NotFound(e) | CliError::InvalidInput(e) | CliError::DecisionRefused(e) => {
                f.write_str(e)
            }
            CliError::MailSetupError(e) => write!(f, "Could not set up mail delivery: {}", e),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConnectionError(e) => Self::CouldNotConnectToDatabase(e),
            StoreError::NotExisting => {
                Self::NotFound("The requested entry does not exist".to_owned())
            }
            StoreError::ConflictEntityExists => {
                Self::InvalidInput("An entry with the same email address or slug exists".to_owned())
            }
            StoreError::InvalidInputData(e) => Self::InvalidInput(e),
            StoreError::TransactionConflict | StoreError::ConcurrentEditConflict => {
                Self::UnexpectedStoreError(
                    "The data has been changed concurrently, please retry".to_owned(),
                )
            }
            // The command line always acts as superuser
            e @ StoreError::PermissionDenied { .. } => Self::UnexpectedStoreError(e.to_string()),
            StoreError::QueryError(e) => Self::UnexpectedStoreError(e.to_string()),
            StoreError::InvalidDataInDatabase(e) => Self::UnexpectedStoreError(e),
        }
    }
}

impl From<WorkflowError> for CliError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::IllegalTransition {
                to: SubmissionState::Accepted,
                ..
            } => Self::DecisionRefused(format!("{} Use --force to accept anyway.", e)),
            WorkflowError::IllegalTransition { .. } => Self::DecisionRefused(e.to_string()),
            WorkflowError::MissingMailTemplate => Self::DecisionRefused(format!(
                "{} Run `callboard initialize-event` to create the default templates.",
                e
            )),
            WorkflowError::StoreError(e) => e.into(),
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(e: SettingsError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

impl From<MailError> for CliError {
    fn from(e: MailError) -> Self {
        Self::MailSetupError(e.to_string())
    }
}

impl From<argon2::password_hash::Error> for CliError {
    fn from(value: argon2::password_hash::Error) -> Self {
        Self::PasswordHashError(value.to_string())
    }
}

impl From<SetupError> for CliError {
    fn from(value: SetupError) -> Self {
        Self::SetupError(value.to_string())
    }
}

impl From<ConnectionError> for CliError {
    fn from(value: ConnectionError) -> Self {
        Self::CouldNotConnectToDatabase(value.to_string())
    }
}
