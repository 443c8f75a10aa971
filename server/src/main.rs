use callboard_server::cli::EventIdOrSlug;
use callboard_server::cli_error::CliError;
use clap::ArgAction;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use log::warn;

fn main() {
    let args = CliArgs::parse();
    let dotenv_result = dotenv();

    let env = env_logger::Env::new().filter_or(
        "RUST_LOG",
        match args.global_opts.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        },
    );
    env_logger::Builder::from_env(env).init();
    if let Err(e) = dotenv_result {
        warn!("Could not read .env file: {}", e);
    }

    if let Err(e) = run_command(args.command) {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_command(command: Command) -> Result<(), CliError> {
    use callboard_server::cli::{
        database_migration, manage_events, manage_submissions, manage_users,
    };
    match command {
        Command::Serve => callboard_server::web::serve(),
        Command::MigrateDatabase => database_migration::run_migrations(),
        Command::ListEvents => manage_events::print_event_list(),
        Command::CreateEvent => manage_events::create_event(),
        Command::InitializeEvent { event } => manage_events::initialize_event(event),
        Command::CreateRoom {
            event,
            name,
            capacity,
        } => manage_events::create_room(event, name, capacity),
        Command::SetSetting { event, key, value } => {
            manage_events::set_setting(event, &key, &value)
        }
        Command::AcceptSubmission { event, code, force } => {
            manage_submissions::accept_submission(event, &code, force)
        }
        Command::RejectSubmission { event, code } => {
            manage_submissions::reject_submission(event, &code)
        }
        Command::DeliverMails { event } => manage_submissions::deliver_mails(event),
        Command::CreateUser => manage_users::create_user(),
        Command::GrantOrganizer { event, email } => manage_users::grant_organizer(event, &email),
    }
}

/// Conference management server for calls for papers, submission review and schedule editing
#[derive(Debug, Parser)]
#[clap(name = "callboard", version)]
pub struct CliArgs {
    #[clap(flatten)]
    global_opts: GlobalOpts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the organizer web application
    Serve,
    /// Migrate the database schema to the current version
    MigrateDatabase,
    /// List all events
    ListEvents,
    /// Create a new event interactively, including its initial data
    CreateEvent,
    /// Create missing initial data (call for papers, schedule, mail templates) of an event
    InitializeEvent {
        /// Id or slug of the event
        event: EventIdOrSlug,
    },
    /// Add a room to an event
    CreateRoom {
        /// Id or slug of the event
        event: EventIdOrSlug,
        /// Name of the room
        name: String,
        /// Number of seats
        #[clap(long)]
        capacity: Option<i32>,
    },
    /// Change a setting of an event
    SetSetting {
        /// Id or slug of the event
        event: EventIdOrSlug,
        /// Name of the setting, e.g. smtp_host
        key: String,
        /// New value; boolean settings take True or False
        value: String,
    },
    /// Accept a submission and notify its speakers
    AcceptSubmission {
        /// Id or slug of the event
        event: EventIdOrSlug,
        /// Code of the submission
        code: String,
        /// Accept the submission regardless of its current state
        #[clap(long)]
        force: bool,
    },
    /// Reject a submission and notify its speakers
    RejectSubmission {
        /// Id or slug of the event
        event: EventIdOrSlug,
        /// Code of the submission
        code: String,
    },
    /// Send the queued mails of an event
    DeliverMails {
        /// Id or slug of the event
        event: EventIdOrSlug,
    },
    /// Create a new user account interactively
    CreateUser,
    /// Make an existing user organizer of an event
    GrantOrganizer {
        /// Id or slug of the event
        event: EventIdOrSlug,
        /// Email address of the user
        email: String,
    },
}

#[derive(Debug, Args)]
struct GlobalOpts {
    /// Verbosity level (can be specified multiple times)
    #[clap(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,
}
