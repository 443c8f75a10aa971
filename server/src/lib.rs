mod auth_session;
pub mod cli;
pub mod cli_error;
mod data_store;
mod i18n;
mod locale;
mod mail;
mod settings;
mod setup;
mod submission_code;
mod submission_workflow;
pub mod web;

fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
