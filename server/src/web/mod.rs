use crate::cli::database_migration::check_migration_state;
use crate::cli_error::CliError;
use crate::data_store::get_store_from_env;
use crate::mail::MailBackendProvider;
use crate::setup::{
    get_default_mail_transport_from_env, get_listen_address_from_env, get_listen_port_from_env,
    get_secret_from_env, get_site_config_from_env, SiteConfig,
};
use actix_web::middleware::from_fn;
use actix_web::{middleware, web, App, HttpServer};
use http_error_logging::error_logging_middleware;
use log::info;
use std::sync::Arc;

mod http_error_logging;
mod orga;

pub fn serve() -> Result<(), CliError> {
    check_migration_state()?;
    let state = AppState::new()?;
    let listen_address = get_listen_address_from_env()?;
    let listen_port = get_listen_port_from_env()?;
    info!(
        "Starting callboard {} on {}:{}",
        crate::get_version(),
        listen_address,
        listen_port
    );
    actix_web::rt::System::new()
        .block_on(
            HttpServer::new(move || {
                App::new()
                    .configure(orga::configure_app)
                    .app_data(web::Data::new(state.clone()))
                    .wrap(from_fn(error_logging_middleware))
                    .wrap(middleware::Compress::default())
            })
            .bind((listen_address, listen_port))
            .map_err(CliError::BindError)?
            .run(),
        )
        .map_err(CliError::ServerError)
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn crate::data_store::CallboardStore>,
    secret: String,
    site_config: SiteConfig,
    mail: Arc<dyn MailBackendProvider>,
}

impl AppState {
    pub fn new() -> Result<Self, CliError> {
        Ok(Self {
            store: Arc::new(get_store_from_env()?),
            secret: get_secret_from_env()?,
            site_config: get_site_config_from_env()?,
            mail: Arc::new(get_default_mail_transport_from_env()?),
        })
    }
}
