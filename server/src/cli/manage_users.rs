use crate::auth_session::hash_password;
use crate::cli::util::{query_user, query_user_and_check, query_user_bool};
use crate::cli::{CliAuthTokenKey, EventIdOrSlug};
use crate::cli_error::CliError;
use crate::data_store::auth_token::GlobalAuthToken;
use crate::data_store::models::NewUser;
use crate::data_store::{get_store_from_env, CallboardStore, StoreError};

/// Interactively create a new user account
pub fn create_user() -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let email = query_user_and_check::<String, _, _>("Email address", |email| {
        if email.contains('@') {
            Ok(())
        } else {
            Err("Not a valid email address")
        }
    });
    let name: String = query_user("Full name");
    let nick: String = query_user("Nickname (empty value for none)");
    let password = query_user_and_check::<String, _, _>("Password", |password| {
        if password.len() >= 8 {
            Ok(())
        } else {
            Err("The password must have at least 8 characters")
        }
    });
    let locale: String = query_user("Preferred language (e.g. en; empty value for none)");
    let is_superuser = query_user_bool("Grant superuser permissions?", Some(false));

    let auth_key = CliAuthTokenKey::new();
    let auth_token = GlobalAuthToken::create_for_cli(&auth_key);
    let user_id = data_store.create_user(
        &auth_token,
        NewUser {
            email,
            name,
            nick: if nick.is_empty() { None } else { Some(nick) },
            password_hash: hash_password(&password)?,
            locale: if locale.is_empty() {
                None
            } else {
                Some(locale)
            },
            timezone: None,
            is_superuser,
        },
    )?;
    println!("Success. New user id: {}", user_id);
    Ok(())
}

/// Make the user with the given email address an organizer of the event
pub fn grant_organizer(event_id_or_slug: EventIdOrSlug, email: &str) -> Result<(), CliError> {
    let data_store_pool = get_store_from_env()?;
    let mut data_store = data_store_pool.get_facade()?;

    let event = event_id_or_slug.load_event(data_store.as_mut())?;
    let user = data_store.get_user_by_email(email).map_err(|e| match e {
        StoreError::NotExisting => {
            CliError::NotFound(format!("No user with email address {}", email))
        }
        e => e.into(),
    })?;
    let auth_key = CliAuthTokenKey::new();
    let auth_token = GlobalAuthToken::create_for_cli(&auth_key);
    data_store.grant_organizer(&auth_token, event.id, user.id)?;
    println!("{} is now organizer of {}.", user.name, event.slug);
    Ok(())
}
