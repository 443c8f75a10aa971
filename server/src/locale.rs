//! Selection of the display language and timezone for a request

use crate::setup::SiteConfig;
use actix_web::http::header::{LanguageTag, Preference};
use log::debug;

/// The language and timezone to be used for rendering the response of a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestLocale {
    pub language: String,
    pub timezone: chrono_tz::Tz,
}

/// The locale-relevant data of the event a request belongs to
#[derive(Clone, Copy, Debug)]
pub struct EventLocales<'a> {
    pub locales: &'a [String],
    pub default_locale: &'a str,
    pub timezone: &'a str,
}

/// The locale-relevant data of the authenticated user of a request
#[derive(Clone, Copy, Debug, Default)]
pub struct UserLocales<'a> {
    pub locale: Option<&'a str>,
    pub timezone: Option<&'a str>,
}

/// Select language and timezone for a request.
///
/// The language is taken from the first of these sources providing a supported language: the
/// user's stored preference, the browser's languages (ranked by quality, as given by
/// `AcceptLanguage::ranked()`), the event's default language, the site's default language.
/// Supported languages are the event's languages or, without event, the site's languages.
///
/// The timezone is the user's stored timezone, else the event's timezone, else the site's default
/// timezone. An invalid timezone name is ignored, keeping the site's default timezone.
pub fn select_request_locale(
    site: &SiteConfig,
    user: Option<UserLocales>,
    browser_languages: &[Preference<LanguageTag>],
    event: Option<EventLocales>,
) -> RequestLocale {
    RequestLocale {
        language: select_language(site, user, browser_languages, event),
        timezone: select_timezone(site, user, event),
    }
}

fn select_language(
    site: &SiteConfig,
    user: Option<UserLocales>,
    browser_languages: &[Preference<LanguageTag>],
    event: Option<EventLocales>,
) -> String {
    let supported: &[String] = match event {
        Some(event) => event.locales,
        None => &site.supported_locales,
    };
    user.and_then(|u| u.locale)
        .and_then(|locale| supported_language_variant(locale, site, supported))
        .or_else(|| language_from_browser(browser_languages, site, supported))
        .or_else(|| event.map(|e| e.default_locale.to_owned()))
        .unwrap_or_else(|| site.default_locale.clone())
}

fn select_timezone(
    site: &SiteConfig,
    user: Option<UserLocales>,
    event: Option<EventLocales>,
) -> chrono_tz::Tz {
    let timezone_name = user
        .and_then(|u| u.timezone)
        .or_else(|| event.map(|e| e.timezone));
    match timezone_name {
        Some(name) => name.parse().unwrap_or_else(|_| {
            debug!("Ignoring unknown timezone '{}'", name);
            site.default_timezone
        }),
        None => site.default_timezone,
    }
}

fn language_from_browser(
    browser_languages: &[Preference<LanguageTag>],
    site: &SiteConfig,
    supported: &[String],
) -> Option<String> {
    for preference in browser_languages {
        match preference {
            Preference::Any => break,
            Preference::Specific(tag) => {
                if let Some(variant) = supported_language_variant(tag.as_str(), site, supported) {
                    return Some(variant);
                }
            }
        }
    }
    None
}

/// Find the site language matching the language code (exactly, by its generic language or as a
/// regional variant of the generic language) and check that it is in the `supported` list.
fn supported_language_variant(
    code: &str,
    site: &SiteConfig,
    supported: &[String],
) -> Option<String> {
    let code = code.to_lowercase();
    let generic = code.split('-').next().unwrap_or("");
    let site_language = [code.as_str(), generic]
        .into_iter()
        .find_map(|candidate| {
            site.supported_locales
                .iter()
                .find(|l| l.as_str() == candidate)
        })
        .or_else(|| {
            site.supported_locales
                .iter()
                .find(|l| l.starts_with(&format!("{}-", generic)))
        })?;
    if supported.contains(site_language) {
        Some(site_language.clone())
    } else {
        None
    }
}
