use diesel::deserialize::FromSql;
use diesel::query_builder::bind_collector::RawBytesBindCollector;
use diesel::serialize::ToSql;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A text, which may be given in multiple languages.
///
/// Stored in the database as JSONB value: Either a plain string (same text for all languages) or
/// an object mapping language codes to the text in the respective language.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, AsExpression, FromSqlRow)]
#[diesel(sql_type = diesel::sql_types::Jsonb)]
#[serde(untagged)]
pub enum LocalizedString {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl LocalizedString {
    pub fn plain(text: &str) -> Self {
        Self::Plain(text.to_owned())
    }

    pub fn from_translations<'a>(
        translations: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self::Localized(
            translations
                .into_iter()
                .map(|(l, t)| (l.to_owned(), t.to_owned()))
                .collect(),
        )
    }

    /// Get the text in the given language.
    ///
    /// If no translation for the exact language code exists, the translation for the generic
    /// language (e.g. "de" for "de-at"), then the English translation and finally any available
    /// translation is used.
    pub fn localize(&self, locale: &str) -> &str {
        match self {
            LocalizedString::Plain(s) => s,
            LocalizedString::Localized(translations) => {
                let locale = locale.to_lowercase();
                let generic = locale.split('-').next().unwrap_or("");
                translations
                    .get(&locale)
                    .or_else(|| translations.get(generic))
                    .or_else(|| translations.get("en"))
                    .or_else(|| translations.values().next())
                    .map(|s| s.as_str())
                    .unwrap_or("")
            }
        }
    }

    /// Apply a function to each translation of the text
    pub fn map<F: Fn(&str) -> String>(&self, f: F) -> Self {
        match self {
            LocalizedString::Plain(s) => LocalizedString::Plain(f(s)),
            LocalizedString::Localized(translations) => LocalizedString::Localized(
                translations
                    .iter()
                    .map(|(l, t)| (l.clone(), f(t)))
                    .collect(),
            ),
        }
    }
}

impl Default for LocalizedString {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl std::fmt::Display for LocalizedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.localize("en"))
    }
}

impl<DB> FromSql<diesel::sql_types::Jsonb, DB> for LocalizedString
where
    DB: diesel::backend::Backend,
    serde_json::Value: FromSql<diesel::sql_types::Jsonb, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let value = serde_json::Value::from_sql(bytes)?;
        Ok(serde_json::from_value(value)?)
    }
}

impl<DB> ToSql<diesel::sql_types::Jsonb, DB> for LocalizedString
where
    DB: diesel::backend::Backend,
    for<'c> DB: diesel::backend::Backend<BindCollector<'c> = RawBytesBindCollector<DB>>,
    serde_json::Value: ToSql<diesel::sql_types::Jsonb, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        let value = serde_json::to_value(self)?;
        value.to_sql(&mut out.reborrow())
    }
}

impl From<callboard_api_types::LocalizedString> for LocalizedString {
    fn from(value: callboard_api_types::LocalizedString) -> Self {
        match value {
            callboard_api_types::LocalizedString::Plain(s) => Self::Plain(s),
            callboard_api_types::LocalizedString::Localized(t) => Self::Localized(t),
        }
    }
}

impl From<LocalizedString> for callboard_api_types::LocalizedString {
    fn from(value: LocalizedString) -> Self {
        match value {
            LocalizedString::Plain(s) => Self::Plain(s),
            LocalizedString::Localized(t) => Self::Localized(t),
        }
    }
}
