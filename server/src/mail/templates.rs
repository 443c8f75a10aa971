//! Mail templates: default texts and placeholder substitution

use crate::data_store::models::{Event, MailTemplate, NewMailTemplate, Submission, User};
use crate::data_store::EventId;
use crate::i18n::LocalizedString;
use std::collections::BTreeMap;

pub const GENERIC_SUBJECT: &str = "Your submission: {title}";

pub const ACK_TEXT: &str = "Hi {speaker}!

We have received your submission \"{title}\" to {event}. We will notify
you once we have had time to consider all submissions, but until then
you can see its current state with the code {code}.

Thank you for your proposal!

The {event} orga
";

pub const ACCEPT_TEXT: &str = "Hi {speaker}!

We are happy to tell you that we accept your submission \"{title}\" to
{event}. Please confirm your attendance and we will publish it in our
schedule once it is ready.

See you there!

The {event} orga
";

pub const REJECT_TEXT: &str = "Hi {speaker}!

We are sorry to tell you that we cannot accept your submission \"{title}\"
to {event}. There were just too many great submissions, and we hope to see
you at our event anyway.

The {event} orga
";

/// The default mail templates of an event, created on event initialization
pub enum DefaultTemplate {
    Accept,
    Ack,
    Reject,
}

impl DefaultTemplate {
    pub fn build(&self, event_id: EventId) -> NewMailTemplate {
        let text = match self {
            DefaultTemplate::Accept => ACCEPT_TEXT,
            DefaultTemplate::Ack => ACK_TEXT,
            DefaultTemplate::Reject => REJECT_TEXT,
        };
        NewMailTemplate {
            event_id,
            subject: LocalizedString::plain(GENERIC_SUBJECT),
            text: LocalizedString::plain(text),
        }
    }
}

/// Values for the `{placeholder}`s of a mail template
#[derive(Debug, Default, Clone)]
pub struct MailContext {
    values: BTreeMap<&'static str, String>,
}

impl MailContext {
    /// Build the context for a mail to the speaker about the submission
    pub fn for_submission(event: &Event, submission: &Submission, speaker: &User) -> Self {
        let locale = speaker.locale.as_deref().unwrap_or(&event.locale);
        let mut values = BTreeMap::new();
        values.insert("event", event.name.localize(locale).to_owned());
        values.insert("title", submission.title.clone());
        values.insert("code", submission.code.clone());
        values.insert("speaker", speaker.name.clone());
        values.insert(
            "abstract",
            submission.abstract_text.clone().unwrap_or_default(),
        );
        Self { values }
    }

    pub fn insert(&mut self, key: &'static str, value: String) {
        self.values.insert(key, value);
    }

    /// Substitute all known `{placeholder}`s in the text. Unknown placeholders and unmatched
    /// braces are kept as they are.
    pub fn render(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('{') {
            result.push_str(&rest[..start]);
            let after_brace = &rest[start + 1..];
            let replacement = after_brace
                .find('}')
                .and_then(|end| self.values.get(&after_brace[..end]).map(|v| (end, v)));
            match replacement {
                Some((end, value)) => {
                    result.push_str(value);
                    rest = &after_brace[end + 1..];
                }
                None => {
                    result.push('{');
                    rest = after_brace;
                }
            }
        }
        result.push_str(rest);
        result
    }
}

/// A mail template rendered for a specific recipient and language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub text: String,
}

pub fn render_template(
    template: &MailTemplate,
    context: &MailContext,
    locale: &str,
) -> RenderedMail {
    RenderedMail {
        subject: context.render(template.subject.localize(locale)),
        text: context.render(template.text.localize(locale)),
    }
}
