use std::borrow::Cow;
use std::mem;

use crate::Result;
use crate::config::{DEFAULT_ESCAPE_CHAR, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_PARTS};
use crate::error::Error;
use crate::security::{SecurityViolation, validate_message_size, validate_part_count};

/// Field separator of the wire format.
pub const SEPARATOR: char = '|';

/// Index of the first field that honours the escape character.
const SUBJECT_INDEX: usize = 2;

/// Tokenizer settings, taken from [`Config::frame_limits`](crate::config::Config::frame_limits).
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub escape_char: char,
    pub max_size: usize,
    pub max_parts: usize,
}

impl FrameLimits {
    #[must_use]
    pub const fn new(escape_char: char, max_size: usize, max_parts: usize) -> Self {
        Self {
            escape_char,
            max_size,
            max_parts,
        }
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_CHAR, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_PARTS)
    }
}

/// One tokenized frame.
///
/// Missing fields are empty strings: `remove|old` has an empty subject, and a bare `ping`
/// has an empty noun and subject.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Selects the action
    pub verb: String,
    /// Identifier of the target element
    pub noun: String,
    /// Primary argument
    pub subject: String,
    /// Verb-specific extra arguments, in order
    pub options: Vec<String>,
}

impl ParsedMessage {
    #[must_use]
    pub fn new<S: Into<String>>(verb: S, noun: S, subject: S, options: Vec<String>) -> Self {
        Self {
            verb: verb.into(),
            noun: noun.into(),
            subject: subject.into(),
            options,
        }
    }

    fn from_fields(fields: Vec<String>) -> Self {
        let mut fields = fields.into_iter();
        Self {
            verb: fields.next().unwrap_or_default(),
            noun: fields.next().unwrap_or_default(),
            subject: fields.next().unwrap_or_default(),
            options: fields.collect(),
        }
    }

    /// Option at `index`, if the frame carried that many fields.
    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    /// Option at `index`, treating an empty field as absent.
    #[must_use]
    pub fn non_empty_option(&self, index: usize) -> Option<&str> {
        self.option(index).filter(|value| !value.is_empty())
    }
}

/// Split `frame` into verb, noun, subject and options.
///
/// Size is checked before any work is done; the part count is checked while scanning so
/// a frame made of separators cannot allocate more than `max_parts` fields. An escape
/// left open at the end of the frame is not an error: the partial field is kept.
pub fn parse(
    frame: &str,
    limits: &FrameLimits,
) -> std::result::Result<ParsedMessage, SecurityViolation> {
    validate_message_size(frame, limits.max_size)?;

    let mut fields: Vec<String> = Vec::with_capacity(4);
    let mut current = String::new();
    let mut escaped = false;

    for ch in frame.chars() {
        if ch == limits.escape_char && fields.len() >= SUBJECT_INDEX {
            escaped = !escaped;
            continue;
        }

        if ch == SEPARATOR && !escaped {
            fields.push(mem::take(&mut current));
            validate_part_count(fields.len() + 1, limits.max_parts)?;
            continue;
        }

        current.push(ch);
    }
    fields.push(current);

    Ok(ParsedMessage::from_fields(fields))
}

/// Join fields with `|` as they are. Fields that need escaping must already be bracketed.
#[must_use]
pub fn create_message<S: AsRef<str>>(
    verb: &str,
    noun: &str,
    subject: &str,
    options: &[S],
) -> String {
    let mut frame = String::with_capacity(
        verb.len()
            + noun.len()
            + subject.len()
            + options.iter().map(|o| o.as_ref().len() + 1).sum::<usize>()
            + 2,
    );

    frame.push_str(verb);
    frame.push(SEPARATOR);
    frame.push_str(noun);
    frame.push(SEPARATOR);
    frame.push_str(subject);
    for option in options {
        frame.push(SEPARATOR);
        frame.push_str(option.as_ref());
    }

    frame
}

/// Bracket `field` with `escape_char` when it contains a separator.
///
/// A field containing the escape character itself cannot be represented on the wire.
pub fn escape_field(field: &str, escape_char: char) -> Result<Cow<'_, str>> {
    if field.contains(escape_char) {
        return Err(Error::validation(format!(
            "field contains the escape character {escape_char:?}"
        )));
    }

    if field.contains(SEPARATOR) {
        Ok(Cow::Owned(format!("{escape_char}{field}{escape_char}")))
    } else {
        Ok(Cow::Borrowed(field))
    }
}

/// Like [`create_message`], escaping subject and options as needed.
///
/// Verb and noun are never escape-processed by the receiver, so a separator in either is
/// rejected.
pub fn create_escaped_message<S: AsRef<str>>(
    verb: &str,
    noun: &str,
    subject: &str,
    options: &[S],
    escape_char: char,
) -> Result<String> {
    if verb.contains(SEPARATOR) || noun.contains(SEPARATOR) {
        return Err(Error::validation(
            "verb and noun cannot contain the field separator",
        ));
    }

    let subject = escape_field(subject, escape_char)?;
    let options = options
        .iter()
        .map(|option| escape_field(option.as_ref(), escape_char))
        .collect::<Result<Vec<_>>>()?;

    Ok(create_message(verb, noun, &subject, &options))
}
