use serde_json::{Map, Value};

use super::{SecurityLog, SecurityViolation};

/// Keys that are never copied from a payload onto a live object.
pub const FORBIDDEN_KEYS: [&str; 2] = ["__proto__", "constructor"];

/// Quoted forms searched for in the raw text before it is parsed.
const FORBIDDEN_LITERALS: [(&str, &str); 2] = [
    ("\"__proto__\"", "__proto__"),
    ("\"constructor\"", "constructor"),
];

/// Parse a JSON payload after bounding its size and screening for prototype keys.
///
/// The raw text is screened for the quoted keys first; the parsed value is then walked
/// so that keys spelled with `\u` escapes are caught as well.
pub fn validate_json(text: &str, max_size: usize) -> Result<Value, SecurityViolation> {
    if text.len() > max_size {
        return Err(SecurityViolation::JsonTooLarge {
            size: text.len(),
            max: max_size,
        });
    }

    for (literal, key) in FORBIDDEN_LITERALS {
        if text.contains(literal) {
            return Err(SecurityViolation::ForbiddenJsonKey(key));
        }
    }

    let value: Value = serde_json::from_str(text).map_err(SecurityViolation::MalformedJson)?;

    if let Some(key) = find_forbidden_key(&value) {
        return Err(SecurityViolation::ForbiddenJsonKey(key));
    }

    Ok(value)
}

fn find_forbidden_key(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, nested)| {
            FORBIDDEN_KEYS
                .iter()
                .copied()
                .find(|forbidden| key == forbidden)
                .or_else(|| find_forbidden_key(nested))
        }),
        Value::Array(items) => items.iter().find_map(find_forbidden_key),
        _ => None,
    }
}

/// Copy the top-level keys of `source` onto `target`, skipping [`FORBIDDEN_KEYS`].
///
/// Non-object sources are ignored. Nested values are copied as they are; only the keys
/// that land on `target` itself are screened.
pub fn safe_merge(target: &mut Map<String, Value>, source: &Value) {
    let Value::Object(fields) = source else {
        return;
    };

    for (key, value) in fields {
        if FORBIDDEN_KEYS.contains(&key.as_str()) {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// How JSON option payloads (`trigger` event data, `keyframe` definitions) are read.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct JsonPolicy {
    /// Run [`validate_json`] before use
    pub validate: bool,
    /// Size limit applied when `validate` is set
    pub max_size: usize,
    /// Where rejections are reported
    pub log: SecurityLog,
}

impl JsonPolicy {
    #[must_use]
    pub const fn new(validate: bool, max_size: usize, log: SecurityLog) -> Self {
        Self {
            validate,
            max_size,
            log,
        }
    }

    /// Parse `text`; with validation off the payload must still be well formed.
    pub fn parse(&self, text: &str) -> Result<Value, SecurityViolation> {
        let parsed = if self.validate {
            validate_json(text, self.max_size)
        } else {
            serde_json::from_str(text).map_err(SecurityViolation::MalformedJson)
        };

        parsed.inspect_err(|violation| self.log.rejected(violation))
    }
}
