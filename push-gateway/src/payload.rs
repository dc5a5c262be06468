//! Validation of untrusted notification requests.
//!
//! [`validate`] runs an ordered chain of checks over the decoded request body.
//! The first failing check determines the reported [`ValidationError`]; later
//! checks never run. On success the body is returned as a [`NormalizedPayload`]
//! whose fields carry the type guarantees the assembler relies on. Values are
//! not transformed here: the target string keeps its surrounding whitespace
//! until assembly.

use crate::errors::ValidationError;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::borrow::Cow;

type JsonObject = Map<String, Value>;

/// The three mutually exclusive ways of addressing a push message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Token,
    Topic,
    Condition,
}

impl TargetKind {
    /// Check order for target fields.
    pub const ALL: [TargetKind; 3] = [TargetKind::Token, TargetKind::Topic, TargetKind::Condition];

    pub const fn field(&self) -> &'static str {
        match self {
            TargetKind::Token => "token",
            TargetKind::Topic => "topic",
            TargetKind::Condition => "condition",
        }
    }
}

/// Notification fields as received. Each is `Some` only when the key was
/// present, in which case it is guaranteed to be a string (possibly empty).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationInput {
    pub title: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
}

/// A request body that passed every validation check.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    /// Which target field was provided.
    pub target_kind: TargetKind,
    /// The raw target value; non-empty after trimming, not yet trimmed.
    pub target: String,
    pub notification: Option<NotificationInput>,
    /// String-only data entries in the order they appeared in the request.
    pub data: Option<IndexMap<String, String>>,
    /// Platform overrides, passed through without inspection.
    pub extra_options: Option<JsonObject>,
}

/// Validates a decoded request body.
pub fn validate(raw: &Value) -> Result<NormalizedPayload, ValidationError> {
    let body = check_shape(raw)?;
    let (target_kind, target) = check_target(&body)?;
    let notification = check_notification(&body)?;
    let data = check_data(&body)?;
    let extra_options = check_extra_options(&body)?;

    Ok(NormalizedPayload {
        target_kind,
        target,
        notification,
        data,
        extra_options,
    })
}

/// Trims the characters JavaScript's `String.prototype.trim` removes.
///
/// Differs from [`str::trim`] in two places: U+FEFF is whitespace here and
/// U+0085 is not.
pub fn trim_whitespace(s: &str) -> &str {
    s.trim_matches(|c: char| c == '\u{FEFF}' || (c.is_whitespace() && c != '\u{0085}'))
}

/// Arrays pass as objects without own fields, so `[]` fails target selection.
fn check_shape(raw: &Value) -> Result<Cow<'_, JsonObject>, ValidationError> {
    match raw {
        Value::Object(body) => Ok(Cow::Borrowed(body)),
        Value::Array(_) => Ok(Cow::Owned(JsonObject::new())),
        _ => Err(ValidationError::Shape),
    }
}

/// A target value only counts when it is a string with non-whitespace content.
fn provided_target(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !trim_whitespace(s).is_empty() => Some(s.as_str()),
        _ => None,
    }
}

fn check_target(body: &JsonObject) -> Result<(TargetKind, String), ValidationError> {
    let provided: Vec<(TargetKind, &str)> = TargetKind::ALL
        .iter()
        .filter_map(|kind| provided_target(body.get(kind.field())).map(|value| (*kind, value)))
        .collect();

    let [(kind, value)] = provided.as_slice() else {
        return Err(ValidationError::TargetSelection);
    };

    // Exactly one target was usable, but the others may still be present
    // with a wrong type or blank content.
    for other in TargetKind::ALL {
        let field = other.field();
        if body.contains_key(field) && provided_target(body.get(field)).is_none() {
            return Err(ValidationError::TargetType { field });
        }
    }

    Ok((*kind, (*value).to_string()))
}

fn optional_string(
    notification: &JsonObject,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match notification.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::NotificationField { field }),
    }
}

fn check_notification(body: &JsonObject) -> Result<Option<NotificationInput>, ValidationError> {
    let notification = match body.get("notification") {
        None => return Ok(None),
        Some(Value::Object(notification)) => notification,
        // An array has none of the fields, leaving an empty section.
        Some(Value::Array(_)) => return Ok(Some(NotificationInput::default())),
        Some(_) => return Err(ValidationError::NotificationShape),
    };

    Ok(Some(NotificationInput {
        title: optional_string(notification, "title")?,
        body: optional_string(notification, "body")?,
        image_url: optional_string(notification, "imageUrl")?,
    }))
}

fn check_data(body: &JsonObject) -> Result<Option<IndexMap<String, String>>, ValidationError> {
    let Some(value) = body.get("data") else {
        return Ok(None);
    };
    let data = value.as_object().ok_or(ValidationError::DataShape)?;

    let mut entries = IndexMap::with_capacity(data.len());
    for (key, value) in data {
        match value {
            Value::String(s) => {
                entries.insert(key.clone(), s.clone());
            }
            _ => return Err(ValidationError::DataValueType { key: key.clone() }),
        }
    }
    Ok(Some(entries))
}

fn check_extra_options(body: &JsonObject) -> Result<Option<JsonObject>, ValidationError> {
    match body.get("extraOptions") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(options)) => Ok(Some(options.clone())),
        Some(Value::Array(_)) => Ok(Some(JsonObject::new())),
        Some(_) => Err(ValidationError::ExtraOptionsShape),
    }
}
