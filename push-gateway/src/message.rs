//! Assembly of the outbound push message from a validated payload.

use crate::payload::{NormalizedPayload, NotificationInput, TargetKind, trim_whitespace};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Platform sections copied from `extraOptions` to the top level of the message.
pub const PLATFORM_SECTIONS: [&str; 3] = ["android", "webpush", "apns"];

/// Recipient selector of a message. Serializes as a single `token`, `topic`
/// or `condition` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Token(String),
    Topic(String),
    Condition(String),
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Token(_) => TargetKind::Token,
            Target::Topic(_) => TargetKind::Topic,
            Target::Condition(_) => TargetKind::Condition,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Target::Token(v) | Target::Topic(v) | Target::Condition(v) => v,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Message handed to a [`crate::sender::Sender`].
///
/// Serialized field order is fixed: target, `notification`, `data`, then the
/// platform sections. Absent sections are not serialized at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    #[serde(flatten)]
    pub target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpush: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<Value>,
}

/// Builds the outbound message. Never fails: every shape requirement was
/// checked by [`crate::payload::validate`].
pub fn assemble(payload: NormalizedPayload) -> OutboundMessage {
    let notification = payload.notification.map(build_notification);
    let data = payload.data.filter(|data| !data.is_empty());

    let options = payload.extra_options.as_ref();
    let [android, webpush, apns] = PLATFORM_SECTIONS.map(|key| platform_section(options, key));

    let value = trim_whitespace(&payload.target).to_string();
    let target = match payload.target_kind {
        TargetKind::Token => Target::Token(value),
        TargetKind::Topic => Target::Topic(value),
        TargetKind::Condition => Target::Condition(value),
    };

    OutboundMessage {
        target,
        notification,
        data,
        android,
        webpush,
        apns,
    }
}

/// Keeps only non-empty fields. The section itself is kept even when every
/// field was dropped, so `"notification": {}` in the request yields an empty
/// notification section.
fn build_notification(input: NotificationInput) -> Notification {
    let non_empty = |field: Option<String>| field.filter(|s| !s.is_empty());
    Notification {
        title: non_empty(input.title),
        body: non_empty(input.body),
        image_url: non_empty(input.image_url),
    }
}

fn platform_section(options: Option<&Map<String, Value>>, key: &str) -> Option<Value> {
    options?.get(key).filter(|value| is_truthy(value)).cloned()
}

/// `null`, `false`, zero and the empty string count as not set.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
