use push_gateway::errors::ValidationError;
use push_gateway::message::assemble;
use push_gateway::payload::validate;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to render message: {0}")]
    Render(#[from] serde_json::Error),
}

/// Runs the validation and assembly pipeline on a request body without
/// sending anything. Returns the outbound message as pretty-printed JSON.
///
/// Malformed JSON is treated the same way the HTTP endpoint treats it: as a
/// body that is not an object.
pub fn check_payload(input: &str) -> Result<String, CheckError> {
    let raw: Value = serde_json::from_str(input).unwrap_or(Value::Null);
    let message = assemble(validate(&raw)?);

    Ok(serde_json::to_string_pretty(&message)?)
}
