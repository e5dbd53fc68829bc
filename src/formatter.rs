//! Pluggable event format seam and the JSON implementation.
//!
//! This module defines the [`EventFormatter`] trait enabling any concrete
//! event format (JSON, Avro, Protobuf) to plug into request decoding. The
//! decoder never parses a structured body itself; it hands the buffered
//! bytes to the formatter and passes the result or failure through
//! verbatim. [`JsonEventFormatter`] is provided as the default.

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

use crate::event::{CloudEvent, EventData, ExtensionAttribute, SPEC_VERSION_ATTRIBUTE, SpecVersion};

/// Failure raised by a formatter.
///
/// The decoder carries these through unchanged; the message and optional
/// source are entirely the formatter's to shape.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FormatterError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FormatterError {
    /// Create a formatter error from a message alone.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a formatter error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// A pluggable event format.
///
/// Implementations own both structured-mode body parsing and binary-mode
/// payload interpretation. The trait is the extension seam: the decoder
/// requires a concrete formatter at the type level, so a missing
/// formatter is unrepresentable.
#[async_trait]
pub trait EventFormatter: Send + Sync {
    /// Parse a structured-mode body into a complete CloudEvent.
    ///
    /// `content_type` is the request's declared content type, absent when
    /// the request carried none.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatterError`] when the body is not a valid
    /// structured-mode event in this format.
    async fn decode_structured(
        &self,
        body: &[u8],
        content_type: Option<&str>,
        extensions: &[ExtensionAttribute],
    ) -> Result<CloudEvent, FormatterError>;

    /// Interpret a binary-mode payload and attach it to `event`.
    ///
    /// How the bytes are understood (raw, text, base64, structured) is
    /// this formatter's decision, typically steered by the event's data
    /// content type.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatterError`] when the payload cannot be
    /// interpreted.
    async fn apply_binary_payload(
        &self,
        body: Bytes,
        event: &mut CloudEvent,
    ) -> Result<(), FormatterError>;
}

/// Event formatter for the JSON event format.
///
/// Structured bodies must be JSON objects carrying a `specversion`
/// member; `data` holds a structured payload and `data_base64` a binary
/// one, never both. Binary-mode payloads are parsed as JSON when the
/// event's data content type is a JSON media type and kept as raw bytes
/// otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEventFormatter;

#[async_trait]
impl EventFormatter for JsonEventFormatter {
    async fn decode_structured(
        &self,
        body: &[u8],
        _content_type: Option<&str>,
        extensions: &[ExtensionAttribute],
    ) -> Result<CloudEvent, FormatterError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| FormatterError::with_source("structured body is not valid JSON", e))?;
        let Value::Object(members) = value else {
            return Err(FormatterError::new(
                "structured CloudEvent body must be a JSON object",
            ));
        };

        let version_id = members
            .get(SPEC_VERSION_ATTRIBUTE)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FormatterError::new("structured CloudEvent has no 'specversion' member")
            })?;
        let version = SpecVersion::from_version_id(version_id).ok_or_else(|| {
            FormatterError::new(format!(
                "unsupported CloudEvents spec version '{version_id}'"
            ))
        })?;

        let mut event = CloudEvent::new(version, extensions);
        let mut data = None;
        let mut data_base64 = None;
        for (name, member) in &members {
            match name.as_str() {
                SPEC_VERSION_ATTRIBUTE => {}
                "data" => data = Some(member.clone()),
                "data_base64" => {
                    let encoded = member.as_str().ok_or_else(|| {
                        FormatterError::new("'data_base64' must be a JSON string")
                    })?;
                    let bytes = Base64::decode_vec(encoded).map_err(|_| {
                        FormatterError::new("'data_base64' is not valid base64")
                    })?;
                    data_base64 = Some(Bytes::from(bytes));
                }
                _ => {
                    let raw = attribute_member_to_string(name, member)?;
                    let Some(raw) = raw else { continue };
                    event.set_attribute_from_string(name, &raw).map_err(|e| {
                        FormatterError::with_source(format!("invalid attribute '{name}'"), e)
                    })?;
                }
            }
        }

        match (data, data_base64) {
            (Some(_), Some(_)) => Err(FormatterError::new(
                "'data' and 'data_base64' are mutually exclusive",
            )),
            (Some(value), None) => {
                event.set_data(EventData::Json(value));
                Ok(event)
            }
            (None, Some(bytes)) => {
                event.set_data(EventData::Binary(bytes));
                Ok(event)
            }
            (None, None) => Ok(event),
        }
    }

    async fn apply_binary_payload(
        &self,
        body: Bytes,
        event: &mut CloudEvent,
    ) -> Result<(), FormatterError> {
        if body.is_empty() {
            return Ok(());
        }
        if event.data_content_type().is_some_and(is_json_media_type) {
            let value: Value = serde_json::from_slice(&body).map_err(|e| {
                FormatterError::with_source("JSON payload could not be parsed", e)
            })?;
            event.set_data(EventData::Json(value));
        } else {
            event.set_data(EventData::Binary(body));
        }
        Ok(())
    }
}

/// Canonical string form of a JSON attribute member.
///
/// Strings, numbers, and booleans are accepted; `null` clears nothing and
/// is skipped; arrays and objects have no attribute representation.
fn attribute_member_to_string(name: &str, member: &Value) -> Result<Option<String>, FormatterError> {
    match member {
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Null => Ok(None),
        Value::Array(_) | Value::Object(_) => Err(FormatterError::new(format!(
            "attribute '{name}' must be a JSON primitive"
        ))),
    }
}

/// Media types whose payloads the JSON formatter parses structurally.
fn is_json_media_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    media_type.eq_ignore_ascii_case("application/json")
        || media_type.eq_ignore_ascii_case("text/json")
        || media_type
            .rsplit_once('+')
            .is_some_and(|(_, suffix)| suffix.eq_ignore_ascii_case("json"))
}
