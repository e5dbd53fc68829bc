//! Unit tests for the dual-mode request decoder.
//!
//! A recording stub formatter verifies the delegation contract; the JSON
//! formatter covers the assembled paths end to end in `tests/`.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use super::*;
use crate::{
    event::AttributeValue,
    formatter::FormatterError,
    request::OwnedRequest,
};

/// Formatter stub that returns a canned event and records its calls.
#[derive(Debug, Default)]
struct RecordingFormatter {
    structured_calls: AtomicUsize,
    binary_calls: AtomicUsize,
}

#[async_trait]
impl EventFormatter for RecordingFormatter {
    async fn decode_structured(
        &self,
        body: &[u8],
        content_type: Option<&str>,
        extensions: &[ExtensionAttribute],
    ) -> Result<CloudEvent, FormatterError> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        let mut event = CloudEvent::new(SpecVersion::V1_0, extensions);
        event
            .set_attribute_from_string("id", &String::from_utf8_lossy(body))
            .map_err(|e| FormatterError::with_source("stub id", e))?;
        event.set_data_content_type(content_type.map(str::to_owned));
        Ok(event)
    }

    async fn apply_binary_payload(
        &self,
        body: Bytes,
        event: &mut CloudEvent,
    ) -> Result<(), FormatterError> {
        self.binary_calls.fetch_add(1, Ordering::SeqCst);
        if !body.is_empty() {
            event.set_data(crate::event::EventData::Binary(body));
        }
        Ok(())
    }
}

/// Formatter stub that fails every call.
#[derive(Debug)]
struct FailingFormatter;

#[async_trait]
impl EventFormatter for FailingFormatter {
    async fn decode_structured(
        &self,
        _body: &[u8],
        _content_type: Option<&str>,
        _extensions: &[ExtensionAttribute],
    ) -> Result<CloudEvent, FormatterError> {
        Err(FormatterError::new("structured boom"))
    }

    async fn apply_binary_payload(
        &self,
        _body: Bytes,
        _event: &mut CloudEvent,
    ) -> Result<(), FormatterError> {
        Err(FormatterError::new("binary boom"))
    }
}

#[tokio::test]
async fn structured_mode_delegates_wholesale() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_content_type("application/cloudevents+json")
        .with_header("ce-type", "ignored.in.structured.mode")
        .with_body("event-id");

    let event = decode_request(&mut request, &formatter, &[])
        .await
        .expect("structured decode should pass through");

    assert_eq!(formatter.structured_calls.load(Ordering::SeqCst), 1);
    assert_eq!(formatter.binary_calls.load(Ordering::SeqCst), 0);
    // The returned event is exactly the formatter's result: the decoder
    // performed no attribute extraction of its own.
    assert_eq!(event.id(), Some("event-id"));
    assert_eq!(event.ty(), None);
}

#[tokio::test]
async fn structured_mode_prefix_is_case_insensitive() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_content_type("Application/CloudEvents+JSON")
        .with_body("x");

    decode_request(&mut request, &formatter, &[])
        .await
        .expect("uppercase prefix still selects structured mode");
    assert_eq!(formatter.structured_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn binary_mode_without_spec_version_is_not_a_cloud_event() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_content_type("text/plain")
        .with_header("ce-id", "123");

    let err = decode_request(&mut request, &formatter, &[])
        .await
        .expect_err("missing spec version must fail");
    assert!(matches!(err, DecodeError::MissingSpecVersion));
    assert_eq!(formatter.binary_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn binary_mode_rejects_unknown_spec_version() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new().with_header("ce-specversion", "0.3");

    let err = decode_request(&mut request, &formatter, &[])
        .await
        .expect_err("unknown spec version must fail");
    match err {
        DecodeError::UnsupportedSpecVersion { version } => assert_eq!(version, "0.3"),
        other => panic!("expected UnsupportedSpecVersion, got {other:?}"),
    }
}

#[tokio::test]
async fn binary_mode_assembles_headers_and_payload() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_content_type("text/plain")
        .with_header("ce-specversion", "1.0")
        .with_header("ce-type", "com.example.test")
        .with_header("ce-source", "/test")
        .with_header("ce-id", "123")
        .with_header("x-forwarded-for", "10.0.0.1")
        .with_body("hello");

    let event = decode_request(&mut request, &formatter, &[])
        .await
        .expect("valid binary-mode request");

    assert_eq!(event.spec_version(), SpecVersion::V1_0);
    assert_eq!(event.ty(), Some("com.example.test"));
    assert_eq!(event.source(), Some("/test"));
    assert_eq!(event.id(), Some("123"));
    assert_eq!(event.data_content_type(), Some("text/plain"));
    assert_eq!(
        event.data(),
        Some(&crate::event::EventData::Binary(Bytes::from_static(
            b"hello"
        )))
    );
    assert_eq!(formatter.binary_calls.load(Ordering::SeqCst), 1);
    // Unmapped transport headers never become attributes.
    assert!(event.attributes().all(|(name, _)| name != "forwardedfor"));
}

#[tokio::test]
async fn spec_version_header_never_becomes_an_attribute() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_header("ce-specversion", "1.0")
        .with_header("ce-id", "1");

    let event = decode_request(&mut request, &formatter, &[])
        .await
        .expect("valid binary-mode request");
    assert!(event.attribute(SPEC_VERSION_ATTRIBUTE).is_none());
}

#[tokio::test]
async fn absent_content_type_leaves_data_content_type_unset() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new().with_header("ce-specversion", "1.0");

    let event = decode_request(&mut request, &formatter, &[])
        .await
        .expect("valid binary-mode request");
    assert_eq!(event.data_content_type(), None);
}

#[tokio::test]
async fn duplicate_attribute_headers_are_last_write_wins() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_header("ce-specversion", "1.0")
        .with_header("ce-id", "first")
        .with_header("ce-id", "second");

    let event = decode_request(&mut request, &formatter, &[])
        .await
        .expect("valid binary-mode request");
    assert_eq!(event.id(), Some("second"));
}

#[tokio::test]
async fn first_spec_version_header_occurrence_is_used() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_header("ce-specversion", "0.3")
        .with_header("ce-specversion", "1.0");

    let err = decode_request(&mut request, &formatter, &[])
        .await
        .expect_err("first occurrence drives version resolution");
    assert!(matches!(
        err,
        DecodeError::UnsupportedSpecVersion { version } if version == "0.3"
    ));
}

#[tokio::test]
async fn header_values_are_unescaped_before_assignment() {
    let formatter = RecordingFormatter::default();
    let mut request = OwnedRequest::new()
        .with_header("ce-specversion", "1.0")
        .with_header("ce-subject", "caf%C3%A9%20menu");

    let event = decode_request(&mut request, &formatter, &[])
        .await
        .expect("valid binary-mode request");
    assert_eq!(event.subject(), Some("café menu"));
}

#[tokio::test]
async fn typed_extension_declarations_reach_the_event() {
    let formatter = RecordingFormatter::default();
    let sequence = ExtensionAttribute::new("sequence", crate::event::AttributeType::Integer)
        .expect("valid declaration");
    let mut request = OwnedRequest::new()
        .with_header("ce-specversion", "1.0")
        .with_header("ce-sequence", "9");

    let event = decode_request(&mut request, &formatter, &[sequence])
        .await
        .expect("valid binary-mode request");
    assert_eq!(event.attribute("sequence"), Some(&AttributeValue::Integer(9)));
}

#[tokio::test]
async fn untypeable_attribute_header_fails_the_decode() {
    let formatter = RecordingFormatter::default();
    let sequence = ExtensionAttribute::new("sequence", crate::event::AttributeType::Integer)
        .expect("valid declaration");
    let mut request = OwnedRequest::new()
        .with_header("ce-specversion", "1.0")
        .with_header("ce-sequence", "not-a-number");

    let err = decode_request(&mut request, &formatter, &[sequence])
        .await
        .expect_err("untypeable value must fail");
    assert!(matches!(
        err,
        DecodeError::InvalidAttribute { name, .. } if name == "sequence"
    ));
}

#[tokio::test]
async fn structured_formatter_failures_propagate_unchanged() {
    let mut request = OwnedRequest::new()
        .with_content_type("application/cloudevents+json")
        .with_body("{}");

    let err = decode_request(&mut request, &FailingFormatter, &[])
        .await
        .expect_err("formatter failure must surface");
    assert_eq!(err.to_string(), "structured boom");
}

#[tokio::test]
async fn binary_formatter_failures_propagate_unchanged() {
    let mut request = OwnedRequest::new()
        .with_header("ce-specversion", "1.0")
        .with_body("payload");

    let err = decode_request(&mut request, &FailingFormatter, &[])
        .await
        .expect_err("formatter failure must surface");
    assert_eq!(err.to_string(), "binary boom");
}
