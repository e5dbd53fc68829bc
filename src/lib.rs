#![doc(html_root_url = "https://docs.rs/cloudwire/latest")]
//! Public API for the `cloudwire` library.
//!
//! This crate decodes CloudEvents from inbound HTTP requests according to
//! the CloudEvents HTTP protocol binding. Both wire modes are supported:
//! structured mode, where the whole event is one serialized body handed to
//! a pluggable [`EventFormatter`], and binary mode, where `ce-*` headers
//! carry the attributes and the body is the raw data payload.
//!
//! The hosting HTTP framework stays out of scope; requests are consumed
//! through the read-only [`RequestView`] contract.

pub mod binding;
pub mod decode;
pub mod error;
pub mod event;
pub mod formatter;
pub mod request;

pub use decode::decode_request;
pub use error::{DecodeError, Result};
pub use event::{
    AttributeType,
    AttributeValue,
    CloudEvent,
    EventData,
    EventError,
    ExtensionAttribute,
    SpecVersion,
};
pub use formatter::{EventFormatter, FormatterError, JsonEventFormatter};
pub use request::{OwnedRequest, RequestView};
