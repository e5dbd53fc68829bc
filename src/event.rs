//! CloudEvent data model: spec versions, typed attributes, and payloads.
//!
//! The model is deliberately small. A [`CloudEvent`] is a spec version, a
//! unique attribute-name-to-value map, an optional data payload, and the
//! extension attribute declarations the caller supplied at construction.
//! The spec-version attribute is structural and never stored in the map.
//!
//! Attribute values follow the CloudEvents type system. URI and timestamp
//! values are validated lightly and kept in their canonical string form;
//! the decoder assigns everything through
//! [`CloudEvent::set_attribute_from_string`], which coerces through the
//! declared type.

use std::{collections::BTreeMap, fmt};

use base64ct::{Base64, Encoding};
use bytes::Bytes;
use thiserror::Error;

/// Name of the structural spec-version attribute.
pub const SPEC_VERSION_ATTRIBUTE: &str = "specversion";

/// Errors produced by the event model when attributes are rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EventError {
    /// The raw string could not be coerced to the attribute's declared type.
    #[error("'{raw}' is not a valid {expected} value")]
    InvalidValue {
        /// Type the attribute is declared with.
        expected: AttributeType,
        /// Raw string that failed coercion.
        raw: String,
    },

    /// The attribute name violates the CloudEvents naming rules
    /// (lowercase ASCII letters and digits only, non-empty).
    #[error("'{0}' is not a valid attribute name")]
    InvalidName(String),

    /// The spec-version attribute is structural and cannot be assigned.
    #[error("'specversion' cannot be set as a regular attribute")]
    ReservedName,
}

/// Registry-resolved CloudEvents specification version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum SpecVersion {
    /// CloudEvents 1.0.
    V1_0,
}

impl SpecVersion {
    /// Resolve a version-id string against the registry.
    ///
    /// Returns `None` for any identifier without a registered version;
    /// callers treat that as a hard failure, never a silent fallback.
    #[must_use]
    pub fn from_version_id(version_id: &str) -> Option<Self> {
        match version_id {
            "1.0" => Some(Self::V1_0),
            _ => None,
        }
    }

    /// Wire identifier of this version.
    #[must_use]
    pub fn version_id(self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
        }
    }

    /// Declared type of a core attribute, or `None` if the name is not a
    /// core attribute of this version.
    #[must_use]
    pub fn core_attribute_type(self, name: &str) -> Option<AttributeType> {
        match (self, name) {
            (Self::V1_0, "id" | "type" | "subject" | "datacontenttype") => {
                Some(AttributeType::String)
            }
            (Self::V1_0, "source") => Some(AttributeType::UriRef),
            (Self::V1_0, "dataschema") => Some(AttributeType::Uri),
            (Self::V1_0, "time") => Some(AttributeType::Timestamp),
            (Self::V1_0, _) => None,
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version_id())
    }
}

/// The CloudEvents attribute type system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// Unicode string.
    String,
    /// Absolute URI.
    Uri,
    /// URI reference, absolute or relative.
    UriRef,
    /// RFC 3339 timestamp, kept in canonical string form.
    Timestamp,
    /// 32-bit signed integer.
    Integer,
    /// Boolean, `true` or `false` on the wire.
    Boolean,
    /// Opaque bytes, base64-encoded on the wire.
    Binary,
}

impl AttributeType {
    /// Parse the canonical string form into a typed value.
    ///
    /// Returns `None` when `raw` is not a valid representation of this
    /// type.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<AttributeValue> {
        match self {
            Self::String => Some(AttributeValue::String(raw.to_owned())),
            Self::Uri => is_absolute_uri(raw).then(|| AttributeValue::Uri(raw.to_owned())),
            Self::UriRef => (!raw.is_empty()).then(|| AttributeValue::UriRef(raw.to_owned())),
            Self::Timestamp => {
                is_rfc3339_timestamp(raw).then(|| AttributeValue::Timestamp(raw.to_owned()))
            }
            Self::Integer => raw.parse().ok().map(AttributeValue::Integer),
            Self::Boolean => match raw {
                "true" => Some(AttributeValue::Boolean(true)),
                "false" => Some(AttributeValue::Boolean(false)),
                _ => None,
            },
            Self::Binary => Base64::decode_vec(raw)
                .ok()
                .map(|b| AttributeValue::Binary(Bytes::from(b))),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Uri => "URI",
            Self::UriRef => "URI reference",
            Self::Timestamp => "timestamp",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// A typed attribute value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    /// Unicode string value.
    String(String),
    /// Absolute URI in canonical string form.
    Uri(String),
    /// URI reference in canonical string form.
    UriRef(String),
    /// RFC 3339 timestamp in canonical string form.
    Timestamp(String),
    /// 32-bit signed integer value.
    Integer(i32),
    /// Boolean value.
    Boolean(bool),
    /// Opaque binary value.
    Binary(Bytes),
}

impl AttributeValue {
    /// Type of this value.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Self::String(_) => AttributeType::String,
            Self::Uri(_) => AttributeType::Uri,
            Self::UriRef(_) => AttributeType::UriRef,
            Self::Timestamp(_) => AttributeType::Timestamp,
            Self::Integer(_) => AttributeType::Integer,
            Self::Boolean(_) => AttributeType::Boolean,
            Self::Binary(_) => AttributeType::Binary,
        }
    }

    /// Borrow the value as a string slice when it has a string carrier.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Uri(s) | Self::UriRef(s) | Self::Timestamp(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    /// Canonical string form, matching what [`AttributeType::parse`]
    /// accepts.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) | Self::Uri(s) | Self::UriRef(s) | Self::Timestamp(s) => {
                f.write_str(s)
            }
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Binary(bytes) => f.write_str(&Base64::encode_string(bytes)),
        }
    }
}

/// Caller-supplied declaration of a recognized extension attribute.
///
/// Declarations describe which non-core attribute names the decoder should
/// recognize and how to type their values; they carry no value themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionAttribute {
    name: String,
    attribute_type: AttributeType,
}

impl ExtensionAttribute {
    /// Declare an extension attribute.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidName`] if `name` is empty or contains
    /// anything other than lowercase ASCII letters and digits, and
    /// [`EventError::ReservedName`] if it names the spec-version attribute.
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Result<Self, EventError> {
        let name = name.into();
        if name == SPEC_VERSION_ATTRIBUTE {
            return Err(EventError::ReservedName);
        }
        if !is_valid_attribute_name(&name) {
            return Err(EventError::InvalidName(name));
        }
        Ok(Self {
            name,
            attribute_type,
        })
    }

    /// Declared attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        self.attribute_type
    }
}

/// Decoded event data payload.
#[derive(Clone, Debug, PartialEq)]
pub enum EventData {
    /// Raw bytes, uninterpreted by the formatter.
    Binary(Bytes),
    /// Structured JSON value.
    Json(serde_json::Value),
}

/// A decoded CloudEvent envelope.
#[derive(Clone, Debug, PartialEq)]
pub struct CloudEvent {
    spec_version: SpecVersion,
    attributes: BTreeMap<String, AttributeValue>,
    data: Option<EventData>,
    extensions: Vec<ExtensionAttribute>,
}

impl CloudEvent {
    /// Construct an empty event for `spec_version`, recognizing the given
    /// extension attribute declarations.
    #[must_use]
    pub fn new(spec_version: SpecVersion, extensions: &[ExtensionAttribute]) -> Self {
        Self {
            spec_version,
            attributes: BTreeMap::new(),
            data: None,
            extensions: extensions.to_vec(),
        }
    }

    /// Spec version this event was constructed for.
    #[must_use]
    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    /// Extension attribute declarations supplied at construction.
    #[must_use]
    pub fn extensions(&self) -> &[ExtensionAttribute] {
        &self.extensions
    }

    /// Assign an attribute from its canonical string form, coercing
    /// through the declared type.
    ///
    /// Core attributes use the spec version's declared types; declared
    /// extensions use their declaration; any other valid name becomes a
    /// string-typed extension. Reassignment replaces the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::ReservedName`] for the spec-version
    /// attribute, [`EventError::InvalidName`] for a malformed name, and
    /// [`EventError::InvalidValue`] when coercion fails.
    pub fn set_attribute_from_string(&mut self, name: &str, raw: &str) -> Result<(), EventError> {
        if name == SPEC_VERSION_ATTRIBUTE {
            return Err(EventError::ReservedName);
        }
        if !is_valid_attribute_name(name) {
            return Err(EventError::InvalidName(name.to_owned()));
        }
        let attribute_type = self
            .spec_version
            .core_attribute_type(name)
            .or_else(|| {
                self.extensions
                    .iter()
                    .find(|extension| extension.name() == name)
                    .map(ExtensionAttribute::attribute_type)
            })
            .unwrap_or(AttributeType::String);
        let value = attribute_type
            .parse(raw)
            .ok_or_else(|| EventError::InvalidValue {
                expected: attribute_type,
                raw: raw.to_owned(),
            })?;
        self.attributes.insert(name.to_owned(), value);
        Ok(())
    }

    /// Look up an attribute value by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Iterate over all assigned attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Event identifier (`id`), if assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attribute("id").and_then(AttributeValue::as_str)
    }

    /// Event source (`source`), if assigned.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.attribute("source").and_then(AttributeValue::as_str)
    }

    /// Event type (`type`), if assigned.
    #[must_use]
    pub fn ty(&self) -> Option<&str> {
        self.attribute("type").and_then(AttributeValue::as_str)
    }

    /// Event subject (`subject`), if assigned.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.attribute("subject").and_then(AttributeValue::as_str)
    }

    /// Data content type (`datacontenttype`), if assigned.
    #[must_use]
    pub fn data_content_type(&self) -> Option<&str> {
        self.attribute("datacontenttype")
            .and_then(AttributeValue::as_str)
    }

    /// Assign or clear the data content type without coercion.
    ///
    /// The value is itself a content-type string and is stored verbatim,
    /// even when empty.
    pub fn set_data_content_type<T: Into<String>>(&mut self, content_type: Option<T>) {
        match content_type {
            Some(value) => {
                self.attributes.insert(
                    "datacontenttype".to_owned(),
                    AttributeValue::String(value.into()),
                );
            }
            None => {
                self.attributes.remove("datacontenttype");
            }
        }
    }

    /// Decoded data payload, if any.
    #[must_use]
    pub fn data(&self) -> Option<&EventData> {
        self.data.as_ref()
    }

    /// Attach the decoded data payload.
    pub fn set_data(&mut self, data: EventData) {
        self.data = Some(data);
    }
}

/// CloudEvents attribute names are non-empty lowercase ASCII letters and
/// digits.
fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Accept an absolute URI: a scheme followed by `:`.
fn is_absolute_uri(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once(':') else {
        return false;
    };
    let mut bytes = scheme.bytes();
    bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
}

/// Shallow RFC 3339 shape check: date, `T`, time, optional fraction, and a
/// `Z` or numeric offset.
fn is_rfc3339_timestamp(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() < 20 {
        return false;
    }
    let date_time_ok = digits(&bytes[0..4])
        && bytes[4] == b'-'
        && digits(&bytes[5..7])
        && bytes[7] == b'-'
        && digits(&bytes[8..10])
        && matches!(bytes[10], b'T' | b't')
        && digits(&bytes[11..13])
        && bytes[13] == b':'
        && digits(&bytes[14..16])
        && bytes[16] == b':'
        && digits(&bytes[17..19]);
    if !date_time_ok {
        return false;
    }
    let mut rest = &bytes[19..];
    if rest.first() == Some(&b'.') {
        let fraction = rest[1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if fraction == 0 {
            return false;
        }
        rest = &rest[1 + fraction..];
    }
    match rest {
        [b'Z' | b'z'] => true,
        [sign, offset @ ..] if matches!(*sign, b'+' | b'-') => {
            offset.len() == 5 && digits(&offset[0..2]) && offset[2] == b':' && digits(&offset[3..5])
        }
        _ => false,
    }
}

fn digits(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_digit)
}
