//! HTTP protocol binding conventions.
//!
//! Process-wide constant rules shared by both wire modes: the
//! structured-mode media-type prefix, the `ce-` header naming convention,
//! and the percent-escaping applied to attribute values carried in
//! headers. Nothing here holds per-call state.

/// Header carrying the spec-version attribute in binary mode.
pub const SPEC_VERSION_HEADER: &str = "ce-specversion";

/// Prefix mapping attribute names onto header names.
pub const ATTRIBUTE_HEADER_PREFIX: &str = "ce-";

/// Media-type prefix identifying a structured-mode request.
pub const STRUCTURED_MEDIA_TYPE_PREFIX: &str = "application/cloudevents";

/// Whether a declared content type selects structured mode.
///
/// The comparison is a case-insensitive prefix test; an absent content
/// type always selects binary mode.
///
/// # Examples
///
/// ```
/// use cloudwire::binding::is_structured_mode;
///
/// assert!(is_structured_mode(Some("application/cloudevents+json")));
/// assert!(!is_structured_mode(Some("text/plain")));
/// assert!(!is_structured_mode(None));
/// ```
#[must_use]
pub fn is_structured_mode(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        ct.get(..STRUCTURED_MEDIA_TYPE_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(STRUCTURED_MEDIA_TYPE_PREFIX))
    })
}

/// Map a header name to the attribute name it carries.
///
/// Returns `None` for headers outside the `ce-` namespace and for `ce-`
/// headers whose remainder is not a valid attribute name, so such headers
/// are ignored rather than rejected.
///
/// # Examples
///
/// ```
/// use cloudwire::binding::attribute_name_from_header_name;
///
/// assert_eq!(attribute_name_from_header_name("CE-Type").as_deref(), Some("type"));
/// assert_eq!(attribute_name_from_header_name("content-length"), None);
/// ```
#[must_use]
pub fn attribute_name_from_header_name(header_name: &str) -> Option<String> {
    let prefix = header_name.get(..ATTRIBUTE_HEADER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(ATTRIBUTE_HEADER_PREFIX) {
        return None;
    }
    let rest = &header_name[ATTRIBUTE_HEADER_PREFIX.len()..];
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}

/// Map an attribute name to the header that carries it, the reverse of
/// [`attribute_name_from_header_name`].
#[must_use]
pub fn header_name_from_attribute_name(attribute_name: &str) -> String {
    format!("{ATTRIBUTE_HEADER_PREFIX}{attribute_name}")
}

/// Reverse the escaping applied when an attribute value was encoded into
/// a header.
///
/// Percent escapes are replaced with the octets they denote and the result
/// is interpreted as UTF-8. Input that was never escaped passes through
/// unchanged, as do malformed escape sequences.
#[must_use]
pub fn decode_header_value(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match (
            bytes[index],
            bytes.get(index + 1).and_then(|b| hex_nibble(*b)),
            bytes.get(index + 2).and_then(|b| hex_nibble(*b)),
        ) {
            (b'%', Some(high), Some(low)) => {
                out.push(high << 4 | low);
                index += 3;
            }
            (b, _, _) => {
                out.push(b);
                index += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Escape an attribute value for carriage in a header.
///
/// Octets outside the printable ASCII range, plus `%` itself and the
/// double quote, are percent-encoded so [`decode_header_value`] restores
/// the value exactly.
#[must_use]
pub fn encode_header_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if (0x21..=0x7e).contains(&byte) && byte != b'%' && byte != b'"' {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0f));
        }
    }
    out
}

fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .map_or('0', |digit| digit.to_ascii_uppercase())
}
