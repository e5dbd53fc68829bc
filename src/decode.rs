//! Dual-mode CloudEvents request decoding.
//!
//! [`decode_request`] is the single decision-and-assembly routine of this
//! crate. The request's declared content type picks the wire mode: a
//! content type starting with the CloudEvents media-type prefix selects
//! structured mode, everything else (including no content type) selects
//! binary mode. Structured mode delegates wholesale to the formatter;
//! binary mode assembles the event from `ce-*` headers here and hands the
//! buffered body to the formatter for payload interpretation.
//!
//! The routine is stateless and reentrant: it is purely a function of its
//! inputs, aside from fully draining the request body stream.

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use crate::{
    binding,
    error::DecodeError,
    event::{CloudEvent, ExtensionAttribute, SPEC_VERSION_ATTRIBUTE, SpecVersion},
    formatter::EventFormatter,
    request::RequestView,
};

/// Decode a CloudEvent from an inbound HTTP request.
///
/// The formatter is a required parameter: structured-mode parsing and
/// binary-mode payload interpretation are always its responsibility, and
/// its failures are surfaced unchanged.
///
/// On any failure the decode attempt is abandoned whole; no partial event
/// is ever returned.
///
/// # Errors
///
/// - [`DecodeError::MissingSpecVersion`] when a binary-mode request has no
///   spec-version header and so is not a CloudEvent.
/// - [`DecodeError::UnsupportedSpecVersion`] when the spec-version header
///   value is not in the registry.
/// - [`DecodeError::InvalidAttribute`] when a mapped attribute header
///   carries a value the event model rejects.
/// - [`DecodeError::Formatter`] for failures raised by the formatter.
/// - [`DecodeError::Io`] when draining the body stream fails.
pub async fn decode_request<R, F>(
    request: &mut R,
    formatter: &F,
    extensions: &[ExtensionAttribute],
) -> Result<CloudEvent, DecodeError>
where
    R: RequestView,
    F: EventFormatter,
{
    if binding::is_structured_mode(request.content_type()) {
        let content_type = request.content_type().map(str::to_owned);
        debug!(content_type = content_type.as_deref(), "decoding structured-mode request");
        let body = read_body(request).await?;
        let event = formatter
            .decode_structured(&body, content_type.as_deref(), extensions)
            .await?;
        return Ok(event);
    }
    decode_binary(request, formatter, extensions).await
}

/// Binary-mode assembly: spec-version negotiation, header-to-attribute
/// mapping, then payload handoff.
async fn decode_binary<R, F>(
    request: &mut R,
    formatter: &F,
    extensions: &[ExtensionAttribute],
) -> Result<CloudEvent, DecodeError>
where
    R: RequestView,
    F: EventFormatter,
{
    let version_id = request
        .headers()
        .find(|(name, _)| name.eq_ignore_ascii_case(binding::SPEC_VERSION_HEADER))
        .map(|(_, value)| value.to_owned())
        .ok_or(DecodeError::MissingSpecVersion)?;
    let version = SpecVersion::from_version_id(&version_id).ok_or(
        DecodeError::UnsupportedSpecVersion {
            version: version_id,
        },
    )?;
    debug!(%version, "decoding binary-mode request");

    let mut event = CloudEvent::new(version, extensions);
    for (name, value) in request.headers() {
        let Some(attribute) = binding::attribute_name_from_header_name(name) else {
            continue;
        };
        // The spec-version header is structural and already consumed.
        if attribute == SPEC_VERSION_ATTRIBUTE {
            continue;
        }
        let decoded = binding::decode_header_value(value);
        trace!(header = name, attribute = %attribute, "mapped attribute header");
        // Duplicate headers mapping to the same attribute are
        // last-write-wins, a wire-compat quirk kept from existing
        // deployments.
        event
            .set_attribute_from_string(&attribute, &decoded)
            .map_err(|source| DecodeError::InvalidAttribute {
                name: attribute,
                source,
            })?;
    }

    event.set_data_content_type(request.content_type().map(str::to_owned));

    let body = read_body(request).await?;
    formatter.apply_binary_payload(body, &mut event).await?;
    Ok(event)
}

/// Drain the single-pass body stream fully into memory.
async fn read_body<R: RequestView>(request: &mut R) -> Result<Bytes, DecodeError> {
    let mut buffer = Vec::new();
    request.body().read_to_end(&mut buffer).await?;
    trace!(len = buffer.len(), "buffered request body");
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests;
