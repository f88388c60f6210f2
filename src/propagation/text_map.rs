//! # B3 multi-header codec
//!
//! Serializes a span context as the `X-B3-*` header family plus
//! `ot-baggage-` prefixed baggage entries:
//!
//! ```text
//! X-B3-TraceId: {trace_id}
//! X-B3-SpanId: {span_id}
//! X-B3-ParentSpanId: {parent_span_id}   (omitted for root spans)
//! X-B3-Sampled: {"true"|"false"}
//! X-B3-Flags: {debug_flag}
//! ot-baggage-{key}: {value}
//! ```
//!
//! Header names are written in canonical case and matched
//! case-insensitively on extraction.

use std::collections::HashMap;

use crate::context::SpanContext;
use crate::error::PropagationError;
use crate::flags::Flags;
use crate::propagation::{TextMapReader, TextMapWriter};

const B3_TRACE_ID_HEADER: &str = "X-B3-TraceId";
const B3_SPAN_ID_HEADER: &str = "X-B3-SpanId";
const B3_PARENT_SPAN_ID_HEADER: &str = "X-B3-ParentSpanId";
const B3_SAMPLED_HEADER: &str = "X-B3-Sampled";
const B3_FLAGS_HEADER: &str = "X-B3-Flags";

const B3_TRACE_ID_LOWER: &str = "x-b3-traceid";
const B3_SPAN_ID_LOWER: &str = "x-b3-spanid";
const B3_PARENT_SPAN_ID_LOWER: &str = "x-b3-parentspanid";
const B3_SAMPLED_LOWER: &str = "x-b3-sampled";
const B3_FLAGS_LOWER: &str = "x-b3-flags";

const BAGGAGE_PREFIX: &str = "ot-baggage-";

/// Injects and extracts span contexts through string key/value carriers.
#[derive(Clone, Debug, Default)]
pub struct TextMapPropagator {
    _private: (),
}

impl TextMapPropagator {
    /// Create a B3 multi-header propagator.
    pub fn new() -> Self {
        TextMapPropagator::default()
    }

    /// Write `context` onto `carrier` as B3 headers.
    ///
    /// The parent span id header is only written when a parent is
    /// present; its absence is how a root span is signaled on this
    /// format. Of the flag bits only Debug crosses this wire format.
    pub fn inject(
        &self,
        context: &SpanContext,
        carrier: &mut dyn TextMapWriter,
    ) -> Result<(), PropagationError> {
        if !context.is_valid() {
            return Err(PropagationError::InvalidSpanContext);
        }

        carrier.set(B3_TRACE_ID_HEADER, format!("{:x}", context.trace_id()));
        carrier.set(B3_SPAN_ID_HEADER, format!("{:x}", context.span_id()));
        carrier.set(B3_SAMPLED_HEADER, context.sampled().to_string());

        if let Some(parent_span_id) = context.parent_span_id() {
            carrier.set(B3_PARENT_SPAN_ID_HEADER, format!("{parent_span_id:x}"));
        }

        let debug = context.flags() & Flags::DEBUG;
        carrier.set(B3_FLAGS_HEADER, debug.to_u64().to_string());

        context.for_each_baggage_item(|key, value| {
            carrier.set(&format!("{BAGGAGE_PREFIX}{key}"), value.to_owned());
        });
        Ok(())
    }

    /// Parse a span context out of the B3 headers in `carrier`.
    ///
    /// Trace id and span id are required; sampled, parent span id and
    /// flags are optional. A carrier with no B3 header at all yields
    /// [`PropagationError::SpanContextNotFound`]; one with some B3 data
    /// but incomplete ids yields
    /// [`PropagationError::SpanContextCorrupted`].
    pub fn extract(&self, carrier: &dyn TextMapReader) -> Result<SpanContext, PropagationError> {
        let mut trace_id = None;
        let mut span_id = None;
        let mut parent_span_id = None;
        let mut sampled = false;
        let mut flags = Flags::default();
        let mut recognized = false;
        let mut baggage = HashMap::new();

        carrier.for_each_key(&mut |key, value| {
            match key.to_lowercase().as_str() {
                B3_TRACE_ID_LOWER => {
                    trace_id = Some(parse_hex_id(key, value)?);
                    recognized = true;
                }
                B3_SPAN_ID_LOWER => {
                    span_id = Some(parse_hex_id(key, value)?);
                    recognized = true;
                }
                B3_PARENT_SPAN_ID_LOWER => {
                    parent_span_id = Some(parse_hex_id(key, value)?);
                    recognized = true;
                }
                B3_SAMPLED_LOWER => {
                    sampled = value.parse().map_err(|_| {
                        tracing::warn!(value, "unparseable {B3_SAMPLED_HEADER} header");
                        PropagationError::SpanContextCorrupted
                    })?;
                    // the sampling decision was communicated explicitly
                    flags = flags | Flags::SAMPLING_SET;
                    recognized = true;
                }
                B3_FLAGS_LOWER => {
                    let raw: u64 = value.parse().map_err(|_| {
                        tracing::warn!(value, "unparseable {B3_FLAGS_HEADER} header");
                        PropagationError::SpanContextCorrupted
                    })?;
                    // only the debug bit is honored from this wire format
                    if Flags::new(raw).is_debug() {
                        flags = flags | Flags::DEBUG;
                    }
                    recognized = true;
                }
                lower => {
                    if let Some(key) = lower.strip_prefix(BAGGAGE_PREFIX) {
                        baggage.insert(key.to_owned(), value.to_owned());
                    }
                }
            }
            Ok(())
        })?;

        let (trace_id, span_id) = match (trace_id, span_id) {
            (Some(trace_id), Some(span_id)) => (trace_id, span_id),
            _ if !recognized => return Err(PropagationError::SpanContextNotFound),
            _ => {
                tracing::warn!("b3 headers present but trace or span id missing");
                return Err(PropagationError::SpanContextCorrupted);
            }
        };

        // the sampling decision may have arrived through the flags bitset
        if !sampled && flags.contains(Flags::SAMPLED) {
            sampled = true;
        }

        let mut context = SpanContext::new(trace_id, span_id, sampled)
            .with_flags(flags)
            .with_baggage(baggage);
        if let Some(parent_span_id) = parent_span_id {
            context = context.with_parent(parent_span_id);
        }
        Ok(context)
    }
}

fn parse_hex_id(key: &str, value: &str) -> Result<u64, PropagationError> {
    u64::from_str_radix(value, 16).map_err(|_| {
        tracing::warn!(header = key, value, "unparseable b3 id header");
        PropagationError::SpanContextCorrupted
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carrier(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn inject_writes_b3_headers() {
        let context = SpanContext::new(0x1, 0x2, true);
        context.set_baggage_item("foo", "bar");

        let mut headers = HashMap::new();
        TextMapPropagator::new()
            .inject(&context, &mut headers)
            .unwrap();

        assert_eq!(headers.get("X-B3-TraceId").map(String::as_str), Some("1"));
        assert_eq!(headers.get("X-B3-SpanId").map(String::as_str), Some("2"));
        assert_eq!(
            headers.get("X-B3-Sampled").map(String::as_str),
            Some("true")
        );
        assert_eq!(headers.get("X-B3-Flags").map(String::as_str), Some("0"));
        assert_eq!(headers.get("ot-baggage-foo").map(String::as_str), Some("bar"));
        assert!(!headers.contains_key("X-B3-ParentSpanId"));
    }

    #[test]
    fn inject_hex_is_unpadded_lowercase() {
        let context = SpanContext::new(0xdead_beef, 0x0a0b, false).with_parent(0xCAFE);

        let mut headers = HashMap::new();
        TextMapPropagator::new()
            .inject(&context, &mut headers)
            .unwrap();

        assert_eq!(
            headers.get("X-B3-TraceId").map(String::as_str),
            Some("deadbeef")
        );
        assert_eq!(headers.get("X-B3-SpanId").map(String::as_str), Some("a0b"));
        assert_eq!(
            headers.get("X-B3-ParentSpanId").map(String::as_str),
            Some("cafe")
        );
        assert_eq!(
            headers.get("X-B3-Sampled").map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn inject_writes_debug_flag_only() {
        let context = SpanContext::new(1, 2, true)
            .with_flags(Flags::DEBUG | Flags::SAMPLING_SET | Flags::SAMPLED | Flags::IS_ROOT);

        let mut headers = HashMap::new();
        TextMapPropagator::new()
            .inject(&context, &mut headers)
            .unwrap();

        assert_eq!(headers.get("X-B3-Flags").map(String::as_str), Some("1"));
    }

    #[test]
    fn inject_rejects_invalid_context() {
        let mut headers = HashMap::new();
        let err = TextMapPropagator::new()
            .inject(&SpanContext::new(0, 2, true), &mut headers)
            .unwrap_err();
        assert!(matches!(err, PropagationError::InvalidSpanContext));
        assert!(headers.is_empty());
    }

    #[test]
    fn extract_round_trip() {
        let context = SpanContext::new(0x4bf9_2f35, 0x00f0_67aa, true).with_parent(0xcd);
        context.set_baggage_item("foo", "bar");
        context.set_baggage_item("checkout", "cart-7");

        let mut headers = HashMap::new();
        let propagator = TextMapPropagator::new();
        propagator.inject(&context, &mut headers).unwrap();
        let extracted = propagator.extract(&headers).unwrap();

        assert_eq!(extracted.trace_id(), context.trace_id());
        assert_eq!(extracted.span_id(), context.span_id());
        assert_eq!(extracted.parent_span_id(), Some(0xcd));
        assert!(extracted.sampled());
        assert!(extracted.flags().contains(Flags::SAMPLING_SET));
        assert_eq!(extracted.baggage(), context.baggage());
    }

    #[test]
    fn extract_is_case_insensitive() {
        let headers = carrier(&[
            ("x-b3-traceid", "1"),
            ("X-B3-SPANID", "2"),
            ("X-b3-Sampled", "true"),
            ("OT-Baggage-Foo", "bar"),
        ]);

        let extracted = TextMapPropagator::new().extract(&headers).unwrap();
        assert_eq!(extracted.trace_id(), 1);
        assert_eq!(extracted.span_id(), 2);
        assert!(extracted.sampled());
        assert_eq!(extracted.baggage_item("foo").as_deref(), Some("bar"));
    }

    #[test]
    fn extract_debug_flag() {
        let headers = carrier(&[("x-b3-traceid", "1"), ("x-b3-spanid", "2"), ("x-b3-flags", "1")]);

        let extracted = TextMapPropagator::new().extract(&headers).unwrap();
        assert!(extracted.flags().is_debug());
        // no sampled header was seen
        assert!(!extracted.flags().contains(Flags::SAMPLING_SET));
        assert!(!extracted.sampled());
    }

    #[test]
    fn extract_empty_carrier_is_not_found() {
        let err = TextMapPropagator::new()
            .extract(&HashMap::new())
            .unwrap_err();
        assert!(matches!(err, PropagationError::SpanContextNotFound));
    }

    #[test]
    fn extract_baggage_only_is_not_found() {
        // baggage keys do not count as propagation data
        let headers = carrier(&[("ot-baggage-foo", "bar"), ("content-type", "text/plain")]);
        let err = TextMapPropagator::new().extract(&headers).unwrap_err();
        assert!(matches!(err, PropagationError::SpanContextNotFound));
    }

    #[test]
    fn extract_partial_data_is_corrupted() {
        let cases = vec![
            vec![("x-b3-traceid", "1")],
            vec![("x-b3-spanid", "2"), ("x-b3-sampled", "true")],
            vec![("x-b3-sampled", "true"), ("x-b3-flags", "0")],
        ];
        for case in cases {
            let err = TextMapPropagator::new()
                .extract(&carrier(&case))
                .unwrap_err();
            assert!(
                matches!(err, PropagationError::SpanContextCorrupted),
                "case {case:?}"
            );
        }
    }

    #[test]
    fn extract_unparseable_values_are_corrupted() {
        let cases = vec![
            vec![("x-b3-traceid", "not-hex"), ("x-b3-spanid", "2")],
            vec![("x-b3-traceid", "1"), ("x-b3-spanid", "0x2g")],
            vec![("x-b3-traceid", "1"), ("x-b3-spanid", "2"), ("x-b3-sampled", "yes")],
            vec![("x-b3-traceid", "1"), ("x-b3-spanid", "2"), ("x-b3-flags", "debug")],
            vec![("x-b3-traceid", "1"), ("x-b3-spanid", "2"), ("x-b3-parentspanid", "")],
        ];
        for case in cases {
            let err = TextMapPropagator::new()
                .extract(&carrier(&case))
                .unwrap_err();
            assert!(
                matches!(err, PropagationError::SpanContextCorrupted),
                "case {case:?}"
            );
        }
    }

    #[test]
    fn extract_without_sampled_header_defaults_to_unsampled() {
        let headers = carrier(&[("x-b3-traceid", "1"), ("x-b3-spanid", "2")]);

        let extracted = TextMapPropagator::new().extract(&headers).unwrap();
        assert!(!extracted.sampled());
        assert!(!extracted.flags().contains(Flags::SAMPLING_SET));
        assert_eq!(extracted.parent_span_id(), None);
    }
}
