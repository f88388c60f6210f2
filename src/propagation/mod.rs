//! Carrier interfaces and the codecs that move a [`SpanContext`] through
//! them.
//!
//! A carrier is the transport-specific container a span context crosses a
//! process boundary in. Three kinds are supported:
//!
//! - string key/value carriers (HTTP-header style), served by
//!   [`TextMapPropagator`],
//! - byte-stream carriers, served by [`BinaryPropagator`],
//! - carriers that already hold decoded state, served by
//!   [`DelegatingPropagator`].
//!
//! [`inject`] and [`extract`] dispatch over the closed set of carrier
//! kinds; the individual propagators can also be used directly.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::io;

use crate::context::SpanContext;
use crate::error::PropagationError;

pub mod binary;
pub mod delegating;
pub mod text_map;
mod wire;

pub use binary::BinaryPropagator;
pub use delegating::{DelegatingCarrier, DelegatingPropagator};
pub use text_map::TextMapPropagator;

/// Writer half of a string key/value carrier.
///
/// Keys are written in their exact case; readers are expected to match
/// case-insensitively.
pub trait TextMapWriter {
    /// Add a key and value to the underlying data.
    fn set(&mut self, key: &str, value: String);
}

/// Reader half of a string key/value carrier.
pub trait TextMapReader {
    /// Invoke `handler` for every key/value pair in the carrier,
    /// stopping at the first error.
    fn for_each_key(
        &self,
        handler: &mut dyn FnMut(&str, &str) -> Result<(), PropagationError>,
    ) -> Result<(), PropagationError>;
}

impl<S: BuildHasher> TextMapWriter for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_owned(), value);
    }
}

impl<S: BuildHasher> TextMapReader for HashMap<String, String, S> {
    fn for_each_key(
        &self,
        handler: &mut dyn FnMut(&str, &str) -> Result<(), PropagationError>,
    ) -> Result<(), PropagationError> {
        for (key, value) in self {
            handler(key, value)?;
        }
        Ok(())
    }
}

/// The closed set of supported carrier kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// String key/value carrier, e.g. HTTP headers.
    TextMap,
    /// Length-prefixed binary carrier, e.g. a byte stream.
    Binary,
    /// Carrier that holds decoded state directly.
    Delegating,
}

/// A carrier accepted by [`inject`].
pub enum InjectCarrier<'a> {
    /// Case-sensitive key/value writer.
    TextMap(&'a mut dyn TextMapWriter),
    /// Byte sink.
    Binary(&'a mut dyn io::Write),
    /// Decoded-state carrier.
    Delegating(&'a mut dyn DelegatingCarrier),
}

/// A carrier accepted by [`extract`].
pub enum ExtractCarrier<'a> {
    /// Key/value reader with iteration.
    TextMap(&'a dyn TextMapReader),
    /// Byte source.
    Binary(&'a mut dyn io::Read),
    /// Decoded-state carrier.
    Delegating(&'a dyn DelegatingCarrier),
}

/// Serialize `context` onto `carrier` using the codec for `format`.
///
/// Fails with [`PropagationError::InvalidCarrier`] when the carrier kind
/// does not match the format, and with
/// [`PropagationError::InvalidSpanContext`] when the context's ids are
/// not both nonzero.
pub fn inject(
    context: &SpanContext,
    format: Format,
    carrier: InjectCarrier<'_>,
) -> Result<(), PropagationError> {
    match (format, carrier) {
        (Format::TextMap, InjectCarrier::TextMap(carrier)) => {
            TextMapPropagator::new().inject(context, carrier)
        }
        (Format::Binary, InjectCarrier::Binary(carrier)) => {
            BinaryPropagator::new().inject(context, carrier)
        }
        (Format::Delegating, InjectCarrier::Delegating(carrier)) => {
            DelegatingPropagator::new().inject(context, carrier)
        }
        _ => Err(PropagationError::InvalidCarrier),
    }
}

/// Parse a new [`SpanContext`] out of `carrier` using the codec for
/// `format`.
///
/// Fails with [`PropagationError::SpanContextNotFound`] when the carrier
/// holds no propagation data at all (an untraced request) and with
/// [`PropagationError::SpanContextCorrupted`] when it holds partial or
/// malformed data.
pub fn extract(
    format: Format,
    carrier: ExtractCarrier<'_>,
) -> Result<SpanContext, PropagationError> {
    match (format, carrier) {
        (Format::TextMap, ExtractCarrier::TextMap(carrier)) => {
            TextMapPropagator::new().extract(carrier)
        }
        (Format::Binary, ExtractCarrier::Binary(carrier)) => {
            BinaryPropagator::new().extract(carrier)
        }
        (Format::Delegating, ExtractCarrier::Delegating(carrier)) => {
            DelegatingPropagator::new().extract(carrier)
        }
        _ => Err(PropagationError::InvalidCarrier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_map_writer_keeps_key_case() {
        let mut carrier = HashMap::new();
        carrier.set("X-B3-TraceId", "1".to_owned());

        assert_eq!(carrier.get("X-B3-TraceId").map(String::as_str), Some("1"));
        assert_eq!(carrier.get("x-b3-traceid"), None);
    }

    #[test]
    fn hash_map_reader_visits_every_pair() {
        let mut carrier = HashMap::new();
        carrier.set("a", "1".to_owned());
        carrier.set("b", "2".to_owned());

        let mut seen = Vec::new();
        carrier
            .for_each_key(&mut |k, v| {
                seen.push(format!("{k}={v}"));
                Ok(())
            })
            .unwrap();
        seen.sort();
        assert_eq!(seen, vec!["a=1", "b=2"]);
    }

    #[test]
    fn hash_map_reader_stops_on_error() {
        let mut carrier = HashMap::new();
        carrier.set("a", "1".to_owned());

        let result = carrier.for_each_key(&mut |_, _| Err(PropagationError::SpanContextCorrupted));
        assert!(matches!(
            result,
            Err(PropagationError::SpanContextCorrupted)
        ));
    }

    #[test]
    fn mismatched_carrier_is_rejected() {
        let context = SpanContext::new(1, 2, true);
        let mut headers = HashMap::new();

        let err = inject(
            &context,
            Format::Binary,
            InjectCarrier::TextMap(&mut headers),
        )
        .unwrap_err();
        assert!(matches!(err, PropagationError::InvalidCarrier));

        let err = extract(Format::TextMap, ExtractCarrier::Delegating(&Probe)).unwrap_err();
        assert!(matches!(err, PropagationError::InvalidCarrier));
    }

    struct Probe;

    impl DelegatingCarrier for Probe {
        fn set_baggage_item(&mut self, _key: &str, _value: &str) {}
        fn for_each_baggage_item(&self, _handler: &mut dyn FnMut(&str, &str)) {}
        fn set_state(
            &mut self,
            _trace_id: u64,
            _span_id: u64,
            _parent_span_id: Option<u64>,
            _sampled: bool,
            _flags: crate::Flags,
        ) {
        }
        fn state(&self) -> (u64, u64, Option<u64>, bool, crate::Flags) {
            (0, 0, None, false, crate::Flags::default())
        }
    }
}
