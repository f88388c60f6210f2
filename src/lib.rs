//! Propagation codecs for Zipkin-style span contexts.
//!
//! A [`SpanContext`] carries the identity of the span a request is
//! currently inside of: trace id, span id, optional parent span id, the
//! sampling decision, feature [`Flags`] and free-form baggage. This
//! crate serializes that identity onto a carrier on the sending side and
//! reconstructs it on the receiving side, in two wire formats:
//!
//! - **text map**: the `X-B3-*` header family plus `ot-baggage-*`
//!   entries, for header-style transports,
//! - **binary**: a length-prefixed protobuf record, for byte-stream
//!   transports,
//!
//! plus a serialization-free **delegating** path for carriers that
//! already hold decoded state.
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use zipkin_propagation::{extract, inject, ExtractCarrier, Format, InjectCarrier, SpanContext};
//!
//! # fn main() -> Result<(), zipkin_propagation::PropagationError> {
//! let context = SpanContext::new(0x1, 0x2, true);
//! context.set_baggage_item("foo", "bar");
//!
//! // sending side: serialize onto an outgoing header map
//! let mut headers = HashMap::new();
//! inject(&context, Format::TextMap, InjectCarrier::TextMap(&mut headers))?;
//! assert_eq!(headers.get("X-B3-TraceId").map(String::as_str), Some("1"));
//!
//! // receiving side: reconstruct from the incoming headers
//! let extracted = extract(Format::TextMap, ExtractCarrier::TextMap(&headers))?;
//! assert_eq!(extracted.trace_id(), 0x1);
//! assert_eq!(extracted.baggage_item("foo").as_deref(), Some("bar"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod flags;
pub mod propagation;

pub use context::SpanContext;
pub use error::PropagationError;
pub use flags::Flags;
pub use propagation::{extract, inject, ExtractCarrier, Format, InjectCarrier};
