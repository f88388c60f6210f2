//! Protobuf shape of the binary carrier payload.
//!
//! Kept wire-compatible with the `TracerState` message other Zipkin
//! propagation implementations emit. Tags are fixed; unknown fields are
//! skipped on decode, which keeps the format forward-compatible and
//! independent of field order.

/// Span context state as carried inside the length-prefixed binary
/// record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TracerState {
    #[prost(fixed64, tag = "1")]
    pub trace_id: u64,
    #[prost(fixed64, tag = "2")]
    pub span_id: u64,
    #[prost(bool, tag = "3")]
    pub sampled: bool,
    #[prost(map = "string, string", tag = "4")]
    pub baggage_items: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
    /// Zero when the span is the root of the trace; see the `IS_ROOT`
    /// flag bit.
    #[prost(fixed64, tag = "5")]
    pub parent_span_id: u64,
    #[prost(fixed64, tag = "6")]
    pub flags: u64,
}
