//! # Delegating codec
//!
//! For transports that already hold decoded span context state, e.g.
//! in-process hops or pre-parsed message envelopes. State is copied
//! field by field between the context and the carrier; nothing is
//! serialized or parsed.

use crate::context::SpanContext;
use crate::error::PropagationError;
use crate::flags::Flags;

/// A carrier that stores span context state directly.
pub trait DelegatingCarrier {
    /// Store one baggage entry.
    fn set_baggage_item(&mut self, key: &str, value: &str);

    /// Invoke `handler` for every stored baggage entry.
    fn for_each_baggage_item(&self, handler: &mut dyn FnMut(&str, &str));

    /// Store the full state tuple.
    fn set_state(
        &mut self,
        trace_id: u64,
        span_id: u64,
        parent_span_id: Option<u64>,
        sampled: bool,
        flags: Flags,
    );

    /// Read the full state tuple back.
    fn state(&self) -> (u64, u64, Option<u64>, bool, Flags);
}

/// Copies span contexts into and out of [`DelegatingCarrier`]s.
#[derive(Clone, Debug, Default)]
pub struct DelegatingPropagator {
    _private: (),
}

impl DelegatingPropagator {
    /// Create a delegating propagator.
    pub fn new() -> Self {
        DelegatingPropagator::default()
    }

    /// Copy `context`'s state and baggage onto `carrier`.
    pub fn inject(
        &self,
        context: &SpanContext,
        carrier: &mut dyn DelegatingCarrier,
    ) -> Result<(), PropagationError> {
        if !context.is_valid() {
            return Err(PropagationError::InvalidSpanContext);
        }

        carrier.set_state(
            context.trace_id(),
            context.span_id(),
            context.parent_span_id(),
            context.sampled(),
            context.flags(),
        );
        context.for_each_baggage_item(|key, value| carrier.set_baggage_item(key, value));
        Ok(())
    }

    /// Build a new context from the state and baggage held by `carrier`.
    pub fn extract(&self, carrier: &dyn DelegatingCarrier) -> Result<SpanContext, PropagationError> {
        let (trace_id, span_id, parent_span_id, sampled, flags) = carrier.state();

        let mut context = SpanContext::new(trace_id, span_id, sampled).with_flags(flags);
        if let Some(parent_span_id) = parent_span_id {
            context = context.with_parent(parent_span_id);
        }
        carrier.for_each_baggage_item(&mut |key, value| context.set_baggage_item(key, value));
        Ok(context)
    }
}
