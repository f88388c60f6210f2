use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::flags::Flags;

/// Span metadata that propagates across process boundaries.
///
/// The identifiers, sampling decision, optional parent span id and flags
/// are fixed at construction; derive a new context via the `with_*`
/// methods to change them. Only baggage mutates over the lifetime of a
/// context, guarded by a per-context lock.
pub struct SpanContext {
    trace_id: u64,
    span_id: u64,
    sampled: bool,
    parent_span_id: Option<u64>,
    flags: Flags,
    baggage: Mutex<HashMap<String, String>>,
}

impl SpanContext {
    /// Create a root context with no parent, no baggage and empty flags.
    pub fn new(trace_id: u64, span_id: u64, sampled: bool) -> Self {
        SpanContext {
            trace_id,
            span_id,
            sampled,
            parent_span_id: None,
            flags: Flags::default(),
            baggage: Mutex::new(HashMap::new()),
        }
    }

    /// Derive a context with the given parent span id attached.
    pub fn with_parent(mut self, parent_span_id: u64) -> Self {
        self.parent_span_id = Some(parent_span_id);
        self
    }

    /// Derive a context with the given flags.
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Derive a context with the given baggage, replacing any existing
    /// entries.
    pub fn with_baggage(self, baggage: HashMap<String, String>) -> Self {
        SpanContext {
            baggage: Mutex::new(baggage),
            ..self
        }
    }

    /// The id shared by every span in the trace.
    pub fn trace_id(&self) -> u64 {
        self.trace_id
    }

    /// The id of the current span.
    pub fn span_id(&self) -> u64 {
        self.span_id
    }

    /// Whether spans in this trace should be recorded.
    pub fn sampled(&self) -> bool {
        self.sampled
    }

    /// The parent span id, or `None` when this span is the root of the
    /// trace.
    pub fn parent_span_id(&self) -> Option<u64> {
        self.parent_span_id
    }

    /// The feature flags communicated with this context.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// A context is valid when both identifiers are nonzero.
    pub fn is_valid(&self) -> bool {
        self.trace_id != 0 && self.span_id != 0
    }

    /// Set a baggage entry, overwriting any previous value for the key.
    pub fn set_baggage_item(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock_baggage().insert(key.into(), value.into());
    }

    /// Look up a baggage entry by key.
    pub fn baggage_item(&self, key: &str) -> Option<String> {
        self.lock_baggage().get(key).cloned()
    }

    /// Call `handler` for every baggage entry.
    ///
    /// The handler runs while the baggage lock is held; calling any
    /// baggage operation on the same context from inside it deadlocks.
    pub fn for_each_baggage_item<F>(&self, mut handler: F)
    where
        F: FnMut(&str, &str),
    {
        for (key, value) in self.lock_baggage().iter() {
            handler(key, value);
        }
    }

    /// Snapshot of the current baggage entries.
    pub fn baggage(&self) -> HashMap<String, String> {
        self.lock_baggage().clone()
    }

    fn lock_baggage(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // a poisoned baggage map is still structurally intact
        self.baggage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for SpanContext {
    fn clone(&self) -> Self {
        SpanContext {
            trace_id: self.trace_id,
            span_id: self.span_id,
            sampled: self.sampled,
            parent_span_id: self.parent_span_id,
            flags: self.flags,
            baggage: Mutex::new(self.baggage()),
        }
    }
}

impl PartialEq for SpanContext {
    fn eq(&self, other: &Self) -> bool {
        self.trace_id == other.trace_id
            && self.span_id == other.span_id
            && self.sampled == other.sampled
            && self.parent_span_id == other.parent_span_id
            && self.flags == other.flags
            && self.baggage() == other.baggage()
    }
}

impl fmt::Debug for SpanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanContext")
            .field("trace_id", &format_args!("{:x}", self.trace_id))
            .field("span_id", &format_args!("{:x}", self.span_id))
            .field("sampled", &self.sampled)
            .field("parent_span_id", &self.parent_span_id)
            .field("flags", &self.flags)
            .field("baggage", &self.baggage())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baggage_set_get_iterate() {
        let context = SpanContext::new(1, 2, true);
        assert_eq!(context.baggage_item("foo"), None);

        context.set_baggage_item("foo", "bar");
        context.set_baggage_item("foo", "baz"); // last write wins
        context.set_baggage_item("quux", "42");

        assert_eq!(context.baggage_item("foo").as_deref(), Some("baz"));

        let mut seen = Vec::new();
        context.for_each_baggage_item(|k, v| seen.push((k.to_owned(), v.to_owned())));
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("foo".to_owned(), "baz".to_owned()),
                ("quux".to_owned(), "42".to_owned()),
            ]
        );
    }

    #[test]
    fn clone_detaches_baggage() {
        let context = SpanContext::new(1, 2, true);
        context.set_baggage_item("foo", "bar");

        let cloned = context.clone();
        assert_eq!(cloned, context);

        cloned.set_baggage_item("foo", "other");
        assert_eq!(context.baggage_item("foo").as_deref(), Some("bar"));
        assert_ne!(cloned, context);
    }

    #[test]
    fn validity_requires_both_ids() {
        assert!(SpanContext::new(1, 2, false).is_valid());
        assert!(!SpanContext::new(0, 2, false).is_valid());
        assert!(!SpanContext::new(1, 0, false).is_valid());
    }

    #[test]
    fn derivation_preserves_other_fields() {
        let context = SpanContext::new(7, 8, true)
            .with_parent(3)
            .with_flags(Flags::DEBUG);

        assert_eq!(context.trace_id(), 7);
        assert_eq!(context.span_id(), 8);
        assert_eq!(context.parent_span_id(), Some(3));
        assert!(context.flags().is_debug());
        assert!(context.sampled());
    }
}
