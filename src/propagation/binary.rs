//! # Binary codec
//!
//! Serializes a span context as a 4-byte big-endian length prefix
//! followed by a protobuf-encoded [`wire::TracerState`] record.
//!
//! Unlike the header format, this format always communicates the
//! sampling decision explicitly: `SAMPLING_SET` is set on every injected
//! record, and extraction always sets it on the result so a downstream
//! sampler does not re-decide.

use std::io::{self, Read, Write};

use prost::Message;

use crate::context::SpanContext;
use crate::error::PropagationError;
use crate::flags::Flags;
use crate::propagation::wire;

/// Injects and extracts span contexts through byte-stream carriers.
///
/// The wire record cannot distinguish an explicit parent span id of zero
/// from an absent one; on this format the `IS_ROOT` flag bit is the
/// authoritative root signal, and extraction always attaches a parent
/// span id (zero for roots).
#[derive(Clone, Debug, Default)]
pub struct BinaryPropagator {
    _private: (),
}

impl BinaryPropagator {
    /// Create a binary propagator.
    pub fn new() -> Self {
        BinaryPropagator::default()
    }

    /// Write `context` onto `carrier` as a length-prefixed record.
    ///
    /// Serialization and write failures propagate as
    /// [`PropagationError::Encode`] and [`PropagationError::Io`].
    pub fn inject(
        &self,
        context: &SpanContext,
        carrier: &mut dyn Write,
    ) -> Result<(), PropagationError> {
        if !context.is_valid() {
            return Err(PropagationError::InvalidSpanContext);
        }

        let mut flags = context.flags() & Flags::DEBUG;
        let parent_span_id = match context.parent_span_id() {
            Some(parent_span_id) => parent_span_id,
            None => {
                flags = flags | Flags::IS_ROOT;
                0
            }
        };
        // sampling state is always communicated explicitly downstream
        flags = flags | Flags::SAMPLING_SET;
        if context.sampled() {
            flags = flags | Flags::SAMPLED;
        }

        let state = wire::TracerState {
            trace_id: context.trace_id(),
            span_id: context.span_id(),
            sampled: context.sampled(),
            baggage_items: context.baggage(),
            parent_span_id,
            flags: flags.to_u64(),
        };

        let mut buf = Vec::with_capacity(state.encoded_len());
        state.encode(&mut buf)?;

        carrier.write_all(&(buf.len() as u32).to_be_bytes())?;
        carrier.write_all(&buf)?;
        Ok(())
    }

    /// Read a length-prefixed record from `carrier` and reconstruct the
    /// span context.
    ///
    /// A carrier that yields no bytes at all is
    /// [`PropagationError::SpanContextNotFound`]; a truncated prefix,
    /// truncated body or undecodable record is
    /// [`PropagationError::SpanContextCorrupted`]. When the `SAMPLED`
    /// flag bit is present it overrides the record's own sampled
    /// boolean.
    pub fn extract(&self, carrier: &mut dyn Read) -> Result<SpanContext, PropagationError> {
        let mut len_buf = [0u8; 4];
        match read_full(carrier, &mut len_buf)? {
            0 => return Err(PropagationError::SpanContextNotFound),
            4 => {}
            _ => return Err(PropagationError::SpanContextCorrupted),
        }
        let len = u32::from_be_bytes(len_buf) as usize;

        // reading the length up front lets us size the buffer exactly
        let mut buf = vec![0u8; len];
        if read_full(carrier, &mut buf)? < len {
            return Err(PropagationError::SpanContextCorrupted);
        }

        let state = wire::TracerState::decode(buf.as_slice()).map_err(|error| {
            tracing::warn!(%error, "undecodable binary span context record");
            PropagationError::SpanContextCorrupted
        })?;

        let mut flags = Flags::new(state.flags);
        // the sampled bit is authoritative over the record's own boolean
        let sampled = state.sampled || flags.contains(Flags::SAMPLED);
        // sampling arrives decided on this format, whatever the sender set
        flags = flags | Flags::SAMPLING_SET;

        Ok(SpanContext::new(state.trace_id, state.span_id, sampled)
            .with_parent(state.parent_span_id)
            .with_flags(flags)
            .with_baggage(state.baggage_items))
    }
}

/// Fill `buf` from `reader`, tolerating short reads. Returns how many
/// bytes were obtained before the stream ended. A hard I/O failure
/// before the first byte means the carrier held nothing readable;
/// afterwards it is indistinguishable from truncation.
fn read_full(reader: &mut dyn Read, buf: &mut [u8]) -> Result<usize, PropagationError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) if filled == 0 => return Err(PropagationError::SpanContextNotFound),
            Err(_) => return Err(PropagationError::SpanContextCorrupted),
        }
    }
    Ok(filled)
}
