use thiserror::Error;

/// Errors returned by inject and extract operations.
///
/// These are plain return values, never used as control flow, and the
/// codecs never retry; any retry policy belongs to the transport that
/// supplies the carrier.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PropagationError {
    /// The supplied carrier does not match the selected propagation
    /// format. Programmer error, surfaced immediately.
    #[error("invalid carrier for the selected propagation format")]
    InvalidCarrier,

    /// The span context is not injectable because its trace id or span
    /// id is zero. Programmer error, surfaced immediately.
    #[error("span context has no valid trace and span ids")]
    InvalidSpanContext,

    /// The carrier holds no propagated span context at all. Benign: the
    /// correct response is to start a new root trace.
    #[error("span context not found in carrier")]
    SpanContextNotFound,

    /// The carrier holds propagation data that is malformed or
    /// incomplete. Callers should log and fall back to a fresh trace.
    #[error("span context in carrier is corrupted")]
    SpanContextCorrupted,

    /// Writing the binary representation to the carrier failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Encoding the binary state record failed.
    #[error(transparent)]
    Encode(#[from] prost::EncodeError),
}
