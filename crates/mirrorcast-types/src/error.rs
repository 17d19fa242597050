// crates/mirrorcast-types/src/error.rs
//
// Typed error for the one failure mode the spec calls out by name: a
// protocol violation where the recorder's first packet is not a config
// packet. Everything else in the recorder/decoder/stream plumbing stays on
// anyhow, matching the teacher's own convention — this enum exists only
// because "first packet is not a config packet" is a distinct, testable
// condition (spec.md §8, invariant 6 and scenario S4), not because the
// whole crate needs a typed-error overhaul.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("i/o error writing recording: {0}")]
    Io(#[from] std::io::Error),

    #[error("muxer error: {0}")]
    Mux(String),

    #[error("first packet is not a config packet")]
    ProtocolViolation,
}
