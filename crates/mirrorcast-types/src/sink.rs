// crates/mirrorcast-types/src/sink.rs
//
// The packet-sink capability: anything that wants encoded packets from the
// stream engine implements this. Modeled as a trait rather than a C-style
// vtable struct (the original `sc_packet_sink_ops`) or inheritance — see
// spec.md §9, "Polymorphic sinks".

/// The only codec this system ever resolves. Kept as an explicit enum
/// (rather than threading an ffmpeg codec id into this ffmpeg-free crate)
/// so mirrorcast-types stays free of a media-library dependency; transcoding
/// is a non-goal, so this never needs a second variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
}

/// Capability implemented by anything that receives encoded packets from the
/// stream engine: the decoder sink and the recorder sink both implement this,
/// and the engine holds zero, one, or two of them.
///
/// No exception-style control flow: every method reports success as a bool,
/// per spec.md §7. Implementations log the underlying error themselves
/// before collapsing it to `false`.
pub trait PacketSink: Send {
    /// Allocate whatever backing resources this sink needs for `codec`.
    /// Returns `false` on allocation or negotiation failure.
    fn open(&mut self, codec: VideoCodec) -> bool;

    /// Release all resources opened by `open`. Idempotent no-op if never opened.
    fn close(&mut self);

    /// Submit one packet. Returns `false` on an unrecoverable error — the
    /// caller (the stream engine) terminates the stream when this happens.
    fn push(&mut self, packet: &crate::packet::EncodedPacket) -> bool;
}
