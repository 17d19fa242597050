// crates/mirrorcast-types/src/lib.rs
//
// Plain data shared between mirrorcast-video and whatever host embeds it.
// No ffmpeg, no sockets — just the types that cross thread/crate boundaries.

pub mod error;
pub mod event;
pub mod format;
pub mod packet;
pub mod sink;

pub use error::RecorderError;
pub use event::{EventSink, StreamEvent};
pub use format::RecordFormat;
pub use packet::{EncodedPacket, Timestamp};
pub use sink::{PacketSink, VideoCodec};
