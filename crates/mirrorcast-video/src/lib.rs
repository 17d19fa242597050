// crates/mirrorcast-video/src/lib.rs

pub mod decoder;
pub mod frame;
pub mod parser;
pub mod reader;
pub mod recorder;
pub mod stream;
pub mod video_buffer;

pub use decoder::DecoderSink;
pub use frame::DecodedFrame;
pub use parser::{NalParser, ParsedUnit};
pub use recorder::RecorderSink;
pub use stream::{interrupt_handle, StreamEngine};
pub use video_buffer::{ConsumerCallbacks, VideoBuffer};
