// crates/mirrorcast-video/src/frame.rs
//
// Thin newtype around an ffmpeg decoded video frame. Lives here, not in
// mirrorcast-types, because it is inherently ffmpeg-shaped — see
// velocut-media::decode::LiveDecoder for the same layering choice.

use ffmpeg_the_third as ffmpeg;

/// An owned decoded picture. The core never inspects pixels, width, height,
/// or pixel format — it only moves ownership through the video buffer.
pub struct DecodedFrame(ffmpeg::util::frame::video::Video);

impl DecodedFrame {
    pub fn new(frame: ffmpeg::util::frame::video::Video) -> Self {
        Self(frame)
    }

    /// Access the underlying ffmpeg frame, e.g. for handing to a renderer.
    pub fn as_ffmpeg(&self) -> &ffmpeg::util::frame::video::Video {
        &self.0
    }

    pub fn into_ffmpeg(self) -> ffmpeg::util::frame::video::Video {
        self.0
    }
}
