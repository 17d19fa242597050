// crates/mirrorcast-video/src/parser.rs
//
// H.264 Annex-B bitstream parser. ffmpeg-the-third has no safe wrapper around
// AVCodecParserContext, so — following the same convention encode.rs uses for
// avcodec_parameters_from_context — this drops to raw FFI, isolated behind a
// small type with documented unsafe blocks. Configured for complete frames
// exactly as original_source/stream.c's run_stream does.

use anyhow::{anyhow, Result};
use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, decoder, Id as CodecId};

/// One complete access unit emitted by the parser.
pub struct ParsedUnit {
    pub bytes: Vec<u8>,
    pub keyframe: bool,
}

/// Wraps an `AVCodecParserContext` configured for H.264, plus the codec
/// context the parser correlates its state against. Neither is touched by
/// more than one thread at a time in this crate (the stream engine owns it
/// exclusively), but the raw pointer inside means `Send` needs an explicit
/// unsafe impl.
pub struct NalParser {
    raw: *mut ffmpeg::ffi::AVCodecParserContext,
    codec_ctx: codec::context::Context,
}

// Safety: NalParser is only ever driven from the stream engine's single
// reader thread; ownership transfer between threads (not concurrent access)
// is all `Send` needs to guarantee here.
unsafe impl Send for NalParser {}

impl NalParser {
    pub fn new() -> Result<Self> {
        let codec = decoder::find(CodecId::H264).ok_or_else(|| anyhow!("H.264 decoder not found"))?;
        let codec_ctx = codec::context::Context::new_with_codec(codec);

        let raw = unsafe { ffmpeg::ffi::av_parser_init(ffmpeg::ffi::AVCodecID::AV_CODEC_ID_H264 as i32) };
        if raw.is_null() {
            return Err(anyhow!("av_parser_init failed for H.264"));
        }
        // We must only pass complete frames to av_parser_parse2 — the sender
        // guarantees no mid-frame splits, so this shaves a frame of latency.
        unsafe {
            (*raw).flags |= ffmpeg::ffi::AV_PARSER_FLAG_COMPLETE_FRAMES as i32;
        }

        Ok(Self { raw, codec_ctx })
    }

    /// Feed `data` through the parser, invoking `on_unit` once per complete
    /// access unit it emits. A single call can emit zero, one, or several
    /// units depending on how much of `data` the parser needed to see.
    pub fn feed(&mut self, mut data: &[u8], mut on_unit: impl FnMut(ParsedUnit)) -> Result<()> {
        while !data.is_empty() {
            let mut out_data: *mut u8 = std::ptr::null_mut();
            let mut out_len: i32 = 0;

            let consumed = unsafe {
                ffmpeg::ffi::av_parser_parse2(
                    self.raw,
                    self.codec_ctx.as_mut_ptr(),
                    &mut out_data,
                    &mut out_len,
                    data.as_ptr(),
                    data.len() as i32,
                    ffmpeg::ffi::AV_NOPTS_VALUE,
                    ffmpeg::ffi::AV_NOPTS_VALUE,
                    -1,
                )
            };

            if consumed < 0 {
                return Err(anyhow!("av_parser_parse2 failed: {consumed}"));
            }

            data = &data[consumed as usize..];

            if out_len > 0 && !out_data.is_null() {
                let bytes = unsafe { std::slice::from_raw_parts(out_data, out_len as usize) }.to_vec();
                let keyframe = unsafe { (*self.raw).key_frame == 1 };
                on_unit(ParsedUnit { bytes, keyframe });
            }

            // A parser that consumes nothing and emits nothing would spin
            // forever; this cannot happen with a conformant libavcodec parser
            // fed non-empty input, but guard against an infinite loop anyway.
            if consumed == 0 && out_len == 0 {
                break;
            }
        }
        Ok(())
    }
}

impl Drop for NalParser {
    fn drop(&mut self) {
        unsafe {
            ffmpeg::ffi::av_parser_close(self.raw);
        }
    }
}
