// crates/mirrorcast-video/src/decoder.rs
//
// Packet sink that feeds compressed packets to an H.264 decoder and pushes
// decoded frames into a video buffer. Grounded on velocut-media::decode's
// send_packet/receive_frame loop, with the codec-without-a-demuxer
// construction pattern adapted from the same family of live-decode code
// (context built from a bare codec id rather than `Context::from_parameters`,
// since there is no demuxed stream here to read parameters from).

use std::sync::Arc;

use anyhow::{anyhow, Result};
use ffmpeg_the_third as ffmpeg;
use ffmpeg::codec::{self, decoder, Id as CodecId};

use mirrorcast_types::{EncodedPacket, PacketSink, VideoCodec};

use crate::frame::DecodedFrame;
use crate::video_buffer::VideoBuffer;

pub struct DecoderSink {
    decoder: Option<decoder::video::Video>,
    video_buffer: Arc<VideoBuffer<DecodedFrame>>,
}

impl DecoderSink {
    pub fn new(video_buffer: Arc<VideoBuffer<DecodedFrame>>) -> Self {
        Self { decoder: None, video_buffer }
    }

    fn open_decoder(codec: VideoCodec) -> Result<decoder::video::Video> {
        let id = codec_id(codec);
        let found = decoder::find(id).ok_or_else(|| anyhow!("no decoder registered for {id:?}"))?;
        let context = codec::context::Context::new_with_codec(found);
        context
            .decoder()
            .open()
            .map_err(|e| anyhow!("open {id:?} decoder: {e}"))?
            .video()
            .map_err(|e| anyhow!("{id:?} decoder is not a video decoder: {e}"))
    }

    fn push_inner(&mut self, packet: &EncodedPacket) -> Result<()> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| anyhow!("push called before open"))?;

        let mut av_packet = ffmpeg::Packet::copy(&packet.bytes);
        if packet.pts.is_present() {
            av_packet.set_pts(packet.pts.micros());
            av_packet.set_dts(packet.dts.micros());
        }

        match decoder.send_packet(&av_packet) {
            Ok(()) => {}
            Err(ffmpeg::Error::Other { errno: ffmpeg::error::EAGAIN }) => {
                // Decoder wants more input before it can accept this packet —
                // not an error, just "try again next push".
            }
            Err(e) => return Err(anyhow!("decoder rejected packet: {e}")),
        }

        let mut frame = ffmpeg::util::frame::video::Video::empty();
        match decoder.receive_frame(&mut frame) {
            Ok(()) => self.video_buffer.offer_frame(DecodedFrame::new(frame)),
            Err(ffmpeg::Error::Other { errno: ffmpeg::error::EAGAIN }) => {
                // No frame ready yet — the normal steady-state outcome.
            }
            Err(e) => return Err(anyhow!("decoder error receiving frame: {e}")),
        }

        Ok(())
    }
}

fn codec_id(codec: VideoCodec) -> CodecId {
    match codec {
        VideoCodec::H264 => CodecId::H264,
    }
}

impl PacketSink for DecoderSink {
    fn open(&mut self, codec: VideoCodec) -> bool {
        match Self::open_decoder(codec) {
            Ok(decoder) => {
                self.decoder = Some(decoder);
                true
            }
            Err(e) => {
                eprintln!("[decoder] open failed: {e}");
                false
            }
        }
    }

    fn close(&mut self) {
        self.decoder = None;
    }

    fn push(&mut self, packet: &EncodedPacket) -> bool {
        match self.push_inner(packet) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("[decoder] push failed: {e}");
                false
            }
        }
    }
}
