// crates/mirrorcast-video/src/recorder.rs
//
// Background-thread packet sink that muxes the received H.264 stream to MP4
// or Matroska. Queue/thread handoff is grounded on worker.rs's
// Arc<(Mutex<...>, Condvar)> pattern (MediaWorker::frame_req, probe_sem) —
// chosen over crossbeam-channel because the wait condition here
// (`stopped ∧ queue empty`) isn't expressible with a bare channel recv.
// Muxer setup (output context, stream, codecpar-via-FFI, header/trailer) is
// grounded on encode.rs's H.264 stream construction, adapted from "encode a
// frame" to "remux an already-encoded packet" — no encoder is opened here,
// the compressed bytes pass straight through.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use ffmpeg_the_third as ffmpeg;
use ffmpeg::decoder;
use ffmpeg::util::rational::Rational;

use mirrorcast_types::{EncodedPacket, PacketSink, RecordFormat, RecorderError, VideoCodec};

/// Arbitrary duration assigned to the final recorded packet on clean
/// shutdown — no successor packet exists to infer it from.
const TAIL_DURATION_MICROS: i64 = 100_000;

/// The pipeline carries timestamps in microseconds throughout.
fn pipeline_time_base() -> Rational {
    Rational::new(1, 1_000_000)
}

#[derive(Clone)]
struct QueuedPacket {
    bytes: Vec<u8>,
    pts: Option<i64>,
    dts: Option<i64>,
    duration: Option<i64>,
}

impl QueuedPacket {
    fn from_encoded(packet: &EncodedPacket) -> Self {
        Self {
            bytes: packet.bytes.clone(),
            pts: packet.pts.micros(),
            dts: packet.dts.micros(),
            duration: None,
        }
    }
}

struct Shared {
    queue: VecDeque<QueuedPacket>,
    stopped: bool,
    failed: bool,
}

/// Packet sink that writes a muxed recording in a background thread.
pub struct RecorderSink {
    path: PathBuf,
    format: RecordFormat,
    declared_width: u32,
    declared_height: u32,
    shared: Arc<(Mutex<Shared>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl RecorderSink {
    pub fn new(path: PathBuf, format: RecordFormat, declared_width: u32, declared_height: u32) -> Self {
        Self {
            path,
            format,
            declared_width,
            declared_height,
            shared: Arc::new((
                Mutex::new(Shared { queue: VecDeque::new(), stopped: false, failed: false }),
                Condvar::new(),
            )),
            thread: None,
        }
    }

    fn open_writer(&self, codec: VideoCodec) -> anyhow::Result<RecorderWriter> {
        let mut octx = ffmpeg::format::output_as(&self.path, self.format.muxer_name()).map_err(|e| {
            anyhow::anyhow!(
                "open output '{}' as {}: {e}",
                self.path.display(),
                self.format.muxer_name()
            )
        })?;

        // No safe wrapper exposes av_dict_set on an output context's metadata
        // dictionary directly, so this follows recorder.c's
        // av_dict_set(&ctx->metadata, "comment", ..., 0) call via raw FFI.
        let comment = std::ffi::CString::new(format!(
            "Recorded by {} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ))
        .expect("comment string has no interior NUL");
        let key = std::ffi::CString::new("comment").unwrap();
        unsafe {
            ffmpeg::ffi::av_dict_set(
                &mut (*octx.as_mut_ptr()).metadata,
                key.as_ptr(),
                comment.as_ptr(),
                0,
            );
        }

        // The codec handed to add_stream is only a hint the muxer uses to
        // pre-fill stream defaults — we set codecpar ourselves below, and no
        // encoder is ever opened since we are remuxing already-compressed
        // packets, not encoding frames.
        let hint = decoder::find(codec_id(codec));
        let ost_index = {
            let ost = octx.add_stream(hint).map_err(|e| anyhow::anyhow!("add video stream: {e}"))?;
            ost.index()
        };

        unsafe {
            let stream_ptr = *(*octx.as_mut_ptr()).streams.add(ost_index);
            let codecpar = (*stream_ptr).codecpar;
            (*codecpar).codec_type = ffmpeg::ffi::AVMediaType::AVMEDIA_TYPE_VIDEO;
            (*codecpar).codec_id = raw_codec_id(codec);
            (*codecpar).format = ffmpeg::ffi::AVPixelFormat::AV_PIX_FMT_YUV420P as i32;
            (*codecpar).width = self.declared_width as i32;
            (*codecpar).height = self.declared_height as i32;
        }

        // Header writing is deferred until the first packet arrives — it
        // supplies the H.264 extradata the muxer needs (see
        // RecorderWriter::write_header).
        Ok(RecorderWriter { octx, header_written: false, ost_index, ost_time_base: None })
    }
}

impl PacketSink for RecorderSink {
    fn open(&mut self, codec: VideoCodec) -> bool {
        let writer = match self.open_writer(codec) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("[recorder] open failed: {e}");
                return false;
            }
        };

        let shared = Arc::clone(&self.shared);
        let path = self.path.clone();
        let format = self.format;
        self.thread = Some(thread::spawn(move || run_recorder_thread(shared, writer, path, format)));
        true
    }

    fn close(&mut self) {
        {
            let (mutex, condvar) = &*self.shared;
            let mut guard = mutex.lock().unwrap();
            guard.stopped = true;
            condvar.notify_one();
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn push(&mut self, packet: &EncodedPacket) -> bool {
        let (mutex, condvar) = &*self.shared;
        let mut guard = mutex.lock().unwrap();
        if guard.failed {
            return false;
        }
        guard.queue.push_back(QueuedPacket::from_encoded(packet));
        condvar.notify_one();
        true
    }
}

fn codec_id(codec: VideoCodec) -> ffmpeg::codec::Id {
    match codec {
        VideoCodec::H264 => ffmpeg::codec::Id::H264,
    }
}

fn raw_codec_id(codec: VideoCodec) -> ffmpeg::ffi::AVCodecID {
    match codec {
        VideoCodec::H264 => ffmpeg::ffi::AVCodecID::AV_CODEC_ID_H264,
    }
}

/// Owns the muxing context exclusively from the recorder thread — per
/// spec.md §5, `previous`/`header_written`/the muxing context need no lock.
struct RecorderWriter {
    octx: ffmpeg::format::context::Output,
    header_written: bool,
    ost_index: usize,
    ost_time_base: Option<Rational>,
}

impl RecorderWriter {
    fn write(&mut self, packet: &QueuedPacket) -> Result<(), RecorderError> {
        if !self.header_written {
            if packet.pts.is_some() {
                return Err(RecorderError::ProtocolViolation);
            }
            self.write_header(&packet.bytes)?;
            self.header_written = true;
            return Ok(());
        }

        let Some(pts) = packet.pts else {
            // A later config packet, if one ever arrives, is ignored.
            return Ok(());
        };
        self.write_frame(&packet.bytes, pts, packet.dts.unwrap_or(pts), packet.duration.unwrap_or(0))
    }

    fn write_header(&mut self, extradata: &[u8]) -> Result<(), RecorderError> {
        unsafe {
            let stream_ptr = *(*self.octx.as_mut_ptr()).streams.add(self.ost_index);
            let codecpar = (*stream_ptr).codecpar;
            let buf = ffmpeg::ffi::av_malloc(extradata.len()) as *mut u8;
            if buf.is_null() {
                return Err(RecorderError::Mux("could not allocate extradata".into()));
            }
            std::ptr::copy_nonoverlapping(extradata.as_ptr(), buf, extradata.len());
            (*codecpar).extradata = buf;
            (*codecpar).extradata_size = extradata.len() as i32;
        }

        self.octx
            .write_header()
            .map_err(|e| RecorderError::Mux(format!("write header: {e}")))?;

        self.ost_time_base = Some(self.octx.stream(self.ost_index).unwrap().time_base());
        Ok(())
    }

    fn write_frame(&mut self, bytes: &[u8], pts: i64, dts: i64, duration: i64) -> Result<(), RecorderError> {
        let ost_tb = self.ost_time_base.expect("header already written by this point");

        let mut pkt = ffmpeg::Packet::copy(bytes);
        pkt.set_stream(self.ost_index);
        pkt.set_pts(Some(pts));
        pkt.set_dts(Some(dts));
        pkt.set_duration(duration);
        pkt.rescale_ts(pipeline_time_base(), ost_tb);

        pkt.write_interleaved(&mut self.octx)
            .map_err(|e| RecorderError::Mux(format!("write packet: {e}")))
    }

    fn write_trailer(&mut self) -> Result<(), RecorderError> {
        self.octx
            .write_trailer()
            .map_err(|e| RecorderError::Mux(format!("write trailer: {e}")))
    }
}

fn run_recorder_thread(
    shared: Arc<(Mutex<Shared>, Condvar)>,
    mut writer: RecorderWriter,
    path: PathBuf,
    format: RecordFormat,
) {
    let (mutex, condvar) = &*shared;
    let mut previous: Option<QueuedPacket> = None;
    let mut failed = false;

    loop {
        let incoming = {
            let mut guard = mutex.lock().unwrap();
            while !guard.stopped && guard.queue.is_empty() {
                guard = condvar.wait(guard).unwrap();
            }
            if guard.stopped && guard.queue.is_empty() {
                break;
            }
            guard.queue.pop_front().expect("queue non-empty under this branch")
        };

        if let Some(mut prev) = previous.take() {
            if let (Some(prev_pts), Some(next_pts)) = (prev.pts, incoming.pts) {
                prev.duration = Some(next_pts - prev_pts);
            }
            if let Err(e) = writer.write(&prev) {
                eprintln!("[recorder] write failed: {e}");
                let mut guard = mutex.lock().unwrap();
                guard.failed = true;
                guard.queue.clear();
                failed = true;
            }
        }

        if failed {
            break;
        }
        previous = Some(incoming);
    }

    if !failed {
        if let Some(mut last) = previous.take() {
            last.duration = Some(TAIL_DURATION_MICROS);
            if let Err(e) = writer.write(&last) {
                // Not serious: no later frame depends on the tail packet, so
                // the rest of the recording is still valid.
                eprintln!("[recorder] could not write last packet: {e}");
            }
        }
    }

    if !failed {
        if writer.header_written {
            if let Err(e) = writer.write_trailer() {
                eprintln!("[recorder] trailer write failed to {}: {e}", path.display());
                failed = true;
            }
        } else {
            // No packet ever arrived to supply a header — the file is empty.
            failed = true;
        }
    }

    if failed {
        eprintln!("[recorder] recording failed to {}", path.display());
    } else {
        eprintln!("[recorder] recording complete to {} file: {}", format.muxer_name(), path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_queue_state_is_empty_and_unstopped() {
        // RecorderWriter::write is exercised end-to-end against a real muxer
        // in tests/recorder_scenarios.rs (it needs a real output context);
        // this module only covers the pure queue bookkeeping that doesn't.
        let shared = Shared { queue: VecDeque::new(), stopped: false, failed: false };
        assert!(shared.queue.is_empty());
        assert!(!shared.stopped);
        assert!(!shared.failed);
    }

    #[test]
    fn queued_packet_carries_micros_from_encoded_packet() {
        use mirrorcast_types::Timestamp;

        let encoded = EncodedPacket {
            bytes: vec![1, 2, 3],
            pts: Timestamp::from_micros(Some(1_000_000)),
            dts: Timestamp::from_micros(Some(1_000_000)),
            keyframe: true,
        };
        let queued = QueuedPacket::from_encoded(&encoded);
        assert_eq!(queued.pts, Some(1_000_000));
        assert_eq!(queued.dts, Some(1_000_000));
        assert_eq!(queued.duration, None);
        assert_eq!(queued.bytes, vec![1, 2, 3]);
    }
}
