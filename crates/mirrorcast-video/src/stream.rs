// crates/mirrorcast-video/src/stream.rs
//
// The stream engine: owns the socket, splits the wire protocol, parses NAL
// units into packets, multicasts to whichever sinks are attached. Thread
// spawning/join/interrupt follows worker.rs's MediaWorker shape (own thread,
// take() the resources it needs to move in, join on shutdown); the recv/parse
// /dispatch loop itself is a direct port of original_source/stream.c's
// run_stream/stream_recv_packet/process_packet.

use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use mirrorcast_types::{EncodedPacket, EventSink, PacketSink, StreamEvent, Timestamp, VideoCodec};

use crate::frame::DecodedFrame;
use crate::parser::NalParser;
use crate::reader::{read_u32_be, read_u64_be, recv_all};
use crate::video_buffer::VideoBuffer;

/// Build a `StreamEngine::stop()` handle that wakes a consumer blocked on
/// `video_buffer`'s external notification mechanism. `decoder_interrupt`
/// exists only for this — the buffer itself never blocks.
pub fn interrupt_handle(video_buffer: Arc<VideoBuffer<DecodedFrame>>) -> Arc<dyn Fn() + Send + Sync> {
    Arc::new(move || video_buffer.interrupt())
}

struct RawPacket {
    pts: Timestamp,
    bytes: Vec<u8>,
}

fn recv_packet<R: Read>(socket: &mut R) -> anyhow::Result<RawPacket> {
    let mut header = [0u8; 12];
    recv_all(socket, &mut header)
        .map_err(|e| anyhow::anyhow!("end of stream or read error on meta-header: {e}"))?;

    let pts = Timestamp::from_wire(read_u64_be(header[0..8].try_into().unwrap()));
    let len = read_u32_be(header[8..12].try_into().unwrap());
    if len == 0 {
        return Err(anyhow::anyhow!("zero-length packet violates wire protocol"));
    }

    let mut bytes = vec![0u8; len as usize];
    recv_all(socket, &mut bytes).map_err(|e| anyhow::anyhow!("short read on payload: {e}"))?;

    Ok(RawPacket { pts, bytes })
}

/// Owns the socket and the attached sinks for the lifetime of one stream.
pub struct StreamEngine<R> {
    socket: Option<R>,
    decoder: Option<Box<dyn PacketSink>>,
    recorder: Option<Box<dyn PacketSink>>,
    event_sink: Arc<dyn EventSink>,
    interrupt: Option<Arc<dyn Fn() + Send + Sync>>,
    thread: Option<JoinHandle<()>>,
}

impl<R: Read + Send + 'static> StreamEngine<R> {
    pub fn new(
        socket: R,
        decoder: Option<Box<dyn PacketSink>>,
        recorder: Option<Box<dyn PacketSink>>,
        event_sink: Arc<dyn EventSink>,
        interrupt: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> Self {
        Self { socket: Some(socket), decoder, recorder, event_sink, interrupt, thread: None }
    }

    /// Spawn the stream thread. Panics if called more than once.
    pub fn start(&mut self) {
        let socket = self.socket.take().expect("StreamEngine::start called more than once");
        let decoder = self.decoder.take();
        let recorder = self.recorder.take();
        let event_sink = Arc::clone(&self.event_sink);
        self.thread = Some(thread::spawn(move || run_stream(socket, decoder, recorder, event_sink)));
    }

    /// Unblock a consumer parked on the video buffer. The stream thread
    /// itself terminates on its own once the socket is closed — this does
    /// not force that closure.
    pub fn stop(&self) {
        if let Some(interrupt) = &self.interrupt {
            interrupt();
        }
    }

    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run_stream<R: Read>(
    mut socket: R,
    mut decoder: Option<Box<dyn PacketSink>>,
    mut recorder: Option<Box<dyn PacketSink>>,
    event_sink: Arc<dyn EventSink>,
) {
    if let Some(sink) = decoder.as_mut() {
        if !sink.open(VideoCodec::H264) {
            eprintln!("[stream] could not open decoder sink");
            event_sink.post(StreamEvent::StreamStopped);
            return;
        }
    }

    if let Some(sink) = recorder.as_mut() {
        if !sink.open(VideoCodec::H264) {
            eprintln!("[stream] could not open recorder sink");
            if let Some(d) = decoder.as_mut() {
                d.close();
            }
            event_sink.post(StreamEvent::StreamStopped);
            return;
        }
    }

    let mut parser = match NalParser::new() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("[stream] could not init H.264 parser: {e}");
            if let Some(r) = recorder.as_mut() {
                r.close();
            }
            if let Some(d) = decoder.as_mut() {
                d.close();
            }
            event_sink.post(StreamEvent::StreamStopped);
            return;
        }
    };

    'recv: loop {
        let raw = match recv_packet(&mut socket) {
            Ok(raw) => raw,
            Err(_) => break 'recv,
        };

        let mut dispatch_failed = false;
        let feed_result = parser.feed(&raw.bytes, |unit| {
            if dispatch_failed {
                return;
            }
            let packet =
                EncodedPacket { bytes: unit.bytes, pts: raw.pts, dts: raw.pts, keyframe: unit.keyframe };

            if let Some(sink) = decoder.as_mut() {
                if !sink.push(&packet) {
                    eprintln!("[stream] decoder sink rejected packet");
                    dispatch_failed = true;
                    return;
                }
            }
            if let Some(sink) = recorder.as_mut() {
                if !sink.push(&packet) {
                    eprintln!("[stream] recorder sink rejected packet");
                    dispatch_failed = true;
                }
            }
        });

        if feed_result.is_err() || dispatch_failed {
            break 'recv;
        }
    }

    eprintln!("[stream] end of frames");
    if let Some(r) = recorder.as_mut() {
        r.close();
    }
    if let Some(d) = decoder.as_mut() {
        d.close();
    }
    event_sink.post(StreamEvent::StreamStopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Cursor;
    use std::sync::Mutex;

    fn wire_packet(pts: Option<u64>, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + payload.len());
        buf.extend_from_slice(&pts.unwrap_or(u64::MAX).to_be_bytes());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[derive(Default)]
    struct RecordingSink {
        opened: Mutex<bool>,
        pushed: Mutex<Vec<EncodedPacket>>,
        closed: Mutex<bool>,
    }

    impl PacketSink for Arc<RecordingSink> {
        fn open(&mut self, _codec: VideoCodec) -> bool {
            *self.opened.lock().unwrap() = true;
            true
        }
        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
        fn push(&mut self, packet: &EncodedPacket) -> bool {
            self.pushed.lock().unwrap().push(packet.clone());
            true
        }
    }

    /// S6-shaped: no recorder attached; a lone sink sees every dispatched
    /// packet and the engine still posts StreamStopped once the socket ends.
    #[test]
    fn stream_with_no_recorder_dispatches_to_remaining_sink_and_stops_cleanly() {
        // Not real H.264 — the parser is fed bytes it can't find a frame
        // boundary in, so it never calls back. This test exercises the wire
        // framing and shutdown path, not NAL parsing itself.
        let mut wire = Vec::new();
        wire.extend(wire_packet(None, &[0, 0, 0, 1, 0x67, 0xaa, 0xbb]));
        let socket = Cursor::new(wire);

        let sink = Arc::new(RecordingSink::default());
        let (tx, rx) = unbounded::<StreamEvent>();

        let mut engine = StreamEngine::new(socket, Some(Box::new(sink.clone())), None, Arc::new(tx), None);
        engine.start();
        engine.join();

        assert_eq!(rx.try_recv(), Ok(StreamEvent::StreamStopped));
        assert!(*sink.opened.lock().unwrap());
        assert!(*sink.closed.lock().unwrap());
    }

    #[test]
    fn zero_length_packet_terminates_the_stream() {
        let wire = wire_packet(None, &[]);
        let socket = Cursor::new(wire);
        let (tx, rx) = unbounded::<StreamEvent>();

        let mut engine = StreamEngine::<Cursor<Vec<u8>>>::new(socket, None, None, Arc::new(tx), None);
        engine.start();
        engine.join();

        assert_eq!(rx.try_recv(), Ok(StreamEvent::StreamStopped));
    }
}
