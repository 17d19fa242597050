// crates/mirrorcast-video/tests/recorder_scenarios.rs
//
// Scenario-level coverage for RecorderSink against a real muxer — the
// corresponding bookkeeping (QueuedPacket, Shared) already has inline unit
// tests in recorder.rs; this file exercises the parts that need an actual
// output context. Matroska is used throughout: unlike mp4, its muxer accepts
// arbitrary CodecPrivate bytes without demanding a well-formed
// AVCDecoderConfigurationRecord, so a placeholder SPS/PPS buffer is enough to
// drive the write path end to end.

use mirrorcast_types::{EncodedPacket, PacketSink, RecordFormat, Timestamp, VideoCodec};
use mirrorcast_video::RecorderSink;

fn packet(pts: Option<i64>, bytes: &[u8]) -> EncodedPacket {
    EncodedPacket {
        bytes: bytes.to_vec(),
        pts: Timestamp::from_micros(pts),
        dts: Timestamp::from_micros(pts),
        keyframe: pts.is_some(),
    }
}

/// S1/S2-shaped: a config packet followed by two timestamped packets, then a
/// clean close. Expects a playable container on disk afterward.
#[test]
fn successful_recording_produces_a_readable_container() {
    let out = tempfile::Builder::new().suffix(".mkv").tempfile().unwrap();
    let path = out.path().to_path_buf();
    let mut sink = RecorderSink::new(path.clone(), RecordFormat::Matroska, 640, 480);

    assert!(sink.open(VideoCodec::H264));
    assert!(sink.push(&packet(None, &[0, 0, 0, 1, 0x67, 0xaa, 0xbb])));
    assert!(sink.push(&packet(Some(1_000_000), &[0, 0, 0, 1, 0x65, 1, 2, 3])));
    assert!(sink.push(&packet(Some(1_040_000), &[0, 0, 0, 1, 0x41, 4, 5, 6])));
    sink.close();

    let metadata = std::fs::metadata(&path).expect("recording file was written");
    assert!(metadata.len() > 0, "recording file must not be empty");

    let ictx = ffmpeg_the_third::format::input(&path).expect("container must be demuxable after close");
    assert_eq!(ictx.streams().count(), 1);
}

/// S4. A non-config first packet makes the recorder fail, drains its queue,
/// and rejects every later push — all observable synchronously once `close`
/// has joined the recorder thread.
#[test]
fn non_config_first_packet_fails_the_recording() {
    let out = tempfile::Builder::new().suffix(".mkv").tempfile().unwrap();
    let mut sink = RecorderSink::new(out.path().to_path_buf(), RecordFormat::Matroska, 640, 480);

    assert!(sink.open(VideoCodec::H264));
    // Two pushes are required to force the carry-slot write of the first
    // packet: the very first dequeue always just fills the carry slot, the
    // second dequeue is what triggers `write(previous)`.
    assert!(sink.push(&packet(Some(1_000_000), &[0, 0, 0, 1, 0x65, 1, 2, 3])));
    assert!(sink.push(&packet(Some(1_040_000), &[0, 0, 0, 1, 0x41, 4, 5, 6])));
    sink.close();

    assert!(!sink.push(&packet(Some(1_080_000), &[0, 0, 0, 1, 0x41, 7, 8, 9])));
}

/// S5-shaped: socket EOF with no trailing config packet still drains the
/// carry slot and finalizes the container instead of losing the last frame.
#[test]
fn mid_stream_close_drains_the_carry_slot() {
    let out = tempfile::Builder::new().suffix(".mkv").tempfile().unwrap();
    let path = out.path().to_path_buf();
    let mut sink = RecorderSink::new(path.clone(), RecordFormat::Matroska, 320, 240);

    assert!(sink.open(VideoCodec::H264));
    assert!(sink.push(&packet(None, &[0, 0, 0, 1, 0x67, 0xaa, 0xbb])));
    assert!(sink.push(&packet(Some(2_000_000), &[0, 0, 0, 1, 0x65, 9, 9, 9])));
    sink.close();

    let metadata = std::fs::metadata(&path).expect("recording file was written");
    assert!(metadata.len() > 0);
}
