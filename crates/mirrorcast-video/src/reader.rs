// crates/mirrorcast-video/src/reader.rs
//
// Blocking full-read over any std::io::Read, plus big-endian scalar decoding.
// Generic over Read (not std::net::TcpStream) so it's testable against an
// in-memory Cursor<Vec<u8>> — see tests below and the integration tests in
// tests/wire_protocol.rs.

use std::io::{self, Read};

/// Read exactly `buf.len()` bytes from `r`, looping over short reads.
///
/// Returns `Ok(())` once `buf` is fully populated. Returns
/// `Err(UnexpectedEof)` if the peer closed the connection before delivering
/// all of `buf` — the stream engine treats that identically whether it
/// happened on the very first byte (clean EOF) or mid-frame (a short read);
/// both mean "end of stream" per spec.md §4.1. The two cases differ only in
/// what gets logged, which the caller does (see stream.rs's recv_packet).
pub fn recv_all<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    if filled == 0 {
                        "end of stream"
                    } else {
                        "short read: connection closed mid-frame"
                    },
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Decode a big-endian u32 from the first 4 bytes of `buf`.
pub fn read_u32_be(buf: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*buf)
}

/// Decode a big-endian u64 from the first 8 bytes of `buf`.
pub fn read_u64_be(buf: &[u8; 8]) -> u64 {
    u64::from_be_bytes(*buf)
}

/// Encode `v` as big-endian bytes. Used by tests and by anything that needs
/// to speak this wire format back (e.g. a test harness standing in for the
/// capture server).
pub fn write_u32_be(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn write_u64_be(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn recv_all_reads_exact_length() {
        let data = vec![1u8, 2, 3, 4, 5];
        let mut cur = Cursor::new(data);
        let mut buf = [0u8; 5];
        recv_all(&mut cur, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn recv_all_fails_on_clean_eof() {
        let mut cur = Cursor::new(Vec::<u8>::new());
        let mut buf = [0u8; 4];
        let err = recv_all(&mut cur, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn recv_all_fails_on_short_read_mid_frame() {
        let mut cur = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 8];
        let err = recv_all(&mut cur, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    /// A reader that yields data one byte at a time, to exercise the
    /// short-read loop rather than satisfying the whole buffer in one call.
    struct OneByteAtATime<'a>(&'a [u8]);
    impl<'a> Read for OneByteAtATime<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn recv_all_loops_over_short_reads() {
        let src = [10u8, 20, 30, 40];
        let mut r = OneByteAtATime(&src);
        let mut buf = [0u8; 4];
        recv_all(&mut r, &mut buf).unwrap();
        assert_eq!(buf, src);
    }

    #[test]
    fn u32_be_round_trips() {
        for v in [0u32, 1, 0x1234_5678, u32::MAX] {
            assert_eq!(read_u32_be(&write_u32_be(v)), v);
        }
    }

    #[test]
    fn u64_be_round_trips() {
        for v in [0u64, 1, 0x0123_4567_89ab_cdef, u64::MAX] {
            assert_eq!(read_u64_be(&write_u64_be(v)), v);
        }
    }
}
