// crates/mirrorcast-types/src/packet.rs
//
// The encoded-packet record that flows from the stream engine into both
// sinks, and the sentinel-pts newtype it carries.

/// A presentation/decode timestamp in the pipeline timebase (microseconds),
/// or the absence of one.
///
/// Wraps the wire sentinel (`u64::MAX`, all-ones on the wire) so "no pts"
/// can't be mistaken for a real 584,942-year timestamp by code that forgot
/// to check for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The wire sentinel meaning "no timestamp" — all-ones when big-endian
    /// encoded, per the meta-header format.
    pub const NO_PTS: Timestamp = Timestamp(u64::MAX);

    /// Build a `Timestamp` from the raw 64-bit value as it appears on the wire.
    ///
    /// ```
    /// use mirrorcast_types::Timestamp;
    /// assert!(!Timestamp::from_wire(u64::MAX).is_present());
    /// assert!(Timestamp::from_wire(1_000_000).is_present());
    /// ```
    pub fn from_wire(raw: u64) -> Self {
        Timestamp(raw)
    }

    /// The raw 64-bit value, suitable for re-encoding onto the wire.
    ///
    /// ```
    /// use mirrorcast_types::Timestamp;
    /// let t = Timestamp::from_wire(1_000_000);
    /// assert_eq!(Timestamp::from_wire(t.to_wire()), t);
    /// ```
    pub fn to_wire(self) -> u64 {
        self.0
    }

    pub fn is_present(self) -> bool {
        self.0 != u64::MAX
    }

    /// As a signed microsecond count, or `None` if this is the sentinel.
    pub fn micros(self) -> Option<i64> {
        self.is_present().then(|| self.0 as i64)
    }

    /// Build from a signed microsecond count; `None` becomes the sentinel.
    pub fn from_micros(v: Option<i64>) -> Self {
        match v {
            Some(us) => Timestamp(us as u64),
            None => Self::NO_PTS,
        }
    }

    /// Difference in microseconds, `self - earlier`. Both must be present.
    pub fn checked_sub(self, earlier: Timestamp) -> Option<i64> {
        match (self.micros(), earlier.micros()) {
            (Some(a), Some(b)) => Some(a - b),
            _ => None,
        }
    }
}

/// One H.264 access unit (or the leading config/extradata packet) as handed
/// from the stream engine to a sink.
///
/// The first packet of a stream is always a config packet: `pts` is absent,
/// `bytes` holds SPS/PPS extradata rather than a decodable frame.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    pub bytes: Vec<u8>,
    pub pts: Timestamp,
    pub dts: Timestamp,
    pub keyframe: bool,
}

impl EncodedPacket {
    /// A config/extradata packet carries no timestamp — `pts` is the sentinel.
    pub fn is_config(&self) -> bool {
        !self.pts.is_present()
    }
}
