// crates/mirrorcast-types/src/event.rs
//
// The one outbound event the core posts to its host, and the trait the host
// implements to receive it. Kept as a trait rather than a concrete channel
// type so the core has no opinion on how the host wires up its event loop —
// same reasoning as velocut-media's MediaWorker taking a Sender<MediaResult>
// rather than owning the UI's event queue directly.

/// Events the stream engine posts to its host. Exactly one variant today,
/// matching spec's "one event kind the core emits."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    /// Posted exactly once, when the stream thread terminates for any reason.
    StreamStopped,
}

/// A write-only collaborator the stream engine posts events to.
///
/// `post` must not block the stream thread for long — a typical
/// implementation forwards into a channel or posts to a host event loop.
pub trait EventSink: Send + Sync {
    fn post(&self, event: StreamEvent);
}

/// The most common case: forwarding events over a crossbeam channel to a
/// host thread, the same shape velocut-media uses for MediaResult delivery.
impl EventSink for crossbeam_channel::Sender<StreamEvent> {
    fn post(&self, event: StreamEvent) {
        // A full or disconnected channel means nobody is listening anymore;
        // the stream is tearing down regardless, so drop the event.
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn sender_event_sink_forwards_event() {
        let (tx, rx) = unbounded::<StreamEvent>();
        tx.post(StreamEvent::StreamStopped);
        assert_eq!(rx.try_recv(), Ok(StreamEvent::StreamStopped));
    }

    #[test]
    fn post_to_disconnected_receiver_does_not_panic() {
        let (tx, rx) = unbounded::<StreamEvent>();
        drop(rx);
        tx.post(StreamEvent::StreamStopped);
    }
}
