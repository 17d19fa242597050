// crates/mirrorcast-video/src/video_buffer.rs
//
// Triple-buffered latest-wins handoff between the decoder (producer) and a
// consumer running on a different thread. Direct port of the swap logic in
// original_source/video_buffer.c — three owned slots plus a pending_consumed
// flag, one mutex protecting only the pending slot.
//
// producer_slot and consumer_slot are each touched by exactly one thread for
// the buffer's whole lifetime (the producer / the consumer, respectively) —
// that single-writer contract is the caller's responsibility, not something
// the type system enforces, which is why access to them goes through
// UnsafeCell instead of a Mutex: spec.md is explicit that this path must not
// allocate or block.

use std::cell::UnsafeCell;
use std::sync::{Mutex, OnceLock};
use std::sync::Arc;

/// Callbacks the consumer registers to learn about newly available frames.
/// Invoked from the producer thread, outside the buffer's mutex — per
/// spec.md §4.2, to avoid re-entrant deadlocks if the callback itself calls
/// back into the video buffer (e.g. `take_frame`).
pub trait ConsumerCallbacks: Send + Sync {
    /// A frame is ready and was not skipped. Must not block.
    fn on_frame_available(&self);

    /// The previous pending frame was dropped before being consumed. Must
    /// not block. Default no-op — this callback is optional per spec.md.
    fn on_frame_skipped(&self) {}

    /// Called by `VideoBuffer::interrupt`. Default no-op; a typical consumer
    /// uses this to wake a thread blocked on its own external event loop.
    fn on_interrupt(&self) {}
}

struct Pending<F> {
    slot: Option<F>,
    consumed: bool,
}

/// Three-slot latest-wins frame handoff. Generic over the frame type so the
/// swap logic itself has no media-library dependency and is testable with a
/// plain stand-in type.
pub struct VideoBuffer<F> {
    producer_slot: UnsafeCell<Option<F>>,
    consumer_slot: UnsafeCell<Option<F>>,
    pending: Mutex<Pending<F>>,
    callbacks: OnceLock<Arc<dyn ConsumerCallbacks>>,
}

// Safety: producer_slot is written only from `offer_frame` (the producer
// thread's entry point) and consumer_slot only from `take_frame` (the
// consumer thread's entry point) — by contract, never both at once. Cross-
// thread visibility of the swap is provided by the `pending` mutex that both
// paths take in between touching their own slot.
unsafe impl<F: Send> Send for VideoBuffer<F> {}
unsafe impl<F: Send> Sync for VideoBuffer<F> {}

impl<F> VideoBuffer<F> {
    pub fn new() -> Self {
        Self {
            producer_slot: UnsafeCell::new(None),
            consumer_slot: UnsafeCell::new(None),
            // No frame is pending yet — treat it as already consumed so a
            // consumer that calls take_frame before any offer hits the
            // precondition assert rather than silently returning garbage.
            pending: Mutex::new(Pending { slot: None, consumed: true }),
            callbacks: OnceLock::new(),
        }
    }

    /// Register the consumer's callback table. Must be called exactly once,
    /// before the producer offers any frame.
    pub fn set_consumer_callbacks(&self, cbs: Arc<dyn ConsumerCallbacks>) {
        assert!(
            self.callbacks.set(cbs).is_ok(),
            "set_consumer_callbacks called more than once"
        );
    }

    /// Called by the producer with a freshly decoded frame. Never blocks.
    ///
    /// Overwrites whatever was pending and unconsumed — freshness beats
    /// completeness for a live preview, per spec.md's rationale.
    pub fn offer_frame(&self, frame: F) {
        // The producer writes its own slot; no lock needed for this step
        // since only this thread ever touches producer_slot.
        unsafe {
            *self.producer_slot.get() = Some(frame);
        }

        let skipped = {
            let mut pending = self.pending.lock().unwrap();
            // Unref whatever lives in pending_slot, then swap it with what
            // the producer just wrote.
            pending.slot = None;
            unsafe {
                std::mem::swap(&mut *self.producer_slot.get(), &mut pending.slot);
            }
            let skipped = !pending.consumed;
            pending.consumed = false;
            skipped
        };

        let cbs = self
            .callbacks
            .get()
            .expect("offer_frame called before set_consumer_callbacks");
        if skipped {
            cbs.on_frame_skipped();
        } else {
            cbs.on_frame_available();
        }
    }

    /// Called by the consumer after `on_frame_available` fires. Returns a
    /// borrow of the newly consumed frame, valid until the next call to
    /// `take_frame`.
    ///
    /// # Panics
    /// Panics if called without an unconsumed pending frame — i.e. called
    /// twice for one notification, or before any notification at all. This
    /// mirrors the `assert` in the original implementation: it is a caller
    /// contract violation, not a recoverable runtime condition.
    pub fn take_frame(&self) -> &F {
        {
            let mut pending = self.pending.lock().unwrap();
            assert!(
                !pending.consumed,
                "take_frame called without a pending, unconsumed frame"
            );
            pending.consumed = true;
            unsafe {
                std::mem::swap(&mut *self.consumer_slot.get(), &mut pending.slot);
            }
            // Unref whatever is left in pending_slot (the frame the consumer
            // just displaced out of consumer_slot).
            pending.slot = None;
        }
        unsafe {
            (*self.consumer_slot.get())
                .as_ref()
                .expect("consumer_slot populated by the swap above")
        }
    }

    /// Unblocks a consumer parked on its own external wait mechanism. The
    /// buffer itself never blocks; this exists purely to let a decoder sink
    /// wake a stalled consumer during shutdown.
    pub fn interrupt(&self) {
        if let Some(cbs) = self.callbacks.get() {
            cbs.on_interrupt();
        }
    }
}

impl<F> Default for VideoBuffer<F> {
    fn default() -> Self {
        Self::new()
    }
}
