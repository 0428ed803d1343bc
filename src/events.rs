//! Event queue between callback contexts and the main loop.
//!
//! The esp_timer sampling callbacks and the BLE stack's connection
//! events produce; the main loop is the sole consumer, reacting to one
//! event at a time (sample-and-indicate, advertising restart).
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer task   │────▶│              │     │              │
//! │ BLE callback │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Sim ticks    │────▶│  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Queue capacity; a power of 2 so the ring index wraps cheaply.
const EVENT_QUEUE_CAP: usize = 32;

/// System event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    // ── Sampling cadence ──────────────────────────────────
    /// Heart-rate sample timer fired (1 Hz).
    HeartRateTick    = 10,
    /// Environment sample timer fired (0.5 Hz).
    EnvSampleTick    = 11,

    // ── Connection lifecycle ──────────────────────────────
    /// A central connected.
    BleConnected     = 30,
    /// A central disconnected; advertising restarts.
    BleDisconnected  = 31,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Callbacks produce, the main loop consumes. Head and tail are
// atomics; the buffer sits in a static so callback contexts can
// reach it without a heap or a lock.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER is written only by the producer side (push_event,
// callback context) at slots the consumer has not yet claimed, and read
// only by the consumer side (pop_event, main loop). The Acquire/Release
// pairs on head/tail enforce the SPSC discipline.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Queue an event from a producer context. Lock-free and ISR-safe.
/// A full queue drops the event and reports `false`.
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // full; dropped
    }

    // SAFETY: Only one producer (callbacks run on the timer task), and
    // the slot at `head` is unclaimed until the Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Take the oldest pending event, if any. Consumer side only — the
/// main loop is the one caller.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None;
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Feed every pending event to `handler`, oldest first.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// True when nothing is pending.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

/// Count of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        10 => Some(Event::HeartRateTick),
        11 => Some(Event::EnvSampleTick),
        30 => Some(Event::BleConnected),
        31 => Some(Event::BleDisconnected),
        _  => None,
    }
}
