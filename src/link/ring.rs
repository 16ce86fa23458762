//! Fixed-capacity ring of recent link traffic, for diagnostics only.

use core::fmt;

use heapless::{Deque, String};

use super::codec::RX_BUF_SIZE;

/// Lines kept before the oldest is evicted.
pub const RING_CAPACITY: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Module → controller.
    Inbound,
    /// Controller → module.
    Outbound,
    /// Local annotation (open, overflow, ...).
    Note,
}

impl Direction {
    pub fn marker(self) -> char {
        match self {
            Self::Inbound => '<',
            Self::Outbound => '>',
            Self::Note => '=',
        }
    }
}

/// One line of traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub direction: Direction,
    pub ts_ms: u64,
    pub text: String<RX_BUF_SIZE>,
}

#[derive(Default)]
pub struct TrafficRing {
    frames: Deque<LinkFrame, RING_CAPACITY>,
}

impl TrafficRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, evicting the oldest when full.  Text longer than a
    /// frame is truncated on a char boundary; a trailing newline is dropped.
    pub fn record(&mut self, direction: Direction, ts_ms: u64, text: &str) {
        let frame = LinkFrame {
            direction,
            ts_ms,
            text: truncated(text.trim_end_matches('\n')),
        };
        if self.frames.is_full() {
            self.frames.pop_front();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.frames.push_back(frame);
    }

    /// Frames oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LinkFrame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Render as `[ts] <dir> <line>`, one frame per line, oldest first.
    pub fn dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        for frame in self.frames.iter() {
            writeln!(out, "[{}] {} {}", frame.ts_ms, frame.direction.marker(), frame.text)?;
        }
        Ok(())
    }
}

fn truncated(text: &str) -> String<RX_BUF_SIZE> {
    let mut end = text.len().min(RX_BUF_SIZE);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    // Fits: end ≤ capacity.
    let _ = out.push_str(&text[..end]);
    out
}
