//! # Frame Capture
//!
//! Walks the current thread's stack with `backtrace::trace` and returns raw
//! return addresses, innermost first.
//!
//! The walk starts inside this crate, so the frames belonging to the capture
//! machinery itself are discarded: everything up to and including the public
//! entry point the caller invoked, recognised by its function start address.
//! If the unwinder cannot attribute any frame to that entry point only the
//! first frame is dropped.

use tracing::trace;

use crate::types::Address;

/// Upper bound on frames belonging to the capture machinery itself.
const MAX_INTERNAL_FRAMES: usize = 32;

/// Collects raw return addresses below a given entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCapturer
{
    entry: usize,
}

impl FrameCapturer
{
    /// `entry` is the start address of the function the caller called into,
    /// e.g. `stackdump_core::capture as usize`.
    pub fn new(entry: usize) -> Self
    {
        Self { entry }
    }

    /// Capture at most `max_depth` return addresses of the caller's stack.
    ///
    /// Returns an empty vector when `max_depth` is 0 or the unwinder yields
    /// nothing.
    pub fn capture(&self, max_depth: usize) -> Vec<Address>
    {
        if max_depth == 0 {
            return Vec::new();
        }

        let limit = max_depth.saturating_add(MAX_INTERNAL_FRAMES);
        let mut raw: Vec<(usize, usize)> = Vec::new();
        backtrace::trace(|frame| {
            raw.push((frame.ip() as usize, frame.symbol_address() as usize));
            raw.len() < limit
        });

        let skip = self.frames_to_skip(&raw);
        trace!(captured = raw.len(), skip, "walked stack");
        raw.iter()
            .skip(skip)
            .take(max_depth)
            .map(|&(ip, _)| Address::from(ip as u64))
            .collect()
    }

    fn frames_to_skip(&self, raw: &[(usize, usize)]) -> usize
    {
        let internal = raw.len().min(MAX_INTERNAL_FRAMES);
        match raw[..internal]
            .iter()
            .rposition(|&(_, symbol)| symbol == self.entry)
        {
            Some(position) => position + 1,
            None => 1,
        }
    }
}
