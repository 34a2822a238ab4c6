//! Captured trace type.

use std::fmt;
use std::slice;

use super::frame::Frame;

/// An ordered, immutable sequence of frames.
///
/// Frame 0 is the immediate caller of the capture; indices are always exactly
/// `0..len` in order, whatever indices the frames carried before construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace
{
    frames: Vec<Frame>,
}

impl Trace
{
    /// Build a trace, renumbering the frames in call-stack order.
    pub fn from_frames(frames: Vec<Frame>) -> Self
    {
        let frames = frames
            .into_iter()
            .enumerate()
            .map(|(index, mut frame)| {
                frame.index = index;
                frame
            })
            .collect();
        Self { frames }
    }

    /// An empty trace, returned when capture is unavailable.
    pub fn empty() -> Self
    {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame]
    {
        &self.frames
    }

    pub fn len(&self) -> usize
    {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Frame>
    {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<Frame>
    {
        self.frames
    }
}

impl<'a> IntoIterator for &'a Trace
{
    type Item = &'a Frame;
    type IntoIter = slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter
    {
        self.frames.iter()
    }
}

impl fmt::Display for Trace
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&crate::format::render(self))
    }
}
