//! Stack frame types.

use std::fmt;

use super::VirtAddr;
use crate::layout;

/// Number of words captured after the return address and shown as "args".
///
/// The count is fixed and does not depend on the callee's real arity.
pub const FRAME_ARG_WORDS: usize = 4;

/// Words read per frame: saved frame pointer, return address, then the args.
pub const FRAME_WORDS: usize = 2 + FRAME_ARG_WORDS;

/// One frame of a frame-pointer chain.
///
/// The memory at `frame_pointer` is laid out as `[saved_fp, return_address,
/// arg0, arg1, arg2, arg3]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame
{
    /// Value of the frame pointer for this frame.
    pub frame_pointer: VirtAddr,
    /// Caller's saved frame pointer (word 0).
    pub saved_frame_pointer: VirtAddr,
    /// Return address into the caller (word 1).
    pub return_address: VirtAddr,
    /// The four words following the return address.
    pub args: [u32; FRAME_ARG_WORDS],
}

impl StackFrame
{
    /// Build a frame from the six words read at `frame_pointer`.
    pub fn from_words(frame_pointer: VirtAddr, words: [u32; FRAME_WORDS]) -> Self
    {
        Self {
            frame_pointer,
            saved_frame_pointer: VirtAddr::new(words[0]),
            return_address: VirtAddr::new(words[1]),
            args: [words[2], words[3], words[4], words[5]],
        }
    }
}

impl fmt::Display for StackFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(
            f,
            "ebp 0x{:08x}  eip 0x{:08x}  args 0x{:08x} 0x{:08x} 0x{:08x} 0x{:08x}",
            self.frame_pointer, self.return_address, self.args[0], self.args[1], self.args[2], self.args[3]
        )
    }
}

/// Inclusive address window a frame pointer must fall in to be followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBounds
{
    /// Lowest acceptable frame pointer.
    pub low: VirtAddr,
    /// Highest acceptable frame pointer.
    pub high: VirtAddr,
}

impl StackBounds
{
    /// Create bounds covering `low..=high`.
    pub const fn new(low: VirtAddr, high: VirtAddr) -> Self
    {
        Self { low, high }
    }

    /// Whether a whole frame starting at `frame_pointer` fits inside the bounds.
    pub fn contains_frame(&self, frame_pointer: VirtAddr) -> bool
    {
        let Some(last_word) = frame_pointer.checked_add((FRAME_WORDS as u32 - 1) * 4) else {
            return false;
        };
        frame_pointer >= self.low && last_word <= self.high
    }
}

impl Default for StackBounds
{
    /// Kernel stacks and the kernel image: from `MMIOLIM` to the top of memory.
    fn default() -> Self
    {
        Self::new(VirtAddr::new(layout::MMIOLIM), VirtAddr::new(u32::MAX))
    }
}

impl fmt::Display for StackBounds
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}
