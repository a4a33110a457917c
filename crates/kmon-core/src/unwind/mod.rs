//! # Stack Unwinding
//!
//! Frame-pointer chain walking for 32-bit x86 code compiled with frame
//! pointers (`push %ebp; mov %esp,%ebp` prologues).
//!
//! The walk is lazy and bounded: [`FrameWalker`] yields one frame per step,
//! refuses frame pointers outside a plausible stack window, and gives up
//! after a fixed number of frames. A corrupted chain ends the walk with an
//! error item instead of running away.

use thiserror::Error;
use tracing::{trace, warn};

use crate::error::KmonError;
use crate::memory::{read_words, MemoryAccess};
use crate::types::{StackBounds, StackFrame, TrapFrame, VirtAddr, FRAME_WORDS};

/// Frames walked before the unwinder gives up.
pub const DEFAULT_MAX_FRAMES: usize = 64;

/// Source of the frame pointer the walk starts from.
pub trait FramePointerSource
{
    fn frame_pointer(&self) -> VirtAddr;
}

/// A fixed register value, e.g. one recorded in a snapshot.
impl FramePointerSource for VirtAddr
{
    fn frame_pointer(&self) -> VirtAddr
    {
        *self
    }
}

impl FramePointerSource for TrapFrame
{
    fn frame_pointer(&self) -> VirtAddr
    {
        VirtAddr::new(self.regs.ebp)
    }
}

/// Why a walk stopped before reaching a zero frame pointer.
#[derive(Error, Debug)]
pub enum UnwindError
{
    /// The frame pointer points outside the plausible stack region
    #[error("frame pointer {frame_pointer} outside stack bounds {bounds}")]
    FrameOutOfBounds
    {
        frame_pointer: VirtAddr,
        bounds: StackBounds,
    },

    /// The frame pointer is not word aligned
    #[error("frame pointer {0} is not word aligned")]
    MisalignedFrame(VirtAddr),

    /// The chain is longer than the configured frame limit
    #[error("backtrace truncated after {limit} frames")]
    DepthExceeded
    {
        limit: usize,
    },

    /// The frame could not be read
    #[error("cannot read frame at {frame_pointer}: {source}")]
    MemoryFault
    {
        frame_pointer: VirtAddr,
        #[source]
        source: KmonError,
    },
}

/// Lazy, bounded walk over a frame-pointer chain.
///
/// ## Example
///
/// ```rust
/// use kmon_core::error::Result;
/// use kmon_core::memory::MemoryAccess;
/// use kmon_core::types::VirtAddr;
/// use kmon_core::unwind::FrameWalker;
///
/// struct Empty;
///
/// impl MemoryAccess for Empty
/// {
///     fn read_u32(&self, _address: VirtAddr) -> Result<u32>
///     {
///         Ok(0)
///     }
/// }
///
/// // A zero frame pointer is an empty chain.
/// assert_eq!(FrameWalker::new(&Empty, VirtAddr::ZERO).count(), 0);
/// ```
pub struct FrameWalker<'a, M: ?Sized>
{
    memory: &'a M,
    next: VirtAddr,
    bounds: StackBounds,
    max_frames: usize,
    walked: usize,
    finished: bool,
}

impl<'a, M: MemoryAccess + ?Sized> FrameWalker<'a, M>
{
    /// Start walking at `frame_pointer` with default bounds and frame limit.
    pub fn new(memory: &'a M, frame_pointer: VirtAddr) -> Self
    {
        Self {
            memory,
            next: frame_pointer,
            bounds: StackBounds::default(),
            max_frames: DEFAULT_MAX_FRAMES,
            walked: 0,
            finished: false,
        }
    }

    #[must_use]
    pub fn with_bounds(mut self, bounds: StackBounds) -> Self
    {
        self.bounds = bounds;
        self
    }

    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self
    {
        self.max_frames = max_frames;
        self
    }

    fn step(&mut self) -> Result<StackFrame, UnwindError>
    {
        let frame_pointer = self.next;
        if self.walked >= self.max_frames {
            return Err(UnwindError::DepthExceeded { limit: self.max_frames });
        }
        if !frame_pointer.is_aligned(4) {
            return Err(UnwindError::MisalignedFrame(frame_pointer));
        }
        if !self.bounds.contains_frame(frame_pointer) {
            return Err(UnwindError::FrameOutOfBounds {
                frame_pointer,
                bounds: self.bounds,
            });
        }

        let words = read_words::<M, FRAME_WORDS>(self.memory, frame_pointer)
            .map_err(|source| UnwindError::MemoryFault { frame_pointer, source })?;
        let frame = StackFrame::from_words(frame_pointer, words);
        trace!(ebp = %frame.frame_pointer, eip = %frame.return_address, depth = self.walked, "unwound frame");

        self.next = frame.saved_frame_pointer;
        self.walked += 1;
        Ok(frame)
    }
}

impl<M: MemoryAccess + ?Sized> Iterator for FrameWalker<'_, M>
{
    type Item = Result<StackFrame, UnwindError>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.finished || self.next.is_zero() {
            self.finished = true;
            return None;
        }

        let step = self.step();
        if let Err(err) = &step {
            warn!(error = %err, "stack walk stopped");
            self.finished = true;
        }
        Some(step)
    }
}
