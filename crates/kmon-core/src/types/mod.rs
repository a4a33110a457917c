//! # Types
//!
//! Plain data types shared across the monitor.
//!
//! These types carry no behaviour that touches the inspected machine; the
//! traits in [`crate::paging`], [`crate::memory`], [`crate::symbols`] and
//! [`crate::unwind`] produce and consume them.

pub mod address;
pub mod stack;
pub mod symbols;
pub mod trapframe;

// Re-export all public types
pub use address::{PhysAddr, VirtAddr, PAGE_SHIFT, PAGE_SIZE};
pub use stack::{StackBounds, StackFrame, FRAME_ARG_WORDS, FRAME_WORDS};
pub use symbols::{FrameLocation, SymbolInfo, SymbolLookup};
pub use trapframe::{PushRegs, TrapFrame};
