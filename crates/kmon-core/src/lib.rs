//! # kmon-core
//!
//! Inspection primitives and the command interpreter for kmon, a monitor for
//! a paused 32-bit x86 kernel.
//!
//! This crate provides:
//! - Typed addresses, stack frames and trap frames ([`types`])
//! - The fixed kernel memory layout ([`layout`])
//! - Page table walking and PTE decoding ([`paging`])
//! - Word reads by physical or virtual address ([`memory`])
//! - A bounded frame-pointer unwinder ([`unwind`])
//! - Symbol resolution from kernel ELF images ([`symbols`])
//! - The tokenizer, command registry and dispatcher ([`monitor`])
//!
//! Everything the monitor inspects is reached through a trait
//! ([`paging::AddressSpace`], [`memory::MemoryAccess`],
//! [`symbols::DebugInfo`], [`unwind::FramePointerSource`]), so a memory
//! snapshot, a live kernel or a test double can sit behind the same
//! interpreter. Nothing in this crate modifies the inspected machine.

pub mod error;
pub mod layout;
pub mod memory;
pub mod monitor;
pub mod paging;
pub mod prelude;
pub mod symbols;
pub mod types;
pub mod unwind;

// Re-export commonly used types
pub use error::{CommandError, KmonError, Result};
pub use monitor::{Monitor, MonitorConfig, Registry, Target};
pub use types::{PhysAddr, VirtAddr};
