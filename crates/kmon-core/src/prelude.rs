//! Common module for library exports

pub use crate::error::{CommandError, KmonError, Result};
pub use crate::memory::{MemoryAccess, PhysicalMemory, TranslatedMemory};
pub use crate::monitor::{
    CommandOutcome, FailurePolicy, LineSource, Monitor, MonitorConfig, Registry, SessionEnd, Target,
};
pub use crate::paging::{AddressSpace, PageDirectory, PageRange, PteFlags, Translation};
pub use crate::symbols::{DebugInfo, KernelImage, KernelSymbols, NoDebugInfo, SymbolTable};
pub use crate::types::{PhysAddr, StackBounds, StackFrame, SymbolLookup, TrapFrame, VirtAddr};
pub use crate::unwind::{FramePointerSource, FrameWalker, UnwindError};
