//! Loading a paused machine from disk.

use std::path::Path;

use kmon_core::memory::{read_trap_frame, PhysicalMemory, TranslatedMemory};
use kmon_core::paging::PageDirectory;
use kmon_core::symbols::KernelImage;
use kmon_core::types::{PhysAddr, TrapFrame, VirtAddr};
use kmon_core::Result;
use kmon_utils::{debug, info};

/// Files describing the machine, loaded once per run.
pub struct Snapshot
{
    pub physical: PhysicalMemory,
    pub kernel: Option<KernelImage>,
}

impl Snapshot
{
    pub fn load(memory: &Path, kernel: Option<&Path>) -> Result<Self>
    {
        let physical = PhysicalMemory::from_file(memory)?;
        info!(path = %memory.display(), pages = physical.page_count(), "loaded memory snapshot");
        let kernel = kernel.map(KernelImage::load).transpose()?;
        Ok(Self { physical, kernel })
    }

    /// Page directory rooted at `cr3`, optionally overriding the number of
    /// physical pages the kernel manages.
    pub fn page_directory(&self, cr3: u32, npages: Option<u32>) -> PageDirectory<'_>
    {
        let directory = PageDirectory::new(&self.physical, PhysAddr::new(cr3));
        let directory = match npages {
            Some(npages) => directory.with_page_count(npages),
            None => directory,
        };
        debug!(root = %directory.root(), "using page directory");
        directory
    }
}

/// Decode the trap frame saved at `va`, if one was given.
pub fn trap_frame(memory: &TranslatedMemory<'_, PageDirectory<'_>>, va: Option<u32>) -> Result<Option<TrapFrame>>
{
    let Some(va) = va else {
        return Ok(None);
    };
    let trap_frame = read_trap_frame(memory, VirtAddr::new(va))?;
    debug!(va = %VirtAddr::new(va), trapno = trap_frame.trapno, "read trap frame");
    Ok(Some(trap_frame))
}
