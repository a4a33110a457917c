//! Two-level 32-bit x86 page table walk over a physical memory snapshot.

use tracing::{trace, warn};

use super::{AddressSpace, PteFlags, Translation};
use crate::memory::PhysicalMemory;
use crate::types::{PhysAddr, VirtAddr, PAGE_SHIFT};

/// Bytes covered by a large (`PS`) page directory entry.
const LARGE_PAGE_MASK: u32 = !0x003f_ffff;

/// Page directory rooted at a physical address (the value of CR3).
pub struct PageDirectory<'a>
{
    memory: &'a PhysicalMemory,
    root: PhysAddr,
    page_count: u32,
}

impl<'a> PageDirectory<'a>
{
    /// Walk the directory at `root`; the managed page count defaults to the
    /// size of the snapshot.
    pub fn new(memory: &'a PhysicalMemory, root: PhysAddr) -> Self
    {
        Self {
            memory,
            root: root.page_down(),
            page_count: memory.page_count(),
        }
    }

    /// Override the number of physical pages the kernel manages.
    #[must_use]
    pub fn with_page_count(mut self, page_count: u32) -> Self
    {
        self.page_count = page_count;
        self
    }

    pub fn root(&self) -> PhysAddr
    {
        self.root
    }

    fn read_entry(&self, table: PhysAddr, index: usize) -> Option<u32>
    {
        let address = PhysAddr::new(table.value() + (index as u32) * 4);
        match self.memory.read_u32(address) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(table = %table, index, error = %err, "page table lies outside physical memory");
                None
            }
        }
    }
}

impl AddressSpace for PageDirectory<'_>
{
    fn translate(&self, va: VirtAddr) -> Option<Translation>
    {
        let pde = self.read_entry(self.root, va.directory_index())?;
        let directory_entry = Translation::from_entry(pde);
        if !directory_entry.is_present() {
            trace!(va = %va, pde, "no page table");
            return None;
        }

        if directory_entry.flags.contains(PteFlags::PS) {
            let base = pde & LARGE_PAGE_MASK;
            let physical = PhysAddr::new(base | ((va.table_index() as u32) << PAGE_SHIFT));
            return Some(Translation::new(physical, directory_entry.flags));
        }

        let pte = self.read_entry(directory_entry.physical, va.table_index())?;
        trace!(va = %va, pde, pte, "walked page table");
        Some(Translation::from_entry(pte))
    }

    fn physical_page_count(&self) -> u32
    {
        self.page_count
    }
}
