//! # Paging
//!
//! Read-only view of a 32-bit x86 address-translation structure.
//!
//! [`AddressSpace`] is the seam between the monitor and whatever owns the
//! page tables: a live kernel, a memory snapshot ([`PageDirectory`]) or a
//! test double. The monitor only ever asks "what does this virtual page map
//! to", never changes a mapping.

mod directory;

use std::fmt;

use bitflags::bitflags;

pub use directory::PageDirectory;

use crate::types::{PhysAddr, VirtAddr, PAGE_SIZE};

bitflags! {
    /// Protection and attribute bits of a page table entry.
    ///
    /// Flags are declared in display order; [`FlagList`] relies on
    /// `iter_names` preserving it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PteFlags: u32 {
        /// Present
        const P = 1 << 0;
        /// Writable
        const W = 1 << 1;
        /// User accessible
        const U = 1 << 2;
        /// Write-through caching
        const PWT = 1 << 3;
        /// Cache disabled
        const PCD = 1 << 4;
        /// Accessed
        const A = 1 << 5;
        /// Dirty
        const D = 1 << 6;
        /// Page size (large page when set in a directory entry)
        const PS = 1 << 7;
        /// Global
        const G = 1 << 8;
    }
}

/// Low bits of an entry that hold flags rather than the frame address.
const ENTRY_FLAG_MASK: u32 = 0xfff;

/// Where one virtual page lands in physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation
{
    /// Page-aligned physical address of the frame.
    pub physical: PhysAddr,
    /// Attribute bits of the entry.
    pub flags: PteFlags,
}

impl Translation
{
    pub fn new(physical: PhysAddr, flags: PteFlags) -> Self
    {
        Self {
            physical: physical.page_down(),
            flags,
        }
    }

    /// Decode a raw 32-bit page table entry.
    ///
    /// Bits outside [`PteFlags`] (available-to-software bits 9..=11) are
    /// dropped.
    pub fn from_entry(entry: u32) -> Self
    {
        Self {
            physical: PhysAddr::new(entry & !ENTRY_FLAG_MASK),
            flags: PteFlags::from_bits_truncate(entry & ENTRY_FLAG_MASK),
        }
    }

    /// Physical page frame number.
    pub fn frame_number(&self) -> u32
    {
        self.physical.frame_number()
    }

    pub fn is_present(&self) -> bool
    {
        self.flags.contains(PteFlags::P)
    }
}

/// Comma-separated mnemonics of the set flags, e.g. `P,W,U`.
pub struct FlagList(pub PteFlags);

impl fmt::Display for FlagList
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for (i, (name, _)) in self.0.iter_names().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Read-only access to the inspected address space.
pub trait AddressSpace
{
    /// Look up the translation for the page containing `va`.
    ///
    /// Returns `None` when no translation structure covers the address. A
    /// returned translation may still lack [`PteFlags::P`].
    fn translate(&self, va: VirtAddr) -> Option<Translation>;

    /// Number of physical pages managed by the kernel.
    fn physical_page_count(&self) -> u32;
}

/// Inclusive range of pages between two virtual addresses.
///
/// Both ends are truncated to a page boundary on construction. A range whose
/// start lies above its end is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange
{
    start: VirtAddr,
    end: VirtAddr,
}

impl PageRange
{
    pub fn new(start: VirtAddr, end: VirtAddr) -> Self
    {
        Self {
            start: start.page_down(),
            end: end.page_down(),
        }
    }

    pub fn is_empty(&self) -> bool
    {
        self.start > self.end
    }

    /// Number of pages in the range.
    pub fn page_count(&self) -> u64
    {
        if self.is_empty() {
            return 0;
        }
        u64::from((self.end.value() - self.start.value()) / PAGE_SIZE) + 1
    }

    pub fn iter(&self) -> PageIter
    {
        PageIter {
            next: (!self.is_empty()).then_some(self.start),
            end: self.end,
        }
    }
}

impl IntoIterator for PageRange
{
    type Item = VirtAddr;
    type IntoIter = PageIter;

    fn into_iter(self) -> Self::IntoIter
    {
        self.iter()
    }
}

/// Iterator over the page addresses of a [`PageRange`].
///
/// Stops after the last page even when that page is the top of the address
/// space.
#[derive(Debug, Clone)]
pub struct PageIter
{
    next: Option<VirtAddr>,
    end: VirtAddr,
}

impl Iterator for PageIter
{
    type Item = VirtAddr;

    fn next(&mut self) -> Option<Self::Item>
    {
        let current = self.next?;
        self.next = current.checked_add(PAGE_SIZE).filter(|next| *next <= self.end);
        Some(current)
    }
}
