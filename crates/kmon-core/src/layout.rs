//! Fixed virtual memory layout of the inspected kernel.
//!
//! ```text
//!  4 Gig -------->  +------------------------------+
//!                   |  Remapped physical memory    | RW/--
//!  KERNBASE, ---->  +------------------------------+ 0xf0000000
//!  KSTACKTOP        |  CPU0's kernel stack         | RW/--  KSTKSIZE
//!                   |  Invalid memory (gap)        | --/--  KSTKGAP
//!                   |  ...                         |
//!  MMIOLIM ------>  +------------------------------+ 0xefc00000
//!                   |  Memory-mapped I/O           | RW/--  PTSIZE
//!  ULIM, MMIOBASE > +------------------------------+ 0xef800000
//!                   |  Cur. page table (user R-)   | R-/R-  PTSIZE
//!  UVPT ---------->  +------------------------------+ 0xef400000
//!                   |  RO PAGES                    | R-/R-  PTSIZE
//!  UPAGES ------->  +------------------------------+ 0xef000000
//!                   |  RO ENVS                     | R-/R-  PTSIZE
//!  UTOP, UENVS -->  +------------------------------+ 0xeec00000
//!  UXSTACKTOP -/    |  User exception stack        | RW/RW  PGSIZE
//!                   |  Empty memory                | --/--  PGSIZE
//!  USTACKTOP ---->  +------------------------------+ 0xeebfe000
//!                   |  Normal user stack           | RW/RW  PGSIZE
//!                   |  ...                         |
//!  UTEXT -------->  +------------------------------+ 0x00800000
//!  PFTEMP ------->  |  Empty memory                |
//!  UTEMP -------->  +------------------------------+ 0x00400000
//!                   |  Empty memory                |
//!  USTABDATA ---->  +------------------------------+ 0x00200000
//!                   |  Empty memory                |
//!  0 ------------>  +------------------------------+
//! ```

use crate::types::PAGE_SIZE;

/// Bytes mapped by one page directory entry.
pub const PTSIZE: u32 = PAGE_SIZE * 1024;

/// All physical memory is mapped at this address.
pub const KERNBASE: u32 = 0xf000_0000;

/// Start of the ISA I/O hole in physical memory.
pub const IOPHYSMEM: u32 = 0x000a_0000;
/// Start of extended physical memory, above the I/O hole.
pub const EXTPHYSMEM: u32 = 0x0010_0000;

/// Top of the kernel stack.
pub const KSTACKTOP: u32 = KERNBASE;
/// Size of a kernel stack.
pub const KSTKSIZE: u32 = 8 * PAGE_SIZE;
/// Size of the guard gap below a kernel stack.
pub const KSTKGAP: u32 = 8 * PAGE_SIZE;

/// End of the memory-mapped I/O region.
pub const MMIOLIM: u32 = KSTACKTOP - PTSIZE;
/// Start of the memory-mapped I/O region.
pub const MMIOBASE: u32 = MMIOLIM - PTSIZE;

/// Highest address user code may touch.
pub const ULIM: u32 = MMIOBASE;

/// Read-only mapping of the current page table (self-map window).
pub const UVPT: u32 = ULIM - PTSIZE;
/// Read-only copy of the physical page metadata array.
pub const UPAGES: u32 = UVPT - PTSIZE;
/// Read-only copy of the environment array.
pub const UENVS: u32 = UPAGES - PTSIZE;

/// Top of user-accessible memory.
pub const UTOP: u32 = UENVS;
/// Top of the user exception stack.
pub const UXSTACKTOP: u32 = UTOP;
/// Top of the normal user stack, one guard page below the exception stack.
pub const USTACKTOP: u32 = UTOP - 2 * PAGE_SIZE;

/// Where user programs are linked.
pub const UTEXT: u32 = 2 * PTSIZE;
/// Scratch window for temporary user mappings.
pub const UTEMP: u32 = UTEXT / 2;
/// Temporary page used by the user page-fault handler.
pub const PFTEMP: u32 = UTEMP + PTSIZE - PAGE_SIZE;
/// Where user-level debugging stabs are placed.
pub const USTABDATA: u32 = PTSIZE / 2;

/// A named layout constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConstant
{
    pub name: &'static str,
    pub value: u32,
}

const fn constant(name: &'static str, value: u32) -> MemoryConstant
{
    MemoryConstant { name, value }
}

/// Every constant `memconst` can resolve.
pub const MEMORY_CONSTANTS: [MemoryConstant; 19] = [
    constant("KERNBASE", KERNBASE),
    constant("IOPHYSMEM", IOPHYSMEM),
    constant("EXTPHYSMEM", EXTPHYSMEM),
    constant("KSTACKTOP", KSTACKTOP),
    constant("KSTKSIZE", KSTKSIZE),
    constant("KSTKGAP", KSTKGAP),
    constant("MMIOLIM", MMIOLIM),
    constant("MMIOBASE", MMIOBASE),
    constant("ULIM", ULIM),
    constant("UVPT", UVPT),
    constant("UPAGES", UPAGES),
    constant("UENVS", UENVS),
    constant("UTOP", UTOP),
    constant("UXSTACKTOP", UXSTACKTOP),
    constant("USTACKTOP", USTACKTOP),
    constant("UTEXT", UTEXT),
    constant("UTEMP", UTEMP),
    constant("PFTEMP", PFTEMP),
    constant("USTABDATA", USTABDATA),
];

/// Resolve a constant by exact, case-sensitive name.
pub fn lookup_constant(name: &str) -> Option<u32>
{
    MEMORY_CONSTANTS
        .iter()
        .find(|constant| constant.name == name)
        .map(|constant| constant.value)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_layout_values()
    {
        assert_eq!(MMIOLIM, 0xefc0_0000);
        assert_eq!(ULIM, 0xef80_0000);
        assert_eq!(UVPT, 0xef40_0000);
        assert_eq!(UPAGES, 0xef00_0000);
        assert_eq!(UTOP, 0xeec0_0000);
        assert_eq!(USTACKTOP, 0xeebf_e000);
        assert_eq!(UTEXT, 0x0080_0000);
        assert_eq!(UTEMP, 0x0040_0000);
        assert_eq!(PFTEMP, 0x007f_f000);
        assert_eq!(USTABDATA, 0x0020_0000);
    }

    #[test]
    fn test_lookup_is_exact()
    {
        assert_eq!(lookup_constant("KERNBASE"), Some(0xf000_0000));
        assert_eq!(lookup_constant("kernbase"), None);
        assert_eq!(lookup_constant("KERNBASE "), None);
    }

    #[test]
    fn test_names_are_unique()
    {
        for (i, a) in MEMORY_CONSTANTS.iter().enumerate() {
            for b in &MEMORY_CONSTANTS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
