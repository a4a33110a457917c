//! Virtual and physical address types.

use std::fmt;
use std::ops::{Add, Sub};

/// Size of one page of address translation, in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// Number of low bits that address a byte within a page.
pub const PAGE_SHIFT: u32 = 12;

/// Mask selecting the in-page offset bits.
pub const PAGE_OFFSET_MASK: u32 = PAGE_SIZE - 1;

/// Strongly typed 32-bit virtual address
///
/// Everything the monitor inspects lives in a 32-bit address space, so the
/// wrapper holds a `u32`. Keeping virtual and physical addresses in separate
/// newtypes stops a page-table walk from accidentally handing a physical
/// address to code that expects a virtual one.
///
/// ## Example
///
/// ```rust
/// use kmon_core::types::VirtAddr;
///
/// let va = VirtAddr::new(0xf010_1234);
/// assert_eq!(va.page_down(), VirtAddr::new(0xf010_1000));
/// assert_eq!(va.page_offset(), 0x234);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtAddr(u32);

impl VirtAddr
{
    /// The null address (0x0)
    ///
    /// A frame pointer with this value terminates a backtrace.
    pub const ZERO: Self = VirtAddr(0);

    /// Create a new address from a `u32` value
    pub const fn new(value: u32) -> Self
    {
        VirtAddr(value)
    }

    /// Get the raw `u32` value of this address
    pub const fn value(self) -> u32
    {
        self.0
    }

    /// Returns `true` for the null address.
    pub const fn is_zero(self) -> bool
    {
        self.0 == 0
    }

    /// Truncate the address down to the start of its page.
    #[must_use]
    pub const fn page_down(self) -> Self
    {
        VirtAddr(self.0 & !PAGE_OFFSET_MASK)
    }

    /// Byte offset of the address inside its page.
    pub const fn page_offset(self) -> u32
    {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Index into the page directory (top 10 bits).
    pub const fn directory_index(self) -> usize
    {
        (self.0 >> 22) as usize
    }

    /// Index into the page table (middle 10 bits).
    pub const fn table_index(self) -> usize
    {
        ((self.0 >> PAGE_SHIFT) & 0x3ff) as usize
    }

    /// Returns `true` if the address is aligned to `align` bytes.
    ///
    /// `align` must be a power of two.
    pub const fn is_aligned(self, align: u32) -> bool
    {
        self.0 & (align - 1) == 0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ## Example
    ///
    /// ```rust
    /// use kmon_core::types::VirtAddr;
    ///
    /// let va = VirtAddr::new(0xffff_f000);
    /// assert_eq!(va.checked_add(0x100), Some(VirtAddr::new(0xffff_f100)));
    /// assert_eq!(va.checked_add(0x1000), None);
    /// ```
    pub fn checked_add(self, offset: u32) -> Option<Self>
    {
        self.0.checked_add(offset).map(VirtAddr)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u32) -> Option<Self>
    {
        self.0.checked_sub(offset).map(VirtAddr)
    }
}

impl From<u32> for VirtAddr
{
    fn from(value: u32) -> Self
    {
        VirtAddr(value)
    }
}

impl From<VirtAddr> for u32
{
    fn from(address: VirtAddr) -> Self
    {
        address.0
    }
}

impl fmt::Display for VirtAddr
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::LowerHex for VirtAddr
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u32> for VirtAddr
{
    type Output = VirtAddr;

    fn add(self, rhs: u32) -> Self::Output
    {
        VirtAddr(self.0.wrapping_add(rhs))
    }
}

impl Sub<u32> for VirtAddr
{
    type Output = VirtAddr;

    fn sub(self, rhs: u32) -> Self::Output
    {
        VirtAddr(self.0.wrapping_sub(rhs))
    }
}

/// Strongly typed 32-bit physical address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PhysAddr(u32);

impl PhysAddr
{
    /// Create a new physical address.
    pub const fn new(value: u32) -> Self
    {
        PhysAddr(value)
    }

    /// Raw `u32` value.
    pub const fn value(self) -> u32
    {
        self.0
    }

    /// Truncate the address down to the start of its page frame.
    #[must_use]
    pub const fn page_down(self) -> Self
    {
        PhysAddr(self.0 & !PAGE_OFFSET_MASK)
    }

    /// Physical page frame number.
    pub const fn frame_number(self) -> u32
    {
        self.0 >> PAGE_SHIFT
    }

    /// Add an offset, checking for overflow.
    pub fn checked_add(self, offset: u32) -> Option<Self>
    {
        self.0.checked_add(offset).map(PhysAddr)
    }
}

impl From<u32> for PhysAddr
{
    fn from(value: u32) -> Self
    {
        PhysAddr(value)
    }
}

impl From<PhysAddr> for u32
{
    fn from(address: PhysAddr) -> Self
    {
        address.0
    }
}

impl fmt::Display for PhysAddr
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::LowerHex for PhysAddr
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
