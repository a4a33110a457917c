//! # Memory Access
//!
//! Raw reads of the inspected machine's memory.
//!
//! [`PhysicalMemory`] holds a snapshot of physical RAM. [`TranslatedMemory`]
//! layers an [`AddressSpace`] on top so callers can read by virtual address,
//! which is what the stack unwinder needs.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{KmonError, Result};
use crate::paging::AddressSpace;
use crate::types::trapframe::TRAPFRAME_WORDS;
use crate::types::{PhysAddr, TrapFrame, VirtAddr, PAGE_SIZE};

/// Memory accessor addressed by virtual address.
pub trait MemoryAccess
{
    /// Read one little-endian 32-bit word.
    fn read_u32(&self, address: VirtAddr) -> Result<u32>;
}

/// Read `N` consecutive words starting at `address`.
pub fn read_words<M, const N: usize>(memory: &M, address: VirtAddr) -> Result<[u32; N]>
where
    M: MemoryAccess + ?Sized,
{
    let mut words = [0u32; N];
    let mut cursor = address;
    for (i, word) in words.iter_mut().enumerate() {
        *word = memory.read_u32(cursor)?;
        if i + 1 < N {
            cursor = cursor
                .checked_add(4)
                .ok_or(KmonError::UnmappedAddress(address.value()))?;
        }
    }
    Ok(words)
}

/// Read and decode the trap frame stored at `address`.
pub fn read_trap_frame<M>(memory: &M, address: VirtAddr) -> Result<TrapFrame>
where
    M: MemoryAccess + ?Sized,
{
    let words = read_words::<M, TRAPFRAME_WORDS>(memory, address)?;
    Ok(TrapFrame::from_words(Some(address), words))
}

/// Snapshot of physical memory, starting at physical address 0.
#[derive(Debug, Clone, Default)]
pub struct PhysicalMemory
{
    bytes: Vec<u8>,
}

impl PhysicalMemory
{
    pub fn from_bytes(bytes: Vec<u8>) -> Self
    {
        Self { bytes }
    }

    /// Zero-filled memory holding `pages` page frames.
    pub fn zeroed(pages: u32) -> Self
    {
        Self::from_bytes(vec![0; pages as usize * PAGE_SIZE as usize])
    }

    /// Load a raw memory image from disk.
    ///
    /// ## Errors
    ///
    /// - `Io`: the file cannot be read
    /// - `InvalidArgument`: the image does not fit a 32-bit physical address space
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        if u32::try_from(bytes.len()).is_err() {
            return Err(KmonError::InvalidArgument(format!(
                "{} is larger than a 32-bit physical address space",
                path.display()
            )));
        }
        debug!(path = %path.display(), bytes = bytes.len(), "loaded physical memory image");
        Ok(Self::from_bytes(bytes))
    }

    /// Size of the image in bytes.
    pub fn len(&self) -> usize
    {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.bytes.is_empty()
    }

    /// Number of whole page frames in the image.
    pub fn page_count(&self) -> u32
    {
        u32::try_from(self.bytes.len() / PAGE_SIZE as usize).unwrap_or(u32::MAX)
    }

    /// Borrow `len` bytes starting at `address`.
    pub fn read_bytes(&self, address: PhysAddr, len: usize) -> Result<&[u8]>
    {
        let start = address.value() as usize;
        start
            .checked_add(len)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or(KmonError::PhysicalOutOfRange(address.value()))
    }

    /// Read one little-endian 32-bit word.
    pub fn read_u32(&self, address: PhysAddr) -> Result<u32>
    {
        let bytes = self.read_bytes(address, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write one little-endian 32-bit word.
    ///
    /// Only used to build snapshots; the monitor itself never writes.
    pub fn write_u32(&mut self, address: PhysAddr, value: u32) -> Result<()>
    {
        let start = address.value() as usize;
        let slot = start
            .checked_add(4)
            .and_then(|end| self.bytes.get_mut(start..end))
            .ok_or(KmonError::PhysicalOutOfRange(address.value()))?;
        slot.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

/// Virtual-address reads through an address space.
pub struct TranslatedMemory<'a, A: ?Sized>
{
    space: &'a A,
    physical: &'a PhysicalMemory,
}

impl<'a, A: AddressSpace + ?Sized> TranslatedMemory<'a, A>
{
    pub fn new(space: &'a A, physical: &'a PhysicalMemory) -> Self
    {
        Self { space, physical }
    }

    /// Physical address backing `va`, if the page is present.
    pub fn physical_address(&self, va: VirtAddr) -> Result<PhysAddr>
    {
        let translation = self
            .space
            .translate(va)
            .filter(|translation| translation.is_present())
            .ok_or(KmonError::UnmappedAddress(va.value()))?;
        translation
            .physical
            .checked_add(va.page_offset())
            .ok_or(KmonError::PhysicalOutOfRange(translation.physical.value()))
    }

    fn read_u8(&self, va: VirtAddr) -> Result<u8>
    {
        let pa = self.physical_address(va)?;
        Ok(self.physical.read_bytes(pa, 1)?[0])
    }
}

impl<A: AddressSpace + ?Sized> MemoryAccess for TranslatedMemory<'_, A>
{
    fn read_u32(&self, address: VirtAddr) -> Result<u32>
    {
        if address.page_offset() <= PAGE_SIZE - 4 {
            return self.physical.read_u32(self.physical_address(address)?);
        }

        // The word straddles two pages, each with its own translation.
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let va = address
                .checked_add(i as u32)
                .ok_or(KmonError::UnmappedAddress(address.value()))?;
            *byte = self.read_u8(va)?;
        }
        Ok(u32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::paging::{PteFlags, Translation};

    /// Maps virtual page `n` to physical page `n` for the first pages, and
    /// leaves page 2 non-present.
    struct IdentityLow;

    impl AddressSpace for IdentityLow
    {
        fn translate(&self, va: VirtAddr) -> Option<Translation>
        {
            match va.value() >> 12 {
                0 | 1 | 3 => Some(Translation::new(PhysAddr::new(va.page_down().value()), PteFlags::P)),
                2 => Some(Translation::new(PhysAddr::new(va.page_down().value()), PteFlags::empty())),
                _ => None,
            }
        }

        fn physical_page_count(&self) -> u32
        {
            4
        }
    }

    #[test]
    fn test_physical_round_trip_and_bounds()
    {
        let mut memory = PhysicalMemory::zeroed(1);
        memory.write_u32(PhysAddr::new(0x10), 0xdead_beef).unwrap();
        assert_eq!(memory.read_u32(PhysAddr::new(0x10)).unwrap(), 0xdead_beef);
        assert_eq!(memory.read_bytes(PhysAddr::new(0x10), 1).unwrap(), &[0xef]);
        assert!(matches!(
            memory.read_u32(PhysAddr::new(0xffe)),
            Err(KmonError::PhysicalOutOfRange(0xffe))
        ));
    }

    #[test]
    fn test_translated_reads_follow_mappings()
    {
        let mut physical = PhysicalMemory::zeroed(4);
        physical.write_u32(PhysAddr::new(0x1004), 7).unwrap();
        let memory = TranslatedMemory::new(&IdentityLow, &physical);
        assert_eq!(memory.read_u32(VirtAddr::new(0x1004)).unwrap(), 7);
        assert!(matches!(
            memory.read_u32(VirtAddr::new(0x2000)),
            Err(KmonError::UnmappedAddress(0x2000))
        ));
        assert!(matches!(
            memory.read_u32(VirtAddr::new(0x8000)),
            Err(KmonError::UnmappedAddress(0x8000))
        ));
    }

    #[test]
    fn test_word_straddling_pages()
    {
        let mut physical = PhysicalMemory::zeroed(4);
        physical.write_u32(PhysAddr::new(0x0ffc), 0x4433_2211).unwrap();
        physical.write_u32(PhysAddr::new(0x1000), 0x8877_6655).unwrap();
        let memory = TranslatedMemory::new(&IdentityLow, &physical);
        assert_eq!(memory.read_u32(VirtAddr::new(0x0ffe)).unwrap(), 0x6655_4433);
        // Page 2 is not present, so a word crossing into it fails.
        assert!(memory.read_u32(VirtAddr::new(0x1ffe)).is_err());
    }

    #[test]
    fn test_read_words_and_trap_frame()
    {
        let mut physical = PhysicalMemory::zeroed(4);
        for i in 0..17u32 {
            physical.write_u32(PhysAddr::new(0x3000 + i * 4), i).unwrap();
        }
        let memory = TranslatedMemory::new(&IdentityLow, &physical);
        let words = read_words::<_, 3>(&memory, VirtAddr::new(0x3000)).unwrap();
        assert_eq!(words, [0, 1, 2]);

        let tf = read_trap_frame(&memory, VirtAddr::new(0x3000)).unwrap();
        assert_eq!(tf.location, Some(VirtAddr::new(0x3000)));
        assert_eq!(tf.trapno, 10);
        assert_eq!(tf.eip, 12);
    }
}
