//! # Symbols
//!
//! Mapping instruction addresses back to functions and source lines.
//!
//! [`DebugInfo`] is what the unwinder consumes. [`SymbolTable`] is a plain
//! in-memory function index; [`KernelImage`] builds one from a kernel ELF
//! file and adds DWARF line information on top.

mod image;

pub use image::{KernelImage, KernelSymbols};

use crate::types::symbols::UNKNOWN_NAME;
use crate::types::{SymbolInfo, SymbolLookup, VirtAddr};

/// Best-effort resolver from instruction address to symbol information.
pub trait DebugInfo
{
    fn lookup(&self, address: VirtAddr) -> SymbolLookup;
}

/// Resolver that knows nothing; every lookup is unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDebugInfo;

impl DebugInfo for NoDebugInfo
{
    fn lookup(&self, _address: VirtAddr) -> SymbolLookup
    {
        SymbolLookup::Unresolved
    }
}

/// One function known to a [`SymbolTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol
{
    pub name: String,
    pub start: VirtAddr,
    /// Size in bytes; 0 means "extends to the next function".
    pub size: u32,
    pub arg_count: u32,
    /// Source file, if known without line tables.
    pub file: Option<String>,
    /// `(address, line)` pairs sorted by address.
    pub lines: Vec<(VirtAddr, u32)>,
}

impl FunctionSymbol
{
    pub fn new(name: impl Into<String>, start: VirtAddr, size: u32) -> Self
    {
        Self {
            name: name.into(),
            start,
            size,
            arg_count: 0,
            file: None,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_arg_count(mut self, arg_count: u32) -> Self
    {
        self.arg_count = arg_count;
        self
    }

    /// Attach a source file and its line table.
    #[must_use]
    pub fn with_source(mut self, file: impl Into<String>, mut lines: Vec<(VirtAddr, u32)>) -> Self
    {
        lines.sort_by_key(|(address, _)| *address);
        self.file = Some(file.into());
        self.lines = lines;
        self
    }

    fn covers(&self, address: VirtAddr, next_start: Option<VirtAddr>) -> bool
    {
        if address < self.start {
            return false;
        }
        if self.size > 0 {
            return u64::from(address.value()) < u64::from(self.start.value()) + u64::from(self.size);
        }
        next_start.is_none_or(|next| address < next)
    }

    fn line_for(&self, address: VirtAddr) -> u32
    {
        let index = self.lines.partition_point(|(line_address, _)| *line_address <= address);
        index.checked_sub(1).map_or(0, |i| self.lines[i].1)
    }
}

/// Address-sorted function index.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable
{
    functions: Vec<FunctionSymbol>,
}

impl SymbolTable
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a function, keeping the table sorted by start address.
    pub fn insert(&mut self, function: FunctionSymbol)
    {
        let index = self.functions.partition_point(|existing| existing.start <= function.start);
        self.functions.insert(index, function);
    }

    pub fn len(&self) -> usize
    {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.functions.is_empty()
    }

    /// Function containing `address`, if any.
    pub fn function_at(&self, address: VirtAddr) -> Option<&FunctionSymbol>
    {
        let index = self.functions.partition_point(|function| function.start <= address);
        let candidate = index.checked_sub(1)?;
        let function = &self.functions[candidate];
        let next_start = self.functions.get(index).map(|next| next.start);
        function.covers(address, next_start).then_some(function)
    }
}

impl FromIterator<FunctionSymbol> for SymbolTable
{
    fn from_iter<I: IntoIterator<Item = FunctionSymbol>>(iter: I) -> Self
    {
        let mut table = SymbolTable::new();
        for function in iter {
            table.insert(function);
        }
        table
    }
}

impl DebugInfo for SymbolTable
{
    fn lookup(&self, address: VirtAddr) -> SymbolLookup
    {
        let Some(function) = self.function_at(address) else {
            return SymbolLookup::Unresolved;
        };
        SymbolLookup::Resolved(SymbolInfo {
            file: function.file.clone().unwrap_or_else(|| UNKNOWN_NAME.to_string()),
            line: function.line_for(address),
            function_name: function.name.clone(),
            function_start: function.start,
            declared_arg_count: function.arg_count,
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn table() -> SymbolTable
    {
        [
            FunctionSymbol::new("i386_init", VirtAddr::new(0xf010_00a0), 0x60)
                .with_source("kern/init.c", vec![(VirtAddr::new(0xf010_00a0), 30), (VirtAddr::new(0xf010_00d0), 41)]),
            FunctionSymbol::new("test_backtrace", VirtAddr::new(0xf010_0040), 0)
                .with_arg_count(1)
                .with_source("kern/init.c", vec![(VirtAddr::new(0xf010_0040), 13)]),
            FunctionSymbol::new("mon_backtrace", VirtAddr::new(0xf010_0800), 0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_table_is_sorted_on_insert()
    {
        let table = table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.function_at(VirtAddr::new(0xf010_0041)).unwrap().name, "test_backtrace");
    }

    #[test]
    fn test_unsized_function_extends_to_next()
    {
        let table = table();
        assert_eq!(table.function_at(VirtAddr::new(0xf010_009f)).unwrap().name, "test_backtrace");
        assert_eq!(table.function_at(VirtAddr::new(0xf010_00a0)).unwrap().name, "i386_init");
    }

    #[test]
    fn test_sized_function_has_hard_end()
    {
        let table = table();
        assert!(table.function_at(VirtAddr::new(0xf010_0100)).is_none());
        assert!(table.function_at(VirtAddr::new(0xf010_0000)).is_none());
        // Last function without a size covers everything above it.
        assert_eq!(table.function_at(VirtAddr::new(0xf020_0000)).unwrap().name, "mon_backtrace");
    }

    #[test]
    fn test_lookup_fills_line_and_defaults()
    {
        let table = table();
        let hit = table.lookup(VirtAddr::new(0xf010_00d4));
        let info = hit.info().unwrap();
        assert_eq!(info.line, 41);
        assert_eq!(info.file, "kern/init.c");
        assert_eq!(info.function_start, VirtAddr::new(0xf010_00a0));

        let bare = table.lookup(VirtAddr::new(0xf010_0810));
        assert_eq!(bare.info().unwrap().file, "<unknown>");
        assert_eq!(bare.info().unwrap().line, 0);

        assert_eq!(table.lookup(VirtAddr::new(0x10)), SymbolLookup::Unresolved);
        assert_eq!(NoDebugInfo.lookup(VirtAddr::new(0xf010_0041)), SymbolLookup::Unresolved);
    }
}
