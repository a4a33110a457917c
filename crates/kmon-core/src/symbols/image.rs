//! Kernel ELF parsing: function symbols, layout symbols and DWARF lines.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use addr2line::Context;
use gimli::{constants, Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSymbol, SymbolKind};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use super::{DebugInfo, FunctionSymbol, SymbolTable};
use crate::error::{KmonError, Result};
use crate::layout::KERNBASE;
use crate::types::symbols::UNKNOWN_NAME;
use crate::types::{SymbolInfo, SymbolLookup, VirtAddr};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

const DWARF_SECTIONS: &[SectionId] = &[
    SectionId::DebugAbbrev,
    SectionId::DebugAddr,
    SectionId::DebugInfo,
    SectionId::DebugLine,
    SectionId::DebugLineStr,
    SectionId::DebugRanges,
    SectionId::DebugRngLists,
    SectionId::DebugStr,
    SectionId::DebugStrOffsets,
];

/// Linker-provided symbols that describe the kernel's own layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSymbols
{
    /// Physical entry point.
    pub start: u32,
    pub entry: VirtAddr,
    pub etext: VirtAddr,
    pub edata: VirtAddr,
    pub end: VirtAddr,
}

impl KernelSymbols
{
    /// Physical address of a kernel virtual address.
    pub fn physical(address: VirtAddr) -> u32
    {
        address.value().wrapping_sub(KERNBASE)
    }

    /// Size of the loaded kernel in KiB, rounded up.
    pub fn footprint_kb(&self) -> u32
    {
        let bytes = u64::from(self.end.value().wrapping_sub(self.entry.value()));
        u32::try_from(bytes.div_ceil(1024)).unwrap_or(u32::MAX)
    }
}

/// A parsed kernel image.
///
/// Function symbols come from the ELF symbol table, argument counts from the
/// DWARF subprogram entries and file/line information from the line tables.
/// The line-table context is only built on the first lookup.
pub struct KernelImage
{
    functions: SymbolTable,
    kernel_symbols: Option<KernelSymbols>,
    endian: RunTimeEndian,
    debug_sections: HashMap<&'static str, Arc<[u8]>>,
    context_cache: OnceCell<Option<Context<OwnedReader>>>,
}

impl KernelImage
{
    /// Read and parse a kernel ELF file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self>
    {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let image = Self::parse(&bytes).map_err(|err| match err {
            KmonError::Image(msg) => KmonError::Image(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        debug!(path = %path.display(), functions = image.functions.len(), "loaded kernel image");
        Ok(image)
    }

    /// Parse a kernel ELF image held in memory.
    ///
    /// ## Errors
    ///
    /// `Image` when the bytes are not an object file or a section cannot be
    /// decompressed. Missing or malformed DWARF is not an error; lookups then
    /// fall back to symbol-table information only.
    pub fn parse(bytes: &[u8]) -> Result<Self>
    {
        let file = object::File::parse(bytes).map_err(|err| KmonError::Image(format!("failed to parse: {err}")))?;

        let endian = if file.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut debug_sections = HashMap::new();
        for id in DWARF_SECTIONS {
            if let Some(data) = load_section_bytes(&file, id.name())? {
                debug_sections.insert(id.name(), data);
            }
        }

        let mut image = Self {
            functions: SymbolTable::new(),
            kernel_symbols: kernel_symbols(&file),
            endian,
            debug_sections,
            context_cache: OnceCell::new(),
        };

        let arg_counts = image.argument_counts().unwrap_or_else(|err| {
            warn!(error = %err, "ignoring unreadable DWARF subprogram entries");
            HashMap::new()
        });

        for symbol in file.symbols() {
            if symbol.kind() != SymbolKind::Text || !symbol.is_definition() {
                continue;
            }
            let (Ok(name), Ok(start)) = (symbol.name(), u32::try_from(symbol.address())) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            let size = u32::try_from(symbol.size()).unwrap_or(0);
            let arg_count = arg_counts.get(&u64::from(start)).copied().unwrap_or(0);
            image
                .functions
                .insert(FunctionSymbol::new(name, VirtAddr::new(start), size).with_arg_count(arg_count));
        }

        Ok(image)
    }

    /// Layout symbols, when the image defines all of them.
    pub fn kernel_symbols(&self) -> Option<&KernelSymbols>
    {
        self.kernel_symbols.as_ref()
    }

    pub fn functions(&self) -> &SymbolTable
    {
        &self.functions
    }

    fn section_reader(&self, id: SectionId) -> OwnedReader
    {
        let data = self
            .debug_sections
            .get(id.name())
            .cloned()
            .unwrap_or_else(|| Arc::<[u8]>::from(Vec::new()));
        EndianArcSlice::new(data, self.endian)
    }

    fn load_dwarf(&self) -> Result<Dwarf<OwnedReader>>
    {
        Dwarf::load(|section| Ok::<_, gimli::Error>(self.section_reader(section)))
            .map_err(|err| KmonError::Image(format!("failed to load DWARF: {err}")))
    }

    fn line_context(&self) -> Option<&Context<OwnedReader>>
    {
        self.context_cache
            .get_or_init(|| {
                if !self.debug_sections.contains_key(SectionId::DebugLine.name()) {
                    return None;
                }
                let context = self
                    .load_dwarf()
                    .and_then(|dwarf| {
                        Context::from_dwarf(dwarf)
                            .map_err(|err| KmonError::Image(format!("failed to build addr2line context: {err}")))
                    })
                    .inspect_err(|err| warn!(error = %err, "line information unavailable"));
                context.ok()
            })
            .as_ref()
    }

    /// Number of direct formal parameters of each DWARF subprogram, keyed by
    /// its low PC.
    fn argument_counts(&self) -> Result<HashMap<u64, u32>>
    {
        let mut counts = HashMap::new();
        if !self.debug_sections.contains_key(SectionId::DebugInfo.name()) {
            return Ok(counts);
        }

        let dwarf = self.load_dwarf()?;
        let map_err = |what: &str, err: gimli::Error| KmonError::Image(format!("{what}: {err}"));

        let mut headers = dwarf.units();
        while let Some(header) = headers.next().map_err(|err| map_err("reading unit header", err))? {
            let unit = dwarf.unit(header).map_err(|err| map_err("parsing compilation unit", err))?;
            let mut cursor = unit.entries();
            let mut depth = 0isize;
            let mut open: Option<(isize, u64)> = None;

            while let Some((delta, entry)) = cursor.next_dfs().map_err(|err| map_err("traversing DIE tree", err))? {
                depth += delta;
                if open.is_some_and(|(open_depth, _)| depth <= open_depth) {
                    open = None;
                }

                match entry.tag() {
                    constants::DW_TAG_subprogram => {
                        let Some(attr) = entry
                            .attr(constants::DW_AT_low_pc)
                            .map_err(|err| map_err("reading DW_AT_low_pc", err))?
                        else {
                            continue;
                        };
                        if let Some(low_pc) = dwarf
                            .attr_address(&unit, attr.value())
                            .map_err(|err| map_err("resolving DW_AT_low_pc", err))?
                        {
                            counts.entry(low_pc).or_insert(0);
                            open = Some((depth, low_pc));
                        }
                    }
                    constants::DW_TAG_formal_parameter => {
                        if let Some((open_depth, low_pc)) = open {
                            if depth == open_depth + 1 {
                                *counts.entry(low_pc).or_insert(0) += 1;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(counts)
    }
}

impl DebugInfo for KernelImage
{
    fn lookup(&self, address: VirtAddr) -> SymbolLookup
    {
        let Some(function) = self.functions.function_at(address) else {
            return SymbolLookup::Unresolved;
        };

        let location = self
            .line_context()
            .and_then(|ctx| ctx.find_location(u64::from(address.value())).ok().flatten());
        let (file, line) = match location {
            Some(location) => (
                location.file.unwrap_or(UNKNOWN_NAME).to_string(),
                location.line.unwrap_or(0),
            ),
            None => (UNKNOWN_NAME.to_string(), 0),
        };

        SymbolLookup::Resolved(SymbolInfo {
            file,
            line,
            function_name: function.name.clone(),
            function_start: function.start,
            declared_arg_count: function.arg_count,
        })
    }
}

fn load_section_bytes(file: &object::File<'_>, name: &str) -> Result<Option<Arc<[u8]>>>
{
    let Some(section) = file.section_by_name(name) else {
        return Ok(None);
    };
    let data = section
        .uncompressed_data()
        .map_err(|err| KmonError::Image(format!("failed to read {name}: {err}")))?;
    Ok(Some(match data {
        Cow::Borrowed(bytes) => Arc::<[u8]>::from(bytes),
        Cow::Owned(vec) => vec.into(),
    }))
}

fn kernel_symbols(file: &object::File<'_>) -> Option<KernelSymbols>
{
    let mut named: HashMap<&str, u32> = HashMap::new();
    for symbol in file.symbols() {
        if let (Ok(name), Ok(address)) = (symbol.name(), u32::try_from(symbol.address())) {
            if matches!(name, "_start" | "entry" | "etext" | "edata" | "end") {
                named.entry(name).or_insert(address);
            }
        }
    }

    let virt = |name: &str| named.get(name).copied().map(VirtAddr::new);
    let symbols = KernelSymbols {
        start: named.get("_start").copied()?,
        entry: virt("entry")?,
        etext: virt("etext")?,
        edata: virt("edata")?,
        end: virt("end")?,
    };
    Some(symbols)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_footprint_rounds_up()
    {
        let symbols = KernelSymbols {
            start: 0x0010_000c,
            entry: VirtAddr::new(0xf010_000c),
            etext: VirtAddr::new(0xf010_1a2b),
            edata: VirtAddr::new(0xf011_2300),
            end: VirtAddr::new(0xf011_2960),
        };
        // 0x12954 bytes round up to 74 KiB.
        assert_eq!(symbols.footprint_kb(), 74);
        assert_eq!(KernelSymbols::physical(symbols.entry), 0x0010_000c);
    }

    #[test]
    fn test_garbage_is_an_image_error()
    {
        assert!(matches!(KernelImage::parse(b"not an elf"), Err(KmonError::Image(_))));
    }
}
