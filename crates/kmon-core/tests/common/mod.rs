//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use kmon_core::error::{KmonError, Result};
use kmon_core::memory::MemoryAccess;
use kmon_core::monitor::{Monitor, MonitorConfig, Registry, ScriptedLines, SessionEnd, Target};
use kmon_core::paging::{AddressSpace, PteFlags, Translation};
use kmon_core::symbols::NoDebugInfo;
use kmon_core::types::{PhysAddr, VirtAddr};

/// Address space backed by an explicit page map.
#[derive(Debug, Default)]
pub struct MapSpace
{
    pages: BTreeMap<u32, Translation>,
    page_count: u32,
}

impl MapSpace
{
    pub fn new(page_count: u32) -> Self
    {
        Self {
            pages: BTreeMap::new(),
            page_count,
        }
    }

    pub fn map(mut self, va: u32, pa: u32, flags: PteFlags) -> Self
    {
        self.pages
            .insert(va & !0xfff, Translation::new(PhysAddr::new(pa), flags));
        self
    }
}

impl AddressSpace for MapSpace
{
    fn translate(&self, va: VirtAddr) -> Option<Translation>
    {
        self.pages.get(&va.page_down().value()).copied()
    }

    fn physical_page_count(&self) -> u32
    {
        self.page_count
    }
}

/// Sparse word-addressed memory; reads of unset words fault.
#[derive(Debug, Default)]
pub struct WordMemory
{
    words: HashMap<u32, u32>,
}

impl WordMemory
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn store(&mut self, address: u32, words: &[u32])
    {
        for (i, word) in words.iter().enumerate() {
            self.words.insert(address + 4 * i as u32, *word);
        }
    }

    /// Store one six-word frame: saved ebp, return address and four
    /// argument words.
    pub fn frame(&mut self, ebp: u32, saved_ebp: u32, eip: u32, args: [u32; 4])
    {
        self.store(ebp, &[saved_ebp, eip, args[0], args[1], args[2], args[3]]);
    }
}

impl MemoryAccess for WordMemory
{
    fn read_u32(&self, address: VirtAddr) -> Result<u32>
    {
        self.words
            .get(&address.value())
            .copied()
            .ok_or(KmonError::UnmappedAddress(address.value()))
    }
}

pub static NO_DEBUG_INFO: NoDebugInfo = NoDebugInfo;

/// Run `lines` through a standard monitor and return the console output.
pub fn run_lines(target: Target<'_>, config: MonitorConfig, lines: &[&str]) -> (String, SessionEnd)
{
    let registry = Registry::standard();
    let monitor = Monitor::new(target, &registry).with_config(config);
    let mut out = Vec::new();
    let end = monitor
        .run(&mut ScriptedLines::new(lines.iter().copied()), &mut out)
        .unwrap();
    (String::from_utf8(out).unwrap(), end)
}

/// Console output of `lines` without the banner.
pub fn output_after_banner(target: Target<'_>, config: MonitorConfig, lines: &[&str]) -> String
{
    let (out, _) = run_lines(target, config, lines);
    let banner = format!("{}\n", kmon_core::monitor::BANNER);
    out.strip_prefix(&banner).unwrap().to_string()
}
