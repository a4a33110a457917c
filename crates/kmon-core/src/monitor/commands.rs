//! Built-in command handlers.

use tracing::trace;

use super::{CommandOutcome, Session};
use crate::error::{CommandError, Ordinal, Result};
use crate::layout::lookup_constant;
use crate::paging::{FlagList, PageRange};
use crate::symbols::KernelSymbols;
use crate::types::{FrameLocation, VirtAddr};
use crate::unwind::FrameWalker;

/// Parse a number the way C's `strtol(s, &end, 0)` does, but require the
/// whole string to be consumed.
///
/// Accepts an optional sign, then `0x`/`0X` for hex, a leading `0` for octal,
/// or decimal. The magnitude must fit in 32 bits; a leading `-` wraps.
///
/// ```rust
/// use kmon_core::monitor::parse_number;
///
/// assert_eq!(parse_number("0xf0000000"), Some(0xf000_0000));
/// assert_eq!(parse_number("010"), Some(8));
/// assert_eq!(parse_number("-1"), Some(u32::MAX));
/// assert_eq!(parse_number("12abc"), None);
/// ```
pub fn parse_number(input: &str) -> Option<u32>
{
    let (negative, rest) = if let Some(rest) = input.strip_prefix('-') {
        (true, rest)
    } else {
        (false, input.strip_prefix('+').unwrap_or(input))
    };

    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = u32::from_str_radix(digits, radix).ok()?;
    Some(if negative { magnitude.wrapping_neg() } else { magnitude })
}

pub(super) fn help(_argv: &[&str], session: &mut Session<'_>) -> Result<CommandOutcome>
{
    for command in session.registry.commands() {
        writeln!(session.out, "{} - {}", command.name, command.description)?;
    }
    Ok(CommandOutcome::Continue)
}

pub(super) fn kerninfo(_argv: &[&str], session: &mut Session<'_>) -> Result<CommandOutcome>
{
    let Some(symbols) = session.target.kernel else {
        writeln!(session.out, "Special kernel symbols: unavailable (no kernel image loaded)")?;
        return Ok(CommandOutcome::Continue);
    };

    let out = &mut *session.out;
    writeln!(out, "Special kernel symbols:")?;
    writeln!(out, "  _start                  {:08x} (phys)", symbols.start)?;
    for (name, address) in [
        ("entry", symbols.entry),
        ("etext", symbols.etext),
        ("edata", symbols.edata),
        ("end", symbols.end),
    ] {
        writeln!(
            out,
            "  {name:<6} {:08x} (virt)  {:08x} (phys)",
            address.value(),
            KernelSymbols::physical(address)
        )?;
    }
    writeln!(out, "Kernel executable memory footprint: {}KB", symbols.footprint_kb())?;
    Ok(CommandOutcome::Continue)
}

pub(super) fn backtrace(_argv: &[&str], session: &mut Session<'_>) -> Result<CommandOutcome>
{
    let target = session.target;
    let walker = FrameWalker::new(target.memory, target.registers.frame_pointer())
        .with_bounds(session.config.stack_bounds)
        .with_max_frames(session.config.max_frames);

    writeln!(session.out, "Stack backtrace:")?;
    for step in walker {
        match step {
            Ok(frame) => {
                let lookup = target.debug_info.lookup(frame.return_address);
                writeln!(session.out, "{frame}")?;
                writeln!(session.out, "    {}", FrameLocation::new(&lookup, frame.return_address))?;
            }
            Err(err) => writeln!(session.out, "  backtrace stopped: {err}")?,
        }
    }
    Ok(CommandOutcome::Continue)
}

pub(super) fn pagemappings(argv: &[&str], session: &mut Session<'_>) -> Result<CommandOutcome>
{
    const NAME: &str = "pagemappings";

    let expected = match argv.len() {
        0 | 1 => Some("at least one argument"),
        2 | 3 => None,
        _ => Some("at most two arguments"),
    };
    if let Some(expected) = expected {
        return Ok(CommandOutcome::Fail(CommandError::ArgumentCount { command: NAME, expected }));
    }

    let number = |index: usize| {
        parse_number(argv[index]).map(VirtAddr::new).ok_or_else(|| CommandError::InvalidNumber {
            command: NAME,
            position: Ordinal(index),
            input: argv[index].to_string(),
        })
    };
    let start = match number(1) {
        Ok(start) => start,
        Err(err) => return Ok(CommandOutcome::Fail(err)),
    };
    let end = match argv.get(2) {
        Some(_) => match number(2) {
            Ok(end) => end,
            Err(err) => return Ok(CommandOutcome::Fail(err)),
        },
        None => start,
    };

    let space = session.target.address_space;
    let page_count = space.physical_page_count();
    for va in PageRange::new(start, end) {
        let Some(translation) = space.translate(va) else {
            trace!(va = %va, "unmapped");
            writeln!(session.out, "va {va} -> unmapped")?;
            continue;
        };
        trace!(va = %va, pa = %translation.physical, "mapped");
        write!(
            session.out,
            "va {va} -> pa {} [{}]",
            translation.physical,
            FlagList(translation.flags)
        )?;
        if translation.frame_number() >= page_count {
            write!(session.out, " (no physical memory present)")?;
        }
        writeln!(session.out)?;
    }
    Ok(CommandOutcome::Continue)
}

pub(super) fn memconst(argv: &[&str], session: &mut Session<'_>) -> Result<CommandOutcome>
{
    let [_, name] = argv else {
        return Ok(CommandOutcome::Fail(CommandError::ArgumentCount {
            command: "memconst",
            expected: "a single argument",
        }));
    };

    match lookup_constant(name) {
        Some(value) => {
            writeln!(session.out, "{name}: 0x{value:08x}")?;
            Ok(CommandOutcome::Continue)
        }
        None => Ok(CommandOutcome::Fail(CommandError::UnknownConstant((*name).to_string()))),
    }
}
