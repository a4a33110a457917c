//! Tests for the dispatcher, `help`, `memconst` and `kerninfo`

mod common;

use std::io::Write;

use common::{output_after_banner, run_lines, MapSpace, WordMemory, NO_DEBUG_INFO};
use kmon_core::monitor::{
    CommandOutcome, ConsoleLines, FailurePolicy, Monitor, MonitorConfig, Registry, ScriptedLines, Session, SessionEnd, Target,
};
use kmon_core::symbols::KernelSymbols;
use kmon_core::types::trapframe::TRAPFRAME_WORDS;
use kmon_core::types::{TrapFrame, VirtAddr};

struct Fixture
{
    space: MapSpace,
    memory: WordMemory,
}

impl Fixture
{
    fn new() -> Self
    {
        Self {
            space: MapSpace::new(0),
            memory: WordMemory::new(),
        }
    }

    fn target(&self) -> Target<'_>
    {
        Target::new(&self.space, &self.memory, &NO_DEBUG_INFO, &VirtAddr::ZERO)
    }
}

fn run(lines: &[&str]) -> String
{
    output_after_banner(Fixture::new().target(), MonitorConfig::default(), lines)
}

#[test]
fn test_banner_then_end_of_input()
{
    let (out, end) = run_lines(Fixture::new().target(), MonitorConfig::default(), &[]);
    assert_eq!(out, "Welcome to the kmon kernel monitor!\nType 'help' for a list of commands.\n");
    assert_eq!(end, SessionEnd::EndOfInput);
}

#[test]
fn test_help_lists_commands_in_order()
{
    assert_eq!(
        run(&["help"]),
        "help - Display this list of commands\n\
         kerninfo - Display information about the kernel\n\
         backtrace - Display a backtrace\n\
         pagemappings - Display page mappings for a range of pages\n\
         memconst - Converts a memory constant to address\n"
    );
}

#[test]
fn test_blank_lines_print_nothing()
{
    assert_eq!(run(&["", "   ", "\t\r"]), "");
}

#[test]
fn test_unknown_command_continues()
{
    assert_eq!(
        run(&["frobnicate 1 2", "HELP", "memconst UTOP"]),
        "Unknown command 'frobnicate'\nUnknown command 'HELP'\nUTOP: 0xeec00000\n"
    );
}

#[test]
fn test_too_many_arguments_continues()
{
    let line = vec!["memconst"; 16].join(" ");
    assert_eq!(run(&[&line, "memconst KERNBASE"]), "Too many arguments (max 16)\nKERNBASE: 0xf0000000\n");
}

#[test]
fn test_fifteen_arguments_reach_the_command()
{
    let line = format!("memconst{}", " x".repeat(14));
    assert_eq!(run(&[&line]), "memconst expects a single argument\n");
}

#[test]
fn test_memconst_resolves_every_constant()
{
    assert_eq!(run(&["memconst USTACKTOP"]), "USTACKTOP: 0xeebfe000\n");
    assert_eq!(run(&["memconst IOPHYSMEM"]), "IOPHYSMEM: 0x000a0000\n");
    assert_eq!(run(&["memconst USTABDATA"]), "USTABDATA: 0x00200000\n");
    assert_eq!(run(&["memconst PFTEMP"]), "PFTEMP: 0x007ff000\n");
}

#[test]
fn test_failure_terminates_by_default()
{
    let (out, end) = run_lines(Fixture::new().target(), MonitorConfig::default(), &["memconst", "memconst KERNBASE"]);
    assert!(out.ends_with("memconst expects a single argument\n"));
    assert!(!out.contains("KERNBASE"));
    assert_eq!(end, SessionEnd::Terminated);
}

#[test]
fn test_unknown_constant_with_keep_going()
{
    let config = MonitorConfig::default().with_failure_policy(FailurePolicy::Continue);
    let lines = ["memconst kernbase", "memconst a b", "memconst KERNBASE"];
    let (out, end) = run_lines(Fixture::new().target(), config, &lines);
    assert!(out.ends_with(
        "memconst: unknown memory constant 'kernbase'\n\
         memconst expects a single argument\n\
         KERNBASE: 0xf0000000\n"
    ));
    assert_eq!(end, SessionEnd::EndOfInput);
}

#[test]
fn test_kerninfo_without_image()
{
    assert_eq!(run(&["kerninfo"]), "Special kernel symbols: unavailable (no kernel image loaded)\n");
}

#[test]
fn test_kerninfo_with_symbols()
{
    let symbols = KernelSymbols {
        start: 0x0010_000c,
        entry: VirtAddr::new(0xf010_000c),
        etext: VirtAddr::new(0xf010_1a2b),
        edata: VirtAddr::new(0xf011_2300),
        end: VirtAddr::new(0xf011_2960),
    };
    let fixture = Fixture::new();
    let target = fixture.target().with_kernel(Some(&symbols));
    let out = output_after_banner(target, MonitorConfig::default(), &["kerninfo"]);
    assert_eq!(
        out,
        "Special kernel symbols:\n\
         \x20 _start                  0010000c (phys)\n\
         \x20 entry  f010000c (virt)  0010000c (phys)\n\
         \x20 etext  f0101a2b (virt)  00101a2b (phys)\n\
         \x20 edata  f0112300 (virt)  00112300 (phys)\n\
         \x20 end    f0112960 (virt)  00112960 (phys)\n\
         Kernel executable memory footprint: 74KB\n"
    );
}

#[test]
fn test_trap_frame_printed_after_banner()
{
    let mut words = [0u32; TRAPFRAME_WORDS];
    words[10] = 3;
    words[13] = 0x8;
    let trap_frame = TrapFrame::from_words(Some(VirtAddr::new(0xf011_7fbc)), words);
    let fixture = Fixture::new();
    let target = fixture.target().with_trap_frame(Some(&trap_frame));
    let out = output_after_banner(target, MonitorConfig::default(), &[]);
    assert!(out.starts_with("TRAP frame at 0xf0117fbc\n"));
    assert!(out.contains("  trap 0x00000003 Breakpoint\n"));
    assert!(out.ends_with("  flag 0x00000000\n"));
}

fn quit(_argv: &[&str], _session: &mut Session<'_>) -> kmon_core::Result<CommandOutcome>
{
    Ok(CommandOutcome::Terminate)
}

fn echo(argv: &[&str], session: &mut Session<'_>) -> kmon_core::Result<CommandOutcome>
{
    writeln!(session.out, "{}", argv[1..].join("|"))?;
    Ok(CommandOutcome::Continue)
}

#[test]
fn test_custom_registry_and_prompt()
{
    let registry = Registry::builder()
        .command("echo", "Print arguments", echo)
        .command("quit", "Leave the monitor", quit)
        .build();
    let fixture = Fixture::new();
    let monitor = Monitor::new(fixture.target(), &registry).with_config(MonitorConfig::default().with_prompt("> "));
    let mut lines = ScriptedLines::new(["echo  a\tb ", "quit", "echo unreachable"]);
    let mut out = Vec::new();
    assert_eq!(monitor.run(&mut lines, &mut out).unwrap(), SessionEnd::Terminated);
    assert_eq!(lines.remaining(), 1);
    assert_eq!(monitor.config().prompt, "> ");
    assert!(String::from_utf8(out).unwrap().ends_with("a|b\n"));
}

#[test]
fn test_invalid_utf8_line_does_not_end_session()
{
    let registry = Registry::standard();
    let fixture = Fixture::new();
    let monitor = Monitor::new(fixture.target(), &registry);
    let input: &[u8] = b"he\xfflp\nmemconst KERNBASE\n";
    let mut lines = ConsoleLines::new(input, std::io::sink());
    let mut out = Vec::new();
    assert_eq!(monitor.run(&mut lines, &mut out).unwrap(), SessionEnd::EndOfInput);
    assert!(String::from_utf8(out)
        .unwrap()
        .ends_with("Unknown command 'he\u{fffd}lp'\nKERNBASE: 0xf0000000\n"));
}
