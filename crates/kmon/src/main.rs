use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use kmon_core::memory::TranslatedMemory;
use kmon_core::monitor::{
    parse_number, ConsoleLines, FailurePolicy, Monitor, MonitorConfig, Registry, ScriptedLines, Target,
};
use kmon_core::symbols::{DebugInfo, KernelImage, NoDebugInfo};
use kmon_core::types::{StackBounds, TrapFrame, VirtAddr};
use kmon_core::unwind::{FramePointerSource, DEFAULT_MAX_FRAMES};
use kmon_core::Result as KmonResult;
use kmon_utils::{info, init_logging, init_logging_with_format, init_logging_with_level, warn, LogFormat, LogLevel};

mod snapshot;

use snapshot::Snapshot;

/// An interactive monitor for a paused 32-bit x86 kernel.
#[derive(Parser, Debug)]
#[command(name = "kmon")]
#[command(version)]
#[command(about = "An interactive monitor for inspecting paused 32-bit x86 kernels", long_about = None)]
struct Cli
{
    /// Raw physical memory image, starting at physical address 0
    #[arg(short, long)]
    memory: PathBuf,

    /// Physical address of the page directory (the value of CR3)
    #[arg(long, value_parser = parse_address)]
    cr3: u32,

    /// Frame pointer to start backtraces from (defaults to the ebp of a
    /// kernel-mode trap frame; a user-mode ebp also needs --stack-low/--stack-high)
    #[arg(long, value_parser = parse_address)]
    ebp: Option<u32>,

    /// Kernel ELF image for symbols and `kerninfo`
    #[arg(short, long)]
    kernel: Option<PathBuf>,

    /// Virtual address of a saved trap frame inside the snapshot
    #[arg(long, value_parser = parse_address)]
    trapframe: Option<u32>,

    /// Number of physical pages the kernel manages (default: image size / 4096)
    #[arg(long, value_parser = parse_address)]
    npages: Option<u32>,

    /// Frames walked by `backtrace` before it gives up
    #[arg(long, default_value_t = DEFAULT_MAX_FRAMES)]
    max_frames: usize,

    /// Lowest frame pointer the unwinder accepts
    #[arg(long, value_parser = parse_address)]
    stack_low: Option<u32>,

    /// Highest frame pointer the unwinder accepts
    #[arg(long, value_parser = parse_address)]
    stack_high: Option<u32>,

    /// Keep reading commands after one fails instead of leaving the monitor
    #[arg(long, default_value_t = false)]
    keep_going: bool,

    /// Run these lines instead of reading from stdin (repeatable)
    #[arg(short = 'c', long = "command")]
    commands: Vec<String>,

    /// Log level (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Log format: pretty or json (overrides KMON_LOG_FORMAT)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

fn parse_address(input: &str) -> Result<u32, String>
{
    parse_number(input).ok_or_else(|| format!("expecting a 32-bit number, could not parse '{input}'"))
}

fn main()
{
    let cli = Cli::parse();

    let logging = match (cli.log_level, cli.log_format) {
        (Some(level), format) => init_logging_with_level(level, format.unwrap_or_default()),
        (None, Some(format)) => init_logging_with_format(format),
        (None, None) => init_logging(),
    };
    let guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };
    if let Some(path) = guard.log_file() {
        info!(path = %path.display(), "writing log file");
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn monitor_config(cli: &Cli) -> MonitorConfig
{
    let defaults = StackBounds::default();
    let bounds = StackBounds::new(
        cli.stack_low.map_or(defaults.low, VirtAddr::new),
        cli.stack_high.map_or(defaults.high, VirtAddr::new),
    );
    let policy = if cli.keep_going {
        FailurePolicy::Continue
    } else {
        FailurePolicy::Terminate
    };
    MonitorConfig::default()
        .with_max_frames(cli.max_frames)
        .with_stack_bounds(bounds)
        .with_failure_policy(policy)
}

/// Where `backtrace` starts: `--ebp`, else the ebp saved by a kernel-mode
/// trap, else nowhere.
fn initial_frame_pointer(ebp: Option<u32>, trap_frame: Option<&TrapFrame>) -> VirtAddr
{
    match (ebp, trap_frame) {
        (Some(ebp), _) => VirtAddr::new(ebp),
        (None, Some(trap_frame)) if trap_frame.from_user_mode() => {
            warn!("trap frame is from user mode; pass --ebp with --stack-low/--stack-high to walk the user stack");
            VirtAddr::ZERO
        }
        (None, Some(trap_frame)) => trap_frame.frame_pointer(),
        (None, None) => {
            warn!("no --ebp or --trapframe given; backtraces will be empty");
            VirtAddr::ZERO
        }
    }
}

fn run(cli: &Cli) -> KmonResult<()>
{
    let snapshot = Snapshot::load(&cli.memory, cli.kernel.as_deref())?;
    let directory = snapshot.page_directory(cli.cr3, cli.npages);
    let memory = TranslatedMemory::new(&directory, &snapshot.physical);
    let trap_frame = snapshot::trap_frame(&memory, cli.trapframe)?;

    let ebp = initial_frame_pointer(cli.ebp, trap_frame.as_ref());

    let debug_info: &dyn DebugInfo = match &snapshot.kernel {
        Some(kernel) => kernel,
        None => &NoDebugInfo,
    };
    let target = Target::new(&directory, &memory, debug_info, &ebp)
        .with_kernel(snapshot.kernel.as_ref().and_then(KernelImage::kernel_symbols))
        .with_trap_frame(trap_frame.as_ref());

    let registry = Registry::standard();
    let monitor = Monitor::new(target, &registry).with_config(monitor_config(cli));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let end = if cli.commands.is_empty() {
        let stdin = io::stdin();
        monitor.run(&mut ConsoleLines::new(stdin.lock(), io::stdout()), &mut out)?
    } else {
        monitor.run(&mut ScriptedLines::new(cli.commands.iter().cloned()), &mut out)?
    };
    info!(?end, "monitor session ended");
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_cli_parses_addresses()
    {
        let cli = Cli::try_parse_from([
            "kmon",
            "--memory",
            "mem.img",
            "--cr3",
            "0x117000",
            "--ebp",
            "0xf0117f58",
            "--npages",
            "32768",
            "-c",
            "backtrace",
            "-c",
            "memconst KERNBASE",
        ])
        .unwrap();
        assert_eq!(cli.cr3, 0x0011_7000);
        assert_eq!(cli.ebp, Some(0xf011_7f58));
        assert_eq!(cli.npages, Some(32768));
        assert_eq!(cli.max_frames, DEFAULT_MAX_FRAMES);
        assert_eq!(cli.commands, ["backtrace", "memconst KERNBASE"]);
    }

    #[test]
    fn test_cli_rejects_bad_numbers_and_missing_memory()
    {
        assert!(Cli::try_parse_from(["kmon", "--memory", "m", "--cr3", "0x11z"]).is_err());
        assert!(Cli::try_parse_from(["kmon", "--cr3", "0"]).is_err());
    }

    #[test]
    fn test_monitor_config_from_flags()
    {
        let cli = Cli::try_parse_from([
            "kmon",
            "--memory",
            "m",
            "--cr3",
            "0",
            "--stack-low",
            "0xf0000000",
            "--max-frames",
            "8",
            "--keep-going",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let config = monitor_config(&cli);
        assert_eq!(config.max_frames, 8);
        assert_eq!(config.stack_bounds.low, VirtAddr::new(0xf000_0000));
        assert_eq!(config.stack_bounds.high, StackBounds::default().high);
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_frame_pointer_fallbacks()
    {
        use kmon_core::types::trapframe::TRAPFRAME_WORDS;

        let mut words = [0u32; TRAPFRAME_WORDS];
        words[2] = 0xf011_7f58;
        words[13] = 0x08;
        let kernel_trap = TrapFrame::from_words(None, words);
        words[2] = 0xeebf_dfd0;
        words[13] = 0x1b;
        let user_trap = TrapFrame::from_words(None, words);

        assert_eq!(initial_frame_pointer(Some(0x1234), Some(&user_trap)), VirtAddr::new(0x1234));
        assert_eq!(initial_frame_pointer(None, Some(&kernel_trap)), VirtAddr::new(0xf011_7f58));
        assert_eq!(initial_frame_pointer(None, Some(&user_trap)), VirtAddr::ZERO);
        assert_eq!(initial_frame_pointer(None, None), VirtAddr::ZERO);
    }
}
