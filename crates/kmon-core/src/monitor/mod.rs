//! # Monitor
//!
//! The interactive command interpreter.
//!
//! A [`Monitor`] reads lines from a [`LineSource`], splits them with
//! [`tokenize`], looks the first argument up in a [`Registry`] and runs the
//! handler against a [`Target`]: the borrowed, read-only view of the
//! inspected machine.
//!
//! ## Example
//!
//! ```rust
//! use kmon_core::monitor::{Monitor, Registry, ScriptedLines, SessionEnd, Target};
//! use kmon_core::paging::{AddressSpace, Translation};
//! use kmon_core::memory::MemoryAccess;
//! use kmon_core::symbols::NoDebugInfo;
//! use kmon_core::types::VirtAddr;
//! use kmon_core::error::{KmonError, Result};
//!
//! struct Nothing;
//!
//! impl AddressSpace for Nothing
//! {
//!     fn translate(&self, _va: VirtAddr) -> Option<Translation>
//!     {
//!         None
//!     }
//!
//!     fn physical_page_count(&self) -> u32
//!     {
//!         0
//!     }
//! }
//!
//! impl MemoryAccess for Nothing
//! {
//!     fn read_u32(&self, address: VirtAddr) -> Result<u32>
//!     {
//!         Err(KmonError::UnmappedAddress(address.value()))
//!     }
//! }
//!
//! let registry = Registry::standard();
//! let target = Target::new(&Nothing, &Nothing, &NoDebugInfo, &VirtAddr::ZERO);
//! let monitor = Monitor::new(target, &registry);
//!
//! let mut out = Vec::new();
//! let end = monitor.run(&mut ScriptedLines::new(["memconst KERNBASE"]), &mut out)?;
//! assert_eq!(end, SessionEnd::EndOfInput);
//! assert!(String::from_utf8_lossy(&out).ends_with("KERNBASE: 0xf0000000\n"));
//! # Ok::<(), KmonError>(())
//! ```

mod commands;
mod config;
mod console;
mod registry;
mod tokenizer;

use std::io::Write;

use tracing::debug;

pub use commands::parse_number;
pub use config::{FailurePolicy, MonitorConfig, DEFAULT_PROMPT};
pub use console::{ConsoleLines, LineSource, ScriptedLines};
pub use registry::{Command, Handler, Registry, RegistryBuilder};
pub use tokenizer::{tokenize, ArgVec, MAX_ARGS, WHITESPACE};

use crate::error::{CommandError, Result};
use crate::memory::MemoryAccess;
use crate::paging::AddressSpace;
use crate::symbols::{DebugInfo, KernelSymbols};
use crate::types::TrapFrame;
use crate::unwind::FramePointerSource;

/// First lines printed by [`Monitor::run`].
pub const BANNER: &str = "Welcome to the kmon kernel monitor!\nType 'help' for a list of commands.";

/// Result of one command handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome
{
    /// Read the next line.
    Continue,
    /// The command failed; the dispatcher prints the error and applies the
    /// configured [`FailurePolicy`].
    Fail(CommandError),
    /// End the session.
    Terminate,
}

/// What the loop does after one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow
{
    Continue,
    Terminate,
}

/// Why [`Monitor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd
{
    /// The line source ran dry.
    EndOfInput,
    /// A command ended the session.
    Terminated,
}

/// Read-only view of the inspected machine.
#[derive(Clone, Copy)]
pub struct Target<'a>
{
    pub address_space: &'a dyn AddressSpace,
    pub memory: &'a dyn MemoryAccess,
    pub debug_info: &'a dyn DebugInfo,
    pub registers: &'a dyn FramePointerSource,
    /// Layout symbols for `kerninfo`, when a kernel image is loaded.
    pub kernel: Option<&'a KernelSymbols>,
    /// Trap frame of the event that entered the monitor.
    pub trap_frame: Option<&'a TrapFrame>,
}

impl<'a> Target<'a>
{
    pub fn new(
        address_space: &'a dyn AddressSpace,
        memory: &'a dyn MemoryAccess,
        debug_info: &'a dyn DebugInfo,
        registers: &'a dyn FramePointerSource,
    ) -> Self
    {
        Self {
            address_space,
            memory,
            debug_info,
            registers,
            kernel: None,
            trap_frame: None,
        }
    }

    #[must_use]
    pub fn with_kernel(mut self, kernel: Option<&'a KernelSymbols>) -> Self
    {
        self.kernel = kernel;
        self
    }

    #[must_use]
    pub fn with_trap_frame(mut self, trap_frame: Option<&'a TrapFrame>) -> Self
    {
        self.trap_frame = trap_frame;
        self
    }
}

/// Everything a handler can touch while it runs.
pub struct Session<'a>
{
    pub out: &'a mut dyn Write,
    pub target: &'a Target<'a>,
    pub registry: &'a Registry,
    pub config: &'a MonitorConfig,
}

/// The command interpreter.
pub struct Monitor<'a>
{
    target: Target<'a>,
    registry: &'a Registry,
    config: MonitorConfig,
}

impl<'a> Monitor<'a>
{
    pub fn new(target: Target<'a>, registry: &'a Registry) -> Self
    {
        Self {
            target,
            registry,
            config: MonitorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: MonitorConfig) -> Self
    {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MonitorConfig
    {
        &self.config
    }

    /// Print the banner and the trap frame, then run lines until the source
    /// is exhausted or a command ends the session.
    ///
    /// ## Errors
    ///
    /// Read errors from `lines` and write errors on `out`.
    pub fn run(&self, lines: &mut dyn LineSource, out: &mut dyn Write) -> Result<SessionEnd>
    {
        writeln!(out, "{BANNER}")?;
        if let Some(trap_frame) = self.target.trap_frame {
            writeln!(out, "{trap_frame}")?;
        }

        while let Some(line) = lines.read_line(&self.config.prompt)? {
            if self.run_line(&line, out)? == Flow::Terminate {
                debug!("monitor session terminated");
                return Ok(SessionEnd::Terminated);
            }
        }
        Ok(SessionEnd::EndOfInput)
    }

    /// Tokenize and dispatch a single line.
    pub fn run_line(&self, line: &str, out: &mut dyn Write) -> Result<Flow>
    {
        let argv = match tokenize(line) {
            Ok(argv) => argv,
            Err(err) => {
                writeln!(out, "{err}")?;
                return Ok(Flow::Continue);
            }
        };
        let Some(&name) = argv.first() else {
            return Ok(Flow::Continue);
        };
        let Some(command) = self.registry.find(name) else {
            writeln!(out, "{}", CommandError::UnknownCommand(name.to_string()))?;
            return Ok(Flow::Continue);
        };

        debug!(command = name, argc = argv.len(), "dispatching command");
        let mut session = Session {
            out,
            target: &self.target,
            registry: self.registry,
            config: &self.config,
        };
        let flow = match (command.handler)(&argv, &mut session)? {
            CommandOutcome::Continue => Flow::Continue,
            CommandOutcome::Terminate => Flow::Terminate,
            CommandOutcome::Fail(err) => {
                debug!(command = name, error = %err, "command failed");
                writeln!(session.out, "{err}")?;
                match self.config.failure_policy {
                    FailurePolicy::Terminate => Flow::Terminate,
                    FailurePolicy::Continue => Flow::Continue,
                }
            }
        };
        Ok(flow)
    }
}
