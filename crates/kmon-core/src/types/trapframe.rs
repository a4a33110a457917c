//! Saved trap frame of a 32-bit x86 kernel.
//!
//! The monitor never interprets the frame; it is shown on entry and handed to
//! command handlers for display.

use std::fmt;

use super::VirtAddr;

/// Size of the trap frame in memory, in 32-bit words.
pub const TRAPFRAME_WORDS: usize = 17;

/// Trap number of a page fault.
pub const T_PGFLT: u32 = 14;

/// Trap number used for system calls.
pub const T_SYSCALL: u32 = 48;

const EXCEPTION_NAMES: [&str; 20] = [
    "Divide error",
    "Debug",
    "Non-Maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "BOUND Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack Fault",
    "General Protection",
    "Page Fault",
    "(unknown trap)",
    "x87 FPU Floating-Point Error",
    "Alignment Check",
    "Machine-Check",
    "SIMD Floating-Point Exception",
];

/// General-purpose registers in `pushal` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushRegs
{
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    /// Useless stack pointer pushed by `pushal`.
    pub oesp: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
}

/// Register state captured at kernel entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrapFrame
{
    /// Where the frame was found, if it came from memory.
    pub location: Option<VirtAddr>,
    pub regs: PushRegs,
    pub es: u16,
    pub ds: u16,
    pub trapno: u32,
    pub err: u32,
    pub eip: u32,
    pub cs: u16,
    pub eflags: u32,
    /// Only meaningful when the trap crossed from user mode.
    pub esp: u32,
    /// Only meaningful when the trap crossed from user mode.
    pub ss: u16,
}

impl TrapFrame
{
    /// Decode a frame from the 17 little-endian words it occupies in memory.
    pub fn from_words(location: Option<VirtAddr>, words: [u32; TRAPFRAME_WORDS]) -> Self
    {
        // Segment selectors are 16 bits followed by 16 bits of padding.
        let selector = |word: u32| (word & 0xffff) as u16;
        Self {
            location,
            regs: PushRegs {
                edi: words[0],
                esi: words[1],
                ebp: words[2],
                oesp: words[3],
                ebx: words[4],
                edx: words[5],
                ecx: words[6],
                eax: words[7],
            },
            es: selector(words[8]),
            ds: selector(words[9]),
            trapno: words[10],
            err: words[11],
            eip: words[12],
            cs: selector(words[13]),
            eflags: words[14],
            esp: words[15],
            ss: selector(words[16]),
        }
    }

    /// Whether the trap was taken while running in user mode.
    pub fn from_user_mode(&self) -> bool
    {
        self.cs & 3 != 0
    }

    /// Human-readable trap name.
    pub fn trap_name(&self) -> &'static str
    {
        trap_name(self.trapno)
    }
}

/// Name of a trap number, following the processor's exception table.
pub fn trap_name(trapno: u32) -> &'static str
{
    if let Some(name) = EXCEPTION_NAMES.get(trapno as usize) {
        return name;
    }
    if trapno == T_SYSCALL {
        return "System call";
    }
    "(unknown trap)"
}

impl fmt::Display for TrapFrame
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.location {
            Some(va) => writeln!(f, "TRAP frame at {va}")?,
            None => writeln!(f, "TRAP frame")?,
        }
        writeln!(f, "  edi  0x{:08x}", self.regs.edi)?;
        writeln!(f, "  esi  0x{:08x}", self.regs.esi)?;
        writeln!(f, "  ebp  0x{:08x}", self.regs.ebp)?;
        writeln!(f, "  oesp 0x{:08x}", self.regs.oesp)?;
        writeln!(f, "  ebx  0x{:08x}", self.regs.ebx)?;
        writeln!(f, "  edx  0x{:08x}", self.regs.edx)?;
        writeln!(f, "  ecx  0x{:08x}", self.regs.ecx)?;
        writeln!(f, "  eax  0x{:08x}", self.regs.eax)?;
        writeln!(f, "  es   0x----{:04x}", self.es)?;
        writeln!(f, "  ds   0x----{:04x}", self.ds)?;
        writeln!(f, "  trap 0x{:08x} {}", self.trapno, self.trap_name())?;
        write!(f, "  err  0x{:08x}", self.err)?;
        if self.trapno == T_PGFLT {
            writeln!(
                f,
                " [{}, {}, {}]",
                if self.err & 4 != 0 { "user" } else { "kernel" },
                if self.err & 2 != 0 { "write" } else { "read" },
                if self.err & 1 != 0 { "protection" } else { "not-present" }
            )?;
        } else {
            writeln!(f)?;
        }
        writeln!(f, "  eip  0x{:08x}", self.eip)?;
        writeln!(f, "  cs   0x----{:04x}", self.cs)?;
        write!(f, "  flag 0x{:08x}", self.eflags)?;
        if self.from_user_mode() {
            writeln!(f)?;
            writeln!(f, "  esp  0x{:08x}", self.esp)?;
            write!(f, "  ss   0x----{:04x}", self.ss)?;
        }
        Ok(())
    }
}
