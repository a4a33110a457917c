//! # Error Types
//!
//! General error handling for the monitor.
//!
//! Two families exist. [`KmonError`] covers failures of the machinery around
//! the interpreter: loading images, reading memory, bad configuration.
//! [`CommandError`] covers what an operator can get wrong on a single input
//! line; its `Display` output is exactly the line printed on the console.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use std::fmt;

use thiserror::Error;

/// Main error type for monitor operations
///
/// ## Error Categories
///
/// 1. **Memory errors**: UnmappedAddress, PhysicalOutOfRange
/// 2. **Image errors**: Image (ELF or DWARF could not be parsed)
/// 3. **Argument errors**: InvalidArgument
/// 4. **I/O errors**: Io (console, snapshot files)
#[derive(Error, Debug)]
pub enum KmonError
{
    /// A virtual address has no translation in the inspected address space
    #[error("Virtual address 0x{0:08x} is not mapped")]
    UnmappedAddress(u32),

    /// A physical address lies beyond the end of the memory image
    ///
    /// This happens when a page table points at a frame the snapshot does
    /// not contain, or when a read straddles the end of the image.
    #[error("Physical address 0x{0:08x} is outside physical memory")]
    PhysicalOutOfRange(u32),

    /// A kernel image or its debug sections could not be parsed
    #[error("Kernel image error: {0}")]
    Image(String),

    /// Invalid argument passed to a monitor function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error (console, memory image, kernel image)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, KmonError>`
///
/// ```rust
/// use kmon_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, KmonError>;

/// Position of an argument on the command line, counted from the first
/// argument after the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordinal(pub usize);

impl fmt::Display for Ordinal
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let word = match self.0 {
            1 => "first",
            2 => "second",
            3 => "third",
            n => return write!(f, "#{n}"),
        };
        f.write_str(word)
    }
}

/// A problem with one line of operator input.
///
/// None of these are fatal to the interpreter by themselves; whether a
/// failing command ends the session is decided by
/// [`crate::monitor::FailurePolicy`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError
{
    /// The line holds more tokens than there are argument slots
    #[error("Too many arguments (max {max})")]
    TooManyArguments
    {
        /// Number of argument slots, including the reserved terminator slot.
        max: usize,
    },

    /// No registered command has this name
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    /// A command was given the wrong number of arguments
    #[error("{command} expects {expected}")]
    ArgumentCount
    {
        command: &'static str,
        /// Human description, e.g. "at most two arguments".
        expected: &'static str,
    },

    /// An argument that must be a number could not be parsed in full
    #[error("{command}: expecting number as {position} argument, could not parse '{input}'")]
    InvalidNumber
    {
        command: &'static str,
        position: Ordinal,
        input: String,
    },

    /// `memconst` was asked about a name outside the constant table
    #[error("memconst: unknown memory constant '{0}'")]
    UnknownConstant(String),
}
