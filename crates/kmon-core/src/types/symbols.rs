//! Symbol lookup results.

use std::fmt;

use super::VirtAddr;

/// Text printed in place of a file or function name that could not be resolved.
pub const UNKNOWN_NAME: &str = "<unknown>";

/// Source and function information for one instruction address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo
{
    /// Source file containing the instruction.
    pub file: String,
    /// Source line of the instruction, 0 if unknown.
    pub line: u32,
    /// Name of the enclosing function, exactly as it should be displayed.
    pub function_name: String,
    /// First instruction of the enclosing function.
    pub function_start: VirtAddr,
    /// Number of arguments the function declares.
    pub declared_arg_count: u32,
}

impl SymbolInfo
{
    /// Signed byte offset of `address` from the start of the function.
    pub fn offset_of(&self, address: VirtAddr) -> i32
    {
        address.value().wrapping_sub(self.function_start.value()) as i32
    }
}

/// Outcome of asking a debug-info resolver about an address.
///
/// Resolvers that cannot tell a real hit from a miss should answer
/// [`SymbolLookup::Unresolved`] rather than fill in placeholder data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolLookup
{
    /// The address belongs to a known function.
    Resolved(SymbolInfo),
    /// Nothing is known about the address.
    Unresolved,
}

impl SymbolLookup
{
    /// Borrow the symbol information, if any.
    pub fn info(&self) -> Option<&SymbolInfo>
    {
        match self {
            SymbolLookup::Resolved(info) => Some(info),
            SymbolLookup::Unresolved => None,
        }
    }
}

/// Second backtrace line for one frame: `file:line: name+offset (narg)`.
pub struct FrameLocation<'a>
{
    lookup: &'a SymbolLookup,
    address: VirtAddr,
}

impl<'a> FrameLocation<'a>
{
    pub fn new(lookup: &'a SymbolLookup, address: VirtAddr) -> Self
    {
        Self { lookup, address }
    }
}

impl fmt::Display for FrameLocation<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.lookup {
            SymbolLookup::Resolved(info) => write!(
                f,
                "{}:{}: {}+{} ({})",
                info.file,
                info.line,
                info.function_name,
                info.offset_of(self.address),
                info.declared_arg_count
            ),
            SymbolLookup::Unresolved => write!(f, "{UNKNOWN_NAME}:0: {UNKNOWN_NAME}+0 (0)"),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn sample() -> SymbolInfo
    {
        SymbolInfo {
            file: "kern/init.c".to_string(),
            line: 24,
            function_name: "test_backtrace".to_string(),
            function_start: VirtAddr::new(0xf010_0040),
            declared_arg_count: 1,
        }
    }

    #[test]
    fn test_resolved_location()
    {
        let lookup = SymbolLookup::Resolved(sample());
        let line = FrameLocation::new(&lookup, VirtAddr::new(0xf010_0069)).to_string();
        assert_eq!(line, "kern/init.c:24: test_backtrace+41 (1)");
    }

    #[test]
    fn test_unresolved_location()
    {
        let line = FrameLocation::new(&SymbolLookup::Unresolved, VirtAddr::new(0xdead_beef)).to_string();
        assert_eq!(line, "<unknown>:0: <unknown>+0 (0)");
    }

    #[test]
    fn test_offset_before_start_is_negative()
    {
        assert_eq!(sample().offset_of(VirtAddr::new(0xf010_003c)), -4);
    }
}
