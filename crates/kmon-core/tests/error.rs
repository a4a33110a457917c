//! Tests for error handling

use std::error::Error;
use std::io;

use kmon_core::error::{CommandError, KmonError, Ordinal, Result};
use kmon_core::types::{StackBounds, VirtAddr};
use kmon_core::unwind::UnwindError;

#[test]
fn test_command_errors_are_console_lines()
{
    let cases = [
        (CommandError::TooManyArguments { max: 16 }, "Too many arguments (max 16)"),
        (CommandError::UnknownCommand("x".into()), "Unknown command 'x'"),
        (
            CommandError::ArgumentCount {
                command: "pagemappings",
                expected: "at least one argument",
            },
            "pagemappings expects at least one argument",
        ),
        (
            CommandError::InvalidNumber {
                command: "pagemappings",
                position: Ordinal(2),
                input: "0xq".into(),
            },
            "pagemappings: expecting number as second argument, could not parse '0xq'",
        ),
        (
            CommandError::UnknownConstant("KERNTOP".into()),
            "memconst: unknown memory constant 'KERNTOP'",
        ),
    ];
    for (error, line) in cases {
        assert_eq!(error.to_string(), line);
    }
}

#[test]
fn test_ordinals()
{
    assert_eq!(Ordinal(1).to_string(), "first");
    assert_eq!(Ordinal(3).to_string(), "third");
    assert_eq!(Ordinal(7).to_string(), "#7");
}

#[test]
fn test_io_error_conversion()
{
    fn fails() -> Result<()>
    {
        Err::<(), _>(io::Error::new(io::ErrorKind::BrokenPipe, "console closed"))?;
        Ok(())
    }

    let err = fails().unwrap_err();
    assert!(matches!(err, KmonError::Io(_)));
    assert!(err.to_string().contains("console closed"));
}

#[test]
fn test_kmon_error_messages()
{
    assert_eq!(
        KmonError::UnmappedAddress(0xf000_0000).to_string(),
        "Virtual address 0xf0000000 is not mapped"
    );
    assert_eq!(
        KmonError::PhysicalOutOfRange(0x0040_0000).to_string(),
        "Physical address 0x00400000 is outside physical memory"
    );
}

#[test]
fn test_unwind_errors()
{
    let bounds = StackBounds::new(VirtAddr::new(0xefc0_0000), VirtAddr::new(0xf000_0000));
    let err = UnwindError::FrameOutOfBounds {
        frame_pointer: VirtAddr::new(0x10),
        bounds,
    };
    assert_eq!(
        err.to_string(),
        "frame pointer 0x00000010 outside stack bounds [0xefc00000, 0xf0000000]"
    );

    let fault = UnwindError::MemoryFault {
        frame_pointer: VirtAddr::new(0xf011_8000),
        source: KmonError::UnmappedAddress(0xf011_8000),
    };
    assert!(fault.source().is_some());
    assert_eq!(UnwindError::DepthExceeded { limit: 64 }.to_string(), "backtrace truncated after 64 frames");
}
