//! Splitting an input line into arguments.

use smallvec::SmallVec;

use crate::error::CommandError;

/// Argument slots per line, one of which is reserved.
pub const MAX_ARGS: usize = 16;

/// Characters that separate arguments.
pub const WHITESPACE: [char; 4] = ['\t', '\r', '\n', ' '];

/// Arguments of one line, borrowed from that line.
pub type ArgVec<'a> = SmallVec<[&'a str; MAX_ARGS]>;

/// Split `line` into at most `MAX_ARGS - 1` arguments.
///
/// Runs of whitespace separate arguments; leading and trailing whitespace is
/// ignored. An empty or all-whitespace line gives an empty vector.
///
/// ## Errors
///
/// `TooManyArguments` as soon as a `MAX_ARGS`-th token is seen.
pub fn tokenize(line: &str) -> Result<ArgVec<'_>, CommandError>
{
    let mut argv = ArgVec::new();
    for token in line.split(WHITESPACE).filter(|token| !token.is_empty()) {
        if argv.len() == MAX_ARGS - 1 {
            return Err(CommandError::TooManyArguments { max: MAX_ARGS });
        }
        argv.push(token);
    }
    Ok(argv)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_splits_on_all_whitespace_kinds()
    {
        let argv = tokenize(" pagemappings\t0xf0000000 \r\n 0xf0001000\n").unwrap();
        assert_eq!(argv.as_slice(), &["pagemappings", "0xf0000000", "0xf0001000"]);
    }

    #[test]
    fn test_blank_lines_are_empty()
    {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize(" \t\r\n ").unwrap().is_empty());
    }

    #[test]
    fn test_other_characters_are_not_separators()
    {
        let argv = tokenize("a,b\u{b}c").unwrap();
        assert_eq!(argv.as_slice(), &["a,b\u{b}c"]);
    }

    #[test]
    fn test_fifteen_arguments_fit()
    {
        let line = vec!["x"; MAX_ARGS - 1].join(" ");
        assert_eq!(tokenize(&line).unwrap().len(), MAX_ARGS - 1);
    }

    #[test]
    fn test_sixteenth_argument_is_rejected()
    {
        let line = vec!["x"; MAX_ARGS].join(" ");
        let err = tokenize(&line).unwrap_err();
        assert_eq!(err, CommandError::TooManyArguments { max: 16 });
        assert_eq!(err.to_string(), "Too many arguments (max 16)");
    }
}
