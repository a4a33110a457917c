//! The command table.

use super::commands;
use super::{CommandOutcome, Session};
use crate::error::Result;

/// Signature shared by all command handlers.
///
/// `argv[0]` is the command name. Console write errors are returned as
/// `Err`; operator mistakes are reported through [`CommandOutcome::Fail`].
pub type Handler = fn(argv: &[&str], session: &mut Session<'_>) -> Result<CommandOutcome>;

/// One named command.
#[derive(Clone, Copy)]
pub struct Command
{
    pub name: &'static str,
    pub description: &'static str,
    pub handler: Handler,
}

impl std::fmt::Debug for Command
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Immutable, ordered set of commands.
#[derive(Debug, Clone)]
pub struct Registry
{
    commands: Vec<Command>,
}

impl Registry
{
    /// The built-in commands, in `help` order.
    pub fn standard() -> Self
    {
        Self::builder()
            .command("help", "Display this list of commands", commands::help)
            .command("kerninfo", "Display information about the kernel", commands::kerninfo)
            .command("backtrace", "Display a backtrace", commands::backtrace)
            .command("pagemappings", "Display page mappings for a range of pages", commands::pagemappings)
            .command("memconst", "Converts a memory constant to address", commands::memconst)
            .build()
    }

    pub fn builder() -> RegistryBuilder
    {
        RegistryBuilder::default()
    }

    /// Command whose name is exactly `name`.
    pub fn find(&self, name: &str) -> Option<&Command>
    {
        self.commands.iter().find(|command| command.name == name)
    }

    /// All commands in registration order.
    pub fn commands(&self) -> &[Command]
    {
        &self.commands
    }
}

impl Default for Registry
{
    fn default() -> Self
    {
        Self::standard()
    }
}

/// Builder for a custom [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder
{
    commands: Vec<Command>,
}

impl RegistryBuilder
{
    /// Register a command. A later command with an existing name replaces
    /// the earlier one in place.
    #[must_use]
    pub fn command(mut self, name: &'static str, description: &'static str, handler: Handler) -> Self
    {
        let command = Command {
            name,
            description,
            handler,
        };
        match self.commands.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = command,
            None => self.commands.push(command),
        }
        self
    }

    pub fn build(self) -> Registry
    {
        Registry {
            commands: self.commands,
        }
    }
}
