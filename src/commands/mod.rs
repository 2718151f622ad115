//! Chat commands prefixed with `!`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry matches the first word of a message
//! against command names and aliases, and generates `!help` text.

mod help;
mod pending;
mod runcrew;

use async_trait::async_trait;
use std::sync::Arc;

use crate::channel::InboundMessage;
use crate::relay::{Relay, argument_text};

/// What a command sees when it runs.
pub struct CommandContext<'a> {
    pub relay: &'a Relay,
    pub message: &'a InboundMessage,
    /// Message text after the command word.
    pub args: &'a str,
}

/// What the dispatcher did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Not addressed to the relay (or sent by a bot); ignored.
    NotACommand,
    /// A command ran.
    Handled,
}

/// A chat command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"!runcrew"`.
    fn name(&self) -> &str;

    /// Alternative names.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// One-line description for `!help`.
    fn description(&self) -> &str;

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult;
}

/// Holds registered commands.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(runcrew::RunCrewCommand),
            Arc::new(pending::PendingCommand),
            Arc::new(help::HelpCommand),
        ];
        Self { commands }
    }

    /// Run the command the message starts with. Bot messages and
    /// messages without a known command word are ignored.
    pub async fn dispatch(&self, relay: &Relay, message: &InboundMessage) -> CommandResult {
        if message.author_is_bot {
            return CommandResult::NotACommand;
        }

        let text = message.content.trim();
        let word = text.split_whitespace().next().unwrap_or("");

        for command in &self.commands {
            if word == command.name() || command.aliases().contains(&word) {
                // !help needs the registry itself to list commands
                if command.name() == help::NAME {
                    relay.reply(&message.reply_to, &self.help_text()).await;
                    return CommandResult::Handled;
                }
                let ctx = CommandContext {
                    relay,
                    message,
                    args: argument_text(text),
                };
                return command.execute(&ctx).await;
            }
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.aliases()), c.description()))
            .collect();

        let mut out = String::from("**Commands**\n");
        for (label, desc) in &entries {
            out.push_str(&format!("`{label}` {desc}\n"));
        }
        out
    }

    /// All registered command names.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases.
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, aliases: &[&str]) -> String {
    if aliases.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, aliases.join(", "))
    }
}
