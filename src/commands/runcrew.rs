use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};
use crate::consts::TRIGGER;

/// `!runcrew <request>`: start a crew task and wait for its result.
pub struct RunCrewCommand;

#[async_trait]
impl Command for RunCrewCommand {
    fn name(&self) -> &str {
        TRIGGER
    }

    fn description(&self) -> &str {
        "send a request to the crew, e.g. `!runcrew research the history of tea`"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult {
        // Failures are already reported to the requester.
        let _ = ctx.relay.submit(&ctx.message.reply_to, ctx.args).await;
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Category;
    use crate::commands::tests::{harness, message};

    #[test]
    fn metadata() {
        assert_eq!(RunCrewCommand.name(), "!runcrew");
        assert!(RunCrewCommand.aliases().is_empty());
        assert!(!RunCrewCommand.description().is_empty());
    }

    #[tokio::test]
    async fn submits_argument_text() {
        let h = harness();
        let result = h
            .relay
            .handle_message(&message("m1", "!runcrew research tea history"))
            .await;
        assert_eq!(result, CommandResult::Handled);

        let submissions = h.tasks.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, "research tea history");
        assert_eq!(submissions[0].1, "https://capture.test/hook");

        let state = h.relay.state().await;
        let task = state.store.get("T1").unwrap();
        assert_eq!(task.query, "research tea history");
        assert_eq!(task.category, Category::Research);
    }

    #[tokio::test]
    async fn bare_command_submits_empty_query() {
        let h = harness();
        h.relay.handle_message(&message("m1", "!runcrew")).await;
        assert_eq!(h.tasks.submissions()[0].0, "");
        assert_eq!(h.relay.pending_count().await, 1);
    }
}
