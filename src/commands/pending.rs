use async_trait::async_trait;

use super::{Command, CommandContext, CommandResult};

pub struct PendingCommand;

#[async_trait]
impl Command for PendingCommand {
    fn name(&self) -> &str {
        "!pending"
    }

    fn description(&self) -> &str {
        "show how many tasks are waiting for results"
    }

    async fn execute(&self, ctx: &CommandContext<'_>) -> CommandResult {
        let count = ctx.relay.pending_count().await;
        let text = match count {
            0 => "📭 No tasks are waiting for results.".to_string(),
            1 => "📬 1 task is waiting for results.".to_string(),
            n => format!("📬 {n} tasks are waiting for results."),
        };
        ctx.relay.reply(&ctx.message.reply_to, &text).await;
        CommandResult::Handled
    }
}
