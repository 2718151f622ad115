//! Project-wide constants.

use std::time::Duration;

/// Chat prefix that submits a task.
pub const TRIGGER: &str = "!runcrew";

/// How often the capture endpoint is polled.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Delay before a "still working" notice is sent for a pending task.
pub const STALE_NOTICE_AFTER: Duration = Duration::from_secs(60);

/// Pending tasks older than this are dropped by the expiry sweep.
pub const CONTEXT_TTL: Duration = Duration::from_secs(30 * 60);

/// Ledger size that triggers compaction.
pub const LEDGER_COMPACT_THRESHOLD: usize = 1000;

/// Number of most recent ids kept after compaction.
pub const LEDGER_RETAIN: usize = 500;

/// Maximum characters per chat message. Discord caps at 2000.
pub const MAX_CHUNK_CHARS: usize = 1900;

/// Default webhook capture service.
pub const DEFAULT_CAPTURE_BASE_URL: &str = "https://webhook.site";

/// Discord REST API root.
pub const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Format a duration as whole seconds or minutes for chat messages.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 && secs.is_multiple_of(60) {
        let mins = secs / 60;
        if mins == 1 {
            "1 minute".to_string()
        } else {
            format!("{mins} minutes")
        }
    } else if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{secs} seconds")
    }
}
