//! Startup banner.

use std::time::Duration;

use crate::consts::format_duration;

/// Relay configuration for display in the startup banner.
pub struct BannerInfo<'a> {
    pub channel: &'a str,
    pub capture: &'a str,
    pub task_api: &'a str,
    pub poll_interval: Duration,
    pub context_ttl: Duration,
}

/// Render the startup banner.
pub fn banner_text(info: &BannerInfo) -> String {
    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║           C R E W R E L A Y           ║
   ║   chat in, crew out, results back     ║
   ╚═══════════════════════════════════════╝

   version   {}
   channel   {}
   capture   {}
   task api  {}
   polling   every {}
   give up   after {}
"#,
        env!("CARGO_PKG_VERSION"),
        info.channel,
        info.capture,
        info.task_api,
        format_duration(info.poll_interval),
        format_duration(info.context_ttl),
    )
}

/// Print the startup banner.
pub fn print_banner(info: &BannerInfo) {
    println!("{}", banner_text(info));
}
