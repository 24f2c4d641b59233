use eyre::Result;
use std::time::Duration;
use tally_client::app::App;
use tracing::info;

/// Re-evaluates connectivity every `watch_interval_secs` and flushes the queue on
/// each offline to online transition. Runs until interrupted.
pub(crate) async fn run(app: &App) -> Result<()> {
    let period = Duration::from_secs(app.settings.watch_interval_secs.max(1));
    let mut interval = tokio::time::interval(period);
    let mut was_online: Option<bool> = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }

        let online = app.is_online().await;
        if was_online == Some(online) {
            continue;
        }

        info!(online, "connectivity changed");
        println!("{}", if online { "Online" } else { "Offline" });

        if online {
            let report = app.flush(false).await?;
            if report.sent > 0 {
                println!("Sent {} queued item(s), {} pending", report.sent, report.retained);
            }
        }
        was_online = Some(online);
    }
}
