//! Watch the window list and report changes.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use pipewrench_common::config::AppConfig;
use pipewrench_platform_x11::{list_windows, DisplaySession, WindowDescriptor, WindowWatcher};
use tokio::sync::mpsc;

pub async fn run(interval_ms: u64) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let session = Arc::new(
        DisplaySession::open().map_err(|e| anyhow::anyhow!("Cannot open display: {e}"))?,
    );

    let mut windows = list_windows(&session);
    println!("Tracking {} capturable windows.", windows.len());

    let watcher = WindowWatcher::new(session.clone(), Duration::from_millis(interval_ms));
    match watcher.register() {
        Ok(registered) => {
            println!("Watching {registered} windows for events. Press Ctrl+C to stop.");
            event_loop(watcher, &session, &mut windows).await
        }
        Err(e) => {
            // Some servers refuse event masks on the root window; a
            // periodic re-list still notices changes, just more slowly.
            tracing::warn!("Event registration failed ({e}); polling the window list instead");
            let interval = Duration::from_secs(config.capture.refresh_interval_secs.max(1));
            refresh_loop(&session, &mut windows, interval).await
        }
    }
}

async fn event_loop(
    watcher: WindowWatcher,
    session: &DisplaySession,
    windows: &mut Vec<WindowDescriptor>,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let stop = watcher.stop_flag();
    let runner = tokio::spawn(async move { watcher.run(tx).await });

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            changed = rx.recv() => {
                if changed.is_none() {
                    break;
                }
                let current = list_windows(session);
                report_change(windows, &current);
                *windows = current;
            }
        }
    }

    stop.store(true, Ordering::SeqCst);
    match runner.await {
        Ok(Ok(notifications)) => {
            println!("Stopped after {notifications} change notifications.");
            Ok(())
        }
        Ok(Err(e)) => Err(anyhow::anyhow!("Watcher failed: {e}")),
        Err(e) => Err(anyhow::anyhow!("Watcher task panicked: {e}")),
    }
}

async fn refresh_loop(
    session: &DisplaySession,
    windows: &mut Vec<WindowDescriptor>,
    interval: Duration,
) -> anyhow::Result<()> {
    println!(
        "Re-listing every {}s. Press Ctrl+C to stop.",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {
                let current = list_windows(session);
                if current != *windows {
                    report_change(windows, &current);
                    *windows = current;
                }
            }
        }
    }
}

fn report_change(previous: &[WindowDescriptor], current: &[WindowDescriptor]) {
    let added = current
        .iter()
        .filter(|w| !previous.iter().any(|p| p.id == w.id))
        .count();
    let removed = previous
        .iter()
        .filter(|w| !current.iter().any(|c| c.id == w.id))
        .count();

    println!(
        "[{}] Window list changed: {} windows ({added} new, {removed} gone)",
        chrono::Local::now().format("%H:%M:%S"),
        current.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(id: u32, title: &str) -> WindowDescriptor {
        WindowDescriptor {
            id,
            title: title.to_string(),
            wm_class: Some("App".to_string()),
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            visible: true,
        }
    }

    #[test]
    fn title_changes_compare_unequal_without_membership_changes() {
        let before = vec![window(1, "Document"), window(2, "Shell")];
        let after = vec![window(1, "Document (edited)"), window(2, "Shell")];
        assert_ne!(before, after);

        let added = after
            .iter()
            .filter(|w| !before.iter().any(|p| p.id == w.id))
            .count();
        assert_eq!(added, 0);
    }
}
