//! List capturable windows.

use pipewrench_platform_x11::{list_windows, DisplaySession};

pub fn run() -> anyhow::Result<()> {
    let session =
        DisplaySession::open().map_err(|e| anyhow::anyhow!("Cannot open display: {e}"))?;
    let windows = list_windows(&session);

    if windows.is_empty() {
        println!("No capturable windows found.");
        return Ok(());
    }

    println!("Capturable windows ({}):", windows.len());
    for window in &windows {
        let class = window
            .wm_class
            .as_deref()
            .map(|class| format!(" [{class}]"))
            .unwrap_or_default();
        println!(
            "  0x{:08x}  {:>5}x{:<5} at ({}, {})  {}{}",
            window.id, window.width, window.height, window.x, window.y, window.title, class
        );
    }

    Ok(())
}
